//! Pre-trained pollutant regression models.
//!
//! Each pollutant has an independently trained gradient-boosted tree
//! ensemble, exported as a JSON artifact and consumed here as an opaque
//! predict function. Artifacts are loaded once per process and cached.
//!
//! Failure semantics: a missing or unparseable artifact degrades that
//! pollutant to an absent model (the pipeline substitutes 0.0 grid-wide);
//! an artifact whose `feature_names` disagree with the builder's schema is
//! a fatal schema mismatch.

use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

use aq_common::{AqError, AqResult, Pollutant};
use storage::{ObjectStorage, StoragePath};

use crate::features::FEATURE_SCHEMA;

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum Node {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        leaf: f64,
    },
}

#[derive(Debug, Clone, Deserialize)]
struct Tree {
    nodes: Vec<Node>,
}

/// One pollutant's boosted-tree ensemble.
#[derive(Debug, Clone, Deserialize)]
pub struct GbtModel {
    feature_names: Vec<String>,
    #[serde(default)]
    base_score: f64,
    trees: Vec<Tree>,
}

impl GbtModel {
    /// Parse and validate an artifact body.
    pub fn from_json(pollutant: Pollutant, bytes: &[u8]) -> AqResult<Self> {
        let model: GbtModel =
            serde_json::from_slice(bytes).map_err(|e| AqError::ModelArtifact {
                pollutant: pollutant.key().to_string(),
                message: format!("unparseable artifact: {}", e),
            })?;

        if model.trees.is_empty() {
            return Err(AqError::ModelArtifact {
                pollutant: pollutant.key().to_string(),
                message: "artifact contains no trees".to_string(),
            });
        }
        for (ti, tree) in model.trees.iter().enumerate() {
            if tree.nodes.is_empty() {
                return Err(AqError::ModelArtifact {
                    pollutant: pollutant.key().to_string(),
                    message: format!("tree {} is empty", ti),
                });
            }
            for node in &tree.nodes {
                if let Node::Split {
                    feature,
                    left,
                    right,
                    ..
                } = node
                {
                    if *feature >= model.feature_names.len()
                        || *left >= tree.nodes.len()
                        || *right >= tree.nodes.len()
                    {
                        return Err(AqError::ModelArtifact {
                            pollutant: pollutant.key().to_string(),
                            message: format!("tree {} has out-of-range node indices", ti),
                        });
                    }
                }
            }
        }

        // The trained feature order is part of the artifact; disagreement
        // with the builder schema is fatal, not defaulted.
        if model.feature_names != FEATURE_SCHEMA {
            return Err(AqError::SchemaMismatch {
                model: pollutant.key().to_string(),
                expected: FEATURE_SCHEMA.iter().map(|s| s.to_string()).collect(),
                found: model.feature_names.clone(),
            });
        }

        Ok(model)
    }

    /// Raw concentration estimate for one feature vector.
    pub fn predict(&self, features: &[f64]) -> f64 {
        let mut sum = self.base_score;
        for tree in &self.trees {
            let mut idx = 0usize;
            loop {
                match &tree.nodes[idx] {
                    Node::Leaf { leaf } => {
                        sum += leaf;
                        break;
                    }
                    Node::Split {
                        feature,
                        threshold,
                        left,
                        right,
                    } => {
                        idx = if features[*feature] < *threshold {
                            *left
                        } else {
                            *right
                        };
                    }
                }
            }
        }
        sum
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }
}

/// The per-pollutant model registry.
///
/// Absent models are explicit at this boundary: `get` returns `None` and
/// the caller decides what a missing prediction means.
#[derive(Clone)]
pub struct PollutantModels {
    models: Arc<HashMap<Pollutant, GbtModel>>,
}

impl PollutantModels {
    /// Load all five artifacts from object storage.
    ///
    /// Missing or unparseable artifacts are logged and skipped (partial
    /// failure); a schema mismatch aborts the load.
    pub async fn load(storage: &ObjectStorage) -> AqResult<Self> {
        let mut models = HashMap::new();
        for pollutant in Pollutant::ALL {
            let path = StoragePath::model_artifact(pollutant);
            match storage.get(&path).await {
                Ok(bytes) => match GbtModel::from_json(pollutant, &bytes) {
                    Ok(model) => {
                        info!(pollutant = pollutant.key(), trees = model.trees.len(), "Model loaded");
                        models.insert(pollutant, model);
                    }
                    Err(e @ AqError::SchemaMismatch { .. }) => return Err(e),
                    Err(e) => {
                        warn!(pollutant = pollutant.key(), error = %e, "Model artifact rejected, predictions default to 0.0");
                    }
                },
                Err(AqError::SnapshotNotFound(_)) => {
                    warn!(pollutant = pollutant.key(), "Model artifact missing, predictions default to 0.0");
                }
                Err(e) => return Err(e),
            }
        }
        if models.is_empty() {
            warn!("No pollutant models available; the whole grid will read zero");
        }
        Ok(Self {
            models: Arc::new(models),
        })
    }

    /// Build a registry from already-parsed models (tests, warm re-use).
    pub fn from_parts(models: HashMap<Pollutant, GbtModel>) -> Self {
        Self {
            models: Arc::new(models),
        }
    }

    /// The model for a pollutant, if its artifact loaded.
    pub fn get(&self, pollutant: Pollutant) -> Option<&GbtModel> {
        self.models.get(&pollutant)
    }

    /// Pollutants whose artifacts did not load.
    pub fn missing(&self) -> Vec<Pollutant> {
        Pollutant::ALL
            .into_iter()
            .filter(|p| !self.models.contains_key(p))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema_json() -> String {
        serde_json::to_string(&FEATURE_SCHEMA).unwrap()
    }

    /// Single tree: tmp (feature 9) < 18.0 → 30.0 else 50.0.
    fn artifact() -> String {
        format!(
            r#"{{"feature_names": {}, "base_score": 10.0,
                "trees": [{{"nodes": [
                    {{"feature": 9, "threshold": 18.0, "left": 1, "right": 2}},
                    {{"leaf": 30.0}},
                    {{"leaf": 50.0}}
                ]}}]}}"#,
            schema_json()
        )
    }

    fn features_with_tmp(tmp: f64) -> [f64; 13] {
        let mut f = [0.0; 13];
        f[9] = tmp;
        f
    }

    #[test]
    fn test_predict_walks_the_tree() {
        let model = GbtModel::from_json(Pollutant::O3, artifact().as_bytes()).unwrap();
        assert_eq!(model.predict(&features_with_tmp(15.0)), 40.0);
        assert_eq!(model.predict(&features_with_tmp(25.0)), 60.0);
        // Threshold boundary goes right.
        assert_eq!(model.predict(&features_with_tmp(18.0)), 60.0);
    }

    #[test]
    fn test_multiple_trees_sum() {
        let body = format!(
            r#"{{"feature_names": {}, "base_score": 0.0,
                "trees": [
                    {{"nodes": [{{"leaf": 1.5}}]}},
                    {{"nodes": [{{"leaf": 2.5}}]}}
                ]}}"#,
            schema_json()
        );
        let model = GbtModel::from_json(Pollutant::Co, body.as_bytes()).unwrap();
        assert_eq!(model.predict(&[0.0; 13]), 4.0);
    }

    #[test]
    fn test_schema_mismatch_is_fatal() {
        let body = r#"{"feature_names": ["tmp", "rh"], "trees": [{"nodes": [{"leaf": 1.0}]}]}"#;
        let err = GbtModel::from_json(Pollutant::O3, body.as_bytes()).unwrap_err();
        assert!(matches!(err, AqError::SchemaMismatch { .. }));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_malformed_artifact_is_model_error() {
        let err = GbtModel::from_json(Pollutant::O3, b"not json").unwrap_err();
        assert!(matches!(err, AqError::ModelArtifact { .. }));
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_out_of_range_indices_rejected() {
        let body = format!(
            r#"{{"feature_names": {}, "trees": [{{"nodes": [
                {{"feature": 0, "threshold": 1.0, "left": 5, "right": 6}}
            ]}}]}}"#,
            schema_json()
        );
        let err = GbtModel::from_json(Pollutant::O3, body.as_bytes()).unwrap_err();
        assert!(matches!(err, AqError::ModelArtifact { .. }));
    }

    #[test]
    fn test_registry_reports_missing() {
        let mut map = HashMap::new();
        map.insert(
            Pollutant::O3,
            GbtModel::from_json(Pollutant::O3, artifact().as_bytes()).unwrap(),
        );
        let registry = PollutantModels::from_parts(map);
        assert!(registry.get(Pollutant::O3).is_some());
        assert!(registry.get(Pollutant::So2).is_none());
        assert_eq!(registry.missing().len(), 4);
    }
}
