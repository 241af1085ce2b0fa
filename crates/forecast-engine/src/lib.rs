//! Geospatial forecast and calibration engine core.
//!
//! Turns scattered meteorological forecasts into dense hourly pollutant
//! grids over the fixed metropolitan lattice: spatial interpolation,
//! feature construction, regression inference, IAS assembly, and the
//! nearest-point query surface.

pub mod domain;
pub mod features;
pub mod interpolate;
pub mod lookup;
pub mod models;
pub mod pipeline;
pub mod weather;

pub use domain::{DomainPaths, GridDomain};
pub use features::{build_features, CellMeteorology, FEATURE_SCHEMA};
pub use interpolate::{interpolate_scalar, interpolate_wind, InterpolatedField, WindField};
pub use lookup::{LookupStatus, NearestPointLookup, PointLookup};
pub use models::{GbtModel, PollutantModels};
pub use pipeline::ForecastPipeline;
pub use weather::{HourObservations, WeatherClient, WeatherClientConfig};
