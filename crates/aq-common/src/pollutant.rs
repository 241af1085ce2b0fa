//! The five forecast pollutants and their identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A pollutant tracked by the forecast engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Pollutant {
    O3,
    Pm10,
    Pm25,
    Co,
    So2,
}

impl Pollutant {
    /// All pollutants, in the fixed evaluation order.
    pub const ALL: [Pollutant; 5] = [
        Pollutant::O3,
        Pollutant::Pm10,
        Pollutant::Pm25,
        Pollutant::Co,
        Pollutant::So2,
    ];

    /// Lowercase key used in storage keys and the coefficients file.
    pub fn key(&self) -> &'static str {
        match self {
            Pollutant::O3 => "o3",
            Pollutant::Pm10 => "pm10",
            Pollutant::Pm25 => "pm25",
            Pollutant::Co => "co",
            Pollutant::So2 => "so2",
        }
    }

    /// Display name used in the dominant-pollutant field.
    pub fn display_name(&self) -> &'static str {
        match self {
            Pollutant::O3 => "O3",
            Pollutant::Pm10 => "PM10",
            Pollutant::Pm25 => "PM2.5",
            Pollutant::Co => "CO",
            Pollutant::So2 => "SO2",
        }
    }

    /// Concentration unit of the regulatory averaging window.
    pub fn unit(&self) -> &'static str {
        match self {
            Pollutant::O3 | Pollutant::So2 => "ppb",
            Pollutant::Pm10 | Pollutant::Pm25 => "ug/m3",
            Pollutant::Co => "ppm",
        }
    }

    /// Parse a lowercase key.
    pub fn from_key(key: &str) -> Option<Pollutant> {
        Pollutant::ALL.into_iter().find(|p| p.key() == key)
    }
}

impl fmt::Display for Pollutant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_round_trip() {
        for p in Pollutant::ALL {
            assert_eq!(Pollutant::from_key(p.key()), Some(p));
        }
        assert_eq!(Pollutant::from_key("nox"), None);
    }

    #[test]
    fn test_serde_keys() {
        let json = serde_json::to_string(&Pollutant::Pm25).unwrap();
        assert_eq!(json, "\"pm25\"");
        let back: Pollutant = serde_json::from_str("\"so2\"").unwrap();
        assert_eq!(back, Pollutant::So2);
    }
}
