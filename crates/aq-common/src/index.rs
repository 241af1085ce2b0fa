//! IAS health-index computation (NOM-172-SEMARNAT-2019).
//!
//! Each pollutant carries an ordered breakpoint table mapping its regulatory
//! concentration range onto the 0–300 index scale. The cell index is the
//! worst (maximum) sub-index across pollutants.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::pollutant::Pollutant;

/// One piecewise-linear segment of a breakpoint table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Breakpoint {
    pub c_lo: f64,
    pub c_hi: f64,
    pub i_lo: f64,
    pub i_hi: f64,
}

const fn bp(c_lo: f64, c_hi: f64, i_lo: f64, i_hi: f64) -> Breakpoint {
    Breakpoint { c_lo, c_hi, i_lo, i_hi }
}

// O3 (1h), ppb
const BPS_O3: [Breakpoint; 5] = [
    bp(0.0, 58.0, 0.0, 50.0),
    bp(59.0, 92.0, 51.0, 100.0),
    bp(93.0, 135.0, 101.0, 150.0),
    bp(136.0, 175.0, 151.0, 200.0),
    bp(176.0, 240.0, 201.0, 300.0),
];
// PM10 (12h average), µg/m³
const BPS_PM10: [Breakpoint; 5] = [
    bp(0.0, 45.0, 0.0, 50.0),
    bp(46.0, 60.0, 51.0, 100.0),
    bp(61.0, 132.0, 101.0, 150.0),
    bp(133.0, 213.0, 151.0, 200.0),
    bp(214.0, 354.0, 201.0, 300.0),
];
// PM2.5 (12h average), µg/m³
const BPS_PM25: [Breakpoint; 5] = [
    bp(0.0, 25.0, 0.0, 50.0),
    bp(26.0, 45.0, 51.0, 100.0),
    bp(46.0, 79.0, 101.0, 150.0),
    bp(80.0, 147.0, 151.0, 200.0),
    bp(148.0, 250.0, 201.0, 300.0),
];
// CO (8h), ppm
const BPS_CO: [Breakpoint; 5] = [
    bp(0.0, 8.75, 0.0, 50.0),
    bp(8.76, 11.0, 51.0, 100.0),
    bp(11.01, 13.3, 101.0, 150.0),
    bp(13.31, 15.5, 151.0, 200.0),
    bp(15.51, 20.0, 201.0, 300.0),
];
// SO2 (1h), ppb
const BPS_SO2: [Breakpoint; 5] = [
    bp(0.0, 40.0, 0.0, 50.0),
    bp(41.0, 75.0, 51.0, 100.0),
    bp(76.0, 185.0, 101.0, 150.0),
    bp(186.0, 304.0, 151.0, 200.0),
    bp(305.0, 500.0, 201.0, 300.0),
];

/// The breakpoint table for a pollutant.
pub fn breakpoints(pollutant: Pollutant) -> &'static [Breakpoint] {
    match pollutant {
        Pollutant::O3 => &BPS_O3,
        Pollutant::Pm10 => &BPS_PM10,
        Pollutant::Pm25 => &BPS_PM25,
        Pollutant::Co => &BPS_CO,
        Pollutant::So2 => &BPS_SO2,
    }
}

/// Interpolated IAS sub-index for one pollutant concentration.
///
/// Scans segments in ascending order and linearly interpolates within the
/// first segment whose upper bound covers `concentration`. Concentrations
/// above the regulatory ceiling saturate at the top segment's index; there
/// is no extrapolation. Negative inputs are treated as zero.
pub fn ias_score(concentration: f64, pollutant: Pollutant) -> f64 {
    let c = concentration.max(0.0);
    let table = breakpoints(pollutant);
    for seg in table {
        if c <= seg.c_hi {
            return seg.i_lo + (c - seg.c_lo) / (seg.c_hi - seg.c_lo) * (seg.i_hi - seg.i_lo);
        }
    }
    table[table.len() - 1].i_hi
}

/// Worst sub-index and its dominant pollutant for a full concentration set.
///
/// `concentrations` must be ordered as [`Pollutant::ALL`]. Ties resolve to
/// the first pollutant in that order.
pub fn worst_sub_index(concentrations: &[f64; 5]) -> (f64, Pollutant) {
    let mut best = (f64::NEG_INFINITY, Pollutant::O3);
    for (p, c) in Pollutant::ALL.iter().zip(concentrations) {
        let score = ias_score(*c, *p);
        if score > best.0 {
            best = (score, *p);
        }
    }
    best
}

/// Health-risk category derived from the IAS value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskCategory {
    Low,
    Moderate,
    High,
    #[serde(rename = "Very High")]
    VeryHigh,
    #[serde(rename = "Extremely High")]
    ExtremelyHigh,
}

impl fmt::Display for RiskCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RiskCategory::Low => "Low",
            RiskCategory::Moderate => "Moderate",
            RiskCategory::High => "High",
            RiskCategory::VeryHigh => "Very High",
            RiskCategory::ExtremelyHigh => "Extremely High",
        };
        f.write_str(s)
    }
}

/// Map an IAS value onto the fixed risk thresholds.
pub fn risk_category(ias: f64) -> RiskCategory {
    if ias <= 50.0 {
        RiskCategory::Low
    } else if ias <= 100.0 {
        RiskCategory::Moderate
    } else if ias <= 150.0 {
        RiskCategory::High
    } else if ias <= 200.0 {
        RiskCategory::VeryHigh
    } else {
        RiskCategory::ExtremelyHigh
    }
}
