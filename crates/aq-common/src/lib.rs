//! Common types and utilities shared across all valle-aire services.

pub mod bbox;
pub mod cell;
pub mod error;
pub mod index;
pub mod pollutant;
pub mod time;

pub use bbox::BoundingBox;
pub use cell::{CellRecord, GridCell, TimelineEntry};
pub use error::{AqError, AqResult};
pub use index::{ias_score, risk_category, worst_sub_index, RiskCategory};
pub use pollutant::Pollutant;
pub use time::{display_timestamp, local_offset, snapshot_stamp};
