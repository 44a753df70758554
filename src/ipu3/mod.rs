//! IPU3 hardware payloads
//!
//! Only the fields the autofocus algorithm reads or writes are modelled.
//! Both records are fixed-layout little-endian byte sequences with no
//! padding, encoded and decoded field by field.
pub mod params;
pub mod stats;

pub use params::{AfGridRecord, Ipu3Params, GRID_Y_START_EN};
pub use stats::{Ipu3Stats, StatisticsTable, YTableItem, AF_Y_TABLE_MAX_CELLS};
