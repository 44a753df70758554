//! Testing utilities for crabcamera-af
//!
//! Provides synthetic AF statistics so the search can be exercised offline,
//! without an ISP or a lens module.

pub mod synthetic_data;

pub use synthetic_data::{flat_table, SyntheticLens};
