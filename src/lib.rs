//! crabcamera-af: contrast-detection autofocus for IPU3-class ISPs
//!
//! This crate implements the autofocus algorithm of an image processing
//! pipeline: it negotiates the AF statistics grid when a stream is
//! configured, turns each frame's block luminance averages into a sharpness
//! score, and drives the lens actuator through a coarse and a fine search to
//! the sharpest position, restarting the search when focus is lost.
//!
//! # Features
//! - Hardware-legal statistics grid negotiation
//! - Coarse-to-fine VCM search with actuator settle compensation
//! - Out-of-focus detection and automatic re-scan
//! - Fixed-layout parameter and statistics payloads
//! - Categorized, leveled diagnostics on top of `log`
//! - TOML tuning files with environment overrides
//!
//! # Usage
//! ```rust,ignore
//! use crabcamera_af::{AfAlgorithm, AfTuningConfig, Algorithm, IpaConfigInfo, IpaContext, Size};
//!
//! crabcamera_af::init_logging();
//! let mut af = AfAlgorithm::new(AfTuningConfig::load_or_default());
//! let mut context = IpaContext::default();
//! af.configure(&mut context, &IpaConfigInfo { bds_output_size: Size::new(1920, 1080) })?;
//!
//! // per frame
//! af.prepare(&mut context, &mut params);
//! // ... capture ...
//! af.process(&mut context, &stats);
//! ```
pub mod af;
pub mod config;
pub mod diagnostics;
pub mod errors;
pub mod invariant_ppt;
pub mod ipa;
pub mod ipu3;

// Testing utilities - synthetic statistics for offline testing
pub mod testing;

// Re-exports for convenience
pub use af::{AfAlgorithm, AfContext, FocusScanner, GridConfig, ScanState, SettlingFilter};
pub use config::AfTuningConfig;
pub use diagnostics::{LogSeverity, Logger};
pub use errors::AfError;
pub use ipa::{Algorithm, IpaConfigInfo, IpaContext, Size};
pub use ipu3::{Ipu3Params, Ipu3Stats, StatisticsTable, YTableItem};

use std::io::Write;
use std::path::Path;

/// Initialize logging for the autofocus pipeline.
///
/// Installs `env_logger` writing timestamped lines, tagged with the
/// emitting source file and line, to stderr and loads the
/// category levels from `CRABCAMERA_AF_LOG_LEVELS`. Category filtering is
/// done by [`Logger`], so unless `RUST_LOG` says otherwise everything down
/// to debug is let through here.
pub fn init_logging() {
    Logger::init();

    let mut builder = env_logger::Builder::new();
    builder
        .filter_level(log::LevelFilter::Debug)
        .parse_env("RUST_LOG")
        .format(|buf, record| {
            let file = record.file().map(basename).unwrap_or("?");
            writeln!(
                buf,
                "[{}] {:>5} {} {}:{} {}",
                chrono::Local::now().format("%H:%M:%S%.9f"),
                record.level(),
                record.target(),
                file,
                record.line().unwrap_or(0),
                record.args()
            )
        });
    let _ = builder.try_init();
}

fn basename(file: &str) -> &str {
    Path::new(file)
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or(file)
}

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

/// Get crate information
pub fn get_info() -> CrateInfo {
    CrateInfo {
        name: NAME.to_string(),
        version: VERSION.to_string(),
        description: DESCRIPTION.to_string(),
    }
}

/// Crate information structure
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct CrateInfo {
    pub name: String,
    pub version: String,
    pub description: String,
}

#[cfg(test)]
mod lib_tests {
    use super::*;

    #[test]
    fn test_crate_info() {
        let info = get_info();
        assert_eq!(info.name, "crabcamera-af");
        assert!(!info.version.is_empty());
        assert!(!info.description.is_empty());
    }

    #[test]
    fn test_basename_strips_directories() {
        assert_eq!(basename("src/af/scanner.rs"), "scanner.rs");
        assert_eq!(basename("scanner.rs"), "scanner.rs");
    }

    #[test]
    fn test_init_logging_is_idempotent() {
        init_logging();
        init_logging();
    }
}
