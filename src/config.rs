//! Tuning configuration for the autofocus algorithm
//!
//! The step sizes, settle latency and defocus threshold depend on the lens
//! module and its VCM driver, so they are loaded from a TOML tuning file
//! instead of being compiled in.

use crate::errors::AfError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Environment prefix used by [`AfTuningConfig::load_layered`]
pub const ENV_PREFIX: &str = "CRABCAMERA_AF";

/// Root tuning structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AfTuningConfig {
    pub scan: ScanTuning,
    pub settle: SettleTuning,
    pub monitor: MonitorTuning,
    pub logging: LoggingConfig,
}

/// Coarse/fine search parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanTuning {
    /// Highest VCM step the actuator accepts
    pub max_step: u32,
    /// Step increment used while locating the approximate peak
    pub coarse_step: u32,
    /// Step increment used while refining around the coarse peak
    pub fine_step: u32,
    /// Fraction of the best score a coarse reading may drop before the
    /// peak is considered passed (0.0 = any decrease)
    pub peak_tolerance: f64,
}

/// Actuator latency compensation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettleTuning {
    /// Frames discarded after every actuator move
    pub frames: u32,
}

/// Out-of-focus detection once converged
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitorTuning {
    /// A reading below this fraction of the converged peak counts as defocused
    pub out_of_focus_ratio: f64,
    /// Consecutive defocused readings needed to restart the search
    pub out_of_focus_frames: u32,
}

/// Diagnostic level rules, e.g. `"Af:DEBUG,*:WARN"`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub levels: String,
}

impl Default for AfTuningConfig {
    fn default() -> Self {
        Self {
            scan: ScanTuning {
                max_step: 1023,
                coarse_step: 30,
                fine_step: 1,
                peak_tolerance: 0.0,
            },
            settle: SettleTuning { frames: 10 },
            monitor: MonitorTuning {
                out_of_focus_ratio: 0.5,
                out_of_focus_frames: 3,
            },
            logging: LoggingConfig::default(),
        }
    }
}

impl AfTuningConfig {
    /// Load tuning from TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, AfError> {
        let path = path.as_ref();

        if !path.exists() {
            log::info!("Tuning file not found at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .map_err(|e| AfError::TuningError(format!("Failed to read tuning file: {}", e)))?;

        let config: AfTuningConfig = toml::from_str(&contents)
            .map_err(|e| AfError::TuningError(format!("Failed to parse tuning file: {}", e)))?;

        config.validate().map_err(AfError::TuningError)?;

        log::info!("Loaded AF tuning from {:?}", path);
        Ok(config)
    }

    /// Load defaults, then an optional tuning file, then `CRABCAMERA_AF_*`
    /// environment overrides (`CRABCAMERA_AF_SCAN__COARSE_STEP=40`)
    pub fn load_layered<P: AsRef<Path>>(path: P) -> Result<Self, AfError> {
        let defaults = config::Config::try_from(&Self::default())
            .map_err(|e| AfError::TuningError(format!("Failed to build defaults: {}", e)))?;

        let layered = config::Config::builder()
            .add_source(defaults)
            .add_source(config::File::from(path.as_ref()).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| AfError::TuningError(format!("Failed to load tuning: {}", e)))?;

        let config: AfTuningConfig = layered
            .try_deserialize()
            .map_err(|e| AfError::TuningError(format!("Invalid tuning: {}", e)))?;

        config.validate().map_err(AfError::TuningError)?;
        Ok(config)
    }

    /// Save tuning to TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), AfError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                AfError::TuningError(format!("Failed to create tuning directory: {}", e))
            })?;
        }

        let toml_string = toml::to_string_pretty(self)
            .map_err(|e| AfError::TuningError(format!("Failed to serialize tuning: {}", e)))?;

        fs::write(path, toml_string)
            .map_err(|e| AfError::TuningError(format!("Failed to write tuning file: {}", e)))?;

        log::info!("Saved AF tuning to {:?}", path);
        Ok(())
    }

    /// Get default tuning file path
    pub fn default_path() -> PathBuf {
        PathBuf::from("crabcamera-af.toml")
    }

    /// Load from default location or fall back to defaults
    pub fn load_or_default() -> Self {
        Self::load_from_file(Self::default_path()).unwrap_or_else(|e| {
            log::warn!("Failed to load AF tuning, using defaults: {}", e);
            Self::default()
        })
    }

    /// Validate tuning values
    pub fn validate(&self) -> Result<(), String> {
        let scan = &self.scan;
        if scan.max_step == 0 {
            return Err("max_step must be greater than 0".to_string());
        }
        if scan.coarse_step == 0 || scan.coarse_step > scan.max_step {
            return Err("coarse_step must be between 1 and max_step".to_string());
        }
        if scan.fine_step == 0 || scan.fine_step >= scan.coarse_step {
            return Err("fine_step must be at least 1 and smaller than coarse_step".to_string());
        }
        if !(0.0..1.0).contains(&scan.peak_tolerance) {
            return Err("peak_tolerance must be in [0.0, 1.0)".to_string());
        }

        let monitor = &self.monitor;
        if !(monitor.out_of_focus_ratio > 0.0 && monitor.out_of_focus_ratio < 1.0) {
            return Err("out_of_focus_ratio must be in (0.0, 1.0)".to_string());
        }
        if monitor.out_of_focus_frames == 0 {
            return Err("out_of_focus_frames must be at least 1".to_string());
        }

        Ok(())
    }
}
