//! Contrast-detection autofocus
//!
//! Per frame the accelerator reports a grid of block luminance averages.
//! Their variance is used as a sharpness score, and the focus actuator is
//! driven through a coarse search with large steps, then a fine search
//! around the coarse peak. Once converged the score is monitored and the
//! search restarts when it drops for a sustained run of frames.
//!
//! 1. `configure` negotiates the statistics grid ([`grid`])
//! 2. `prepare` programs the grid and the requested VCM step
//! 3. `process` drops settling frames ([`settle`]), scores the table
//!    ([`variance`]) and advances the search ([`scanner`])

pub mod grid;
pub mod scanner;
pub mod settle;
pub mod variance;

pub use grid::{configure_grid, GridBounds, GridConfig};
pub use scanner::FocusScanner;
pub use settle::SettlingFilter;
pub use variance::{estimate_variance, YChannel};

use crate::config::AfTuningConfig;
use crate::diagnostics::{LogCategory, LogSeverity, Logger};
use crate::diag;
use crate::errors::AfError;
use crate::ipa::{AfActiveState, Algorithm, IpaConfigInfo, IpaContext};
use crate::ipu3::{Ipu3Params, Ipu3Stats};
use std::sync::Arc;

/// Diagnostics category of the autofocus algorithm
pub const AF_CATEGORY: &str = "Af";

/// Search phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, serde::Serialize, serde::Deserialize)]
pub enum ScanState {
    #[default]
    Reset,
    CoarseScan,
    FineScan,
    Focused,
}

impl ScanState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScanState::Reset => "reset",
            ScanState::CoarseScan => "coarse",
            ScanState::FineScan => "fine",
            ScanState::Focused => "focused",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub enum ScanDirection {
    #[default]
    Up,
    Down,
}

/// Search state of one stream
#[derive(Debug, Clone, PartialEq)]
pub struct AfContext {
    /// Requested VCM step
    pub focus: u32,
    /// Sharpest step found so far in the current phase
    pub best_focus: u32,
    pub current_variance: f64,
    pub previous_variance: f64,
    /// Score at `best_focus`; the defocus reference once converged
    pub peak_variance: f64,
    pub settle: SettlingFilter,
    pub max_step: u32,
    pub coarse_completed: bool,
    pub fine_completed: bool,
    pub state: ScanState,
    pub coarse_best: u32,
    pub fine_low: u32,
    pub fine_high: u32,
    pub fine_direction: ScanDirection,
    /// Length of the current run of defocused readings
    pub out_of_focus_frames: u32,
}

impl AfContext {
    /// Reset-state defaults
    pub fn new(max_step: u32, settle_frames: u32) -> Self {
        Self {
            focus: 0,
            best_focus: 0,
            current_variance: 0.0,
            previous_variance: 0.0,
            peak_variance: 0.0,
            settle: SettlingFilter::new(settle_frames),
            max_step,
            coarse_completed: false,
            fine_completed: false,
            state: ScanState::Reset,
            coarse_best: 0,
            fine_low: 0,
            fine_high: max_step,
            fine_direction: ScanDirection::Up,
            out_of_focus_frames: 0,
        }
    }

    /// Back to Reset defaults, keeping the settle latency and its count
    pub(crate) fn restart(&mut self, max_step: u32) {
        let settle = self.settle.clone();
        *self = Self::new(max_step, settle.settle_frames());
        self.settle = settle;
    }

    pub fn is_stable(&self) -> bool {
        self.state == ScanState::Focused
    }
}

/// The autofocus algorithm of one stream
pub struct AfAlgorithm {
    tuning: AfTuningConfig,
    bounds: GridBounds,
    scanner: FocusScanner,
    context: AfContext,
    grid: Option<GridConfig>,
    category: Arc<LogCategory>,
}

impl AfAlgorithm {
    pub fn new(tuning: AfTuningConfig) -> Self {
        Self::with_bounds(tuning, GridBounds::default())
    }

    pub fn with_bounds(tuning: AfTuningConfig, bounds: GridBounds) -> Self {
        let scanner = FocusScanner::new(tuning.scan.clone(), tuning.monitor.clone());
        let context = AfContext::new(tuning.scan.max_step, tuning.settle.frames);
        Self {
            tuning,
            bounds,
            scanner,
            context,
            grid: None,
            category: Logger::category(AF_CATEGORY),
        }
    }

    pub fn context(&self) -> &AfContext {
        &self.context
    }

    pub fn grid(&self) -> Option<&GridConfig> {
        self.grid.as_ref()
    }

    /// False until a successful `configure`, and after a failed one
    pub fn is_enabled(&self) -> bool {
        self.grid.is_some()
    }

    pub fn tuning(&self) -> &AfTuningConfig {
        &self.tuning
    }

    fn publish(&self, context: &mut IpaContext) {
        context.active_state.af = AfActiveState {
            focus: self.context.focus,
            state: self.context.state,
            stable: self.context.is_stable(),
            max_variance: self.context.peak_variance,
        };
    }
}

impl Default for AfAlgorithm {
    fn default() -> Self {
        Self::new(AfTuningConfig::default())
    }
}

impl Algorithm for AfAlgorithm {
    fn name(&self) -> &'static str {
        AF_CATEGORY
    }

    fn configure(&mut self, context: &mut IpaContext, info: &IpaConfigInfo) -> Result<(), AfError> {
        self.context = AfContext::new(self.tuning.scan.max_step, self.tuning.settle.frames);

        match configure_grid(info.bds_output_size, &self.bounds) {
            Ok(grid) => {
                diag!(
                    self.category,
                    LogSeverity::Info,
                    "AF grid {}x{} blocks of {}x{} at ({}, {}) for {}",
                    grid.width,
                    grid.height,
                    grid.block_width(),
                    grid.block_height(),
                    grid.x_start,
                    grid.y_start,
                    info.bds_output_size
                );
                self.grid = Some(grid);
                context.configuration.af_grid = Some(grid);
                self.publish(context);
                Ok(())
            }
            Err(e) => {
                diag!(
                    self.category,
                    LogSeverity::Error,
                    "AF disabled for {}: {}",
                    info.bds_output_size,
                    e
                );
                self.grid = None;
                context.configuration.af_grid = None;
                self.publish(context);
                Err(e)
            }
        }
    }

    fn prepare(&mut self, _context: &mut IpaContext, params: &mut Ipu3Params) {
        let Some(grid) = self.grid else {
            return;
        };

        params.use_acc_af = true;
        params.af_grid = grid.to_record();
        params.lens_position = self.context.focus;
    }

    fn process(&mut self, context: &mut IpaContext, stats: &Ipu3Stats) {
        let Some(grid) = self.grid else {
            return;
        };

        if self.context.settle.needs_ignore() {
            diag!(
                self.category,
                LogSeverity::Debug,
                "Settling, {} frame(s) left at step {}",
                self.context.settle.remaining(),
                self.context.focus
            );
            return;
        }

        let table = stats.y_table();
        let Some(cells) = table.cells(grid.cells()) else {
            diag!(
                self.category,
                LogSeverity::Warn,
                "Dropping AF statistics with {} cells, grid has {}",
                table.len(),
                grid.cells()
            );
            return;
        };

        let channel = self.scanner.channel(&self.context);
        let variance = estimate_variance(cells, channel);
        let previous = self.context.state;

        self.scanner.advance(&mut self.context, variance);

        diag!(
            self.category,
            LogSeverity::Debug,
            "{} {:?} variance {:.2} -> step {} (best {})",
            previous.as_str(),
            channel,
            variance,
            self.context.focus,
            self.context.best_focus
        );
        if self.context.state != previous {
            let severity = match self.context.state {
                ScanState::Focused | ScanState::Reset => LogSeverity::Info,
                _ => LogSeverity::Debug,
            };
            diag!(
                self.category,
                severity,
                "AF {} -> {} at step {}",
                previous.as_str(),
                self.context.state.as_str(),
                self.context.focus
            );
        }

        self.publish(context);
    }
}
