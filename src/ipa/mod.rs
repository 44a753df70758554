//! Image processing algorithm interface
//!
//! Tuning algorithms (autofocus, auto exposure, auto white balance...) are
//! driven frame by frame by the pipeline: `configure` once per stream, then
//! `prepare` and `process` alternately for every frame. Algorithms share the
//! [`IpaContext`] so one algorithm's results are visible to the others.

use crate::af::{GridConfig, ScanState};
use crate::errors::AfError;
use crate::ipu3::{Ipu3Params, Ipu3Stats};

/// Width and height in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, serde::Serialize, serde::Deserialize)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl std::fmt::Display for Size {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Stream information handed to `configure`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub struct IpaConfigInfo {
    /// Output size of the bayer down-scaler, which the 3A statistics cover
    pub bds_output_size: Size,
}

/// Per-stream configuration fixed at `configure` time
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionConfiguration {
    /// AF statistics grid, `None` when AF is unavailable for the stream
    pub af_grid: Option<GridConfig>,
}

/// AF results published for other algorithms and frame metadata
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize)]
pub struct AfActiveState {
    /// Last requested VCM step
    pub focus: u32,
    pub state: ScanState,
    /// True once the search has converged
    pub stable: bool,
    /// Converged (or best so far) variance score
    pub max_variance: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActiveState {
    pub af: AfActiveState,
}

/// State shared by all algorithms of a stream
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IpaContext {
    pub configuration: SessionConfiguration,
    pub active_state: ActiveState,
}

/// A per-frame tuning algorithm
pub trait Algorithm {
    fn name(&self) -> &'static str;

    /// Configure for a new stream. Any state of a previous stream is lost.
    fn configure(&mut self, context: &mut IpaContext, info: &IpaConfigInfo) -> Result<(), AfError>;

    /// Fill the parameters applied to the upcoming frame
    fn prepare(&mut self, context: &mut IpaContext, params: &mut Ipu3Params);

    /// Consume the statistics of a completed frame. Never fails.
    fn process(&mut self, context: &mut IpaContext, stats: &Ipu3Stats);
}
