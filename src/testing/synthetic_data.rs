//! Synthetic AF statistics
//!
//! Models a checkerboard target seen through a lens whose sharpness peaks
//! at one VCM step and falls off smoothly on both sides. Block contrast is
//! proportional to sharpness, so the variance score is unimodal in the
//! lens position with its maximum at the peak step.

use crate::af::GridConfig;
use crate::ipu3::{Ipu3Stats, StatisticsTable, YTableItem};

/// A lens focused on a checkerboard target
#[derive(Debug, Clone, PartialEq)]
pub struct SyntheticLens {
    /// VCM step with the sharpest image
    pub peak_step: u32,
    /// Distance in steps at which contrast halves
    pub depth_of_field: f64,
    /// Block luminance swing at perfect focus
    pub contrast: f64,
    /// Mean block luminance
    pub base_luma: u16,
}

impl SyntheticLens {
    pub fn new(peak_step: u32) -> Self {
        Self {
            peak_step,
            depth_of_field: 60.0,
            contrast: 4000.0,
            base_luma: 8192,
        }
    }

    /// Same target with a different contrast, e.g. after a scene change
    pub fn with_contrast(mut self, contrast: f64) -> Self {
        self.contrast = contrast;
        self
    }

    /// Relative sharpness in (0, 1], 1 at the peak step
    pub fn sharpness(&self, step: u32) -> f64 {
        let distance = (f64::from(step) - f64::from(self.peak_step)) / self.depth_of_field;
        1.0 / (1.0 + distance * distance)
    }

    /// Variance score of a checkerboard block pattern at `step`
    pub fn variance_at(&self, step: u32) -> f64 {
        let amplitude = self.contrast * self.sharpness(step);
        amplitude * amplitude
    }

    /// Statistics the hardware would report at `step`.
    ///
    /// A frame-dependent flicker offset shifts both channels uniformly,
    /// which leaves the variance untouched.
    pub fn table(&self, grid: &GridConfig, step: u32, frame: u64) -> StatisticsTable {
        let amplitude = self.contrast * self.sharpness(step);
        let flicker = (frame % 8) as f64 * 16.0;
        let base = f64::from(self.base_luma);

        let mut items = Vec::with_capacity(grid.cells());
        for y in 0..grid.height {
            for x in 0..grid.width {
                let sign = if (x + y) % 2 == 0 { 1.0 } else { -1.0 };
                let y1 = base + flicker + sign * amplitude;
                let y2 = base - flicker + sign * amplitude;
                items.push(YTableItem::new(to_luma(y1), to_luma(y2)));
            }
        }
        StatisticsTable::new(items)
    }

    pub fn stats(&self, grid: &GridConfig, step: u32, frame: u64) -> Ipu3Stats {
        Ipu3Stats::from_table(&self.table(grid, step, frame))
    }
}

/// A table with every cell at `value`
pub fn flat_table(cells: usize, value: u16) -> StatisticsTable {
    StatisticsTable::new(vec![YTableItem::new(value, value); cells])
}

fn to_luma(value: f64) -> u16 {
    value.round().clamp(0.0, f64::from(u16::MAX)) as u16
}
