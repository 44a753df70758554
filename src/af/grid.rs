//! AF statistics grid negotiation
//!
//! The accelerator averages luminance over a grid of `width` x `height`
//! blocks of `2^block_width_log2` x `2^block_height_log2` pixels. The grid
//! must lie inside the BDS output; it is centred, and its origin is aligned
//! down to an even pixel.

use crate::errors::AfError;
use crate::ipa::Size;
use crate::ipu3::{AfGridRecord, GRID_Y_START_EN};
use std::ops::RangeInclusive;

pub const AF_MIN_GRID_WIDTH: u8 = 16;
pub const AF_MIN_GRID_HEIGHT: u8 = 16;
pub const AF_MAX_GRID_WIDTH: u8 = 32;
pub const AF_MAX_GRID_HEIGHT: u8 = 24;
pub const AF_MIN_GRID_BLOCK_WIDTH: u8 = 4;
pub const AF_MIN_GRID_BLOCK_HEIGHT: u8 = 3;
pub const AF_MAX_GRID_BLOCK_WIDTH: u8 = 6;
pub const AF_MAX_GRID_BLOCK_HEIGHT: u8 = 6;
pub const AF_DEFAULT_HEIGHT_PER_SLICE: u8 = 2;

/// Largest block size the placement fields can describe
pub const AF_MAX_BLOCK_LOG2: u8 = 15;

/// Hardware limits the grid must respect
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridBounds {
    pub width: RangeInclusive<u8>,
    pub height: RangeInclusive<u8>,
    pub block_width_log2: RangeInclusive<u8>,
    pub block_height_log2: RangeInclusive<u8>,
    pub height_per_slice: u8,
}

impl Default for GridBounds {
    fn default() -> Self {
        Self {
            width: AF_MIN_GRID_WIDTH..=AF_MAX_GRID_WIDTH,
            height: AF_MIN_GRID_HEIGHT..=AF_MAX_GRID_HEIGHT,
            block_width_log2: AF_MIN_GRID_BLOCK_WIDTH..=AF_MAX_GRID_BLOCK_WIDTH,
            block_height_log2: AF_MIN_GRID_BLOCK_HEIGHT..=AF_MAX_GRID_BLOCK_HEIGHT,
            height_per_slice: AF_DEFAULT_HEIGHT_PER_SLICE,
        }
    }
}

impl GridBounds {
    /// Reject limits no grid can be negotiated against
    pub fn validate(&self) -> Result<(), AfError> {
        for (name, cells) in [("width", &self.width), ("height", &self.height)] {
            if cells.is_empty() || *cells.start() == 0 {
                return Err(AfError::GridError(format!(
                    "grid {} range {}..={} must be non-empty and start at 1 or more",
                    name,
                    cells.start(),
                    cells.end()
                )));
            }
        }
        for (name, log2) in [
            ("block width", &self.block_width_log2),
            ("block height", &self.block_height_log2),
        ] {
            if log2.is_empty() || *log2.end() > AF_MAX_BLOCK_LOG2 {
                return Err(AfError::GridError(format!(
                    "{} log2 range {}..={} must be non-empty and at most {}",
                    name,
                    log2.start(),
                    log2.end(),
                    AF_MAX_BLOCK_LOG2
                )));
            }
        }
        Ok(())
    }
}

/// Negotiated grid layout, fixed until the next `configure`
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct GridConfig {
    /// Blocks per row
    pub width: u8,
    /// Block rows
    pub height: u8,
    pub block_width_log2: u8,
    pub block_height_log2: u8,
    /// Block rows the hardware streams out at a time
    pub height_per_slice: u8,
    pub x_start: u16,
    pub y_start: u16,
}

impl GridConfig {
    pub fn cells(&self) -> usize {
        usize::from(self.width) * usize::from(self.height)
    }

    pub fn block_width(&self) -> u32 {
        1 << self.block_width_log2
    }

    pub fn block_height(&self) -> u32 {
        1 << self.block_height_log2
    }

    /// Area covered by the grid, in pixels
    pub fn covered_size(&self) -> Size {
        Size::new(
            u32::from(self.width) * self.block_width(),
            u32::from(self.height) * self.block_height(),
        )
    }

    pub fn to_record(&self) -> AfGridRecord {
        let covered = self.covered_size();
        AfGridRecord {
            width: self.width,
            block_width_log2: self.block_width_log2,
            height: self.height,
            block_height_log2: self.block_height_log2,
            height_per_slice: self.height_per_slice,
            x_start: self.x_start,
            y_start: self.y_start | GRID_Y_START_EN,
            // Both fit: checked when the grid was negotiated
            x_end: (u32::from(self.x_start) + covered.width - 1) as u16,
            y_end: (u32::from(self.y_start) + covered.height - 1) as u16,
        }
    }
}

/// Pick the finest legal grid for `resolution`.
///
/// Along each axis the block count is the number of whole blocks that fit,
/// capped at the hardware maximum. The block size giving the most blocks
/// wins; ties go to the larger block, which covers more of the frame.
pub fn configure_grid(resolution: Size, bounds: &GridBounds) -> Result<GridConfig, AfError> {
    bounds.validate()?;

    if resolution.width == 0 || resolution.height == 0 {
        return Err(AfError::GridError(format!(
            "empty resolution {}",
            resolution
        )));
    }
    if resolution.width % 2 != 0 || resolution.height % 2 != 0 {
        return Err(AfError::GridError(format!(
            "resolution {} is not aligned to 2 pixels",
            resolution
        )));
    }

    let (width, block_width_log2) =
        fit_axis(resolution.width, &bounds.width, &bounds.block_width_log2).ok_or_else(|| {
            AfError::GridError(format!(
                "width {} cannot hold {} blocks of {} pixels",
                resolution.width,
                bounds.width.start(),
                1u32 << bounds.block_width_log2.start()
            ))
        })?;
    let (height, block_height_log2) =
        fit_axis(resolution.height, &bounds.height, &bounds.block_height_log2).ok_or_else(|| {
            AfError::GridError(format!(
                "height {} cannot hold {} blocks of {} pixels",
                resolution.height,
                bounds.height.start(),
                1u32 << bounds.block_height_log2.start()
            ))
        })?;

    let covered_width = u32::from(width) << block_width_log2;
    let covered_height = u32::from(height) << block_height_log2;
    let x_start = centred_start(resolution.width, covered_width);
    let y_start = centred_start(resolution.height, covered_height);

    // y_start shares its field with the enable bit; x_start is limited the same way
    let limit = u32::from(GRID_Y_START_EN);
    if x_start >= limit || y_start >= limit {
        return Err(AfError::GridError(format!(
            "grid origin ({}, {}) does not fit the hardware fields",
            x_start, y_start
        )));
    }
    let x_end = x_start + covered_width - 1;
    let y_end = y_start + covered_height - 1;
    if x_end > u32::from(u16::MAX) || y_end > u32::from(u16::MAX) {
        return Err(AfError::GridError(format!(
            "grid end ({}, {}) does not fit the hardware fields",
            x_end, y_end
        )));
    }

    Ok(GridConfig {
        width,
        height,
        block_width_log2,
        block_height_log2,
        height_per_slice: bounds.height_per_slice,
        x_start: x_start as u16,
        y_start: y_start as u16,
    })
}

/// Best `(cells, block_log2)` for one axis, if any block size fits the minimum
fn fit_axis(
    extent: u32,
    cells: &RangeInclusive<u8>,
    block_log2: &RangeInclusive<u8>,
) -> Option<(u8, u8)> {
    block_log2
        .clone()
        .filter_map(|log2| {
            let fitting = extent.checked_shr(u32::from(log2)).unwrap_or(0);
            let count = fitting.min(u32::from(*cells.end()));
            (count >= u32::from(*cells.start())).then_some((count as u8, log2))
        })
        .max()
}

fn centred_start(extent: u32, covered: u32) -> u32 {
    ((extent - covered) / 2) & !1
}
