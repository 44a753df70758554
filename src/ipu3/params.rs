use crate::errors::AfError;
use bytes::{Buf, BufMut, Bytes, BytesMut};

/// Enable bit carried in the top bit of the grid's `y_start` field
pub const GRID_Y_START_EN: u16 = 1 << 15;

/// AF statistics grid as programmed into the accelerator
///
/// Byte layout (13 bytes): `width u8, block_width_log2 u8, height u8,
/// block_height_log2 u8, height_per_slice u8, x_start u16, y_start u16,
/// x_end u16, y_end u16`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub struct AfGridRecord {
    pub width: u8,
    pub block_width_log2: u8,
    pub height: u8,
    pub block_height_log2: u8,
    pub height_per_slice: u8,
    pub x_start: u16,
    pub y_start: u16,
    pub x_end: u16,
    pub y_end: u16,
}

impl AfGridRecord {
    pub const SIZE: usize = 13;

    pub fn encode(&self, buf: &mut BytesMut) {
        buf.put_u8(self.width);
        buf.put_u8(self.block_width_log2);
        buf.put_u8(self.height);
        buf.put_u8(self.block_height_log2);
        buf.put_u8(self.height_per_slice);
        buf.put_u16_le(self.x_start);
        buf.put_u16_le(self.y_start);
        buf.put_u16_le(self.x_end);
        buf.put_u16_le(self.y_end);
    }

    pub fn decode<B: Buf>(buf: &mut B) -> Result<Self, AfError> {
        if buf.remaining() < Self::SIZE {
            return Err(AfError::PayloadError(format!(
                "AF grid record needs {} bytes, got {}",
                Self::SIZE,
                buf.remaining()
            )));
        }

        Ok(Self {
            width: buf.get_u8(),
            block_width_log2: buf.get_u8(),
            height: buf.get_u8(),
            block_height_log2: buf.get_u8(),
            height_per_slice: buf.get_u8(),
            x_start: buf.get_u16_le(),
            y_start: buf.get_u16_le(),
            x_end: buf.get_u16_le(),
            y_end: buf.get_u16_le(),
        })
    }
}

/// Outgoing per-frame parameters
///
/// Byte layout (18 bytes): `use_acc_af u8`, [`AfGridRecord`],
/// `lens_position u32`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub struct Ipu3Params {
    /// Whether the AF accelerator block should be (re)programmed
    pub use_acc_af: bool,
    pub af_grid: AfGridRecord,
    /// Requested VCM step
    pub lens_position: u32,
}

impl Ipu3Params {
    pub const SIZE: usize = 1 + AfGridRecord::SIZE + 4;

    pub fn to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(Self::SIZE);
        buf.put_u8(u8::from(self.use_acc_af));
        self.af_grid.encode(&mut buf);
        buf.put_u32_le(self.lens_position);
        buf.freeze()
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self, AfError> {
        if data.len() != Self::SIZE {
            return Err(AfError::PayloadError(format!(
                "parameter payload is {} bytes, expected {}",
                data.len(),
                Self::SIZE
            )));
        }

        let mut buf = data;
        let use_acc_af = match buf.get_u8() {
            0 => false,
            1 => true,
            other => {
                return Err(AfError::PayloadError(format!(
                    "invalid use_acc_af flag {}",
                    other
                )))
            }
        };
        let af_grid = AfGridRecord::decode(&mut buf)?;
        let lens_position = buf.get_u32_le();

        Ok(Self {
            use_acc_af,
            af_grid,
            lens_position,
        })
    }
}
