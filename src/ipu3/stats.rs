use bytes::{Buf, BufMut, Bytes, BytesMut};

/// Capacity of the hardware AF y-table, in cells (32x24 grid)
pub const AF_Y_TABLE_MAX_CELLS: usize = 32 * 24;

/// One cell of the AF y-table: two independently sampled luminance averages
///
/// Layout: `y1_avg u16, y2_avg u16`, little endian, no padding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub struct YTableItem {
    pub y1_avg: u16,
    pub y2_avg: u16,
}

impl YTableItem {
    pub const SIZE: usize = 4;

    pub fn new(y1_avg: u16, y2_avg: u16) -> Self {
        Self { y1_avg, y2_avg }
    }
}

/// Row-major per-cell luminance table of one frame
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatisticsTable {
    items: Vec<YTableItem>,
}

impl StatisticsTable {
    pub fn new(items: Vec<YTableItem>) -> Self {
        Self { items }
    }

    /// Parse raw y-table bytes. A trailing partial cell is dropped.
    pub fn from_bytes(data: &[u8]) -> Self {
        let mut buf = data;
        let mut items = Vec::with_capacity(data.len() / YTableItem::SIZE);
        while buf.remaining() >= YTableItem::SIZE {
            let y1_avg = buf.get_u16_le();
            let y2_avg = buf.get_u16_le();
            items.push(YTableItem { y1_avg, y2_avg });
        }
        Self { items }
    }

    pub fn to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.items.len() * YTableItem::SIZE);
        for item in &self.items {
            buf.put_u16_le(item.y1_avg);
            buf.put_u16_le(item.y2_avg);
        }
        buf.freeze()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items(&self) -> &[YTableItem] {
        &self.items
    }

    /// The first `cells` entries, or `None` if the table is shorter
    pub fn cells(&self, cells: usize) -> Option<&[YTableItem]> {
        self.items.get(..cells)
    }
}

/// Incoming per-frame statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ipu3Stats {
    /// Raw AF y-table as written by the hardware
    pub af_y_table: Bytes,
}

impl Ipu3Stats {
    pub fn new(af_y_table: Bytes) -> Self {
        Self { af_y_table }
    }

    pub fn from_table(table: &StatisticsTable) -> Self {
        Self {
            af_y_table: table.to_bytes(),
        }
    }

    pub fn y_table(&self) -> StatisticsTable {
        StatisticsTable::from_bytes(&self.af_y_table)
    }
}
