use crate::ipu3::YTableItem;

/// Which of the two y-table samples to score
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum YChannel {
    Y1,
    Y2,
}

impl YChannel {
    #[inline]
    fn sample(self, item: &YTableItem) -> f64 {
        match self {
            YChannel::Y1 => f64::from(item.y1_avg),
            YChannel::Y2 => f64::from(item.y2_avg),
        }
    }
}

/// Population variance of one channel across the grid.
///
/// Sharp edges spread block averages apart, so the spread of the block
/// luminances is used as the contrast score. An empty table scores 0.
pub fn estimate_variance(items: &[YTableItem], channel: YChannel) -> f64 {
    if items.is_empty() {
        return 0.0;
    }

    let count = items.len() as f64;
    let mean = items.iter().map(|item| channel.sample(item)).sum::<f64>() / count;

    items
        .iter()
        .map(|item| {
            let delta = channel.sample(item) - mean;
            delta * delta
        })
        .sum::<f64>()
        / count
}
