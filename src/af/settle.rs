/// Drops the frames captured while the lens is still moving.
///
/// Statistics lag the actuator: after a step change the next few frames
/// still describe the old lens position. `reset()` arms the filter with the
/// configured latency and every `needs_ignore()` that returns true consumes
/// one frame of it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettlingFilter {
    settle_frames: u32,
    remaining: u32,
}

impl SettlingFilter {
    /// A disarmed filter that will wait `settle_frames` frames after each reset
    pub fn new(settle_frames: u32) -> Self {
        Self {
            settle_frames,
            remaining: 0,
        }
    }

    pub fn reset(&mut self) {
        self.remaining = self.settle_frames;
    }

    /// Whether the current frame must be discarded. Counts the frame.
    pub fn needs_ignore(&mut self) -> bool {
        if self.remaining == 0 {
            return false;
        }
        self.remaining -= 1;
        true
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    pub fn settle_frames(&self) -> u32 {
        self.settle_frames
    }
}
