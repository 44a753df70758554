use super::variance::YChannel;
use super::{AfContext, ScanDirection, ScanState};
use crate::assert_invariant;
use crate::config::{MonitorTuning, ScanTuning};

pub const STEP_IN_RANGE: &str = "Actuator step must stay within [0, max_step]";
pub const FINE_WINDOW_IN_RANGE: &str = "Fine window must lie within [0, max_step]";

/// Coarse-to-fine contrast search.
///
/// The scanner itself holds only tuning; all progress lives in the
/// [`AfContext`] so a fresh context is a fresh search.
#[derive(Debug, Clone)]
pub struct FocusScanner {
    scan: ScanTuning,
    monitor: MonitorTuning,
}

impl FocusScanner {
    pub fn new(scan: ScanTuning, monitor: MonitorTuning) -> Self {
        Self { scan, monitor }
    }

    pub fn scan_tuning(&self) -> &ScanTuning {
        &self.scan
    }

    /// Channel to score for the next frame. The coarse search reads y1,
    /// everything after it reads y2.
    pub fn channel(&self, ctx: &AfContext) -> YChannel {
        if ctx.coarse_completed {
            YChannel::Y2
        } else {
            YChannel::Y1
        }
    }

    /// Consume the score of one frame that passed the settling filter
    pub fn advance(&self, ctx: &mut AfContext, variance: f64) {
        ctx.previous_variance = ctx.current_variance;
        ctx.current_variance = variance;

        match ctx.state {
            ScanState::Reset => self.begin(ctx),
            ScanState::CoarseScan => self.coarse_scan(ctx),
            ScanState::FineScan => self.fine_scan(ctx),
            ScanState::Focused => self.monitor(ctx),
        }

        assert_invariant!(ctx.focus <= ctx.max_step, STEP_IN_RANGE, "Af");
    }

    /// The lens position is unknown on entry, so this frame is not scored
    fn begin(&self, ctx: &mut AfContext) {
        ctx.restart(self.scan.max_step);
        ctx.state = ScanState::CoarseScan;
        ctx.settle.reset();
    }

    fn coarse_scan(&self, ctx: &mut AfContext) {
        let variance = ctx.current_variance;

        if variance >= ctx.peak_variance * (1.0 - self.scan.peak_tolerance) {
            if variance >= ctx.peak_variance {
                ctx.best_focus = ctx.focus;
                ctx.peak_variance = variance;
            }
            if ctx.focus < ctx.max_step {
                self.move_to(ctx, ctx.focus.saturating_add(self.scan.coarse_step));
                return;
            }
        }

        self.finish_coarse(ctx);
    }

    fn finish_coarse(&self, ctx: &mut AfContext) {
        let best = ctx.best_focus;

        ctx.coarse_completed = true;
        ctx.coarse_best = best;
        ctx.fine_low = best.saturating_sub(self.scan.coarse_step);
        ctx.fine_high = best.saturating_add(self.scan.coarse_step).min(ctx.max_step);
        ctx.fine_direction = ScanDirection::Up;
        // The fine search scores the other channel, start from scratch
        ctx.peak_variance = 0.0;
        ctx.current_variance = 0.0;
        ctx.state = ScanState::FineScan;

        assert_invariant!(
            ctx.fine_low <= best && best <= ctx.fine_high && ctx.fine_high <= ctx.max_step,
            FINE_WINDOW_IN_RANGE,
            "Af"
        );

        self.move_to(ctx, best);
    }

    /// Hill climb in the fine window. The first frame re-measures the coarse
    /// best; the climb goes up first and turns down only if the very first
    /// upward step fails.
    fn fine_scan(&self, ctx: &mut AfContext) {
        let variance = ctx.current_variance;
        let improved = variance >= ctx.peak_variance;

        if improved {
            ctx.best_focus = ctx.focus;
            ctx.peak_variance = variance;
            if let Some(next) = self.fine_next(ctx, ctx.focus) {
                self.move_to(ctx, next);
                return;
            }
        }

        if ctx.fine_direction == ScanDirection::Up && ctx.best_focus == ctx.coarse_best {
            ctx.fine_direction = ScanDirection::Down;
            if let Some(next) = self.fine_next(ctx, ctx.coarse_best) {
                self.move_to(ctx, next);
                return;
            }
        }

        self.finish_fine(ctx);
    }

    fn fine_next(&self, ctx: &AfContext, from: u32) -> Option<u32> {
        match ctx.fine_direction {
            ScanDirection::Up => from
                .checked_add(self.scan.fine_step)
                .filter(|step| *step <= ctx.fine_high),
            ScanDirection::Down => from
                .checked_sub(self.scan.fine_step)
                .filter(|step| *step >= ctx.fine_low),
        }
    }

    fn finish_fine(&self, ctx: &mut AfContext) {
        ctx.fine_completed = true;
        ctx.out_of_focus_frames = 0;
        ctx.state = ScanState::Focused;
        self.move_to(ctx, ctx.best_focus);
    }

    /// Hold the lens and watch for a sustained drop of the score
    fn monitor(&self, ctx: &mut AfContext) {
        let threshold = ctx.peak_variance * self.monitor.out_of_focus_ratio;

        if ctx.current_variance < threshold {
            ctx.out_of_focus_frames += 1;
            if ctx.out_of_focus_frames >= self.monitor.out_of_focus_frames {
                ctx.state = ScanState::Reset;
            }
        } else {
            ctx.out_of_focus_frames = 0;
        }
    }

    /// Command a new step. Any change invalidates the next frames.
    fn move_to(&self, ctx: &mut AfContext, step: u32) {
        let step = step.min(ctx.max_step);
        if step != ctx.focus {
            ctx.focus = step;
            ctx.settle.reset();
        }
    }
}
