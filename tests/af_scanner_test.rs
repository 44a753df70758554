//! Focus scanner behaviour
//!
//! Drives the coarse/fine search with synthetic variance curves, frame by
//! frame, the way the algorithm facade does: the settling filter is
//! consulted first and only frames that pass it are scored.

use crabcamera_af::af::scanner::{FINE_WINDOW_IN_RANGE, STEP_IN_RANGE};
use crabcamera_af::af::{AfContext, FocusScanner, ScanState};
use crabcamera_af::config::AfTuningConfig;
use crabcamera_af::invariant_ppt::{clear_invariant_log, contract_test};
use crabcamera_af::testing::SyntheticLens;

fn tuning(max_step: u32, coarse_step: u32, fine_step: u32, settle_frames: u32) -> AfTuningConfig {
    let mut tuning = AfTuningConfig::default();
    tuning.scan.max_step = max_step;
    tuning.scan.coarse_step = coarse_step;
    tuning.scan.fine_step = fine_step;
    tuning.settle.frames = settle_frames;
    tuning
}

fn setup(tuning: &AfTuningConfig) -> (FocusScanner, AfContext) {
    assert!(tuning.validate().is_ok());
    let scanner = FocusScanner::new(tuning.scan.clone(), tuning.monitor.clone());
    let ctx = AfContext::new(tuning.scan.max_step, tuning.settle.frames);
    (scanner, ctx)
}

/// One call of the per-frame pipeline
fn process_frame<F: Fn(u32) -> f64>(scanner: &FocusScanner, ctx: &mut AfContext, curve: &F) {
    if ctx.settle.needs_ignore() {
        return;
    }
    let variance = curve(ctx.focus);
    scanner.advance(ctx, variance);
}

#[test]
fn test_converges_on_unimodal_peak_within_forty_frames() {
    let tuning = tuning(500, 50, 5, 2);
    let (scanner, mut ctx) = setup(&tuning);
    let lens = SyntheticLens::new(250);
    let curve = |step: u32| lens.variance_at(step);

    for _ in 0..40 {
        process_frame(&scanner, &mut ctx, &curve);
    }

    assert_eq!(ctx.state, ScanState::Focused);
    assert!(ctx.coarse_completed);
    assert!(ctx.fine_completed);
    assert!(
        (245..=255).contains(&ctx.best_focus),
        "best focus {} not near 250",
        ctx.best_focus
    );
    assert_eq!(ctx.focus, ctx.best_focus);
}

#[test]
fn test_refines_peak_between_coarse_steps() {
    let tuning = tuning(500, 50, 5, 2);
    let (scanner, mut ctx) = setup(&tuning);
    let lens = SyntheticLens::new(230);
    let curve = |step: u32| lens.variance_at(step);

    for _ in 0..80 {
        process_frame(&scanner, &mut ctx, &curve);
    }

    assert_eq!(ctx.state, ScanState::Focused);
    assert_eq!(ctx.best_focus, 230);
    // Coarse peak was 250, so the climb had to turn downward
    assert_eq!(ctx.coarse_best, 250);
}

#[test]
fn test_peak_at_end_of_travel() {
    let tuning = tuning(500, 50, 5, 1);
    let (scanner, mut ctx) = setup(&tuning);
    let curve = |step: u32| f64::from(step) * 10.0;

    for _ in 0..100 {
        process_frame(&scanner, &mut ctx, &curve);
    }

    assert_eq!(ctx.state, ScanState::Focused);
    assert_eq!(ctx.best_focus, 500);
    assert_eq!(ctx.focus, 500);
}

#[test]
fn test_peak_at_start_of_travel() {
    let tuning = tuning(500, 50, 5, 1);
    let (scanner, mut ctx) = setup(&tuning);
    let curve = |step: u32| 1000.0 - f64::from(step);

    for _ in 0..100 {
        process_frame(&scanner, &mut ctx, &curve);
    }

    assert_eq!(ctx.state, ScanState::Focused);
    assert_eq!(ctx.best_focus, 0);
    assert_eq!(ctx.fine_low, 0);
}

/// Coarse readings at 0, 50, 100, 150 and 200 with a shallow dip at 100
fn dipping_curve(step: u32) -> f64 {
    match step {
        0 => 100.0,
        50 => 200.0,
        100 => 180.0,
        150 => 300.0,
        200 => 200.0,
        _ => 0.0,
    }
}

fn run_coarse(tuning: &AfTuningConfig) -> AfContext {
    let (scanner, mut ctx) = setup(tuning);
    for _ in 0..20 {
        if ctx.coarse_completed {
            break;
        }
        process_frame(&scanner, &mut ctx, &dipping_curve);
    }
    assert!(ctx.coarse_completed);
    ctx
}

#[test]
fn test_peak_tolerance_rides_through_shallow_dip() {
    let mut tolerant = tuning(500, 50, 5, 0);
    tolerant.scan.peak_tolerance = 0.2;

    // 180 is within 20% of 200, 200 is not within 20% of 300
    let ctx = run_coarse(&tolerant);
    assert_eq!(ctx.coarse_best, 150);
    assert_eq!((ctx.fine_low, ctx.fine_high), (100, 200));
    assert_eq!(ctx.focus, 150);
}

#[test]
fn test_zero_tolerance_stops_at_first_dip() {
    let strict = tuning(500, 50, 5, 0);
    assert_eq!(strict.scan.peak_tolerance, 0.0);

    let ctx = run_coarse(&strict);
    assert_eq!(ctx.coarse_best, 50);
    assert_eq!(ctx.focus, 50);
}

#[test]
fn test_settling_frames_hold_the_search() {
    let tuning = tuning(500, 50, 5, 3);
    let (scanner, mut ctx) = setup(&tuning);
    let curve = |step: u32| f64::from(step);

    // Reset frame, then the first coarse reading at step 0
    process_frame(&scanner, &mut ctx, &curve);
    assert_eq!(ctx.state, ScanState::CoarseScan);
    for _ in 0..3 {
        process_frame(&scanner, &mut ctx, &curve);
        assert_eq!(ctx.focus, 0);
    }
    process_frame(&scanner, &mut ctx, &curve);
    assert_eq!(ctx.focus, 50);

    let snapshot = ctx.clone();
    for _ in 0..2 {
        process_frame(&scanner, &mut ctx, &curve);
    }
    assert_eq!(ctx.focus, snapshot.focus);
    assert_eq!(ctx.best_focus, snapshot.best_focus);
    assert_eq!(ctx.settle.remaining(), 1);
}

#[test]
fn test_sustained_defocus_restarts_search() {
    let tuning = tuning(500, 50, 5, 2);
    let (scanner, mut ctx) = setup(&tuning);
    let lens = SyntheticLens::new(250);

    for _ in 0..40 {
        process_frame(&scanner, &mut ctx, &|step| lens.variance_at(step));
    }
    assert_eq!(ctx.state, ScanState::Focused);
    let converged = ctx.focus;

    // Scene change: contrast collapses to a tenth
    let dimmed = lens.clone().with_contrast(lens.contrast * 0.1);
    let frames = tuning.monitor.out_of_focus_frames;
    for frame in 0..frames {
        assert_eq!(ctx.state, ScanState::Focused, "left Focused early at {}", frame);
        process_frame(&scanner, &mut ctx, &|step| dimmed.variance_at(step));
    }
    assert_eq!(ctx.state, ScanState::Reset);
    // Lens is held until the search restarts
    assert_eq!(ctx.focus, converged);

    process_frame(&scanner, &mut ctx, &|step| dimmed.variance_at(step));
    assert_eq!(ctx.state, ScanState::CoarseScan);
    assert_eq!(ctx.focus, 0);
    assert!(!ctx.coarse_completed);
    assert!(!ctx.fine_completed);
}

#[test]
fn test_brief_dip_keeps_focus() {
    let tuning = tuning(500, 50, 5, 0);
    let (scanner, mut ctx) = setup(&tuning);
    let lens = SyntheticLens::new(120);

    for _ in 0..60 {
        process_frame(&scanner, &mut ctx, &|step| lens.variance_at(step));
    }
    assert_eq!(ctx.state, ScanState::Focused);

    let dimmed = lens.clone().with_contrast(lens.contrast * 0.1);
    for _ in 0..tuning.monitor.out_of_focus_frames - 1 {
        process_frame(&scanner, &mut ctx, &|step| dimmed.variance_at(step));
    }
    process_frame(&scanner, &mut ctx, &|step| lens.variance_at(step));
    assert_eq!(ctx.state, ScanState::Focused);
    assert_eq!(ctx.out_of_focus_frames, 0);
}

#[test]
fn test_step_is_clamped_to_max_step() {
    let tuning = tuning(120, 50, 5, 0);
    let (scanner, mut ctx) = setup(&tuning);
    let curve = |step: u32| f64::from(step);

    let mut seen = Vec::new();
    for _ in 0..60 {
        process_frame(&scanner, &mut ctx, &curve);
        seen.push(ctx.focus);
    }

    assert!(seen.iter().all(|step| *step <= 120));
    assert!(seen.contains(&120));
    assert_eq!(ctx.state, ScanState::Focused);
}

#[test]
fn contract_scanner_checks_its_invariants() {
    clear_invariant_log();
    let tuning = tuning(500, 50, 5, 0);
    let (scanner, mut ctx) = setup(&tuning);
    let lens = SyntheticLens::new(250);

    for _ in 0..30 {
        process_frame(&scanner, &mut ctx, &|step| lens.variance_at(step));
    }

    contract_test("focus scanner", &[STEP_IN_RANGE, FINE_WINDOW_IN_RANGE]);
}
