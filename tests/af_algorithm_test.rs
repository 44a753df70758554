//! Autofocus algorithm end-to-end
//!
//! Exercises the configure / prepare / process contract the pipeline drives,
//! with statistics generated by a synthetic lens from the parameters the
//! algorithm itself requested.

use crabcamera_af::af::{AfAlgorithm, GridBounds, ScanState, AF_CATEGORY};
use crabcamera_af::config::AfTuningConfig;
use crabcamera_af::ipa::{Algorithm, IpaConfigInfo, IpaContext, Size};
use crabcamera_af::ipu3::{Ipu3Params, Ipu3Stats, GRID_Y_START_EN};
use crabcamera_af::testing::{flat_table, SyntheticLens};
use crabcamera_af::AfError;

fn fast_tuning() -> AfTuningConfig {
    let mut tuning = AfTuningConfig::default();
    tuning.scan.max_step = 500;
    tuning.scan.coarse_step = 50;
    tuning.scan.fine_step = 5;
    tuning.settle.frames = 2;
    tuning
}

fn configured(size: Size, tuning: AfTuningConfig) -> (AfAlgorithm, IpaContext) {
    let mut af = AfAlgorithm::new(tuning);
    let mut context = IpaContext::default();
    af.configure(
        &mut context,
        &IpaConfigInfo {
            bds_output_size: size,
        },
    )
    .expect("configure should succeed");
    (af, context)
}

/// Run `frames` prepare/process cycles against `lens`, starting at `first`
fn run_frames(
    af: &mut AfAlgorithm,
    context: &mut IpaContext,
    lens: &SyntheticLens,
    first: u64,
    frames: u64,
) {
    let grid = *af.grid().expect("AF enabled");
    for frame in first..first + frames {
        let mut params = Ipu3Params::default();
        af.prepare(context, &mut params);
        let stats = lens.stats(&grid, params.lens_position, frame);
        af.process(context, &stats);
    }
}

#[test]
fn test_algorithm_name_matches_category() {
    let af = AfAlgorithm::default();
    assert_eq!(af.name(), AF_CATEGORY);
    assert!(!af.is_enabled());
}

#[test]
fn test_configure_minimum_grid() {
    let (af, context) = configured(Size::new(256, 128), AfTuningConfig::default());

    let grid = af.grid().expect("grid");
    assert_eq!((grid.width, grid.height), (16, 16));
    assert_eq!((grid.block_width_log2, grid.block_height_log2), (4, 3));
    assert_eq!(grid.height_per_slice, 2);
    assert_eq!(context.configuration.af_grid, Some(*grid));
    assert_eq!(af.context().state, ScanState::Reset);
}

#[test]
fn test_short_table_is_ignored() {
    let (mut af, mut context) = configured(Size::new(256, 128), AfTuningConfig::default());
    let before = af.context().clone();

    let short = flat_table(16 * 16 - 1, 1000);
    af.process(&mut context, &Ipu3Stats::from_table(&short));

    assert_eq!(af.context().focus, before.focus);
    assert_eq!(af.context().state, ScanState::Reset);
    assert_eq!(af.context(), &before);
}

#[test]
fn test_short_table_mid_scan_is_ignored() {
    let mut tuning = fast_tuning();
    tuning.settle.frames = 0;
    let (mut af, mut context) = configured(Size::new(256, 128), tuning);
    let lens = SyntheticLens::new(300);

    // Reset frame, then coarse readings at 0, 50 and 100
    run_frames(&mut af, &mut context, &lens, 0, 4);
    assert_eq!(af.context().state, ScanState::CoarseScan);
    assert_eq!(af.context().focus, 150);

    let before = af.context().clone();
    let published = context.active_state.af.clone();
    let short = flat_table(16 * 16 - 1, 1000);
    af.process(&mut context, &Ipu3Stats::from_table(&short));

    assert_eq!(af.context(), &before);
    assert_eq!(context.active_state.af, published);

    // The search picks up where it was
    run_frames(&mut af, &mut context, &lens, 4, 1);
    assert_eq!(af.context().focus, 200);
}

#[test]
fn test_invalid_bounds_disable_af() {
    let bounds = GridBounds {
        width: 0..=32,
        block_width_log2: 4..=40,
        ..GridBounds::default()
    };
    let mut af = AfAlgorithm::with_bounds(AfTuningConfig::default(), bounds);
    let mut context = IpaContext::default();

    let result = af.configure(
        &mut context,
        &IpaConfigInfo {
            bds_output_size: Size::new(8, 128),
        },
    );
    assert!(matches!(result, Err(AfError::GridError(_))));
    assert!(!af.is_enabled());
}

#[test]
fn test_longer_table_is_truncated_to_grid() {
    let (mut af, mut context) = configured(Size::new(256, 128), AfTuningConfig::default());

    let long = flat_table(32 * 24, 1000);
    af.process(&mut context, &Ipu3Stats::from_table(&long));

    assert_eq!(af.context().state, ScanState::CoarseScan);
}

#[test]
fn test_empty_stats_never_fail() {
    let (mut af, mut context) = configured(Size::new(1280, 720), fast_tuning());
    for _ in 0..10 {
        af.process(&mut context, &Ipu3Stats::default());
    }
    assert_eq!(af.context().state, ScanState::Reset);
}

#[test]
fn test_configure_failure_disables_af() {
    let mut af = AfAlgorithm::new(AfTuningConfig::default());
    let mut context = IpaContext::default();

    let result = af.configure(
        &mut context,
        &IpaConfigInfo {
            bds_output_size: Size::new(160, 120),
        },
    );
    assert!(matches!(result, Err(AfError::GridError(_))));
    assert!(!af.is_enabled());
    assert_eq!(context.configuration.af_grid, None);

    let mut params = Ipu3Params::default();
    af.prepare(&mut context, &mut params);
    assert_eq!(params, Ipu3Params::default());

    let lens = SyntheticLens::new(100);
    let fallback_grid = crabcamera_af::af::configure_grid(
        Size::new(256, 128),
        &crabcamera_af::af::GridBounds::default(),
    )
    .unwrap();
    af.process(&mut context, &lens.stats(&fallback_grid, 0, 0));
    assert_eq!(af.context().state, ScanState::Reset);
}

#[test]
fn test_prepare_programs_grid_and_lens() {
    let (mut af, mut context) = configured(Size::new(1920, 1080), fast_tuning());
    let grid = *af.grid().unwrap();

    let mut params = Ipu3Params::default();
    af.prepare(&mut context, &mut params);

    assert!(params.use_acc_af);
    assert_eq!(params.af_grid, grid.to_record());
    assert_eq!(params.af_grid.y_start & GRID_Y_START_EN, GRID_Y_START_EN);
    assert_eq!(params.lens_position, 0);

    let decoded = Ipu3Params::from_bytes(&params.to_bytes()).unwrap();
    assert_eq!(decoded, params);
}

#[test]
fn test_end_to_end_convergence() {
    let (mut af, mut context) = configured(Size::new(1920, 1080), fast_tuning());
    let lens = SyntheticLens::new(250);

    run_frames(&mut af, &mut context, &lens, 0, 40);

    assert_eq!(af.context().state, ScanState::Focused);
    assert!((245..=255).contains(&af.context().best_focus));
    assert!(context.active_state.af.stable);
    assert_eq!(context.active_state.af.focus, af.context().focus);

    let mut params = Ipu3Params::default();
    af.prepare(&mut context, &mut params);
    assert_eq!(params.lens_position, af.context().best_focus);
}

#[test]
fn test_scene_change_triggers_rescan() {
    let (mut af, mut context) = configured(Size::new(1920, 1080), fast_tuning());
    let lens = SyntheticLens::new(250);
    run_frames(&mut af, &mut context, &lens, 0, 40);
    assert_eq!(af.context().state, ScanState::Focused);

    // Subject moved closer: the peak shifts and the held position blurs
    let moved = SyntheticLens::new(400);
    run_frames(&mut af, &mut context, &moved, 40, 3);
    assert_eq!(af.context().state, ScanState::Reset);
    assert!(!context.active_state.af.stable);

    run_frames(&mut af, &mut context, &moved, 43, 80);
    assert_eq!(af.context().state, ScanState::Focused);
    assert!((395..=405).contains(&af.context().best_focus));
}

#[test]
fn test_reconfigure_discards_search() {
    let (mut af, mut context) = configured(Size::new(1920, 1080), fast_tuning());
    run_frames(&mut af, &mut context, &SyntheticLens::new(250), 0, 20);
    assert_ne!(af.context().state, ScanState::Reset);

    af.configure(
        &mut context,
        &IpaConfigInfo {
            bds_output_size: Size::new(1280, 720),
        },
    )
    .unwrap();
    assert_eq!(af.context().state, ScanState::Reset);
    assert_eq!(af.context().focus, 0);
    assert_eq!(af.context().settle.remaining(), 0);
}

#[test]
fn test_streams_are_independent() {
    let (mut near, mut near_ctx) = configured(Size::new(1920, 1080), fast_tuning());
    let (mut far, mut far_ctx) = configured(Size::new(1280, 720), fast_tuning());

    run_frames(&mut near, &mut near_ctx, &SyntheticLens::new(100), 0, 60);
    run_frames(&mut far, &mut far_ctx, &SyntheticLens::new(450), 0, 60);

    assert!((95..=105).contains(&near.context().best_focus));
    assert!((445..=455).contains(&far.context().best_focus));
}
