//! Runs the autofocus algorithm against a synthetic lens and prints the
//! per-frame trace.
//!
//! Usage: af-sim [--width <px>] [--height <px>] [--peak <step>] [--frames <n>]
//!               [--tuning <file.toml>] [--defocus-at <frame>] [--json]

use anyhow::{bail, Context, Result};
use crabcamera_af::testing::SyntheticLens;
use crabcamera_af::{
    AfAlgorithm, AfTuningConfig, Algorithm, IpaConfigInfo, IpaContext, Ipu3Params, Logger, Size,
};
use std::env;

#[derive(Debug, serde::Serialize)]
struct FrameTrace {
    frame: u64,
    lens_position: u32,
    state: &'static str,
    best_focus: u32,
    variance: f64,
    stable: bool,
}

struct Options {
    size: Size,
    peak: u32,
    frames: u64,
    tuning: Option<String>,
    defocus_at: Option<u64>,
    json: bool,
}

fn parse_args(args: &[String]) -> Result<Options> {
    let mut options = Options {
        size: Size::new(1920, 1080),
        peak: 250,
        frames: 200,
        tuning: None,
        defocus_at: None,
        json: false,
    };

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--width" => options.size.width = next_value(args, &mut i)?.parse()?,
            "--height" => options.size.height = next_value(args, &mut i)?.parse()?,
            "--peak" => options.peak = next_value(args, &mut i)?.parse()?,
            "--frames" => options.frames = next_value(args, &mut i)?.parse()?,
            "--tuning" => options.tuning = Some(next_value(args, &mut i)?.to_string()),
            "--defocus-at" => options.defocus_at = Some(next_value(args, &mut i)?.parse()?),
            "--json" => options.json = true,
            other => bail!("Unknown argument: {}", other),
        }
        i += 1;
    }

    Ok(options)
}

fn next_value<'a>(args: &'a [String], i: &mut usize) -> Result<&'a str> {
    let flag = &args[*i];
    *i += 1;
    args.get(*i)
        .map(String::as_str)
        .with_context(|| format!("{} needs a value", flag))
}

fn main() -> Result<()> {
    crabcamera_af::init_logging();

    let args: Vec<String> = env::args().collect();
    let options = parse_args(&args)?;

    let tuning = match &options.tuning {
        Some(path) => AfTuningConfig::load_layered(path)?,
        None => AfTuningConfig::default(),
    };
    if !tuning.logging.levels.is_empty() {
        Logger::init_with(&tuning.logging.levels);
    }

    let mut af = AfAlgorithm::new(tuning);
    let mut context = IpaContext::default();
    af.configure(
        &mut context,
        &IpaConfigInfo {
            bds_output_size: options.size,
        },
    )
    .with_context(|| format!("AF unavailable for {}", options.size))?;

    let grid = *af.grid().context("grid missing after configure")?;
    let lens = SyntheticLens::new(options.peak);
    // After the defocus frame the subject moves: peak shifts and contrast drops
    let moved = SyntheticLens::new(options.peak / 2).with_contrast(lens.contrast * 0.6);

    let mut traces = Vec::with_capacity(options.frames as usize);
    for frame in 0..options.frames {
        let mut params = Ipu3Params::default();
        af.prepare(&mut context, &mut params);

        let scene = match options.defocus_at {
            Some(at) if frame >= at => &moved,
            _ => &lens,
        };
        let stats = scene.stats(&grid, params.lens_position, frame);
        af.process(&mut context, &stats);

        let trace = FrameTrace {
            frame,
            lens_position: params.lens_position,
            state: context.active_state.af.state.as_str(),
            best_focus: af.context().best_focus,
            variance: af.context().current_variance,
            stable: context.active_state.af.stable,
        };

        if !options.json {
            println!(
                "{:>5} step {:>5} {:>8} best {:>5} variance {:>14.1}",
                trace.frame, trace.lens_position, trace.state, trace.best_focus, trace.variance
            );
        }
        traces.push(trace);
    }

    if options.json {
        println!("{}", serde_json::to_string_pretty(&traces)?);
    }

    Ok(())
}
