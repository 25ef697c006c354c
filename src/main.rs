use anyhow::{bail, Context, Result};
use std::io::{self, Write};

use pose_angle::config::{Config, DEFAULT_CONFIG_PATH};
use pose_angle::pipeline::run_analysis;
use pose_angle::pose::MoveNetDetector;
use pose_angle::render::OpenCvOverlay;
use pose_angle::video::{FrameSource, VideoFileSink, VideoFileSource};

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 3 {
        bail!("usage: {} <input video> <output video> [config.toml]", args[0]);
    }
    let (input, output) = (&args[1], &args[2]);
    let config_path = args.get(3).map(String::as_str).unwrap_or(DEFAULT_CONFIG_PATH);

    println!("=== Pose Angle ({}) ===", env!("GIT_VERSION"));

    let config = Config::load_or_default(config_path)
        .with_context(|| format!("failed to load {}", config_path))?;
    let settings = config.validate().context("invalid configuration")?;

    let mut source = VideoFileSource::open(input).with_context(|| format!("failed to open {}", input))?;
    let (width, height) = source.resolution();
    let fps = source.fps();
    println!(
        "入力: {} ({}x{}, {:.2} fps, {} frames)",
        input,
        width,
        height,
        fps,
        source.total_frames()
    );

    println!("モデル読み込み: {}", config.detection.model);
    let mut detector = MoveNetDetector::new(&config.detection.model)
        .with_context(|| format!("failed to load model {}", config.detection.model))?;
    let mut overlay = OpenCvOverlay::new();

    let report = run_analysis(
        &settings,
        &mut source,
        &mut detector,
        &mut overlay,
        |codec| VideoFileSink::create(output, codec, fps, (width, height)),
        |done, total| {
            if total > 0 {
                print!("\r処理中: {}/{} ({:.0}%)", done, total, done as f32 * 100.0 / total as f32);
            } else {
                print!("\r処理中: {}", done);
            }
            let _ = io::stdout().flush();
        },
    )
    .with_context(|| format!("analysis of {} failed", input))?;
    println!();

    println!(
        "出力: {} ({} frames, codec {}, 計測 {} / 除外 {})",
        output, report.frames_written, report.codec, report.measurements_valid, report.measurements_gated
    );
    Ok(())
}
