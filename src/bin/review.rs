use anyhow::{bail, Context, Result};
use std::time::Duration;

use pose_angle::config::{Config, DEFAULT_CONFIG_PATH};
use pose_angle::playback::{PlaybackSession, Scheduler};
use pose_angle::render::{Key, MinifbRenderer};
use pose_angle::video::{FrameSource, VideoFileSource};

/// 一時停止中の入力ポーリング間隔
const PAUSED_POLL: Duration = Duration::from_millis(15);

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        bail!("usage: {} <video> [config.toml]", args[0]);
    }
    let input = &args[1];
    let config_path = args.get(2).map(String::as_str).unwrap_or(DEFAULT_CONFIG_PATH);

    println!("=== Pose Angle Review ({}) ===", env!("GIT_VERSION"));
    println!("Space: 再生/一時停止  ←/→: コマ送り (一時停止中)  ↑/↓: 速度  Esc: 終了");

    let settings = Config::load_or_default(config_path)
        .and_then(|config| config.validate())
        .with_context(|| format!("failed to load {}", config_path))?;

    let mut source = VideoFileSource::open(input).with_context(|| format!("failed to open {}", input))?;
    let (width, height) = source.resolution();
    let mut session = PlaybackSession::new(
        source.total_frames(),
        source.fps(),
        &settings.speeds,
        settings.default_speed,
    )?;
    let total = session.total_frames();

    let mut window = MinifbRenderer::new("Pose Angle Review", width, height, settings.max_display_width)?;
    let scheduler = Scheduler::new();
    let flag = session.play_flag();

    let mut needs_redraw = true;
    let mut quit = false;

    while !quit && window.is_open() {
        if session.is_playing() {
            // 再生中のキーはフレーム処理の中で読み、再生フラグを落としてループを抜ける
            let mut speed_step: Option<isize> = None;
            let stats = scheduler.run(&mut session, &mut source, settings.loop_on_end, |index, frame| {
                window.draw_frame(&frame)?;
                window.draw_progress((index + 1) as f32 / total as f32);
                window.update()?;

                if !window.is_open() {
                    quit = true;
                    flag.set(false);
                }
                for key in window.pressed_keys() {
                    match key {
                        Key::Space => flag.set(false),
                        Key::Up | Key::Down => {
                            speed_step = Some(if key == Key::Up { 1 } else { -1 });
                            flag.set(false);
                        }
                        _ => {}
                    }
                }
                Ok(())
            })?;
            log::debug!(
                "played {} frames ({} loops, {} overruns)",
                stats.frames_rendered,
                stats.loops,
                stats.overruns
            );

            // 速度変更だけのための停止なら、そのまま再生を続ける
            if let Some(steps) = speed_step {
                let speed = settings.speeds.neighbour(session.speed(), steps);
                session.set_speed(&settings.speeds, speed)?;
                println!("速度: x{:.2}", speed);
                if !quit {
                    session.play();
                }
            }
            continue;
        }

        if needs_redraw {
            let index = session.current_frame_index();
            if let Some(frame) = scheduler.show_current(&session, &mut source)? {
                window.draw_frame(&frame)?;
                window.draw_progress((index + 1) as f32 / total as f32);
            }
            window.update()?;
            needs_redraw = false;
        } else {
            window.poll();
            std::thread::sleep(PAUSED_POLL);
        }

        for key in window.pressed_keys() {
            match key {
                Key::Space => session.play(),
                Key::Left | Key::Right => {
                    let current = session.current_frame_index();
                    let target = if key == Key::Left {
                        current.checked_sub(1)
                    } else {
                        Some(current + 1)
                    };
                    if let Some(target) = target {
                        match session.seek(target) {
                            Ok(()) => needs_redraw = true,
                            Err(e) => log::debug!("seek ignored: {}", e),
                        }
                    }
                }
                Key::Up | Key::Down => {
                    let steps = if key == Key::Up { 1 } else { -1 };
                    let speed = settings.speeds.neighbour(session.speed(), steps);
                    session.set_speed(&settings.speeds, speed)?;
                    println!("速度: x{:.2}", speed);
                }
                _ => {}
            }
        }
    }

    println!("終了");
    Ok(())
}
