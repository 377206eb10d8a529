//! Headless frame loop

use anyhow::Result;
use frameline_animation::{AnimationScheduler, Animator};
use std::io::Write;
use std::thread;

use crate::scene::Scene;

/// How sampled frames are printed
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Debug, Clone)]
pub struct PlayOptions {
    pub fps: u32,
    /// Stop after this many seconds; `None` plays until the timeline finishes
    pub seconds: Option<f32>,
    /// Print every n-th frame (the last frame is always printed)
    pub every: usize,
    pub format: OutputFormat,
    /// Sleep between frames and advance by measured wall time
    pub realtime: bool,
}

/// Drive the scene's root timeline and write one line per printed frame.
///
/// Returns the number of frames advanced.
pub fn play(scene: &Scene, options: &PlayOptions, out: &mut impl Write) -> Result<usize> {
    let root = &scene.root;
    let unbounded = root.loops() && root.max_loop_count().is_none();
    if unbounded && options.seconds.is_none() {
        anyhow::bail!("The timeline loops forever; set `clock.seconds` or pass --seconds");
    }

    let mut scheduler = AnimationScheduler::new();
    scheduler.set_target_fps(options.fps);
    scheduler.add(root);
    let dt = scheduler.frame_interval().as_secs_f32();
    let frame_budget = options
        .seconds
        .map(|seconds| (seconds.max(0.0) * options.fps as f32).round() as usize);
    let every = options.every.max(1);

    tracing::info!(fps = options.fps, duration = root.duration(), "playing scene");
    root.start_animation();

    let mut elapsed = 0.0_f32;
    let mut frame = 0_usize;
    loop {
        let done = match frame_budget {
            Some(budget) => frame >= budget,
            None => !scheduler.has_active_animations(),
        };
        if done {
            break;
        }

        if options.realtime {
            thread::sleep(scheduler.frame_interval());
            elapsed += scheduler.tick();
        } else {
            scheduler.advance(dt);
            elapsed += dt;
        }
        frame += 1;

        let last = match frame_budget {
            Some(budget) => frame >= budget,
            None => !scheduler.has_active_animations(),
        };
        if frame % every == 0 || last {
            write_frame(scene, frame, elapsed, options.format, out)?;
        }
    }

    tracing::info!(frames = frame, elapsed, "playback finished");
    Ok(frame)
}

fn write_frame(
    scene: &Scene,
    frame: usize,
    elapsed: f32,
    format: OutputFormat,
    out: &mut impl Write,
) -> Result<()> {
    let snapshot = scene.board.snapshot();
    match format {
        OutputFormat::Text => {
            write!(out, "{frame:>5} {elapsed:>8.3}s")?;
            for (name, value) in &snapshot {
                write!(out, "  {name}={value}")?;
            }
            writeln!(out)?;
        }
        OutputFormat::Json => {
            let mut values = serde_json::Map::new();
            for (name, value) in snapshot {
                values.insert(name, serde_json::to_value(value)?);
            }
            let line = serde_json::json!({ "frame": frame, "t": elapsed, "values": values });
            writeln!(out, "{line}")?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SceneConfig;

    const SCENE: &str = r#"
[[track]]
name = "radius"
kind = "number"
keyframes = [[0.0, 0.0], [0.5, 3.0], [1.0, 10.0]]
"#;

    fn options(format: OutputFormat) -> PlayOptions {
        PlayOptions {
            fps: 10,
            seconds: None,
            every: 5,
            format,
            realtime: false,
        }
    }

    #[test]
    fn test_plays_until_finished() {
        let scene = Scene::build(&SceneConfig::parse(SCENE).unwrap()).unwrap();
        let mut out = Vec::new();
        let frames = play(&scene, &options(OutputFormat::Text), &mut out).unwrap();
        assert!((10..=11).contains(&frames));

        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert!(lines[0].contains("radius=3.000"), "{}", lines[0]);
        assert!(lines.last().unwrap().contains("radius=10.000"));
    }

    #[test]
    fn test_json_lines() {
        let scene = Scene::build(&SceneConfig::parse(SCENE).unwrap()).unwrap();
        let mut out = Vec::new();
        play(&scene, &options(OutputFormat::Json), &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let first: serde_json::Value = serde_json::from_str(text.lines().next().unwrap()).unwrap();
        assert_eq!(first["frame"], 5);
        let radius = first["values"]["radius"].as_f64().unwrap();
        assert!((radius - 3.0).abs() < 1e-3);
    }

    #[test]
    fn test_endless_loop_needs_budget() {
        let config = SceneConfig::parse(&format!("[timeline]\nloop = true\n{SCENE}")).unwrap();
        let scene = Scene::build(&config).unwrap();
        let mut out = Vec::new();
        assert!(play(&scene, &options(OutputFormat::Text), &mut out).is_err());

        let mut bounded = options(OutputFormat::Text);
        bounded.seconds = Some(2.5);
        assert_eq!(play(&scene, &bounded, &mut out).unwrap(), 25);
    }
}
