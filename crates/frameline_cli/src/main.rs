//! Frameline CLI
//!
//! Headless host for frameline timelines: loads a scene file, drives it from
//! a fixed-rate frame clock, and prints the values each track produces.

mod config;
mod init;
mod player;
mod scene;

use anyhow::Result;
use clap::{Parser, Subcommand};
use frameline_animation::Animator;
use std::io;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use crate::config::SceneConfig;
use crate::player::{OutputFormat, PlayOptions};
use crate::scene::Scene;

/// Play keyframe timelines described in TOML scene files
#[derive(Parser, Debug)]
#[command(name = "frameline")]
#[command(about = "Play keyframe timelines described in TOML scene files")]
#[command(version)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Play a scene and print sampled values
    Play {
        /// Scene file, or a directory holding frameline.toml
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Override the scene's frame rate
        #[arg(long)]
        fps: Option<u32>,

        /// Override how many seconds to play
        #[arg(long)]
        seconds: Option<f32>,

        /// Print every n-th frame
        #[arg(long, default_value = "1")]
        every: usize,

        /// Output format
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,

        /// Pace frames against the wall clock
        #[arg(long)]
        realtime: bool,
    },

    /// Validate a scene and print its timeline layout
    Check {
        /// Scene file, or a directory holding frameline.toml
        #[arg(default_value = ".")]
        path: PathBuf,
    },

    /// Create a starter scene
    Init {
        /// Directory to write frameline.toml into
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Template: default, minimal or walk
        #[arg(short, long, default_value = "default")]
        template: String,

        /// Overwrite an existing scene
        #[arg(long)]
        force: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with_writer(io::stderr)
        .init();

    match cli.command {
        Command::Play {
            path,
            fps,
            seconds,
            every,
            format,
            realtime,
        } => {
            let config = SceneConfig::load(&path)?;
            let scene = Scene::build(&config)?;
            let options = PlayOptions {
                fps: fps.unwrap_or(config.clock.fps).max(1),
                seconds: seconds.or(config.clock.seconds),
                every,
                format,
                realtime,
            };
            let stdout = io::stdout();
            player::play(&scene, &options, &mut stdout.lock())?;
        }
        Command::Check { path } => {
            let config = SceneConfig::load(&path)?;
            let scene = Scene::build(&config)?;
            print_layout(&scene);
        }
        Command::Init { path, template, force } => {
            init::create_scene(&path, &template, force)?;
        }
    }

    Ok(())
}

fn print_layout(scene: &Scene) {
    let root = &scene.root;
    println!(
        "timeline  {:.3}s (delay {:.3}s, drag {:.3}s)",
        root.duration(),
        root.delay_time(),
        root.drag_time()
    );
    print_children(root, 1);
}

fn print_children(composite: &frameline_animation::CompositeAnimation, depth: usize) {
    for name in composite.names() {
        let (Some(child), Some(start)) = (composite.get(&name), composite.start_time(&name)) else {
            continue;
        };
        println!(
            "{:indent$}{name}  {start:.3}s .. {:.3}s",
            "",
            start + child.duration(),
            indent = depth * 2
        );
        if let Some(group) = child.as_composite() {
            print_children(group, depth + 1);
        }
    }
}
