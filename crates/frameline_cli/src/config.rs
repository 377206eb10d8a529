//! Scene file handling

use anyhow::{Context, Result};
use frameline_animation::Easing;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// File name looked up when a directory is given
pub const SCENE_FILE: &str = "frameline.toml";

/// Top-level scene configuration (frameline.toml)
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct SceneConfig {
    #[serde(default)]
    pub clock: ClockConfig,
    #[serde(default)]
    pub timeline: TimelineConfig,
    #[serde(default, rename = "track")]
    pub tracks: Vec<TrackConfig>,
    #[serde(default, rename = "group")]
    pub groups: Vec<GroupConfig>,
}

/// Host frame clock
#[derive(Debug, Deserialize, Serialize)]
pub struct ClockConfig {
    /// Frames per second
    #[serde(default = "default_fps")]
    pub fps: u32,
    /// Seconds to drive; defaults to the timeline's own duration
    #[serde(default)]
    pub seconds: Option<f32>,
}

fn default_fps() -> u32 {
    60
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            fps: default_fps(),
            seconds: None,
        }
    }
}

/// Settings of the root timeline
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct TimelineConfig {
    #[serde(default, rename = "loop")]
    pub looping: bool,
    #[serde(default)]
    pub max_loops: Option<u32>,
    #[serde(default)]
    pub delay: f32,
    #[serde(default)]
    pub drag: f32,
    #[serde(default)]
    pub reverse: bool,
    /// Stretch the finished timeline to this many seconds
    #[serde(default)]
    pub duration: Option<f32>,
}

/// Value type of a track
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackKind {
    Number,
    Integer,
    Point,
    Color,
    Text,
}

/// Where a child sits on its parent's timeline
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct PlacementConfig {
    #[serde(default)]
    pub start: Option<f32>,
    #[serde(default)]
    pub after: Option<String>,
    #[serde(default)]
    pub before: Option<String>,
    #[serde(default)]
    pub amidst: Option<String>,
    #[serde(default)]
    pub offset: f32,
}

/// Resolved form of [`PlacementConfig`]
#[derive(Debug, Clone, PartialEq)]
pub enum Placement {
    Start(f32),
    After(String, f32),
    Before(String, f32),
    Amidst(String, f32),
}

impl PlacementConfig {
    pub fn resolve(&self) -> Result<Placement> {
        let relative = [
            self.after.as_ref().map(|name| Placement::After(name.clone(), self.offset)),
            self.before.as_ref().map(|name| Placement::Before(name.clone(), self.offset)),
            self.amidst.as_ref().map(|name| Placement::Amidst(name.clone(), self.offset)),
        ];
        let mut chosen = relative.into_iter().flatten();
        let placement = match (self.start, chosen.next(), chosen.next()) {
            (None, None, _) => Placement::Start(0.0),
            (Some(start), None, _) => Placement::Start(start),
            (None, Some(placement), None) => placement,
            _ => anyhow::bail!("use only one of `start`, `after`, `before` or `amidst`"),
        };
        Ok(placement)
    }
}

/// A keyframe track
#[derive(Debug, Deserialize, Serialize)]
pub struct TrackConfig {
    pub name: String,
    pub kind: TrackKind,
    /// `[percentage, value]` pairs; the value's shape follows `kind`
    pub keyframes: toml::Value,
    #[serde(default = "default_duration")]
    pub duration: f32,
    #[serde(default)]
    pub easing: Easing,
    #[serde(default, rename = "loop")]
    pub looping: bool,
    #[serde(default)]
    pub max_loops: Option<u32>,
    #[serde(flatten)]
    pub placement: PlacementConfig,
}

fn default_duration() -> f32 {
    1.0
}

impl TrackConfig {
    /// Parse the keyframe pairs as values of type `T`
    pub fn pairs<T: DeserializeOwned>(&self) -> Result<Vec<(f32, T)>> {
        self.keyframes
            .clone()
            .try_into()
            .with_context(|| format!("Track `{}` has keyframes that are not {:?} values", self.name, self.kind))
    }
}

/// A nested composite holding its own tracks and groups
#[derive(Debug, Deserialize, Serialize)]
pub struct GroupConfig {
    pub name: String,
    #[serde(default, rename = "loop")]
    pub looping: bool,
    #[serde(default)]
    pub delay: f32,
    #[serde(default)]
    pub drag: f32,
    #[serde(default, rename = "track")]
    pub tracks: Vec<TrackConfig>,
    #[serde(default, rename = "group")]
    pub groups: Vec<GroupConfig>,
    #[serde(flatten)]
    pub placement: PlacementConfig,
}

impl SceneConfig {
    /// Load a scene from a file, or from `frameline.toml` inside a directory
    pub fn load(path: &Path) -> Result<Self> {
        let scene_path = if path.is_dir() {
            path.join(SCENE_FILE)
        } else {
            path.to_path_buf()
        };

        if !scene_path.exists() {
            anyhow::bail!(
                "No scene found at {}. Run `frameline init` to create one.",
                scene_path.display()
            );
        }

        let content = fs::read_to_string(&scene_path)
            .with_context(|| format!("Failed to read {}", scene_path.display()))?;

        Self::parse(&content).with_context(|| format!("Failed to parse {}", scene_path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: SceneConfig = toml::from_str(content)?;
        if config.clock.fps == 0 {
            anyhow::bail!("`clock.fps` must be at least 1");
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use frameline_animation::Point;

    const SCENE: &str = r#"
[clock]
fps = 10

[timeline]
loop = true
max_loops = 2
drag = 0.5

[[track]]
name = "move"
kind = "point"
keyframes = [[0.0, { x = 0.0, y = 0.0 }], [1.0, { x = 10.0, y = 5.0 }]]
easing = "ease_in_out"

[[track]]
name = "frame"
kind = "integer"
keyframes = [[0.0, 0], [1.0, 7]]
duration = 2.0
after = "move"
offset = 0.25

[[group]]
name = "hud"
amidst = "move"
offset = 0.5

[[group.track]]
name = "label"
kind = "text"
keyframes = [[0.0, "ready"], [1.0, "go"]]
"#;

    #[test]
    fn test_parse_scene() {
        let scene = SceneConfig::parse(SCENE).unwrap();
        assert_eq!(scene.clock.fps, 10);
        assert_eq!(scene.clock.seconds, None);
        assert!(scene.timeline.looping);
        assert_eq!(scene.timeline.max_loops, Some(2));
        assert_eq!(scene.tracks.len(), 2);
        assert_eq!(scene.tracks[0].easing, Easing::EaseInOut);
        assert_eq!(scene.tracks[1].duration, 2.0);
        assert_eq!(scene.groups[0].tracks[0].kind, TrackKind::Text);
    }

    #[test]
    fn test_track_pairs_follow_kind() {
        let scene = SceneConfig::parse(SCENE).unwrap();
        let points: Vec<(f32, Point)> = scene.tracks[0].pairs().unwrap();
        assert_eq!(points[1].1, Point::new(10.0, 5.0));
        let frames: Vec<(f32, i64)> = scene.tracks[1].pairs().unwrap();
        assert_eq!(frames[1], (1.0, 7));
        assert!(scene.tracks[1].pairs::<Point>().is_err());
    }

    #[test]
    fn test_placement_resolution() {
        let scene = SceneConfig::parse(SCENE).unwrap();
        assert_eq!(scene.tracks[0].placement.resolve().unwrap(), Placement::Start(0.0));
        assert_eq!(
            scene.tracks[1].placement.resolve().unwrap(),
            Placement::After("move".to_string(), 0.25)
        );
        assert_eq!(
            scene.groups[0].placement.resolve().unwrap(),
            Placement::Amidst("move".to_string(), 0.5)
        );

        let conflicting = PlacementConfig {
            start: Some(1.0),
            before: Some("move".to_string()),
            ..Default::default()
        };
        assert!(conflicting.resolve().is_err());
    }

    #[test]
    fn test_zero_fps_rejected() {
        assert!(SceneConfig::parse("[clock]\nfps = 0\n").is_err());
    }
}
