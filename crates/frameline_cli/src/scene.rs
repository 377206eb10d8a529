//! Building timeline trees from scene files

use anyhow::{Context, Result};
use frameline_animation::{
    Animation, Animator, AnimatorRef, CompositeAnimation, IntegerInterpolator, Interpolator, Keyframes,
    NumberInterpolator, Point, PointInterpolator, Rgb, RgbInterpolator, StringInterpolator,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::config::{GroupConfig, Placement, PlacementConfig, SceneConfig, TrackConfig, TrackKind};

/// The latest value a track has produced
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Sample {
    Number(f32),
    Integer(i64),
    Point(Point),
    Color(Rgb),
    Text(String),
}

impl fmt::Display for Sample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sample::Number(value) => write!(f, "{value:.3}"),
            Sample::Integer(value) => write!(f, "{value}"),
            Sample::Point(point) => write!(f, "({:.3}, {:.3})", point.x, point.y),
            Sample::Color(color) => write!(f, "rgb({:.1}, {:.1}, {:.1})", color.r, color.g, color.b),
            Sample::Text(text) => write!(f, "{text:?}"),
        }
    }
}

/// Shared slots the tracks write into, one per track in declaration order
#[derive(Clone, Default)]
pub struct SampleBoard {
    names: Rc<RefCell<Vec<String>>>,
    values: Rc<RefCell<Vec<Option<Sample>>>>,
}

impl SampleBoard {
    fn register(&self, name: String) -> usize {
        let mut names = self.names.borrow_mut();
        names.push(name);
        self.values.borrow_mut().push(None);
        names.len() - 1
    }

    fn sink<T: 'static>(&self, slot: usize, wrap: fn(T) -> Sample) -> impl FnMut(T) + 'static {
        let values = self.values.clone();
        move |value| {
            if let Some(entry) = values.borrow_mut().get_mut(slot) {
                *entry = Some(wrap(value));
            }
        }
    }

    /// Track paths with their latest value, skipping tracks that have not played yet
    pub fn snapshot(&self) -> Vec<(String, Sample)> {
        let names = self.names.borrow();
        let values = self.values.borrow();
        names
            .iter()
            .zip(values.iter())
            .filter_map(|(name, value)| value.clone().map(|value| (name.clone(), value)))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.names.borrow().len()
    }
}

/// A timeline tree built from a scene file
pub struct Scene {
    pub root: Rc<CompositeAnimation>,
    pub board: SampleBoard,
}

impl Scene {
    pub fn build(config: &SceneConfig) -> Result<Self> {
        let board = SampleBoard::default();
        let timeline = &config.timeline;

        let mut builder = CompositeAnimation::builder()
            .looping(timeline.looping)
            .delay(timeline.delay)
            .drag(timeline.drag)
            .reverse(timeline.reverse);
        if let Some(max) = timeline.max_loops {
            builder = builder.max_loops(max);
        }
        let root = builder.build().context("Invalid [timeline] settings")?;

        populate(&root, "", &config.tracks, &config.groups, &board)?;

        if let Some(duration) = timeline.duration {
            root.set_duration(duration)
                .with_context(|| format!("Cannot stretch timeline to {duration}s"))?;
        }

        tracing::info!(
            tracks = board.len(),
            duration = root.duration(),
            "scene built"
        );
        Ok(Self { root, board })
    }
}

fn populate(
    parent: &Rc<CompositeAnimation>,
    prefix: &str,
    tracks: &[TrackConfig],
    groups: &[GroupConfig],
    board: &SampleBoard,
) -> Result<()> {
    for track in tracks {
        let path = format!("{prefix}{}", track.name);
        let animator = build_track(track, &path, board)?;
        place(parent, &track.name, animator, &track.placement)
            .with_context(|| format!("Cannot place track `{path}`"))?;
    }

    for group in groups {
        let path = format!("{prefix}{}", group.name);
        let composite = CompositeAnimation::builder()
            .looping(group.looping)
            .build()
            .context("Invalid group settings")?;
        populate(&composite, &format!("{path}."), &group.tracks, &group.groups, board)?;
        composite
            .delay(group.delay)
            .and_then(|_| composite.drag(group.drag))
            .with_context(|| format!("Invalid padding on group `{path}`"))?;
        place(parent, &group.name, (&composite).into(), &group.placement)
            .with_context(|| format!("Cannot place group `{path}`"))?;
    }
    Ok(())
}

fn place(
    parent: &CompositeAnimation,
    name: &str,
    animator: AnimatorRef,
    placement: &PlacementConfig,
) -> Result<()> {
    match placement.resolve()? {
        Placement::Start(start) => parent.add_animation(name, animator, start)?,
        Placement::After(reference, offset) => parent.add_animation_after(name, animator, &reference, offset)?,
        Placement::Before(reference, offset) => parent.add_animation_before(name, animator, &reference, offset)?,
        Placement::Amidst(reference, offset) => parent.add_animation_amidst(name, animator, &reference, offset)?,
    }
    Ok(())
}

fn build_track(track: &TrackConfig, path: &str, board: &SampleBoard) -> Result<AnimatorRef> {
    let slot = board.register(path.to_string());
    match track.kind {
        TrackKind::Number => typed_track(track, NumberInterpolator, board.sink(slot, Sample::Number)),
        TrackKind::Integer => typed_track(track, IntegerInterpolator, board.sink(slot, Sample::Integer)),
        TrackKind::Point => typed_track(track, PointInterpolator, board.sink(slot, Sample::Point)),
        TrackKind::Color => typed_track(track, RgbInterpolator, board.sink(slot, Sample::Color)),
        TrackKind::Text => typed_track(track, StringInterpolator, board.sink(slot, Sample::Text)),
    }
}

fn typed_track<T>(
    track: &TrackConfig,
    interpolator: impl Interpolator<T> + 'static,
    sink: impl FnMut(T) + 'static,
) -> Result<AnimatorRef>
where
    T: Clone + DeserializeOwned + 'static,
{
    let keyframes = Keyframes::try_from(track.pairs::<T>()?)
        .with_context(|| format!("Track `{}` has invalid keyframes", track.name))?;
    let mut builder = Animation::builder(keyframes, interpolator)
        .on_value(sink)
        .duration(track.duration)
        .easing(track.easing)
        .looping(track.looping);
    if let Some(max) = track.max_loops {
        builder = builder.max_loops(max);
    }
    let animation = builder
        .build()
        .with_context(|| format!("Track `{}` has an invalid duration", track.name))?;
    tracing::debug!(track = %track.name, kind = ?track.kind, "track built");
    Ok(animation.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCENE: &str = r#"
[[track]]
name = "move"
kind = "point"
keyframes = [[0.0, { x = 0.0, y = 0.0 }], [0.5, { x = 3.0, y = 3.0 }], [1.0, { x = 10.0, y = 10.0 }]]

[[track]]
name = "radius"
kind = "number"
keyframes = [[0.0, 0.0], [0.5, 3.0], [1.0, 10.0]]

[[group]]
name = "hud"
after = "move"
offset = 0.5

[[group.track]]
name = "tint"
kind = "color"
keyframes = [[0.0, { r = 0.0, g = 0.0, b = 0.0 }], [1.0, { r = 255.0, g = 128.0, b = 0.0 }]]
duration = 2.0
"#;

    #[test]
    fn test_build_scene_tree() {
        let scene = Scene::build(&SceneConfig::parse(SCENE).unwrap()).unwrap();
        assert_eq!(scene.root.names(), vec!["move", "radius", "hud"]);
        assert_eq!(scene.root.start_time("hud"), Some(1.5));
        assert_eq!(scene.root.duration(), 3.5);
        assert_eq!(scene.board.len(), 3);
    }

    #[test]
    fn test_board_collects_values() {
        let scene = Scene::build(&SceneConfig::parse(SCENE).unwrap()).unwrap();
        scene.root.start_animation();
        assert!(scene.board.snapshot().is_empty());

        for _ in 0..4 {
            scene.root.animate(0.125);
        }
        let snapshot = scene.board.snapshot();
        assert_eq!(snapshot[0], ("move".to_string(), Sample::Point(Point::new(3.0, 3.0))));
        assert_eq!(snapshot[1], ("radius".to_string(), Sample::Number(3.0)));
        assert_eq!(snapshot.len(), 2);

        for _ in 0..25 {
            scene.root.animate(0.125);
        }
        let snapshot = scene.board.snapshot();
        assert_eq!(snapshot[2].0, "hud.tint");
        assert_eq!(snapshot[2].1, Sample::Color(Rgb::new(255.0, 128.0, 0.0)));
    }

    #[test]
    fn test_timeline_duration_rescale() {
        let config = SceneConfig::parse(&format!("[timeline]\nduration = 7.0\n{SCENE}")).unwrap();
        let scene = Scene::build(&config).unwrap();
        assert!((scene.root.duration() - 7.0).abs() < 1e-4);
    }

    #[test]
    fn test_unknown_reference_is_reported() {
        let config = SceneConfig::parse(
            r#"
[[track]]
name = "late"
kind = "number"
keyframes = [[0.0, 0.0], [1.0, 1.0]]
after = "missing"
"#,
        )
        .unwrap();
        let err = Scene::build(&config).err().unwrap();
        assert!(format!("{err:#}").contains("missing"));
    }

    #[test]
    fn test_bad_keyframes_are_reported() {
        let config = SceneConfig::parse(
            r#"
[[track]]
name = "flat"
kind = "number"
keyframes = [[0.0, 1.0]]
"#,
        )
        .unwrap();
        assert!(Scene::build(&config).is_err());
    }

    #[test]
    fn test_bundled_demo_scene() {
        let config = SceneConfig::parse(include_str!("../scenes/demo.toml")).unwrap();
        let scene = Scene::build(&config).unwrap();
        assert_eq!(scene.root.start_time("badge"), Some(1.25));
        assert_eq!(scene.root.duration(), 2.0);
        assert_eq!(scene.board.len(), 4);
    }

    #[test]
    fn test_sample_display() {
        assert_eq!(Sample::Number(1.5).to_string(), "1.500");
        assert_eq!(Sample::Point(Point::new(1.0, 2.0)).to_string(), "(1.000, 2.000)");
        assert_eq!(Sample::Text("go".to_string()).to_string(), "\"go\"");
    }
}
