//! Animation scheduler
//!
//! Owns the root timelines of a host and advances them each frame.

use std::time::{Duration, Instant};

use slotmap::{new_key_type, SlotMap};

use crate::animator::AnimatorRef;

new_key_type! {
    pub struct AnimatorId;
}

/// Drives root animators from a frame clock
pub struct AnimationScheduler {
    roots: SlotMap<AnimatorId, AnimatorRef>,
    last_frame: Instant,
    target_fps: u32,
}

impl AnimationScheduler {
    pub fn new() -> Self {
        Self {
            roots: SlotMap::with_key(),
            last_frame: Instant::now(),
            target_fps: 60,
        }
    }

    pub fn target_fps(&self) -> u32 {
        self.target_fps
    }

    pub fn set_target_fps(&mut self, fps: u32) {
        self.target_fps = fps.max(1);
    }

    /// Time between frames at the target rate
    pub fn frame_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / f64::from(self.target_fps))
    }

    pub fn add(&mut self, animator: impl Into<AnimatorRef>) -> AnimatorId {
        self.roots.insert(animator.into())
    }

    pub fn get(&self, id: AnimatorId) -> Option<&AnimatorRef> {
        self.roots.get(id)
    }

    pub fn remove(&mut self, id: AnimatorId) -> Option<AnimatorRef> {
        self.roots.remove(id)
    }

    /// Advance every root by `delta_time` seconds
    pub fn advance(&self, delta_time: f32) {
        for (_, animator) in self.roots.iter() {
            animator.animate(delta_time);
        }
    }

    /// Advance every root by the wall time since the previous tick
    pub fn tick(&mut self) -> f32 {
        let now = Instant::now();
        let dt = (now - self.last_frame).as_secs_f32();
        self.last_frame = now;
        self.advance(dt);
        dt
    }

    /// Check if any root is still playing
    pub fn has_active_animations(&self) -> bool {
        self.roots.values().any(|animator| animator.playing())
    }

    pub fn iter(&self) -> impl Iterator<Item = (AnimatorId, &AnimatorRef)> {
        self.roots.iter()
    }

    pub fn len(&self) -> usize {
        self.roots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }
}

impl Default for AnimationScheduler {
    fn default() -> Self {
        Self::new()
    }
}
