//! Single-attribute keyframe animation
//!
//! An [`Animation`] owns one keyframe track, a local clock, and a callback
//! that receives the resolved value on every tick. It is the leaf of a
//! timeline tree.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use crate::animator::{can_resume, may_loop_again, run_hook, Animator, AnimatorContainer, Hook, ParentLink, PARK_OFFSET};
use crate::composite::CompositeAnimation;
use crate::easing::{EaseFn, Easing};
use crate::error::{AnimationError, Result};
use crate::interpolate::Interpolator;
use crate::keyframe::{resolve, Keyframe, KeyframeCursor, Keyframes};

/// Callback receiving each resolved value
pub type ApplyFn<T> = Box<dyn FnMut(T)>;

fn validate_duration(duration: f32) -> Result<f32> {
    if duration.is_finite() && duration >= 0.0 {
        Ok(duration)
    } else {
        Err(AnimationError::InvalidDuration(duration))
    }
}

/// A keyframe animation for a single attribute of type `T`
///
/// # Example
///
/// ```
/// use std::cell::Cell;
/// use std::rc::Rc;
/// use frameline_animation::{Animation, Animator, Keyframe, NumberInterpolator};
///
/// let radius = Rc::new(Cell::new(0.0_f32));
/// let sink = radius.clone();
/// let animation = Animation::new(
///     vec![Keyframe::new(0.0, 10.0), Keyframe::new(1.0, 50.0)],
///     move |value| sink.set(value),
///     NumberInterpolator,
/// )
/// .unwrap();
///
/// animation.start_animation();
/// animation.animate(0.5);
/// assert_eq!(radius.get(), 30.0);
/// ```
pub struct Animation<T> {
    keyframes: RefCell<Keyframes<T>>,
    interpolator: Box<dyn Interpolator<T>>,
    apply_value: RefCell<ApplyFn<T>>,
    ease_fn: RefCell<EaseFn>,
    duration: Cell<f32>,
    local_time: Cell<f32>,
    on_going: Cell<bool>,
    looping: Cell<bool>,
    max_loop_count: Cell<Option<u32>>,
    loops_completed: Cell<u32>,
    reverse: Cell<bool>,
    cursor: Cell<KeyframeCursor>,
    set_up_fn: RefCell<Hook>,
    tear_down_fn: RefCell<Hook>,
    parent: ParentLink,
}

impl<T: Clone + 'static> Animation<T> {
    /// Create a one-second, linear, non-looping animation
    pub fn new(
        keyframes: Vec<Keyframe<T>>,
        apply_value: impl FnMut(T) + 'static,
        interpolator: impl Interpolator<T> + 'static,
    ) -> Result<Rc<Self>> {
        Self::builder(Keyframes::new(keyframes)?, interpolator)
            .on_value(apply_value)
            .build()
    }

    /// Start configuring an animation over a validated track
    pub fn builder(keyframes: Keyframes<T>, interpolator: impl Interpolator<T> + 'static) -> AnimationBuilder<T> {
        AnimationBuilder::new(keyframes, interpolator)
    }

    /// Keyframes currently driving the animation
    pub fn keyframes(&self) -> Keyframes<T> {
        self.keyframes.borrow().clone()
    }

    /// Replace the track; playback continues from the current clock
    pub fn set_keyframes(&self, keyframes: Keyframes<T>) {
        let len = keyframes.len();
        *self.keyframes.borrow_mut() = keyframes;
        self.reset_cursor(len);
    }

    /// Value the track holds at `percentage`, honouring the play direction
    pub fn value_at(&self, percentage: f32) -> T {
        resolve(
            percentage,
            &self.keyframes.borrow(),
            self.interpolator.as_ref(),
            self.reverse.get(),
        )
    }
}

impl<T> Animation<T> {
    pub fn set_easing(&self, easing: Easing) {
        *self.ease_fn.borrow_mut() = easing.to_fn();
    }

    pub fn set_ease_fn(&self, ease_fn: impl Fn(f32) -> f32 + 'static) {
        *self.ease_fn.borrow_mut() = Rc::new(ease_fn);
    }

    pub fn ease_fn(&self) -> EaseFn {
        self.ease_fn.borrow().clone()
    }

    /// Elapsed time on the animation's own clock
    pub fn local_time(&self) -> f32 {
        self.local_time.get()
    }

    pub fn is_reversed(&self) -> bool {
        self.reverse.get()
    }

    pub fn max_loop_count(&self) -> Option<u32> {
        self.max_loop_count.get()
    }

    /// Limit how many plays a looping animation makes; `None` loops forever
    pub fn set_max_loop_count(&self, count: Option<u32>) {
        self.max_loop_count.set(count);
    }

    /// Plays completed since the last start
    pub fn loops_completed(&self) -> u32 {
        self.loops_completed.get()
    }

    pub fn on_set_up(&self, hook: impl FnMut() + 'static) {
        *self.set_up_fn.borrow_mut() = Box::new(hook);
    }

    pub fn on_tear_down(&self, hook: impl FnMut() + 'static) {
        *self.tear_down_fn.borrow_mut() = Box::new(hook);
    }

    pub fn on_value(&self, apply_value: impl FnMut(T) + 'static) {
        *self.apply_value.borrow_mut() = Box::new(apply_value);
    }

    /// Whether the clock sits past the end without playing
    fn is_parked(&self) -> bool {
        !self.on_going.get() && self.local_time.get() > self.duration.get()
    }

    fn park(&self) {
        self.local_time.set(self.duration.get() + PARK_OFFSET);
    }

    fn reset_cursor(&self, len: usize) {
        self.cursor.set(KeyframeCursor::new(len, self.reverse.get()));
    }

    fn rewind(&self) {
        self.local_time.set(0.0);
        self.reset_cursor(self.keyframes.borrow().len());
        self.on_going.set(true);
    }

    fn apply(&self, value: T) {
        match self.apply_value.try_borrow_mut() {
            Ok(mut apply) => apply(value),
            Err(_) => tracing::warn!("skipping re-entrant animation value callback"),
        }
    }
}

impl<T: Clone + 'static> Animator for Animation<T> {
    fn duration(&self) -> f32 {
        self.duration.get()
    }

    fn set_duration(&self, duration: f32) -> Result<()> {
        let duration = validate_duration(duration).map_err(|err| {
            tracing::debug!(duration, "rejected animation duration");
            err
        })?;
        let was_parked = self.is_parked();
        if self.on_going.get() && self.local_time.get() > duration {
            self.local_time.set(duration);
        }
        self.duration.set(duration);
        if was_parked {
            self.park();
        }
        self.parent.notify();
        Ok(())
    }

    fn loops(&self) -> bool {
        self.looping.get()
    }

    fn set_loops(&self, loops: bool) {
        self.looping.set(loops);
    }

    fn playing(&self) -> bool {
        self.on_going.get()
    }

    fn start_animation(&self) {
        self.loops_completed.set(0);
        self.rewind();
        self.set_up();
    }

    fn stop_animation(&self) {
        self.on_going.set(false);
        self.park();
        self.tear_down();
    }

    fn pause_animation(&self) {
        self.on_going.set(false);
    }

    fn resume_animation(&self) {
        // Stopped and finished animations stay put
        if can_resume(self.local_time.get(), self.duration.get()) {
            self.on_going.set(true);
        }
    }

    fn animate(&self, delta_time: f32) {
        let duration = self.duration.get();
        if !self.on_going.get() || self.local_time.get() > duration {
            return;
        }

        let local_time = self.local_time.get() + delta_time;
        self.local_time.set(local_time);

        let raw_percentage = if duration > 0.0 { local_time / duration } else { 1.0 };
        let ease = self.ease_fn.borrow().clone();
        let target = if raw_percentage > 1.0 { ease(1.0) } else { ease(raw_percentage) };

        let reverse = self.reverse.get();
        let value = {
            let keyframes = self.keyframes.borrow();
            let mut cursor = self.cursor.get();
            let value = match cursor.exact_hit(&keyframes, target, reverse) {
                Some(value) => value.clone(),
                None => resolve(target, &keyframes, self.interpolator.as_ref(), reverse),
            };
            cursor.advance(&keyframes, target, reverse);
            self.cursor.set(cursor);
            value
        };
        tracing::trace!(local_time, target, "animation tick");
        self.apply(value);

        if local_time >= duration {
            self.on_going.set(false);
            let completed = self.loops_completed.get() + 1;
            self.loops_completed.set(completed);
            if self.looping.get() && may_loop_again(self.max_loop_count.get(), completed) {
                tracing::debug!(completed, "animation loop restart");
                self.rewind();
            }
        }
    }

    fn set_up(&self) {
        run_hook(&self.set_up_fn);
    }

    fn tear_down(&self) {
        run_hook(&self.tear_down_fn);
    }

    fn set_parent(&self, parent: Weak<dyn AnimatorContainer>) {
        self.parent.set(parent);
    }

    fn detach_parent(&self) {
        self.parent.clear();
    }

    fn toggle_reverse(&self, reverse: bool) {
        if self.reverse.replace(reverse) != reverse {
            self.reset_cursor(self.keyframes.borrow().len());
        }
    }
}

impl<T> fmt::Debug for Animation<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Animation")
            .field("duration", &self.duration.get())
            .field("local_time", &self.local_time.get())
            .field("on_going", &self.on_going.get())
            .field("looping", &self.looping.get())
            .field("reverse", &self.reverse.get())
            .finish_non_exhaustive()
    }
}

/// Builder for [`Animation`]
///
/// Defaults: one second, linear easing, no loop, forward, no-op hooks.
pub struct AnimationBuilder<T> {
    keyframes: Keyframes<T>,
    interpolator: Box<dyn Interpolator<T>>,
    apply_value: ApplyFn<T>,
    duration: f32,
    looping: bool,
    max_loop_count: Option<u32>,
    reverse: bool,
    ease_fn: EaseFn,
    set_up_fn: Hook,
    tear_down_fn: Hook,
    parent: Option<Weak<dyn AnimatorContainer>>,
}

impl<T: Clone + 'static> AnimationBuilder<T> {
    pub fn new(keyframes: Keyframes<T>, interpolator: impl Interpolator<T> + 'static) -> Self {
        Self {
            keyframes,
            interpolator: Box::new(interpolator),
            apply_value: Box::new(|_| {}),
            duration: 1.0,
            looping: false,
            max_loop_count: None,
            reverse: false,
            ease_fn: Easing::Linear.to_fn(),
            set_up_fn: Box::new(|| {}),
            tear_down_fn: Box::new(|| {}),
            parent: None,
        }
    }

    /// Callback receiving each resolved value
    pub fn on_value(mut self, apply_value: impl FnMut(T) + 'static) -> Self {
        self.apply_value = Box::new(apply_value);
        self
    }

    /// Duration in seconds
    pub fn duration(mut self, duration: f32) -> Self {
        self.duration = duration;
        self
    }

    pub fn looping(mut self, looping: bool) -> Self {
        self.looping = looping;
        self
    }

    /// Loop, but stop after `count` plays
    pub fn max_loops(mut self, count: u32) -> Self {
        self.looping = true;
        self.max_loop_count = Some(count);
        self
    }

    pub fn reverse(mut self, reverse: bool) -> Self {
        self.reverse = reverse;
        self
    }

    pub fn easing(mut self, easing: Easing) -> Self {
        self.ease_fn = easing.to_fn();
        self
    }

    pub fn ease_fn(mut self, ease_fn: impl Fn(f32) -> f32 + 'static) -> Self {
        self.ease_fn = Rc::new(ease_fn);
        self
    }

    pub fn on_set_up(mut self, hook: impl FnMut() + 'static) -> Self {
        self.set_up_fn = Box::new(hook);
        self
    }

    pub fn on_tear_down(mut self, hook: impl FnMut() + 'static) -> Self {
        self.tear_down_fn = Box::new(hook);
        self
    }

    /// Report duration changes to `parent` without registering as its child
    pub fn parent(mut self, parent: &Rc<CompositeAnimation>) -> Self {
        let weak: Weak<CompositeAnimation> = Rc::downgrade(parent);
        let parent: Weak<dyn AnimatorContainer> = weak;
        self.parent = Some(parent);
        self
    }

    pub fn build(self) -> Result<Rc<Animation<T>>> {
        let duration = validate_duration(self.duration)?;
        let parent = ParentLink::default();
        if let Some(weak) = self.parent {
            parent.set(weak);
        }
        let len = self.keyframes.len();
        Ok(Rc::new(Animation {
            keyframes: RefCell::new(self.keyframes),
            interpolator: self.interpolator,
            apply_value: RefCell::new(self.apply_value),
            ease_fn: RefCell::new(self.ease_fn),
            duration: Cell::new(duration),
            local_time: Cell::new(duration + PARK_OFFSET),
            on_going: Cell::new(false),
            looping: Cell::new(self.looping),
            max_loop_count: Cell::new(self.max_loop_count),
            loops_completed: Cell::new(0),
            reverse: Cell::new(self.reverse),
            cursor: Cell::new(KeyframeCursor::new(len, self.reverse)),
            set_up_fn: RefCell::new(self.set_up_fn),
            tear_down_fn: RefCell::new(self.tear_down_fn),
            parent,
        }))
    }
}
