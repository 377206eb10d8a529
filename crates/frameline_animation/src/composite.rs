//! Composite animations
//!
//! A [`CompositeAnimation`] plays named child animators, each at its own
//! start offset on the composite's clock. Children may themselves be
//! composites, so whole timelines nest. The composite's duration follows its
//! children: any change to a child's duration or placement is recomputed and
//! reported to the composite's own container.
//!
//! Structure is frozen while a timeline is playing or paused mid-way; edits
//! in that state are rejected with [`AnimationError::TimelineLocked`].

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use indexmap::IndexMap;
use rustc_hash::FxHashSet;
use smallvec::SmallVec;

use crate::animator::{
    can_resume, may_loop_again, run_hook, Animator, AnimatorContainer, AnimatorRef, Hook, ParentLink, PARK_OFFSET,
};
use crate::error::{AnimationError, Result};

/// A child slot in a composite
struct ChildEntry {
    animator: AnimatorRef,
    /// Offset from the end of the composite's delay
    start_time: Cell<f32>,
    /// Set once the child's window has closed during the current play
    closed: Cell<bool>,
    on_complete: RefCell<SmallVec<[Hook; 1]>>,
}

impl ChildEntry {
    fn end_time(&self) -> f32 {
        self.start_time.get() + self.animator.duration()
    }

    fn fire_on_complete(&self, name: &str) {
        match self.on_complete.try_borrow_mut() {
            Ok(mut callbacks) => {
                for callback in callbacks.iter_mut() {
                    callback();
                }
            }
            Err(_) => tracing::warn!(name, "skipping re-entrant completion callback"),
        }
    }
}

type ChildSnapshot = SmallVec<[(String, Rc<ChildEntry>); 8]>;

/// A timeline of named child animators played at independent offsets
///
/// # Example
///
/// ```
/// use frameline_animation::{Animation, Animator, CompositeAnimation, Keyframe, NumberInterpolator};
///
/// let fade = Animation::new(
///     vec![Keyframe::new(0.0, 0.0_f32), Keyframe::new(1.0, 1.0)],
///     |_| {},
///     NumberInterpolator,
/// )
/// .unwrap();
/// let slide = Animation::new(
///     vec![Keyframe::new(0.0, 0.0_f32), Keyframe::new(1.0, 100.0)],
///     |_| {},
///     NumberInterpolator,
/// )
/// .unwrap();
///
/// let timeline = CompositeAnimation::new();
/// timeline.add_animation("fade", &fade, 0.0).unwrap();
/// timeline.add_animation_after("slide", &slide, "fade", 0.5).unwrap();
/// assert_eq!(timeline.duration(), 2.5);
/// ```
pub struct CompositeAnimation {
    self_ref: Weak<CompositeAnimation>,
    children: RefCell<IndexMap<String, Rc<ChildEntry>>>,
    /// Span covered by the children, without delay and drag
    core_duration: Cell<f32>,
    delay_time: Cell<f32>,
    drag_time: Cell<f32>,
    local_time: Cell<f32>,
    on_going: Cell<bool>,
    looping: Cell<bool>,
    max_loop_count: Cell<Option<u32>>,
    loops_completed: Cell<u32>,
    reverse: Cell<bool>,
    /// Set while children are being rescaled so their notifications are batched
    rescaling: Cell<bool>,
    set_up_fn: RefCell<Hook>,
    tear_down_fn: RefCell<Hook>,
    parent: ParentLink,
}

impl CompositeAnimation {
    /// Create an empty, non-looping composite
    pub fn new() -> Rc<Self> {
        Rc::new_cyclic(|self_ref| CompositeAnimation {
            self_ref: self_ref.clone(),
            children: RefCell::new(IndexMap::new()),
            core_duration: Cell::new(0.0),
            delay_time: Cell::new(0.0),
            drag_time: Cell::new(0.0),
            local_time: Cell::new(PARK_OFFSET),
            on_going: Cell::new(false),
            looping: Cell::new(false),
            max_loop_count: Cell::new(None),
            loops_completed: Cell::new(0),
            reverse: Cell::new(false),
            rescaling: Cell::new(false),
            set_up_fn: RefCell::new(Box::new(|| {})),
            tear_down_fn: RefCell::new(Box::new(|| {})),
            parent: ParentLink::default(),
        })
    }

    /// Start configuring a composite
    pub fn builder() -> CompositeBuilder {
        CompositeBuilder::default()
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Span covered by the children, without delay and drag
    pub fn true_duration(&self) -> f32 {
        self.core_duration.get()
    }

    pub fn delay_time(&self) -> f32 {
        self.delay_time.get()
    }

    pub fn drag_time(&self) -> f32 {
        self.drag_time.get()
    }

    /// Elapsed time on the composite's own clock, delay included
    pub fn local_time(&self) -> f32 {
        self.local_time.get()
    }

    pub fn is_reversed(&self) -> bool {
        self.reverse.get()
    }

    pub fn max_loop_count(&self) -> Option<u32> {
        self.max_loop_count.get()
    }

    /// Limit how many plays a looping composite makes; `None` loops forever
    pub fn set_max_loop_count(&self, count: Option<u32>) {
        self.max_loop_count.set(count);
    }

    pub fn loops_completed(&self) -> u32 {
        self.loops_completed.get()
    }

    pub fn len(&self) -> usize {
        self.children.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.borrow().is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.children.borrow().contains_key(name)
    }

    /// Child names in play order
    pub fn names(&self) -> Vec<String> {
        self.children.borrow().keys().cloned().collect()
    }

    pub fn get(&self, name: &str) -> Option<AnimatorRef> {
        self.children.borrow().get(name).map(|entry| entry.animator.clone())
    }

    pub fn start_time(&self, name: &str) -> Option<f32> {
        self.children.borrow().get(name).map(|entry| entry.start_time.get())
    }

    /// Whether structural edits are currently refused
    pub fn is_locked(&self) -> bool {
        let local_time = self.local_time.get();
        self.on_going.get() || (local_time > 0.0 && local_time < self.duration())
    }

    pub fn on_set_up(&self, hook: impl FnMut() + 'static) {
        *self.set_up_fn.borrow_mut() = Box::new(hook);
    }

    pub fn on_tear_down(&self, hook: impl FnMut() + 'static) {
        *self.tear_down_fn.borrow_mut() = Box::new(hook);
    }

    /// Add a callback fired each time the named child plays to its end
    pub fn on_complete(&self, name: &str, callback: impl FnMut() + 'static) -> Result<()> {
        let children = self.children.borrow();
        let entry = children
            .get(name)
            .ok_or_else(|| AnimationError::UnknownAnimation(name.to_string()))?;
        entry.on_complete.borrow_mut().push(Box::new(callback));
        Ok(())
    }

    // =========================================================================
    // Timeline mutation
    // =========================================================================

    /// Add a child starting `start_time` seconds after the delay
    pub fn add_animation(
        &self,
        name: impl Into<String>,
        animator: impl Into<AnimatorRef>,
        start_time: f32,
    ) -> Result<()> {
        if !start_time.is_finite() || start_time < 0.0 {
            return Err(AnimationError::InvalidDuration(start_time));
        }
        self.insert_child(name.into(), animator.into(), start_time, None)
    }

    /// Add a child along with a callback fired when it plays to its end
    pub fn add_animation_with_callback(
        &self,
        name: impl Into<String>,
        animator: impl Into<AnimatorRef>,
        start_time: f32,
        on_complete: impl FnMut() + 'static,
    ) -> Result<()> {
        if !start_time.is_finite() || start_time < 0.0 {
            return Err(AnimationError::InvalidDuration(start_time));
        }
        self.insert_child(name.into(), animator.into(), start_time, Some(Box::new(on_complete)))
    }

    /// Add a child that starts `offset` seconds after `after_name` ends
    pub fn add_animation_after(
        &self,
        name: impl Into<String>,
        animator: impl Into<AnimatorRef>,
        after_name: &str,
        offset: f32,
    ) -> Result<()> {
        let start_time = self.reference_entry(after_name)?.end_time() + offset;
        self.insert_child(name.into(), animator.into(), start_time, None)
    }

    /// Add a child that starts `ahead_time` seconds before `before_name` starts.
    ///
    /// When that would fall before zero, every existing child moves later by
    /// the deficit so all offsets stay non-negative.
    pub fn add_animation_before(
        &self,
        name: impl Into<String>,
        animator: impl Into<AnimatorRef>,
        before_name: &str,
        ahead_time: f32,
    ) -> Result<()> {
        let start_time = self.reference_entry(before_name)?.start_time.get() - ahead_time;
        self.insert_child(name.into(), animator.into(), start_time, None)
    }

    /// Add a child that starts `offset` seconds after `amidst_name` starts
    pub fn add_animation_amidst(
        &self,
        name: impl Into<String>,
        animator: impl Into<AnimatorRef>,
        amidst_name: &str,
        offset: f32,
    ) -> Result<()> {
        let start_time = self.reference_entry(amidst_name)?.start_time.get() + offset;
        self.insert_child(name.into(), animator.into(), start_time, None)
    }

    /// Remove a child and hand it back
    pub fn remove_animation(&self, name: &str) -> Result<AnimatorRef> {
        self.ensure_unlocked()?;
        let was_parked = self.is_parked();
        let entry = self
            .children
            .borrow_mut()
            .shift_remove(name)
            .ok_or_else(|| AnimationError::UnknownAnimation(name.to_string()))?;
        entry.animator.detach_parent();
        tracing::debug!(name, "removed animation");
        self.refresh_duration(was_parked);
        self.parent.notify();
        Ok(entry.animator.clone())
    }

    /// Move a child to a new offset
    pub fn set_start_time(&self, name: &str, start_time: f32) -> Result<()> {
        if !start_time.is_finite() || start_time < 0.0 {
            return Err(AnimationError::InvalidDuration(start_time));
        }
        self.ensure_unlocked()?;
        let was_parked = self.is_parked();
        self.reference_entry(name)?.start_time.set(start_time);
        self.refresh_duration(was_parked);
        self.parent.notify();
        Ok(())
    }

    /// Hold for `delay_time` seconds before any child plays
    pub fn delay(&self, delay_time: f32) -> Result<()> {
        self.set_padding(&self.delay_time, delay_time)
    }

    /// Hold for `drag_time` seconds after the last child ends
    pub fn drag(&self, drag_time: f32) -> Result<()> {
        self.set_padding(&self.drag_time, drag_time)
    }

    pub fn remove_delay(&self) -> Result<()> {
        self.delay(0.0)
    }

    pub fn remove_drag(&self) -> Result<()> {
        self.drag(0.0)
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn ensure_unlocked(&self) -> Result<()> {
        if self.is_locked() {
            tracing::debug!(
                local_time = self.local_time.get(),
                on_going = self.on_going.get(),
                "rejected timeline mutation"
            );
            return Err(AnimationError::TimelineLocked);
        }
        Ok(())
    }

    fn reference_entry(&self, name: &str) -> Result<Rc<ChildEntry>> {
        self.children
            .borrow()
            .get(name)
            .cloned()
            .ok_or_else(|| AnimationError::UnknownAnimation(name.to_string()))
    }

    fn snapshot(&self) -> ChildSnapshot {
        self.children
            .borrow()
            .iter()
            .map(|(name, entry)| (name.clone(), entry.clone()))
            .collect()
    }

    fn child_refs(&self) -> Vec<AnimatorRef> {
        self.children
            .borrow()
            .values()
            .map(|entry| entry.animator.clone())
            .collect()
    }

    fn addr(&self) -> *const () {
        self as *const Self as *const ()
    }

    /// Depth-first search of this composite's subtree, itself included
    fn subtree_contains(&self, target: *const ()) -> bool {
        if self.addr() == target {
            return true;
        }
        let mut visited = FxHashSet::default();
        visited.insert(self.addr());
        let mut stack = self.child_refs();
        while let Some(current) = stack.pop() {
            if current.addr() == target {
                return true;
            }
            if !visited.insert(current.addr()) {
                continue;
            }
            if let Some(composite) = current.as_composite() {
                stack.extend(composite.child_refs());
            }
        }
        false
    }

    fn insert_child(
        &self,
        name: String,
        animator: AnimatorRef,
        start_time: f32,
        on_complete: Option<Hook>,
    ) -> Result<()> {
        if !start_time.is_finite() {
            return Err(AnimationError::InvalidDuration(start_time));
        }
        self.ensure_unlocked()?;
        if self.contains(&name) {
            tracing::debug!(name = %name, "rejected duplicate animation name");
            return Err(AnimationError::DuplicateName(name));
        }
        if let Some(composite) = animator.as_composite() {
            if composite.subtree_contains(self.addr()) {
                tracing::debug!(name = %name, "rejected cyclic containment");
                return Err(AnimationError::CyclicContainment);
            }
        }
        if self.contains_animation(&animator) {
            tracing::debug!(name = %name, "rejected animator already in tree");
            return Err(AnimationError::AlreadyContained);
        }

        let was_parked = self.is_parked();
        let mut start_time = start_time;
        if start_time < 0.0 {
            let shift = -start_time;
            for entry in self.children.borrow().values() {
                entry.start_time.set(entry.start_time.get() + shift);
            }
            start_time = 0.0;
        }

        let mut callbacks = SmallVec::new();
        callbacks.extend(on_complete);
        let parent: Weak<dyn AnimatorContainer> = self.self_ref.clone();
        animator.set_parent(parent);
        animator.toggle_reverse(self.reverse.get());
        tracing::debug!(name = %name, start_time, "added animation");
        self.children.borrow_mut().insert(
            name,
            Rc::new(ChildEntry {
                animator,
                start_time: Cell::new(start_time),
                closed: Cell::new(false),
                on_complete: RefCell::new(callbacks),
            }),
        );

        self.refresh_duration(was_parked);
        self.parent.notify();
        Ok(())
    }

    fn set_padding(&self, slot: &Cell<f32>, value: f32) -> Result<()> {
        if !value.is_finite() || value < 0.0 {
            return Err(AnimationError::InvalidDuration(value));
        }
        self.ensure_unlocked()?;
        let was_parked = self.is_parked();
        slot.set(value);
        self.refresh_duration(was_parked);
        self.parent.notify();
        Ok(())
    }

    fn is_parked(&self) -> bool {
        !self.on_going.get() && self.local_time.get() > self.duration()
    }

    fn park(&self) {
        self.local_time.set(self.duration() + PARK_OFFSET);
    }

    /// Recompute the core span from the children, keeping a stopped clock parked
    fn refresh_duration(&self, was_parked: bool) {
        let core = self
            .children
            .borrow()
            .values()
            .map(|entry| entry.end_time())
            .fold(0.0_f32, f32::max);
        self.core_duration.set(core);
        if was_parked {
            self.park();
        }
    }

    /// Advance the clock; `closing` ends the current play regardless of float drift
    fn advance(&self, delta_time: f32, closing: bool) {
        let local_time = self.local_time.get();
        if !self.on_going.get() || local_time < 0.0 || local_time > self.duration() || self.is_empty() {
            return;
        }
        let local_time = local_time + delta_time;
        self.local_time.set(local_time);
        let finishing = closing || local_time >= self.duration();
        self.animate_children(local_time, delta_time, finishing);
        if finishing {
            self.finish_play();
        }
    }

    /// Play out the rest of the current run as the parent's window on it closes
    fn close_window(&self, delta_time: f32) {
        self.advance(delta_time.max(0.0), true);
    }

    fn animate_children(&self, local_time: f32, delta_time: f32, finishing: bool) {
        let delay = self.delay_time.get();
        if local_time < delay && !finishing {
            return;
        }
        let now = local_time - delay;
        let prev = now - delta_time;

        for (name, entry) in self.snapshot() {
            if entry.closed.get() {
                continue;
            }
            let start = entry.start_time.get();
            let end = entry.end_time();
            if now >= end || finishing {
                // Window closes during this tick: land the child on its end
                entry.closed.set(true);
                let step = (end - prev.max(start)).max(0.0);
                match entry.animator.as_composite() {
                    Some(composite) => composite.close_window(step),
                    None => entry.animator.animate(step),
                }
                tracing::trace!(name = %name, "child animation completed");
                entry.fire_on_complete(&name);
                if entry.animator.loops() {
                    entry.animator.start_animation();
                }
            } else if now >= start {
                entry.animator.animate(now - prev.max(start));
            }
        }
    }

    fn reopen_children(&self) {
        for (_, entry) in self.snapshot() {
            entry.closed.set(false);
            entry.animator.start_animation();
        }
    }

    fn finish_play(&self) {
        self.on_going.set(false);
        if self.local_time.get() < self.duration() {
            self.local_time.set(self.duration());
        }
        let completed = self.loops_completed.get() + 1;
        self.loops_completed.set(completed);
        if self.looping.get() && may_loop_again(self.max_loop_count.get(), completed) {
            tracing::debug!(completed, "composite loop restart");
            self.local_time.set(0.0);
            self.on_going.set(true);
            self.reopen_children();
        }
    }
}

impl Animator for CompositeAnimation {
    /// Core span plus delay and drag
    fn duration(&self) -> f32 {
        self.core_duration.get() + self.delay_time.get() + self.drag_time.get()
    }

    /// Stretch the whole subtree proportionally to `duration`
    fn set_duration(&self, duration: f32) -> Result<()> {
        if !duration.is_finite() || duration <= 0.0 {
            tracing::debug!(duration, "rejected composite duration");
            return Err(AnimationError::InvalidDuration(duration));
        }
        self.ensure_unlocked()?;
        let original = self.duration();
        if original <= 0.0 {
            return Err(AnimationError::InvalidDuration(duration));
        }

        let scale = duration / original;
        let was_parked = self.is_parked();
        self.rescaling.set(true);
        self.delay_time.set(self.delay_time.get() * scale);
        self.drag_time.set(self.drag_time.get() * scale);
        for (name, entry) in self.snapshot() {
            entry.start_time.set(entry.start_time.get() * scale);
            let child_duration = entry.animator.duration() * scale;
            if let Err(err) = entry.animator.set_duration(child_duration) {
                tracing::debug!(name = %name, %err, "child kept its duration during rescale");
            }
        }
        self.rescaling.set(false);

        self.refresh_duration(was_parked);
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
        tracing::debug!(duration = self.duration(), "composite start");
        self.on_going.set(true);
        self.loops_completed.set(0);
        run_hook(&self.set_up_fn);
        self.local_time.set(0.0);
        self.reopen_children();
    }

    fn stop_animation(&self) {
        tracing::debug!("composite stop");
        self.on_going.set(false);
        run_hook(&self.tear_down_fn);
        for (_, entry) in self.snapshot() {
            entry.animator.stop_animation();
        }
        self.park();
    }

    fn pause_animation(&self) {
        self.on_going.set(false);
        for (_, entry) in self.snapshot() {
            entry.animator.pause_animation();
        }
    }

    fn resume_animation(&self) {
        if !can_resume(self.local_time.get(), self.duration()) {
            return;
        }
        self.on_going.set(true);
        for (_, entry) in self.snapshot() {
            entry.animator.resume_animation();
        }
    }

    fn animate(&self, delta_time: f32) {
        self.advance(delta_time, false);
    }

    fn set_up(&self) {
        run_hook(&self.set_up_fn);
        for (_, entry) in self.snapshot() {
            entry.animator.set_up();
        }
    }

    fn tear_down(&self) {
        run_hook(&self.tear_down_fn);
        for (_, entry) in self.snapshot() {
            entry.animator.tear_down();
        }
    }

    fn set_parent(&self, parent: Weak<dyn AnimatorContainer>) {
        self.parent.set(parent);
    }

    fn detach_parent(&self) {
        self.parent.clear();
    }

    fn toggle_reverse(&self, reverse: bool) {
        if self.reverse.replace(reverse) == reverse {
            return;
        }
        for (_, entry) in self.snapshot() {
            entry.animator.toggle_reverse(reverse);
        }
    }
}

impl AnimatorContainer for CompositeAnimation {
    fn update_duration(&self) {
        if self.rescaling.get() {
            return;
        }
        if self.check_cyclic_children() {
            tracing::debug!("cyclic containment detected, duration update skipped");
            return;
        }
        let was_parked = self.is_parked();
        self.refresh_duration(was_parked);
        self.parent.notify();
    }

    fn check_cyclic_children(&self) -> bool {
        let mut visited = FxHashSet::default();
        visited.insert(self.addr());
        let mut stack = self.child_refs();
        while let Some(current) = stack.pop() {
            if !visited.insert(current.addr()) {
                return true;
            }
            if let Some(composite) = current.as_composite() {
                stack.extend(composite.child_refs());
            }
        }
        false
    }

    fn contains_animation(&self, animator: &AnimatorRef) -> bool {
        match self.parent.get() {
            Some(parent) => parent.contains_animation(animator),
            None => self.subtree_contains(animator.addr()),
        }
    }
}

impl fmt::Debug for CompositeAnimation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositeAnimation")
            .field("children", &self.names())
            .field("duration", &self.duration())
            .field("local_time", &self.local_time.get())
            .field("on_going", &self.on_going.get())
            .field("looping", &self.looping.get())
            .finish_non_exhaustive()
    }
}

/// Builder for [`CompositeAnimation`]
#[derive(Default)]
pub struct CompositeBuilder {
    children: Vec<(String, AnimatorRef, f32)>,
    looping: bool,
    max_loop_count: Option<u32>,
    delay_time: f32,
    drag_time: f32,
    reverse: bool,
    set_up_fn: Option<Hook>,
    tear_down_fn: Option<Hook>,
    parent: Option<Weak<dyn AnimatorContainer>>,
}

impl CompositeBuilder {
    /// Add a child at `start_time`; children play in the order they are added
    pub fn child(mut self, name: impl Into<String>, animator: impl Into<AnimatorRef>, start_time: f32) -> Self {
        self.children.push((name.into(), animator.into(), start_time));
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

    pub fn delay(mut self, delay_time: f32) -> Self {
        self.delay_time = delay_time;
        self
    }

    pub fn drag(mut self, drag_time: f32) -> Self {
        self.drag_time = drag_time;
        self
    }

    pub fn reverse(mut self, reverse: bool) -> Self {
        self.reverse = reverse;
        self
    }

    pub fn on_set_up(mut self, hook: impl FnMut() + 'static) -> Self {
        self.set_up_fn = Some(Box::new(hook));
        self
    }

    pub fn on_tear_down(mut self, hook: impl FnMut() + 'static) -> Self {
        self.tear_down_fn = Some(Box::new(hook));
        self
    }

    /// Report duration changes to `parent` without registering as its child
    pub fn parent(mut self, parent: &Rc<CompositeAnimation>) -> Self {
        let weak: Weak<CompositeAnimation> = Rc::downgrade(parent);
        let parent: Weak<dyn AnimatorContainer> = weak;
        self.parent = Some(parent);
        self
    }

    pub fn build(self) -> Result<Rc<CompositeAnimation>> {
        let composite = CompositeAnimation::new();
        composite.looping.set(self.looping);
        composite.max_loop_count.set(self.max_loop_count);
        composite.toggle_reverse(self.reverse);
        if let Some(hook) = self.set_up_fn {
            *composite.set_up_fn.borrow_mut() = hook;
        }
        if let Some(hook) = self.tear_down_fn {
            *composite.tear_down_fn.borrow_mut() = hook;
        }
        for (name, animator, start_time) in self.children {
            composite.add_animation(name, animator, start_time)?;
        }
        composite.delay(self.delay_time)?;
        composite.drag(self.drag_time)?;
        if let Some(parent) = self.parent {
            composite.set_parent(parent);
        }
        Ok(composite)
    }
}
