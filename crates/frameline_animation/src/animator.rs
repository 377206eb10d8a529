//! The animator capability shared by leaf and composite timeline nodes
//!
//! Nodes are reference counted and mutate through interior cells, so a host
//! can keep a handle to any node of a tree it has handed to a container and
//! still drive or reconfigure it. Children point at their container through a
//! [`Weak`] link that is only used to report duration changes upward.

use std::cell::RefCell;
use std::fmt;
use std::ops::Deref;
use std::rc::{Rc, Weak};

use crate::animation::Animation;
use crate::composite::CompositeAnimation;
use crate::error::Result;

/// Side-effect hook run on set-up, tear-down, or child completion
pub type Hook = Box<dyn FnMut()>;

/// Offset past the end of a timeline where stopped nodes park their clock
pub(crate) const PARK_OFFSET: f32 = 0.1;

/// A node of an animation timeline
pub trait Animator {
    /// Effective duration in seconds
    fn duration(&self) -> f32;

    /// Change the duration; the parent container recomputes its own
    fn set_duration(&self, duration: f32) -> Result<()>;

    /// Whether the node restarts from zero when it completes
    fn loops(&self) -> bool;

    fn set_loops(&self, loops: bool);

    /// Whether the node currently advances on `animate`
    fn playing(&self) -> bool;

    /// Rewind to zero, run set-up hooks, and begin playing
    fn start_animation(&self);

    /// Stop playing, park past the end, and run tear-down hooks
    fn stop_animation(&self);

    /// Stop advancing without losing the current position
    fn pause_animation(&self);

    /// Continue from the paused position
    fn resume_animation(&self);

    /// Advance the node's clock by `delta_time` seconds
    fn animate(&self, delta_time: f32);

    /// Run set-up hooks
    fn set_up(&self);

    /// Run tear-down hooks
    fn tear_down(&self);

    /// Attach to a container that should hear about duration changes
    fn set_parent(&self, parent: Weak<dyn AnimatorContainer>);

    fn detach_parent(&self);

    /// Play keyframes from the end towards the start when `reverse` is set
    fn toggle_reverse(&self, reverse: bool);
}

/// A node that owns other animators
pub trait AnimatorContainer {
    /// Recompute the aggregate duration and propagate it upward
    fn update_duration(&self);

    /// Whether this container (transitively) contains itself
    fn check_cyclic_children(&self) -> bool;

    /// Whether `animator` is anywhere in the tree this container belongs to
    fn contains_animation(&self, animator: &AnimatorRef) -> bool;
}

/// A shared handle to a timeline node.
///
/// The handle records whether the node can hold children, which containment
/// and cycle checks need in order to walk the tree. Handles are only built
/// through the `From` conversions, so a composite is always tagged as one.
#[derive(Clone)]
pub struct AnimatorRef(Node);

#[derive(Clone)]
enum Node {
    Leaf(Rc<dyn Animator>),
    Composite(Rc<CompositeAnimation>),
}

impl AnimatorRef {
    pub fn as_animator(&self) -> &(dyn Animator + 'static) {
        match &self.0 {
            Node::Leaf(leaf) => leaf.as_ref(),
            Node::Composite(composite) => composite.as_ref(),
        }
    }

    pub fn as_composite(&self) -> Option<&Rc<CompositeAnimation>> {
        match &self.0 {
            Node::Leaf(_) => None,
            Node::Composite(composite) => Some(composite),
        }
    }

    /// Whether both handles point at the same node
    pub fn ptr_eq(&self, other: &AnimatorRef) -> bool {
        self.addr() == other.addr()
    }

    /// Identity of the node, independent of the handle's vtable
    pub(crate) fn addr(&self) -> *const () {
        match &self.0 {
            Node::Leaf(leaf) => Rc::as_ptr(leaf) as *const (),
            Node::Composite(composite) => Rc::as_ptr(composite) as *const (),
        }
    }
}

impl Deref for AnimatorRef {
    type Target = dyn Animator;

    fn deref(&self) -> &Self::Target {
        self.as_animator()
    }
}

impl fmt::Debug for AnimatorRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.0 {
            Node::Leaf(_) => "Leaf",
            Node::Composite(_) => "Composite",
        };
        f.debug_struct(kind)
            .field("duration", &self.duration())
            .field("playing", &self.playing())
            .finish()
    }
}

impl<T: Clone + 'static> From<Rc<Animation<T>>> for AnimatorRef {
    fn from(animation: Rc<Animation<T>>) -> Self {
        let leaf: Rc<dyn Animator> = animation;
        AnimatorRef(Node::Leaf(leaf))
    }
}

impl<T: Clone + 'static> From<&Rc<Animation<T>>> for AnimatorRef {
    fn from(animation: &Rc<Animation<T>>) -> Self {
        AnimatorRef::from(animation.clone())
    }
}

impl From<Rc<CompositeAnimation>> for AnimatorRef {
    fn from(composite: Rc<CompositeAnimation>) -> Self {
        AnimatorRef(Node::Composite(composite))
    }
}

impl From<&Rc<CompositeAnimation>> for AnimatorRef {
    fn from(composite: &Rc<CompositeAnimation>) -> Self {
        AnimatorRef(Node::Composite(composite.clone()))
    }
}

/// Non-owning link from a node to its container
#[derive(Default)]
pub(crate) struct ParentLink(RefCell<Option<Weak<dyn AnimatorContainer>>>);

impl ParentLink {
    pub(crate) fn set(&self, parent: Weak<dyn AnimatorContainer>) {
        *self.0.borrow_mut() = Some(parent);
    }

    pub(crate) fn clear(&self) {
        *self.0.borrow_mut() = None;
    }

    pub(crate) fn get(&self) -> Option<Rc<dyn AnimatorContainer>> {
        self.0.borrow().as_ref().and_then(Weak::upgrade)
    }

    /// Ask the container, if it is still alive, to recompute its duration
    pub(crate) fn notify(&self) {
        if let Some(parent) = self.get() {
            parent.update_duration();
        }
    }
}

/// Run a hook unless it is already running further up the stack
pub(crate) fn run_hook(hook: &RefCell<Hook>) {
    match hook.try_borrow_mut() {
        Ok(mut hook) => hook(),
        Err(_) => tracing::warn!("skipping re-entrant animation hook"),
    }
}

/// Whether a looping node that has finished `completed` plays may go again
pub(crate) fn may_loop_again(max_loop_count: Option<u32>, completed: u32) -> bool {
    max_loop_count.map_or(true, |max| completed < max)
}

/// Whether a paused node at `local_time` may pick up again.
///
/// Stopped nodes are parked past their end and finished ones sit at it; a
/// zero-length node paused before its first tick is still at zero.
pub(crate) fn can_resume(local_time: f32, duration: f32) -> bool {
    local_time < duration || local_time == 0.0
}
