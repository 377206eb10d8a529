//! Frameline Animation System
//!
//! Keyframe animations and nestable timelines driven by a host frame clock.
//!
//! # Features
//!
//! - **Keyframe Animations**: Typed tracks resolved through pluggable interpolators
//! - **Easing**: Standard curves, cubic bezier, or any `Fn(f32) -> f32`
//! - **Composite Timelines**: Named children placed at absolute or relative offsets
//! - **Nesting**: Composites hold composites; durations propagate up the tree
//! - **Playback Control**: Start, stop, pause, resume, loop and reverse
//!
//! # Example
//!
//! ```rust
//! use std::cell::Cell;
//! use std::rc::Rc;
//! use frameline_animation::prelude::*;
//!
//! let opacity = Rc::new(Cell::new(0.0_f32));
//! let sink = opacity.clone();
//! let fade = Animation::builder(
//!     Keyframes::builder().from(0.0_f32).to(1.0).build().unwrap(),
//!     NumberInterpolator,
//! )
//! .on_value(move |value| sink.set(value))
//! .duration(0.5)
//! .build()
//! .unwrap();
//!
//! let timeline = CompositeAnimation::builder()
//!     .child("fade", &fade, 0.25)
//!     .build()
//!     .unwrap();
//!
//! timeline.start_animation();
//! timeline.animate(0.5);
//! assert_eq!(opacity.get(), 0.5);
//! ```

pub mod animation;
pub mod animator;
pub mod composite;
pub mod easing;
pub mod error;
pub mod interpolate;
pub mod keyframe;
pub mod scheduler;

pub use animation::{Animation, AnimationBuilder, ApplyFn};
pub use animator::{Animator, AnimatorContainer, AnimatorRef, Hook};
pub use composite::{CompositeAnimation, CompositeBuilder};
pub use easing::{EaseFn, Easing};
pub use error::{AnimationError, Result};
pub use interpolate::{
    IntegerInterpolator, Interpolator, NumberInterpolator, Point, PointInterpolator, Rgb, RgbInterpolator,
    StringInterpolator,
};
pub use keyframe::{resolve, Keyframe, KeyframeCursor, Keyframes, KeyframesBuilder};
pub use scheduler::{AnimationScheduler, AnimatorId};

/// Common imports for building timelines
pub mod prelude {
    pub use crate::animation::Animation;
    pub use crate::animator::{Animator, AnimatorRef};
    pub use crate::composite::CompositeAnimation;
    pub use crate::easing::Easing;
    pub use crate::interpolate::{
        IntegerInterpolator, NumberInterpolator, Point, PointInterpolator, Rgb, RgbInterpolator, StringInterpolator,
    };
    pub use crate::keyframe::{Keyframe, Keyframes};
    pub use crate::scheduler::AnimationScheduler;
}
