//! Animation error types

use thiserror::Error;

/// Errors returned by rejected timeline operations.
///
/// Playback never produces these; only construction and structural
/// mutation can fail, and a failed call leaves the node untouched.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnimationError {
    /// Keyframe sequence is too short, unsorted, or has non-finite entries
    #[error("Invalid keyframes: {0}")]
    InvalidKeyframes(String),

    /// Duration is negative, non-finite, or cannot be rescaled
    #[error("Invalid duration: {0}")]
    InvalidDuration(f32),

    /// Structural edit attempted while the timeline is playing or paused mid-way
    #[error("Timeline is locked while running or paused mid-timeline")]
    TimelineLocked,

    /// A child with this name already exists in the container
    #[error("Duplicate animation name: {0}")]
    DuplicateName(String),

    /// No child with this name exists in the container
    #[error("Unknown animation: {0}")]
    UnknownAnimation(String),

    /// The animator is already part of this container's tree
    #[error("Animator is already contained in this timeline tree")]
    AlreadyContained,

    /// Accepting the edit would make a container its own descendant
    #[error("Cyclic containment detected")]
    CyclicContainment,
}

/// Result type for animation operations
pub type Result<T> = std::result::Result<T, AnimationError>;
