//! Keyframe tracks and value resolution
//!
//! A track is a sorted sequence of [`Keyframe`]s for a single attribute.
//! [`resolve`] finds the value at any percentage: exact hits return the
//! stored value, gaps are filled by the track's [`Interpolator`], and
//! percentages outside the track extrapolate from its boundary segment.
//! Reverse playback transposes every percentage to `1 - p`.

use std::ops::Deref;

use serde::{Deserialize, Serialize};

use crate::error::{AnimationError, Result};
use crate::interpolate::Interpolator;

/// A single keyframe: the value an attribute holds at a point of the timeline
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Keyframe<T> {
    /// Position on the timeline (0.0 to 1.0)
    pub percentage: f32,
    /// Attribute value at this position
    pub value: T,
}

impl<T> Keyframe<T> {
    pub fn new(percentage: f32, value: T) -> Self {
        Self { percentage, value }
    }
}

/// A validated keyframe track.
///
/// Holds at least two keyframes with finite, strictly ascending percentages.
#[derive(Clone, Debug, PartialEq)]
pub struct Keyframes<T> {
    frames: Vec<Keyframe<T>>,
}

impl<T> Keyframes<T> {
    /// Validate and wrap a keyframe sequence
    pub fn new(frames: Vec<Keyframe<T>>) -> Result<Self> {
        if frames.len() < 2 {
            return Err(AnimationError::InvalidKeyframes(format!(
                "expected at least 2 keyframes, got {}",
                frames.len()
            )));
        }
        if let Some(idx) = frames.iter().position(|kf| !kf.percentage.is_finite()) {
            return Err(AnimationError::InvalidKeyframes(format!(
                "keyframe {idx} has a non-finite percentage"
            )));
        }
        if let Some(idx) = frames
            .windows(2)
            .position(|pair| pair[0].percentage >= pair[1].percentage)
        {
            return Err(AnimationError::InvalidKeyframes(format!(
                "keyframe {} at {} does not come after keyframe {} at {}",
                idx + 1,
                frames[idx + 1].percentage,
                idx,
                frames[idx].percentage
            )));
        }
        Ok(Self { frames })
    }

    /// Start a builder for a track
    pub fn builder() -> KeyframesBuilder<T> {
        KeyframesBuilder::new()
    }

    pub fn as_slice(&self) -> &[Keyframe<T>] {
        &self.frames
    }

    pub fn into_inner(self) -> Vec<Keyframe<T>> {
        self.frames
    }
}

impl<T> Deref for Keyframes<T> {
    type Target = [Keyframe<T>];

    fn deref(&self) -> &Self::Target {
        &self.frames
    }
}

impl<T> TryFrom<Vec<Keyframe<T>>> for Keyframes<T> {
    type Error = AnimationError;

    fn try_from(frames: Vec<Keyframe<T>>) -> Result<Self> {
        Self::new(frames)
    }
}

impl<T> TryFrom<Vec<(f32, T)>> for Keyframes<T> {
    type Error = AnimationError;

    fn try_from(pairs: Vec<(f32, T)>) -> Result<Self> {
        Self::new(
            pairs
                .into_iter()
                .map(|(percentage, value)| Keyframe::new(percentage, value))
                .collect(),
        )
    }
}

/// Fluent builder for keyframe tracks
///
/// # Example
///
/// ```
/// use frameline_animation::Keyframes;
///
/// let track = Keyframes::builder()
///     .from(0.0_f32)
///     .to(10.0)
///     .insert_at(0.5, 3.0)
///     .build()
///     .unwrap();
/// assert_eq!(track.len(), 3);
/// assert_eq!(track[1].value, 3.0);
/// ```
#[derive(Clone, Debug)]
pub struct KeyframesBuilder<T> {
    frames: Vec<Keyframe<T>>,
}

impl<T> Default for KeyframesBuilder<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> KeyframesBuilder<T> {
    pub fn new() -> Self {
        Self { frames: Vec::new() }
    }

    /// Set the value at 0%, replacing an existing 0% keyframe
    pub fn from(mut self, value: T) -> Self {
        match self.frames.first_mut() {
            Some(first) if first.percentage == 0.0 => first.value = value,
            _ => self.frames.insert(0, Keyframe::new(0.0, value)),
        }
        self
    }

    /// Set the value at 100%, replacing an existing 100% keyframe
    pub fn to(mut self, value: T) -> Self {
        match self.frames.last_mut() {
            Some(last) if last.percentage == 1.0 => last.value = value,
            _ => self.frames.push(Keyframe::new(1.0, value)),
        }
        self
    }

    /// Add a keyframe, keeping the track sorted by percentage
    pub fn insert_at(mut self, percentage: f32, value: T) -> Self {
        let idx = self.frames.partition_point(|kf| kf.percentage <= percentage);
        self.frames.insert(idx, Keyframe::new(percentage, value));
        self
    }

    /// Drop every keyframe added so far
    pub fn clear(mut self) -> Self {
        self.frames.clear();
        self
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Validate into a track
    pub fn build(self) -> Result<Keyframes<T>> {
        Keyframes::new(self.frames)
    }
}

/// Percentage of a keyframe as seen from the current play direction
#[inline]
fn effective_percentage<T>(keyframe: &Keyframe<T>, reverse: bool) -> f32 {
    if reverse {
        1.0 - keyframe.percentage
    } else {
        keyframe.percentage
    }
}

/// Interpolate across `keyframes[lower]` and `keyframes[upper]` in play direction.
///
/// In reverse the pair is transposed so the frame with the smaller effective
/// percentage always comes first.
fn lerp_pair<T: Clone>(
    target: f32,
    keyframes: &[Keyframe<T>],
    lower: usize,
    upper: usize,
    reverse: bool,
    interpolator: &dyn Interpolator<T>,
) -> T {
    if reverse {
        let start = Keyframe::new(1.0 - keyframes[upper].percentage, keyframes[upper].value.clone());
        let end = Keyframe::new(1.0 - keyframes[lower].percentage, keyframes[lower].value.clone());
        interpolator.lerp(target, &start, &end)
    } else {
        interpolator.lerp(target, &keyframes[lower], &keyframes[upper])
    }
}

/// Resolve the value of a track at `target` percentage.
///
/// - Above 1.0 the segment at the end of play extrapolates (the last two
///   keyframes, or the first two in reverse).
/// - Below 0.0 the segment at the start of play extrapolates.
/// - Otherwise a binary search returns an exact match directly, or
///   interpolates between the two keyframes that bracket `target`. Targets
///   before the first or after the last keyframe extrapolate from the nearest
///   segment.
///
/// `keyframes` must hold at least two entries sorted ascending, which
/// [`Keyframes`] guarantees.
pub fn resolve<T: Clone>(
    target: f32,
    keyframes: &[Keyframe<T>],
    interpolator: &dyn Interpolator<T>,
    reverse: bool,
) -> T {
    let len = keyframes.len();
    debug_assert!(len >= 2, "resolve needs at least two keyframes");

    // Segments at the start and end of play, in index terms
    let (head, tail) = if reverse {
        ((len - 2, len - 1), (0, 1))
    } else {
        ((0, 1), (len - 2, len - 1))
    };

    if target > 1.0 {
        return lerp_pair(target, keyframes, tail.0, tail.1, reverse, interpolator);
    }
    if target < 0.0 {
        return lerp_pair(target, keyframes, head.0, head.1, reverse, interpolator);
    }

    // Effective percentages ascend with the index going forward, descend in reverse
    let mut left: isize = 0;
    let mut right: isize = len as isize - 1;
    while left <= right {
        let mid = left + (right - left) / 2;
        let mid_percentage = effective_percentage(&keyframes[mid as usize], reverse);
        if mid_percentage == target {
            return keyframes[mid as usize].value.clone();
        }
        let target_is_later = mid_percentage < target;
        if target_is_later != reverse {
            left = mid + 1;
        } else {
            right = mid - 1;
        }
    }

    // `left` is the insertion point: keyframes[left - 1] and keyframes[left]
    // bracket the target
    let left = left as usize;
    if left == 0 {
        let (lower, upper) = if reverse { tail } else { head };
        return lerp_pair(target, keyframes, lower, upper, reverse, interpolator);
    }
    if left >= len {
        let (lower, upper) = if reverse { head } else { tail };
        return lerp_pair(target, keyframes, lower, upper, reverse, interpolator);
    }
    lerp_pair(target, keyframes, left - 1, left, reverse, interpolator)
}

/// Tracks the first keyframe not yet passed during playback.
///
/// Lets an animation recognise an exact keyframe hit without searching.
/// Forward playback walks up from index 0; reverse walks down from the last
/// index.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct KeyframeCursor {
    index: isize,
}

impl KeyframeCursor {
    /// Cursor positioned at the start of play
    pub fn new(len: usize, reverse: bool) -> Self {
        let mut cursor = Self::default();
        cursor.reset(len, reverse);
        cursor
    }

    pub fn reset(&mut self, len: usize, reverse: bool) {
        self.index = if reverse { len as isize - 1 } else { 0 };
    }

    /// Current index, `None` once every keyframe has been passed
    pub fn index(&self, len: usize) -> Option<usize> {
        (self.index >= 0 && (self.index as usize) < len).then_some(self.index as usize)
    }

    /// Value of the cursor keyframe when it sits exactly on `target`
    pub fn exact_hit<'a, T>(&self, keyframes: &'a [Keyframe<T>], target: f32, reverse: bool) -> Option<&'a T> {
        let kf = &keyframes[self.index(keyframes.len())?];
        (effective_percentage(kf, reverse) == target).then_some(&kf.value)
    }

    /// Move past every keyframe at or before `target`
    pub fn advance<T>(&mut self, keyframes: &[Keyframe<T>], target: f32, reverse: bool) {
        while let Some(idx) = self.index(keyframes.len()) {
            if effective_percentage(&keyframes[idx], reverse) > target {
                break;
            }
            self.index += if reverse { -1 } else { 1 };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpolate::{NumberInterpolator, StringInterpolator};

    fn track() -> Keyframes<f32> {
        Keyframes::try_from(vec![(0.0, 0.0), (0.5, 3.0), (1.0, 10.0)]).unwrap()
    }

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-4
    }

    #[test]
    fn test_rejects_short_track() {
        let err = Keyframes::new(vec![Keyframe::new(0.0, 1.0)]).unwrap_err();
        assert!(matches!(err, AnimationError::InvalidKeyframes(_)));
    }

    #[test]
    fn test_rejects_unsorted_and_duplicates() {
        assert!(Keyframes::try_from(vec![(0.0, 1.0), (1.0, 2.0), (0.5, 3.0)]).is_err());
        assert!(Keyframes::try_from(vec![(0.0, 1.0), (0.5, 2.0), (0.5, 3.0)]).is_err());
        assert!(Keyframes::try_from(vec![(0.0, 1.0), (f32::NAN, 2.0)]).is_err());
    }

    #[test]
    fn test_builder_from_to_replace_endpoints() {
        let track = Keyframes::builder()
            .from(1.0_f32)
            .to(2.0)
            .from(5.0)
            .to(6.0)
            .build()
            .unwrap();
        assert_eq!(track.len(), 2);
        assert_eq!(track[0], Keyframe::new(0.0, 5.0));
        assert_eq!(track[1], Keyframe::new(1.0, 6.0));
    }

    #[test]
    fn test_builder_insert_keeps_order() {
        let builder = Keyframes::builder()
            .insert_at(0.75, 'c')
            .insert_at(0.25, 'a')
            .insert_at(0.5, 'b');
        assert_eq!(builder.len(), 3);
        let track = builder.build().unwrap();
        let values: Vec<char> = track.iter().map(|kf| kf.value).collect();
        assert_eq!(values, vec!['a', 'b', 'c']);
        assert!(Keyframes::<f32>::builder().from(1.0).clear().is_empty());
    }

    #[test]
    fn test_exact_match_returns_stored_value() {
        let track = track();
        assert_eq!(resolve(0.5, &track, &NumberInterpolator, false), 3.0);
        assert_eq!(resolve(1.0, &track, &NumberInterpolator, false), 10.0);
        assert_eq!(resolve(0.0, &track, &NumberInterpolator, false), 0.0);
    }

    #[test]
    fn test_interpolates_between_neighbours() {
        let track = track();
        assert!(approx(resolve(0.25, &track, &NumberInterpolator, false), 1.5));
        assert!(approx(resolve(0.75, &track, &NumberInterpolator, false), 6.5));
    }

    #[test]
    fn test_extrapolates_past_both_ends() {
        let track = track();
        // last segment slope is 14 per unit
        assert!(approx(resolve(1.1, &track, &NumberInterpolator, false), 11.4));
        // first segment slope is 6 per unit
        assert!(approx(resolve(-0.1, &track, &NumberInterpolator, false), -0.6));
    }

    #[test]
    fn test_reverse_transposes_percentages() {
        let track = track();
        assert_eq!(resolve(0.0, &track, &NumberInterpolator, true), 10.0);
        assert_eq!(resolve(0.5, &track, &NumberInterpolator, true), 3.0);
        assert_eq!(resolve(1.0, &track, &NumberInterpolator, true), 0.0);
        assert!(approx(resolve(0.25, &track, &NumberInterpolator, true), 6.5));
        assert!(approx(resolve(0.75, &track, &NumberInterpolator, true), 1.5));
    }

    #[test]
    fn test_reverse_extrapolation_continues_play_direction() {
        let track = track();
        // past the end of reverse play the first segment continues below 0
        assert!(approx(resolve(1.1, &track, &NumberInterpolator, true), -0.6));
        // before the start of reverse play the last segment continues above 10
        assert!(approx(resolve(-0.1, &track, &NumberInterpolator, true), 11.4));
    }

    #[test]
    fn test_target_outside_partial_track() {
        let track = Keyframes::try_from(vec![(0.2, 2.0_f32), (0.6, 6.0)]).unwrap();
        assert!(approx(resolve(0.1, &track, &NumberInterpolator, false), 1.0));
        assert!(approx(resolve(0.8, &track, &NumberInterpolator, false), 8.0));
    }

    #[test]
    fn test_discrete_extrapolation_snaps() {
        let track = Keyframes::try_from(vec![(0.0, "a".to_string()), (1.0, "b".to_string())]).unwrap();
        assert_eq!(resolve(-0.3, &track, &StringInterpolator, false), "a");
        assert_eq!(resolve(1.3, &track, &StringInterpolator, false), "b");
        assert_eq!(resolve(0.3, &track, &StringInterpolator, true), "b");
    }

    #[test]
    fn test_cursor_forward() {
        let track = track();
        let mut cursor = KeyframeCursor::new(track.len(), false);
        assert_eq!(cursor.exact_hit(&track, 0.0, false), Some(&0.0));

        cursor.advance(&track, 0.0, false);
        assert_eq!(cursor.index(track.len()), Some(1));
        assert_eq!(cursor.exact_hit(&track, 0.5, false), Some(&3.0));
        assert_eq!(cursor.exact_hit(&track, 0.4, false), None);

        cursor.advance(&track, 1.0, false);
        assert_eq!(cursor.index(track.len()), None);
        assert_eq!(cursor.exact_hit(&track, 1.0, false), None);
    }

    #[test]
    fn test_cursor_reverse() {
        let track = track();
        let mut cursor = KeyframeCursor::new(track.len(), true);
        assert_eq!(cursor.index(track.len()), Some(2));
        assert_eq!(cursor.exact_hit(&track, 0.0, true), Some(&10.0));

        cursor.advance(&track, 0.6, true);
        assert_eq!(cursor.index(track.len()), Some(0));

        cursor.reset(track.len(), false);
        assert_eq!(cursor.index(track.len()), Some(0));
    }
}
