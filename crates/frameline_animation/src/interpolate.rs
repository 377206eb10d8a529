//! Per-type interpolation between keyframes
//!
//! An [`Interpolator`] computes the value of an attribute at a given
//! percentage from the two keyframes that bracket it. Continuous types
//! extrapolate along the segment's slope when the percentage falls outside
//! it; discrete types snap to the nearest endpoint.

use serde::{Deserialize, Serialize};

use crate::keyframe::Keyframe;

/// Computes a value between two keyframes.
///
/// Implementations must be pure: the same inputs always produce the same
/// value and nothing else is touched.
pub trait Interpolator<T> {
    /// Value at `ratio` on the segment from `start` to `end`.
    ///
    /// `ratio` is expressed on the same percentage axis as the keyframes and
    /// may lie outside `[start.percentage, end.percentage]`.
    fn lerp(&self, ratio: f32, start: &Keyframe<T>, end: &Keyframe<T>) -> T;
}

impl<T, F> Interpolator<T> for F
where
    F: Fn(f32, &Keyframe<T>, &Keyframe<T>) -> T,
{
    fn lerp(&self, ratio: f32, start: &Keyframe<T>, end: &Keyframe<T>) -> T {
        self(ratio, start, end)
    }
}

/// Position of `ratio` relative to the segment, 0.0 at `start` and 1.0 at `end`
#[inline]
fn segment_scale<T>(ratio: f32, start: &Keyframe<T>, end: &Keyframe<T>) -> f32 {
    let span = end.percentage - start.percentage;
    if span == 0.0 {
        return 1.0;
    }
    (ratio - start.percentage) / span
}

#[inline]
fn lerp_f32(from: f32, to: f32, t: f32) -> f32 {
    from + (to - from) * t
}

/// A 2D point
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// An RGB color with unbounded float channels
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Rgb {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Rgb {
    pub const fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }
}

/// Linear interpolation for plain numbers
#[derive(Clone, Copy, Debug, Default)]
pub struct NumberInterpolator;

impl Interpolator<f32> for NumberInterpolator {
    fn lerp(&self, ratio: f32, start: &Keyframe<f32>, end: &Keyframe<f32>) -> f32 {
        lerp_f32(start.value, end.value, segment_scale(ratio, start, end))
    }
}

/// Linear interpolation floored to whole numbers.
///
/// Suited to discrete indices such as sprite-sheet frames, where the value
/// should only change once the next integer is fully reached.
#[derive(Clone, Copy, Debug, Default)]
pub struct IntegerInterpolator;

impl Interpolator<i64> for IntegerInterpolator {
    fn lerp(&self, ratio: f32, start: &Keyframe<i64>, end: &Keyframe<i64>) -> i64 {
        let t = segment_scale(ratio, start, end) as f64;
        let from = start.value as f64;
        let to = end.value as f64;
        // Guard against 0.999999 style float error just below an integer
        (from + (to - from) * t + 1e-6).floor() as i64
    }
}

/// Component-wise linear interpolation for [`Point`]
#[derive(Clone, Copy, Debug, Default)]
pub struct PointInterpolator;

impl Interpolator<Point> for PointInterpolator {
    fn lerp(&self, ratio: f32, start: &Keyframe<Point>, end: &Keyframe<Point>) -> Point {
        let t = segment_scale(ratio, start, end);
        Point {
            x: lerp_f32(start.value.x, end.value.x, t),
            y: lerp_f32(start.value.y, end.value.y, t),
        }
    }
}

/// Per-channel linear interpolation for [`Rgb`]
#[derive(Clone, Copy, Debug, Default)]
pub struct RgbInterpolator;

impl Interpolator<Rgb> for RgbInterpolator {
    fn lerp(&self, ratio: f32, start: &Keyframe<Rgb>, end: &Keyframe<Rgb>) -> Rgb {
        let t = segment_scale(ratio, start, end);
        Rgb {
            r: lerp_f32(start.value.r, end.value.r, t),
            g: lerp_f32(start.value.g, end.value.g, t),
            b: lerp_f32(start.value.b, end.value.b, t),
        }
    }
}

/// Discrete interpolation for strings.
///
/// Returns the start value for the first half of the segment (and anything
/// before it), the end value from the midpoint onward.
#[derive(Clone, Copy, Debug, Default)]
pub struct StringInterpolator;

impl Interpolator<String> for StringInterpolator {
    fn lerp(&self, ratio: f32, start: &Keyframe<String>, end: &Keyframe<String>) -> String {
        if segment_scale(ratio, start, end) < 0.5 {
            start.value.clone()
        } else {
            end.value.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kf<T>(percentage: f32, value: T) -> Keyframe<T> {
        Keyframe::new(percentage, value)
    }

    #[test]
    fn test_point_interpolating() {
        let actual = PointInterpolator.lerp(0.5, &kf(0.0, Point::new(0.0, 0.0)), &kf(1.0, Point::new(10.0, 10.0)));
        assert_eq!(actual, Point::new(5.0, 5.0));
    }

    #[test]
    fn test_point_extrapolating() {
        let start = kf(0.0, Point::new(0.0, 0.0));
        let end = kf(1.0, Point::new(10.0, 10.0));

        let beyond = PointInterpolator.lerp(1.2, &start, &end);
        assert!((beyond.x - 12.0).abs() < 1e-5 && (beyond.y - 12.0).abs() < 1e-5);

        let below = PointInterpolator.lerp(-0.2, &start, &end);
        assert!((below.x + 2.0).abs() < 1e-5 && (below.y + 2.0).abs() < 1e-5);
    }

    #[test]
    fn test_number_lerp() {
        let start = kf(0.0, 0.0);
        let end = kf(1.0, 10.0);
        assert_eq!(NumberInterpolator.lerp(0.5, &start, &end), 5.0);
        assert!((NumberInterpolator.lerp(1.2, &start, &end) - 12.0).abs() < 1e-5);
        assert!((NumberInterpolator.lerp(-0.2, &start, &end) + 2.0).abs() < 1e-5);
    }

    #[test]
    fn test_number_lerp_on_inner_segment() {
        let start = kf(0.5, 3.0);
        let end = kf(1.0, 10.0);
        assert!((NumberInterpolator.lerp(0.75, &start, &end) - 6.5).abs() < 1e-5);
    }

    #[test]
    fn test_integer_floors() {
        let start = kf(0.0, 0i64);
        let end = kf(1.0, 4i64);
        assert_eq!(IntegerInterpolator.lerp(0.2, &start, &end), 0);
        assert_eq!(IntegerInterpolator.lerp(0.25, &start, &end), 1);
        assert_eq!(IntegerInterpolator.lerp(0.74, &start, &end), 2);
        assert_eq!(IntegerInterpolator.lerp(1.0, &start, &end), 4);
    }

    #[test]
    fn test_rgb_lerp() {
        let start = kf(0.0, Rgb::new(0.0, 100.0, 255.0));
        let end = kf(1.0, Rgb::new(255.0, 100.0, 0.0));
        let mid = RgbInterpolator.lerp(0.5, &start, &end);
        assert_eq!(mid, Rgb::new(127.5, 100.0, 127.5));
    }

    #[test]
    fn test_string_snaps() {
        let start = kf(0.0, "idle".to_string());
        let end = kf(1.0, "walk".to_string());
        assert_eq!(StringInterpolator.lerp(-0.5, &start, &end), "idle");
        assert_eq!(StringInterpolator.lerp(0.49, &start, &end), "idle");
        assert_eq!(StringInterpolator.lerp(0.5, &start, &end), "walk");
        assert_eq!(StringInterpolator.lerp(1.5, &start, &end), "walk");
    }

    #[test]
    fn test_closure_interpolator() {
        let hold_start = |_: f32, start: &Keyframe<f32>, _: &Keyframe<f32>| start.value;
        assert_eq!(hold_start.lerp(0.9, &kf(0.0, 1.0), &kf(1.0, 2.0)), 1.0);
    }
}
