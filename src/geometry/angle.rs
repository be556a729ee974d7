//! Angle helpers for segments and direction vectors.

use super::Point;

/// Angle between two infinite lines given by their direction vectors.
///
/// Lines have no direction, so the result is the acute angle in `[0, π/2]`.
/// A zero vector yields `0`.
///
/// # Examples
///
/// ```
/// use borelog_oxide::geometry::{Point, angle_between_lines};
/// use std::f64::consts::FRAC_PI_2;
///
/// let h = Point::new(1.0, 0.0);
/// let v = Point::new(0.0, -3.0);
/// assert!((angle_between_lines(&h, &v) - FRAC_PI_2).abs() < 1e-12);
/// assert_eq!(angle_between_lines(&h, &Point::new(-5.0, 0.0)), 0.0);
/// ```
pub fn angle_between_lines(u: &Point, v: &Point) -> f64 {
    u.cross(v).abs().atan2(u.dot(v).abs())
}

/// Angle `BAC`: the angle at vertex `a` between the arms towards `b` and `c`.
///
/// Returns a value in `[0, π]`; a zero-length arm yields NaN.
pub fn angle_at(b: &Point, a: &Point, c: &Point) -> f64 {
    let arm_1 = *b - *a;
    let arm_2 = *c - *a;

    let cos = arm_1.dot(&arm_2) / (arm_1.square_length().sqrt() * arm_2.square_length().sqrt());

    // Rounding can push the cosine slightly past ±1.
    cos.clamp(-1.0, 1.0).acos()
}
