//! Geometric primitives for table-line analysis.
//!
//! This module provides the point/vector arithmetic, segments, and angle
//! helpers used by line consolidation, structure inference, and ruler
//! calibration. All coordinates are image pixels with `y` growing downward.

pub mod angle;
pub mod segment;

use serde::{Deserialize, Serialize};
use std::ops::{Add, Mul, Sub};

pub use angle::{angle_at, angle_between_lines};
pub use segment::{
    Segment, contains_projected_point, is_equivalent, is_parallel, line_intersection,
    lines_that_intersect, project_point, segments_intersect,
};

/// Tolerance for treating two points as the same location.
pub const POINT_EPSILON: f64 = 0.0005;

/// A 2D point in image space.
///
/// Points double as vectors: the arithmetic operators treat them as
/// displacement from the origin.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    /// X coordinate (column)
    pub x: f64,
    /// Y coordinate (row)
    pub y: f64,
}

impl Point {
    /// Create a new point.
    ///
    /// # Examples
    ///
    /// ```
    /// use borelog_oxide::geometry::Point;
    ///
    /// let point = Point::new(10.0, 20.0);
    /// assert_eq!(point.x, 10.0);
    /// assert_eq!(point.y, 20.0);
    /// ```
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Dot product with another vector.
    pub fn dot(&self, other: &Point) -> f64 {
        self.x * other.x + self.y * other.y
    }

    /// 2D cross product (z component of the 3D cross product).
    pub fn cross(&self, other: &Point) -> f64 {
        self.x * other.y - self.y * other.x
    }

    /// Squared length of this point treated as a vector.
    pub fn square_length(&self) -> f64 {
        self.dot(self)
    }

    /// Project `self` onto the direction of `onto`.
    ///
    /// Both are vectors from the origin. A zero `onto` yields non-finite
    /// coordinates.
    pub fn project_onto(&self, onto: &Point) -> Point {
        *onto * (onto.dot(self) / onto.dot(onto))
    }

    /// Floor both coordinates.
    pub fn floor(&self) -> Point {
        Point::new(self.x.floor(), self.y.floor())
    }

    /// Whether both coordinates are finite.
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl Add for Point {
    type Output = Point;

    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Point {
    type Output = Point;

    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f64> for Point {
    type Output = Point;

    fn mul(self, rhs: f64) -> Point {
        Point::new(self.x * rhs, self.y * rhs)
    }
}

/// A rectangle in image space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    /// X coordinate of top-left corner
    pub x: f64,
    /// Y coordinate of top-left corner
    pub y: f64,
    /// Width of rectangle
    pub width: f64,
    /// Height of rectangle
    pub height: f64,
}

impl Rect {
    /// Create a rectangle from two corner coordinates.
    ///
    /// # Examples
    ///
    /// ```
    /// use borelog_oxide::geometry::Rect;
    ///
    /// let rect = Rect::from_points(10.0, 20.0, 110.0, 70.0);
    /// assert_eq!(rect.x, 10.0);
    /// assert_eq!(rect.y, 20.0);
    /// assert_eq!(rect.width, 100.0);
    /// assert_eq!(rect.height, 50.0);
    /// ```
    pub fn from_points(x0: f64, y0: f64, x1: f64, y1: f64) -> Self {
        Self {
            x: x0,
            y: y0,
            width: x1 - x0,
            height: y1 - y0,
        }
    }

    /// Get the left edge x-coordinate.
    pub fn left(&self) -> f64 {
        self.x
    }

    /// Get the right edge x-coordinate.
    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    /// Get the top edge y-coordinate.
    pub fn top(&self) -> f64 {
        self.y
    }

    /// Get the bottom edge y-coordinate.
    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }
}

/// Squared Euclidean distance between two points.
///
/// Used wherever only the ordering of distances matters.
///
/// # Examples
///
/// ```
/// use borelog_oxide::geometry::{Point, square_distance};
///
/// let p1 = Point::new(0.0, 0.0);
/// let p2 = Point::new(3.0, 4.0);
///
/// assert_eq!(square_distance(&p1, &p2), 25.0);
/// ```
pub fn square_distance(p1: &Point, p2: &Point) -> f64 {
    (p2.x - p1.x).powi(2) + (p2.y - p1.y).powi(2)
}

/// Euclidean distance between two points.
pub fn euclidean_distance(p1: &Point, p2: &Point) -> f64 {
    square_distance(p1, p2).sqrt()
}

/// Whether two points coincide within [`POINT_EPSILON`].
pub fn points_equivalent(p1: &Point, p2: &Point) -> bool {
    (p1.x - p2.x).abs() < POINT_EPSILON && (p1.y - p2.y).abs() < POINT_EPSILON
}

/// Index pair of the two mutually farthest points among `points`.
///
/// Scanning starts from the last pair and only a strictly greater distance
/// replaces the current choice.
pub(crate) fn farthest_pair(points: &[Point; 4]) -> (Point, Point) {
    let mut best = (points[2], points[3]);
    let mut best_distance = square_distance(&points[2], &points[3]);

    for i in 0..2 {
        for j in (i + 1)..4 {
            let distance = square_distance(&points[i], &points[j]);
            if distance > best_distance {
                best_distance = distance;
                best = (points[i], points[j]);
            }
        }
    }

    best
}
