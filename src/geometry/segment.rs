//! Finite line segments and the relations between them.

use super::{Point, angle_between_lines, square_distance};
use serde::{Deserialize, Serialize};
use std::f64::consts::FRAC_PI_2;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Slack allowed when testing whether a projected point falls inside a segment.
pub const ON_SEGMENT_TOLERANCE: f64 = 0.005;

/// Per-coordinate tolerance for segment equivalence.
pub const EQUIVALENCE_TOLERANCE: f64 = 0.01;

static NEXT_SEGMENT_ID: AtomicU64 = AtomicU64::new(1);

fn next_segment_id() -> u64 {
    NEXT_SEGMENT_ID.fetch_add(1, Ordering::Relaxed)
}

/// A straight segment between two points.
///
/// The angle is computed once when the segment is built and is carried
/// over unchanged by [`Segment::translate`]. Every constructed segment gets a
/// process-unique id, which the consolidation engine uses to remember pairs
/// it has already rejected.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Segment {
    /// First endpoint
    pub pt1: Point,
    /// Second endpoint
    pub pt2: Point,
    angle: f64,
    id: u64,
}

impl Segment {
    /// Create a segment, computing its angle from the endpoints.
    ///
    /// # Examples
    ///
    /// ```
    /// use borelog_oxide::geometry::{Point, Segment};
    ///
    /// let s = Segment::new(Point::new(0.0, 0.0), Point::new(3.0, 4.0));
    /// assert_eq!(s.length(), 5.0);
    /// assert_eq!(s.midpoint(), Point::new(1.5, 2.0));
    /// ```
    pub fn new(pt1: Point, pt2: Point) -> Self {
        Self::with_angle(pt1, pt2, angle_of_points(&pt1, &pt2))
    }

    /// Create a segment with an explicitly preserved angle.
    pub fn with_angle(pt1: Point, pt2: Point, angle: f64) -> Self {
        Self {
            pt1,
            pt2,
            angle,
            id: next_segment_id(),
        }
    }

    /// Create a segment from raw coordinates.
    pub fn from_coords(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self::new(Point::new(x1, y1), Point::new(x2, y2))
    }

    /// Angle of the segment in `(-π/2, π/2]`, fixed at construction.
    pub fn angle(&self) -> f64 {
        self.angle
    }

    /// Process-unique identifier.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Give this segment a fresh identifier.
    ///
    /// Segments restored from a cache carry ids issued by another process,
    /// which may collide with ids issued in this one.
    pub fn refresh(&mut self) {
        self.id = next_segment_id();
    }

    /// Direction vector from `pt1` to `pt2`.
    pub fn direction(&self) -> Point {
        self.pt2 - self.pt1
    }

    /// Squared length.
    pub fn square_length(&self) -> f64 {
        square_distance(&self.pt1, &self.pt2)
    }

    /// Length.
    pub fn length(&self) -> f64 {
        self.square_length().sqrt()
    }

    /// Mean x of the endpoints.
    pub fn average_x(&self) -> f64 {
        (self.pt1.x + self.pt2.x) / 2.0
    }

    /// Mean y of the endpoints.
    pub fn average_y(&self) -> f64 {
        (self.pt1.y + self.pt2.y) / 2.0
    }

    /// Midpoint of the segment.
    pub fn midpoint(&self) -> Point {
        Point::new(self.average_x(), self.average_y())
    }

    /// Endpoint with the smallest y.
    pub fn highest_point(&self) -> Point {
        if self.pt2.y < self.pt1.y { self.pt2 } else { self.pt1 }
    }

    /// Endpoint with the largest y.
    pub fn lowest_point(&self) -> Point {
        if self.pt2.y > self.pt1.y { self.pt2 } else { self.pt1 }
    }

    /// Endpoint with the smallest x.
    pub fn leftmost_point(&self) -> Point {
        if self.pt2.x < self.pt1.x { self.pt2 } else { self.pt1 }
    }

    /// Endpoint with the largest x.
    pub fn rightmost_point(&self) -> Point {
        if self.pt2.x > self.pt1.x { self.pt2 } else { self.pt1 }
    }

    /// Whether the segment has no horizontal extent.
    pub fn is_vertical(&self) -> bool {
        self.pt2.x - self.pt1.x == 0.0
    }

    /// Shift both endpoints by `offset`, keeping the angle.
    pub fn translate(&self, offset: Point) -> Segment {
        Segment::with_angle(self.pt1 + offset, self.pt2 + offset, self.angle)
    }

    /// Collapse onto a horizontal line through the mean y.
    pub fn project_to_horizontal(&self) -> Segment {
        let y = self.average_y();
        Segment::new(Point::new(self.pt1.x, y), Point::new(self.pt2.x, y))
    }

    /// Collapse onto a vertical line through the mean x.
    pub fn project_to_vertical(&self) -> Segment {
        let x = self.average_x();
        Segment::new(Point::new(x, self.pt1.y), Point::new(x, self.pt2.y))
    }

    /// Whether both endpoints are finite.
    pub fn is_finite(&self) -> bool {
        self.pt1.is_finite() && self.pt2.is_finite()
    }

    /// Acute angle between this segment's line and a direction vector.
    pub fn angle_to(&self, direction: &Point) -> f64 {
        angle_between_lines(&self.direction(), direction)
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({:.2}, {:.2}), ({:.2}, {:.2})",
            self.pt1.x, self.pt1.y, self.pt2.x, self.pt2.y
        )
    }
}

fn angle_of_points(pt1: &Point, pt2: &Point) -> f64 {
    let dx = pt2.x - pt1.x;
    let dy = pt2.y - pt1.y;

    if dx == 0.0 {
        return FRAC_PI_2;
    }

    (dy / dx).atan()
}

/// Project `pt` onto the infinite line through `segment`.
///
/// Returns the projected point and the origin the projection was taken
/// from (`segment.pt1`).
pub fn project_point(segment: &Segment, pt: &Point) -> (Point, Point) {
    let origin = segment.pt1;
    let onto = segment.pt2 - origin;
    let projection = (*pt - origin).project_onto(&onto);

    (projection + origin, origin)
}

/// Whether a point already known to lie on the segment's line falls inside
/// the segment.
///
/// Only the dominant coordinate is compared (y for vertical segments, x
/// otherwise), with [`ON_SEGMENT_TOLERANCE`] of slack on both ends.
pub fn contains_projected_point(segment: &Segment, pt: &Point) -> bool {
    let (start, end, value) = if segment.is_vertical() {
        (segment.pt1.y, segment.pt2.y, pt.y)
    } else {
        (segment.pt1.x, segment.pt2.x, pt.x)
    };

    let (low, high) = if end > start { (start, end) } else { (end, start) };

    value - low >= -ON_SEGMENT_TOLERANCE && high - value >= -ON_SEGMENT_TOLERANCE
}

/// Intersection of the infinite lines through two segments.
///
/// The lines must not be parallel; check with [`is_parallel`] first.
pub fn line_intersection(a: &Segment, b: &Segment) -> Point {
    debug_assert!(!is_parallel(a, b), "intersection requested for parallel lines");

    let slope_of = |s: &Segment| (s.pt2.y - s.pt1.y) / (s.pt2.x - s.pt1.x);
    let intercept_of = |s: &Segment, slope: f64| s.pt1.y - slope * s.pt1.x;

    if a.is_vertical() {
        let slope = slope_of(b);
        let x = a.pt1.x;
        Point::new(x, slope * x + intercept_of(b, slope))
    } else if b.is_vertical() {
        let slope = slope_of(a);
        let x = b.pt1.x;
        Point::new(x, slope * x + intercept_of(a, slope))
    } else {
        let slope_a = slope_of(a);
        let slope_b = slope_of(b);
        let intercept_a = intercept_of(a, slope_a);
        let intercept_b = intercept_of(b, slope_b);

        let x = (intercept_b - intercept_a) / (slope_a - slope_b);
        Point::new(x, x * slope_a + intercept_a)
    }
}

/// Whether two segments lie on parallel lines (both vertical, or equal slopes).
pub fn is_parallel(a: &Segment, b: &Segment) -> bool {
    match (a.is_vertical(), b.is_vertical()) {
        (true, true) => true,
        (false, false) => {
            let slope_a = (a.pt1.y - a.pt2.y) / (a.pt1.x - a.pt2.x);
            let slope_b = (b.pt1.y - b.pt2.y) / (b.pt1.x - b.pt2.x);
            slope_a == slope_b
        },
        _ => false,
    }
}

/// Whether two finite segments cross (or touch) each other.
pub fn segments_intersect(a: &Segment, b: &Segment) -> bool {
    if is_parallel(a, b) {
        return false;
    }

    let candidate = line_intersection(a, b);
    contains_projected_point(a, &candidate) && contains_projected_point(b, &candidate)
}

/// Whether two segments have the same endpoints, in either order.
pub fn is_equivalent(a: &Segment, b: &Segment) -> bool {
    let close = |p: &Point, q: &Point| {
        (p.x - q.x).abs() < EQUIVALENCE_TOLERANCE && (p.y - q.y).abs() < EQUIVALENCE_TOLERANCE
    };

    (close(&a.pt1, &b.pt1) && close(&a.pt2, &b.pt2))
        || (close(&a.pt1, &b.pt2) && close(&a.pt2, &b.pt1))
}

/// The subset of `candidates` that cross `leader`.
pub fn lines_that_intersect<'a>(leader: &Segment, candidates: Vec<&'a Segment>) -> Vec<&'a Segment> {
    candidates.into_iter().filter(|c| segments_intersect(leader, c)).collect()
}
