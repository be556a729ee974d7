//! Representative "average" segments for pairs that run alongside each other
//! or cross.
//!
//! Plain endpoint averaging skews badly when one segment is much shorter or
//! the crossing point sits near an end. Both merges here weight the result
//! towards the longer segment: the alongside merge through a normal-CDF lean
//! on the squared lengths, the crossing merge through length-proportional
//! partial points measured from the intersection.

use crate::geometry::{
    Point, Segment, angle_at, contains_projected_point, euclidean_distance, farthest_pair,
    is_equivalent, line_intersection, points_equivalent, project_point, square_distance,
};
use crate::utils::normal_cdf;
use std::f64::consts::FRAC_PI_2;

/// Merge two segments that run alongside each other without crossing.
pub fn alongside_average(left: &Segment, right: &Segment) -> Segment {
    let left_length = left.square_length();
    let right_length = right.square_length();

    let length_ratio = (right_length - left_length) / ((left_length + right_length) / 2.0);
    let lean = normal_cdf(length_ratio);

    // Each pair runs from a point on the left line to a point on the right line.
    let mut pairs = Vec::with_capacity(4);
    let mut on_segment = Vec::with_capacity(4);

    for pt in [right.pt1, right.pt2] {
        let (proj, _) = project_point(left, &pt);
        on_segment.push(contains_projected_point(left, &proj));
        pairs.push(Segment::new(proj, pt));
    }

    for pt in [left.pt1, left.pt2] {
        let (proj, _) = project_point(right, &pt);
        on_segment.push(contains_projected_point(right, &proj));
        pairs.push(Segment::new(pt, proj));
    }

    let (first, second) = choose_projection_pairs(&pairs, &on_segment);

    let anchor_1 = pairs[first].pt1 + pairs[first].direction() * lean;
    let anchor_2 = pairs[second].pt1 + pairs[second].direction() * lean;

    extend_through(anchor_1, anchor_2, left, right)
}

/// Indices of two distinct projection pairs to interpolate between.
///
/// Pairs landing on the opposite segment come first. When exactly two land
/// and they coincide (the segments touch at a single point), the off-segment
/// pairs are used instead.
fn choose_projection_pairs(pairs: &[Segment], on_segment: &[bool]) -> (usize, usize) {
    let on: Vec<usize> = (0..pairs.len()).filter(|i| on_segment[*i]).collect();
    let off: Vec<usize> = (0..pairs.len()).filter(|i| !on_segment[*i]).collect();

    let duplicated = on.len() >= 2 && is_equivalent(&pairs[on[0]], &pairs[on[1]]);

    if duplicated && on.len() == 2 && off.len() >= 2 {
        (off[0], off[1])
    } else if duplicated && on.len() >= 3 {
        (on[0], on[2])
    } else {
        let order: Vec<usize> = on.iter().chain(off.iter()).copied().collect();
        (order[0], order[1])
    }
}

/// Geometric case of a crossing merge, detected once per pair.
#[derive(Debug, Clone, Copy)]
pub enum CrossingCase<'a> {
    /// The segments share an endpoint.
    SharedEndpoint {
        /// The shared endpoint
        shared: Point,
        /// Far end of the first segment
        end_1: Point,
        /// Far end of the second segment
        end_2: Point,
    },
    /// The intersection coincides with an endpoint of one segment.
    IntersectionOnEndpoint {
        /// The segment crossed through its interior
        full: &'a Segment,
        /// Far end of the segment that ends on the intersection
        half: Point,
        /// Intersection point
        intersection: Point,
    },
    /// The segments cross away from every endpoint.
    GeneralCrossing {
        /// Intersection point
        intersection: Point,
    },
}

impl<'a> CrossingCase<'a> {
    /// Classify a pair of crossing segments.
    ///
    /// The segments must not be parallel unless they share an endpoint.
    pub fn detect(left: &'a Segment, right: &'a Segment) -> Self {
        let shared = [
            (left.pt1, right.pt1, left.pt2, right.pt2),
            (left.pt1, right.pt2, left.pt2, right.pt1),
            (left.pt2, right.pt1, left.pt1, right.pt2),
            (left.pt2, right.pt2, left.pt1, right.pt1),
        ];
        for (a, b, end_1, end_2) in shared {
            if points_equivalent(&a, &b) {
                return CrossingCase::SharedEndpoint {
                    shared: a,
                    end_1,
                    end_2,
                };
            }
        }

        let intersection = line_intersection(left, right);

        let on_endpoint = [
            (left.pt1, right, left.pt2),
            (left.pt2, right, left.pt1),
            (right.pt1, left, right.pt2),
            (right.pt2, left, right.pt1),
        ];
        for (end, full, half) in on_endpoint {
            if points_equivalent(&end, &intersection) {
                return CrossingCase::IntersectionOnEndpoint {
                    full,
                    half,
                    intersection,
                };
            }
        }

        CrossingCase::GeneralCrossing { intersection }
    }
}

/// Merge two segments that cross each other.
///
/// At an exact right angle with arms of equal length the partial points fall
/// on `right`, so the result is `right` itself and depends on argument order.
pub fn intersecting_average(left: &Segment, right: &Segment) -> Segment {
    match CrossingCase::detect(left, right) {
        CrossingCase::SharedEndpoint {
            shared,
            end_1,
            end_2,
        } => shared_average(shared, end_1, end_2),
        CrossingCase::IntersectionOnEndpoint {
            full,
            half,
            intersection,
        } => three_point_average(full, half, intersection),
        CrossingCase::GeneralCrossing { intersection } => {
            general_crossing_average(left, right, intersection)
        },
    }
}

/// Average of two segments meeting at `shared`.
fn shared_average(shared: Point, end_1: Point, end_2: Point) -> Segment {
    if angle_at(&end_1, &shared, &end_2) < FRAC_PI_2 {
        let partial = partial_point(end_1, end_2, shared);

        let proj_1 = project_onto_line(shared, partial, end_1);
        let proj_2 = project_onto_line(shared, partial, end_2);

        if square_distance(&shared, &proj_1) > square_distance(&shared, &proj_2) {
            Segment::new(shared, proj_1)
        } else {
            Segment::new(shared, proj_2)
        }
    } else {
        let len_1 = euclidean_distance(&shared, &end_1);
        let len_2 = euclidean_distance(&shared, &end_2);
        let total = len_1 + len_2;

        let partial_1 = shared + (end_1 - shared) * (len_1 / total);
        let partial_2 = shared + (end_2 - shared) * (len_2 / total);

        Segment::new(
            project_onto_line(partial_1, partial_2, end_1),
            project_onto_line(partial_1, partial_2, end_2),
        )
    }
}

/// Average when one segment ends on the other.
fn three_point_average(full: &Segment, half: Point, intersection: Point) -> Segment {
    let dist_top = euclidean_distance(&full.pt1, &intersection);
    let dist_bottom = euclidean_distance(&full.pt2, &intersection);
    let dist_half = euclidean_distance(&half, &intersection);
    let total = dist_top + dist_bottom + dist_half;

    let partial_half = intersection + (half - intersection) * (dist_half / total);

    // Anchor on the arm of `full` that opens away from `half`.
    let (anchor, other, anchor_distance) = if angle_at(&half, &intersection, &full.pt1) > FRAC_PI_2 {
        (full.pt1, full.pt2, dist_top)
    } else {
        (full.pt2, full.pt1, dist_bottom)
    };

    let partial_full = anchor + (intersection - anchor) * (anchor_distance / total);

    let start = project_onto_line(partial_full, partial_half, anchor);
    let candidate_1 = project_onto_line(partial_full, partial_half, other);
    let candidate_2 = project_onto_line(partial_full, partial_half, half);

    let end = if square_distance(&start, &candidate_1) > square_distance(&start, &candidate_2) {
        candidate_1
    } else {
        candidate_2
    };

    Segment::new(start, end)
}

/// Average of two segments crossing away from their endpoints.
fn general_crossing_average(left: &Segment, right: &Segment, intersection: Point) -> Segment {
    let (partial_1, partial_2) = if angle_at(&left.pt1, &intersection, &right.pt2) < FRAC_PI_2 {
        (
            partial_point(right.pt2, left.pt1, intersection),
            partial_point(right.pt1, left.pt2, intersection),
        )
    } else {
        (
            partial_point(right.pt1, left.pt1, intersection),
            partial_point(right.pt2, left.pt2, intersection),
        )
    };

    extend_through(partial_1, partial_2, left, right)
}

/// Point between two arms leaving `intersection`, placed in proportion to
/// the arms' lengths so the longer arm pulls it closer.
pub(crate) fn partial_point(end_1: Point, end_2: Point, intersection: Point) -> Point {
    let arm_1 = end_1 - intersection;
    let arm_2 = end_2 - intersection;

    let (long, short) = if arm_1.square_length() > arm_2.square_length() {
        (arm_1, arm_2)
    } else {
        (arm_2, arm_1)
    };

    let towards_long = short.project_onto(&long) - short;

    let short_length = short.square_length().sqrt();
    let long_length = long.square_length().sqrt();
    let ratio = long_length / (short_length + long_length);

    towards_long * ratio + short + intersection
}

/// Project `pt` onto the infinite line through `a` and `b`.
fn project_onto_line(a: Point, b: Point, pt: Point) -> Point {
    (pt - a).project_onto(&(b - a)) + a
}

/// Project all four endpoints onto the line through `a` and `b` and keep
/// the farthest pair.
fn extend_through(a: Point, b: Point, left: &Segment, right: &Segment) -> Segment {
    let projected = [
        project_onto_line(a, b, left.pt1),
        project_onto_line(a, b, left.pt2),
        project_onto_line(a, b, right.pt1),
        project_onto_line(a, b, right.pt2),
    ];

    let (pt1, pt2) = farthest_pair(&projected);
    Segment::new(pt1, pt2)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: &Point, b: &Point, tol: f64) -> bool {
        (a.x - b.x).abs() < tol && (a.y - b.y).abs() < tol
    }

    #[test]
    fn test_alongside_spans_both() {
        let a = Segment::from_coords(0.0, 0.0, 100.0, 2.0);
        let b = Segment::from_coords(98.0, 1.0, 200.0, 3.0);
        let merged = alongside_average(&a, &b);

        assert!(merged.is_finite());
        assert!(merged.leftmost_point().x.abs() < 0.5);
        assert!((merged.rightmost_point().x - 200.0).abs() < 0.5);
        assert!(merged.leftmost_point().y.abs() < 1.5);
        assert!((merged.rightmost_point().y - 3.0).abs() < 1.5);
    }

    #[test]
    fn test_alongside_is_symmetric() {
        let a = Segment::from_coords(0.0, 0.0, 100.0, 2.0);
        let b = Segment::from_coords(98.0, 1.0, 200.0, 3.0);
        let ab = alongside_average(&a, &b);
        let ba = alongside_average(&b, &a);

        assert!(close(&ab.leftmost_point(), &ba.leftmost_point(), 1e-6));
        assert!(close(&ab.rightmost_point(), &ba.rightmost_point(), 1e-6));
    }

    #[test]
    fn test_alongside_leans_to_longer() {
        let long = Segment::from_coords(0.0, 0.0, 400.0, 0.0);
        let short = Segment::from_coords(100.0, 4.0, 150.0, 4.0);
        let merged = alongside_average(&long, &short);

        assert!(merged.average_y() < 1.0);
        assert!((merged.length() - 400.0).abs() < 1e-6);
    }

    #[test]
    fn test_touching_parallel_uses_off_segment_pairs() {
        // Collinear horizontal segments meeting at one point.
        let a = Segment::from_coords(0.0, 5.0, 100.0, 5.0);
        let b = Segment::from_coords(100.0, 5.0, 180.0, 5.0);
        let merged = alongside_average(&a, &b);

        assert!(merged.is_finite());
        assert!((merged.length() - 180.0).abs() < 1e-6);
        assert!((merged.average_y() - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_crossing_right_angle_keeps_second_diagonal() {
        let a = Segment::from_coords(0.0, 0.0, 100.0, 100.0);
        let b = Segment::from_coords(0.0, 100.0, 100.0, 0.0);

        assert!(matches!(CrossingCase::detect(&a, &b), CrossingCase::GeneralCrossing { .. }));

        let merged = intersecting_average(&a, &b);
        assert!(close(&merged.leftmost_point(), &Point::new(0.0, 100.0), 1e-9));
        assert!(close(&merged.rightmost_point(), &Point::new(100.0, 0.0), 1e-9));

        let swapped = intersecting_average(&b, &a);
        assert!(close(&swapped.leftmost_point(), &Point::new(0.0, 0.0), 1e-9));
        assert!(close(&swapped.rightmost_point(), &Point::new(100.0, 100.0), 1e-9));
    }

    #[test]
    fn test_shallow_crossing_is_nearly_symmetric() {
        let a = Segment::from_coords(0.0, 0.0, 100.0, 10.0);
        let b = Segment::from_coords(0.0, 10.0, 100.0, 0.0);
        let ab = intersecting_average(&a, &b);
        let ba = intersecting_average(&b, &a);

        for merged in [&ab, &ba] {
            assert!(merged.leftmost_point().x.abs() < 0.5);
            assert!((merged.rightmost_point().x - 100.0).abs() < 0.5);
            assert!((merged.average_y() - 5.0).abs() < 0.5);
        }
        assert!(close(&ab.leftmost_point(), &ba.leftmost_point(), 0.5));
        assert!(close(&ab.rightmost_point(), &ba.rightmost_point(), 0.5));
    }

    #[test]
    fn test_shared_endpoint_acute() {
        let a = Segment::from_coords(0.0, 0.0, 100.0, 0.0);
        let b = Segment::from_coords(0.0, 0.0, 100.0, 10.0);

        match CrossingCase::detect(&a, &b) {
            CrossingCase::SharedEndpoint { shared, .. } => assert_eq!(shared, Point::new(0.0, 0.0)),
            other => panic!("unexpected case {:?}", other),
        }

        let merged = intersecting_average(&a, &b);
        assert_eq!(merged.pt1, Point::new(0.0, 0.0));
        assert!(merged.pt2.y > 0.0 && merged.pt2.y < 10.0);
        assert!(merged.pt2.x > 90.0);
    }

    #[test]
    fn test_shared_endpoint_obtuse() {
        // Nearly straight chain bending slightly at the shared point.
        let a = Segment::from_coords(0.0, 0.0, 100.0, 0.0);
        let b = Segment::from_coords(100.0, 0.0, 200.0, 4.0);
        let merged = intersecting_average(&a, &b);

        assert!(merged.leftmost_point().x.abs() < 0.5);
        assert!((merged.rightmost_point().x - 200.0).abs() < 0.5);
    }

    #[test]
    fn test_intersection_on_endpoint() {
        let full = Segment::from_coords(0.0, 0.0, 200.0, 0.0);
        let half = Segment::from_coords(100.0, 0.0, 180.0, 8.0);

        match CrossingCase::detect(&full, &half) {
            CrossingCase::IntersectionOnEndpoint { half: far, .. } => {
                assert_eq!(far, Point::new(180.0, 8.0))
            },
            other => panic!("unexpected case {:?}", other),
        }

        let merged = intersecting_average(&full, &half);
        assert!(merged.is_finite());
        assert!(merged.leftmost_point().x.abs() < 1.0);
        assert!(merged.rightmost_point().x > 179.0);
        assert!(merged.average_y() >= 0.0 && merged.average_y() < 8.0);
    }

    #[test]
    fn test_partial_point_equal_arms() {
        let p = partial_point(Point::new(-50.0, 50.0), Point::new(-50.0, -50.0), Point::default());
        assert!(close(&p, &Point::new(-25.0, 25.0), 1e-9));
    }
}
