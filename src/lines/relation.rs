//! Classification of how two segments relate to each other.

use crate::config::ConsolidationConfig;
use crate::geometry::{
    Point, Segment, contains_projected_point, is_equivalent, project_point, segments_intersect,
    square_distance,
};

/// How a pair of segments relates, in the order the cases are tested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    /// Same endpoints within tolerance.
    Equivalent,
    /// The segments cross at a point lying on both.
    Intersecting,
    /// Near-parallel and proximate without crossing.
    Alongside,
    /// Some pair of endpoints is within the ends-together threshold.
    EndsTogether,
    /// Collinear segments that overlap.
    OverlappingParallel,
    /// No merge case applies.
    Unrelated,
}

/// Classify the relation between `current` and `candidate`.
///
/// Angle gating is the caller's job; this only looks at positions.
pub fn classify(current: &Segment, candidate: &Segment, config: &ConsolidationConfig) -> Relation {
    if is_equivalent(current, candidate) {
        return Relation::Equivalent;
    }

    if segments_intersect(current, candidate) {
        return Relation::Intersecting;
    }

    let alongside = ProjectionCounts::measure(current, candidate, config.alongside_threshold);
    if alongside.zero != 4 && alongside.close >= 2 {
        return Relation::Alongside;
    }

    if ends_within(current, candidate, config.ends_together_threshold) {
        return Relation::EndsTogether;
    }

    let overlap = ProjectionCounts::measure(current, candidate, config.ends_together_threshold);
    if overlap.zero == 4 && overlap.close >= 2 {
        return Relation::OverlappingParallel;
    }

    Relation::Unrelated
}

/// Counts over the four endpoint-to-opposite-segment projections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
struct ProjectionCounts {
    /// Projections at exactly zero squared distance
    zero: usize,
    /// Projections under the threshold that land on the opposite segment
    close: usize,
}

impl ProjectionCounts {
    fn measure(left: &Segment, right: &Segment, threshold: f64) -> Self {
        let mut counts = Self::default();

        counts.add(right, &left.pt1, threshold);
        counts.add(right, &left.pt2, threshold);
        counts.add(left, &right.pt1, threshold);
        counts.add(left, &right.pt2, threshold);

        counts
    }

    fn add(&mut self, onto: &Segment, pt: &Point, threshold: f64) {
        let (projection, origin) = project_point(onto, pt);

        // Squared perpendicular distance; exactly zero for collinear points.
        let direction = onto.direction();
        let offset = *pt - origin;
        let distance = direction.cross(&offset).powi(2) / direction.square_length();

        if distance == 0.0 {
            self.zero += 1;
        }
        if distance < threshold && contains_projected_point(onto, &projection) {
            self.close += 1;
        }
    }
}

/// Whether any endpoint of `a` is within squared distance `threshold` of an
/// endpoint of `b`.
fn ends_within(a: &Segment, b: &Segment, threshold: f64) -> bool {
    endpoint_distances(a, b).iter().any(|d| *d < threshold)
}

/// Squared distances between the cross endpoint pairs, in the order
/// `(a1, b1)`, `(a1, b2)`, `(a2, b2)`, `(a2, b1)`.
pub(crate) fn endpoint_distances(a: &Segment, b: &Segment) -> [f64; 4] {
    [
        square_distance(&a.pt1, &b.pt1),
        square_distance(&a.pt1, &b.pt2),
        square_distance(&a.pt2, &b.pt2),
        square_distance(&a.pt2, &b.pt1),
    ]
}
