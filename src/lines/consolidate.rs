//! Fixed-point consolidation of raw line segments.
//!
//! The working set lives in an append-only arena of segments; `order` holds
//! the arena slots that are still live, in scan order. A merge retires both
//! inputs from `order`, appends the merged segment to the arena, re-sorts by
//! angle and restarts the scan from the first segment. Pairs proven
//! incompatible are remembered by id for the rest of the pass.

use super::average::{alongside_average, intersecting_average};
use super::relation::{Relation, classify, endpoint_distances};
use crate::config::{Axis, ConsolidationConfig};
use crate::error::{Error, Result};
use crate::geometry::Segment;
use crate::utils::safe_float_cmp;
use std::collections::HashSet;

/// Output of one consolidation pass.
#[derive(Debug, Clone, Default)]
pub struct Consolidation {
    /// The input segments, untouched.
    pub raw: Vec<Segment>,
    /// The consolidated segments.
    pub merged: Vec<Segment>,
}

/// Merge redundant and fragmented segments until no pair can be merged.
///
/// With a projection axis, every segment is first snapped onto it;
/// otherwise segments are scanned in ascending angle order. Filtering the
/// result by length is left to the caller.
///
/// # Errors
///
/// Returns [`Error::DegenerateSegment`] when a merge produces non-finite
/// coordinates.
///
/// # Examples
///
/// ```
/// use borelog_oxide::config::ConsolidationConfig;
/// use borelog_oxide::geometry::Segment;
/// use borelog_oxide::lines::consolidate;
///
/// let raw = vec![
///     Segment::from_coords(0.0, 10.0, 100.0, 10.0),
///     Segment::from_coords(102.0, 10.0, 250.0, 10.0),
/// ];
///
/// let result = consolidate(raw, &ConsolidationConfig::page_horizontal()).unwrap();
/// assert_eq!(result.raw.len(), 2);
/// assert_eq!(result.merged.len(), 1);
/// assert_eq!(result.merged[0].length(), 250.0);
/// ```
pub fn consolidate(raw: Vec<Segment>, config: &ConsolidationConfig) -> Result<Consolidation> {
    let working: Vec<Segment> = match config.projection {
        Some(Axis::Horizontal) => raw.iter().map(Segment::project_to_horizontal).collect(),
        Some(Axis::Vertical) => raw.iter().map(Segment::project_to_vertical).collect(),
        None => {
            let mut sorted = raw.clone();
            sorted.sort_by(|a, b| safe_float_cmp(a.angle(), b.angle()));
            sorted
        },
    };

    let input_count = working.len();
    let mut engine = Engine::new(working, config);
    engine.run()?;

    log::debug!(
        "Consolidated {} segments into {} ({} merges, {} comparisons skipped)",
        input_count,
        engine.order.len(),
        engine.merges,
        engine.skipped
    );

    Ok(Consolidation {
        raw,
        merged: engine.into_segments(),
    })
}

/// What to do with one (current, candidate) pair.
#[derive(Debug)]
enum Step {
    /// Already known to be incompatible.
    Skip,
    /// Incompatible; remember the pair.
    Reject,
    /// The candidate duplicates the current segment.
    DropCandidate,
    /// Replace both with the merged segment.
    Merge(Segment),
}

struct Engine<'a> {
    arena: Vec<Segment>,
    order: Vec<usize>,
    compare_fails: HashSet<(u64, u64)>,
    config: &'a ConsolidationConfig,
    merges: usize,
    skipped: usize,
}

impl<'a> Engine<'a> {
    fn new(segments: Vec<Segment>, config: &'a ConsolidationConfig) -> Self {
        let order = (0..segments.len()).collect();
        Self {
            arena: segments,
            order,
            compare_fails: HashSet::new(),
            config,
            merges: 0,
            skipped: 0,
        }
    }

    fn run(&mut self) -> Result<()> {
        let mut index = 0;

        while index < self.order.len() {
            let mut offset = 1;
            let mut restarted = false;

            while offset < self.order.len() {
                let position = (index + offset) % self.order.len();

                match self.evaluate(index, position)? {
                    Step::Skip => {
                        self.skipped += 1;
                        offset += 1;
                    },
                    Step::Reject => {
                        let pair = self.pair_key(index, position);
                        self.compare_fails.insert(pair);
                        offset += 1;
                    },
                    Step::DropCandidate => {
                        log::trace!("Dropping duplicate {}", self.arena[self.order[position]]);
                        self.order.remove(position);
                        if position < index {
                            index -= 1;
                        }
                        self.merges += 1;
                    },
                    Step::Merge(merged) => {
                        log::trace!("Merged into {}", merged);
                        self.arena.push(merged);
                        self.order[index] = self.arena.len() - 1;
                        self.order.remove(position);
                        self.sort_by_angle();
                        self.merges += 1;

                        index = 0;
                        restarted = true;
                        break;
                    },
                }
            }

            if !restarted {
                index += 1;
            }
        }

        Ok(())
    }

    fn evaluate(&self, index: usize, position: usize) -> Result<Step> {
        if self.compare_fails.contains(&self.pair_key(index, position)) {
            return Ok(Step::Skip);
        }

        let current = &self.arena[self.order[index]];
        let candidate = &self.arena[self.order[position]];

        let angle_difference = current.angle_to(&candidate.direction());
        if !(angle_difference <= self.config.angle_threshold) {
            return Ok(Step::Reject);
        }

        let relation = classify(current, candidate, self.config);
        log::trace!("{} vs {}: {:?}", current, candidate, relation);

        let merged = match relation {
            Relation::Equivalent => return Ok(Step::DropCandidate),
            Relation::Unrelated => return Ok(Step::Reject),
            Relation::Intersecting => intersecting_average(current, candidate),
            Relation::Alongside => alongside_average(current, candidate),
            Relation::EndsTogether | Relation::OverlappingParallel => {
                farthest_endpoints(current, candidate)
            },
        };

        if !merged.is_finite() {
            return Err(Error::DegenerateSegment(format!(
                "{:?} merge of {} and {} gave {}",
                relation, current, candidate, merged
            )));
        }

        if merged.angle_to(&self.config.base_direction) > self.config.max_angle_difference {
            log::trace!("Merged segment {} strays too far from the base direction", merged);
            return Ok(Step::Reject);
        }

        Ok(Step::Merge(merged))
    }

    fn pair_key(&self, index: usize, position: usize) -> (u64, u64) {
        let a = self.arena[self.order[index]].id();
        let b = self.arena[self.order[position]].id();
        if a < b { (a, b) } else { (b, a) }
    }

    fn sort_by_angle(&mut self) {
        let arena = &self.arena;
        self.order
            .sort_by(|a, b| safe_float_cmp(arena[*a].angle(), arena[*b].angle()));
    }

    fn into_segments(self) -> Vec<Segment> {
        let mut slots: Vec<Option<Segment>> = self.arena.into_iter().map(Some).collect();
        self.order.iter().filter_map(|slot| slots[*slot].take()).collect()
    }
}

/// Join two segments through their farthest cross endpoints.
///
/// If either original is already longer than that pair it is kept as-is.
fn farthest_endpoints(current: &Segment, candidate: &Segment) -> Segment {
    let distances = endpoint_distances(current, candidate);

    let mut farthest = 0;
    for (i, distance) in distances.iter().enumerate() {
        if *distance > distances[farthest] {
            farthest = i;
        }
    }
    let max_distance = distances[farthest];

    if current.square_length() > max_distance {
        return current.clone();
    }
    if candidate.square_length() > max_distance {
        return candidate.clone();
    }

    let (pt1, pt2) = match farthest {
        0 => (current.pt1, candidate.pt1),
        1 => (current.pt1, candidate.pt2),
        2 => (current.pt2, candidate.pt2),
        _ => (current.pt2, candidate.pt1),
    };

    Segment::new(pt1, pt2)
}
