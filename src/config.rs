//! Configuration for line detection and consolidation.

use crate::geometry::Point;
use serde::{Deserialize, Serialize};
use std::f64::consts::{FRAC_PI_2, FRAC_PI_3, PI};

/// Axis that segments are snapped onto before consolidation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Axis {
    /// Both endpoints take the segment's mean y.
    Horizontal,
    /// Both endpoints take the segment's mean x.
    Vertical,
}

/// Line detection and consolidation parameters.
///
/// Distance thresholds are compared against squared pixel distances.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsolidationConfig {
    /// Minimum line length passed to the line detector.
    pub line_length: u32,

    /// Largest gap between aligned pixels the detector may bridge.
    pub line_gap: u32,

    /// Squared distance under which two endpoints count as "ends together".
    ///
    /// Also used as the projection threshold for overlapping parallel lines.
    pub ends_together_threshold: f64,

    /// Squared distance under which an endpoint projection counts as
    /// running alongside the other segment.
    pub alongside_threshold: f64,

    /// Largest allowed angle between a merge result and `base_direction`.
    pub max_angle_difference: f64,

    /// Orientation merge results are checked against.
    pub base_direction: Point,

    /// Largest angle between two segments that may still be merged.
    pub angle_threshold: f64,

    /// Optional axis to snap every segment onto before merging.
    pub projection: Option<Axis>,
}

impl Default for ConsolidationConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl ConsolidationConfig {
    /// Create new configuration with defaults.
    pub fn new() -> Self {
        Self {
            line_length: 50,
            line_gap: 10,
            ends_together_threshold: 10.0,
            alongside_threshold: 10.0,
            max_angle_difference: FRAC_PI_2,
            base_direction: Point::new(1.0, 0.0),
            angle_threshold: PI / 20.0,
            projection: None,
        }
    }

    /// Full-page vertical table lines.
    pub fn page_vertical() -> Self {
        Self::new()
            .with_line_length(170)
            .with_line_gap(10)
            .with_ends_together_threshold(10.0)
            .with_alongside_threshold(280.0)
            .with_max_angle_difference(FRAC_PI_3)
            .with_base_direction(Point::new(0.0, 1.0))
            .with_projection(Some(Axis::Vertical))
    }

    /// Full-page horizontal table lines.
    pub fn page_horizontal() -> Self {
        Self::new()
            .with_line_length(170)
            .with_line_gap(10)
            .with_ends_together_threshold(25.0)
            .with_alongside_threshold(121.0)
            .with_max_angle_difference(PI / 5.0)
            .with_projection(Some(Axis::Horizontal))
    }

    /// Column separators inside the header band.
    pub fn header_separator() -> Self {
        Self::page_vertical().with_line_length(160)
    }

    /// Tick marks inside a ruler column of the given pixel width.
    pub fn ruler_tick(ruler_width: u32) -> Self {
        Self::new()
            .with_line_length(ruler_width * 2 / 3)
            .with_line_gap(3)
            .with_ends_together_threshold(35.0)
            .with_alongside_threshold(35.0)
            .with_max_angle_difference(PI / 5.0)
            .with_angle_threshold(PI / 18.0)
            .with_projection(Some(Axis::Horizontal))
    }

    /// Set the detector's minimum line length.
    pub fn with_line_length(mut self, length: u32) -> Self {
        self.line_length = length;
        self
    }

    /// Set the detector's maximum line gap.
    pub fn with_line_gap(mut self, gap: u32) -> Self {
        self.line_gap = gap;
        self
    }

    /// Set the squared "ends together" threshold.
    pub fn with_ends_together_threshold(mut self, threshold: f64) -> Self {
        self.ends_together_threshold = threshold;
        self
    }

    /// Set the squared "alongside" threshold.
    pub fn with_alongside_threshold(mut self, threshold: f64) -> Self {
        self.alongside_threshold = threshold;
        self
    }

    /// Set the maximum angle between a merge result and the base direction.
    pub fn with_max_angle_difference(mut self, radians: f64) -> Self {
        self.max_angle_difference = radians;
        self
    }

    /// Set the base direction.
    pub fn with_base_direction(mut self, direction: Point) -> Self {
        self.base_direction = direction;
        self
    }

    /// Set the pairwise angle threshold.
    pub fn with_angle_threshold(mut self, radians: f64) -> Self {
        self.angle_threshold = radians;
        self
    }

    /// Set the snapping axis.
    pub fn with_projection(mut self, axis: Option<Axis>) -> Self {
        self.projection = axis;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ConsolidationConfig::default();
        assert_eq!(config.line_length, 50);
        assert_eq!(config.base_direction, Point::new(1.0, 0.0));
        assert_eq!(config.projection, None);
        assert!((config.angle_threshold - PI / 20.0).abs() < 1e-12);
    }

    #[test]
    fn test_header_preset_differs_from_page_only_in_length() {
        let page = ConsolidationConfig::page_vertical();
        let header = ConsolidationConfig::header_separator();
        assert_eq!(header.line_length, 160);
        assert_eq!(header.clone().with_line_length(page.line_length), page);
    }

    #[test]
    fn test_ruler_preset_scales_with_width() {
        let config = ConsolidationConfig::ruler_tick(61);
        assert_eq!(config.line_length, 40);
        assert_eq!(config.line_gap, 3);
        assert_eq!(config.projection, Some(Axis::Horizontal));
    }
}
