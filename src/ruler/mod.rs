//! Depth ruler calibration.
//!
//! Each table half carries a ruler column printed with evenly spaced tick
//! marks. Detecting those ticks gives a pixels-per-depth-unit rate, which
//! turns vertical pixel positions into depths (quantized to half units) and
//! back.

use crate::config::ConsolidationConfig;
use crate::error::{Error, Result};
use crate::geometry::{Point, Segment};
use crate::lines::{AngleFamily, LineDetector, crop, detect_and_consolidate, invert};
use crate::structure::ColumnBounds;
use crate::utils::{median, safe_float_cmp};
use image::GrayImage;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Fewest ticks a ruler column must yield.
pub const MIN_RULER_TICKS: usize = 19;

/// Tick count from which the first and last ticks may replace the column
/// boundary as the ruler's ends.
pub const BOUNDARY_TICK_COUNT: usize = 20;

/// Fraction of the tick spacing within which a detected tick is taken to be
/// the ruler's end.
pub const BOUNDARY_TICK_FRACTION: f64 = 0.67;

/// Largest angle from horizontal for a tick (18°).
pub const TICK_ANGLE_TOLERANCE: f64 = PI / 10.0;

/// Whether a segment lies within 18° of horizontal.
pub fn close_to_horizontal(segment: &Segment) -> bool {
    segment.angle_to(&Point::new(1.0, 0.0)) < TICK_ANGLE_TOLERANCE
}

/// Detect the tick marks in a cropped ruler column.
///
/// Returns ticks in the crop's pixel coordinates, unsorted.
///
/// # Errors
///
/// [`Error::InsufficientTicks`] if fewer than [`MIN_RULER_TICKS`] remain after
/// filtering.
pub fn detect_ruler_ticks<D: LineDetector + ?Sized>(detector: &D, ruler_image: &GrayImage) -> Result<Vec<Segment>> {
    let config = ConsolidationConfig::ruler_tick(ruler_image.width());
    let inverted = invert(ruler_image);

    let consolidation = detect_and_consolidate(detector, &inverted, AngleFamily::Horizontal, &config)?;

    let found = consolidation.merged.len();
    let ticks: Vec<Segment> = consolidation
        .merged
        .into_iter()
        .filter(close_to_horizontal)
        .collect();

    log::debug!(
        "Found {} ruler ticks ({} dropped as not horizontal)",
        ticks.len(),
        found - ticks.len()
    );

    if ticks.len() < MIN_RULER_TICKS {
        return Err(Error::InsufficientTicks {
            found: ticks.len(),
            required: MIN_RULER_TICKS,
        });
    }

    Ok(ticks)
}

/// A calibrated pixel-to-depth mapping for one ruler column.
///
/// Ruler-relative pixel positions are measured from the top of the ruler
/// column; document positions from the top of the page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DepthRuler {
    pixel_depth_rate: f64,
    document_offset_height: f64,
    starting_depth: f64,
    ending_depth: f64,
    ticks: Vec<Segment>,
    top_pixels: f64,
    bottom_pixels: f64,
}

impl DepthRuler {
    /// Detect the ticks of a ruler column on `page` and calibrate from them.
    ///
    /// `pixel_offset` is the document row that ruler-relative row 0 refers to.
    pub fn calibrate<D: LineDetector + ?Sized>(
        detector: &D,
        page: &GrayImage,
        bounds: &ColumnBounds,
        pixel_offset: f64,
        starting_depth: f64,
        ending_depth: f64,
    ) -> Result<Self> {
        check_depth_range(starting_depth, ending_depth)?;

        let top_left = bounds.left.highest_point().floor();
        let bottom_right = bounds.right.lowest_point().floor();

        let ruler_image = crop(
            page,
            "ruler",
            top_left.x as i64,
            top_left.y as i64,
            bottom_right.x as i64,
            bottom_right.y as i64,
        )?;

        let ticks = detect_ruler_ticks(detector, &ruler_image)?;
        Self::from_ticks(ticks, bounds, pixel_offset, starting_depth, ending_depth)
    }

    /// Calibrate from ticks already detected in the ruler column.
    ///
    /// Ticks are in ruler-relative pixels (origin at the left boundary's
    /// highest point).
    pub fn from_ticks(
        mut ticks: Vec<Segment>,
        bounds: &ColumnBounds,
        pixel_offset: f64,
        starting_depth: f64,
        ending_depth: f64,
    ) -> Result<Self> {
        check_depth_range(starting_depth, ending_depth)?;

        if ticks.len() < MIN_RULER_TICKS {
            return Err(Error::InsufficientTicks {
                found: ticks.len(),
                required: MIN_RULER_TICKS,
            });
        }

        ticks.sort_by(|a, b| safe_float_cmp(a.average_y(), b.average_y()));

        let gaps: Vec<f64> = ticks
            .windows(2)
            .map(|pair| pair[1].average_y() - pair[0].average_y())
            .collect();
        let normal_gap = median(&gaps).unwrap_or_default();
        if !(normal_gap > 0.0 && normal_gap.is_finite()) {
            return Err(Error::DegenerateRuler { rate: normal_gap });
        }

        let origin = bounds.left.highest_point();
        let mut top_pixels = (bounds.left.highest_point().y + bounds.right.highest_point().y) / 2.0 - origin.y;
        let mut bottom_pixels = (bounds.left.lowest_point().y + bounds.right.lowest_point().y) / 2.0 - origin.y;

        if ticks.len() >= BOUNDARY_TICK_COUNT {
            let tolerance = normal_gap * BOUNDARY_TICK_FRACTION;

            if let Some(last) = ticks.last() {
                if bottom_pixels - last.average_y() < tolerance {
                    bottom_pixels = last.average_y();
                }
            }
            if let Some(first) = ticks.first() {
                if first.average_y() - top_pixels < tolerance {
                    top_pixels = first.average_y();
                }
            }
        }

        let ruler = Self {
            pixel_depth_rate: normal_gap,
            document_offset_height: pixel_offset + top_pixels,
            starting_depth,
            ending_depth,
            ticks,
            top_pixels,
            bottom_pixels,
        };

        log::debug!(
            "Calibrated ruler: {:.2} px per unit, offset {:.2}, depth {}..{}, pixels {:.2}..{:.2}",
            ruler.pixel_depth_rate,
            ruler.document_offset_height,
            starting_depth,
            ending_depth,
            top_pixels,
            bottom_pixels
        );

        Ok(ruler)
    }

    /// Depth at a pixel row, rounded to the nearest half unit and clamped to
    /// the ruler's range.
    ///
    /// `pixel` is measured from the top of a region whose own document offset
    /// is `offset`; pass `0.0` for document rows.
    pub fn ask_for_depth(&self, pixel: f64, offset: f64) -> f64 {
        let relative = pixel + offset - self.document_offset_height;
        let units = relative / self.pixel_depth_rate;
        let depth = self.starting_depth + (units * 2.0).round_ties_even() / 2.0;

        log::trace!("Pixel {} (offset {}) is depth {}", pixel, offset, depth);

        depth.clamp(self.starting_depth, self.ending_depth)
    }

    /// Pixel row of a depth, clamped to the ruler's ends.
    ///
    /// The row is ruler-relative unless `document_relative` is set.
    ///
    /// # Errors
    ///
    /// [`Error::DepthOutOfRange`] if `depth` lies outside the ruler.
    pub fn ask_for_pixels(&self, depth: f64, document_relative: bool) -> Result<f64> {
        if depth < self.starting_depth || depth > self.ending_depth {
            return Err(Error::DepthOutOfRange {
                depth,
                starting_depth: self.starting_depth,
                ending_depth: self.ending_depth,
            });
        }

        let guess = ((depth - self.starting_depth) * self.pixel_depth_rate).clamp(self.top_pixels, self.bottom_pixels);

        if document_relative {
            Ok(guess + self.document_offset_height)
        } else {
            Ok(guess)
        }
    }

    /// Pixels per unit of depth.
    pub fn pixel_depth_rate(&self) -> f64 {
        self.pixel_depth_rate
    }

    /// Document row of the ruler's top tick.
    pub fn document_offset_height(&self) -> f64 {
        self.document_offset_height
    }

    /// Depth at the top of the ruler.
    pub fn starting_depth(&self) -> f64 {
        self.starting_depth
    }

    /// Depth at the bottom of the ruler.
    pub fn ending_depth(&self) -> f64 {
        self.ending_depth
    }

    /// Detected ticks, sorted top to bottom, in ruler-relative pixels.
    pub fn ticks(&self) -> &[Segment] {
        &self.ticks
    }

    /// Ruler-relative row of the top tick.
    pub fn top_pixels(&self) -> f64 {
        self.top_pixels
    }

    /// Ruler-relative row of the bottom tick.
    pub fn bottom_pixels(&self) -> f64 {
        self.bottom_pixels
    }

    /// Give every tick a fresh identifier.
    pub fn refresh(&mut self) {
        for tick in &mut self.ticks {
            tick.refresh();
        }
    }
}

fn check_depth_range(starting_depth: f64, ending_depth: f64) -> Result<()> {
    if starting_depth > ending_depth {
        return Err(Error::InvalidDepthRange {
            starting_depth,
            ending_depth,
        });
    }
    Ok(())
}
