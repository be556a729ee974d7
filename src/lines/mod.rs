//! Line detection and consolidation.
//!
//! The probabilistic line transform itself is supplied by the caller through
//! [`LineDetector`]. This module turns its raw output into canonical
//! segments:
//!
//! - [`relation`] classifies how two segments relate
//! - [`average`] computes merged segments for crossing and alongside pairs
//! - [`consolidate`] runs the merge loop to a fixed point
//! - [`detect_page_lines`] runs the full-page vertical and horizontal passes

pub mod average;
pub mod consolidate;
pub mod relation;

pub use average::{CrossingCase, alongside_average, intersecting_average};
pub use consolidate::{Consolidation, consolidate};
pub use relation::{Relation, classify};

use crate::config::ConsolidationConfig;
use crate::error::{Error, Result};
use crate::geometry::{Point, Segment};
use crate::utils::safe_float_cmp;
use image::{GrayImage, imageops};
use serde::{Deserialize, Serialize};
use std::f64::consts::{FRAC_PI_2, PI};
use std::path::Path;

/// Number of theta samples in an angle family.
pub const THETA_SAMPLES: usize = 32;

/// Half-width of an angle family around its normal angle.
pub const THETA_SPREAD: f64 = PI / 40.0;

/// Margin kept left of the rightmost vertical when cropping a page that is
/// wider than it is tall.
pub const PAGE_EDGE_MARGIN: f64 = 20.0;

/// A segment as returned by a line detector, in pixel coordinates of the
/// image it was run on.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawSegment {
    /// First endpoint
    pub pt1: Point,
    /// Second endpoint
    pub pt2: Point,
}

impl RawSegment {
    /// Create a raw segment from coordinates.
    pub fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self {
            pt1: Point::new(x1, y1),
            pt2: Point::new(x2, y2),
        }
    }
}

impl From<RawSegment> for Segment {
    fn from(raw: RawSegment) -> Self {
        Segment::new(raw.pt1, raw.pt2)
    }
}

/// Orientation family of the lines being searched for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AngleFamily {
    /// Near-horizontal lines (normal angle π/2).
    Horizontal,
    /// Near-vertical lines (normal angle 0).
    Vertical,
}

impl AngleFamily {
    /// Angle of the normal of lines in this family.
    pub fn normal_angle(self) -> f64 {
        match self {
            AngleFamily::Horizontal => FRAC_PI_2,
            AngleFamily::Vertical => 0.0,
        }
    }

    /// Evenly spaced theta samples covering `normal ± π/40`, endpoints
    /// included.
    ///
    /// # Examples
    ///
    /// ```
    /// use borelog_oxide::lines::AngleFamily;
    ///
    /// let thetas = AngleFamily::Vertical.thetas();
    /// assert_eq!(thetas.len(), 32);
    /// assert!(thetas[0] < 0.0 && thetas[31] > 0.0);
    /// ```
    pub fn thetas(self) -> Vec<f64> {
        let start = self.normal_angle() - THETA_SPREAD;
        let step = 2.0 * THETA_SPREAD / (THETA_SAMPLES - 1) as f64;
        (0..THETA_SAMPLES).map(|i| start + step * i as f64).collect()
    }
}

/// Parameters handed to a [`LineDetector`].
#[derive(Debug, Clone, PartialEq)]
pub struct DetectionRequest {
    /// Normal angles to sample, in radians
    pub thetas: Vec<f64>,
    /// Minimum accepted line length in pixels
    pub line_length: u32,
    /// Largest gap between pixels that still forms one line
    pub line_gap: u32,
}

impl DetectionRequest {
    /// Build the request for an angle family and consolidation preset.
    pub fn new(family: AngleFamily, config: &ConsolidationConfig) -> Self {
        Self {
            thetas: family.thetas(),
            line_length: config.line_length,
            line_gap: config.line_gap,
        }
    }
}

/// A probabilistic line-detection primitive.
///
/// Implementations receive an inverted image (ink is bright) and return
/// raw segments in that image's pixel coordinates. Output may be noisy and
/// redundant; consolidation cleans it up.
pub trait LineDetector {
    /// Detect line segments in `image`.
    fn detect(&self, image: &GrayImage, request: &DetectionRequest) -> Result<Vec<RawSegment>>;
}

/// Load a page raster from disk as grayscale.
///
/// # Errors
///
/// Returns [`Error::Image`] if the file cannot be read or decoded.
pub fn load_page(path: impl AsRef<Path>) -> Result<GrayImage> {
    let path = path.as_ref();
    let page = image::open(path)?.to_luma8();
    log::debug!("Loaded {} ({}x{})", path.display(), page.width(), page.height());
    Ok(page)
}

/// Invert a grayscale page so ink becomes bright.
pub fn invert(image: &GrayImage) -> GrayImage {
    let mut inverted = image.clone();
    imageops::invert(&mut inverted);
    inverted
}

/// Crop `image` to columns `x0..x1` and rows `y0..y1`.
///
/// Bounds are clamped to the image; an empty result is an error.
pub(crate) fn crop(image: &GrayImage, name: &'static str, x0: i64, y0: i64, x1: i64, y1: i64) -> Result<GrayImage> {
    let (width, height) = (i64::from(image.width()), i64::from(image.height()));

    let left = x0.clamp(0, width);
    let right = x1.clamp(0, width);
    let top = y0.clamp(0, height);
    let bottom = y1.clamp(0, height);

    if right <= left || bottom <= top {
        return Err(Error::EmptyRegion {
            name,
            x0,
            x1,
            y0,
            y1,
        });
    }

    Ok(imageops::crop_imm(
        image,
        left as u32,
        top as u32,
        (right - left) as u32,
        (bottom - top) as u32,
    )
    .to_image())
}

/// Run the detector on an already inverted image and consolidate its output.
pub fn detect_and_consolidate<D: LineDetector + ?Sized>(
    detector: &D,
    inverted: &GrayImage,
    family: AngleFamily,
    config: &ConsolidationConfig,
) -> Result<Consolidation> {
    let request = DetectionRequest::new(family, config);
    let raw = detector.detect(inverted, &request)?;

    log::debug!(
        "Detector returned {} {:?} segments on a {}x{} image",
        raw.len(),
        family,
        inverted.width(),
        inverted.height()
    );

    consolidate(raw.into_iter().map(Segment::from).collect(), config)
}

/// Consolidated full-page lines.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageLines {
    /// Horizontal family
    pub horizontal: LineSet,
    /// Vertical family, with margin noise removed from `merged`
    pub vertical: LineSet,
    /// Width of the analyzed region (after any edge crop)
    pub width: u32,
    /// Height of the analyzed region
    pub height: u32,
}

/// Raw and merged segments of one angle family.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LineSet {
    /// Detector output
    pub raw: Vec<Segment>,
    /// Consolidated segments
    pub merged: Vec<Segment>,
}

impl From<Consolidation> for LineSet {
    fn from(c: Consolidation) -> Self {
        Self {
            raw: c.raw,
            merged: c.merged,
        }
    }
}

impl PageLines {
    /// Give every segment a fresh identifier.
    pub fn refresh(&mut self) {
        for segment in self
            .horizontal
            .raw
            .iter_mut()
            .chain(self.horizontal.merged.iter_mut())
            .chain(self.vertical.raw.iter_mut())
            .chain(self.vertical.merged.iter_mut())
        {
            segment.refresh();
        }
    }
}

/// Detect and consolidate the table lines of a full page.
///
/// Verticals are found first. A page wider than it is tall usually carries
/// an empty strip where a facing page would be, so it is cropped just left
/// of the rightmost vertical and verticals are detected again. Horizontals
/// are then detected on the (possibly cropped) page. Finally, verticals in
/// the left quarter of the page are discarded except the longest of them.
pub fn detect_page_lines<D: LineDetector + ?Sized>(detector: &D, page: &GrayImage) -> Result<PageLines> {
    let mut analyzed = invert(page);
    let vertical_config = ConsolidationConfig::page_vertical();

    let mut vertical = detect_and_consolidate(detector, &analyzed, AngleFamily::Vertical, &vertical_config)?;

    if analyzed.height() < analyzed.width() {
        let right_edge = vertical
            .merged
            .iter()
            .map(|v| v.rightmost_point().x)
            .max_by(|a, b| safe_float_cmp(*a, *b))
            .ok_or(Error::InsufficientLines {
                stage: "page edge",
                found: 0,
                required: 1,
            })?;

        let right = (right_edge - PAGE_EDGE_MARGIN).round() as i64;
        log::debug!("Page is wider than tall, cropping to {} columns and re-running", right);

        analyzed = crop(&analyzed, "page edge", 0, 0, right, i64::from(analyzed.height()))?;
        vertical = detect_and_consolidate(detector, &analyzed, AngleFamily::Vertical, &vertical_config)?;
    }

    let horizontal = detect_and_consolidate(
        detector,
        &analyzed,
        AngleFamily::Horizontal,
        &ConsolidationConfig::page_horizontal(),
    )?;

    vertical.merged = drop_margin_verticals(vertical.merged, analyzed.width());

    Ok(PageLines {
        horizontal: horizontal.into(),
        vertical: vertical.into(),
        width: analyzed.width(),
        height: analyzed.height(),
    })
}

/// Keep verticals right of the first quarter of the page, plus the longest
/// vertical inside it (the table's left border).
fn drop_margin_verticals(verticals: Vec<Segment>, page_width: u32) -> Vec<Segment> {
    let quarter = f64::from(page_width) / 4.0;
    let (mut kept, margin): (Vec<Segment>, Vec<Segment>) =
        verticals.into_iter().partition(|v| v.average_x() > quarter);

    let dropped = margin.len().saturating_sub(1);
    if let Some(border) = margin
        .into_iter()
        .max_by(|a, b| safe_float_cmp(a.square_length(), b.square_length()))
    {
        kept.push(border);
    }

    if dropped > 0 {
        log::debug!("Dropped {} verticals in the left margin", dropped);
    }

    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    /// Detector that replays canned segments per family and records requests.
    struct Replay {
        vertical: Vec<RawSegment>,
        horizontal: Vec<RawSegment>,
        seen: RefCell<Vec<(u32, u32, usize)>>,
    }

    impl LineDetector for Replay {
        fn detect(&self, image: &GrayImage, request: &DetectionRequest) -> Result<Vec<RawSegment>> {
            self.seen
                .borrow_mut()
                .push((image.width(), image.height(), request.thetas.len()));
            if request.thetas[0] < 0.0 {
                Ok(self.vertical.clone())
            } else {
                Ok(self.horizontal.clone())
            }
        }
    }

    #[test]
    fn test_thetas_cover_family() {
        let h = AngleFamily::Horizontal.thetas();
        assert_eq!(h.len(), THETA_SAMPLES);
        assert!((h[0] - (FRAC_PI_2 - PI / 40.0)).abs() < 1e-12);
        assert!((h[31] - (FRAC_PI_2 + PI / 40.0)).abs() < 1e-12);
        assert!(h.windows(2).all(|w| w[1] > w[0]));
    }

    #[test]
    fn test_invert() {
        let page = GrayImage::from_pixel(4, 4, image::Luma([200]));
        let inverted = invert(&page);
        assert_eq!(inverted.get_pixel(0, 0).0[0], 55);
    }

    #[test]
    fn test_crop_rejects_empty_region() {
        let page = GrayImage::new(100, 100);
        assert!(matches!(
            crop(&page, "test", 50, 10, 50, 20),
            Err(Error::EmptyRegion { name: "test", .. })
        ));
        let cropped = crop(&page, "test", -5, 10, 60, 200).unwrap();
        assert_eq!((cropped.width(), cropped.height()), (60, 90));
    }

    #[test]
    fn test_drop_margin_verticals_keeps_longest() {
        let verticals = vec![
            Segment::from_coords(100.0, 0.0, 100.0, 900.0),
            Segment::from_coords(150.0, 0.0, 150.0, 200.0),
            Segment::from_coords(600.0, 0.0, 600.0, 900.0),
        ];
        let kept = drop_margin_verticals(verticals, 2000);
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].average_x(), 600.0);
        assert_eq!(kept[1].average_x(), 100.0);
    }

    #[test]
    fn test_detect_page_lines_portrait() {
        let detector = Replay {
            vertical: vec![
                RawSegment::new(600.0, 100.0, 600.0, 1500.0),
                RawSegment::new(601.0, 1498.0, 601.0, 2900.0),
                RawSegment::new(1500.0, 100.0, 1500.0, 2900.0),
            ],
            horizontal: vec![RawSegment::new(600.0, 100.0, 1500.0, 100.0)],
            seen: RefCell::new(Vec::new()),
        };
        let page = GrayImage::new(2000, 3000);

        let lines = detect_page_lines(&detector, &page).unwrap();
        assert_eq!(lines.vertical.raw.len(), 3);
        assert_eq!(lines.vertical.merged.len(), 2);
        assert_eq!(lines.horizontal.merged.len(), 1);
        assert_eq!((lines.width, lines.height), (2000, 3000));
        assert_eq!(detector.seen.borrow().len(), 2);
    }

    #[test]
    fn test_detect_page_lines_landscape_crops() {
        let detector = Replay {
            vertical: vec![
                RawSegment::new(1000.0, 100.0, 1000.0, 1400.0),
                RawSegment::new(2000.0, 100.0, 2000.0, 1400.0),
            ],
            horizontal: Vec::new(),
            seen: RefCell::new(Vec::new()),
        };
        let page = GrayImage::new(3000, 1500);

        let lines = detect_page_lines(&detector, &page).unwrap();
        assert_eq!(lines.width, 1980);

        let seen = detector.seen.borrow();
        assert_eq!(seen.len(), 3);
        assert_eq!(seen[0].0, 3000);
        assert_eq!(seen[1].0, 1980);
        assert_eq!(seen[2].0, 1980);
    }
}
