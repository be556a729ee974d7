//! Table structure inference for boring-log pages.
//!
//! A page carries one or two table instances side by side. Each instance has
//! a wide description column with a narrow depth ruler along its right edge,
//! followed by blows, UCS and moisture columns. Inference works from the
//! page's consolidated lines:
//!
//! 1. Table top: the topmost long horizontal crossing the central verticals
//! 2. Header top: the long horizontal nearest the verticals' upper ends
//! 3. Column separators: verticals re-detected inside the header band
//! 4. Table bottom: the long horizontal nearest the verticals' lower ends
//! 5. Column bounds: separators extended down to the table bottom
//!
//! The thresholds are calibrated for the "BBS 137/138 Rev. 8-99" forms.

use crate::config::ConsolidationConfig;
use crate::error::{Error, Result};
use crate::geometry::{Point, Rect, Segment, is_equivalent, lines_that_intersect};
use crate::lines::{AngleFamily, LineDetector, crop, detect_and_consolidate, invert};
use crate::ruler::DepthRuler;
use crate::utils::{mean, safe_float_cmp};
use image::GrayImage;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Table top must be longer than this many pixels.
pub const TABLE_TOP_MIN_WIDTH: f64 = 1580.0;

/// Header top candidates lie strictly below this row...
pub const HEADER_BAND_TOP: f64 = 350.0;

/// ...and strictly above this one.
pub const HEADER_BAND_BOTTOM: f64 = 1000.0;

/// Header top candidates have midpoints right of this fraction of the width.
pub const HEADER_MIDPOINT_FRACTION: f64 = 0.39;

/// Verticals left of this fraction of the width are ignored for the header.
pub const HEADER_VERTICAL_MIN_FRACTION: f64 = 0.2;

/// Number of longest horizontals considered for the header top.
pub const HEADER_CANDIDATES: usize = 5;

/// Horizontal margin added on each side of the header crop.
pub const HEADER_CROP_MARGIN: f64 = 5.0;

/// Separators must be longer than this many pixels.
pub const MIN_SEPARATOR_LENGTH: f64 = 200.0;

/// Table bottom candidates lie below this fraction of the height.
pub const TABLE_BOTTOM_FRACTION: f64 = 5.0 / 6.0;

/// Number of longest verticals whose lower ends locate the table bottom.
pub const TABLE_BOTTOM_VERTICALS: usize = 8;

/// Pages with at least this many long verticals hold two tables.
pub const TWO_TABLE_MIN_VERTICALS: usize = 9;

/// A named column of a table half.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnName {
    /// Description plus ruler
    FullDescription,
    /// Description only
    PartialDescription,
    /// Depth ruler
    Ruler,
    /// Blow counts
    Blows,
    /// Unconfined compressive strength
    Ucs,
    /// Moisture content
    Moisture,
}

impl ColumnName {
    /// All columns in table order.
    pub const ALL: [ColumnName; 6] = [
        ColumnName::FullDescription,
        ColumnName::PartialDescription,
        ColumnName::Ruler,
        ColumnName::Blows,
        ColumnName::Ucs,
        ColumnName::Moisture,
    ];

    /// Snake-case name.
    pub fn as_str(self) -> &'static str {
        match self {
            ColumnName::FullDescription => "full_description",
            ColumnName::PartialDescription => "partial_description",
            ColumnName::Ruler => "ruler",
            ColumnName::Blows => "blows",
            ColumnName::Ucs => "ucs",
            ColumnName::Moisture => "moisture",
        }
    }
}

impl fmt::Display for ColumnName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Left and right vertical boundaries of a column.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnBounds {
    /// Left boundary
    pub left: Segment,
    /// Right boundary
    pub right: Segment,
}

impl ColumnBounds {
    /// Create bounds from two verticals.
    pub fn new(left: Segment, right: Segment) -> Self {
        Self { left, right }
    }

    /// Bounding rectangle of both boundaries.
    pub fn rect(&self) -> Rect {
        let top = self.left.highest_point().y.min(self.right.highest_point().y);
        let bottom = self.left.lowest_point().y.max(self.right.lowest_point().y);
        Rect::from_points(self.left.average_x(), top, self.right.average_x(), bottom)
    }
}

/// One table instance: its named columns and, once calibrated, its ruler.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableHalf {
    columns: IndexMap<ColumnName, ColumnBounds>,
    ruler: Option<DepthRuler>,
}

impl TableHalf {
    /// Build the columns from the description's left edge and the five
    /// boundaries that follow it (ruler left, ruler right, blows right, UCS
    /// right, moisture right).
    fn from_boundaries(description_left: Segment, boundaries: &[Segment; 5]) -> Self {
        let [ruler_left, ruler_right, blows_right, ucs_right, moisture_right] = boundaries;

        let mut columns = IndexMap::with_capacity(ColumnName::ALL.len());
        columns.insert(
            ColumnName::FullDescription,
            ColumnBounds::new(description_left.clone(), ruler_right.clone()),
        );
        columns.insert(
            ColumnName::PartialDescription,
            ColumnBounds::new(description_left, ruler_left.clone()),
        );
        columns.insert(ColumnName::Ruler, ColumnBounds::new(ruler_left.clone(), ruler_right.clone()));
        columns.insert(ColumnName::Blows, ColumnBounds::new(ruler_right.clone(), blows_right.clone()));
        columns.insert(ColumnName::Ucs, ColumnBounds::new(blows_right.clone(), ucs_right.clone()));
        columns.insert(ColumnName::Moisture, ColumnBounds::new(ucs_right.clone(), moisture_right.clone()));

        Self { columns, ruler: None }
    }

    /// Columns in table order.
    pub fn columns(&self) -> &IndexMap<ColumnName, ColumnBounds> {
        &self.columns
    }

    /// Bounds of one column.
    pub fn column(&self, name: ColumnName) -> Option<&ColumnBounds> {
        self.columns.get(&name)
    }

    /// Pixel rectangle of one column, for cropping.
    pub fn column_rect(&self, name: ColumnName) -> Option<Rect> {
        self.column(name).map(ColumnBounds::rect)
    }

    /// The calibrated ruler, if [`TableStructure::calibrate_rulers`] has run.
    pub fn ruler(&self) -> Option<&DepthRuler> {
        self.ruler.as_ref()
    }

    fn refresh(&mut self) {
        for bounds in self.columns.values_mut() {
            bounds.left.refresh();
            bounds.right.refresh();
        }
        if let Some(ruler) = &mut self.ruler {
            ruler.refresh();
        }
    }
}

/// Counts that distinguish the one- and two-table page layouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutProfile {
    /// Central verticals the table top must cross
    pub table_top_verticals: usize,
    /// Drop the leftmost and rightmost of those verticals
    pub trim_outer_verticals: bool,
    /// Verticals whose upper ends locate the header top
    pub header_verticals: usize,
    /// Exact number of header separators
    pub separator_count: usize,
    /// Table instances on the page
    pub halves: usize,
}

impl Default for LayoutProfile {
    fn default() -> Self {
        Self::two_tables()
    }
}

impl LayoutProfile {
    /// Same as [`LayoutProfile::two_tables`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Two table instances side by side.
    pub fn two_tables() -> Self {
        Self {
            table_top_verticals: 9,
            trim_outer_verticals: true,
            header_verticals: 9,
            separator_count: 10,
            halves: 2,
        }
    }

    /// A single table instance.
    pub fn one_table() -> Self {
        Self {
            table_top_verticals: 4,
            trim_outer_verticals: false,
            header_verticals: 6,
            separator_count: 6,
            halves: 1,
        }
    }

    /// Pick the layout from how many verticals are longer than half the page.
    pub fn select(verticals: &[Segment], page_height: u32) -> Self {
        let half_height = f64::from(page_height) / 2.0;
        let long = verticals.iter().filter(|v| v.length() > half_height).count();

        if long >= TWO_TABLE_MIN_VERTICALS {
            Self::two_tables()
        } else {
            Self::one_table()
        }
    }

    /// Set the number of central verticals for the table top.
    pub fn with_table_top_verticals(mut self, count: usize) -> Self {
        self.table_top_verticals = count;
        self
    }

    /// Set whether the outermost table-top verticals are dropped.
    pub fn with_trim_outer_verticals(mut self, trim: bool) -> Self {
        self.trim_outer_verticals = trim;
        self
    }

    /// Set the number of verticals for the header top.
    pub fn with_header_verticals(mut self, count: usize) -> Self {
        self.header_verticals = count;
        self
    }

    /// Set the required separator count.
    pub fn with_separator_count(mut self, count: usize) -> Self {
        self.separator_count = count;
        self
    }
}

/// Inferred geometry of a boring-log page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableStructure {
    /// Top of the table body (below the headers), clipped to the separators
    pub table_top: Segment,
    /// Top of the header band, spanning the separators
    pub header_top: Segment,
    /// Bottom of the table body
    pub table_bottom: Segment,
    /// Column separators inside the header band, left to right
    pub header_separators: Vec<Segment>,
    /// Layout the page was inferred with
    pub profile: LayoutProfile,
    halves: Vec<TableHalf>,
}

impl TableStructure {
    /// Infer the structure of `page` from its consolidated lines, choosing
    /// the layout with [`LayoutProfile::select`].
    ///
    /// `page` is the non-inverted grayscale page; the header band is cropped
    /// from it for separator detection.
    pub fn infer<D: LineDetector + ?Sized>(
        detector: &D,
        page: &GrayImage,
        horizontals: &[Segment],
        verticals: &[Segment],
    ) -> Result<Self> {
        let profile = LayoutProfile::select(verticals, page.height());
        Self::infer_with_profile(detector, page, horizontals, verticals, profile)
    }

    /// Infer the structure with an explicit layout.
    pub fn infer_with_profile<D: LineDetector + ?Sized>(
        detector: &D,
        page: &GrayImage,
        horizontals: &[Segment],
        verticals: &[Segment],
        profile: LayoutProfile,
    ) -> Result<Self> {
        let (width, height) = page.dimensions();
        log::debug!("Starting table analysis ({} halves) on a {}x{} page", profile.halves, width, height);

        let table_top = find_table_top(horizontals, verticals, width, height, &profile)?;
        log::debug!("Found table top at {}", table_top);

        let header_top = find_header_top(horizontals, verticals, width, height, &table_top, &profile)?;
        log::debug!("Found header top at {}", header_top);

        let separators = find_column_separators(detector, page, &table_top, &header_top, profile.separator_count)?;

        let (first, last) = match (separators.first(), separators.last()) {
            (Some(first), Some(last)) => (first.average_x(), last.average_x()),
            _ => {
                return Err(Error::SeparatorCount {
                    found: 0,
                    expected: profile.separator_count,
                });
            },
        };

        let table_top = Segment::new(table_top.leftmost_point(), Point::new(last, table_top.average_y()));
        let header_y = header_top.average_y();
        let header_top = Segment::new(Point::new(first, header_y), Point::new(last, header_y));

        let table_bottom = find_table_bottom(&table_top, horizontals, verticals, width, height)?;
        log::debug!("Found table bottom at {}", table_bottom);

        let connectors: Vec<Segment> = separators
            .iter()
            .map(|s| connect_header_to_bottom(s, &table_bottom))
            .collect();

        let mut halves = Vec::with_capacity(profile.halves);
        let mut description_left = Segment::new(table_top.leftmost_point(), table_bottom.leftmost_point());

        for chunk in connectors.chunks_exact(5).take(profile.halves) {
            let boundaries: [Segment; 5] = [
                chunk[0].clone(),
                chunk[1].clone(),
                chunk[2].clone(),
                chunk[3].clone(),
                chunk[4].clone(),
            ];
            halves.push(TableHalf::from_boundaries(description_left, &boundaries));
            description_left = chunk[4].clone();
        }

        if halves.len() != profile.halves {
            return Err(Error::SeparatorCount {
                found: separators.len(),
                expected: profile.halves * 5,
            });
        }

        Ok(Self {
            table_top,
            header_top,
            table_bottom,
            header_separators: separators,
            profile,
            halves,
        })
    }

    /// The table instances, left to right.
    pub fn halves(&self) -> &[TableHalf] {
        &self.halves
    }

    /// Calibrate the depth ruler of every half.
    ///
    /// `depth_ranges` holds one `(starting, ending)` pair per half, left to
    /// right. Ruler pixels are offset by the table top's row.
    ///
    /// # Errors
    ///
    /// [`Error::HalfCountMismatch`] if the number of ranges differs from the
    /// number of halves, or any error from [`DepthRuler::calibrate`].
    pub fn calibrate_rulers<D: LineDetector + ?Sized>(
        &mut self,
        detector: &D,
        page: &GrayImage,
        depth_ranges: &[(f64, f64)],
    ) -> Result<()> {
        if depth_ranges.len() != self.halves.len() {
            return Err(Error::HalfCountMismatch {
                expected: self.halves.len(),
                found: depth_ranges.len(),
            });
        }

        let pixel_offset = self.table_top.average_y();

        for (i, (half, &(starting, ending))) in self.halves.iter_mut().zip(depth_ranges).enumerate() {
            let bounds = half.columns.get(&ColumnName::Ruler).ok_or(Error::InsufficientLines {
                stage: "ruler column",
                found: 0,
                required: 1,
            })?;

            let ruler = DepthRuler::calibrate(detector, page, bounds, pixel_offset, starting, ending)?;
            log::debug!("Calibrated ruler of half {} ({} ticks)", i, ruler.ticks().len());
            half.ruler = Some(ruler);
        }

        Ok(())
    }

    /// Give every owned segment a fresh identifier.
    pub fn refresh(&mut self) {
        self.table_top.refresh();
        self.header_top.refresh();
        self.table_bottom.refresh();
        for separator in &mut self.header_separators {
            separator.refresh();
        }
        for half in &mut self.halves {
            half.refresh();
        }
    }
}

/// Find the top of the table body (below the headers).
///
/// The verticals longer than half the page that sit closest to its centre
/// are taken as column lines; the table top is the topmost horizontal longer
/// than [`TABLE_TOP_MIN_WIDTH`] that crosses all of them.
pub fn find_table_top(
    horizontals: &[Segment],
    verticals: &[Segment],
    width: u32,
    height: u32,
    profile: &LayoutProfile,
) -> Result<Segment> {
    let center_x = f64::from(width) / 2.0;
    let half_height = f64::from(height) / 2.0;

    let mut central: Vec<&Segment> = verticals.iter().collect();
    central.sort_by(|a, b| safe_float_cmp((a.average_x() - center_x).abs(), (b.average_x() - center_x).abs()));
    let mut central: Vec<&Segment> = central
        .into_iter()
        .filter(|v| v.length() > half_height)
        .take(profile.table_top_verticals)
        .collect();

    if profile.trim_outer_verticals {
        central.sort_by(|a, b| safe_float_cmp(a.average_x(), b.average_x()));
        central = if central.len() > 2 {
            central[1..central.len() - 1].to_vec()
        } else {
            Vec::new()
        };
    }

    if central.is_empty() {
        return Err(Error::InsufficientLines {
            stage: "table top columns",
            found: 0,
            required: 1,
        });
    }

    let mut candidates: Vec<&Segment> = horizontals
        .iter()
        .filter(|h| h.length() > TABLE_TOP_MIN_WIDTH)
        .collect();

    for vertical in &central {
        log::trace!("Table top must cross {}", vertical);
        candidates = lines_that_intersect(vertical, candidates);
    }

    candidates
        .into_iter()
        .min_by(|a, b| safe_float_cmp(a.average_y(), b.average_y()))
        .cloned()
        .ok_or(Error::InsufficientLines {
            stage: "table top",
            found: 0,
            required: 1,
        })
}

/// Find the top of the header band.
///
/// The result is a synthesized horizontal at the chosen line's mean row,
/// spanning from the ruler's left boundary to the rightmost column line.
pub fn find_header_top(
    horizontals: &[Segment],
    verticals: &[Segment],
    width: u32,
    height: u32,
    table_top: &Segment,
    profile: &LayoutProfile,
) -> Result<Segment> {
    let width = f64::from(width);
    let half_height = f64::from(height) / 2.0;

    let mut candidates: Vec<&Segment> = horizontals
        .iter()
        .filter(|h| h.average_y() > HEADER_BAND_TOP && h.average_y() < HEADER_BAND_BOTTOM)
        .filter(|h| !is_equivalent(h, table_top))
        .filter(|h| h.length() > width / 2.0)
        .filter(|h| h.midpoint().x >= width * HEADER_MIDPOINT_FRACTION)
        .collect();
    candidates.sort_by(|a, b| safe_float_cmp(b.square_length(), a.square_length()));
    candidates.truncate(HEADER_CANDIDATES);

    if candidates.is_empty() {
        return Err(Error::InsufficientLines {
            stage: "header top",
            found: 0,
            required: 1,
        });
    }

    let center_x = table_top.midpoint().x;
    let mut columns: Vec<&Segment> = verticals
        .iter()
        .filter(|v| v.average_x() > width * HEADER_VERTICAL_MIN_FRACTION && v.length() > half_height)
        .collect();
    columns.sort_by(|a, b| safe_float_cmp((a.average_x() - center_x).abs(), (b.average_x() - center_x).abs()));
    columns.truncate(profile.header_verticals);
    columns.sort_by(|a, b| safe_float_cmp(a.average_x(), b.average_x()));

    // The leftmost is the description's left edge.
    let columns: &[&Segment] = columns.get(1..).unwrap_or(&[]);
    let (first_column, last_column) = match (columns.first(), columns.last()) {
        (Some(first), Some(last)) => (*first, *last),
        _ => {
            return Err(Error::InsufficientLines {
                stage: "header verticals",
                found: columns.len(),
                required: 1,
            });
        },
    };

    let tops: Vec<f64> = columns.iter().map(|v| v.highest_point().y).collect();
    let avg_top_y = mean(&tops).unwrap_or_default();

    let closest = candidates
        .iter()
        .min_by(|a, b| safe_float_cmp((avg_top_y - a.average_y()).abs(), (avg_top_y - b.average_y()).abs()))
        .ok_or(Error::InsufficientLines {
            stage: "header top",
            found: 0,
            required: 1,
        })?;

    let ruler_bound = verticals
        .iter()
        .filter(|v| v.average_x() < first_column.average_x() && v.length() < half_height)
        .max_by(|a, b| safe_float_cmp(a.average_x(), b.average_x()))
        .ok_or(Error::InsufficientLines {
            stage: "header ruler bound",
            found: 0,
            required: 1,
        })?;

    let y = closest.average_y();
    let min_x = ruler_bound.leftmost_point().x;
    let max_x = last_column.rightmost_point().x;

    log::trace!("Header top at y {} from {} to {}", y, min_x, max_x);

    Ok(Segment::new(Point::new(min_x, y), Point::new(max_x, y)))
}

/// Re-detect verticals inside the header band and return exactly
/// `expected` column separators in page coordinates, left to right.
///
/// # Errors
///
/// [`Error::SeparatorCount`] if a different number survives the length
/// filter; [`Error::EmptyRegion`] if the band falls outside the page.
pub fn find_column_separators<D: LineDetector + ?Sized>(
    detector: &D,
    page: &GrayImage,
    table_top: &Segment,
    header_top: &Segment,
    expected: usize,
) -> Result<Vec<Segment>> {
    let top_left = header_top.leftmost_point().floor() + Point::new(-HEADER_CROP_MARGIN, 0.0);
    let bottom_right = table_top.rightmost_point().floor() + Point::new(HEADER_CROP_MARGIN, 0.0);
    let top_right = header_top.rightmost_point().floor() + Point::new(HEADER_CROP_MARGIN, 0.0);

    let right = bottom_right.x.max(top_right.x);
    log::debug!(
        "Cropping header band to rows {}..{}, columns {}..{}",
        top_left.y,
        bottom_right.y,
        top_left.x,
        right
    );

    let band = crop(
        page,
        "header band",
        top_left.x as i64,
        top_left.y as i64,
        right as i64,
        bottom_right.y as i64,
    )?;

    let consolidation = detect_and_consolidate(
        detector,
        &invert(&band),
        AngleFamily::Vertical,
        &ConsolidationConfig::header_separator(),
    )?;

    let mut separators: Vec<Segment> = consolidation
        .merged
        .into_iter()
        .filter(|s| s.length() > MIN_SEPARATOR_LENGTH)
        .collect();

    if separators.len() != expected {
        return Err(Error::SeparatorCount {
            found: separators.len(),
            expected,
        });
    }

    separators = separators.iter().map(|s| s.translate(top_left)).collect();
    separators.sort_by(|a, b| safe_float_cmp(a.average_x(), b.average_x()));

    Ok(separators)
}

/// Find the bottom of the table body.
///
/// Among horizontals in the lowest sixth of the page and longer than half
/// its width, picks the one nearest the mean lower end of the longest
/// verticals, and returns the table top moved down to that row.
pub fn find_table_bottom(
    table_top: &Segment,
    horizontals: &[Segment],
    verticals: &[Segment],
    width: u32,
    height: u32,
) -> Result<Segment> {
    let min_y = f64::from(height) * TABLE_BOTTOM_FRACTION;
    let half_width = f64::from(width) / 2.0;

    let mut longest: Vec<&Segment> = verticals.iter().collect();
    longest.sort_by(|a, b| safe_float_cmp(b.square_length(), a.square_length()));
    let lows: Vec<f64> = longest
        .iter()
        .take(TABLE_BOTTOM_VERTICALS)
        .map(|v| v.lowest_point().y)
        .collect();

    let avg_low_y = mean(&lows).ok_or(Error::InsufficientLines {
        stage: "table bottom verticals",
        found: 0,
        required: 1,
    })?;

    let closest = horizontals
        .iter()
        .filter(|h| h.average_y() > min_y && h.length() > half_width)
        .min_by(|a, b| safe_float_cmp((a.average_y() - avg_low_y).abs(), (b.average_y() - avg_low_y).abs()))
        .ok_or(Error::InsufficientLines {
            stage: "table bottom",
            found: 0,
            required: 1,
        })?;

    Ok(table_top.translate(Point::new(0.0, closest.average_y() - table_top.average_y())))
}

/// Extend a header separator straight down from its lower end to the table
/// bottom's row.
pub fn connect_header_to_bottom(separator: &Segment, table_bottom: &Segment) -> Segment {
    let top = separator.lowest_point();
    Segment::new(top, Point::new(top.x, table_bottom.pt1.y))
}
