//! Integration tests for table structure inference and ruler calibration.
//!
//! Pages are synthetic: the consolidated page lines are given directly and a
//! mock detector stands in for the probabilistic line transform, returning
//! canned header separators for vertical requests and ruler ticks for
//! horizontal ones.

use borelog_oxide::draw;
use borelog_oxide::error::Error;
use borelog_oxide::geometry::{Point, Rect, Segment};
use borelog_oxide::lines::{DetectionRequest, LineDetector, RawSegment};
use borelog_oxide::structure::{ColumnName, LayoutProfile, TableHalf, TableStructure, find_table_top};
use image::GrayImage;
use std::cell::RefCell;

struct MockDetector {
    separators: Vec<RawSegment>,
    ticks: Vec<RawSegment>,
    crops: RefCell<Vec<(u32, u32)>>,
}

impl MockDetector {
    fn new(separator_xs: &[f64], tick_count: usize) -> Self {
        Self {
            separators: separator_xs.iter().map(|x| RawSegment::new(*x, 0.0, *x, 300.0)).collect(),
            ticks: (0..tick_count)
                .map(|i| {
                    let y = 100.0 * i as f64;
                    RawSegment::new(10.0, y, 90.0, y)
                })
                .collect(),
            crops: RefCell::new(Vec::new()),
        }
    }
}

impl LineDetector for MockDetector {
    fn detect(&self, image: &GrayImage, request: &DetectionRequest) -> borelog_oxide::Result<Vec<RawSegment>> {
        self.crops.borrow_mut().push(image.dimensions());
        if request.thetas[0] < 0.0 {
            Ok(self.separators.clone())
        } else {
            Ok(self.ticks.clone())
        }
    }
}

fn vertical(x: f64, y0: f64, y1: f64) -> Segment {
    Segment::from_coords(x, y0, x, y1)
}

fn horizontal(y: f64, x0: f64, x1: f64) -> Segment {
    Segment::from_coords(x0, y, x1, y)
}

/// A single table on a 2000x3000 page.
fn one_table_page() -> (GrayImage, Vec<Segment>, Vec<Segment>) {
    let mut verticals: Vec<Segment> = [200.0, 1100.0, 1300.0, 1500.0, 1700.0, 1900.0]
        .iter()
        .map(|x| vertical(*x, 410.0, 2800.0))
        .collect();
    // Ruler left boundary, only drawn through the header band.
    verticals.push(vertical(1000.0, 400.0, 700.0));

    let horizontals = vec![
        horizontal(400.0, 200.0, 1900.0),
        horizontal(700.0, 200.0, 1900.0),
        horizontal(2800.0, 200.0, 1900.0),
    ];

    (GrayImage::new(2000, 3000), horizontals, verticals)
}

/// Two tables side by side on a 2300x3300 page.
fn two_table_page() -> (GrayImage, Vec<Segment>, Vec<Segment>) {
    let mut verticals: Vec<Segment> = [100.0, 700.0, 850.0, 1000.0, 1150.0, 1750.0, 1900.0, 2050.0, 2200.0]
        .iter()
        .map(|x| vertical(*x, 410.0, 3000.0))
        .collect();
    verticals.push(vertical(600.0, 400.0, 700.0));
    verticals.push(vertical(1650.0, 400.0, 700.0));

    let horizontals = vec![
        horizontal(400.0, 100.0, 2200.0),
        horizontal(700.0, 100.0, 2200.0),
        horizontal(3000.0, 100.0, 2200.0),
    ];

    (GrayImage::new(2300, 3300), horizontals, verticals)
}

/// Header-band crop x positions of the two-table separators (band starts at x 595).
const TWO_TABLE_SEPARATORS: [f64; 10] = [5.0, 105.0, 255.0, 405.0, 555.0, 1055.0, 1155.0, 1305.0, 1455.0, 1605.0];

fn assert_contiguous(half: &TableHalf) {
    let chain = [
        ColumnName::PartialDescription,
        ColumnName::Ruler,
        ColumnName::Blows,
        ColumnName::Ucs,
        ColumnName::Moisture,
    ];
    for pair in chain.windows(2) {
        let left = half.column(pair[0]).unwrap();
        let right = half.column(pair[1]).unwrap();
        assert_eq!(left.right.pt1, right.left.pt1, "{} / {}", pair[0], pair[1]);
        assert_eq!(left.right.pt2, right.left.pt2, "{} / {}", pair[0], pair[1]);
    }

    let full = half.column(ColumnName::FullDescription).unwrap();
    let partial = half.column(ColumnName::PartialDescription).unwrap();
    let ruler = half.column(ColumnName::Ruler).unwrap();
    assert_eq!(full.left.pt1, partial.left.pt1);
    assert_eq!(full.right.pt1, ruler.right.pt1);
}

fn column_xs(half: &TableHalf, name: ColumnName) -> (f64, f64) {
    let bounds = half.column(name).unwrap();
    (bounds.left.average_x(), bounds.right.average_x())
}

#[test]
fn test_one_table_structure() {
    let (page, horizontals, verticals) = one_table_page();
    let detector = MockDetector::new(&[5.0, 105.0, 305.0, 505.0, 705.0, 905.0], 0);

    let structure = TableStructure::infer(&detector, &page, &horizontals, &verticals).unwrap();

    assert_eq!(structure.profile, LayoutProfile::one_table());
    assert_eq!(detector.crops.borrow().as_slice(), &[(910, 300)]);

    assert_eq!(structure.header_top.leftmost_point(), Point::new(1000.0, 400.0));
    assert_eq!(structure.header_top.rightmost_point(), Point::new(1900.0, 400.0));
    assert_eq!(structure.table_top.leftmost_point(), Point::new(200.0, 700.0));
    assert_eq!(structure.table_top.rightmost_point(), Point::new(1900.0, 700.0));
    assert_eq!(structure.table_bottom.average_y(), 2800.0);
    assert_eq!(structure.table_bottom.leftmost_point().x, 200.0);

    let xs: Vec<f64> = structure.header_separators.iter().map(Segment::average_x).collect();
    assert_eq!(xs, vec![1000.0, 1100.0, 1300.0, 1500.0, 1700.0, 1900.0]);

    assert_eq!(structure.halves().len(), 1);
    let half = &structure.halves()[0];
    assert_contiguous(half);

    assert_eq!(column_xs(half, ColumnName::FullDescription), (200.0, 1100.0));
    assert_eq!(column_xs(half, ColumnName::PartialDescription), (200.0, 1000.0));
    assert_eq!(column_xs(half, ColumnName::Ruler), (1000.0, 1100.0));
    assert_eq!(column_xs(half, ColumnName::Blows), (1100.0, 1300.0));
    assert_eq!(column_xs(half, ColumnName::Ucs), (1300.0, 1500.0));
    assert_eq!(column_xs(half, ColumnName::Moisture), (1500.0, 1700.0));

    assert_eq!(
        half.column_rect(ColumnName::Blows),
        Some(Rect::from_points(1100.0, 700.0, 1300.0, 2800.0))
    );
}

#[test]
fn test_two_table_structure() {
    let (page, horizontals, verticals) = two_table_page();
    let detector = MockDetector::new(&TWO_TABLE_SEPARATORS, 0);

    let structure = TableStructure::infer(&detector, &page, &horizontals, &verticals).unwrap();

    assert_eq!(structure.profile, LayoutProfile::two_tables());
    assert_eq!(structure.header_top.leftmost_point(), Point::new(600.0, 400.0));
    assert_eq!(structure.header_top.rightmost_point(), Point::new(2200.0, 400.0));
    assert_eq!(structure.table_top.leftmost_point(), Point::new(100.0, 700.0));
    assert_eq!(structure.table_top.rightmost_point(), Point::new(2200.0, 700.0));
    assert_eq!(structure.table_bottom.average_y(), 3000.0);
    assert_eq!(structure.header_separators.len(), 10);

    let halves = structure.halves();
    assert_eq!(halves.len(), 2);
    for half in halves {
        assert_contiguous(half);
    }

    assert_eq!(column_xs(&halves[0], ColumnName::PartialDescription), (100.0, 600.0));
    assert_eq!(column_xs(&halves[0], ColumnName::Moisture), (1000.0, 1150.0));
    assert_eq!(column_xs(&halves[1], ColumnName::FullDescription), (1150.0, 1750.0));
    assert_eq!(column_xs(&halves[1], ColumnName::Ruler), (1650.0, 1750.0));
    assert_eq!(column_xs(&halves[1], ColumnName::Moisture), (2050.0, 2200.0));

    // The first half's right edge is the second half's left edge.
    let left_end = &halves[0].column(ColumnName::Moisture).unwrap().right;
    let right_start = &halves[1].column(ColumnName::FullDescription).unwrap().left;
    assert_eq!(left_end.pt1, right_start.pt1);
}

#[test]
fn test_separator_count_mismatch() {
    let (page, horizontals, verticals) = two_table_page();
    let detector = MockDetector::new(&TWO_TABLE_SEPARATORS[..7], 0);

    let err = TableStructure::infer(&detector, &page, &horizontals, &verticals).unwrap_err();
    assert!(matches!(
        err,
        Error::SeparatorCount {
            found: 7,
            expected: 10
        }
    ));
}

#[test]
fn test_short_separators_are_ignored() {
    let (page, horizontals, verticals) = one_table_page();
    let mut detector = MockDetector::new(&[5.0, 105.0, 305.0, 505.0, 705.0, 905.0], 0);
    // Text strokes in the header band are too short to be separators.
    detector.separators.push(RawSegment::new(200.0, 100.0, 200.0, 250.0));

    let structure = TableStructure::infer(&detector, &page, &horizontals, &verticals).unwrap();
    assert_eq!(structure.header_separators.len(), 6);
}

#[test]
fn test_missing_table_top() {
    let (page, mut horizontals, verticals) = one_table_page();
    horizontals.retain(|h| h.average_y() < 500.0);
    let detector = MockDetector::new(&[], 0);

    let err = TableStructure::infer(&detector, &page, &horizontals, &verticals).unwrap_err();
    assert!(matches!(err, Error::InsufficientLines { stage: "table top", .. }));
}

#[test]
fn test_table_top_needs_column_lines() {
    let (page, horizontals, mut verticals) = one_table_page();
    verticals.retain(|v| v.length() < 1000.0);
    let detector = MockDetector::new(&[], 0);

    let err = TableStructure::infer_with_profile(&detector, &page, &horizontals, &verticals, LayoutProfile::one_table())
        .unwrap_err();
    assert!(matches!(err, Error::InsufficientLines { stage: "table top columns", found: 0, .. }));
}

#[test]
fn test_table_top_needs_column_lines_after_trim() {
    let (page, horizontals, _) = one_table_page();
    let verticals = vec![vertical(900.0, 410.0, 2800.0), vertical(1100.0, 410.0, 2800.0)];

    let err = find_table_top(&horizontals, &verticals, page.width(), page.height(), &LayoutProfile::two_tables())
        .unwrap_err();
    assert!(matches!(err, Error::InsufficientLines { stage: "table top columns", .. }));
}

#[test]
fn test_calibrate_rulers() {
    let (page, horizontals, verticals) = two_table_page();
    let detector = MockDetector::new(&TWO_TABLE_SEPARATORS, 20);

    let mut structure = TableStructure::infer(&detector, &page, &horizontals, &verticals).unwrap();
    structure
        .calibrate_rulers(&detector, &page, &[(0.0, 20.0), (20.0, 40.0)])
        .unwrap();

    // Both ruler columns are 100 px wide and span the table body.
    let crops = detector.crops.borrow();
    assert_eq!(&crops[crops.len() - 2..], &[(100, 2300), (100, 2300)]);

    let left = structure.halves()[0].ruler().unwrap();
    assert_eq!(left.pixel_depth_rate(), 100.0);
    assert_eq!(left.document_offset_height(), 700.0);
    assert_eq!(left.ticks().len(), 20);
    assert_eq!(left.ask_for_depth(1700.0, 0.0), 10.0);

    let right = structure.halves()[1].ruler().unwrap();
    assert_eq!(right.starting_depth(), 20.0);
    assert_eq!(right.ask_for_depth(1700.0, 0.0), 30.0);
    assert_eq!(right.ask_for_pixels(25.0, true).unwrap(), 1200.0);
    assert_eq!(right.ask_for_pixels(25.0, false).unwrap(), 500.0);
}

#[test]
fn test_structure_rendering() {
    let (page, horizontals, verticals) = two_table_page();
    let detector = MockDetector::new(&TWO_TABLE_SEPARATORS, 20);

    let mut structure = TableStructure::infer(&detector, &page, &horizontals, &verticals).unwrap();
    structure
        .calibrate_rulers(&detector, &page, &[(0.0, 20.0), (20.0, 40.0)])
        .unwrap();

    let canvas = draw::draw_structure(&page, &structure);
    assert_eq!(canvas.dimensions(), page.dimensions());

    let bottom = structure.table_bottom.midpoint();
    assert_eq!(*canvas.get_pixel(bottom.x as u32, bottom.y as u32), draw::BORDER_COLOR);
    assert!(canvas.pixels().any(|p| *p == draw::TICK_COLOR));
    assert!(canvas.pixels().any(|p| *p == draw::COLUMN_COLOR));
    assert!(canvas.pixels().any(|p| *p == draw::SEPARATOR_COLOR));
}

#[test]
fn test_calibrate_rulers_needs_one_range_per_half() {
    let (page, horizontals, verticals) = two_table_page();
    let detector = MockDetector::new(&TWO_TABLE_SEPARATORS, 20);

    let mut structure = TableStructure::infer(&detector, &page, &horizontals, &verticals).unwrap();
    let err = structure.calibrate_rulers(&detector, &page, &[(0.0, 20.0)]).unwrap_err();
    assert!(matches!(err, Error::HalfCountMismatch { expected: 2, found: 1 }));
    assert!(structure.halves()[0].ruler().is_none());
}

#[test]
fn test_calibrate_rulers_with_too_few_ticks() {
    let (page, horizontals, verticals) = one_table_page();
    let detector = MockDetector::new(&[5.0, 105.0, 305.0, 505.0, 705.0, 905.0], 12);

    let mut structure = TableStructure::infer(&detector, &page, &horizontals, &verticals).unwrap();
    let err = structure.calibrate_rulers(&detector, &page, &[(0.0, 20.0)]).unwrap_err();
    assert!(matches!(err, Error::InsufficientTicks { found: 12, .. }));
}

#[test]
fn test_refresh_reissues_ids() {
    let (page, horizontals, verticals) = one_table_page();
    let detector = MockDetector::new(&[5.0, 105.0, 305.0, 505.0, 705.0, 905.0], 0);

    let structure = TableStructure::infer(&detector, &page, &horizontals, &verticals).unwrap();
    let mut refreshed = structure.clone();
    refreshed.refresh();

    assert_ne!(refreshed.table_top.id(), structure.table_top.id());
    assert_eq!(refreshed.table_top.pt1, structure.table_top.pt1);

    let before = &structure.halves()[0].column(ColumnName::Ruler).unwrap().left;
    let after = &refreshed.halves()[0].column(ColumnName::Ruler).unwrap().left;
    assert_ne!(before.id(), after.id());
    assert_eq!(before.pt2, after.pt2);
}
