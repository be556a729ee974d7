//! Integration tests for diagnostic renderings written to disk.

use borelog_oxide::draw;
use borelog_oxide::error::Error;
use borelog_oxide::geometry::Segment;
use borelog_oxide::lines::load_page;
use image::{GrayImage, Luma};
use tempfile::TempDir;

#[test]
fn test_rendering_roundtrips_through_png() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("lines.png");

    let horizontals = vec![Segment::from_coords(10.0, 20.0, 90.0, 20.0)];
    let verticals = vec![Segment::from_coords(50.0, 5.0, 50.0, 70.0)];
    let canvas = draw::draw_lines(100, 80, &horizontals, &verticals);
    draw::save(&canvas, &path).unwrap();

    let page = load_page(&path).unwrap();
    assert_eq!(page.dimensions(), (100, 80));
    assert!(page.get_pixel(30, 20)[0] > 0);
    assert!(page.get_pixel(50, 40)[0] > 0);
    assert_eq!(page.get_pixel(30, 60)[0], 0);
}

#[test]
fn test_page_overlay_keeps_page_pixels() {
    let dir = TempDir::new().unwrap();
    let page_path = dir.path().join("page.png");
    GrayImage::from_pixel(40, 30, Luma([255])).save(&page_path).unwrap();

    let page = load_page(&page_path).unwrap();
    let canvas = draw::draw_on_page(&page, &[], &[Segment::from_coords(10.0, 0.0, 10.0, 29.0)]);

    assert_eq!(*canvas.get_pixel(10, 15), draw::VERTICAL_COLOR);
    assert_eq!(canvas.get_pixel(20, 15).0, [255, 255, 255]);
}

#[test]
fn test_missing_page_is_an_image_error() {
    let dir = TempDir::new().unwrap();
    let err = load_page(dir.path().join("absent.png")).unwrap_err();
    assert!(matches!(err, Error::Image(_)));
}
