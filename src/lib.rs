// Allow some clippy lints that are too pedantic for this project
#![allow(clippy::type_complexity)]
#![allow(clippy::too_many_arguments)]
#![allow(clippy::needless_range_loop)]
#![allow(clippy::enum_variant_names)]
#![allow(clippy::manual_find)]
// Allow unused for tests
#![cfg_attr(test, allow(dead_code))]
#![cfg_attr(test, allow(unused_variables))]

//! # Borelog Oxide
//!
//! Table geometry recovery for scanned soil-boring logs.
//!
//! ## Core Features
//!
//! - **Line Consolidation**: collapses the noisy, redundant output of a
//!   probabilistic line detector into a small set of canonical horizontal
//!   and vertical segments
//! - **Table Structure**: locates the table top, header top, header column
//!   separators and table bottom, and partitions the page into named column
//!   regions for one or two table halves
//! - **Depth Rulers**: calibrates a pixel-to-depth mapping from the tick marks
//!   of a ruler column, with half-unit quantization and clamping
//!
//! ## Architecture
//!
//! - **Pluggable Detection**: the line-detection primitive is a trait
//!   ([`lines::LineDetector`]) supplied by the caller
//! - **Bottom-up Data Flow**: raw segments → consolidated segments → table
//!   structure → rulers
//! - **Caching**: results serialize with serde and can be stored in a
//!   [`cache::PageCache`]
//! - **Diagnostics**: [`draw`] renders lines and structure over the page
//!
//! ## Quick Start
//!
//! ```ignore
//! use borelog_oxide::lines::detect_page_lines;
//! use borelog_oxide::structure::TableStructure;
//!
//! # fn main() -> borelog_oxide::Result<()> {
//! let page = image::open("page.png")?.to_luma8();
//! let detector = MyHoughDetector::default();
//!
//! let lines = detect_page_lines(&detector, &page)?;
//! let mut structure = TableStructure::infer(
//!     &detector,
//!     &page,
//!     &lines.horizontal.merged,
//!     &lines.vertical.merged,
//! )?;
//! structure.calibrate_rulers(&detector, &page, &[(0.0, 20.0), (20.0, 40.0)])?;
//!
//! let ruler = structure.halves()[0].ruler().unwrap();
//! println!("depth at row 1200: {}", ruler.ask_for_depth(1200.0, 0.0));
//! # Ok(())
//! # }
//! ```
//!
//! ## License
//!
//! Licensed under either of:
//!
//! * Apache License, Version 2.0 ([LICENSE-APACHE](LICENSE-APACHE) or <http://www.apache.org/licenses/LICENSE-2.0>)
//! * MIT license ([LICENSE-MIT](LICENSE-MIT) or <http://opensource.org/licenses/MIT>)
//!
//! at your option.

#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

// Error handling
pub mod error;

// Geometry primitives
pub mod geometry;

// Detection and consolidation parameters
pub mod config;

// Line detection and consolidation
pub mod lines;

// Table structure inference
pub mod structure;

// Depth ruler calibration
pub mod ruler;

// Result caching
pub mod cache;

// Diagnostic renderings
pub mod draw;

// Re-exports
pub use cache::PageCache;
pub use config::{Axis, ConsolidationConfig};
pub use error::{Error, Result};
pub use geometry::{Point, Rect, Segment};
pub use lines::{Consolidation, LineDetector, PageLines, consolidate};
pub use ruler::DepthRuler;
pub use structure::{ColumnBounds, ColumnName, LayoutProfile, TableHalf, TableStructure};

// Internal utilities
pub(crate) mod utils {
    //! Internal utility functions for the library.

    use std::cmp::Ordering;

    /// Safely compare two floating point numbers, handling NaN cases.
    ///
    /// NaN values are treated as equal to each other and greater than all other values.
    /// This ensures that sorting operations never panic due to NaN comparisons.
    #[inline]
    pub fn safe_float_cmp(a: f64, b: f64) -> Ordering {
        match (a.is_nan(), b.is_nan()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Greater, // NaN > all numbers
            (false, true) => Ordering::Less,    // all numbers < NaN
            (false, false) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
        }
    }

    /// Arithmetic mean, `None` for an empty slice.
    pub fn mean(values: &[f64]) -> Option<f64> {
        if values.is_empty() {
            return None;
        }
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }

    /// Median, averaging the two middle values for even lengths.
    ///
    /// Returns `None` for an empty slice.
    pub fn median(values: &[f64]) -> Option<f64> {
        if values.is_empty() {
            return None;
        }

        let mut sorted = values.to_vec();
        sorted.sort_by(|a, b| safe_float_cmp(*a, *b));

        let mid = sorted.len() / 2;
        if sorted.len() % 2 == 0 {
            Some((sorted[mid - 1] + sorted[mid]) / 2.0)
        } else {
            Some(sorted[mid])
        }
    }

    /// Standard normal cumulative distribution function.
    pub fn normal_cdf(x: f64) -> f64 {
        0.5 * (1.0 + erf(x / std::f64::consts::SQRT_2))
    }

    /// Error function (Abramowitz and Stegun 7.1.26, |error| < 1.5e-7).
    fn erf(x: f64) -> f64 {
        const A1: f64 = 0.254829592;
        const A2: f64 = -0.284496736;
        const A3: f64 = 1.421413741;
        const A4: f64 = -1.453152027;
        const A5: f64 = 1.061405429;
        const P: f64 = 0.3275911;

        let sign = if x < 0.0 { -1.0 } else { 1.0 };
        let x = x.abs();

        let t = 1.0 / (1.0 + P * x);
        let poly = ((((A5 * t + A4) * t + A3) * t + A2) * t + A1) * t;

        sign * (1.0 - poly * (-x * x).exp())
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_safe_float_cmp_normal() {
            assert_eq!(safe_float_cmp(1.0, 2.0), Ordering::Less);
            assert_eq!(safe_float_cmp(2.0, 1.0), Ordering::Greater);
            assert_eq!(safe_float_cmp(1.5, 1.5), Ordering::Equal);
        }

        #[test]
        fn test_safe_float_cmp_nan() {
            assert_eq!(safe_float_cmp(f64::NAN, f64::NAN), Ordering::Equal);
            assert_eq!(safe_float_cmp(f64::NAN, 0.0), Ordering::Greater);
            assert_eq!(safe_float_cmp(0.0, f64::NAN), Ordering::Less);
        }

        #[test]
        fn test_mean_and_median() {
            assert_eq!(mean(&[]), None);
            assert_eq!(median(&[]), None);
            assert_eq!(mean(&[1.0, 2.0, 6.0]), Some(3.0));
            assert_eq!(median(&[6.0, 1.0, 2.0]), Some(2.0));
            assert_eq!(median(&[4.0, 1.0, 3.0, 2.0]), Some(2.5));
        }

        #[test]
        fn test_median_ignores_outliers() {
            let gaps = [50.0, 50.0, 3.0, 50.0, 97.0, 50.0];
            assert_eq!(median(&gaps), Some(50.0));
        }

        #[test]
        fn test_normal_cdf() {
            assert!((normal_cdf(0.0) - 0.5).abs() < 1e-7);
            assert!((normal_cdf(1.0) - 0.841_344_746).abs() < 1e-6);
            assert!((normal_cdf(-1.0) - 0.158_655_254).abs() < 1e-6);
            assert!(normal_cdf(8.0) > 0.999_999);
        }
    }
}

// Version info
/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
