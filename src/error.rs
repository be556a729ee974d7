//! Error types for table geometry recovery.
//!
//! Every variant is fatal for the unit of work that raised it (a page, a
//! table, or a ruler). Nothing in the crate retries or substitutes defaults;
//! the caller decides whether to skip the page.

/// Result type alias for borelog_oxide operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur while recovering table geometry.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A geometric heuristic found fewer candidate lines than it needs
    #[error("Not enough lines to find the {stage}: found {found}, need at least {required}")]
    InsufficientLines {
        /// Inference step that ran out of evidence
        stage: &'static str,
        /// Number of usable lines found
        found: usize,
        /// Minimum number required
        required: usize,
    },

    /// The header band did not contain exactly the expected separators
    #[error("{found} column separators were recognized in the header section, expected {expected}")]
    SeparatorCount {
        /// Separators found after consolidation
        found: usize,
        /// Separators required by the layout
        expected: usize,
    },

    /// Too few ticks were detected in a ruler column
    #[error("Could not find enough ruler ticks: found {found}, need at least {required}")]
    InsufficientTicks {
        /// Ticks found
        found: usize,
        /// Minimum number required
        required: usize,
    },

    /// Ruler ticks were found but their spacing gives no usable depth rate
    #[error("Ruler ticks are {rate} px apart, not a usable depth rate")]
    DegenerateRuler {
        /// Median tick spacing
        rate: f64,
    },

    /// A merge produced a segment with non-finite coordinates
    #[error("Merging produced a degenerate segment: {0}")]
    DegenerateSegment(String),

    /// A depth query fell outside the ruler's range
    #[error("Depth {depth} is outside the ruler range [{starting_depth}, {ending_depth}]")]
    DepthOutOfRange {
        /// Requested depth
        depth: f64,
        /// Ruler start
        starting_depth: f64,
        /// Ruler end
        ending_depth: f64,
    },

    /// A ruler was requested with `starting_depth > ending_depth`
    #[error("Invalid depth range: starting depth {starting_depth} exceeds ending depth {ending_depth}")]
    InvalidDepthRange {
        /// Requested start
        starting_depth: f64,
        /// Requested end
        ending_depth: f64,
    },

    /// The number of depth ranges does not match the number of table halves
    #[error("Expected {expected} depth ranges (one per table half), got {found}")]
    HalfCountMismatch {
        /// Number of halves in the structure
        expected: usize,
        /// Number of depth ranges supplied
        found: usize,
    },

    /// A crop region fell outside the image or had no area
    #[error("Region {name} is empty or outside the image: x {x0}..{x1}, y {y0}..{y1}")]
    EmptyRegion {
        /// Which region was being cropped
        name: &'static str,
        /// Left column
        x0: i64,
        /// Right column (exclusive)
        x1: i64,
        /// Top row
        y0: i64,
        /// Bottom row (exclusive)
        y1: i64,
    },

    /// The line detector failed
    #[error("Line detection failed: {0}")]
    LineDetection(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Image decoding error
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
