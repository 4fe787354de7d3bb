//! Image layer: periodic placement, pair visualisation, alignment & stitching.
//!
//! ```text
//!   left map            right map
//!      │                    │
//!      ▼                    ▼
//!  precondition_left   precondition_right   (matrix: periodic add on 3×3 canvas)
//!      │                    │
//!      └──────┬─────────────┘
//!             ▼
//!        show_pair           (pair: falsecolor / diff / blend / checkerboard)
//!             │
//!             ▼
//!   boundary → view_window   (compare: crop window for display)
//!             │
//!             ▼
//!          stitch            (compare: merge + crop for export)
//! ```
use thiserror::Error;

pub mod compare;
pub mod matrix;
pub mod pair;

#[derive(Debug, Error, PartialEq)]
pub enum ImagingError {
    #[error("Both images must have the same dimensions ({0:?} vs {1:?})")]
    ShapeMismatch((usize, usize), (usize, usize)),

    #[error("The small matrix ({0:?}) is bigger than the big one ({1:?})")]
    SmallLargerThanBig((usize, usize), (usize, usize)),

    #[error("Unknown method: {0}")]
    UnknownMethod(String),

    #[error("Nothing to compare: both maps are empty")]
    NothingToCompare,

    #[error("Field '{0}' is missing from the selected tiles")]
    MissingField(String),
}
