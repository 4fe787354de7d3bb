use std::path::PathBuf;

use thiserror::Error;

/// Schema and format problems found while reading or writing tile data.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("Folder {} is empty", .0.display())]
    EmptyFolder(PathBuf),

    #[error("{}: row {row} has {found} values, expected {expected}", path.display())]
    RaggedRow {
        path: PathBuf,
        row: usize,
        found: usize,
        expected: usize,
    },

    #[error("{}: row {row}, column {col}: '{value}' is not a number", path.display())]
    BadNumber {
        path: PathBuf,
        row: usize,
        col: usize,
        value: String,
    },

    #[error("{}: no data rows after the metadata header", .0.display())]
    NoDataRows(PathBuf),

    #[error("{}: cannot read pixel size from '{line}'", path.display())]
    BadResolution { path: PathBuf, line: String },

    #[error("Unsupported file extension: .{0}")]
    UnsupportedExtension(String),

    #[error("{}: this build has no HDF5 support (enable the `hdf5-support` feature)", .0.display())]
    Hdf5Disabled(PathBuf),
}
