//! Error types for output assembly.

use thiserror::Error;

/// Errors that can occur while assembling a delivery archive.
#[derive(Error, Debug)]
pub enum OutputError {
    /// Filesystem failure while producing output files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The request's file extension has no writer in the branch that was
    /// dispatched. Request validation and the writer tables disagree, so
    /// this is a defect rather than a user error.
    #[error("no {branch} writer for extension {extension:?}")]
    UnsupportedExtension {
        extension: String,
        branch: &'static str,
    },

    /// A working directory or archive with this name already exists.
    /// Names embed a fresh UUID, so an existing path is never reused or
    /// overwritten.
    #[error("output path collision: {0}")]
    PathCollision(String),

    /// A dataset handed the assembler a result of the wrong shape for
    /// the request type.
    #[error("dataset {dataset} produced a {got} result for a {expected} request")]
    ResultShapeMismatch {
        dataset: String,
        got: &'static str,
        expected: &'static str,
    },

    /// There is nothing to package.
    #[error("no dataset results to package")]
    EmptyResult,

    /// A grid's declared dimensions and its value buffer disagree.
    #[error("grid shape mismatch: {0}")]
    GridShape(String),

    /// A NetCDF variable's declared dimensions and its payload disagree.
    #[error("netcdf variable shape mismatch: {0}")]
    NetcdfShape(String),

    /// A produced file path has no usable base name for the archive.
    #[error("unusable output file name: {0}")]
    BadFileName(String),

    /// GeoTIFF encoding failed.
    #[error("GeoTIFF encoding error: {0}")]
    TiffEncode(#[from] tiff::TiffError),

    /// CSV encoding failed.
    #[error("CSV encoding error: {0}")]
    CsvEncode(#[from] csv::Error),

    /// Archive packaging failed.
    #[error("archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// Metadata sidecar serialization failed.
    #[error("metadata serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl OutputError {
    pub fn unsupported_extension(extension: impl Into<String>, branch: &'static str) -> Self {
        Self::UnsupportedExtension {
            extension: extension.into(),
            branch,
        }
    }

    pub fn path_collision(path: impl Into<String>) -> Self {
        Self::PathCollision(path.into())
    }

    pub fn grid_shape(msg: impl Into<String>) -> Self {
        Self::GridShape(msg.into())
    }

    pub fn netcdf_shape(msg: impl Into<String>) -> Self {
        Self::NetcdfShape(msg.into())
    }

    pub fn bad_file_name(name: impl Into<String>) -> Self {
        Self::BadFileName(name.into())
    }
}

pub type Result<T> = std::result::Result<T, OutputError>;
