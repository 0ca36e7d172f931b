//! Request validation error types.

use thiserror::Error;

use subset_common::{CrsParseError, DateGrain, DateParseError};

use crate::request::{OutputFormat, RequestType};

/// Errors surfaced while building a [`DataRequest`](crate::DataRequest).
///
/// Every variant is detected during construction, before any dataset work
/// begins; a failed request leaves no partial state behind.
#[derive(Debug, Error)]
pub enum RequestError {
    /// A date or range input failed to parse.
    #[error("Date selection error: {0}")]
    Date(#[from] DateParseError),

    /// The target CRS identifier failed to parse.
    #[error("CRS error: {0}")]
    Crs(#[from] CrsParseError),

    /// The request names no datasets.
    #[error("Request names no datasets")]
    NoDatasets,

    /// A requested dataset id is not in the catalog.
    #[error("Dataset not found: {0}")]
    UnknownDataset(String),

    /// A dataset was requested with an empty variable list.
    #[error("No variables requested for dataset: {0}")]
    NoVariables(String),

    /// Method not in the set valid for the request type.
    #[error("Invalid method for {request_type} requests: {method}")]
    InvalidMethod {
        method: String,
        request_type: RequestType,
    },

    /// Point request without multipoint geometry.
    #[error("Point requests require multipoint geometry")]
    PointGeometryRequired,

    /// Unrecognized grain-reconciliation policy.
    #[error("Invalid date grain matching method: {0}")]
    InvalidGrainPolicy(String),

    /// Strict policy: a dataset does not support the requested grain.
    #[error("{dataset} does not have requested date granularity: {grain}")]
    GrainUnsupported { dataset: String, grain: DateGrain },

    /// Unrecognized output format.
    #[error("Unknown output format: {0}")]
    UnknownFormat(String),

    /// A real format that is not valid for this request type.
    #[error("Output format {format} is not valid for {request_type} requests")]
    FormatMismatch {
        format: OutputFormat,
        request_type: RequestType,
    },

    /// The derived metadata document failed to serialize.
    #[error("Metadata serialization error: {0}")]
    Metadata(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, RequestError>;
