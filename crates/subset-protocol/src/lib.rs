//! Subset request protocol.
//!
//! This crate holds the two pieces the delivery front end builds on: the
//! dataset catalog capability interface, and the validated [`DataRequest`]
//! aggregate. A `DataRequest` is constructed from raw semantic inputs,
//! fails fast on any inconsistent combination, and derives the metadata
//! document shipped alongside every delivery archive.
//!
//! # Example
//!
//! ```rust,ignore
//! use subset_protocol::{DataRequest, RequestParams};
//!
//! let request = DataRequest::new(&catalog, RequestParams {
//!     dsvars: [("prism".to_string(), vec!["ppt".to_string()])].into(),
//!     years: Some("2019-2021".to_string()),
//!     ..RequestParams::default()
//! })?;
//! assert_eq!(request.file_extension(), ".tif");
//! ```

pub mod catalog;
pub mod errors;
pub mod request;

// Re-export commonly used types
pub use catalog::{CatalogEntry, DatasetCatalog, DatasetInfo, DateCoverage, GeoDataset};
pub use errors::RequestError;
pub use request::{
    reconcile_grain, DataRequest, GrainPolicy, OutputFormat, PointMethod, RequestParams,
    RequestType, ResampleMethod, RiMethod,
};

/// Fixed request vocabularies, as they appear on the wire.
pub mod vocab {
    /// Resampling methods accepted for raster requests.
    pub const RESAMPLE_METHODS: &[&str] = &[
        "nearest",
        "bilinear",
        "cubic",
        "cubic-spline",
        "lanczos",
        "average",
        "mode",
    ];
    /// Interpolation methods accepted for point requests.
    pub const POINT_METHODS: &[&str] = &["nearest", "linear"];
    /// Grain-reconciliation policies.
    pub const GRAIN_POLICIES: &[&str] = &["strict", "skip", "coarser", "finer", "any"];
    /// Output formats valid for raster requests.
    pub const RASTER_FORMATS: &[&str] = &["geotiff", "netcdf"];
    /// Output formats valid for point requests.
    pub const POINT_FORMATS: &[&str] = &["csv", "shapefile", "netcdf"];
}
