//! The validated subset request aggregate.
//!
//! [`DataRequest::new`] takes the raw semantic inputs handed over by the
//! front end, runs every consistency check in a fixed fail-fast order, and
//! produces an immutable aggregate plus the derived metadata document that
//! ships with the delivery archive. Nothing downstream re-validates.

use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::fmt;

use subset_common::{Crs, DateGrain, DateSelection, SubsetGeometry};

use crate::catalog::{DatasetCatalog, GeoDataset};
use crate::errors::{RequestError, Result};

/// Whether a request extracts gridded rasters or point samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RequestType {
    #[default]
    Raster,
    Point,
}

impl RequestType {
    /// The name used in metadata documents.
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestType::Raster => "raster",
            RequestType::Point => "points",
        }
    }
}

impl fmt::Display for RequestType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resampling algorithms accepted for raster requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResampleMethod {
    Nearest,
    Bilinear,
    Cubic,
    CubicSpline,
    Lanczos,
    Average,
    Mode,
}

impl ResampleMethod {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "nearest" => Some(ResampleMethod::Nearest),
            "bilinear" => Some(ResampleMethod::Bilinear),
            "cubic" => Some(ResampleMethod::Cubic),
            "cubic-spline" => Some(ResampleMethod::CubicSpline),
            "lanczos" => Some(ResampleMethod::Lanczos),
            "average" => Some(ResampleMethod::Average),
            "mode" => Some(ResampleMethod::Mode),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ResampleMethod::Nearest => "nearest",
            ResampleMethod::Bilinear => "bilinear",
            ResampleMethod::Cubic => "cubic",
            ResampleMethod::CubicSpline => "cubic-spline",
            ResampleMethod::Lanczos => "lanczos",
            ResampleMethod::Average => "average",
            ResampleMethod::Mode => "mode",
        }
    }
}

/// Interpolation algorithms accepted for point requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PointMethod {
    Nearest,
    Linear,
}

impl PointMethod {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "nearest" => Some(PointMethod::Nearest),
            "linear" => Some(PointMethod::Linear),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PointMethod::Nearest => "nearest",
            PointMethod::Linear => "linear",
        }
    }
}

/// The resolved method of a validated request: resampling for rasters,
/// interpolation for points. The variant always matches the request type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RiMethod {
    Resample(ResampleMethod),
    Interpolation(PointMethod),
}

impl RiMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiMethod::Resample(m) => m.as_str(),
            RiMethod::Interpolation(m) => m.as_str(),
        }
    }
}

/// How a dataset's native grains are reconciled against the request grain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GrainPolicy {
    /// Every temporal dataset must support the requested grain exactly.
    #[default]
    Strict,
    /// Datasets that cannot serve the requested grain are dropped.
    Skip,
    /// Fall back to the finest supported grain coarser than the request.
    Coarser,
    /// Fall back to the coarsest supported grain finer than the request.
    Finer,
    /// Exact match, then coarser, then finer.
    Any,
}

impl GrainPolicy {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "strict" => Some(GrainPolicy::Strict),
            "skip" => Some(GrainPolicy::Skip),
            "coarser" => Some(GrainPolicy::Coarser),
            "finer" => Some(GrainPolicy::Finer),
            "any" => Some(GrainPolicy::Any),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            GrainPolicy::Strict => "strict",
            GrainPolicy::Skip => "skip",
            GrainPolicy::Coarser => "coarser",
            GrainPolicy::Finer => "finer",
            GrainPolicy::Any => "any",
        }
    }
}

/// Resolve the grain a dataset should be asked for, or `None` to skip the
/// dataset entirely.
///
/// An exact match always wins. Beyond that the policy decides which side
/// of the grain ordering to search: `Coarser` takes the finest supported
/// grain below the request, `Finer` the coarsest above, `Any` tries both
/// in that order. `Strict` and `Skip` never substitute; under `Strict` the
/// caller turns the `None` into a validation error.
///
/// A request without temporal constraint (grain [`DateGrain::None`]) has
/// nothing to reconcile and resolves to `None`-grain under every policy
/// except `Strict`, which applies the supported-set test literally.
pub fn reconcile_grain(
    requested: DateGrain,
    supported: &[DateGrain],
    policy: GrainPolicy,
) -> Option<DateGrain> {
    if supported.contains(&requested) {
        return Some(requested);
    }
    if requested == DateGrain::None {
        return match policy {
            GrainPolicy::Strict => None,
            _ => Some(DateGrain::None),
        };
    }
    match policy {
        GrainPolicy::Strict | GrainPolicy::Skip => None,
        GrainPolicy::Coarser => nearest_coarser(requested, supported),
        GrainPolicy::Finer => nearest_finer(requested, supported),
        GrainPolicy::Any => {
            nearest_coarser(requested, supported).or_else(|| nearest_finer(requested, supported))
        }
    }
}

fn nearest_coarser(requested: DateGrain, supported: &[DateGrain]) -> Option<DateGrain> {
    supported.iter().copied().filter(|g| *g < requested).max()
}

fn nearest_finer(requested: DateGrain, supported: &[DateGrain]) -> Option<DateGrain> {
    supported.iter().copied().filter(|g| *g > requested).min()
}

/// Delivery file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputFormat {
    GeoTiff,
    NetCdf,
    Csv,
    Shapefile,
}

impl OutputFormat {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "geotiff" => Some(OutputFormat::GeoTiff),
            "netcdf" => Some(OutputFormat::NetCdf),
            "csv" => Some(OutputFormat::Csv),
            "shapefile" => Some(OutputFormat::Shapefile),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::GeoTiff => "geotiff",
            OutputFormat::NetCdf => "netcdf",
            OutputFormat::Csv => "csv",
            OutputFormat::Shapefile => "shapefile",
        }
    }

    /// The fixed format-to-extension table.
    pub fn file_extension(&self) -> &'static str {
        match self {
            OutputFormat::GeoTiff => ".tif",
            OutputFormat::NetCdf => ".nc",
            OutputFormat::Csv => ".csv",
            OutputFormat::Shapefile => ".shp",
        }
    }

    pub fn valid_for(&self, request_type: RequestType) -> bool {
        match request_type {
            RequestType::Raster => {
                matches!(self, OutputFormat::GeoTiff | OutputFormat::NetCdf)
            }
            RequestType::Point => matches!(
                self,
                OutputFormat::Csv | OutputFormat::Shapefile | OutputFormat::NetCdf
            ),
        }
    }

    fn default_for(request_type: RequestType) -> Self {
        match request_type {
            RequestType::Raster => OutputFormat::GeoTiff,
            RequestType::Point => OutputFormat::Csv,
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw semantic inputs to request validation, as handed over by the front
/// end. String fields are unvalidated; [`DataRequest::new`] owns all
/// checking and defaulting.
#[derive(Debug, Clone, Default)]
pub struct RequestParams {
    /// Dataset id to requested variable names.
    pub dsvars: BTreeMap<String, Vec<String>>,
    /// Simple date range endpoints, `"YYYY"`/`"YYYY-MM"`/`"YYYY-MM-DD"`.
    pub date_start: Option<String>,
    pub date_end: Option<String>,
    /// Combinatorial range expressions.
    pub years: Option<String>,
    pub months: Option<String>,
    pub days: Option<String>,
    pub grain_policy: Option<String>,
    pub geometry: Option<SubsetGeometry>,
    pub target_crs: Option<String>,
    pub target_resolution: Option<f64>,
    /// Resample/interpolation method, defaulted to `"nearest"`.
    pub method: Option<String>,
    pub request_type: RequestType,
    pub output_format: Option<String>,
    /// Free-form key/values echoed into the metadata document.
    pub metadata: BTreeMap<String, String>,
}

/// A fully validated subset request.
///
/// Construction performs every semantic check up front, so a constructed
/// value can be handed to dataset backends and the output assembler
/// without re-validation. The aggregate is immutable; the catalog is only
/// borrowed during construction.
#[derive(Debug, Clone)]
pub struct DataRequest {
    dsvars: BTreeMap<String, Vec<String>>,
    date_selection: DateSelection,
    raw_date_range: (Option<String>, Option<String>),
    geometry: Option<SubsetGeometry>,
    target_crs: Option<Crs>,
    target_resolution: Option<f64>,
    request_type: RequestType,
    method: RiMethod,
    grain_policy: GrainPolicy,
    effective_grains: BTreeMap<String, Option<DateGrain>>,
    output_format: OutputFormat,
    metadata: Value,
}

impl DataRequest {
    /// Validate `params` against `catalog` and build the aggregate.
    ///
    /// Checks run in a fixed order and fail fast with a single descriptive
    /// error: date selection, dataset/variable resolution, method, point
    /// geometry, grain policy and per-dataset grain reconciliation, output
    /// format. The metadata document is derived once at the end.
    pub fn new(catalog: &DatasetCatalog, params: RequestParams) -> Result<Self> {
        let RequestParams {
            dsvars,
            date_start,
            date_end,
            years,
            months,
            days,
            grain_policy,
            geometry,
            target_crs,
            target_resolution,
            method,
            request_type,
            output_format,
            metadata,
        } = params;

        let date_selection = DateSelection::from_request(
            date_start.as_deref(),
            date_end.as_deref(),
            years.as_deref(),
            months.as_deref(),
            days.as_deref(),
        )?;

        let target_crs = match target_crs.as_deref() {
            None | Some("") => None,
            Some(s) => Some(Crs::parse(s)?),
        };

        if dsvars.is_empty() {
            return Err(RequestError::NoDatasets);
        }
        let mut datasets: Vec<&dyn GeoDataset> = Vec::with_capacity(dsvars.len());
        for (dsid, vars) in &dsvars {
            let dataset = catalog
                .get(dsid)
                .ok_or_else(|| RequestError::UnknownDataset(dsid.clone()))?;
            if vars.is_empty() {
                return Err(RequestError::NoVariables(dsid.clone()));
            }
            datasets.push(dataset.as_ref());
        }

        let method_name = match method.as_deref() {
            None | Some("") => "nearest",
            Some(name) => name,
        };
        let method = match request_type {
            RequestType::Raster => RiMethod::Resample(
                ResampleMethod::parse(method_name).ok_or_else(|| RequestError::InvalidMethod {
                    method: method_name.to_string(),
                    request_type,
                })?,
            ),
            RequestType::Point => RiMethod::Interpolation(
                PointMethod::parse(method_name).ok_or_else(|| RequestError::InvalidMethod {
                    method: method_name.to_string(),
                    request_type,
                })?,
            ),
        };

        if request_type == RequestType::Point
            && !geometry.as_ref().is_some_and(SubsetGeometry::is_points)
        {
            return Err(RequestError::PointGeometryRequired);
        }

        let grain_policy = match grain_policy.as_deref() {
            None | Some("") => GrainPolicy::default(),
            Some(name) => GrainPolicy::parse(name)
                .ok_or_else(|| RequestError::InvalidGrainPolicy(name.to_string()))?,
        };

        let requested_grain = date_selection.grain();
        let mut effective_grains = BTreeMap::new();
        for dataset in &datasets {
            let effective = if dataset.nontemporal() {
                Some(DateGrain::None)
            } else {
                reconcile_grain(requested_grain, dataset.supported_grains(), grain_policy)
            };
            if grain_policy == GrainPolicy::Strict
                && !dataset.nontemporal()
                && effective.is_none()
            {
                return Err(RequestError::GrainUnsupported {
                    dataset: dataset.id().to_string(),
                    grain: requested_grain,
                });
            }
            effective_grains.insert(dataset.id().to_string(), effective);
        }

        let output_format = match output_format.as_deref() {
            None | Some("") => OutputFormat::default_for(request_type),
            Some(name) => OutputFormat::parse(name)
                .ok_or_else(|| RequestError::UnknownFormat(name.to_string()))?,
        };
        if !output_format.valid_for(request_type) {
            return Err(RequestError::FormatMismatch {
                format: output_format,
                request_type,
            });
        }

        let raw_date_range = (date_start, date_end);
        let metadata = build_metadata(
            &metadata,
            &raw_date_range,
            target_crs.as_ref(),
            request_type,
            target_resolution,
            method,
            &dsvars,
            &datasets,
        )?;

        Ok(Self {
            dsvars,
            date_selection,
            raw_date_range,
            geometry,
            target_crs,
            target_resolution,
            request_type,
            method,
            grain_policy,
            effective_grains,
            output_format,
            metadata,
        })
    }

    pub fn dsvars(&self) -> &BTreeMap<String, Vec<String>> {
        &self.dsvars
    }

    pub fn date_selection(&self) -> &DateSelection {
        &self.date_selection
    }

    /// The raw start/end strings as supplied, for echoing to callers.
    pub fn raw_date_range(&self) -> (Option<&str>, Option<&str>) {
        (self.raw_date_range.0.as_deref(), self.raw_date_range.1.as_deref())
    }

    pub fn geometry(&self) -> Option<&SubsetGeometry> {
        self.geometry.as_ref()
    }

    pub fn target_crs(&self) -> Option<&Crs> {
        self.target_crs.as_ref()
    }

    pub fn target_resolution(&self) -> Option<f64> {
        self.target_resolution
    }

    pub fn request_type(&self) -> RequestType {
        self.request_type
    }

    pub fn method(&self) -> RiMethod {
        self.method
    }

    pub fn grain_policy(&self) -> GrainPolicy {
        self.grain_policy
    }

    /// The grain each dataset should be served at, after reconciliation.
    /// A `None` value means the dataset is skipped under the policy.
    pub fn effective_grains(&self) -> &BTreeMap<String, Option<DateGrain>> {
        &self.effective_grains
    }

    pub fn effective_grain(&self, dataset: &str) -> Option<DateGrain> {
        self.effective_grains.get(dataset).copied().flatten()
    }

    pub fn output_format(&self) -> OutputFormat {
        self.output_format
    }

    /// The delivery file extension, from the fixed format table.
    pub fn file_extension(&self) -> &'static str {
        self.output_format.file_extension()
    }

    /// The derived metadata document. Computed once during construction;
    /// identical inputs always yield an identical document.
    pub fn metadata(&self) -> &Value {
        &self.metadata
    }
}

#[allow(clippy::too_many_arguments)]
fn build_metadata(
    caller: &BTreeMap<String, String>,
    raw_date_range: &(Option<String>, Option<String>),
    target_crs: Option<&Crs>,
    request_type: RequestType,
    target_resolution: Option<f64>,
    method: RiMethod,
    dsvars: &BTreeMap<String, Vec<String>>,
    datasets: &[&dyn GeoDataset],
) -> Result<Value> {
    let mut request = serde_json::Map::new();
    for (key, value) in caller {
        request.insert(key.clone(), json!(value));
    }
    request.insert(
        "target_date_range".to_string(),
        json!([raw_date_range.0, raw_date_range.1]),
    );
    request.insert(
        "target_crs".to_string(),
        target_crs.map_or(Value::Null, Crs::metadata),
    );
    request.insert("request_type".to_string(), json!(request_type.as_str()));
    match method {
        RiMethod::Resample(m) => {
            request.insert("target_resolution".to_string(), json!(target_resolution));
            request.insert("resample_method".to_string(), json!(m.as_str()));
        }
        RiMethod::Interpolation(m) => {
            request.insert("interpolation_method".to_string(), json!(m.as_str()));
        }
    }

    let mut dataset_docs = Vec::with_capacity(datasets.len());
    for dataset in datasets {
        let mut info = serde_json::to_value(dataset.info())?;
        if let Value::Object(doc) = &mut info {
            doc.insert(
                "requested_vars".to_string(),
                json!(dsvars.get(dataset.id())),
            );
        }
        dataset_docs.push(info);
    }

    Ok(json!({
        "request": request,
        "datasets": dataset_docs,
    }))
}
