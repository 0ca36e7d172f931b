//! Output assembly for subset deliveries.
//!
//! Turns a validated request plus the per-dataset results computed for
//! it into one downloadable archive: format-specific data files written
//! into a scoped working directory, a metadata sidecar describing the
//! request, and a flat zip holding all of it. The working directory is
//! removed once the archive exists.
//!
//! ```rust,ignore
//! let assembler = OutputAssembler::new(OutputConfig::default());
//! let archive = assembler.write_requested_data(&request, results, output_dir)?;
//! ```

pub mod bundle;
pub mod config;
pub mod error;
pub mod geotiff;
pub mod naming;
pub mod netcdf;
pub mod point;
pub mod raster;
pub mod results;
pub mod shapefile;

pub use bundle::OutputBundle;
pub use config::OutputConfig;
pub use error::{OutputError, Result};
pub use results::{
    DatasetResult, Grid, PointRecord, PointTable, RasterLayer, RasterStack, WideTable,
};

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::{info, warn};
use uuid::Uuid;

use subset_protocol::{DataRequest, RequestType};

/// Assembles delivery archives from validated requests and the results
/// dataset backends produced for them.
pub struct OutputAssembler {
    config: OutputConfig,
}

impl OutputAssembler {
    pub fn new(config: OutputConfig) -> Self {
        Self { config }
    }

    /// Write every output file for `request`, package the archive under
    /// `output_dir`, and return the archive path.
    ///
    /// `results` holds one entry per dataset, keyed by dataset id, each
    /// in the shape matching the request type. On failure the working
    /// directory is removed; nothing partial is left behind.
    pub fn write_requested_data(
        &self,
        request: &DataRequest,
        results: BTreeMap<String, DatasetResult>,
        output_dir: &Path,
    ) -> Result<PathBuf> {
        let request_id = Uuid::new_v4();
        let bundle = OutputBundle::create(output_dir, &self.config.archive_prefix, request_id)?;

        match self.write_bundle(request, results, &bundle, output_dir) {
            Ok(archive) => {
                if self.config.keep_workdir {
                    info!(dir = %bundle.dir().display(), "keeping delivery workdir");
                } else {
                    bundle.cleanup()?;
                }
                info!(
                    request_id = %request_id,
                    archive = %archive.display(),
                    "delivery archive written"
                );
                Ok(archive)
            }
            Err(err) => {
                if let Err(cleanup_err) = bundle.cleanup() {
                    warn!(error = %cleanup_err, "failed to remove delivery workdir");
                }
                Err(err)
            }
        }
    }

    fn write_bundle(
        &self,
        request: &DataRequest,
        results: BTreeMap<String, DatasetResult>,
        bundle: &OutputBundle,
        output_dir: &Path,
    ) -> Result<PathBuf> {
        let files = match request.request_type() {
            RequestType::Raster => {
                let mut stacks = Vec::new();
                for (dataset, result) in results {
                    match result {
                        DatasetResult::Raster(stack) => stacks.push((dataset, stack)),
                        DatasetResult::Points(_) => {
                            return Err(OutputError::ResultShapeMismatch {
                                dataset,
                                got: "point",
                                expected: "raster",
                            })
                        }
                    }
                }
                raster::write_raster_files(bundle.dir(), request, &stacks)?
            }
            RequestType::Point => {
                let mut tables = Vec::new();
                for (dataset, result) in results {
                    match result {
                        DatasetResult::Points(table) => tables.push(table),
                        DatasetResult::Raster(_) => {
                            return Err(OutputError::ResultShapeMismatch {
                                dataset,
                                got: "raster",
                                expected: "point",
                            })
                        }
                    }
                }
                point::write_point_files(bundle.dir(), request, tables)?
            }
        };

        let sidecar = bundle.write_sidecar(request.metadata())?;
        let archive_path = output_dir.join(format!(
            "{}_{}.zip",
            self.config.archive_prefix,
            bundle.request_id()
        ));
        bundle.write_archive(&archive_path, &sidecar, &files)?;
        Ok(archive_path)
    }
}
