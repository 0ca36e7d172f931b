//! Raster-branch assembly.
//!
//! GeoTIFF output produces one file per dataset, variable, and timestep;
//! NetCDF output packs each dataset's whole stack into one document.

use std::path::{Path, PathBuf};

use tracing::debug;

use subset_protocol::DataRequest;

use crate::error::{OutputError, Result};
use crate::results::RasterStack;
use crate::{geotiff, naming, netcdf};

/// Write every raster output file for the request. Returns the paths in
/// the order they were produced.
pub fn write_raster_files(
    dir: &Path,
    request: &DataRequest,
    stacks: &[(String, RasterStack)],
) -> Result<Vec<PathBuf>> {
    if stacks.iter().all(|(_, stack)| stack.layers.is_empty()) {
        return Err(OutputError::EmptyResult);
    }

    let mut paths = Vec::new();
    match request.file_extension() {
        ".tif" => {
            for (dataset, stack) in stacks {
                for layer in &stack.layers {
                    let name = naming::layer_file_name(dataset, &layer.variable, layer.date.as_ref());
                    let path = dir.join(format!("{}.tif", name));
                    geotiff::write_geotiff(&path, &layer.grid, &stack.crs)?;
                    paths.push(path);
                }
                debug!(dataset = %dataset, layers = stack.layers.len(), "wrote GeoTIFF layers");
            }
        }
        ".nc" => {
            for (dataset, stack) in stacks {
                if stack.layers.is_empty() {
                    continue;
                }
                let path = dir.join(format!("{}.nc", dataset));
                netcdf::write_raster_netcdf(&path, stack)?;
                debug!(dataset = %dataset, layers = stack.layers.len(), "wrote NetCDF document");
                paths.push(path);
            }
        }
        other => return Err(OutputError::unsupported_extension(other, "raster")),
    }
    Ok(paths)
}
