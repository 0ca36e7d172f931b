//! Point-branch assembly.
//!
//! Per-dataset tables are merged into one long table first; every point
//! format then writes that single table, so a delivery has one point
//! file (plus siblings for shapefiles) no matter how many datasets it
//! covers.

use std::path::{Path, PathBuf};

use tracing::debug;

use subset_common::{Crs, SubsetGeometry};
use subset_protocol::DataRequest;

use crate::error::{OutputError, Result};
use crate::results::{PointTable, WideTable};
use crate::{naming, netcdf, shapefile};

/// Merge the per-dataset tables and write them in the request's format.
/// Returns the paths produced.
pub fn write_point_files(
    dir: &Path,
    request: &DataRequest,
    tables: Vec<PointTable>,
) -> Result<Vec<PathBuf>> {
    let merged = PointTable::merge(tables);
    if merged.is_empty() {
        return Err(OutputError::EmptyResult);
    }
    debug!(records = merged.len(), "merged point tables");
    let base = naming::merged_file_name(request.dsvars().keys().map(String::as_str));

    match request.file_extension() {
        ".csv" => {
            let path = dir.join(format!("{}.csv", base));
            write_csv(&path, &merged)?;
            Ok(vec![path])
        }
        ".shp" => shapefile::write_shapefile(dir, &base, &merged),
        ".nc" => {
            let path = dir.join(format!("{}.nc", base));
            let wide = WideTable::from_long(&merged);
            netcdf::write_point_netcdf(&path, &wide, request_crs(request))?;
            Ok(vec![path])
        }
        other => Err(OutputError::unsupported_extension(other, "point")),
    }
}

// The CRS the output points are expressed in: the reprojection target
// when one was requested, otherwise the geometry's own CRS.
fn request_crs(request: &DataRequest) -> Option<&Crs> {
    request
        .target_crs()
        .or_else(|| request.geometry().map(SubsetGeometry::crs))
}

fn write_csv(path: &Path, table: &PointTable) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(["dataset", "variable", "x", "y", "time", "value"])?;
    for rec in &table.records {
        writer.write_record([
            rec.dataset.clone(),
            rec.variable.clone(),
            rec.x.to_string(),
            rec.y.to_string(),
            rec.time.map(|d| d.to_string()).unwrap_or_default(),
            format_value(rec.value),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

// NaN cells are left empty, everything else keeps full precision.
fn format_value(value: f64) -> String {
    if value.is_nan() {
        String::new()
    } else {
        value.to_string()
    }
}
