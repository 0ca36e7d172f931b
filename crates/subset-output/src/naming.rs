//! Output file naming.
//!
//! Names carry provenance so an extracted archive stays legible on its
//! own: raster layers embed dataset, variable, and timestep; the merged
//! point file embeds every contributing dataset.

use subset_common::RequestDate;

/// Base name (no extension) for one raster layer. The timestep is
/// omitted for layers with no temporal coordinate.
pub fn layer_file_name(dataset: &str, variable: &str, date: Option<&RequestDate>) -> String {
    match date {
        Some(date) => format!("{}_{}_{}", dataset, variable, date),
        None => format!("{}_{}", dataset, variable),
    }
}

/// Base name for the merged point file: the requested dataset ids joined
/// with underscores.
pub fn merged_file_name<'a>(datasets: impl IntoIterator<Item = &'a str>) -> String {
    datasets.into_iter().collect::<Vec<_>>().join("_")
}
