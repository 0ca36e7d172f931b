//! Dataset catalog capability interface.
//!
//! Each concrete dataset backend implements [`GeoDataset`] to advertise its
//! identity, catalog metadata, and temporal capabilities. Request
//! validation only ever talks to this interface; the retrieval computation
//! itself lives behind it and is not part of this crate.

use chrono::{Datelike, NaiveDate};
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::sync::Arc;

use subset_common::DateGrain;

/// Capability interface implemented by every dataset in the catalog.
pub trait GeoDataset: Send + Sync {
    /// Stable catalog identifier.
    fn id(&self) -> &str;

    /// Human-readable name.
    fn name(&self) -> &str;

    /// Catalog metadata document for listings and request sidecars.
    fn info(&self) -> DatasetInfo;

    /// Date grains this dataset can serve natively.
    fn supported_grains(&self) -> &[DateGrain];

    /// True when the dataset has no time axis at all.
    fn nontemporal(&self) -> bool {
        false
    }
}

/// Catalog metadata for one dataset.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DatasetInfo {
    pub name: String,
    pub id: String,
    pub url: String,
    pub description: String,
    pub provider_name: String,
    pub provider_url: String,

    /// Native grid cell size, absent for station/point collections.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grid_size: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grid_unit: Option<String>,

    /// Variable name to description.
    pub vars: BTreeMap<String, String>,

    /// Temporal coverage per grain.
    pub date_ranges: DateCoverage,
}

impl DatasetInfo {
    /// Create an info document with required identity fields.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id: id.into(),
            url: String::new(),
            description: String::new(),
            provider_name: String::new(),
            provider_url: String::new(),
            grid_size: None,
            grid_unit: None,
            vars: BTreeMap::new(),
            date_ranges: DateCoverage::default(),
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_provider(
        mut self,
        name: impl Into<String>,
        url: impl Into<String>,
    ) -> Self {
        self.provider_name = name.into();
        self.provider_url = url.into();
        self
    }

    pub fn with_grid(mut self, size: f64, unit: impl Into<String>) -> Self {
        self.grid_size = Some(size);
        self.grid_unit = Some(unit.into());
        self
    }

    pub fn with_var(
        mut self,
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        self.vars.insert(name.into(), description.into());
        self
    }

    pub fn with_date_ranges(mut self, coverage: DateCoverage) -> Self {
        self.date_ranges = coverage;
        self
    }
}

/// Temporal coverage advertised per grain.
///
/// Serializes with one entry per grain: annual endpoints as bare years,
/// monthly and daily endpoints in their date-string shapes, and a null
/// pair for grains the dataset does not provide.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DateCoverage {
    pub annual: Option<(NaiveDate, NaiveDate)>,
    pub monthly: Option<(NaiveDate, NaiveDate)>,
    pub daily: Option<(NaiveDate, NaiveDate)>,
}

impl DateCoverage {
    pub fn with_annual(mut self, start: NaiveDate, end: NaiveDate) -> Self {
        self.annual = Some((start, end));
        self
    }

    pub fn with_monthly(mut self, start: NaiveDate, end: NaiveDate) -> Self {
        self.monthly = Some((start, end));
        self
    }

    pub fn with_daily(mut self, start: NaiveDate, end: NaiveDate) -> Self {
        self.daily = Some((start, end));
        self
    }
}

impl Serialize for DateCoverage {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        const ABSENT: [Option<String>; 2] = [None, None];

        let mut map = serializer.serialize_map(Some(3))?;
        match &self.annual {
            Some((start, end)) => map.serialize_entry("year", &[start.year(), end.year()])?,
            None => map.serialize_entry("year", &ABSENT)?,
        }
        match &self.monthly {
            Some((start, end)) => map.serialize_entry(
                "month",
                &[
                    start.format("%Y-%m").to_string(),
                    end.format("%Y-%m").to_string(),
                ],
            )?,
            None => map.serialize_entry("month", &ABSENT)?,
        }
        match &self.daily {
            Some((start, end)) => map.serialize_entry(
                "day",
                &[
                    start.format("%Y-%m-%d").to_string(),
                    end.format("%Y-%m-%d").to_string(),
                ],
            )?,
            None => map.serialize_entry("day", &ABSENT)?,
        }
        map.end()
    }
}

/// The set of datasets a deployment serves, keyed by dataset id.
///
/// Shared read-only: request validation borrows the catalog to resolve ids
/// and pull metadata, never to mutate it.
#[derive(Default)]
pub struct DatasetCatalog {
    datasets: BTreeMap<String, Arc<dyn GeoDataset>>,
}

impl DatasetCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, dataset: Arc<dyn GeoDataset>) {
        self.datasets.insert(dataset.id().to_string(), dataset);
    }

    pub fn get(&self, id: &str) -> Option<&Arc<dyn GeoDataset>> {
        self.datasets.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.datasets.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.datasets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.datasets.is_empty()
    }

    /// Id/name pairs for the catalog listing, in id order.
    pub fn entries(&self) -> Vec<CatalogEntry> {
        self.datasets
            .values()
            .map(|ds| CatalogEntry {
                id: ds.id().to_string(),
                name: ds.name().to_string(),
            })
            .collect()
    }
}

/// One row of the catalog listing.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CatalogEntry {
    pub id: String,
    pub name: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct StubDataset {
        id: String,
        name: String,
        grains: Vec<DateGrain>,
    }

    impl GeoDataset for StubDataset {
        fn id(&self) -> &str {
            &self.id
        }

        fn name(&self) -> &str {
            &self.name
        }

        fn info(&self) -> DatasetInfo {
            DatasetInfo::new(&self.id, &self.name)
        }

        fn supported_grains(&self) -> &[DateGrain] {
            &self.grains
        }
    }

    fn stub(id: &str, name: &str) -> Arc<dyn GeoDataset> {
        Arc::new(StubDataset {
            id: id.to_string(),
            name: name.to_string(),
            grains: vec![DateGrain::Annual],
        })
    }

    #[test]
    fn test_catalog_lookup() {
        let mut catalog = DatasetCatalog::new();
        assert!(catalog.is_empty());

        catalog.register(stub("prism", "PRISM"));
        catalog.register(stub("daymet", "DaymetV4"));

        assert_eq!(catalog.len(), 2);
        assert!(catalog.contains("prism"));
        assert!(!catalog.contains("modis"));
        assert_eq!(catalog.get("daymet").map(|ds| ds.name()), Some("DaymetV4"));
    }

    #[test]
    fn test_entries_ordered_by_id() {
        let mut catalog = DatasetCatalog::new();
        catalog.register(stub("prism", "PRISM"));
        catalog.register(stub("daymet", "DaymetV4"));

        let entries = catalog.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].id, "daymet");
        assert_eq!(entries[1].id, "prism");
    }

    fn ymd(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    #[test]
    fn test_date_coverage_rendering() {
        let coverage = DateCoverage::default()
            .with_annual(ymd(1980, 1, 1), ymd(2020, 1, 1))
            .with_monthly(ymd(1980, 1, 1), ymd(2020, 12, 1));
        let value = serde_json::to_value(coverage).unwrap();

        assert_eq!(value["year"], json!([1980, 2020]));
        assert_eq!(value["month"], json!(["1980-01", "2020-12"]));
        assert_eq!(value["day"], json!([null, null]));
    }

    #[test]
    fn test_dataset_info_document() {
        let info = DatasetInfo::new("prism", "PRISM")
            .with_url("https://prism.oregonstate.edu/")
            .with_provider("PRISM Climate Group", "https://prism.oregonstate.edu/")
            .with_grid(4000.0, "meters")
            .with_var("ppt", "precipitation")
            .with_date_ranges(
                DateCoverage::default().with_monthly(ymd(1895, 1, 1), ymd(2020, 12, 1)),
            );

        let value = serde_json::to_value(&info).unwrap();
        assert_eq!(value["id"], "prism");
        assert_eq!(value["grid_size"], 4000.0);
        assert_eq!(value["vars"]["ppt"], "precipitation");
        assert_eq!(value["date_ranges"]["month"][0], "1895-01");
    }
}
