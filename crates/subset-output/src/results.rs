//! Materialized backend results consumed by the assembler.
//!
//! Backends hand the assembler one [`DatasetResult`] per requested
//! dataset: a stack of gridded layers for raster requests, a long-format
//! sample table for point requests. Writers never see backend types,
//! only these.

use subset_common::{Crs, RequestDate};

/// A single gridded layer of values.
///
/// Values are stored in row-major order with the top row first. NaN
/// marks nodata cells.
#[derive(Debug, Clone, PartialEq)]
pub struct Grid {
    pub values: Vec<f32>,
    pub width: usize,
    pub height: usize,
    /// X coordinate of the top-left cell corner.
    pub origin_x: f64,
    /// Y coordinate of the top-left cell corner.
    pub origin_y: f64,
    /// Cell width; positive.
    pub pixel_size_x: f64,
    /// Cell height; positive, rows step downward from the origin.
    pub pixel_size_y: f64,
}

impl Grid {
    pub fn new(
        values: Vec<f32>,
        width: usize,
        height: usize,
        origin_x: f64,
        origin_y: f64,
        pixel_size_x: f64,
        pixel_size_y: f64,
    ) -> Self {
        Self {
            values,
            width,
            height,
            origin_x,
            origin_y,
            pixel_size_x,
            pixel_size_y,
        }
    }

    /// Get the value at the given column and row.
    pub fn get(&self, col: usize, row: usize) -> Option<f32> {
        if col >= self.width || row >= self.height {
            return None;
        }
        self.values.get(row * self.width + col).copied()
    }

    /// Cell-center x coordinates, left to right.
    pub fn x_coords(&self) -> Vec<f64> {
        (0..self.width)
            .map(|col| self.origin_x + (col as f64 + 0.5) * self.pixel_size_x)
            .collect()
    }

    /// Cell-center y coordinates, top to bottom.
    pub fn y_coords(&self) -> Vec<f64> {
        (0..self.height)
            .map(|row| self.origin_y - (row as f64 + 0.5) * self.pixel_size_y)
            .collect()
    }

    /// Whether the declared dimensions match the value buffer.
    pub fn shape_is_consistent(&self) -> bool {
        self.values.len() == self.width * self.height
    }

    /// Whether two grids cover the same cells in the same geometry.
    pub fn same_geometry(&self, other: &Grid) -> bool {
        self.width == other.width
            && self.height == other.height
            && self.origin_x == other.origin_x
            && self.origin_y == other.origin_y
            && self.pixel_size_x == other.pixel_size_x
            && self.pixel_size_y == other.pixel_size_y
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// One variable at one timestep of a raster result.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterLayer {
    pub variable: String,
    /// Absent when the dataset is nontemporal or was reconciled to no
    /// temporal grain.
    pub date: Option<RequestDate>,
    pub grid: Grid,
}

/// Every layer one dataset produced for a raster request.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterStack {
    pub crs: Crs,
    pub layers: Vec<RasterLayer>,
}

impl RasterStack {
    pub fn new(crs: Crs) -> Self {
        Self {
            crs,
            layers: Vec::new(),
        }
    }

    pub fn push(&mut self, layer: RasterLayer) {
        self.layers.push(layer);
    }

    /// Distinct variable names, in first-seen order.
    pub fn variables(&self) -> Vec<&str> {
        let mut vars: Vec<&str> = Vec::new();
        for layer in &self.layers {
            if !vars.contains(&layer.variable.as_str()) {
                vars.push(&layer.variable);
            }
        }
        vars
    }

    /// Distinct timesteps, in first-seen order.
    pub fn dates(&self) -> Vec<Option<RequestDate>> {
        let mut dates: Vec<Option<RequestDate>> = Vec::new();
        for layer in &self.layers {
            if !dates.contains(&layer.date) {
                dates.push(layer.date);
            }
        }
        dates
    }

    /// Look up the layer for one variable at one timestep.
    pub fn layer(&self, variable: &str, date: Option<RequestDate>) -> Option<&RasterLayer> {
        self.layers
            .iter()
            .find(|l| l.variable == variable && l.date == date)
    }
}

/// One observation in a long-format point table.
#[derive(Debug, Clone, PartialEq)]
pub struct PointRecord {
    pub dataset: String,
    pub variable: String,
    pub x: f64,
    pub y: f64,
    /// Absent when the dataset is nontemporal or was reconciled to no
    /// temporal grain.
    pub time: Option<RequestDate>,
    pub value: f64,
}

/// Long-format point samples, one record per dataset/variable/location/
/// timestep combination.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PointTable {
    pub records: Vec<PointRecord>,
}

impl PointTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: PointRecord) {
        self.records.push(record);
    }

    /// Concatenate per-dataset tables into the single table the point
    /// branch writes.
    pub fn merge(tables: impl IntoIterator<Item = PointTable>) -> PointTable {
        let mut merged = PointTable::new();
        for table in tables {
            merged.records.extend(table.records);
        }
        merged
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// A [`PointTable`] pivoted wide: one column per dataset/variable pair,
/// one row per distinct `(x, y, time)` tuple. `None` cells mark
/// combinations with no observation.
#[derive(Debug, Clone, PartialEq)]
pub struct WideTable {
    /// Distinct `(x, y, time)` tuples, in first-seen order.
    pub index: Vec<(f64, f64, Option<RequestDate>)>,
    /// Dataset/variable column keys, in first-seen order.
    pub columns: Vec<(String, String)>,
    /// Cell values indexed `[row][column]`.
    pub values: Vec<Vec<Option<f64>>>,
}

impl WideTable {
    /// Pivot a long table wide.
    pub fn from_long(table: &PointTable) -> Self {
        let mut index: Vec<(f64, f64, Option<RequestDate>)> = Vec::new();
        let mut columns: Vec<(String, String)> = Vec::new();
        let mut values: Vec<Vec<Option<f64>>> = Vec::new();

        for rec in &table.records {
            let col = match columns
                .iter()
                .position(|(d, v)| *d == rec.dataset && *v == rec.variable)
            {
                Some(i) => i,
                None => {
                    columns.push((rec.dataset.clone(), rec.variable.clone()));
                    for row in &mut values {
                        row.push(None);
                    }
                    columns.len() - 1
                }
            };

            let key = (rec.x, rec.y, rec.time);
            let row = match index.iter().position(|k| *k == key) {
                Some(i) => i,
                None => {
                    index.push(key);
                    values.push(vec![None; columns.len()]);
                    index.len() - 1
                }
            };

            values[row][col] = Some(rec.value);
        }

        Self {
            index,
            columns,
            values,
        }
    }

    /// Un-pivot back to long format. Cells holding `None` produce no
    /// record, so a pivot round trip reproduces the original
    /// observations.
    pub fn to_long(&self) -> PointTable {
        let mut table = PointTable::new();
        for (row, &(x, y, time)) in self.index.iter().enumerate() {
            for (col, (dataset, variable)) in self.columns.iter().enumerate() {
                if let Some(value) = self.values[row][col] {
                    table.push(PointRecord {
                        dataset: dataset.clone(),
                        variable: variable.clone(),
                        x,
                        y,
                        time,
                        value,
                    });
                }
            }
        }
        table
    }

    /// The file-facing name of one column.
    pub fn column_name(&self, col: usize) -> Option<String> {
        self.columns.get(col).map(|(d, v)| format!("{}_{}", d, v))
    }
}

/// What one dataset backend hands the assembler.
#[derive(Debug, Clone, PartialEq)]
pub enum DatasetResult {
    Raster(RasterStack),
    Points(PointTable),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wgs84() -> Crs {
        Crs::parse("EPSG:4326").unwrap()
    }

    fn sample_grid() -> Grid {
        Grid::new(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], 3, 2, -100.0, 40.0, 0.5, 0.5)
    }

    #[test]
    fn test_grid_indexing() {
        let grid = sample_grid();
        assert_eq!(grid.get(0, 0), Some(1.0));
        assert_eq!(grid.get(2, 0), Some(3.0));
        assert_eq!(grid.get(0, 1), Some(4.0));
        assert_eq!(grid.get(2, 1), Some(6.0));
        assert_eq!(grid.get(3, 0), None);
        assert_eq!(grid.get(0, 2), None);
        assert!(grid.shape_is_consistent());
    }

    #[test]
    fn test_grid_cell_centers() {
        let grid = sample_grid();
        assert_eq!(grid.x_coords(), vec![-99.75, -99.25, -98.75]);
        assert_eq!(grid.y_coords(), vec![39.75, 39.25]);
    }

    #[test]
    fn test_stack_distinct_variables_and_dates() {
        let mut stack = RasterStack::new(wgs84());
        let d1 = Some(RequestDate::annual(2000));
        let d2 = Some(RequestDate::annual(2001));
        for date in [d1, d2] {
            for var in ["tmin", "tmax"] {
                stack.push(RasterLayer {
                    variable: var.to_string(),
                    date,
                    grid: sample_grid(),
                });
            }
        }

        assert_eq!(stack.variables(), vec!["tmin", "tmax"]);
        assert_eq!(stack.dates(), vec![d1, d2]);
        assert!(stack.layer("tmax", d2).is_some());
        assert!(stack.layer("tavg", d1).is_none());
    }

    #[test]
    fn test_merge_concatenates() {
        let rec = |ds: &str, v: f64| PointRecord {
            dataset: ds.to_string(),
            variable: "ppt".to_string(),
            x: 0.0,
            y: 0.0,
            time: None,
            value: v,
        };
        let mut a = PointTable::new();
        a.push(rec("ds1", 1.0));
        let mut b = PointTable::new();
        b.push(rec("ds2", 2.0));
        b.push(rec("ds2", 3.0));

        let merged = PointTable::merge([a, b]);
        assert_eq!(merged.len(), 3);
        assert_eq!(merged.records[0].dataset, "ds1");
        assert_eq!(merged.records[2].value, 3.0);
    }

    #[test]
    fn test_pivot_round_trip() {
        let mut table = PointTable::new();
        let date = Some(RequestDate::monthly(2020, 6));
        for (ds, var, x, value) in [
            ("prism", "ppt", -104.5, 10.0),
            ("prism", "ppt", -104.0, 11.0),
            ("prism", "tmax", -104.5, 30.0),
            ("daymet_v4", "srad", -104.0, 250.0),
        ] {
            table.push(PointRecord {
                dataset: ds.to_string(),
                variable: var.to_string(),
                x,
                y: 39.0,
                time: date,
                value,
            });
        }

        let wide = WideTable::from_long(&table);
        assert_eq!(wide.index.len(), 2);
        assert_eq!(wide.columns.len(), 3);
        assert_eq!(wide.column_name(0), Some("prism_ppt".to_string()));
        assert_eq!(wide.column_name(2), Some("daymet_v4_srad".to_string()));
        // daymet_v4 has no sample at x = -104.5.
        assert_eq!(wide.values[0][2], None);

        let back = wide.to_long();
        assert_eq!(back.len(), table.len());
        for rec in &table.records {
            assert!(back.records.contains(rec));
        }
    }

    #[test]
    fn test_pivot_preserves_nan_values() {
        let mut table = PointTable::new();
        table.push(PointRecord {
            dataset: "prism".to_string(),
            variable: "ppt".to_string(),
            x: 1.0,
            y: 2.0,
            time: None,
            value: f64::NAN,
        });

        let wide = WideTable::from_long(&table);
        assert!(wide.values[0][0].unwrap().is_nan());
        let back = wide.to_long();
        assert_eq!(back.len(), 1);
        assert!(back.records[0].value.is_nan());
    }
}
