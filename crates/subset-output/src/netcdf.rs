//! NetCDF classic (CDF-1) encoding for raster and point deliveries.
//!
//! The encoder covers exactly what deliveries use: fixed dimensions,
//! char and numeric variables, char and numeric attributes, the whole
//! file written in one pass. Layout follows the classic format:
//! big-endian headers, names and payloads padded to four bytes, data
//! sections at offsets recorded in the variable list.

use std::fs;
use std::path::Path;

use subset_common::{Crs, RequestDate};

use crate::error::{OutputError, Result};
use crate::results::{RasterStack, WideTable};

const NC_DIMENSION: u32 = 0x0A;
const NC_VARIABLE: u32 = 0x0B;
const NC_ATTRIBUTE: u32 = 0x0C;

const NC_CHAR: u32 = 2;
const NC_FLOAT: u32 = 5;
const NC_DOUBLE: u32 = 6;

/// Attribute payload.
#[derive(Debug, Clone)]
pub enum NcValue {
    Char(String),
    Float(Vec<f32>),
    Double(Vec<f64>),
}

impl NcValue {
    fn nc_type(&self) -> u32 {
        match self {
            NcValue::Char(_) => NC_CHAR,
            NcValue::Float(_) => NC_FLOAT,
            NcValue::Double(_) => NC_DOUBLE,
        }
    }

    fn nelems(&self) -> usize {
        match self {
            NcValue::Char(s) => s.len(),
            NcValue::Float(v) => v.len(),
            NcValue::Double(v) => v.len(),
        }
    }

    fn byte_len(&self) -> usize {
        match self {
            NcValue::Char(s) => s.len(),
            NcValue::Float(v) => v.len() * 4,
            NcValue::Double(v) => v.len() * 8,
        }
    }

    fn put(&self, buf: &mut Vec<u8>) {
        match self {
            NcValue::Char(s) => buf.extend_from_slice(s.as_bytes()),
            NcValue::Float(v) => {
                for x in v {
                    buf.extend_from_slice(&x.to_be_bytes());
                }
            }
            NcValue::Double(v) => {
                for x in v {
                    buf.extend_from_slice(&x.to_be_bytes());
                }
            }
        }
        pad_to_4(buf);
    }
}

/// Variable payload.
#[derive(Debug, Clone)]
pub enum NcData {
    Char(Vec<u8>),
    Float(Vec<f32>),
    Double(Vec<f64>),
}

impl NcData {
    fn nc_type(&self) -> u32 {
        match self {
            NcData::Char(_) => NC_CHAR,
            NcData::Float(_) => NC_FLOAT,
            NcData::Double(_) => NC_DOUBLE,
        }
    }

    fn nelems(&self) -> usize {
        match self {
            NcData::Char(v) => v.len(),
            NcData::Float(v) => v.len(),
            NcData::Double(v) => v.len(),
        }
    }

    fn byte_len(&self) -> usize {
        match self {
            NcData::Char(v) => v.len(),
            NcData::Float(v) => v.len() * 4,
            NcData::Double(v) => v.len() * 8,
        }
    }

    fn put(&self, buf: &mut Vec<u8>) {
        match self {
            NcData::Char(v) => buf.extend_from_slice(v),
            NcData::Float(v) => {
                for x in v {
                    buf.extend_from_slice(&x.to_be_bytes());
                }
            }
            NcData::Double(v) => {
                for x in v {
                    buf.extend_from_slice(&x.to_be_bytes());
                }
            }
        }
        pad_to_4(buf);
    }
}

#[derive(Debug)]
struct NcDim {
    name: String,
    len: usize,
}

#[derive(Debug)]
struct NcAttr {
    name: String,
    value: NcValue,
}

#[derive(Debug)]
struct NcVar {
    name: String,
    dims: Vec<usize>,
    atts: Vec<NcAttr>,
    data: NcData,
}

/// An in-memory CDF-1 file.
#[derive(Debug, Default)]
pub struct NcFile {
    dims: Vec<NcDim>,
    atts: Vec<NcAttr>,
    vars: Vec<NcVar>,
}

impl NcFile {
    pub fn new() -> Self {
        Self::default()
    }

    /// Define a dimension and return its id.
    pub fn add_dim(&mut self, name: impl Into<String>, len: usize) -> usize {
        self.dims.push(NcDim {
            name: name.into(),
            len,
        });
        self.dims.len() - 1
    }

    /// Attach a global attribute.
    pub fn add_attr(&mut self, name: impl Into<String>, value: NcValue) {
        self.atts.push(NcAttr {
            name: name.into(),
            value,
        });
    }

    /// Define a variable over the given dimension ids and return its id.
    /// The payload's element count must equal the product of the
    /// dimension lengths.
    pub fn add_var(
        &mut self,
        name: impl Into<String>,
        dims: &[usize],
        data: NcData,
    ) -> Result<usize> {
        let name = name.into();
        let mut expected = 1usize;
        for &dim in dims {
            let len = self
                .dims
                .get(dim)
                .map(|d| d.len)
                .ok_or_else(|| OutputError::netcdf_shape(format!("{}: unknown dim {}", name, dim)))?;
            expected *= len;
        }
        if data.nelems() != expected {
            return Err(OutputError::netcdf_shape(format!(
                "{}: {} elements for {} cells",
                name,
                data.nelems(),
                expected,
            )));
        }
        self.vars.push(NcVar {
            name,
            dims: dims.to_vec(),
            atts: Vec::new(),
            data,
        });
        Ok(self.vars.len() - 1)
    }

    /// Attach an attribute to a variable.
    pub fn add_var_attr(&mut self, var: usize, name: impl Into<String>, value: NcValue) {
        if let Some(var) = self.vars.get_mut(var) {
            var.atts.push(NcAttr {
                name: name.into(),
                value,
            });
        }
    }

    fn header_len(&self) -> usize {
        let mut len = 8; // magic + numrecs
        len += 8;
        for dim in &self.dims {
            len += name_len(&dim.name) + 4;
        }
        len += attr_list_len(&self.atts);
        len += 8;
        for var in &self.vars {
            len += name_len(&var.name) + 4 + 4 * var.dims.len();
            len += attr_list_len(&var.atts);
            len += 12; // nc_type, vsize, begin
        }
        len
    }

    /// Serialize and write the file.
    pub fn write_to(&self, path: &Path) -> Result<()> {
        let mut buf = Vec::new();
        buf.extend_from_slice(b"CDF\x01");
        put_u32(&mut buf, 0); // numrecs; every dimension here is fixed

        put_tagged_count(&mut buf, NC_DIMENSION, self.dims.len());
        for dim in &self.dims {
            put_name(&mut buf, &dim.name);
            put_u32(&mut buf, dim.len as u32);
        }

        put_attr_list(&mut buf, &self.atts);

        let mut begin = self.header_len();
        put_tagged_count(&mut buf, NC_VARIABLE, self.vars.len());
        for var in &self.vars {
            put_name(&mut buf, &var.name);
            put_u32(&mut buf, var.dims.len() as u32);
            for &dim in &var.dims {
                put_u32(&mut buf, dim as u32);
            }
            put_attr_list(&mut buf, &var.atts);
            put_u32(&mut buf, var.data.nc_type());
            let vsize = pad4(var.data.byte_len());
            put_u32(&mut buf, vsize as u32);
            put_u32(&mut buf, begin as u32);
            begin += vsize;
        }

        for var in &self.vars {
            var.data.put(&mut buf);
        }

        fs::write(path, buf)?;
        Ok(())
    }
}

fn pad4(n: usize) -> usize {
    (n + 3) & !3
}

fn pad_to_4(buf: &mut Vec<u8>) {
    buf.resize(pad4(buf.len()), 0);
}

fn name_len(name: &str) -> usize {
    4 + pad4(name.len())
}

fn attr_list_len(atts: &[NcAttr]) -> usize {
    let mut len = 8;
    for att in atts {
        len += name_len(&att.name) + 8 + pad4(att.value.byte_len());
    }
    len
}

fn put_u32(buf: &mut Vec<u8>, v: u32) {
    buf.extend_from_slice(&v.to_be_bytes());
}

fn put_name(buf: &mut Vec<u8>, name: &str) {
    put_u32(buf, name.len() as u32);
    buf.extend_from_slice(name.as_bytes());
    pad_to_4(buf);
}

// An empty list is written as ABSENT: two zero words.
fn put_tagged_count(buf: &mut Vec<u8>, tag: u32, count: usize) {
    if count == 0 {
        put_u32(buf, 0);
    } else {
        put_u32(buf, tag);
    }
    put_u32(buf, count as u32);
}

fn put_attr_list(buf: &mut Vec<u8>, atts: &[NcAttr]) {
    put_tagged_count(buf, NC_ATTRIBUTE, atts.len());
    for att in atts {
        put_name(buf, &att.name);
        put_u32(buf, att.value.nc_type());
        put_u32(buf, att.value.nelems() as u32);
        att.value.put(buf);
    }
}

/// Render timestep labels as a fixed-width char matrix.
fn time_matrix(labels: &[String]) -> (usize, Vec<u8>) {
    let width = labels.iter().map(String::len).max().unwrap_or(1).max(1);
    let mut bytes = Vec::with_capacity(labels.len() * width);
    for label in labels {
        bytes.extend_from_slice(label.as_bytes());
        bytes.resize(bytes.len() + (width - label.len()), 0);
    }
    (width, bytes)
}

/// Write one dataset's raster stack as a NetCDF document with `time`,
/// `y`, and `x` dimensions. Nontemporal stacks omit the time dimension.
/// Every layer must share the first layer's grid geometry.
pub fn write_raster_netcdf(path: &Path, stack: &RasterStack) -> Result<()> {
    let first = match stack.layers.first() {
        Some(layer) => &layer.grid,
        None => return Err(OutputError::EmptyResult),
    };
    for layer in &stack.layers {
        if !layer.grid.shape_is_consistent() {
            return Err(OutputError::grid_shape(format!(
                "{}x{} grid with {} values",
                layer.grid.width,
                layer.grid.height,
                layer.grid.values.len(),
            )));
        }
        if !layer.grid.same_geometry(first) {
            return Err(OutputError::grid_shape(format!(
                "layer {} does not share the stack's grid geometry",
                layer.variable,
            )));
        }
    }

    let times: Vec<RequestDate> = stack.dates().into_iter().flatten().collect();
    let cells = first.width * first.height;

    let mut file = NcFile::new();
    file.add_attr("crs", NcValue::Char(stack.crs.as_str().to_string()));

    let time_dims = if times.is_empty() {
        None
    } else {
        let labels: Vec<String> = times.iter().map(RequestDate::to_string).collect();
        let (width, bytes) = time_matrix(&labels);
        let time_dim = file.add_dim("time", times.len());
        let len_dim = file.add_dim("time_len", width);
        file.add_var("time", &[time_dim, len_dim], NcData::Char(bytes))?;
        Some(time_dim)
    };

    let y_dim = file.add_dim("y", first.height);
    let x_dim = file.add_dim("x", first.width);
    file.add_var("y", &[y_dim], NcData::Double(first.y_coords()))?;
    file.add_var("x", &[x_dim], NcData::Double(first.x_coords()))?;

    for variable in stack.variables() {
        let (dims, data) = match time_dims {
            Some(time_dim) => {
                let mut data = Vec::with_capacity(times.len() * cells);
                for &time in &times {
                    match stack.layer(variable, Some(time)) {
                        Some(layer) => data.extend_from_slice(&layer.grid.values),
                        None => data.resize(data.len() + cells, f32::NAN),
                    }
                }
                (vec![time_dim, y_dim, x_dim], data)
            }
            None => {
                let data = match stack.layer(variable, None) {
                    Some(layer) => layer.grid.values.clone(),
                    None => vec![f32::NAN; cells],
                };
                (vec![y_dim, x_dim], data)
            }
        };
        let var = file.add_var(variable, &dims, NcData::Float(data))?;
        file.add_var_attr(var, "_FillValue", NcValue::Float(vec![f32::NAN]));
    }

    file.write_to(path)
}

/// Write the merged point table as a NetCDF document indexed by `x`,
/// `y`, and `time`, one variable per dataset/variable column.
pub fn write_point_netcdf(path: &Path, wide: &WideTable, crs: Option<&Crs>) -> Result<()> {
    if wide.index.is_empty() {
        return Err(OutputError::EmptyResult);
    }

    let mut xs: Vec<f64> = Vec::new();
    let mut ys: Vec<f64> = Vec::new();
    let mut times: Vec<Option<RequestDate>> = Vec::new();
    for &(x, y, time) in &wide.index {
        if !xs.iter().any(|&v| v == x) {
            xs.push(x);
        }
        if !ys.iter().any(|&v| v == y) {
            ys.push(y);
        }
        if !times.contains(&time) {
            times.push(time);
        }
    }
    xs.sort_unstable_by(f64::total_cmp);
    ys.sort_unstable_by(f64::total_cmp);
    times.sort_unstable();
    let temporal = times.iter().any(Option::is_some);

    let mut file = NcFile::new();
    if let Some(crs) = crs {
        file.add_attr("crs", NcValue::Char(crs.as_str().to_string()));
    }

    let x_dim = file.add_dim("x", xs.len());
    let y_dim = file.add_dim("y", ys.len());
    file.add_var("x", &[x_dim], NcData::Double(xs.clone()))?;
    file.add_var("y", &[y_dim], NcData::Double(ys.clone()))?;

    let time_dims = if temporal {
        let labels: Vec<String> = times
            .iter()
            .map(|t| t.map(|d| d.to_string()).unwrap_or_default())
            .collect();
        let (width, bytes) = time_matrix(&labels);
        let time_dim = file.add_dim("time", times.len());
        let len_dim = file.add_dim("time_len", width);
        file.add_var("time", &[time_dim, len_dim], NcData::Char(bytes))?;
        Some(time_dim)
    } else {
        None
    };

    let cell = |x: f64, y: f64, time: Option<RequestDate>, col: usize| -> f64 {
        wide.index
            .iter()
            .position(|&(ix, iy, it)| ix == x && iy == y && it == time)
            .and_then(|row| wide.values[row][col])
            .unwrap_or(f64::NAN)
    };

    for col in 0..wide.columns.len() {
        let name = match wide.column_name(col) {
            Some(name) => name,
            None => continue,
        };
        let (dims, data) = match time_dims {
            Some(time_dim) => {
                let mut data = Vec::with_capacity(xs.len() * ys.len() * times.len());
                for &x in &xs {
                    for &y in &ys {
                        for &time in &times {
                            data.push(cell(x, y, time, col));
                        }
                    }
                }
                (vec![x_dim, y_dim, time_dim], data)
            }
            None => {
                let mut data = Vec::with_capacity(xs.len() * ys.len());
                for &x in &xs {
                    for &y in &ys {
                        data.push(cell(x, y, None, col));
                    }
                }
                (vec![x_dim, y_dim], data)
            }
        };
        let var = file.add_var(name, &dims, NcData::Double(data))?;
        file.add_var_attr(var, "_FillValue", NcValue::Double(vec![f64::NAN]));
    }

    file.write_to(path)
}
