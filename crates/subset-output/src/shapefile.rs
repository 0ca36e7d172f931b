//! ESRI point shapefile encoding for point deliveries.
//!
//! A shapefile is a sibling set: `.shp` holds geometry, `.shx` the
//! record index, `.dbf` the attribute table (dBASE III). One record is
//! written per observation, with dataset, variable, time, and value as
//! attributes and the sample location as the point geometry.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{Datelike, Utc};

use crate::error::Result;
use crate::results::PointTable;

const SHAPE_POINT: i32 = 1;

// Attribute field widths.
const DATASET_LEN: usize = 32;
const VARIABLE_LEN: usize = 32;
const TIME_LEN: usize = 10;
const VALUE_LEN: usize = 24;
const VALUE_DECIMALS: u8 = 8;

// Per record: 8-byte record header, then shape type and one coordinate
// pair.
const SHP_RECORD_LEN: usize = 8 + 4 + 16;

/// Write `table` as a point shapefile under `dir`. Returns the sibling
/// paths produced, `.shp` first.
pub fn write_shapefile(dir: &Path, base: &str, table: &PointTable) -> Result<Vec<PathBuf>> {
    let shp_path = dir.join(format!("{}.shp", base));
    let shx_path = dir.join(format!("{}.shx", base));
    let dbf_path = dir.join(format!("{}.dbf", base));

    let bbox = bounding_box(table);

    let mut shp = file_header(100 + table.len() * SHP_RECORD_LEN, bbox);
    let mut shx = file_header(100 + table.len() * 8, bbox);
    let mut offset_words = 50;
    for (i, rec) in table.records.iter().enumerate() {
        shp.extend_from_slice(&(i as i32 + 1).to_be_bytes());
        shp.extend_from_slice(&10i32.to_be_bytes()); // content length in words
        shp.extend_from_slice(&SHAPE_POINT.to_le_bytes());
        shp.extend_from_slice(&rec.x.to_le_bytes());
        shp.extend_from_slice(&rec.y.to_le_bytes());

        shx.extend_from_slice(&(offset_words as i32).to_be_bytes());
        shx.extend_from_slice(&10i32.to_be_bytes());
        offset_words += SHP_RECORD_LEN / 2;
    }

    fs::write(&shp_path, shp)?;
    fs::write(&shx_path, shx)?;
    fs::write(&dbf_path, attribute_table(table))?;

    Ok(vec![shp_path, shx_path, dbf_path])
}

fn bounding_box(table: &PointTable) -> [f64; 4] {
    let mut bbox = [0.0; 4];
    for (i, rec) in table.records.iter().enumerate() {
        if i == 0 {
            bbox = [rec.x, rec.y, rec.x, rec.y];
        } else {
            bbox[0] = bbox[0].min(rec.x);
            bbox[1] = bbox[1].min(rec.y);
            bbox[2] = bbox[2].max(rec.x);
            bbox[3] = bbox[3].max(rec.y);
        }
    }
    bbox
}

// The 100-byte header shared by .shp and .shx.
fn file_header(total_bytes: usize, bbox: [f64; 4]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(total_bytes);
    buf.extend_from_slice(&9994i32.to_be_bytes());
    buf.extend_from_slice(&[0u8; 20]);
    buf.extend_from_slice(&((total_bytes / 2) as i32).to_be_bytes());
    buf.extend_from_slice(&1000i32.to_le_bytes());
    buf.extend_from_slice(&SHAPE_POINT.to_le_bytes());
    for v in bbox {
        buf.extend_from_slice(&v.to_le_bytes());
    }
    // z and m ranges, unused for plain points.
    buf.extend_from_slice(&[0u8; 32]);
    buf
}

fn attribute_table(table: &PointTable) -> Vec<u8> {
    let fields: [(&str, u8, usize, u8); 4] = [
        ("dataset", b'C', DATASET_LEN, 0),
        ("variable", b'C', VARIABLE_LEN, 0),
        ("time", b'C', TIME_LEN, 0),
        ("value", b'N', VALUE_LEN, VALUE_DECIMALS),
    ];
    let header_len = 32 + 32 * fields.len() + 1;
    let record_len = 1 + fields.iter().map(|f| f.2).sum::<usize>();

    let mut buf = Vec::with_capacity(header_len + table.len() * record_len + 1);
    let today = Utc::now().date_naive();
    buf.push(0x03);
    buf.push((today.year() - 1900) as u8);
    buf.push(today.month() as u8);
    buf.push(today.day() as u8);
    buf.extend_from_slice(&(table.len() as u32).to_le_bytes());
    buf.extend_from_slice(&(header_len as u16).to_le_bytes());
    buf.extend_from_slice(&(record_len as u16).to_le_bytes());
    buf.resize(32, 0);

    for (name, kind, len, decimals) in fields {
        let start = buf.len();
        buf.extend_from_slice(name.as_bytes());
        buf.resize(start + 11, 0);
        buf.push(kind);
        buf.extend_from_slice(&[0u8; 4]);
        buf.push(len as u8);
        buf.push(decimals);
        buf.resize(start + 32, 0);
    }
    buf.push(0x0D);

    for rec in &table.records {
        buf.push(b' '); // not deleted
        char_field(&mut buf, &rec.dataset, DATASET_LEN);
        char_field(&mut buf, &rec.variable, VARIABLE_LEN);
        let time = rec.time.map(|d| d.to_string()).unwrap_or_default();
        char_field(&mut buf, &time, TIME_LEN);
        numeric_field(&mut buf, rec.value, VALUE_LEN);
    }
    buf.push(0x1A);
    buf
}

// Left-justified, space-padded, truncated to the field width.
fn char_field(buf: &mut Vec<u8>, value: &str, len: usize) {
    let bytes = value.as_bytes();
    let n = bytes.len().min(len);
    buf.extend_from_slice(&bytes[..n]);
    buf.resize(buf.len() + (len - n), b' ');
}

// Right-justified. NaN is written as blanks, the dBASE null.
fn numeric_field(buf: &mut Vec<u8>, value: f64, len: usize) {
    if value.is_nan() {
        buf.resize(buf.len() + len, b' ');
        return;
    }
    let mut text = format!("{:.*}", VALUE_DECIMALS as usize, value);
    if text.len() > len {
        text = format!("{:.6e}", value);
    }
    let bytes = text.as_bytes();
    let n = bytes.len().min(len);
    buf.resize(buf.len() + (len - n), b' ');
    buf.extend_from_slice(&bytes[..n]);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::results::PointRecord;
    use subset_common::RequestDate;

    fn sample_table() -> PointTable {
        let mut table = PointTable::new();
        for (x, y, value) in [(-104.5, 39.0, 12.25), (-104.0, 39.5, f64::NAN)] {
            table.push(PointRecord {
                dataset: "prism".to_string(),
                variable: "ppt".to_string(),
                x,
                y,
                time: Some(RequestDate::daily(2020, 6, 15)),
                value,
            });
        }
        table
    }

    #[test]
    fn test_sibling_files_and_geometry() {
        let dir = tempfile::tempdir().unwrap();
        let paths = write_shapefile(dir.path(), "prism", &sample_table()).unwrap();
        assert_eq!(paths.len(), 3);
        assert!(paths[0].ends_with("prism.shp"));
        assert!(paths[1].ends_with("prism.shx"));
        assert!(paths[2].ends_with("prism.dbf"));

        let shp = fs::read(&paths[0]).unwrap();
        assert_eq!(&shp[..4], &9994i32.to_be_bytes());
        assert_eq!(&shp[28..32], &1000i32.to_le_bytes());
        assert_eq!(&shp[32..36], &1i32.to_le_bytes());
        // File length is in 16-bit words.
        let words = i32::from_be_bytes(shp[24..28].try_into().unwrap());
        assert_eq!(words as usize * 2, shp.len());
        // First record: number 1, then the point after the shape type.
        assert_eq!(&shp[100..104], &1i32.to_be_bytes());
        let x = f64::from_le_bytes(shp[112..120].try_into().unwrap());
        assert_eq!(x, -104.5);

        let shx = fs::read(&paths[1]).unwrap();
        assert_eq!(shx.len(), 100 + 8 * 2);
        assert_eq!(&shx[100..104], &50i32.to_be_bytes());
        assert_eq!(&shx[108..112], &64i32.to_be_bytes());
    }

    #[test]
    fn test_attribute_table() {
        let dir = tempfile::tempdir().unwrap();
        let paths = write_shapefile(dir.path(), "prism", &sample_table()).unwrap();

        let dbf = fs::read(&paths[2]).unwrap();
        assert_eq!(dbf[0], 0x03);
        assert_eq!(u32::from_le_bytes(dbf[4..8].try_into().unwrap()), 2);
        let header_len = u16::from_le_bytes(dbf[8..10].try_into().unwrap()) as usize;
        let record_len = u16::from_le_bytes(dbf[10..12].try_into().unwrap()) as usize;
        assert_eq!(header_len, 32 + 32 * 4 + 1);
        assert_eq!(record_len, 1 + 32 + 32 + 10 + 24);
        assert_eq!(dbf[header_len - 1], 0x0D);
        assert_eq!(dbf[dbf.len() - 1], 0x1A);
        assert_eq!(dbf.len(), header_len + 2 * record_len + 1);

        let first = &dbf[header_len..header_len + record_len];
        assert_eq!(first[0], b' ');
        assert!(first[1..33].starts_with(b"prism"));
        assert!(first[33..65].starts_with(b"ppt"));
        assert!(first[65..75].starts_with(b"2020-06-15"));
        let value: String = String::from_utf8_lossy(&first[75..99]).trim().to_string();
        assert_eq!(value, "12.25000000");

        // NaN value is stored as blanks.
        let second = &dbf[header_len + record_len..header_len + 2 * record_len];
        assert!(second[75..99].iter().all(|&b| b == b' '));
    }
}
