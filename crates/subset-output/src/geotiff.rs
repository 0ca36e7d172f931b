//! Single-band GeoTIFF encoding for raster deliveries.
//!
//! Each layer becomes one 32-bit float grayscale image with
//! ModelPixelScale and ModelTiepoint tags for georeferencing, a GeoKey
//! directory carrying the CRS, and a GDAL nodata marker for NaN cells.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use tiff::encoder::{colortype, TiffEncoder};
use tiff::tags::Tag;

use subset_common::Crs;

use crate::error::{OutputError, Result};
use crate::results::Grid;

// GeoKey ids within the GeoKeyDirectory tag.
const GT_MODEL_TYPE: u16 = 1024;
const GT_RASTER_TYPE: u16 = 1025;
const GT_CITATION: u16 = 1026;
const GEOGRAPHIC_TYPE: u16 = 2048;
const PROJECTED_CS_TYPE: u16 = 3072;

// GTModelType values.
const MODEL_PROJECTED: u16 = 1;
const MODEL_GEOGRAPHIC: u16 = 2;
const MODEL_USER_DEFINED: u16 = 32767;

// GTRasterType: RasterPixelIsArea, matching the corner-anchored origin.
const RASTER_PIXEL_IS_AREA: u16 = 1;

/// Write one grid as a single-band 32-bit float GeoTIFF.
pub fn write_geotiff(path: &Path, grid: &Grid, crs: &Crs) -> Result<()> {
    if !grid.shape_is_consistent() {
        return Err(OutputError::grid_shape(format!(
            "{}x{} grid with {} values",
            grid.width,
            grid.height,
            grid.values.len(),
        )));
    }

    let file = BufWriter::new(File::create(path)?);
    let mut encoder = TiffEncoder::new(file)?;
    let mut image =
        encoder.new_image::<colortype::Gray32Float>(grid.width as u32, grid.height as u32)?;

    // Geotransform: tie raster (0, 0) to the top-left corner and record
    // the cell size. Row order in `values` is top-down, matching the
    // negative y step this implies.
    image.encoder().write_tag(
        Tag::ModelPixelScaleTag,
        &[grid.pixel_size_x, grid.pixel_size_y, 0.0][..],
    )?;
    image.encoder().write_tag(
        Tag::ModelTiepointTag,
        &[0.0, 0.0, 0.0, grid.origin_x, grid.origin_y, 0.0][..],
    )?;

    let citation = crs.as_str();
    let model_type = match crs.epsg() {
        Some(_) if crs.is_geographic() => MODEL_GEOGRAPHIC,
        Some(_) => MODEL_PROJECTED,
        None => MODEL_USER_DEFINED,
    };

    let mut keys: Vec<[u16; 4]> = vec![
        [GT_MODEL_TYPE, 0, 1, model_type],
        [GT_RASTER_TYPE, 0, 1, RASTER_PIXEL_IS_AREA],
        [
            GT_CITATION,
            Tag::GeoAsciiParamsTag.to_u16(),
            citation.len() as u16 + 1,
            0,
        ],
    ];
    // GeoKey values are SHORTs; codes that do not fit stay citation-only.
    if let Some(epsg) = crs.epsg().filter(|&code| code <= u16::MAX as u32) {
        let key = if crs.is_geographic() {
            GEOGRAPHIC_TYPE
        } else {
            PROJECTED_CS_TYPE
        };
        keys.push([key, 0, 1, epsg as u16]);
    }

    // Directory header: key revision 1.1.0 followed by the key count.
    let mut directory = vec![1u16, 1, 0, keys.len() as u16];
    for key in &keys {
        directory.extend_from_slice(key);
    }
    image
        .encoder()
        .write_tag(Tag::GeoKeyDirectoryTag, &directory[..])?;
    image
        .encoder()
        .write_tag(Tag::GeoAsciiParamsTag, format!("{}|", citation).as_str())?;
    image.encoder().write_tag(Tag::GdalNodata, "nan")?;

    image.write_data(&grid.values)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::results::Grid;
    use tiff::decoder::{Decoder, DecodingResult};

    fn sample_grid() -> Grid {
        Grid::new(
            vec![1.5, 2.5, f32::NAN, 4.5, 5.5, 6.5],
            3,
            2,
            -104.0,
            41.0,
            0.25,
            0.25,
        )
    }

    #[test]
    fn test_round_trip_values_and_georeferencing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prism_ppt_2020.tif");
        let crs = Crs::parse("EPSG:4326").unwrap();

        write_geotiff(&path, &sample_grid(), &crs).unwrap();

        let mut decoder = Decoder::new(File::open(&path).unwrap()).unwrap();
        assert_eq!(decoder.dimensions().unwrap(), (3, 2));

        let scale = decoder.get_tag_f64_vec(Tag::ModelPixelScaleTag).unwrap();
        assert_eq!(scale, vec![0.25, 0.25, 0.0]);
        let tiepoint = decoder.get_tag_f64_vec(Tag::ModelTiepointTag).unwrap();
        assert_eq!(tiepoint, vec![0.0, 0.0, 0.0, -104.0, 41.0, 0.0]);
        let citation = decoder.get_tag_ascii_string(Tag::GeoAsciiParamsTag).unwrap();
        assert!(citation.contains("EPSG:4326"));

        match decoder.read_image().unwrap() {
            DecodingResult::F32(data) => {
                assert_eq!(data.len(), 6);
                assert_eq!(data[0], 1.5);
                assert!(data[2].is_nan());
                assert_eq!(data[5], 6.5);
            }
            other => panic!("unexpected decoding result: {:?}", other),
        }
    }

    #[test]
    fn test_inconsistent_grid_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.tif");
        let crs = Crs::parse("EPSG:5070").unwrap();
        let mut grid = sample_grid();
        grid.values.pop();

        let err = write_geotiff(&path, &grid, &crs).unwrap_err();
        assert!(matches!(err, OutputError::GridShape(_)));
    }
}
