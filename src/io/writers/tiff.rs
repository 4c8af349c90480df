use std::fs::File;
use std::io::{BufWriter, Seek, Write};
use std::path::Path;

use ndarray::Array2;
use tiff::encoder::colortype::{Gray8, Gray32Float};
use tiff::encoder::{DirectoryEncoder, TiffEncoder, TiffKind};
use tiff::tags::Tag;

use crate::core::raster::{ClassifiedRaster, GeoTransform};
use crate::error::Result;
use crate::io::geotiff::{MODEL_PIXEL_SCALE_TAG, MODEL_TIEPOINT_TAG};

const GEO_KEY_DIRECTORY_TAG: u16 = 34735;
const GDAL_NODATA_TAG: u16 = 42113;

fn write_geo_tags<W: Write + Seek, K: TiffKind>(
    dir: &mut DirectoryEncoder<'_, W, K>,
    gt: &GeoTransform,
) -> Result<()> {
    let scale = [gt.pixel_width, gt.pixel_height.abs(), 0.0];
    dir.write_tag(Tag::Unknown(MODEL_PIXEL_SCALE_TAG), &scale[..])?;
    let tiepoint = [0.0, 0.0, 0.0, gt.origin_x, gt.origin_y, 0.0];
    dir.write_tag(Tag::Unknown(MODEL_TIEPOINT_TAG), &tiepoint[..])?;
    // Version 1.1.0, 2 keys: projected model, pixel-is-area
    let geokeys: [u16; 12] = [1, 1, 0, 2, 1024, 0, 1, 1, 1025, 0, 1, 1];
    dir.write_tag(Tag::Unknown(GEO_KEY_DIRECTORY_TAG), &geokeys[..])?;
    Ok(())
}

/// Encode a float band (NaN = no data).
pub fn encode_f32<W: Write + Seek>(
    data: &Array2<f32>,
    transform: Option<&GeoTransform>,
    writer: W,
) -> Result<()> {
    let (rows, cols) = data.dim();
    let mut encoder = TiffEncoder::new(writer)?;
    let mut image = encoder.new_image::<Gray32Float>(cols as u32, rows as u32)?;
    if let Some(gt) = transform {
        write_geo_tags(image.encoder(), gt)?;
    }
    let values: Vec<f32> = data.iter().copied().collect();
    image.write_data(&values)?;
    Ok(())
}

/// Encode class ids as 8-bit with `ClassifiedRaster::NODATA` declared as no data.
pub fn encode_classes<W: Write + Seek>(raster: &ClassifiedRaster, writer: W) -> Result<()> {
    let (rows, cols) = raster.grid.shape();
    let mut encoder = TiffEncoder::new(writer)?;
    let mut image = encoder.new_image::<Gray8>(cols as u32, rows as u32)?;
    write_geo_tags(image.encoder(), &raster.grid.transform)?;
    let nodata = ClassifiedRaster::NODATA.to_string();
    image
        .encoder()
        .write_tag(Tag::Unknown(GDAL_NODATA_TAG), nodata.as_str())?;
    let values: Vec<u8> = raster.data.iter().copied().collect();
    image.write_data(&values)?;
    Ok(())
}

pub fn write_tiff_classes(output: &Path, raster: &ClassifiedRaster) -> Result<()> {
    let file = BufWriter::new(File::create(output)?);
    encode_classes(raster, file)
}

pub fn write_tiff_f32(output: &Path, data: &Array2<f32>, transform: &GeoTransform) -> Result<()> {
    let file = BufWriter::new(File::create(output)?);
    encode_f32(data, Some(transform), file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::raster::Grid;
    use crate::io::geotiff::decode_band;
    use std::io::Cursor;

    #[test]
    fn classes_round_trip_as_u8() {
        let grid = Grid::new(GeoTransform::new(0.0, 30.0, 10.0, -10.0), 3, 2);
        let data = Array2::from_shape_vec((3, 2), vec![0u8, 1, 2, 3, 255, 0]).unwrap();
        let raster = ClassifiedRaster { year: 2024, grid, data };
        let mut buf = Vec::new();
        encode_classes(&raster, Cursor::new(&mut buf)).unwrap();
        let band = decode_band(Cursor::new(buf)).unwrap();
        assert_eq!(band.data[[2, 0]], 255.0);
        assert_eq!(band.data[[1, 1]], 3.0);
        assert_eq!(band.transform, Some(grid.transform));
    }
}
