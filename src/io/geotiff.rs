//! Minimal single-band GeoTIFF reader on top of the `tiff` crate.
//!
//! Georeferencing is taken from ModelPixelScale (33550) + ModelTiepoint (33922);
//! files without those tags decode fine but carry no transform.
use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;

use ndarray::Array2;
use tiff::decoder::{Decoder, DecodingResult};
use tiff::tags::Tag;

use crate::core::raster::GeoTransform;
use crate::error::{Error, Result};

pub const MODEL_PIXEL_SCALE_TAG: u16 = 33550;
pub const MODEL_TIEPOINT_TAG: u16 = 33922;

/// Decoded band plus optional georeferencing.
#[derive(Debug, Clone)]
pub struct GeoBand {
    pub data: Array2<f32>,
    pub transform: Option<GeoTransform>,
}

pub fn read_band<P: AsRef<Path>>(path: P) -> Result<GeoBand> {
    let file = File::open(path.as_ref())?;
    decode_band(BufReader::new(file))
}

pub fn decode_band<R: Read + Seek>(reader: R) -> Result<GeoBand> {
    let mut decoder = Decoder::new(reader)?;
    let (width, height) = decoder.dimensions()?;
    let (rows, cols) = (height as usize, width as usize);

    let values: Vec<f32> = match decoder.read_image()? {
        DecodingResult::U8(buf) => buf.into_iter().map(|v| v as f32).collect(),
        DecodingResult::U16(buf) => buf.into_iter().map(|v| v as f32).collect(),
        DecodingResult::U32(buf) => buf.into_iter().map(|v| v as f32).collect(),
        DecodingResult::I16(buf) => buf.into_iter().map(|v| v as f32).collect(),
        DecodingResult::I32(buf) => buf.into_iter().map(|v| v as f32).collect(),
        DecodingResult::F32(buf) => buf,
        DecodingResult::F64(buf) => buf.into_iter().map(|v| v as f32).collect(),
        _ => {
            return Err(Error::Processing(
                "unsupported TIFF sample format".to_string(),
            ));
        }
    };

    if values.len() != rows * cols {
        return Err(Error::Processing(format!(
            "expected {} single-band samples, decoded {} (multi-band files are not supported)",
            rows * cols,
            values.len()
        )));
    }
    let data = Array2::from_shape_vec((rows, cols), values).map_err(Error::processing)?;
    let transform = read_geotransform(&mut decoder);

    Ok(GeoBand { data, transform })
}

fn read_geotransform<R: Read + Seek>(decoder: &mut Decoder<R>) -> Option<GeoTransform> {
    let scale = decoder
        .get_tag_f64_vec(Tag::Unknown(MODEL_PIXEL_SCALE_TAG))
        .ok()?;
    let tiepoint = decoder.get_tag_f64_vec(Tag::Unknown(MODEL_TIEPOINT_TAG)).ok()?;
    if scale.len() < 2 || tiepoint.len() < 6 {
        return None;
    }
    // tiepoint: [I, J, K, X, Y, Z]
    let origin_x = tiepoint[3] - tiepoint[0] * scale[0];
    let origin_y = tiepoint[4] + tiepoint[1] * scale[1];
    Some(GeoTransform::new(origin_x, origin_y, scale[0], -scale[1]))
}
