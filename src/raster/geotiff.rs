use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use ndarray::Array2;
use tiff::decoder::{Decoder, DecodingResult, Limits};
use tiff::tags::Tag;
use tiff::ColorType;

use crate::error::{Error, Result};
use crate::raster::{GeoTransform, Raster};

const MODEL_PIXEL_SCALE: u16 = 33550;
const MODEL_TIEPOINT: u16 = 33922;
const MODEL_TRANSFORMATION: u16 = 34264;
const GEO_KEY_DIRECTORY: u16 = 34735;
const GDAL_NODATA: u16 = 42113;

const GT_RASTER_TYPE_KEY: u16 = 1025;
const GEOGRAPHIC_TYPE_KEY: u16 = 2048;
const PROJECTED_CS_TYPE_KEY: u16 = 3072;
const RASTER_PIXEL_IS_POINT: u16 = 2;
const USER_DEFINED: u16 = 32767;

/// GeoKey values stored inline in the directory, keyed by GeoKey id.
fn inline_geokey(keys: &[u16], key_id: u16) -> Option<u16> {
    // Header: version, revision, minor revision, number of keys; then 4 shorts per key.
    let count = *keys.get(3)? as usize;
    keys.get(4..4 + count * 4)?
        .chunks_exact(4)
        .find(|entry| entry[0] == key_id && entry[1] == 0)
        .map(|entry| entry[3])
}

/// EPSG code from a GeoKey directory: projected CRS first, then geographic.
pub(crate) fn epsg_from_geokeys(keys: &[u16]) -> Option<u32> {
    [PROJECTED_CS_TYPE_KEY, GEOGRAPHIC_TYPE_KEY].into_iter()
        .filter_map(|key| inline_geokey(keys, key))
        .find(|&code| code != 0 && code != USER_DEFINED)
        .map(u32::from)
}

/// Read band 1 of a single-band GeoTIFF with its georeferencing, CRS and nodata value.
pub fn read_geotiff(path: &Path) -> Result<Raster> {
    let invalid = |reason: String| Error::InvalidRaster { path: path.to_path_buf(), reason };

    let file = File::open(path)?;
    let mut decoder = Decoder::new(BufReader::new(file))
        .map_err(|e| invalid(format!("not a TIFF: {e}")))?
        .with_limits(Limits::unlimited());

    let (width, height) = decoder.dimensions().map_err(|e| invalid(e.to_string()))?;
    match decoder.colortype().map_err(|e| invalid(e.to_string()))? {
        ColorType::Gray(_) => {}
        other => return Err(invalid(format!("expected a single-band grid, found {other:?}"))),
    }

    let geokeys = decoder.get_tag_u16_vec(Tag::from_u16_exhaustive(GEO_KEY_DIRECTORY)).ok();
    let pixel_is_point = geokeys.as_deref()
        .and_then(|keys| inline_geokey(keys, GT_RASTER_TYPE_KEY))
        == Some(RASTER_PIXEL_IS_POINT);

    let scale = decoder.get_tag_f64_vec(Tag::from_u16_exhaustive(MODEL_PIXEL_SCALE)).ok();
    let tiepoint = decoder.get_tag_f64_vec(Tag::from_u16_exhaustive(MODEL_TIEPOINT)).ok();
    let mut transform = match (scale, tiepoint) {
        (Some(s), Some(t)) if s.len() >= 2 && t.len() >= 6 => {
            // Tiepoint (i, j) -> (x, y): origin = x - i * sx, y + j * sy.
            GeoTransform::new(t[3] - t[0] * s[0], t[4] + t[1] * s[1], s[0], -s[1])
        }
        _ => {
            let m = decoder.get_tag_f64_vec(Tag::from_u16_exhaustive(MODEL_TRANSFORMATION))
                .map_err(|_| invalid("no georeferencing tags".to_string()))?;
            if m.len() < 16 || m[1] != 0.0 || m[4] != 0.0 {
                return Err(invalid("rotated or malformed model transformation".to_string()));
            }
            GeoTransform::new(m[3], m[7], m[0], m[5])
        }
    };
    if pixel_is_point {
        transform.origin_x -= transform.pixel_width / 2.0;
        transform.origin_y -= transform.pixel_height / 2.0;
    }

    let epsg = geokeys.as_deref().and_then(epsg_from_geokeys);
    let nodata = decoder.get_tag_ascii_string(Tag::from_u16_exhaustive(GDAL_NODATA)).ok()
        .and_then(|s| s.trim_matches(|c: char| c.is_whitespace() || c == '\0').parse::<f64>().ok());

    let values: Vec<f64> = match decoder.read_image().map_err(|e| invalid(e.to_string()))? {
        DecodingResult::U8(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::U16(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::U32(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::U64(v) => v.into_iter().map(|x| x as f64).collect(),
        DecodingResult::I8(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::I16(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::I32(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::I64(v) => v.into_iter().map(|x| x as f64).collect(),
        DecodingResult::F32(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::F64(v) => v,
        #[allow(unreachable_patterns)]
        _ => return Err(invalid("unsupported sample format".to_string())),
    };

    let data = Array2::from_shape_vec((height as usize, width as usize), values)
        .map_err(|e| invalid(format!("pixel count does not match {width}x{height}: {e}")))?;

    let raster = Raster::new(data, transform, nodata);
    Ok(match epsg { Some(code) => raster.with_epsg(code), None => raster })
}
