//! Native GeoTIFF reading/writing
//!
//! Uses the `tiff` crate for TIFF I/O. Scene files are six-band GeoTIFFs:
//! either one directory per band (pages in canonical band order) or a single
//! directory with interleaved samples. Georeferencing is read from the
//! ModelPixelScale and ModelTiepoint tags.

use crate::crs::CRS;
use crate::error::{Error, Result};
use crate::raster::{GeoTransform, Raster, RasterElement};
use crate::scene::Scene;
use chrono::NaiveDate;
use std::fs::File;
use std::path::Path;
use tiff::decoder::{Decoder, DecodingResult};
use tiff::encoder::colortype::Gray32Float;
use tiff::encoder::TiffEncoder;
use tiff::tags::Tag;

// GeoTIFF tag ids
const MODEL_PIXEL_SCALE: u16 = 33550;
const MODEL_TIEPOINT: u16 = 33922;
const GEO_KEY_DIRECTORY: u16 = 34735;

// GeoKey ids within the GeoKeyDirectory
const GT_MODEL_TYPE: u16 = 1024;
const GT_RASTER_TYPE: u16 = 1025;
const GEOGRAPHIC_TYPE: u16 = 2048;
const PROJECTED_CS_TYPE: u16 = 3072;

const MODEL_TYPE_PROJECTED: u16 = 1;
const MODEL_TYPE_GEOGRAPHIC: u16 = 2;
const EPSG_USER_DEFINED: u16 = 32767;

/// Read one band of a GeoTIFF file into a Raster.
///
/// `band` selects the TIFF directory (page); `None` reads the first.
pub fn read_geotiff<T, P>(path: P, band: Option<usize>) -> Result<Raster<T>>
where
    T: RasterElement,
    P: AsRef<Path>,
{
    let file = File::open(path.as_ref())?;
    let mut decoder =
        Decoder::new(file).map_err(|e| Error::Other(format!("TIFF decode error: {}", e)))?;

    for _ in 0..band.unwrap_or(0) {
        decoder
            .next_image()
            .map_err(|e| Error::Other(format!("Cannot seek to band: {}", e)))?;
    }

    decode_band(&mut decoder)
}

/// Read a six-band scene file into a `Scene`.
///
/// Bands are expected in canonical order: blue, green, red, NIR, SWIR1,
/// SWIR2. A file with any other band count is rejected. `nodata` marks the
/// sensor's no-data value on every band.
pub fn read_scene<P>(path: P, date: NaiveDate, nodata: Option<f64>) -> Result<Scene>
where
    P: AsRef<Path>,
{
    let file = File::open(path.as_ref())?;
    let mut decoder =
        Decoder::new(file).map_err(|e| Error::Other(format!("TIFF decode error: {}", e)))?;

    let samples = decoder
        .find_tag(Tag::SamplesPerPixel)
        .ok()
        .flatten()
        .and_then(|v| v.into_u16().ok())
        .unwrap_or(1) as usize;

    let bands = if samples > 1 {
        read_interleaved_bands(&mut decoder, samples)?
    } else {
        read_paged_bands(&mut decoder)?
    };

    if bands.len() != Scene::BAND_COUNT {
        return Err(Error::BandCount {
            expected: Scene::BAND_COUNT,
            actual: bands.len(),
        });
    }

    let mut scene = Scene::new(bands, date)?;
    scene.set_nodata(nodata);
    Ok(scene)
}

/// One band per TIFF directory
fn read_paged_bands<R>(decoder: &mut Decoder<R>) -> Result<Vec<Raster<f64>>>
where
    R: std::io::Read + std::io::Seek,
{
    let mut bands = Vec::new();

    loop {
        bands.push(decode_band::<f64, R>(decoder)?);
        if !decoder.more_images() {
            break;
        }
        decoder
            .next_image()
            .map_err(|e| Error::Other(format!("Cannot advance to next band: {}", e)))?;
    }

    Ok(bands)
}

/// All bands in one directory, samples interleaved per pixel
fn read_interleaved_bands<R>(decoder: &mut Decoder<R>, samples: usize) -> Result<Vec<Raster<f64>>>
where
    R: std::io::Read + std::io::Seek,
{
    let (width, height) = decoder
        .dimensions()
        .map_err(|e| Error::Other(format!("Cannot read dimensions: {}", e)))?;
    let rows = height as usize;
    let cols = width as usize;

    let result = decoder
        .read_image()
        .map_err(|e| Error::Other(format!("Cannot read image data: {}", e)))?;
    let interleaved = decoding_result_to_f64(result)?;

    if interleaved.len() != rows * cols * samples {
        return Err(Error::InvalidDimensions {
            width: cols,
            height: rows,
        });
    }

    let transform = read_geotransform(decoder).ok();
    let crs = read_crs(decoder);

    let mut bands = Vec::with_capacity(samples);
    for s in 0..samples {
        let data: Vec<f64> = interleaved[s..].iter().step_by(samples).copied().collect();
        let mut raster = Raster::from_vec(data, rows, cols)?;
        if let Some(t) = transform {
            raster.set_transform(t);
        }
        raster.set_crs(crs.clone());
        bands.push(raster);
    }

    Ok(bands)
}

/// Decode the current TIFF directory into a single-band raster
fn decode_band<T, R>(decoder: &mut Decoder<R>) -> Result<Raster<T>>
where
    T: RasterElement,
    R: std::io::Read + std::io::Seek,
{
    let (width, height) = decoder
        .dimensions()
        .map_err(|e| Error::Other(format!("Cannot read dimensions: {}", e)))?;
    let rows = height as usize;
    let cols = width as usize;

    let result = decoder
        .read_image()
        .map_err(|e| Error::Other(format!("Cannot read image data: {}", e)))?;

    let data: Vec<T> = decoding_result_to_f64(result)?
        .into_iter()
        .map(|v| num_traits::cast(v).unwrap_or(T::default_nodata()))
        .collect();

    if data.len() != rows * cols {
        return Err(Error::InvalidDimensions {
            width: cols,
            height: rows,
        });
    }

    let mut raster = Raster::from_vec(data, rows, cols)?;

    if let Ok(transform) = read_geotransform(decoder) {
        raster.set_transform(transform);
    }
    raster.set_crs(read_crs(decoder));

    Ok(raster)
}

/// Read the CRS from the GeoKeyDirectory tag, if present.
///
/// Only EPSG-coded reference systems are understood: the projected CS key
/// wins over the geographic one, and user-defined codes are ignored.
fn read_crs<R: std::io::Read + std::io::Seek>(decoder: &mut Decoder<R>) -> Option<CRS> {
    let keys = decoder
        .find_tag(Tag::Unknown(GEO_KEY_DIRECTORY))
        .ok()
        .flatten()?
        .into_u16_vec()
        .ok()?;

    // Header of four shorts, then one (id, location, count, value) entry per
    // key; a value is inline only when location is 0
    let mut geographic = None;
    for entry in keys.chunks_exact(4).skip(1) {
        if entry[1] != 0 || entry[3] == EPSG_USER_DEFINED {
            continue;
        }
        match entry[0] {
            PROJECTED_CS_TYPE => return Some(CRS::from_epsg(entry[3] as u32)),
            GEOGRAPHIC_TYPE => geographic = Some(CRS::from_epsg(entry[3] as u32)),
            _ => {}
        }
    }
    geographic
}

fn decoding_result_to_f64(result: DecodingResult) -> Result<Vec<f64>> {
    let data = match result {
        DecodingResult::F32(buf) => buf.iter().map(|&v| v as f64).collect(),
        DecodingResult::F64(buf) => buf,
        DecodingResult::U8(buf) => buf.iter().map(|&v| v as f64).collect(),
        DecodingResult::U16(buf) => buf.iter().map(|&v| v as f64).collect(),
        DecodingResult::U32(buf) => buf.iter().map(|&v| v as f64).collect(),
        DecodingResult::I8(buf) => buf.iter().map(|&v| v as f64).collect(),
        DecodingResult::I16(buf) => buf.iter().map(|&v| v as f64).collect(),
        DecodingResult::I32(buf) => buf.iter().map(|&v| v as f64).collect(),
        _ => {
            return Err(Error::UnsupportedDataType(
                "Unsupported TIFF pixel format".to_string(),
            ))
        }
    };
    Ok(data)
}

/// Attempt to read a GeoTransform from the current directory's tags
fn read_geotransform<R: std::io::Read + std::io::Seek>(
    decoder: &mut Decoder<R>,
) -> Result<GeoTransform> {
    let scale = decoder
        .get_tag_f64_vec(Tag::Unknown(MODEL_PIXEL_SCALE))
        .map_err(|_| Error::Other("No pixel scale tag".into()))?;

    let tiepoint = decoder
        .get_tag_f64_vec(Tag::Unknown(MODEL_TIEPOINT))
        .map_err(|_| Error::Other("No tiepoint tag".into()))?;

    if scale.len() >= 2 && tiepoint.len() >= 6 {
        // tiepoint: [I, J, K, X, Y, Z]; scale: [ScaleX, ScaleY, ScaleZ]
        let origin_x = tiepoint[3] - tiepoint[0] * scale[0];
        let origin_y = tiepoint[4] + tiepoint[1] * scale[1];
        let pixel_width = scale[0];
        let pixel_height = -scale[1]; // Negative for north-up

        return Ok(GeoTransform::new(
            origin_x,
            origin_y,
            pixel_width,
            pixel_height,
        ));
    }

    Err(Error::Other("Cannot determine geotransform".into()))
}

/// Write a single-band Raster to a GeoTIFF file (32-bit float)
pub fn write_geotiff<T, P>(raster: &Raster<T>, path: P) -> Result<()>
where
    T: RasterElement,
    P: AsRef<Path>,
{
    let file = File::create(path.as_ref())?;
    let mut encoder =
        TiffEncoder::new(file).map_err(|e| Error::Other(format!("TIFF encoder error: {}", e)))?;
    encode_band(&mut encoder, raster)
}

/// Write a six-band scene as a multi-page GeoTIFF, one band per directory,
/// in canonical band order.
pub fn write_scene<P>(scene: &Scene, path: P) -> Result<()>
where
    P: AsRef<Path>,
{
    let file = File::create(path.as_ref())?;
    let mut encoder =
        TiffEncoder::new(file).map_err(|e| Error::Other(format!("TIFF encoder error: {}", e)))?;

    for band in scene.bands() {
        encode_band(&mut encoder, band)?;
    }

    Ok(())
}

fn encode_band<T, W>(encoder: &mut TiffEncoder<W>, raster: &Raster<T>) -> Result<()>
where
    T: RasterElement,
    W: std::io::Write + std::io::Seek,
{
    let (rows, cols) = raster.shape();

    let data: Vec<f32> = raster
        .data()
        .iter()
        .map(|&v| num_traits::cast(v).unwrap_or(f32::NAN))
        .collect();

    let mut image = encoder
        .new_image::<Gray32Float>(cols as u32, rows as u32)
        .map_err(|e| Error::Other(format!("Cannot create TIFF image: {}", e)))?;

    let gt = raster.transform();

    let scale = vec![gt.pixel_width, gt.pixel_height.abs(), 0.0];
    image
        .encoder()
        .write_tag(Tag::Unknown(MODEL_PIXEL_SCALE), scale.as_slice())
        .map_err(|e| Error::Other(format!("Cannot write scale tag: {}", e)))?;

    let tiepoint = vec![0.0, 0.0, 0.0, gt.origin_x, gt.origin_y, 0.0];
    image
        .encoder()
        .write_tag(Tag::Unknown(MODEL_TIEPOINT), tiepoint.as_slice())
        .map_err(|e| Error::Other(format!("Cannot write tiepoint tag: {}", e)))?;

    // GeoKey directory: model type, pixel-is-area raster, and the EPSG code
    // when the raster carries one. Geographic systems live in the 4000-4999
    // EPSG block; everything else is written as projected.
    let epsg = raster.crs().and_then(|c| c.epsg());
    let geographic = epsg.is_some_and(|code| (4000..5000).contains(&code));
    let model_type = if geographic {
        MODEL_TYPE_GEOGRAPHIC
    } else {
        MODEL_TYPE_PROJECTED
    };

    let key_count = if epsg.is_some() { 3 } else { 2 };
    let mut geokeys: Vec<u16> = vec![
        1, 1, 0, key_count, // Version 1.1.0
        GT_MODEL_TYPE, 0, 1, model_type,
        GT_RASTER_TYPE, 0, 1, 1, // RasterPixelIsArea
    ];
    if let Some(code) = epsg {
        let key = if geographic {
            GEOGRAPHIC_TYPE
        } else {
            PROJECTED_CS_TYPE
        };
        geokeys.extend_from_slice(&[key, 0, 1, code as u16]);
    }
    image
        .encoder()
        .write_tag(Tag::Unknown(GEO_KEY_DIRECTORY), geokeys.as_slice())
        .map_err(|e| Error::Other(format!("Cannot write geokey tag: {}", e)))?;

    image
        .write_data(&data)
        .map_err(|e| Error::Other(format!("Cannot write image data: {}", e)))?;

    Ok(())
}
