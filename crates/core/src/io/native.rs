//! Native GeoTIFF reading/writing
//!
//! Uses the `tiff` crate. Georeferencing is read from ModelPixelScale +
//! ModelTiepoint, and the CRS from the EPSG code stored in the GeoKey
//! directory.

use crate::crs::CRS;
use crate::error::{Error, Result};
use crate::raster::{GeoTransform, Raster, RasterElement};
use std::fs::File;
use std::io::{BufReader, BufWriter, Cursor};
use std::path::Path;
use tiff::decoder::{Decoder, DecodingResult};
use tiff::encoder::colortype::Gray32Float;
use tiff::encoder::compression::{Compression as TiffCodec, Deflate, Lzw, Uncompressed};
use tiff::encoder::TiffEncoder;
use tiff::tags::Tag;

const MODEL_PIXEL_SCALE_TAG: u16 = 33550;
const MODEL_TIEPOINT_TAG: u16 = 33922;
const GEO_KEY_DIRECTORY_TAG: u16 = 34735;

const GT_MODEL_TYPE_KEY: u16 = 1024;
const GT_RASTER_TYPE_KEY: u16 = 1025;
const GEOGRAPHIC_TYPE_KEY: u16 = 2048;
const PROJECTED_CS_TYPE_KEY: u16 = 3072;
const USER_DEFINED: u16 = 32767;

/// Sample compression for written GeoTIFFs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Compression {
    #[default]
    None,
    Lzw,
    Deflate,
}

impl std::str::FromStr for Compression {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(Compression::None),
            "lzw" => Ok(Compression::Lzw),
            "deflate" => Ok(Compression::Deflate),
            other => Err(Error::InvalidParameter {
                name: "compression",
                value: other.to_string(),
                reason: "expected none, lzw or deflate".into(),
            }),
        }
    }
}

/// Options for writing GeoTIFF files
#[derive(Debug, Clone, Default)]
pub struct GeoTiffOptions {
    pub compression: Compression,
}

/// Read the first band of a GeoTIFF file into a Raster
pub fn read_geotiff<T, P>(path: P) -> Result<Raster<T>>
where
    T: RasterElement,
    P: AsRef<Path>,
{
    let file = File::open(path.as_ref())?;
    decode_geotiff(BufReader::new(file))
}

/// Read a GeoTIFF from an in-memory buffer into a Raster
pub fn read_geotiff_from_buffer<T>(data: &[u8]) -> Result<Raster<T>>
where
    T: RasterElement,
{
    decode_geotiff(Cursor::new(data))
}

fn cast_all<S, T>(buf: Vec<S>) -> Vec<T>
where
    S: num_traits::NumCast + Copy,
    T: RasterElement,
{
    buf.into_iter()
        .map(|v| num_traits::cast(v).unwrap_or(T::default_nodata()))
        .collect()
}

fn decode_geotiff<T, R>(reader: R) -> Result<Raster<T>>
where
    T: RasterElement,
    R: std::io::Read + std::io::Seek,
{
    let mut decoder =
        Decoder::new(reader).map_err(|e| Error::Other(format!("TIFF decode error: {}", e)))?;

    let (width, height) = decoder
        .dimensions()
        .map_err(|e| Error::Other(format!("Cannot read dimensions: {}", e)))?;

    let rows = height as usize;
    let cols = width as usize;

    let result = decoder
        .read_image()
        .map_err(|e| Error::Other(format!("Cannot read image data: {}", e)))?;

    let data: Vec<T> = match result {
        DecodingResult::U8(buf) => cast_all(buf),
        DecodingResult::U16(buf) => cast_all(buf),
        DecodingResult::U32(buf) => cast_all(buf),
        DecodingResult::I8(buf) => cast_all(buf),
        DecodingResult::I16(buf) => cast_all(buf),
        DecodingResult::I32(buf) => cast_all(buf),
        DecodingResult::F32(buf) => cast_all(buf),
        DecodingResult::F64(buf) => cast_all(buf),
        _ => {
            return Err(Error::UnsupportedDataType(
                "Unsupported TIFF pixel format".to_string(),
            ))
        }
    };

    // Multi-band images are interleaved; keep the first band only
    let data: Vec<T> = if data.len() > rows * cols && rows * cols > 0 && data.len() % (rows * cols) == 0 {
        let bands = data.len() / (rows * cols);
        data.into_iter().step_by(bands).collect()
    } else {
        data
    };

    let mut raster = Raster::from_vec(data, rows, cols)?;

    if let Ok(transform) = read_geotransform(&mut decoder) {
        raster.set_transform(transform);
    }
    raster.set_crs(read_crs(&mut decoder));

    Ok(raster)
}

fn read_geotransform<R: std::io::Read + std::io::Seek>(
    decoder: &mut Decoder<R>,
) -> Result<GeoTransform> {
    let scale = decoder
        .get_tag_f64_vec(Tag::from_u16_exhaustive(MODEL_PIXEL_SCALE_TAG))
        .map_err(|_| Error::Other("No pixel scale tag".into()))?;

    let tiepoint = decoder
        .get_tag_f64_vec(Tag::from_u16_exhaustive(MODEL_TIEPOINT_TAG))
        .map_err(|_| Error::Other("No tiepoint tag".into()))?;

    if scale.len() >= 2 && tiepoint.len() >= 6 {
        // tiepoint: [I, J, K, X, Y, Z]
        let origin_x = tiepoint[3] - tiepoint[0] * scale[0];
        let origin_y = tiepoint[4] + tiepoint[1] * scale[1];
        return Ok(GeoTransform::new(origin_x, origin_y, scale[0], -scale[1]));
    }

    Err(Error::Other("Cannot determine geotransform".into()))
}

/// EPSG code from the GeoKey directory, preferring the projected CRS key
fn read_crs<R: std::io::Read + std::io::Seek>(decoder: &mut Decoder<R>) -> Option<CRS> {
    let keys = decoder
        .get_tag_u16_vec(Tag::from_u16_exhaustive(GEO_KEY_DIRECTORY_TAG))
        .ok()?;
    epsg_from_geokeys(&keys).map(|code| CRS::from_epsg(code as u32))
}

fn epsg_from_geokeys(keys: &[u16]) -> Option<u16> {
    if keys.len() < 4 {
        return None;
    }
    let count = keys[3] as usize;
    let entries: Vec<&[u16]> = keys[4..].chunks_exact(4).take(count).collect();

    // Only inline SHORT values (location 0) can hold an EPSG code
    let lookup = |id: u16| {
        entries
            .iter()
            .find(|e| e[0] == id && e[1] == 0)
            .map(|e| e[3])
            .filter(|&code| code != 0 && code != USER_DEFINED)
    };

    lookup(PROJECTED_CS_TYPE_KEY).or_else(|| lookup(GEOGRAPHIC_TYPE_KEY))
}

fn geokeys_for(crs: Option<&CRS>) -> Vec<u16> {
    let code = crs
        .and_then(CRS::epsg)
        .and_then(|c| u16::try_from(c).ok());

    match code {
        // EPSG allocates geographic 2D systems in the 4000 block
        Some(code) if (4000..5000).contains(&code) => vec![
            1, 1, 0, 3,
            GT_MODEL_TYPE_KEY, 0, 1, 2,
            GT_RASTER_TYPE_KEY, 0, 1, 1,
            GEOGRAPHIC_TYPE_KEY, 0, 1, code,
        ],
        Some(code) => vec![
            1, 1, 0, 3,
            GT_MODEL_TYPE_KEY, 0, 1, 1,
            GT_RASTER_TYPE_KEY, 0, 1, 1,
            PROJECTED_CS_TYPE_KEY, 0, 1, code,
        ],
        None => vec![
            1, 1, 0, 2,
            GT_MODEL_TYPE_KEY, 0, 1, 1,
            GT_RASTER_TYPE_KEY, 0, 1, 1,
        ],
    }
}

/// Write a Raster to a GeoTIFF file (32-bit float samples)
pub fn write_geotiff<T, P>(raster: &Raster<T>, path: P, options: Option<GeoTiffOptions>) -> Result<()>
where
    T: RasterElement,
    P: AsRef<Path>,
{
    let file = File::create(path.as_ref())?;
    encode_geotiff(raster, BufWriter::new(file), &options.unwrap_or_default())
}

/// Write a Raster to an in-memory GeoTIFF buffer
pub fn write_geotiff_to_buffer<T>(raster: &Raster<T>, options: Option<GeoTiffOptions>) -> Result<Vec<u8>>
where
    T: RasterElement,
{
    let mut buf = Vec::new();
    encode_geotiff(raster, Cursor::new(&mut buf), &options.unwrap_or_default())?;
    Ok(buf)
}

fn encode_geotiff<T, W>(raster: &Raster<T>, writer: W, options: &GeoTiffOptions) -> Result<()>
where
    T: RasterElement,
    W: std::io::Write + std::io::Seek,
{
    let mut encoder =
        TiffEncoder::new(writer).map_err(|e| Error::Other(format!("TIFF encoder error: {}", e)))?;

    let data: Vec<f32> = raster
        .data()
        .iter()
        .map(|&v| num_traits::cast(v).unwrap_or(f32::NAN))
        .collect();

    match options.compression {
        Compression::None => write_image(&mut encoder, raster, &data, Uncompressed),
        Compression::Lzw => write_image(&mut encoder, raster, &data, Lzw),
        Compression::Deflate => write_image(&mut encoder, raster, &data, Deflate::default()),
    }
}

fn write_image<T, W, D>(
    encoder: &mut TiffEncoder<W>,
    raster: &Raster<T>,
    data: &[f32],
    codec: D,
) -> Result<()>
where
    T: RasterElement,
    W: std::io::Write + std::io::Seek,
    D: TiffCodec,
{
    let (rows, cols) = raster.shape();
    let mut image = encoder
        .new_image_with_compression::<Gray32Float, D>(cols as u32, rows as u32, codec)
        .map_err(|e| Error::Other(format!("Cannot create TIFF image: {}", e)))?;

    let gt = raster.transform();

    let scale = [gt.pixel_width, gt.pixel_height.abs(), 0.0];
    image
        .encoder()
        .write_tag(Tag::Unknown(MODEL_PIXEL_SCALE_TAG), &scale[..])
        .map_err(|e| Error::Other(format!("Cannot write scale tag: {}", e)))?;

    let tiepoint = [0.0, 0.0, 0.0, gt.origin_x, gt.origin_y, 0.0];
    image
        .encoder()
        .write_tag(Tag::Unknown(MODEL_TIEPOINT_TAG), &tiepoint[..])
        .map_err(|e| Error::Other(format!("Cannot write tiepoint tag: {}", e)))?;

    let geokeys = geokeys_for(raster.crs());
    image
        .encoder()
        .write_tag(Tag::Unknown(GEO_KEY_DIRECTORY_TAG), geokeys.as_slice())
        .map_err(|e| Error::Other(format!("Cannot write geokey tag: {}", e)))?;

    image
        .write_data(data)
        .map_err(|e| Error::Other(format!("Cannot write image data: {}", e)))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_geokeys_roundtrip_projected() {
        let keys = geokeys_for(Some(&CRS::from_epsg(32610)));
        assert_eq!(epsg_from_geokeys(&keys), Some(32610));
    }

    #[test]
    fn test_geokeys_roundtrip_geographic() {
        let keys = geokeys_for(Some(&CRS::from_epsg(4326)));
        assert_eq!(epsg_from_geokeys(&keys), Some(4326));
    }

    #[test]
    fn test_geokeys_without_crs() {
        assert_eq!(epsg_from_geokeys(&geokeys_for(None)), None);
        assert_eq!(epsg_from_geokeys(&[1, 1, 0]), None);
    }

    #[test]
    fn test_buffer_roundtrip_keeps_classes_and_crs() {
        let mut raster = Raster::<u8>::from_vec(vec![0, 1, 255, 1, 0, 255], 2, 3).unwrap();
        raster.set_transform(GeoTransform::new(500_000.0, 5_400_000.0, 10.0, -10.0));
        raster.set_crs(Some(CRS::from_epsg(32610)));

        let bytes = write_geotiff_to_buffer(&raster, None).unwrap();
        let back: Raster<u8> = read_geotiff_from_buffer(&bytes).unwrap();

        assert_eq!(back.shape(), (2, 3));
        assert_eq!(back.data(), raster.data());
        assert_eq!(back.transform(), raster.transform());
        assert_eq!(back.crs().and_then(CRS::epsg), Some(32610));
    }

    #[test]
    fn test_file_roundtrip() {
        let mut raster = Raster::<u8>::filled(4, 4, 1);
        raster.set_crs(Some(CRS::from_epsg(26910)));
        let tmp = tempfile::NamedTempFile::new().unwrap();

        write_geotiff(&raster, tmp.path(), Some(GeoTiffOptions::default())).unwrap();
        let back: Raster<u8> = read_geotiff(tmp.path()).unwrap();
        assert_eq!(back.data(), raster.data());
        assert_eq!(back.crs().and_then(CRS::epsg), Some(26910));
    }

    #[test]
    fn test_compressed_roundtrip() {
        let data: Vec<u8> = (0..64 * 64).map(|i| [0, 1, 255][(i / 97) % 3]).collect();
        let mut raster = Raster::<u8>::from_vec(data, 64, 64).unwrap();
        raster.set_crs(Some(CRS::from_epsg(32610)));

        let plain = write_geotiff_to_buffer(&raster, None).unwrap();
        for compression in [Compression::Lzw, Compression::Deflate] {
            let bytes =
                write_geotiff_to_buffer(&raster, Some(GeoTiffOptions { compression })).unwrap();
            assert!(bytes.len() < plain.len(), "{:?}", compression);

            let back: Raster<u8> = read_geotiff_from_buffer(&bytes).unwrap();
            assert_eq!(back.data(), raster.data());
            assert_eq!(back.crs().and_then(CRS::epsg), Some(32610));
        }
    }

    #[test]
    fn test_parse_compression() {
        assert_eq!("LZW".parse::<Compression>().unwrap(), Compression::Lzw);
        assert_eq!("deflate".parse::<Compression>().unwrap(), Compression::Deflate);
        assert_eq!("none".parse::<Compression>().unwrap(), Compression::None);
        assert!("jpeg".parse::<Compression>().is_err());
    }
}
