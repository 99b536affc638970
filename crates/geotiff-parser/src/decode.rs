//! Raw raster decoding: bytes in, dimensions + float bands out.

use std::io::Cursor;

use tiff::decoder::{Decoder, DecodingResult};
use tiff::tags::Tag;
use tracing::debug;

use crate::chunks;
use crate::error::{GeoTiffError, GeoTiffResult};

/// Dimensions, bands and (optional) extent of one raster file.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedRaster {
    pub width: usize,
    pub height: usize,
    /// One row-major array per band, each `width * height` long.
    pub bands: Vec<Vec<f32>>,
    /// Raw `[west, south, east, north]` from the georeferencing tags, not yet normalized.
    pub bounds: Option<[f64; 4]>,
}

impl DecodedRaster {
    pub fn band_count(&self) -> usize {
        self.bands.len()
    }

    pub fn band(&self, index: usize) -> Option<&[f32]> {
        self.bands.get(index).map(Vec::as_slice)
    }

    pub fn cell_count(&self) -> usize {
        self.width * self.height
    }
}

/// NewSubfileType bits for reduced-resolution copies and transparency masks.
const SUBFILE_REDUCED: u32 = 0x1;
const SUBFILE_MASK: u32 = 0x4;

/// Decode a (Geo)TIFF byte stream.
///
/// Bands come from the samples of the first image directory followed by
/// every later full-resolution directory; overviews and masks are skipped.
/// All band directories must share the first one's size. Integer samples are
/// widened to f32 and non-finite values (no-data) are filled with 0.
pub fn decode_raster(bytes: &[u8]) -> GeoTiffResult<DecodedRaster> {
    if bytes.is_empty() {
        return Err(GeoTiffError::decode("empty raster"));
    }

    let mut decoder = Decoder::new(Cursor::new(bytes))?;
    let (width, height) = decoder.dimensions()?;
    if width == 0 || height == 0 {
        return Err(GeoTiffError::decode(format!(
            "zero-sized raster {}x{}",
            width, height
        )));
    }

    let bounds = read_bounds(&mut decoder, width, height)?;
    let cells = width as usize * height as usize;

    let mut bands = Vec::new();
    let mut directory = 0usize;
    loop {
        if directory == 0 || !is_auxiliary(&mut decoder)? {
            let (w, h) = decoder.dimensions()?;
            if (w, h) != (width, height) {
                return Err(GeoTiffError::band_mismatch(format!(
                    "directory {} is {}x{}, expected {}x{}",
                    directory, w, h, width, height
                )));
            }

            if chunks::samples_per_pixel(&mut decoder)? > 1 {
                let mut samples = chunks::read_sample_bands(&mut decoder, bytes, width, height)?;
                samples.iter_mut().flatten().for_each(|v| *v = fill(*v));
                bands.extend(samples);
            } else {
                let samples = to_f32(decoder.read_image()?);
                bands.extend(deinterleave(samples, cells)?);
            }
        } else {
            debug!(directory = directory, "Skipping overview or mask directory");
        }

        if !decoder.more_images() {
            break;
        }
        decoder.next_image()?;
        directory += 1;
    }

    debug!(
        width = width,
        height = height,
        bands = bands.len(),
        georeferenced = bounds.is_some(),
        "Decoded raster"
    );

    Ok(DecodedRaster {
        width: width as usize,
        height: height as usize,
        bands,
        bounds,
    })
}

/// Whether the current directory is an overview or transparency mask.
fn is_auxiliary<R: std::io::Read + std::io::Seek>(decoder: &mut Decoder<R>) -> GeoTiffResult<bool> {
    let kind = decoder
        .find_tag_unsigned::<u32>(Tag::NewSubfileType)?
        .unwrap_or(0);
    Ok(kind & (SUBFILE_REDUCED | SUBFILE_MASK) != 0)
}

/// Read the extent from GeoTIFF model tags.
fn read_bounds<R: std::io::Read + std::io::Seek>(
    decoder: &mut Decoder<R>,
    width: u32,
    height: u32,
) -> GeoTiffResult<Option<[f64; 4]>> {
    let w = width as f64;
    let h = height as f64;

    let scale = decoder
        .find_tag(Tag::ModelPixelScaleTag)?
        .map(|v| v.into_f64_vec())
        .transpose()?;
    let tiepoint = decoder
        .find_tag(Tag::ModelTiepointTag)?
        .map(|v| v.into_f64_vec())
        .transpose()?;

    if let (Some(scale), Some(tie)) = (scale, tiepoint) {
        if scale.len() >= 2 && tie.len() >= 6 {
            let (sx, sy) = (scale[0], scale[1]);
            let west = tie[3] - tie[0] * sx;
            let north = tie[4] + tie[1] * sy;
            return Ok(Some([west, north - h * sy, west + w * sx, north]));
        }
    }

    let transform = decoder
        .find_tag(Tag::ModelTransformationTag)?
        .map(|v| v.into_f64_vec())
        .transpose()?;

    if let Some(m) = transform {
        if m.len() >= 8 {
            let corner = |col: f64, row: f64| (m[0] * col + m[1] * row + m[3], m[4] * col + m[5] * row + m[7]);
            let corners = [corner(0.0, 0.0), corner(w, 0.0), corner(w, h), corner(0.0, h)];
            let west = corners.iter().map(|c| c.0).fold(f64::INFINITY, f64::min);
            let east = corners.iter().map(|c| c.0).fold(f64::NEG_INFINITY, f64::max);
            let south = corners.iter().map(|c| c.1).fold(f64::INFINITY, f64::min);
            let north = corners.iter().map(|c| c.1).fold(f64::NEG_INFINITY, f64::max);
            return Ok(Some([west, south, east, north]));
        }
    }

    Ok(None)
}

/// Split pixel-interleaved samples into per-band arrays.
fn deinterleave(samples: Vec<f32>, cells: usize) -> GeoTiffResult<Vec<Vec<f32>>> {
    if samples.len() < cells || samples.len() % cells != 0 {
        return Err(GeoTiffError::decode(format!(
            "{} samples do not fill {} cells",
            samples.len(),
            cells
        )));
    }

    let per_pixel = samples.len() / cells;
    if per_pixel == 1 {
        return Ok(vec![samples]);
    }

    let mut bands = vec![Vec::with_capacity(cells); per_pixel];
    for pixel in samples.chunks_exact(per_pixel) {
        for (band, &value) in bands.iter_mut().zip(pixel) {
            band.push(value);
        }
    }
    Ok(bands)
}

fn to_f32(result: DecodingResult) -> Vec<f32> {
    fn widen<T: Copy + Into<f64>>(values: Vec<T>) -> Vec<f32> {
        values.into_iter().map(|v| fill(v.into() as f32)).collect()
    }

    match result {
        DecodingResult::F32(v) => v.into_iter().map(fill).collect(),
        DecodingResult::F64(v) => v.into_iter().map(|x| fill(x as f32)).collect(),
        DecodingResult::U8(v) => widen(v),
        DecodingResult::U16(v) => widen(v),
        DecodingResult::U32(v) => widen(v),
        DecodingResult::U64(v) => v.into_iter().map(|x| x as f32).collect(),
        DecodingResult::I8(v) => widen(v),
        DecodingResult::I16(v) => widen(v),
        DecodingResult::I32(v) => widen(v),
        DecodingResult::I64(v) => v.into_iter().map(|x| x as f32).collect(),
    }
}

/// No-data cells read as calm wind.
#[inline]
fn fill(value: f32) -> f32 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}
