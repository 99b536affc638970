//! Strip and tile reading for rasters with several samples per pixel.
//!
//! The `tiff` decoder only expands gray, RGB(A), CMYK and YCbCr layouts, so a
//! u/v raster stored as two float samples per pixel (GDAL's default for a
//! two-band file) is unpacked here straight from the chunk table. Both
//! pixel-interleaved and band-planar configurations are handled.

use std::io::{Read, Seek};

use flate2::read::ZlibDecoder;
use tiff::decoder::{fp_predict_f32, fp_predict_f64, Decoder};
use tiff::tags::Tag;

use crate::error::{GeoTiffError, GeoTiffResult};

const COMPRESSION_NONE: u16 = 1;
const COMPRESSION_LZW: u16 = 5;
const COMPRESSION_DEFLATE: u16 = 8;
const COMPRESSION_PACKBITS: u16 = 32773;
const COMPRESSION_DEFLATE_OLD: u16 = 32946;

const PREDICTOR_NONE: u16 = 1;
const PREDICTOR_HORIZONTAL: u16 = 2;
const PREDICTOR_FLOAT: u16 = 3;

const FORMAT_UINT: u16 = 1;
const FORMAT_INT: u16 = 2;
const FORMAT_FLOAT: u16 = 3;

const PLANAR_SEPARATE: u16 = 2;

/// How samples are stored in one image directory.
#[derive(Debug, Clone, Copy)]
struct SampleLayout {
    samples: usize,
    /// Bytes per sample.
    bytes: usize,
    format: u16,
    planar: bool,
    predictor: u16,
    compression: u16,
    little_endian: bool,
}

impl SampleLayout {
    fn per_pixel(&self) -> usize {
        if self.planar {
            1
        } else {
            self.samples
        }
    }
}

#[derive(Debug)]
struct ChunkTable {
    width: usize,
    height: usize,
    tiled: bool,
    offsets: Vec<u64>,
    byte_counts: Vec<u64>,
}

/// Number of samples per pixel in the decoder's current directory.
pub(crate) fn samples_per_pixel<R: Read + Seek>(decoder: &mut Decoder<R>) -> GeoTiffResult<usize> {
    Ok(decoder
        .find_tag_unsigned::<u16>(Tag::SamplesPerPixel)?
        .unwrap_or(1) as usize)
}

/// Read every sample of the current directory into one array per band.
///
/// `data` is the whole file the decoder was opened on; chunk offsets index
/// into it directly.
pub(crate) fn read_sample_bands<R: Read + Seek>(
    decoder: &mut Decoder<R>,
    data: &[u8],
    width: u32,
    height: u32,
) -> GeoTiffResult<Vec<Vec<f32>>> {
    let layout = read_layout(decoder, data)?;
    let table = read_chunk_table(decoder, width, height)?;
    let (width, height) = (width as usize, height as usize);

    let across = (width + table.width - 1) / table.width;
    let down = (height + table.height - 1) / table.height;
    let per_plane = across * down;
    let planes = if layout.planar { layout.samples } else { 1 };
    if table.offsets.len() < per_plane * planes || table.byte_counts.len() < per_plane * planes {
        return Err(GeoTiffError::decode(format!(
            "{} chunks listed, expected {}",
            table.offsets.len().min(table.byte_counts.len()),
            per_plane * planes
        )));
    }

    let per_pixel = layout.per_pixel();
    let mut bands = vec![vec![0.0f32; width * height]; layout.samples];

    for plane in 0..planes {
        for chunk in 0..per_plane {
            let index = plane * per_plane + chunk;
            let x0 = (chunk % across) * table.width;
            let y0 = (chunk / across) * table.height;
            let cols = table.width.min(width - x0);
            let rows = table.height.min(height - y0);

            // Tiles are padded to full size; the last strip stops at the image edge.
            let (stored_cols, stored_rows) = if table.tiled {
                (table.width, table.height)
            } else {
                (width, rows)
            };
            let row_bytes = stored_cols * per_pixel * layout.bytes;
            let expected = row_bytes * stored_rows;

            let raw = chunk_bytes(data, table.offsets[index], table.byte_counts[index])?;
            let mut raw = decompress(raw, layout.compression, expected)?;
            if raw.len() < expected {
                return Err(GeoTiffError::decode(format!(
                    "chunk {} holds {} bytes, expected {}",
                    index,
                    raw.len(),
                    expected
                )));
            }

            let mut values = vec![0.0f32; stored_cols * per_pixel];
            for (r, row) in raw[..expected].chunks_exact_mut(row_bytes).take(rows).enumerate() {
                decode_row(row, &layout, &mut values)?;
                let start = (y0 + r) * width + x0;
                for c in 0..cols {
                    for s in 0..per_pixel {
                        let band = if layout.planar { plane } else { s };
                        bands[band][start + c] = values[c * per_pixel + s];
                    }
                }
            }
        }
    }

    Ok(bands)
}

fn read_layout<R: Read + Seek>(decoder: &mut Decoder<R>, data: &[u8]) -> GeoTiffResult<SampleLayout> {
    let samples = samples_per_pixel(decoder)?;
    if samples == 0 {
        return Err(GeoTiffError::decode("raster declares zero samples per pixel"));
    }

    let bits = decoder
        .find_tag_unsigned_vec::<u16>(Tag::BitsPerSample)?
        .unwrap_or_else(|| vec![1]);
    let first = bits.first().copied().unwrap_or(1);
    if bits.iter().any(|&b| b != first) {
        return Err(GeoTiffError::decode(format!(
            "mixed sample sizes {:?} are unsupported",
            bits
        )));
    }

    let format = decoder
        .find_tag_unsigned_vec::<u16>(Tag::SampleFormat)?
        .and_then(|formats| formats.first().copied())
        .unwrap_or(FORMAT_UINT);

    match (format, first) {
        (FORMAT_FLOAT, 32 | 64) | (FORMAT_UINT | FORMAT_INT, 8 | 16 | 32 | 64) => {}
        _ => {
            return Err(GeoTiffError::decode(format!(
                "sample format {} with {} bits is unsupported",
                format, first
            )))
        }
    }

    Ok(SampleLayout {
        samples,
        bytes: first as usize / 8,
        format,
        planar: decoder.find_tag_unsigned::<u16>(Tag::PlanarConfiguration)? == Some(PLANAR_SEPARATE),
        predictor: decoder
            .find_tag_unsigned::<u16>(Tag::Predictor)?
            .unwrap_or(PREDICTOR_NONE),
        compression: decoder
            .find_tag_unsigned::<u16>(Tag::Compression)?
            .unwrap_or(COMPRESSION_NONE),
        little_endian: data.starts_with(b"II"),
    })
}

fn read_chunk_table<R: Read + Seek>(
    decoder: &mut Decoder<R>,
    width: u32,
    height: u32,
) -> GeoTiffResult<ChunkTable> {
    let table = match decoder.find_tag_unsigned::<u32>(Tag::TileWidth)? {
        Some(tile_width) => ChunkTable {
            width: tile_width as usize,
            height: decoder.get_tag_u32(Tag::TileLength)? as usize,
            tiled: true,
            offsets: decoder.get_tag_u64_vec(Tag::TileOffsets)?,
            byte_counts: decoder.get_tag_u64_vec(Tag::TileByteCounts)?,
        },
        None => {
            let rows = decoder
                .find_tag_unsigned::<u32>(Tag::RowsPerStrip)?
                .unwrap_or(height)
                .min(height);
            // Strips always span the full row.
            ChunkTable {
                width: width as usize,
                height: rows as usize,
                tiled: false,
                offsets: decoder.get_tag_u64_vec(Tag::StripOffsets)?,
                byte_counts: decoder.get_tag_u64_vec(Tag::StripByteCounts)?,
            }
        }
    };

    if table.width == 0 || table.height == 0 {
        return Err(GeoTiffError::decode("zero-sized strip or tile"));
    }
    Ok(table)
}

fn chunk_bytes(data: &[u8], offset: u64, count: u64) -> GeoTiffResult<&[u8]> {
    let start = usize::try_from(offset).ok();
    let end = start.zip(usize::try_from(count).ok()).and_then(|(s, c)| s.checked_add(c));
    start
        .zip(end)
        .and_then(|(start, end)| data.get(start..end))
        .ok_or_else(|| {
            GeoTiffError::decode(format!(
                "chunk of {} bytes at offset {} runs past the end of the file",
                count, offset
            ))
        })
}

fn decompress(raw: &[u8], compression: u16, expected: usize) -> GeoTiffResult<Vec<u8>> {
    match compression {
        COMPRESSION_NONE => Ok(raw.to_vec()),
        COMPRESSION_DEFLATE | COMPRESSION_DEFLATE_OLD => {
            let mut out = Vec::with_capacity(expected);
            ZlibDecoder::new(raw)
                .read_to_end(&mut out)
                .map_err(|e| GeoTiffError::decode(format!("deflate stream: {}", e)))?;
            Ok(out)
        }
        COMPRESSION_PACKBITS => unpack_bits(raw, expected),
        COMPRESSION_LZW => lzw_decode(raw, expected),
        other => Err(GeoTiffError::decode(format!(
            "compression {} is unsupported for multi-sample rasters",
            other
        ))),
    }
}

/// Undo the predictor for one stored row and widen its samples to f32.
fn decode_row(row: &mut [u8], layout: &SampleLayout, out: &mut [f32]) -> GeoTiffResult<()> {
    let per_pixel = layout.per_pixel();

    match layout.predictor {
        PREDICTOR_FLOAT if layout.format == FORMAT_FLOAT => {
            // The float predictor stores bytes big-endian regardless of file order.
            if layout.bytes == 4 {
                fp_predict_f32(row, out, per_pixel);
            } else {
                let mut wide = vec![0.0f64; out.len()];
                fp_predict_f64(row, &mut wide, per_pixel);
                for (o, w) in out.iter_mut().zip(wide) {
                    *o = w as f32;
                }
            }
            return Ok(());
        }
        PREDICTOR_NONE => {}
        PREDICTOR_HORIZONTAL if layout.format != FORMAT_FLOAT => {}
        other => {
            return Err(GeoTiffError::decode(format!(
                "predictor {} does not apply to sample format {}",
                other, layout.format
            )))
        }
    }

    let mut words: Vec<u64> = row
        .chunks_exact(layout.bytes)
        .map(|b| read_word(b, layout.little_endian))
        .collect();

    if layout.predictor == PREDICTOR_HORIZONTAL {
        let mask = match layout.bytes {
            8 => u64::MAX,
            n => (1u64 << (n * 8)) - 1,
        };
        for i in per_pixel..words.len() {
            words[i] = words[i].wrapping_add(words[i - per_pixel]) & mask;
        }
    }

    for (o, word) in out.iter_mut().zip(words) {
        *o = widen(word, layout.bytes, layout.format);
    }
    Ok(())
}

fn read_word(bytes: &[u8], little_endian: bool) -> u64 {
    let push = |acc: u64, &b: &u8| (acc << 8) | b as u64;
    if little_endian {
        bytes.iter().rev().fold(0, push)
    } else {
        bytes.iter().fold(0, push)
    }
}

fn widen(word: u64, bytes: usize, format: u16) -> f32 {
    match (format, bytes) {
        (FORMAT_FLOAT, 4) => f32::from_bits(word as u32),
        (FORMAT_FLOAT, _) => f64::from_bits(word) as f32,
        (FORMAT_INT, n) => {
            let shift = 64 - n * 8;
            ((word << shift) as i64 >> shift) as f32
        }
        _ => word as f32,
    }
}

fn unpack_bits(raw: &[u8], expected: usize) -> GeoTiffResult<Vec<u8>> {
    let truncated = || GeoTiffError::decode("truncated PackBits run");
    let mut out = Vec::with_capacity(expected);
    let mut i = 0;

    while i < raw.len() && out.len() < expected {
        let header = raw[i] as i8;
        i += 1;
        match header {
            -128 => {}
            n if n >= 0 => {
                let len = n as usize + 1;
                let literal = raw.get(i..i + len).ok_or_else(truncated)?;
                out.extend_from_slice(literal);
                i += len;
            }
            n => {
                let byte = *raw.get(i).ok_or_else(truncated)?;
                let count = (1 - n as i32) as usize;
                out.extend(std::iter::repeat(byte).take(count));
                i += 1;
            }
        }
    }

    Ok(out)
}

/// MSB-first bit reader for LZW codes.
struct CodeReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl CodeReader<'_> {
    fn read(&mut self, width: usize) -> Option<usize> {
        if self.pos + width > self.data.len() * 8 {
            return None;
        }
        let mut code = 0usize;
        for _ in 0..width {
            let bit = (self.data[self.pos / 8] >> (7 - self.pos % 8)) & 1;
            code = (code << 1) | bit as usize;
            self.pos += 1;
        }
        Some(code)
    }
}

/// TIFF-flavoured LZW: MSB-first codes of 9 to 12 bits, widening one code early.
fn lzw_decode(raw: &[u8], expected: usize) -> GeoTiffResult<Vec<u8>> {
    const CLEAR: usize = 256;
    const END: usize = 257;
    const MAX_WIDTH: usize = 12;

    fn reset(table: &mut Vec<Vec<u8>>) {
        table.clear();
        table.extend((0..=255u8).map(|b| vec![b]));
        // CLEAR and END occupy 256 and 257.
        table.push(Vec::new());
        table.push(Vec::new());
    }

    let mut out = Vec::with_capacity(expected);
    let mut table: Vec<Vec<u8>> = Vec::with_capacity(1 << MAX_WIDTH);
    reset(&mut table);

    let mut reader = CodeReader { data: raw, pos: 0 };
    let mut width = 9;
    let mut prev: Option<Vec<u8>> = None;

    while let Some(code) = reader.read(width) {
        match code {
            CLEAR => {
                reset(&mut table);
                width = 9;
                prev = None;
                continue;
            }
            END => break,
            _ => {}
        }

        let entry = match (&prev, table.get(code)) {
            (_, Some(entry)) => entry.clone(),
            (Some(p), None) if code == table.len() => {
                let mut entry = p.clone();
                entry.push(p[0]);
                entry
            }
            _ => return Err(GeoTiffError::decode(format!("invalid LZW code {}", code))),
        };

        out.extend_from_slice(&entry);
        if let Some(mut p) = prev.take() {
            if table.len() < 1 << MAX_WIDTH {
                p.push(entry[0]);
                table.push(p);
            }
        }
        prev = Some(entry);

        if table.len() + 1 >= 1 << width && width < MAX_WIDTH {
            width += 1;
        }
        if out.len() >= expected {
            break;
        }
    }

    Ok(out)
}
