//! Common fixtures: bounding boxes, GeoTIFF byte streams and catalog listings.

use std::io::Cursor;

use tiff::encoder::compression::{Compression, Deflate, Lzw, Packbits, Uncompressed};
use tiff::encoder::{colortype, TiffEncoder};
use tiff::tags::{PhotometricInterpretation, SampleFormat, Tag};

/// Common bounding box definitions, ordered `[west, south, east, north]`.
pub mod bbox {
    /// Full-globe coverage within the Mercator latitude limit.
    pub const GLOBAL: [f64; 4] = [-180.0, -85.0, 180.0, 85.0];

    /// Small box around the origin.
    pub const SMALL: [f64; 4] = [-10.0, -10.0, 10.0, 10.0];

    /// South China Sea / Vietnam region, where the dashboard is deployed.
    pub const SOUTH_CHINA_SEA: [f64; 4] = [100.0, 5.0, 120.0, 25.0];

    /// Raw extent that runs past the poles.
    pub const BEYOND_POLES: [f64; 4] = [-200.0, -90.0, 200.0, 90.0];

    /// West greater than east.
    pub const INVERTED: [f64; 4] = [10.0, -10.0, -10.0, 10.0];

    /// Zero-area box.
    pub const POINT: [f64; 4] = [0.0, 0.0, 0.0, 0.0];
}

/// Two f32 samples per pixel, the way GDAL writes a two-band float raster.
pub struct Uv32Float;

impl colortype::ColorType for Uv32Float {
    type Inner = f32;
    const TIFF_VALUE: PhotometricInterpretation = PhotometricInterpretation::BlackIsZero;
    const BITS_PER_SAMPLE: &'static [u16] = &[32, 32];
    const SAMPLE_FORMAT: &'static [SampleFormat] = &[SampleFormat::IEEEFP, SampleFormat::IEEEFP];
}

/// How a multi-band fixture stores its bands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BandLayout {
    /// Two bands as interleaved samples of one directory.
    Interleaved,
    /// Each band as its own image directory.
    Directories,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FixtureCompression {
    None,
    Deflate,
    Lzw,
    PackBits,
}

/// A single-precision GeoTIFF assembled in memory.
///
/// Two bands default to the interleaved layout; single bands and
/// [`BandLayout::Directories`] are written one directory per band.
/// Overviews follow as reduced-resolution directories.
#[derive(Debug, Clone)]
pub struct GeoTiffFixture {
    pub width: u32,
    pub height: u32,
    pub bands: Vec<Vec<f32>>,
    pub bbox: Option<[f64; 4]>,
    pub layout: BandLayout,
    pub compression: FixtureCompression,
    pub overviews: Vec<(u32, u32, Vec<f32>)>,
}

impl GeoTiffFixture {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            bands: Vec::new(),
            bbox: None,
            layout: BandLayout::Interleaved,
            compression: FixtureCompression::None,
            overviews: Vec::new(),
        }
    }

    pub fn band(mut self, data: Vec<f32>) -> Self {
        self.bands.push(data);
        self
    }

    pub fn bbox(mut self, bbox: [f64; 4]) -> Self {
        self.bbox = Some(bbox);
        self
    }

    pub fn layout(mut self, layout: BandLayout) -> Self {
        self.layout = layout;
        self
    }

    pub fn compression(mut self, compression: FixtureCompression) -> Self {
        self.compression = compression;
        self
    }

    /// Append a single-band reduced-resolution directory (NewSubfileType = 1).
    pub fn overview(mut self, width: u32, height: u32, data: Vec<f32>) -> Self {
        self.overviews.push((width, height, data));
        self
    }

    /// Encode to TIFF bytes. Panics on encoder errors since fixtures are test-only.
    pub fn encode(&self) -> Vec<u8> {
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut encoder = TiffEncoder::new(&mut cursor).expect("create TIFF encoder");

            if self.layout == BandLayout::Interleaved && self.bands.len() == 2 {
                let samples: Vec<f32> = self.bands[0]
                    .iter()
                    .zip(&self.bands[1])
                    .flat_map(|(&u, &v)| [u, v])
                    .collect();
                self.write::<Uv32Float>(&mut encoder, self.width, self.height, &samples, 0);
            } else {
                for band in &self.bands {
                    self.write::<colortype::Gray32Float>(&mut encoder, self.width, self.height, band, 0);
                }
            }

            for (width, height, data) in &self.overviews {
                self.write::<colortype::Gray32Float>(&mut encoder, *width, *height, data, 1);
            }
        }
        cursor.into_inner()
    }

    fn write<C: colortype::ColorType<Inner = f32>>(
        &self,
        encoder: &mut TiffEncoder<&mut Cursor<Vec<u8>>>,
        width: u32,
        height: u32,
        data: &[f32],
        subfile: u32,
    ) {
        match self.compression {
            FixtureCompression::None => {
                self.write_with::<C, _>(encoder, width, height, data, subfile, Uncompressed)
            }
            FixtureCompression::Deflate => {
                self.write_with::<C, _>(encoder, width, height, data, subfile, Deflate::default())
            }
            FixtureCompression::Lzw => self.write_with::<C, _>(encoder, width, height, data, subfile, Lzw),
            FixtureCompression::PackBits => {
                self.write_with::<C, _>(encoder, width, height, data, subfile, Packbits)
            }
        }
    }

    fn write_with<C: colortype::ColorType<Inner = f32>, D: Compression>(
        &self,
        encoder: &mut TiffEncoder<&mut Cursor<Vec<u8>>>,
        width: u32,
        height: u32,
        data: &[f32],
        subfile: u32,
        compression: D,
    ) {
        let mut image = encoder
            .new_image_with_compression::<C, D>(width, height, compression)
            .expect("create TIFF image");

        if subfile != 0 {
            image
                .encoder()
                .write_tag(Tag::NewSubfileType, subfile)
                .expect("write subfile type");
        }

        if let Some([west, south, east, north]) = self.bbox {
            let scale_x = (east - west) / width as f64;
            let scale_y = (north - south) / height as f64;
            image
                .encoder()
                .write_tag(Tag::ModelPixelScaleTag, &[scale_x, scale_y, 0.0][..])
                .expect("write pixel scale");
            image
                .encoder()
                .write_tag(
                    Tag::ModelTiepointTag,
                    &[0.0, 0.0, 0.0, west, north, 0.0][..],
                )
                .expect("write tiepoint");
        }

        image.write_data(data).expect("write TIFF band");
    }
}

/// Two-band (u, v) GeoTIFF bytes, interleaved two samples per pixel.
pub fn uv_geotiff(width: u32, height: u32, u: Vec<f32>, v: Vec<f32>, bbox: [f64; 4]) -> Vec<u8> {
    GeoTiffFixture::new(width, height)
        .band(u)
        .band(v)
        .bbox(bbox)
        .encode()
}

/// Single-band GeoTIFF bytes.
pub fn single_band_geotiff(width: u32, height: u32, data: Vec<f32>, bbox: [f64; 4]) -> Vec<u8> {
    GeoTiffFixture::new(width, height).band(data).bbox(bbox).encode()
}

/// Raster-scan listing JSON for `(timestamp, uFile, vFile)` triples.
pub fn scan_listing_json(entries: &[(&str, &str, &str)]) -> String {
    let items: Vec<String> = entries
        .iter()
        .map(|(ts, u, v)| {
            format!(
                r#"{{"timestamp":"{}","uFile":"{}","vFile":"{}"}}"#,
                ts, u, v
            )
        })
        .collect();
    format!(
        r#"{{"success":true,"count":{},"timestamps":[{}]}}"#,
        entries.len(),
        items.join(",")
    )
}
