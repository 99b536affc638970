//! Static color-mapped overlay of a wind field.
//!
//! One output pixel per grid cell. Row 0 of the image is row 0 of the grid,
//! which is the northern edge, so the image georeferences directly against
//! its [west, north] .. [east, south] corners without a vertical flip.

use rayon::prelude::*;
use serde::Serialize;
use tracing::debug;
use wind_common::{GeoBounds, VectorFieldGrid, WindResult};

use crate::gradient::{normalize, Color, ColorLut, ColorRamp};
use crate::png::{encode_png, PngError};

/// Minimum cells to render rows in parallel
const PARALLEL_THRESHOLD: usize = 4096;

/// Finished overlay ready for the display collaborator.
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayImage {
    pub width: usize,
    pub height: usize,
    /// Straight-alpha RGBA, row-major, row 0 northernmost.
    pub pixels: Vec<u8>,
    pub bounds: GeoBounds,
}

/// Placement metadata published alongside the image.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverlayPlacement {
    pub width: usize,
    pub height: usize,
    pub bbox: [f64; 4],
    /// Top-left, top-right, bottom-right, bottom-left `[lon, lat]`.
    pub coordinates: [[f64; 2]; 4],
}

impl OverlayImage {
    /// Four `[lon, lat]` corners in image-source order.
    pub fn corners(&self) -> [[f64; 2]; 4] {
        self.bounds.corners()
    }

    pub fn pixel(&self, x: usize, y: usize) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y * self.width + x) * 4;
        Some([
            self.pixels[i],
            self.pixels[i + 1],
            self.pixels[i + 2],
            self.pixels[i + 3],
        ])
    }

    pub fn placement(&self) -> OverlayPlacement {
        OverlayPlacement {
            width: self.width,
            height: self.height,
            bbox: self.bounds.to_array(),
            coordinates: self.corners(),
        }
    }

    pub fn to_png(&self) -> Result<Vec<u8>, PngError> {
        encode_png(&self.pixels, self.width, self.height)
    }
}

/// Paints speed through a compiled color table.
#[derive(Debug, Clone)]
pub struct StaticRasterRenderer {
    lut: ColorLut,
    opacity: f32,
}

impl StaticRasterRenderer {
    pub fn new(ramp: &ColorRamp) -> Self {
        Self {
            lut: ramp.compile(),
            opacity: 1.0,
        }
    }

    /// Overlay alpha in [0, 1]; out-of-range values are clamped.
    pub fn with_opacity(mut self, opacity: f32) -> Self {
        self.set_opacity(opacity);
        self
    }

    pub fn set_opacity(&mut self, opacity: f32) {
        self.opacity = if opacity.is_finite() {
            opacity.clamp(0.0, 1.0)
        } else {
            1.0
        };
    }

    pub fn set_ramp(&mut self, ramp: &ColorRamp) {
        self.lut = ramp.compile();
    }

    pub fn opacity(&self) -> f32 {
        self.opacity
    }

    pub fn lut(&self) -> &ColorLut {
        &self.lut
    }

    /// Render every cell's speed normalized over `(min_speed, max_speed)`.
    ///
    /// Non-finite speeds come out transparent.
    pub fn render(&self, grid: &VectorFieldGrid, (min_speed, max_speed): (f32, f32)) -> OverlayImage {
        let (min_speed, max_speed) = if min_speed.is_finite() && max_speed.is_finite() {
            (min_speed, max_speed)
        } else {
            grid.speed_range()
        };

        let width = grid.width();
        let height = grid.height();
        let alpha = (self.opacity * 255.0).round() as u8;
        let speed = grid.speed();
        let mut pixels = vec![0u8; width * height * 4];

        let paint_row = |(y, row): (usize, &mut [u8])| {
            let cells = &speed[y * width..(y + 1) * width];
            for (px, &s) in row.chunks_exact_mut(4).zip(cells) {
                let color = if s.is_finite() {
                    self.lut.sample(normalize(s, min_speed, max_speed)).with_alpha(alpha)
                } else {
                    Color::transparent()
                };
                px.copy_from_slice(&color.to_array());
            }
        };

        if width * height >= PARALLEL_THRESHOLD {
            pixels.par_chunks_mut(width * 4).enumerate().for_each(paint_row);
        } else {
            pixels.chunks_mut(width * 4).enumerate().for_each(paint_row);
        }

        debug!(
            width = width,
            height = height,
            min_speed = min_speed,
            max_speed = max_speed,
            "Rendered wind overlay"
        );

        OverlayImage {
            width,
            height,
            pixels,
            bounds: grid.bounds(),
        }
    }

    /// Render the temporal blend of two consecutive grids.
    ///
    /// `alpha` = 0 renders `from`, 1 renders `to`.
    pub fn render_blended(
        &self,
        from: &VectorFieldGrid,
        to: &VectorFieldGrid,
        alpha: f32,
        range: (f32, f32),
    ) -> WindResult<OverlayImage> {
        let blended = from.blend(to, alpha)?;
        Ok(self.render(&blended, range))
    }
}

impl Default for StaticRasterRenderer {
    fn default() -> Self {
        Self::new(&ColorRamp::wind())
    }
}
