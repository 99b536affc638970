//! Particle trail compositing on ping-pong surfaces.
//!
//! Each frame fades the previous surface into the other one, draws the
//! particles on top, then publishes that surface. The surface read by the
//! fade is never the one being written.

use rayon::prelude::*;
use tiny_skia::{FillRule, Paint, PathBuilder, Pixmap, Rect, Transform};
use wind_common::{VectorFieldGrid, WindError, WindResult};

use crate::gradient::{Color, ColorLut};
use crate::particles::ParticleState;
use crate::png::{encode_png, PngError};

/// Bytes above which the fade runs on rayon.
const PARALLEL_FADE_BYTES: usize = 256 * 1024;

/// Sprites larger than this (px) are drawn as anti-aliased circles.
const CIRCLE_SPRITE_SIZE: f32 = 2.0;

/// A fixed-size premultiplied RGBA surface.
#[derive(Debug, Clone)]
pub struct RenderSurface {
    pixmap: Pixmap,
}

impl RenderSurface {
    pub fn new(width: u32, height: u32) -> WindResult<Self> {
        let pixmap = Pixmap::new(width, height).ok_or_else(|| {
            WindError::gpu_resource(format!("cannot allocate {}x{} surface", width, height))
        })?;
        Ok(Self { pixmap })
    }

    pub fn width(&self) -> u32 {
        self.pixmap.width()
    }

    pub fn height(&self) -> u32 {
        self.pixmap.height()
    }

    /// Premultiplied RGBA bytes.
    pub fn data(&self) -> &[u8] {
        self.pixmap.data()
    }

    pub fn pixmap(&self) -> &Pixmap {
        &self.pixmap
    }

    /// Straight-alpha RGBA at `(x, y)`.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        let c = self.pixmap.pixel(x, y)?.demultiply();
        Some([c.red(), c.green(), c.blue(), c.alpha()])
    }

    /// Straight-alpha RGBA copy of the whole surface.
    pub fn to_rgba(&self) -> Vec<u8> {
        self.pixmap
            .pixels()
            .iter()
            .flat_map(|p| {
                let c = p.demultiply();
                [c.red(), c.green(), c.blue(), c.alpha()]
            })
            .collect()
    }

    /// True when every pixel is fully transparent.
    pub fn is_blank(&self) -> bool {
        self.pixmap.pixels().iter().all(|p| p.alpha() == 0)
    }

    pub fn to_png(&self) -> Result<Vec<u8>, PngError> {
        encode_png(
            &self.to_rgba(),
            self.width() as usize,
            self.height() as usize,
        )
    }

    fn clear(&mut self) {
        self.pixmap.fill(tiny_skia::Color::TRANSPARENT);
    }
}

/// How particles are drawn.
#[derive(Debug, Clone)]
pub struct SpriteStyle {
    pub point_size: f32,
    pub opacity: f32,
    /// Particles fade out linearly as they approach this age.
    pub max_age: f32,
    /// Color particles by local speed through this table instead of white.
    pub speed_colors: Option<ColorLut>,
    pub speed_range: (f32, f32),
}

impl Default for SpriteStyle {
    fn default() -> Self {
        Self {
            point_size: 1.5,
            opacity: 1.0,
            max_age: 10.0,
            speed_colors: None,
            speed_range: (0.0, 30.0),
        }
    }
}

impl SpriteStyle {
    fn color_for(&self, particle: &ParticleState, grid: &VectorFieldGrid) -> Color {
        let life = if self.max_age > 0.0 {
            (1.0 - particle.age / self.max_age).clamp(0.0, 1.0)
        } else {
            1.0
        };
        let alpha = (life * self.opacity.clamp(0.0, 1.0) * 255.0).round() as u8;

        let base = match &self.speed_colors {
            Some(lut) => {
                let (min, max) = self.speed_range;
                lut.sample_speed(grid.speed_at(particle.x, particle.y), min, max)
            }
            None => Color::WHITE,
        };
        base.with_alpha(alpha)
    }
}

/// Two surfaces and the index of the published one.
#[derive(Debug)]
pub struct CompositingPipeline {
    surfaces: [RenderSurface; 2],
    current: usize,
}

impl CompositingPipeline {
    pub fn new(width: u32, height: u32) -> WindResult<Self> {
        Ok(Self {
            surfaces: [
                RenderSurface::new(width, height)?,
                RenderSurface::new(width, height)?,
            ],
            current: 0,
        })
    }

    pub fn width(&self) -> u32 {
        self.surfaces[0].width()
    }

    pub fn height(&self) -> u32 {
        self.surfaces[0].height()
    }

    /// The most recently published surface.
    pub fn current(&self) -> &RenderSurface {
        &self.surfaces[self.current]
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    /// Fade the previous frame, draw `particles` over it and publish.
    pub fn composite(
        &mut self,
        particles: &[ParticleState],
        grid: &VectorFieldGrid,
        style: &SpriteStyle,
        fade: f32,
    ) -> &RenderSurface {
        let target = self.fade_into_next(fade);
        draw_particles(&mut target.pixmap, particles, grid, style);
        self.publish()
    }

    /// Fade without drawing, used while no field is loaded.
    pub fn fade_only(&mut self, fade: f32) -> &RenderSurface {
        self.fade_into_next(fade);
        self.publish()
    }

    /// Reallocate both surfaces at a new size; trails are discarded.
    pub fn resize(&mut self, width: u32, height: u32) -> WindResult<()> {
        self.surfaces = [
            RenderSurface::new(width, height)?,
            RenderSurface::new(width, height)?,
        ];
        self.current = 0;
        Ok(())
    }

    pub fn clear(&mut self) {
        for surface in &mut self.surfaces {
            surface.clear();
        }
    }

    fn fade_into_next(&mut self, fade: f32) -> &mut RenderSurface {
        let fade = if fade.is_finite() { fade.clamp(0.0, 1.0) } else { 0.0 };
        let [a, b] = &mut self.surfaces;
        let (prev, next) = if self.current == 0 { (&*a, b) } else { (&*b, a) };
        fade_surface(prev.pixmap.data(), next.pixmap.data_mut(), fade);
        next
    }

    fn publish(&mut self) -> &RenderSurface {
        self.current = 1 - self.current;
        &self.surfaces[self.current]
    }
}

/// `dst = trunc(src * fade)` per channel.
///
/// Truncation guarantees trails reach zero instead of stalling at a low value.
/// Scaling every channel by the same factor keeps premultiplied data valid.
fn fade_surface(src: &[u8], dst: &mut [u8], fade: f32) {
    let apply = |(d, &s): (&mut u8, &u8)| *d = (s as f32 * fade) as u8;
    if dst.len() >= PARALLEL_FADE_BYTES {
        dst.par_iter_mut().zip(src.par_iter()).for_each(apply);
    } else {
        dst.iter_mut().zip(src.iter()).for_each(apply);
    }
}

fn draw_particles(
    pixmap: &mut Pixmap,
    particles: &[ParticleState],
    grid: &VectorFieldGrid,
    style: &SpriteStyle,
) {
    let width = pixmap.width() as f32;
    let height = pixmap.height() as f32;
    let size = style.point_size.max(0.1);
    let half = size / 2.0;

    let mut paint = Paint::default();
    paint.anti_alias = size > CIRCLE_SPRITE_SIZE;

    for particle in particles {
        let color = style.color_for(particle, grid);
        if color.a == 0 {
            continue;
        }
        paint.set_color_rgba8(color.r, color.g, color.b, color.a);

        let cx = particle.x * width;
        let cy = particle.y * height;

        if size > CIRCLE_SPRITE_SIZE {
            if let Some(path) = PathBuilder::from_circle(cx, cy, half) {
                pixmap.fill_path(&path, &paint, FillRule::Winding, Transform::identity(), None);
            }
        } else if let Some(rect) = Rect::from_xywh(cx - half, cy - half, size, size) {
            pixmap.fill_rect(rect, &paint, Transform::identity(), None);
        }
    }
}
