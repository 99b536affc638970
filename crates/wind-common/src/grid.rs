//! Gridded u/v wind fields with derived speed.

use serde::{Deserialize, Serialize};

use crate::bbox::GeoBounds;
use crate::error::{WindError, WindResult};

/// How complete the source data behind a grid was.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum DataQuality {
    /// Both components came from the raster.
    #[default]
    Complete,
    /// Only one band was present; v is all zeros.
    MissingV,
    /// The fetch failed and a calm (all-zero) field was substituted.
    Substituted,
}

/// Width, height and placement of a grid, without its data.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridShape {
    pub width: usize,
    pub height: usize,
    pub bounds: GeoBounds,
}

impl GridShape {
    pub fn new(width: usize, height: usize, bounds: GeoBounds) -> Self {
        Self {
            width,
            height,
            bounds,
        }
    }

    pub fn cell_count(&self) -> usize {
        self.width * self.height
    }
}

/// An immutable wind field in row-major order, row 0 at the northern edge.
///
/// Speed is derived once at construction; the grid is never mutated afterwards
/// and is replaced wholesale on the next load.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorFieldGrid {
    width: usize,
    height: usize,
    bounds: GeoBounds,
    u: Vec<f32>,
    v: Vec<f32>,
    speed: Vec<f32>,
    min_speed: f32,
    max_speed: f32,
    quality: DataQuality,
    bounds_fallback: bool,
}

impl VectorFieldGrid {
    /// Build a grid from u/v components, deriving speed in a single pass.
    ///
    /// Fails with `DimensionMismatch` unless both arrays hold exactly
    /// `width * height` values and neither dimension is zero.
    pub fn new(
        width: usize,
        height: usize,
        bounds: GeoBounds,
        u: Vec<f32>,
        v: Vec<f32>,
    ) -> WindResult<Self> {
        if width == 0 || height == 0 {
            return Err(WindError::dimension_mismatch(format!(
                "grid must be non-empty, got {}x{}",
                width, height
            )));
        }

        let expected = width * height;
        if u.len() != expected || v.len() != expected {
            return Err(WindError::dimension_mismatch(format!(
                "expected {} cells for {}x{}, got u={} v={}",
                expected,
                width,
                height,
                u.len(),
                v.len()
            )));
        }

        let (speed, min_speed, max_speed) = derive_speed(&u, &v);

        Ok(Self {
            width,
            height,
            bounds,
            u,
            v,
            speed,
            min_speed,
            max_speed,
            quality: DataQuality::Complete,
            bounds_fallback: false,
        })
    }

    /// A calm field of the given shape, flagged as substituted.
    pub fn zero_filled(shape: GridShape) -> Self {
        let width = shape.width.max(1);
        let height = shape.height.max(1);
        let cells = width * height;
        Self {
            width,
            height,
            bounds: shape.bounds,
            u: vec![0.0; cells],
            v: vec![0.0; cells],
            speed: vec![0.0; cells],
            min_speed: 0.0,
            max_speed: 0.0,
            quality: DataQuality::Substituted,
            bounds_fallback: false,
        }
    }

    /// Tag the grid with the quality of its source data.
    pub fn with_quality(mut self, quality: DataQuality) -> Self {
        self.quality = quality;
        self
    }

    /// Mark the bounds as the full-globe fallback for an unusable extent.
    pub fn with_bounds_fallback(mut self, fallback: bool) -> Self {
        self.bounds_fallback = fallback;
        self
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn bounds(&self) -> GeoBounds {
        self.bounds
    }

    pub fn shape(&self) -> GridShape {
        GridShape::new(self.width, self.height, self.bounds)
    }

    pub fn u(&self) -> &[f32] {
        &self.u
    }

    pub fn v(&self) -> &[f32] {
        &self.v
    }

    pub fn speed(&self) -> &[f32] {
        &self.speed
    }

    pub fn quality(&self) -> DataQuality {
        self.quality
    }

    /// Whether the source extent was unusable and the grid was placed on the full globe.
    pub fn bounds_fallback(&self) -> bool {
        self.bounds_fallback
    }

    /// Smallest and largest finite speed, `(0, 0)` for an all-NaN field.
    pub fn speed_range(&self) -> (f32, f32) {
        (self.min_speed, self.max_speed)
    }

    pub fn cell_count(&self) -> usize {
        self.width * self.height
    }

    /// Flat index of the cell under normalized coordinates.
    ///
    /// `x` runs west to east and `y` north to south, both over [0, 1]. The row-major
    /// index is clamped into the array, so coordinates on the far edges read the
    /// last cell instead of overrunning.
    #[inline]
    pub fn cell_index(&self, x: f32, y: f32) -> usize {
        let col = (x * self.width as f32).floor() as i64;
        let row = (y * self.height as f32).floor() as i64;
        let index = row * self.width as i64 + col;
        index.clamp(0, self.cell_count() as i64 - 1) as usize
    }

    /// Wind components under normalized coordinates; missing data reads as calm.
    #[inline]
    pub fn sample(&self, x: f32, y: f32) -> (f32, f32) {
        let idx = self.cell_index(x, y);
        (finite_or_zero(self.u[idx]), finite_or_zero(self.v[idx]))
    }

    /// Speed under normalized coordinates.
    #[inline]
    pub fn speed_at(&self, x: f32, y: f32) -> f32 {
        self.speed[self.cell_index(x, y)]
    }

    /// Linear interpolation of u/v towards `other`, for blending consecutive timestamps.
    ///
    /// `alpha` is clamped to [0, 1]; 0 returns this grid's field, 1 returns `other`'s.
    pub fn blend(&self, other: &VectorFieldGrid, alpha: f32) -> WindResult<VectorFieldGrid> {
        if self.width != other.width || self.height != other.height {
            return Err(WindError::dimension_mismatch(format!(
                "cannot blend {}x{} with {}x{}",
                self.width, self.height, other.width, other.height
            )));
        }

        let alpha = if alpha.is_finite() {
            alpha.clamp(0.0, 1.0)
        } else {
            0.0
        };
        let mix = |a: &[f32], b: &[f32]| -> Vec<f32> {
            a.iter()
                .zip(b)
                .map(|(&x, &y)| x + (y - x) * alpha)
                .collect()
        };

        let grid = VectorFieldGrid::new(
            self.width,
            self.height,
            self.bounds,
            mix(&self.u, &other.u),
            mix(&self.v, &other.v),
        )?;
        let quality = if self.quality == DataQuality::Complete {
            other.quality
        } else {
            self.quality
        };
        Ok(grid
            .with_quality(quality)
            .with_bounds_fallback(self.bounds_fallback))
    }
}

#[inline]
fn finite_or_zero(value: f32) -> f32 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

/// Single pass over both components: speed per cell plus running min/max.
///
/// Grids reach ~1M cells, so the extremes are tracked inline rather than in a
/// second traversal.
fn derive_speed(u: &[f32], v: &[f32]) -> (Vec<f32>, f32, f32) {
    let mut speed = Vec::with_capacity(u.len());
    let mut min_speed = f32::INFINITY;
    let mut max_speed = f32::NEG_INFINITY;

    for (&u, &v) in u.iter().zip(v) {
        let s = (u * u + v * v).sqrt();
        speed.push(s);
        if s < min_speed {
            min_speed = s;
        }
        if s > max_speed {
            max_speed = s;
        }
    }

    if !min_speed.is_finite() || !max_speed.is_finite() {
        min_speed = 0.0;
        max_speed = 0.0;
    }

    (speed, min_speed, max_speed)
}
