//! Color ramps for wind speed: piecewise-linear stops and their lookup table.

use serde::{Deserialize, Serialize};
use wind_common::{WindError, WindResult};

/// Number of entries in a compiled [`ColorLut`].
pub const LUT_SIZE: usize = 256;

/// Color value in RGBA format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const WHITE: Color = Color::rgb(255, 255, 255);

    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Opaque color.
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn transparent() -> Self {
        Self { r: 0, g: 0, b: 0, a: 0 }
    }

    pub fn with_alpha(self, a: u8) -> Self {
        Self { a, ..self }
    }

    pub fn to_array(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

/// Linear color interpolation, rounding each channel to the nearest value.
pub fn interpolate_color(color1: Color, color2: Color, t: f32) -> Color {
    let t = t.clamp(0.0, 1.0);
    let lerp = |a: u8, b: u8| (a as f32 + (b as f32 - a as f32) * t).round() as u8;

    Color::new(
        lerp(color1.r, color2.r),
        lerp(color1.g, color2.g),
        lerp(color1.b, color2.b),
        lerp(color1.a, color2.a),
    )
}

/// A color pinned to a normalized position in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ColorStop {
    pub position: f32,
    pub color: Color,
}

impl ColorStop {
    pub const fn new(position: f32, color: Color) -> Self {
        Self { position, color }
    }
}

/// Wind palette for 0-30 m/s: blues through greens, ochres and purples.
const WIND_STOPS: [ColorStop; 15] = [
    ColorStop::new(0.0, Color::rgb(0x62, 0x71, 0xb7)),
    ColorStop::new(0.1, Color::rgb(0x39, 0x61, 0x9f)),
    ColorStop::new(0.2, Color::rgb(0x4a, 0x94, 0xa9)),
    ColorStop::new(0.3, Color::rgb(0x4d, 0x8d, 0x7b)),
    ColorStop::new(0.4, Color::rgb(0x53, 0xa5, 0x53)),
    ColorStop::new(0.5, Color::rgb(0x35, 0x9f, 0x35)),
    ColorStop::new(0.6, Color::rgb(0xa7, 0x9d, 0x51)),
    ColorStop::new(0.65, Color::rgb(0x9f, 0x7f, 0x3a)),
    ColorStop::new(0.7, Color::rgb(0xa1, 0x6c, 0x5c)),
    ColorStop::new(0.75, Color::rgb(0x81, 0x3a, 0x4e)),
    ColorStop::new(0.8, Color::rgb(0xaf, 0x50, 0x88)),
    ColorStop::new(0.85, Color::rgb(0x75, 0x4a, 0x93)),
    ColorStop::new(0.9, Color::rgb(0x6d, 0x61, 0xa3)),
    ColorStop::new(0.95, Color::rgb(0x44, 0x69, 0x8d)),
    ColorStop::new(1.0, Color::rgb(0x5c, 0x90, 0x98)),
];

/// Ordered color stops spanning [0, 1].
///
/// Every value in [0, 1] falls between two stops, so lookups never miss.
#[derive(Debug, Clone, PartialEq)]
pub struct ColorRamp {
    stops: Vec<ColorStop>,
}

impl ColorRamp {
    /// Build a ramp, rejecting stops that do not cover [0, 1] monotonically.
    pub fn new(stops: Vec<ColorStop>) -> WindResult<Self> {
        if stops.len() < 2 {
            return Err(WindError::InvalidRamp(format!(
                "need at least 2 stops, got {}",
                stops.len()
            )));
        }
        if stops.iter().any(|s| !s.position.is_finite()) {
            return Err(WindError::InvalidRamp("non-finite stop position".into()));
        }
        if stops[0].position != 0.0 {
            return Err(WindError::InvalidRamp(format!(
                "first stop must be at 0, got {}",
                stops[0].position
            )));
        }
        let last = stops[stops.len() - 1].position;
        if last != 1.0 {
            return Err(WindError::InvalidRamp(format!(
                "last stop must be at 1, got {}",
                last
            )));
        }
        if let Some(pair) = stops.windows(2).find(|w| w[1].position < w[0].position) {
            return Err(WindError::InvalidRamp(format!(
                "stop positions decrease: {} after {}",
                pair[1].position, pair[0].position
            )));
        }

        Ok(Self { stops })
    }

    /// The default wind-speed palette.
    pub fn wind() -> Self {
        Self {
            stops: WIND_STOPS.to_vec(),
        }
    }

    pub fn stops(&self) -> &[ColorStop] {
        &self.stops
    }

    /// Color at normalized value `v`, clamped to [0, 1]. NaN reads as 0.
    ///
    /// Stop positions return the stop's exact color.
    pub fn color_at(&self, v: f32) -> Color {
        let v = if v.is_nan() { 0.0 } else { v.clamp(0.0, 1.0) };

        for pair in self.stops.windows(2) {
            let (lo, hi) = (pair[0], pair[1]);
            if v <= hi.position {
                let span = hi.position - lo.position;
                if span <= 0.0 {
                    return hi.color;
                }
                return interpolate_color(lo.color, hi.color, (v - lo.position) / span);
            }
        }

        self.stops[self.stops.len() - 1].color
    }

    /// Precompute [`LUT_SIZE`] samples; entry `i` is the color at `i / 255`.
    pub fn compile(&self) -> ColorLut {
        let table = (0..LUT_SIZE)
            .map(|i| self.color_at(i as f32 / (LUT_SIZE - 1) as f32))
            .collect();
        ColorLut { table }
    }
}

impl Default for ColorRamp {
    fn default() -> Self {
        Self::wind()
    }
}

/// Fixed-resolution lookup table compiled from a [`ColorRamp`].
#[derive(Debug, Clone, PartialEq)]
pub struct ColorLut {
    table: Vec<Color>,
}

impl ColorLut {
    /// Nearest table entry for normalized `v`.
    #[inline]
    pub fn sample(&self, v: f32) -> Color {
        let v = if v.is_nan() { 0.0 } else { v.clamp(0.0, 1.0) };
        let idx = (v * (LUT_SIZE - 1) as f32).round() as usize;
        self.table[idx.min(LUT_SIZE - 1)]
    }

    /// Color for a speed mapped through `(min, max)`.
    #[inline]
    pub fn sample_speed(&self, speed: f32, min: f32, max: f32) -> Color {
        self.sample(normalize(speed, min, max))
    }

    pub fn entries(&self) -> &[Color] {
        &self.table
    }
}

/// Map `value` into [0, 1] over `(min, max)`.
///
/// A degenerate range (under 0.001 wide) is widened to 1 so flat fields map to
/// the low end instead of dividing by zero.
#[inline]
pub fn normalize(value: f32, min: f32, max: f32) -> f32 {
    let range = max - min;
    let range = if range.abs() < 0.001 { 1.0 } else { range };
    ((value - min) / range).clamp(0.0, 1.0)
}
