//! Color ramp styles loaded from JSON.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use wind_common::{WindError, WindResult};

use crate::gradient::{Color, ColorRamp, ColorStop};

/// A set of named ramp styles loaded from JSON
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StyleConfig {
    pub version: String,
    pub styles: HashMap<String, RampStyle>,
}

/// A single ramp definition
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RampStyle {
    pub name: String,
    pub description: Option<String>,
    pub units: Option<String>,
    /// Speed range the ramp spans, `[min, max]` in the style's units.
    #[serde(default)]
    pub range: Option<[f32; 2]>,
    pub stops: Vec<StyleStop>,
}

/// Color stop as written in a style document
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StyleStop {
    pub position: f32,
    pub color: String,
    pub label: Option<String>,
}

impl StyleConfig {
    /// Load style configuration from JSON string
    pub fn from_json(json_str: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json_str)
    }

    /// Load style configuration from file
    pub fn from_file(path: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let content = std::fs::read_to_string(path)?;
        Ok(Self::from_json(&content)?)
    }

    /// Get a specific style definition
    pub fn get_style(&self, name: &str) -> Option<&RampStyle> {
        self.styles.get(name)
    }
}

impl RampStyle {
    pub fn from_json(json_str: &str) -> WindResult<Self> {
        serde_json::from_str(json_str).map_err(|e| WindError::InvalidRamp(e.to_string()))
    }

    /// Parse hex colors and validate into a [`ColorRamp`].
    pub fn to_ramp(&self) -> WindResult<ColorRamp> {
        let stops = self
            .stops
            .iter()
            .map(|stop| {
                let color = hex_to_color(&stop.color).ok_or_else(|| {
                    WindError::InvalidRamp(format!(
                        "style '{}': bad color '{}'",
                        self.name, stop.color
                    ))
                })?;
                Ok(ColorStop::new(stop.position, color))
            })
            .collect::<WindResult<Vec<_>>>()?;

        ColorRamp::new(stops)
    }

    /// Speed range of the style, if it declares one.
    pub fn speed_range(&self) -> Option<(f32, f32)> {
        self.range.map(|[min, max]| (min, max))
    }
}

/// Parse hex color string to RGB
pub fn hex_to_rgb(hex: &str) -> Option<(u8, u8, u8)> {
    let hex = hex.trim_start_matches('#');
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }

    let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
    let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
    let b = u8::from_str_radix(&hex[4..6], 16).ok()?;

    Some((r, g, b))
}

/// Parse `#rrggbb` (opaque) or `#rrggbbaa`.
pub fn hex_to_color(hex: &str) -> Option<Color> {
    let trimmed = hex.trim_start_matches('#');
    if trimmed.len() == 8 && trimmed.is_ascii() {
        let (r, g, b) = hex_to_rgb(&trimmed[0..6])?;
        let a = u8::from_str_radix(&trimmed[6..8], 16).ok()?;
        return Some(Color::new(r, g, b, a));
    }
    hex_to_rgb(hex).map(|(r, g, b)| Color::rgb(r, g, b))
}
