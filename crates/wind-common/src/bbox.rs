//! Geographic bounding boxes and their normalization into a renderable domain.

use serde::{Deserialize, Serialize};

use crate::error::WindError;

/// Longitude limit in degrees.
pub const MAX_LONGITUDE: f64 = 180.0;

/// Practical Web Mercator latitude limit in degrees.
pub const MAX_LATITUDE: f64 = 85.0;

/// A geographic extent in degrees, ordered [west, south, east, north].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoBounds {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
}

impl GeoBounds {
    /// Full-globe coverage within the Mercator latitude limit.
    pub const GLOBAL: GeoBounds = GeoBounds {
        west: -MAX_LONGITUDE,
        south: -MAX_LATITUDE,
        east: MAX_LONGITUDE,
        north: MAX_LATITUDE,
    };

    pub fn new(west: f64, south: f64, east: f64, north: f64) -> Self {
        Self {
            west,
            south,
            east,
            north,
        }
    }

    /// Build from a `[west, south, east, north]` array.
    pub fn from_array(bbox: [f64; 4]) -> Self {
        Self::new(bbox[0], bbox[1], bbox[2], bbox[3])
    }

    pub fn to_array(&self) -> [f64; 4] {
        [self.west, self.south, self.east, self.north]
    }

    /// Longitudinal extent in degrees.
    pub fn width(&self) -> f64 {
        self.east - self.west
    }

    /// Latitudinal extent in degrees.
    pub fn height(&self) -> f64 {
        self.north - self.south
    }

    pub fn contains_point(&self, lon: f64, lat: f64) -> bool {
        lon >= self.west && lon <= self.east && lat >= self.south && lat <= self.north
    }

    /// Corner coordinates as `[lon, lat]` pairs in image-source order:
    /// top-left, top-right, bottom-right, bottom-left.
    ///
    /// Row 0 of a rendered overlay sits on the `north` edge, so no flip is needed.
    pub fn corners(&self) -> [[f64; 2]; 4] {
        [
            [self.west, self.north],
            [self.east, self.north],
            [self.east, self.south],
            [self.west, self.south],
        ]
    }

    /// True when the bounds satisfy every renderable-domain invariant.
    pub fn is_renderable(&self) -> bool {
        let coords_ok = self.to_array().iter().all(|c| c.is_finite());
        coords_ok
            && self.west < self.east
            && self.south < self.north
            && self.west >= -MAX_LONGITUDE
            && self.east <= MAX_LONGITUDE
            && self.south >= -MAX_LATITUDE
            && self.north <= MAX_LATITUDE
    }
}

impl Default for GeoBounds {
    fn default() -> Self {
        Self::GLOBAL
    }
}

/// Result of normalizing a raw bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormalizedBounds {
    pub bounds: GeoBounds,
    /// Set when the input could not be clamped into a valid box and the
    /// full-globe fallback was used instead.
    pub degenerate: bool,
    /// The extent as it was passed in.
    pub raw: [f64; 4],
}

impl NormalizedBounds {
    /// The recoverable error behind a fallback, `None` when the input was usable.
    pub fn fallback_error(&self) -> Option<WindError> {
        self.degenerate
            .then(|| WindError::BoundsDegenerate { bbox: self.raw })
    }
}

/// Clamps raw raster extents into the renderable domain.
///
/// Unlike raster decoding, normalization never fails: bbox metadata is often
/// missing or corrupt while the pixel data is fine, so an unusable box falls
/// back to [`GeoBounds::GLOBAL`].
#[derive(Debug, Clone, Copy)]
pub struct BoundsNormalizer {
    pub max_longitude: f64,
    pub max_latitude: f64,
}

impl Default for BoundsNormalizer {
    fn default() -> Self {
        Self {
            max_longitude: MAX_LONGITUDE,
            max_latitude: MAX_LATITUDE,
        }
    }
}

impl BoundsNormalizer {
    pub fn normalize(&self, raw: [f64; 4]) -> NormalizedBounds {
        if raw.iter().any(|c| !c.is_finite()) {
            return Self::fallback(raw);
        }

        let [west, south, east, north] = raw;
        let lon = self.max_longitude;
        let lat = self.max_latitude;

        let west = west.clamp(-lon, lon);
        let east = east.clamp(-lon, lon);
        let south = south.clamp(-lat, lat);
        let north = north.clamp(-lat, lat);

        if west >= east || south >= north {
            return Self::fallback(raw);
        }

        NormalizedBounds {
            bounds: GeoBounds::new(west, south, east, north),
            degenerate: false,
            raw,
        }
    }

    fn fallback(raw: [f64; 4]) -> NormalizedBounds {
        NormalizedBounds {
            bounds: GeoBounds::GLOBAL,
            degenerate: true,
            raw,
        }
    }
}

/// Normalize with the default Mercator limits, logging a warning on fallback.
pub fn normalize_bounds(raw: [f64; 4]) -> NormalizedBounds {
    let normalized = BoundsNormalizer::default().normalize(raw);
    if let Some(err) = normalized.fallback_error() {
        tracing::warn!(bbox = ?raw, error = %err, "Invalid bbox, using global coverage");
    }
    normalized
}
