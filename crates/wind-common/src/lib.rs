//! Common types shared by the wind decoding and rendering crates.

pub mod bbox;
pub mod error;
pub mod grid;
pub mod time;

pub use bbox::{normalize_bounds, BoundsNormalizer, GeoBounds, NormalizedBounds};
pub use error::{WindError, WindResult};
pub use grid::{DataQuality, GridShape, VectorFieldGrid};
pub use time::{RasterSource, TimeSeriesCatalog, TimestampEntry};
