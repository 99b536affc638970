//! Error types for GeoTIFF decoding.

use thiserror::Error;
use wind_common::WindError;

/// Result type for GeoTIFF parser operations.
pub type GeoTiffResult<T> = Result<T, GeoTiffError>;

/// Error types for GeoTIFF decoding.
#[derive(Error, Debug)]
pub enum GeoTiffError {
    /// Unrecognized or malformed container
    #[error("Invalid raster: {0}")]
    Decode(String),

    /// Bands or files disagree on width/height
    #[error("Band size mismatch: {0}")]
    BandMismatch(String),

    /// Error surfaced by the TIFF decoder
    #[error("TIFF error: {0}")]
    Tiff(#[from] tiff::TiffError),
}

impl GeoTiffError {
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    pub fn band_mismatch(msg: impl Into<String>) -> Self {
        Self::BandMismatch(msg.into())
    }
}

impl From<GeoTiffError> for WindError {
    fn from(err: GeoTiffError) -> Self {
        match err {
            GeoTiffError::BandMismatch(msg) => WindError::dimension_mismatch(msg),
            GeoTiffError::Decode(msg) => WindError::decode(msg),
            GeoTiffError::Tiff(e) => WindError::decode(e.to_string()),
        }
    }
}
