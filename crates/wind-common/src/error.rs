//! Error types for wind field decoding and rendering.

use thiserror::Error;

/// Result type alias using WindError.
pub type WindResult<T> = Result<T, WindError>;

/// Primary error type for the wind layer.
#[derive(Debug, Error)]
pub enum WindError {
    // === Load-time errors (fatal) ===
    #[error("Failed to decode raster: {0}")]
    Decode(String),

    #[error("Dimension mismatch: {message}")]
    DimensionMismatch { message: String },

    // === Recoverable errors ===
    #[error("Degenerate bounding box {bbox:?}, using full globe")]
    BoundsDegenerate { bbox: [f64; 4] },

    #[error("Failed to fetch raster '{locator}': {message}")]
    FetchFailure { locator: String, message: String },

    // === Render context errors ===
    #[error("Render resource error: {0}")]
    GpuResource(String),

    #[error("Renderer has been destroyed")]
    Destroyed,

    // === Configuration errors ===
    #[error("Invalid value for option '{name}': {message}")]
    InvalidOption { name: String, message: String },

    #[error("Invalid color ramp: {0}")]
    InvalidRamp(String),

    #[error("Catalog error: {0}")]
    Catalog(String),
}

impl WindError {
    /// Create a Decode error.
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    /// Create a DimensionMismatch error.
    pub fn dimension_mismatch(msg: impl Into<String>) -> Self {
        Self::DimensionMismatch {
            message: msg.into(),
        }
    }

    /// Create a FetchFailure error.
    pub fn fetch_failure(locator: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::FetchFailure {
            locator: locator.into(),
            message: msg.into(),
        }
    }

    /// Create a GpuResource error.
    pub fn gpu_resource(msg: impl Into<String>) -> Self {
        Self::GpuResource(msg.into())
    }

    /// Create an InvalidOption error.
    pub fn invalid_option(name: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::InvalidOption {
            name: name.into(),
            message: msg.into(),
        }
    }

    /// Whether the wind layer can keep running in a degraded state after this error.
    ///
    /// Recoverable errors are handled inside the load path (full-globe bounds,
    /// zero-filled field); everything else leaves the layer absent.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            WindError::BoundsDegenerate { .. } | WindError::FetchFailure { .. }
        )
    }
}

impl From<serde_json::Error> for WindError {
    fn from(err: serde_json::Error) -> Self {
        WindError::Catalog(format!("JSON error: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recoverable_classification() {
        assert!(WindError::BoundsDegenerate { bbox: [0.0; 4] }.is_recoverable());
        assert!(WindError::fetch_failure("u.tif", "timeout").is_recoverable());
        assert!(!WindError::decode("bad magic").is_recoverable());
        assert!(!WindError::dimension_mismatch("3x3 vs 4x4").is_recoverable());
        assert!(!WindError::gpu_resource("no float textures").is_recoverable());
        assert!(!WindError::Destroyed.is_recoverable());
    }

    #[test]
    fn test_error_messages() {
        let err = WindError::invalid_option("fadeOpacity", "must be in (0, 1)");
        assert_eq!(
            err.to_string(),
            "Invalid value for option 'fadeOpacity': must be in (0, 1)"
        );
    }
}
