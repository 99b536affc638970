//! Asynchronous raster loading.
//!
//! Fetch failures and timeouts degrade to a calm, zero-filled field so the
//! render loop keeps running; decode and dimension errors are fatal and
//! propagate to the caller.

use async_trait::async_trait;
use bytes::Bytes;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use wind_common::{GeoBounds, GridShape, RasterSource, VectorFieldGrid, WindError, WindResult};

/// Default per-file fetch timeout.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Supplies raw raster bytes by locator.
#[async_trait]
pub trait RasterFetcher: Send + Sync {
    async fn fetch(&self, locator: &str) -> WindResult<Bytes>;
}

/// Reads rasters from a local directory.
#[derive(Debug, Clone)]
pub struct FsFetcher {
    root: PathBuf,
}

impl FsFetcher {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl RasterFetcher for FsFetcher {
    async fn fetch(&self, locator: &str) -> WindResult<Bytes> {
        let path = self.root.join(locator);
        let data = tokio::fs::read(&path)
            .await
            .map_err(|e| WindError::fetch_failure(path.display().to_string(), e.to_string()))?;
        Ok(Bytes::from(data))
    }
}

/// Fetches rasters over HTTP relative to a base URL.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    base_url: String,
}

impl HttpFetcher {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }

    fn url_for(&self, locator: &str) -> String {
        if locator.starts_with("http://") || locator.starts_with("https://") {
            return locator.to_string();
        }
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            locator.trim_start_matches('/')
        )
    }
}

#[async_trait]
impl RasterFetcher for HttpFetcher {
    async fn fetch(&self, locator: &str) -> WindResult<Bytes> {
        let url = self.url_for(locator);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| WindError::fetch_failure(&url, e.to_string()))?;

        response
            .bytes()
            .await
            .map_err(|e| WindError::fetch_failure(&url, e.to_string()))
    }
}

/// Fetches and decodes the rasters behind a catalog entry.
#[derive(Clone)]
pub struct FieldLoader {
    fetcher: Arc<dyn RasterFetcher>,
    timeout: Duration,
}

impl FieldLoader {
    pub fn new(fetcher: Arc<dyn RasterFetcher>) -> Self {
        Self {
            fetcher,
            timeout: DEFAULT_FETCH_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Load a grid, substituting a zero field of `known_shape` (or a 1x1
    /// global field) when fetching fails.
    pub async fn load(
        &self,
        source: &RasterSource,
        known_shape: Option<GridShape>,
    ) -> WindResult<VectorFieldGrid> {
        match self.load_strict(source).await {
            Err(err @ WindError::FetchFailure { .. }) => {
                let shape =
                    known_shape.unwrap_or_else(|| GridShape::new(1, 1, GeoBounds::GLOBAL));
                warn!(
                    error = %err,
                    width = shape.width,
                    height = shape.height,
                    "Wind raster unavailable, substituting calm field"
                );
                Ok(VectorFieldGrid::zero_filled(shape))
            }
            other => other,
        }
    }

    /// Load a grid, surfacing fetch failures instead of substituting.
    pub async fn load_strict(&self, source: &RasterSource) -> WindResult<VectorFieldGrid> {
        let (u_bytes, v_bytes) = match source {
            RasterSource::Combined(locator) => (self.fetch(locator).await?, None),
            RasterSource::Split { u, v } => {
                let (u, v) = futures::join!(self.fetch(u), self.fetch(v));
                (u?, Some(v?))
            }
        };

        debug!(
            u_bytes = u_bytes.len(),
            v_bytes = v_bytes.as_ref().map(|b| b.len()),
            "Fetched wind rasters"
        );

        let grid = tokio::task::spawn_blocking(move || {
            geotiff_parser::decode_vector_field(&u_bytes, v_bytes.as_deref())
        })
        .await
        .map_err(|e| WindError::decode(format!("decode task failed: {}", e)))??;

        info!(
            width = grid.width(),
            height = grid.height(),
            quality = ?grid.quality(),
            "Loaded wind field"
        );
        Ok(grid)
    }

    async fn fetch(&self, locator: &str) -> WindResult<Bytes> {
        match tokio::time::timeout(self.timeout, self.fetcher.fetch(locator)).await {
            Ok(result) => result,
            Err(_) => Err(WindError::fetch_failure(
                locator,
                format!("timed out after {:?}", self.timeout),
            )),
        }
    }
}

impl std::fmt::Debug for FieldLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldLoader")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}
