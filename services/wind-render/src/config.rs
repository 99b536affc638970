//! Option, style and catalog loading for a render run.

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use renderer::style::StyleConfig;
use renderer::{ColorRamp, OptionsUpdate, RendererOptions};
use tracing::{debug, info};
use wind_common::{RasterSource, TimeSeriesCatalog, TimestampEntry};

/// `WIND_*` environment defaults, overridden by an optional JSON options file.
pub fn load_options(path: Option<&Path>) -> Result<RendererOptions> {
    let mut options = RendererOptions::from_env();

    if let Some(path) = path {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read options file {}", path.display()))?;
        let update = OptionsUpdate::from_json(&json)
            .with_context(|| format!("Failed to parse options file {}", path.display()))?;
        options = options.merged(&update);
        debug!(path = %path.display(), "Applied options file");
    }

    options.validate().context("Invalid renderer options")?;
    Ok(options)
}

/// A named ramp from a style file, plus the speed range it declares.
pub fn load_ramp(path: &Path, name: &str) -> Result<(ColorRamp, Option<(f32, f32)>)> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read style file {}", path.display()))?;
    let config = StyleConfig::from_json(&json)
        .with_context(|| format!("Failed to parse style file {}", path.display()))?;

    let style = config
        .get_style(name)
        .ok_or_else(|| anyhow!("Style '{}' not found in {}", name, path.display()))?;
    let ramp = style
        .to_ramp()
        .with_context(|| format!("Style '{}' is not a valid ramp", name))?;

    info!(style = name, stops = ramp.stops().len(), "Loaded color ramp");
    Ok((ramp, style.speed_range()))
}

pub fn load_catalog(path: &Path) -> Result<TimeSeriesCatalog> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read catalog {}", path.display()))?;
    let catalog = TimeSeriesCatalog::from_scan_json(&json)
        .with_context(|| format!("Failed to parse catalog {}", path.display()))?;
    info!(entries = catalog.len(), "Loaded wind catalog");
    Ok(catalog)
}

/// The entry labelled `timestamp`, or the one nearest to now.
pub fn select_entry<'a>(
    catalog: &'a TimeSeriesCatalog,
    timestamp: Option<&str>,
) -> Result<&'a TimestampEntry> {
    match timestamp {
        Some(label) => catalog
            .find(label)
            .ok_or_else(|| anyhow!("Timestamp '{}' not in catalog", label)),
        None => catalog
            .current()
            .ok_or_else(|| anyhow!("Catalog has no timestamps")),
    }
}

/// Source for explicit raster paths; without a v path the u file carries both bands.
pub fn source_from_files(u: &str, v: Option<&str>) -> RasterSource {
    match v {
        Some(v) => RasterSource::from_pair(u, v),
        None => RasterSource::Combined(u.to_string()),
    }
}
