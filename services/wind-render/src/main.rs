//! Wind field render tool.
//!
//! Loads one timestamp of u/v rasters and writes:
//! - `overlay.png` and `overlay.json`: the static speed overlay and its corners
//! - `frame_NNNN.png`: animated particle frames

mod config;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use chrono::NaiveDateTime;
use clap::Parser;
use renderer::loader::{FieldLoader, FsFetcher, HttpFetcher, RasterFetcher};
use renderer::{ContextLimits, OptionsUpdate, RenderContext, WindRenderer};
use tracing::{debug, info, warn, Level};
use tracing_subscriber::FmtSubscriber;
use wind_common::time::LABEL_FORMAT;
use wind_common::RasterSource;

#[derive(Parser, Debug)]
#[command(name = "wind-render")]
#[command(about = "Render wind overlays and particle animations to PNG")]
struct Args {
    /// Raster scan listing (JSON) to pick a timestamp from
    #[arg(long, conflicts_with = "u_file")]
    catalog: Option<PathBuf>,

    /// Catalog label to render, e.g. "2024-09-05 06:00"
    #[arg(long, requires = "catalog")]
    timestamp: Option<String>,

    /// Render the catalog entry nearest to this time ("YYYY-MM-DD HH:MM")
    #[arg(long, requires = "catalog", conflicts_with = "timestamp")]
    at: Option<String>,

    /// Print the catalog's display window and exit
    #[arg(long, requires = "catalog")]
    list: bool,

    /// u raster (or combined u/v raster without --v-file)
    #[arg(long)]
    u_file: Option<String>,

    /// v raster
    #[arg(long, requires = "u_file")]
    v_file: Option<String>,

    /// Directory raster locators are resolved against
    #[arg(long, env = "WIND_DATA_DIR", default_value = ".")]
    data_dir: PathBuf,

    /// Fetch rasters over HTTP from this base URL instead of the data directory
    #[arg(long, env = "WIND_DATA_URL")]
    base_url: Option<String>,

    /// Per-file fetch timeout in seconds
    #[arg(long, default_value = "30")]
    timeout_secs: u64,

    /// Output surface width in pixels
    #[arg(long, default_value = "1024")]
    width: u32,

    /// Output surface height in pixels
    #[arg(long, default_value = "512")]
    height: u32,

    /// Number of particle frames to write
    #[arg(long, default_value = "60")]
    frames: u32,

    /// Seconds advanced per frame
    #[arg(long, default_value = "0.016")]
    dt: f32,

    /// Renderer options (camelCase JSON), applied over WIND_* environment defaults
    #[arg(long)]
    options: Option<PathBuf>,

    /// Style file holding color ramps
    #[arg(long)]
    style: Option<PathBuf>,

    /// Ramp to use from the style file
    #[arg(long, default_value = "wind", requires = "style")]
    style_name: String,

    /// Seed for reproducible particle placement
    #[arg(long)]
    seed: Option<u64>,

    /// Output directory
    #[arg(short, long, default_value = "wind-output")]
    out_dir: PathBuf,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment from .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // Initialize tracing
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let builder = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true);
    if args.json_logs {
        tracing::subscriber::set_global_default(builder.json().finish())?;
    } else {
        tracing::subscriber::set_global_default(builder.finish())?;
    }

    let source = match resolve_source(&args)? {
        Some(source) => source,
        None => return Ok(()),
    };

    let mut options = config::load_options(args.options.as_deref())?;
    let ramp = match &args.style {
        Some(path) => {
            let (ramp, range) = config::load_ramp(path, &args.style_name)?;
            if let Some((min, max)) = range {
                options = options.merged(&OptionsUpdate {
                    speed_range: Some([min, max]),
                    ..Default::default()
                });
                options.validate().context("Style speed range is invalid")?;
            }
            Some(ramp)
        }
        None => None,
    };

    let fetcher: Arc<dyn RasterFetcher> = match &args.base_url {
        Some(url) => {
            info!(base_url = %url, "Fetching rasters over HTTP");
            Arc::new(HttpFetcher::new(url.clone()))
        }
        None => {
            info!(data_dir = %args.data_dir.display(), "Reading rasters from disk");
            Arc::new(FsFetcher::new(args.data_dir.clone()))
        }
    };
    let loader = FieldLoader::new(fetcher).with_timeout(Duration::from_secs(args.timeout_secs));

    let context = RenderContext::new(ContextLimits::default())?;
    let mut renderer = WindRenderer::new(context, options, args.width, args.height)
        .context("Failed to create wind renderer")?;
    if let Some(seed) = args.seed {
        renderer = renderer.with_seed(seed);
    }
    if let Some(ramp) = ramp {
        renderer.set_ramp(ramp);
    }

    renderer
        .load_source(&loader, &source)
        .await
        .with_context(|| format!("Failed to load wind field from {:?}", source.locators()))?;

    tokio::fs::create_dir_all(&args.out_dir)
        .await
        .with_context(|| format!("Failed to create {}", args.out_dir.display()))?;

    // The overlay depends only on the field, so it is written once up front.
    renderer.commit_pending()?;
    write_overlay(&renderer, &args.out_dir).await?;

    let started = Instant::now();
    let mut written = 0u32;
    for frame in 0..args.frames {
        // Per-frame failures are logged and skipped.
        let png = match renderer.render(args.dt) {
            Ok(surface) => surface.to_png(),
            Err(e) => {
                warn!(frame = frame, error = %e, "Frame render failed");
                continue;
            }
        };

        match png {
            Ok(bytes) => {
                let path = args.out_dir.join(format!("frame_{:04}.png", frame));
                tokio::fs::write(&path, bytes)
                    .await
                    .with_context(|| format!("Failed to write {}", path.display()))?;
                written += 1;
            }
            Err(e) => warn!(frame = frame, error = %e, "Frame encoding failed"),
        }

        if let Some(tick) = renderer.last_frame().tick {
            debug!(
                frame = frame,
                advanced = tick.advanced,
                reseeded = tick.reseeded,
                "Frame rendered"
            );
        }
    }

    renderer.destroy();

    info!(
        frames = written,
        elapsed_ms = started.elapsed().as_millis() as u64,
        live_resources = renderer.context().counts().total(),
        out_dir = %args.out_dir.display(),
        "Render complete"
    );

    Ok(())
}

/// Raster source from explicit files or the catalog; `None` after `--list`.
fn resolve_source(args: &Args) -> Result<Option<RasterSource>> {
    if let Some(u) = &args.u_file {
        return Ok(Some(config::source_from_files(u, args.v_file.as_deref())));
    }

    let Some(path) = &args.catalog else {
        bail!("Either --catalog or --u-file is required");
    };
    let catalog = config::load_catalog(path)?;

    if args.list {
        for entry in catalog.compute_display_window() {
            println!("{}\t{}", entry.label(), entry.source().locators().join(" "));
        }
        return Ok(None);
    }

    let entry = match &args.at {
        Some(at) => {
            let time = NaiveDateTime::parse_from_str(at, LABEL_FORMAT)
                .with_context(|| format!("Invalid --at time '{}', expected {}", at, LABEL_FORMAT))?;
            catalog
                .nearest_to(time)
                .context("Catalog has no timestamps")?
        }
        None => config::select_entry(&catalog, args.timestamp.as_deref())?,
    };

    info!(timestamp = entry.label(), "Selected wind timestamp");
    Ok(Some(entry.source().clone()))
}

async fn write_overlay(renderer: &WindRenderer, out_dir: &Path) -> Result<()> {
    let Some(overlay) = renderer.render_overlay()? else {
        return Ok(());
    };

    let png = overlay.to_png().context("Failed to encode overlay")?;
    tokio::fs::write(out_dir.join("overlay.png"), png).await?;

    let placement = serde_json::to_string_pretty(&overlay.placement())?;
    tokio::fs::write(out_dir.join("overlay.json"), placement).await?;

    info!(
        width = overlay.width,
        height = overlay.height,
        bbox = ?overlay.bounds.to_array(),
        "Wrote static overlay"
    );
    Ok(())
}
