//! `WindRenderer`: the single owner of grids, particles, surfaces and options.
//!
//! All interaction goes through its typed operations. Grid replacements are
//! staged and only promoted at the start of the next `render` call, so a
//! frame never sees two different fields.

use std::sync::Arc;
use tracing::{debug, info};
use wind_common::{GridShape, RasterSource, VectorFieldGrid, WindError, WindResult};

use crate::compositing::{CompositingPipeline, RenderSurface, SpriteStyle};
use crate::context::{RenderContext, ResourceKind};
use crate::gradient::ColorRamp;
use crate::loader::FieldLoader;
use crate::options::{OptionsUpdate, RendererOptions};
use crate::overlay::{OverlayImage, StaticRasterRenderer};
use crate::particles::{ParticleSimulator, ParticleState, TickStats};

/// Generation number handed out when a load starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct LoadTicket(u64);

impl LoadTicket {
    pub fn generation(&self) -> u64 {
        self.0
    }
}

/// What happened to a completed load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The grid will become active at the next frame.
    Staged,
    /// Identical to the active or staged grid; nothing changed.
    Unchanged,
    /// A newer load was started; the grid was dropped.
    Stale,
}

/// Per-frame summary.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FrameStats {
    pub frame: u64,
    /// `None` when no field was loaded and the frame only faded.
    pub tick: Option<TickStats>,
    pub swapped_grid: bool,
}

/// Particle buffers and trail surfaces, dropped on destroy.
#[derive(Debug)]
struct FrameBuffers {
    simulator: ParticleSimulator,
    pipeline: CompositingPipeline,
}

#[derive(Debug)]
pub struct WindRenderer {
    context: RenderContext,
    options: RendererOptions,
    ramp: ColorRamp,
    overlay: StaticRasterRenderer,
    /// `None` once destroyed.
    buffers: Option<FrameBuffers>,
    active: Option<Arc<VectorFieldGrid>>,
    pending: Option<Arc<VectorFieldGrid>>,
    generation: u64,
    frame: u64,
    last_frame: FrameStats,
}

impl WindRenderer {
    /// Allocate surfaces and particles on `context`.
    pub fn new(
        mut context: RenderContext,
        options: RendererOptions,
        width: u32,
        height: u32,
    ) -> WindResult<Self> {
        options.validate()?;
        context.check_surface(width, height)?;
        context.check_particles(options.num_particles)?;

        let pipeline = CompositingPipeline::new(width, height)?;
        context.acquire(ResourceKind::Surface, 2);
        let simulator = ParticleSimulator::new(options.num_particles, options.simulation_params());
        context.acquire(ResourceKind::ParticleBuffer, 2);

        let ramp = ColorRamp::wind();
        let overlay = StaticRasterRenderer::new(&ramp).with_opacity(options.opacity);

        info!(
            width = width,
            height = height,
            particles = options.num_particles,
            "Wind renderer created"
        );

        Ok(Self {
            context,
            options,
            ramp,
            overlay,
            buffers: Some(FrameBuffers {
                simulator,
                pipeline,
            }),
            active: None,
            pending: None,
            generation: 0,
            frame: 0,
            last_frame: FrameStats::default(),
        })
    }

    /// Replace the particle simulator with a seeded one, for reproducible output.
    pub fn with_seed(mut self, seed: u64) -> Self {
        if let Some(buffers) = self.buffers.as_mut() {
            buffers.simulator = ParticleSimulator::with_seed(
                self.options.num_particles,
                self.options.simulation_params(),
                seed,
            );
        }
        self
    }

    /// Use a different color ramp for the overlay and speed-colored particles.
    pub fn set_ramp(&mut self, ramp: ColorRamp) {
        self.overlay.set_ramp(&ramp);
        self.ramp = ramp;
    }

    // ------------------------------------------------------------------
    // Loading
    // ------------------------------------------------------------------

    /// Stage `grid` to replace the active one at the next frame.
    ///
    /// Loading the grid that is already active (or staged) is a no-op.
    /// Any in-flight [`LoadTicket`] becomes stale.
    pub fn load(&mut self, grid: VectorFieldGrid) -> WindResult<LoadOutcome> {
        self.ensure_alive()?;
        self.context.check_field(&grid.shape())?;
        self.generation += 1;
        Ok(self.stage(grid))
    }

    /// Build a grid from components and stage it.
    pub fn load_components(
        &mut self,
        width: usize,
        height: usize,
        bbox: [f64; 4],
        u: Vec<f32>,
        v: Vec<f32>,
    ) -> WindResult<LoadOutcome> {
        self.ensure_alive()?;
        let normalized = wind_common::normalize_bounds(bbox);
        let grid = VectorFieldGrid::new(width, height, normalized.bounds, u, v)?
            .with_bounds_fallback(normalized.degenerate);
        self.load(grid)
    }

    /// Decode raster bytes and stage the result.
    ///
    /// A decode or dimension error leaves the current grid untouched.
    pub fn load_rasters(&mut self, u_bytes: &[u8], v_bytes: Option<&[u8]>) -> WindResult<LoadOutcome> {
        self.ensure_alive()?;
        let grid = geotiff_parser::decode_vector_field(u_bytes, v_bytes)?;
        self.load(grid)
    }

    /// Start an out-of-band load; only the newest ticket may stage a grid.
    pub fn begin_load(&mut self) -> LoadTicket {
        self.generation += 1;
        debug!(generation = self.generation, "Load started");
        LoadTicket(self.generation)
    }

    /// Finish a load started with [`begin_load`](Self::begin_load).
    ///
    /// A failed load surfaces its error but keeps the current grid.
    pub fn complete_load(
        &mut self,
        ticket: LoadTicket,
        result: WindResult<VectorFieldGrid>,
    ) -> WindResult<LoadOutcome> {
        self.ensure_alive()?;
        if ticket.0 != self.generation {
            debug!(
                ticket = ticket.0,
                current = self.generation,
                "Dropping stale wind load"
            );
            return Ok(LoadOutcome::Stale);
        }

        let grid = result?;
        self.context.check_field(&grid.shape())?;
        Ok(self.stage(grid))
    }

    /// Fetch, decode and stage `source`, substituting a calm field on fetch failure.
    ///
    /// Holds `&mut self` across the await; callers that must keep rendering
    /// meanwhile use `begin_load` / `complete_load` around [`FieldLoader::load`].
    pub async fn load_source(
        &mut self,
        loader: &FieldLoader,
        source: &RasterSource,
    ) -> WindResult<LoadOutcome> {
        self.ensure_alive()?;
        let ticket = self.begin_load();
        let result = loader.load(source, self.grid_shape()).await;
        self.complete_load(ticket, result)
    }

    fn stage(&mut self, grid: VectorFieldGrid) -> LoadOutcome {
        let same_as = |slot: &Option<Arc<VectorFieldGrid>>| slot.as_deref() == Some(&grid);
        if same_as(&self.pending) || (self.pending.is_none() && same_as(&self.active)) {
            return LoadOutcome::Unchanged;
        }

        if self.pending.is_none() {
            self.context.acquire(ResourceKind::Field, 1);
        }
        debug!(
            width = grid.width(),
            height = grid.height(),
            generation = self.generation,
            "Staged wind field"
        );
        self.pending = Some(Arc::new(grid));
        LoadOutcome::Staged
    }

    /// Activate the staged grid between frames without drawing.
    ///
    /// Returns whether a grid was staged. The next `render` then reports no swap.
    pub fn commit_pending(&mut self) -> WindResult<bool> {
        self.ensure_alive()?;
        let swapped = self.promote_pending();
        if swapped {
            debug!(generation = self.generation, "Committed staged wind field");
        }
        Ok(swapped)
    }

    /// Promote the staged grid; called at frame boundaries only.
    fn promote_pending(&mut self) -> bool {
        let Some(next) = self.pending.take() else {
            return false;
        };

        let next_bounds = next.bounds();
        if let Some(previous) = self.active.replace(next) {
            self.context.release(ResourceKind::Field, 1);
            if previous.bounds() != next_bounds {
                // Trails drawn over a different extent no longer line up.
                if let Some(buffers) = self.buffers.as_mut() {
                    buffers.pipeline.clear();
                }
            }
        }
        true
    }

    // ------------------------------------------------------------------
    // Configuration
    // ------------------------------------------------------------------

    /// Validate and apply a partial options update; nothing changes on error.
    pub fn configure(&mut self, update: &OptionsUpdate) -> WindResult<()> {
        let Some(buffers) = self.buffers.as_mut() else {
            return Err(WindError::Destroyed);
        };
        let next = self.options.merged(update);
        next.validate()?;
        if next.num_particles != self.options.num_particles {
            self.context.check_particles(next.num_particles)?;
        }

        buffers.simulator.set_params(next.simulation_params());
        if next.num_particles != self.options.num_particles {
            buffers.simulator.set_count(next.num_particles);
            debug!(particles = next.num_particles, "Particle buffer reinitialized");
        }
        self.overlay.set_opacity(next.opacity);
        self.options = next;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Per-frame
    // ------------------------------------------------------------------

    /// Advance the simulation by `dt` seconds and composite a frame.
    pub fn render(&mut self, dt: f32) -> WindResult<&RenderSurface> {
        self.ensure_alive()?;
        let swapped = self.promote_pending();
        self.frame += 1;

        let fade = self.options.fade_opacity;
        let style = self.sprite_style();
        let Some(buffers) = self.buffers.as_mut() else {
            return Err(WindError::Destroyed);
        };
        let tick = match self.active.clone() {
            Some(grid) => {
                let stats = buffers.simulator.step(&grid, dt);
                buffers
                    .pipeline
                    .composite(buffers.simulator.particles(), &grid, &style, fade);
                Some(stats)
            }
            None => {
                debug!(frame = self.frame, "No wind field loaded, fading only");
                buffers.pipeline.fade_only(fade);
                None
            }
        };

        self.last_frame = FrameStats {
            frame: self.frame,
            tick,
            swapped_grid: swapped,
        };
        Ok(buffers.pipeline.current())
    }

    /// Static overlay of the active grid, or `None` before the first frame with a grid.
    pub fn render_overlay(&self) -> WindResult<Option<OverlayImage>> {
        self.ensure_alive()?;
        Ok(self
            .active
            .as_ref()
            .map(|grid| self.overlay.render(grid, self.options.speed_range())))
    }

    /// Reallocate surfaces; existing trails are dropped.
    pub fn resize(&mut self, width: u32, height: u32) -> WindResult<()> {
        let Some(buffers) = self.buffers.as_mut() else {
            return Err(WindError::Destroyed);
        };
        self.context.check_surface(width, height)?;
        buffers.pipeline.resize(width, height)?;
        debug!(width = width, height = height, "Resized wind surfaces");
        Ok(())
    }

    /// Release every owned resource. Later calls other than `destroy` fail with `Destroyed`.
    pub fn destroy(&mut self) {
        let Some(buffers) = self.buffers.take() else {
            return;
        };
        drop(buffers);

        let fields = self.active.take().is_some() as usize + self.pending.take().is_some() as usize;
        self.context.release(ResourceKind::Field, fields);
        self.context.release(ResourceKind::Surface, 2);
        self.context.release(ResourceKind::ParticleBuffer, 2);
        info!(frames = self.frame, "Wind renderer destroyed");
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn grid(&self) -> Option<&VectorFieldGrid> {
        self.active.as_deref()
    }

    /// Shape of the newest known grid (staged or active).
    pub fn grid_shape(&self) -> Option<GridShape> {
        self.pending
            .as_ref()
            .or(self.active.as_ref())
            .map(|g| g.shape())
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Current particles; empty once destroyed.
    pub fn particles(&self) -> &[ParticleState] {
        match &self.buffers {
            Some(buffers) => buffers.simulator.particles(),
            None => &[],
        }
    }

    pub fn ramp(&self) -> &ColorRamp {
        &self.ramp
    }

    pub fn options(&self) -> &RendererOptions {
        &self.options
    }

    pub fn context(&self) -> &RenderContext {
        &self.context
    }

    pub fn surface(&self) -> Option<&RenderSurface> {
        self.buffers.as_ref().map(|b| b.pipeline.current())
    }

    pub fn last_frame(&self) -> FrameStats {
        self.last_frame
    }

    pub fn is_destroyed(&self) -> bool {
        self.buffers.is_none()
    }

    fn ensure_alive(&self) -> WindResult<()> {
        if self.is_destroyed() {
            Err(WindError::Destroyed)
        } else {
            Ok(())
        }
    }

    fn sprite_style(&self) -> SpriteStyle {
        SpriteStyle {
            point_size: self.options.point_size,
            opacity: self.options.opacity,
            max_age: self.options.particle_max_age,
            speed_colors: self.options.color_by_speed.then(|| self.overlay.lut().clone()),
            speed_range: self.options.speed_range(),
        }
    }
}
