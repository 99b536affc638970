//! Explicit render context: allocation limits and live-resource accounting.
//!
//! Surfaces, field copies and particle buffers are allocated through the
//! context so oversize requests fail up front with `GpuResource` and
//! teardown can be checked by counting what is still alive.

use tracing::{debug, info};
use wind_common::{GridShape, WindError, WindResult};

/// Capabilities of the render target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContextLimits {
    /// Largest width or height of a surface, in pixels.
    pub max_surface_dimension: u32,
    /// Largest wind field, in cells.
    pub max_field_cells: usize,
    pub max_particles: usize,
    /// Whether float-valued field storage is available.
    pub float_fields: bool,
}

impl Default for ContextLimits {
    fn default() -> Self {
        Self {
            max_surface_dimension: 8192,
            max_field_cells: 4096 * 4096,
            max_particles: 1 << 20,
            float_fields: true,
        }
    }
}

/// Kinds of resources the context accounts for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Surface,
    Field,
    ParticleBuffer,
}

/// Number of live resources per kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResourceCounts {
    pub surfaces: usize,
    pub fields: usize,
    pub particle_buffers: usize,
}

impl ResourceCounts {
    pub fn total(&self) -> usize {
        self.surfaces + self.fields + self.particle_buffers
    }

    fn slot(&mut self, kind: ResourceKind) -> &mut usize {
        match kind {
            ResourceKind::Surface => &mut self.surfaces,
            ResourceKind::Field => &mut self.fields,
            ResourceKind::ParticleBuffer => &mut self.particle_buffers,
        }
    }
}

#[derive(Debug)]
pub struct RenderContext {
    limits: ContextLimits,
    counts: ResourceCounts,
}

impl RenderContext {
    /// Fails when the limits cannot host a wind field at all.
    pub fn new(limits: ContextLimits) -> WindResult<Self> {
        if !limits.float_fields {
            return Err(WindError::gpu_resource(
                "float field storage is not supported",
            ));
        }
        if limits.max_surface_dimension == 0 || limits.max_field_cells == 0 {
            return Err(WindError::gpu_resource(format!(
                "unusable limits: surface {} px, field {} cells",
                limits.max_surface_dimension, limits.max_field_cells
            )));
        }

        info!(
            max_surface = limits.max_surface_dimension,
            max_field_cells = limits.max_field_cells,
            max_particles = limits.max_particles,
            "Render context created"
        );

        Ok(Self {
            limits,
            counts: ResourceCounts::default(),
        })
    }

    pub fn limits(&self) -> &ContextLimits {
        &self.limits
    }

    pub fn counts(&self) -> ResourceCounts {
        self.counts
    }

    pub fn check_surface(&self, width: u32, height: u32) -> WindResult<()> {
        let max = self.limits.max_surface_dimension;
        if width == 0 || height == 0 || width > max || height > max {
            return Err(WindError::gpu_resource(format!(
                "surface {}x{} outside 1..={}",
                width, height, max
            )));
        }
        Ok(())
    }

    pub fn check_field(&self, shape: &GridShape) -> WindResult<()> {
        if shape.cell_count() > self.limits.max_field_cells {
            return Err(WindError::gpu_resource(format!(
                "field {}x{} exceeds {} cells",
                shape.width, shape.height, self.limits.max_field_cells
            )));
        }
        Ok(())
    }

    pub fn check_particles(&self, count: usize) -> WindResult<()> {
        if count > self.limits.max_particles {
            return Err(WindError::gpu_resource(format!(
                "{} particles exceeds limit of {}",
                count, self.limits.max_particles
            )));
        }
        Ok(())
    }

    pub(crate) fn acquire(&mut self, kind: ResourceKind, n: usize) {
        *self.counts.slot(kind) += n;
        debug!(kind = ?kind, n = n, "Acquired render resources");
    }

    pub(crate) fn release(&mut self, kind: ResourceKind, n: usize) {
        let slot = self.counts.slot(kind);
        *slot = slot.saturating_sub(n);
        debug!(kind = ?kind, n = n, "Released render resources");
    }
}
