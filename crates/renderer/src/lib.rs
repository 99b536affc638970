//! Wind field rendering.
//!
//! Two visualizations of a [`VectorFieldGrid`](wind_common::VectorFieldGrid):
//! - A static overlay coloring each cell by wind speed
//! - Animated particles advected through the field, leaving fading trails
//!
//! [`WindRenderer`] owns every buffer and is the only entry point a host
//! needs; the other modules are usable on their own for offline rendering.

pub mod compositing;
pub mod context;
pub mod facade;
pub mod gradient;
pub mod loader;
pub mod options;
pub mod overlay;
pub mod particles;
pub mod png;
pub mod style;

pub use compositing::{CompositingPipeline, RenderSurface, SpriteStyle};
pub use context::{ContextLimits, RenderContext, ResourceCounts};
pub use facade::{FrameStats, LoadOutcome, LoadTicket, WindRenderer};
pub use gradient::{Color, ColorLut, ColorRamp, ColorStop};
pub use loader::{FieldLoader, FsFetcher, HttpFetcher, RasterFetcher};
pub use options::{OptionsUpdate, RendererOptions};
pub use overlay::{OverlayImage, OverlayPlacement, StaticRasterRenderer};
pub use particles::{ParticleSimulator, ParticleState, SimulationParams, TickStats};
