//! Tests for the `WindRenderer` lifecycle.

use renderer::context::{ContextLimits, RenderContext};
use renderer::gradient::{Color, ColorRamp, ColorStop};
use renderer::{LoadOutcome, OptionsUpdate, RendererOptions, WindRenderer};
use test_utils::{bbox, single_band_geotiff, uniform_wind, uv_geotiff};
use wind_common::{GeoBounds, VectorFieldGrid, WindError};

fn options(particles: usize) -> RendererOptions {
    RendererOptions {
        num_particles: particles,
        ..Default::default()
    }
}

fn renderer_with(particles: usize, limits: ContextLimits) -> WindRenderer {
    let context = RenderContext::new(limits).unwrap();
    WindRenderer::new(context, options(particles), 64, 32)
        .unwrap()
        .with_seed(1234)
}

fn renderer() -> WindRenderer {
    renderer_with(512, ContextLimits::default())
}

fn uniform(u: f32, v: f32, bounds: [f64; 4]) -> VectorFieldGrid {
    let (us, vs) = uniform_wind(4, 4, u, v);
    VectorFieldGrid::new(4, 4, GeoBounds::from_array(bounds), us, vs).unwrap()
}

// ============================================================================
// Construction
// ============================================================================

#[test]
fn test_new_allocates_resources() {
    let r = renderer();
    let counts = r.context().counts();
    assert_eq!(counts.surfaces, 2);
    assert_eq!(counts.particle_buffers, 2);
    assert_eq!(counts.fields, 0);
    assert_eq!(r.particles().len(), 512);
    assert!(r.grid().is_none());
}

#[test]
fn test_new_rejects_bad_options_and_sizes() {
    let context = || RenderContext::new(ContextLimits::default()).unwrap();

    let bad = RendererOptions {
        fade_opacity: 1.2,
        ..Default::default()
    };
    assert!(matches!(
        WindRenderer::new(context(), bad, 64, 64),
        Err(WindError::InvalidOption { .. })
    ));
    assert!(matches!(
        WindRenderer::new(context(), options(16), 0, 64),
        Err(WindError::GpuResource(_))
    ));
    assert!(matches!(
        WindRenderer::new(context(), options(2_000_000), 64, 64),
        Err(WindError::GpuResource(_))
    ));
}

// ============================================================================
// Loading and frame-boundary swaps
// ============================================================================

#[test]
fn test_uniform_eastward_field_moves_particles_east() {
    let mut r = renderer();
    r.load_components(4, 4, bbox::SMALL, vec![5.0; 16], vec![0.0; 16])
        .unwrap();
    let before = r.particles().to_vec();

    r.render(1.0).unwrap();
    let stats = r.last_frame().tick.unwrap();
    assert!(stats.advanced > 0);

    let mut moved = 0;
    for (a, b) in before.iter().zip(r.particles()) {
        if b.age == 0.0 {
            continue; // reseeded
        }
        assert_eq!(a.y, b.y);
        let dx = if b.x >= a.x { b.x - a.x } else { b.x + 1.0 - a.x };
        assert!(dx > 0.0 && dx < 0.01, "dx {}", dx);
        moved += 1;
    }
    assert_eq!(moved, stats.advanced);
}

#[test]
fn test_swap_happens_at_next_render() {
    let mut r = renderer();
    let outcome = r.load(uniform(5.0, 0.0, bbox::SMALL)).unwrap();

    assert_eq!(outcome, LoadOutcome::Staged);
    assert!(r.grid().is_none());
    assert!(r.has_pending());
    assert_eq!(r.grid_shape().unwrap().width, 4);

    r.render(0.016).unwrap();
    assert!(r.last_frame().swapped_grid);
    assert!(!r.has_pending());
    assert_eq!(r.grid().unwrap().u()[0], 5.0);

    r.render(0.016).unwrap();
    assert!(!r.last_frame().swapped_grid);
}

#[test]
fn test_latest_staged_grid_wins() {
    let mut r = renderer();
    r.load(uniform(1.0, 0.0, bbox::SMALL)).unwrap();
    r.load(uniform(2.0, 0.0, bbox::SMALL)).unwrap();
    assert_eq!(r.context().counts().fields, 1);

    r.render(0.016).unwrap();
    assert_eq!(r.grid().unwrap().u()[0], 2.0);
}

#[test]
fn test_reloading_same_grid_is_unchanged() {
    let mut r = renderer();
    assert_eq!(r.load(uniform(3.0, 1.0, bbox::SMALL)).unwrap(), LoadOutcome::Staged);
    assert_eq!(r.load(uniform(3.0, 1.0, bbox::SMALL)).unwrap(), LoadOutcome::Unchanged);

    r.render(0.016).unwrap();
    assert_eq!(r.load(uniform(3.0, 1.0, bbox::SMALL)).unwrap(), LoadOutcome::Unchanged);
    assert!(!r.has_pending());
    assert_eq!(r.context().counts().fields, 1);
}

#[test]
fn test_load_rasters_from_geotiff() {
    let mut r = renderer();
    let (u, v) = uniform_wind(8, 4, 6.0, 8.0);
    r.load_rasters(&uv_geotiff(8, 4, u, v, bbox::SOUTH_CHINA_SEA), None)
        .unwrap();
    r.render(0.016).unwrap();

    let grid = r.grid().unwrap();
    assert_eq!((grid.width(), grid.height()), (8, 4));
    assert_eq!(grid.speed_range(), (10.0, 10.0));
}

#[test]
fn test_mismatched_split_keeps_previous_grid() {
    let mut r = renderer();
    r.load(uniform(5.0, 0.0, bbox::SMALL)).unwrap();
    r.render(0.016).unwrap();

    let u = single_band_geotiff(3, 3, vec![1.0; 9], bbox::SMALL);
    let v = single_band_geotiff(4, 4, vec![1.0; 16], bbox::SMALL);
    let result = r.load_rasters(&u, Some(&v));

    assert!(matches!(result, Err(WindError::DimensionMismatch { .. })));
    assert!(!r.has_pending());
    r.render(0.016).unwrap();
    assert_eq!(r.grid().unwrap().u()[0], 5.0);
}

#[test]
fn test_decode_failure_keeps_previous_grid() {
    let mut r = renderer();
    r.load(uniform(5.0, 0.0, bbox::SMALL)).unwrap();
    r.render(0.016).unwrap();

    assert!(matches!(
        r.load_rasters(b"II*\0garbage", None),
        Err(WindError::Decode(_))
    ));
    assert_eq!(r.grid().unwrap().u()[0], 5.0);
}

#[test]
fn test_invalid_components_rejected() {
    let mut r = renderer();
    let result = r.load_components(4, 4, bbox::SMALL, vec![0.0; 16], vec![0.0; 15]);
    assert!(matches!(result, Err(WindError::DimensionMismatch { .. })));
    assert!(!r.has_pending());
}

#[test]
fn test_degenerate_bounds_fall_back_to_globe() {
    let mut r = renderer();
    r.load_components(4, 4, bbox::INVERTED, vec![1.0; 16], vec![0.0; 16])
        .unwrap();
    r.render(0.016).unwrap();
    let grid = r.grid().unwrap();
    assert_eq!(grid.bounds(), GeoBounds::GLOBAL);
    assert!(grid.bounds_fallback());

    r.load_components(4, 4, bbox::SMALL, vec![1.0; 16], vec![0.0; 16])
        .unwrap();
    r.render(0.016).unwrap();
    assert!(!r.grid().unwrap().bounds_fallback());
}

#[test]
fn test_field_too_large_for_context() {
    let limits = ContextLimits {
        max_field_cells: 8,
        ..Default::default()
    };
    let mut r = renderer_with(16, limits);
    assert!(matches!(
        r.load(uniform(1.0, 0.0, bbox::SMALL)),
        Err(WindError::GpuResource(_))
    ));
}

// ============================================================================
// Load tickets
// ============================================================================

#[test]
fn test_stale_ticket_is_dropped() {
    let mut r = renderer();
    let first = r.begin_load();
    let second = r.begin_load();
    assert!(second > first);

    // The newer load lands first; the older one must not overwrite it.
    let outcome = r
        .complete_load(second, Ok(uniform(2.0, 0.0, bbox::SMALL)))
        .unwrap();
    assert_eq!(outcome, LoadOutcome::Staged);
    let outcome = r
        .complete_load(first, Ok(uniform(1.0, 0.0, bbox::SMALL)))
        .unwrap();
    assert_eq!(outcome, LoadOutcome::Stale);

    r.render(0.016).unwrap();
    assert_eq!(r.grid().unwrap().u()[0], 2.0);
}

#[test]
fn test_direct_load_invalidates_ticket() {
    let mut r = renderer();
    let ticket = r.begin_load();
    r.load(uniform(7.0, 0.0, bbox::SMALL)).unwrap();

    let outcome = r
        .complete_load(ticket, Ok(uniform(1.0, 0.0, bbox::SMALL)))
        .unwrap();
    assert_eq!(outcome, LoadOutcome::Stale);
}

#[test]
fn test_failed_ticket_surfaces_error() {
    let mut r = renderer();
    r.load(uniform(5.0, 0.0, bbox::SMALL)).unwrap();
    r.render(0.016).unwrap();

    let ticket = r.begin_load();
    let result = r.complete_load(ticket, Err(WindError::decode("truncated")));
    assert!(matches!(result, Err(WindError::Decode(_))));
    assert_eq!(r.grid().unwrap().u()[0], 5.0);
}

// ============================================================================
// Rendering
// ============================================================================

#[test]
fn test_render_without_grid_only_fades() {
    let mut r = renderer();
    let surface = r.render(0.016).unwrap();
    assert!(surface.is_blank());
    assert_eq!(r.last_frame().tick, None);
    assert_eq!(r.last_frame().frame, 1);
}

#[test]
fn test_render_draws_particles() {
    let mut r = renderer();
    r.load(uniform(5.0, 0.0, bbox::SMALL)).unwrap();
    let surface = r.render(0.016).unwrap();
    assert!(!surface.is_blank());
    assert_eq!((surface.width(), surface.height()), (64, 32));
}

#[test]
fn test_commit_pending_activates_without_drawing() {
    let mut r = renderer();
    assert!(!r.commit_pending().unwrap());

    r.load(uniform(8.0, 0.0, bbox::SMALL)).unwrap();
    assert!(r.commit_pending().unwrap());
    assert!(!r.has_pending());
    assert!(r.grid().is_some());
    assert!(r.render_overlay().unwrap().is_some());
    assert!(r.surface().unwrap().is_blank());
    assert_eq!(r.last_frame().frame, 0);

    r.render(0.016).unwrap();
    assert!(!r.last_frame().swapped_grid);
    assert_eq!(r.context().counts().fields, 1);
}

#[test]
fn test_overlay_follows_active_grid() {
    let mut r = renderer();
    assert!(r.render_overlay().unwrap().is_none());

    r.load(uniform(30.0, 0.0, bbox::SOUTH_CHINA_SEA)).unwrap();
    assert!(r.render_overlay().unwrap().is_none());

    r.render(0.016).unwrap();
    let overlay = r.render_overlay().unwrap().unwrap();
    assert_eq!((overlay.width, overlay.height), (4, 4));
    assert_eq!(overlay.corners()[0], [100.0, 25.0]);
    assert_eq!(overlay.pixel(0, 0).unwrap()[3], 255);
}

#[test]
fn test_custom_ramp_applies_to_overlay() {
    let mut r = renderer();
    let green = ColorRamp::new(vec![
        ColorStop::new(0.0, Color::rgb(0, 255, 0)),
        ColorStop::new(1.0, Color::rgb(0, 255, 0)),
    ])
    .unwrap();
    r.set_ramp(green);
    r.load(uniform(10.0, 0.0, bbox::SMALL)).unwrap();
    r.render(0.016).unwrap();

    let overlay = r.render_overlay().unwrap().unwrap();
    assert_eq!(overlay.pixel(1, 1), Some([0, 255, 0, 255]));
}

#[test]
fn test_resize() {
    let mut r = renderer();
    r.resize(128, 96).unwrap();
    let surface = r.render(0.016).unwrap();
    assert_eq!((surface.width(), surface.height()), (128, 96));

    assert!(matches!(r.resize(100_000, 10), Err(WindError::GpuResource(_))));
    assert_eq!(r.surface().unwrap().width(), 128);
}

// ============================================================================
// Configuration
// ============================================================================

#[test]
fn test_configure_applies_partial_update() {
    let mut r = renderer();
    let update = OptionsUpdate {
        num_particles: Some(100),
        opacity: Some(0.5),
        ..Default::default()
    };
    r.configure(&update).unwrap();

    assert_eq!(r.particles().len(), 100);
    assert_eq!(r.options().opacity, 0.5);
    assert_eq!(r.options().fade_opacity, 0.996);
}

#[test]
fn test_invalid_configure_changes_nothing() {
    let mut r = renderer();
    let update = OptionsUpdate {
        num_particles: Some(64),
        fade_opacity: Some(1.5),
        ..Default::default()
    };

    assert!(matches!(
        r.configure(&update),
        Err(WindError::InvalidOption { .. })
    ));
    assert_eq!(r.options(), &options(512));
    assert_eq!(r.particles().len(), 512);
}

#[test]
fn test_configure_respects_particle_limit() {
    let limits = ContextLimits {
        max_particles: 1_000,
        ..Default::default()
    };
    let mut r = renderer_with(100, limits);
    let update = OptionsUpdate {
        num_particles: Some(5_000),
        ..Default::default()
    };
    assert!(matches!(r.configure(&update), Err(WindError::GpuResource(_))));
    assert_eq!(r.particles().len(), 100);
}

// ============================================================================
// Teardown
// ============================================================================

#[test]
fn test_destroy_releases_everything() {
    let mut r = renderer();
    r.load(uniform(5.0, 0.0, bbox::SMALL)).unwrap();
    r.render(0.016).unwrap();
    r.load(uniform(6.0, 0.0, bbox::SMALL)).unwrap();
    assert_eq!(r.context().counts().fields, 2);

    r.destroy();
    assert!(r.is_destroyed());
    assert_eq!(r.context().counts().total(), 0);
    assert!(r.particles().is_empty());
    assert!(r.surface().is_none());

    // Destroy is idempotent; everything else refuses.
    r.destroy();
    assert!(matches!(r.render(0.016), Err(WindError::Destroyed)));
    assert!(matches!(
        r.load(uniform(1.0, 0.0, bbox::SMALL)),
        Err(WindError::Destroyed)
    ));
    assert!(matches!(
        r.configure(&OptionsUpdate::default()),
        Err(WindError::Destroyed)
    ));
    assert!(matches!(r.render_overlay(), Err(WindError::Destroyed)));
    assert!(matches!(r.resize(10, 10), Err(WindError::Destroyed)));
}
