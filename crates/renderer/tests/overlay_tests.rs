//! Tests for the static speed overlay.

use renderer::gradient::{Color, ColorRamp, ColorStop};
use renderer::overlay::StaticRasterRenderer;
use test_utils::{bbox, uniform_wind};
use wind_common::{GeoBounds, VectorFieldGrid, WindError};

fn black_to_white() -> ColorRamp {
    ColorRamp::new(vec![
        ColorStop::new(0.0, Color::rgb(0, 0, 0)),
        ColorStop::new(1.0, Color::rgb(255, 255, 255)),
    ])
    .unwrap()
}

fn grid(width: usize, height: usize, u: Vec<f32>, v: Vec<f32>) -> VectorFieldGrid {
    VectorFieldGrid::new(width, height, GeoBounds::from_array(bbox::SMALL), u, v).unwrap()
}

// ============================================================================
// Color mapping
// ============================================================================

#[test]
fn test_one_pixel_per_cell() {
    let (u, v) = uniform_wind(6, 4, 3.0, 4.0);
    let image = StaticRasterRenderer::default().render(&grid(6, 4, u, v), (0.0, 30.0));
    assert_eq!(image.width, 6);
    assert_eq!(image.height, 4);
    assert_eq!(image.pixels.len(), 6 * 4 * 4);
}

#[test]
fn test_speed_maps_through_ramp() {
    // Speeds 0 and 30 in the top row, 15 below.
    let u = vec![0.0, 30.0, 15.0, 15.0];
    let v = vec![0.0; 4];
    let image = StaticRasterRenderer::new(&black_to_white()).render(&grid(2, 2, u, v), (0.0, 30.0));

    assert_eq!(image.pixel(0, 0), Some([0, 0, 0, 255]));
    assert_eq!(image.pixel(1, 0), Some([255, 255, 255, 255]));
    let mid = image.pixel(0, 1).unwrap();
    assert!((mid[0] as i32 - 128).abs() <= 1, "mid gray was {:?}", mid);
}

#[test]
fn test_row_zero_is_north() {
    // Only the northernmost grid row is windy.
    let u = vec![30.0, 30.0, 0.0, 0.0, 0.0, 0.0];
    let image = StaticRasterRenderer::new(&black_to_white())
        .render(&grid(2, 3, u, vec![0.0; 6]), (0.0, 30.0));

    assert_eq!(image.pixel(0, 0), Some([255, 255, 255, 255]));
    assert_eq!(image.pixel(0, 2), Some([0, 0, 0, 255]));
    assert_eq!(image.corners()[0], [-10.0, 10.0]);
}

#[test]
fn test_speed_above_range_clamps() {
    let image = StaticRasterRenderer::new(&black_to_white())
        .render(&grid(1, 1, vec![300.0], vec![0.0]), (0.0, 30.0));
    assert_eq!(image.pixel(0, 0), Some([255, 255, 255, 255]));
}

#[test]
fn test_opacity_sets_alpha() {
    let renderer = StaticRasterRenderer::new(&black_to_white()).with_opacity(0.5);
    let image = renderer.render(&grid(1, 1, vec![1.0], vec![0.0]), (0.0, 30.0));
    assert_eq!(image.pixel(0, 0).unwrap()[3], 128);

    let clamped = StaticRasterRenderer::default().with_opacity(4.0);
    assert_eq!(clamped.opacity(), 1.0);
}

#[test]
fn test_nan_cells_are_transparent() {
    let image = StaticRasterRenderer::default().render(
        &grid(2, 1, vec![f32::NAN, 5.0], vec![0.0, 0.0]),
        (0.0, 30.0),
    );
    assert_eq!(image.pixel(0, 0), Some([0, 0, 0, 0]));
    assert_eq!(image.pixel(1, 0).unwrap()[3], 255);
}

#[test]
fn test_non_finite_range_uses_grid_range() {
    let u = vec![2.0, 4.0];
    let image = StaticRasterRenderer::new(&black_to_white())
        .render(&grid(2, 1, u, vec![0.0, 0.0]), (f32::NAN, 30.0));
    assert_eq!(image.pixel(0, 0), Some([0, 0, 0, 255]));
    assert_eq!(image.pixel(1, 0), Some([255, 255, 255, 255]));
}

#[test]
fn test_parallel_rows_match_layout() {
    // 100x100 renders rows in parallel; each row keeps its own speed.
    let (width, height) = (100, 100);
    let u: Vec<f32> = (0..height)
        .flat_map(|row| std::iter::repeat(row as f32 * 0.3).take(width))
        .collect();
    let image = StaticRasterRenderer::new(&black_to_white())
        .render(&grid(width, height, u, vec![0.0; width * height]), (0.0, 30.0));

    assert_eq!(image.pixel(0, 0), Some([0, 0, 0, 255]));
    for row in [10, 50, 99] {
        assert_eq!(image.pixel(0, row), image.pixel(width - 1, row));
    }
    assert!(image.pixel(0, 99).unwrap()[0] > image.pixel(0, 50).unwrap()[0]);
}

// ============================================================================
// Placement
// ============================================================================

#[test]
fn test_placement_corners() {
    let bounds = GeoBounds::from_array(bbox::SOUTH_CHINA_SEA);
    let g = VectorFieldGrid::new(2, 2, bounds, vec![0.0; 4], vec![0.0; 4]).unwrap();
    let placement = StaticRasterRenderer::default().render(&g, (0.0, 30.0)).placement();

    assert_eq!(placement.bbox, bbox::SOUTH_CHINA_SEA);
    assert_eq!(
        placement.coordinates,
        [[100.0, 25.0], [120.0, 25.0], [120.0, 5.0], [100.0, 5.0]]
    );

    let json = serde_json::to_value(&placement).unwrap();
    assert_eq!(json["width"], 2);
    assert!(json["coordinates"].is_array());
}

#[test]
fn test_overlay_png() {
    let (u, v) = uniform_wind(8, 8, 5.0, 0.0);
    let png = StaticRasterRenderer::default()
        .render(&grid(8, 8, u, v), (0.0, 30.0))
        .to_png()
        .unwrap();
    assert_eq!(&png[1..4], b"PNG");
}

// ============================================================================
// Blending
// ============================================================================

#[test]
fn test_blended_midpoint() {
    let renderer = StaticRasterRenderer::new(&black_to_white());
    let from = grid(1, 1, vec![0.0], vec![0.0]);
    let to = grid(1, 1, vec![30.0], vec![0.0]);

    let start = renderer.render_blended(&from, &to, 0.0, (0.0, 30.0)).unwrap();
    let end = renderer.render_blended(&from, &to, 1.0, (0.0, 30.0)).unwrap();
    assert_eq!(start.pixel(0, 0), Some([0, 0, 0, 255]));
    assert_eq!(end.pixel(0, 0), Some([255, 255, 255, 255]));
}

#[test]
fn test_blend_requires_matching_shape() {
    let renderer = StaticRasterRenderer::default();
    let a = grid(1, 1, vec![0.0], vec![0.0]);
    let b = grid(2, 1, vec![0.0; 2], vec![0.0; 2]);
    assert!(matches!(
        renderer.render_blended(&a, &b, 0.5, (0.0, 30.0)),
        Err(WindError::DimensionMismatch { .. })
    ));
}
