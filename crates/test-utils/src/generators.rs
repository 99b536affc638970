//! Synthetic wind fields with known, verifiable structure.
//!
//! Every generator returns row-major component arrays with row 0 at the
//! northern edge, the layout `VectorFieldGrid` expects.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Creates a test grid with predictable values.
///
/// Each cell value is calculated as: `col * 1000 + row`, so a misplaced
/// read or a flipped row order shows up as a wrong value.
///
/// # Example
///
/// ```
/// use test_utils::create_test_grid;
///
/// let grid = create_test_grid(10, 5);
/// assert_eq!(grid.len(), 50);
/// assert_eq!(grid[1], 1000.0); // col=1, row=0
/// assert_eq!(grid[10], 1.0);   // col=0, row=1
/// ```
pub fn create_test_grid(width: usize, height: usize) -> Vec<f32> {
    let mut data = Vec::with_capacity(width * height);
    for row in 0..height {
        for col in 0..width {
            data.push((col * 1000 + row) as f32);
        }
    }
    data
}

/// Creates a grid filled with a single value.
pub fn create_constant_grid(width: usize, height: usize, value: f32) -> Vec<f32> {
    vec![value; width * height]
}

/// Uniform wind everywhere: `(u, v)` in m/s.
pub fn uniform_wind(width: usize, height: usize, u: f32, v: f32) -> (Vec<f32>, Vec<f32>) {
    (
        create_constant_grid(width, height, u),
        create_constant_grid(width, height, v),
    )
}

/// Counter-clockwise vortex centred on the grid, calm in the middle and
/// reaching `max_speed` at the edges.
pub fn vortex_wind(width: usize, height: usize, max_speed: f32) -> (Vec<f32>, Vec<f32>) {
    let cx = (width as f32 - 1.0) / 2.0;
    let cy = (height as f32 - 1.0) / 2.0;
    let radius = cx.max(cy).max(1.0);

    let mut u = Vec::with_capacity(width * height);
    let mut v = Vec::with_capacity(width * height);
    for row in 0..height {
        for col in 0..width {
            let dx = (col as f32 - cx) / radius;
            // Rows grow southward; flip so dy points north.
            let dy = (cy - row as f32) / radius;
            u.push(-dy * max_speed);
            v.push(dx * max_speed);
        }
    }
    (u, v)
}

/// Zonal jet: eastward wind strongest on the middle row, fading to calm at the poles.
pub fn zonal_jet(width: usize, height: usize, peak: f32) -> (Vec<f32>, Vec<f32>) {
    let mut u = Vec::with_capacity(width * height);
    for row in 0..height {
        let lat = if height > 1 {
            row as f32 / (height - 1) as f32 * 2.0 - 1.0
        } else {
            0.0
        };
        let speed = peak * (1.0 - lat * lat);
        u.extend(std::iter::repeat(speed).take(width));
    }
    (u, vec![0.0; width * height])
}

/// Reproducible random wind with components in `[-max, max]`.
pub fn random_wind(width: usize, height: usize, max: f32, seed: u64) -> (Vec<f32>, Vec<f32>) {
    let mut rng = StdRng::seed_from_u64(seed);
    let cells = width * height;
    let u = (0..cells).map(|_| rng.gen_range(-max..=max)).collect();
    let v = (0..cells).map(|_| rng.gen_range(-max..=max)).collect();
    (u, v)
}

/// Creates a grid with NaN values at the given `(col, row)` positions, zeros elsewhere.
pub fn create_grid_with_nans(
    width: usize,
    height: usize,
    nan_positions: &[(usize, usize)],
) -> Vec<f32> {
    let mut data = vec![0.0f32; width * height];
    for &(col, row) in nan_positions {
        if col < width && row < height {
            data[row * width + col] = f32::NAN;
        }
    }
    data
}
