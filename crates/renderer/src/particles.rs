//! Particle advection through a wind field.
//!
//! Particles live in normalized coordinates: `x` runs west to east over
//! [0, 1) and wraps, `y` runs north to south over [0, 1] and is clamped.
//! Each tick reads the current slot of a ping-pong [`ParticleBuffer`] and
//! writes the other, so every particle update depends only on the shared
//! read-only grid and its own previous state.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use wind_common::VectorFieldGrid;

/// Largest time step a single tick will integrate, in seconds.
pub const MAX_DT: f32 = 0.1;

/// Normalized distance per (m/s * second) at `speedFactor` 1.
pub const MOVE_SCALE: f32 = 0.00015;

/// Below this speed (m/s) particles hold still.
pub const MIN_MOVE_SPEED: f32 = 0.01;

/// Particles per RNG chunk.
const CHUNK_SIZE: usize = 1024;

/// Particle count above which chunks run on rayon.
const PARALLEL_THRESHOLD: usize = 8192;

/// One particle.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ParticleState {
    pub x: f32,
    pub y: f32,
    /// Seconds since the last reseed.
    pub age: f32,
    /// Position the particle jumps to on its next reseed.
    pub seed_x: f32,
    pub seed_y: f32,
}

impl ParticleState {
    /// Uniform position with an age staggered over `[0, max_age)`.
    fn scattered<R: Rng>(rng: &mut R, max_age: f32) -> Self {
        let age = if max_age > 0.0 {
            rng.gen_range(0.0..max_age)
        } else {
            0.0
        };
        Self {
            x: rng.gen(),
            y: rng.gen(),
            age,
            seed_x: rng.gen(),
            seed_y: rng.gen(),
        }
    }

    /// Jump to the stored seed position, reset age and draw the next seeds.
    fn reseeded<R: Rng>(&self, rng: &mut R) -> Self {
        Self {
            x: self.seed_x,
            y: self.seed_y,
            age: 0.0,
            seed_x: rng.gen(),
            seed_y: rng.gen(),
        }
    }
}

/// Two equally sized particle arrays; one is read while the other is written.
#[derive(Debug, Clone)]
pub struct ParticleBuffer {
    slots: [Vec<ParticleState>; 2],
    current: usize,
}

impl ParticleBuffer {
    pub fn new<R: Rng>(count: usize, max_age: f32, rng: &mut R) -> Self {
        let particles: Vec<ParticleState> = (0..count)
            .map(|_| ParticleState::scattered(rng, max_age))
            .collect();
        Self {
            slots: [particles.clone(), particles],
            current: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.slots[self.current].len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Index of the slot holding the latest state.
    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn current(&self) -> &[ParticleState] {
        &self.slots[self.current]
    }

    /// The read slot and the write slot for one tick.
    fn split(&mut self) -> (&[ParticleState], &mut [ParticleState]) {
        let [a, b] = &mut self.slots;
        if self.current == 0 {
            (a.as_slice(), b.as_mut_slice())
        } else {
            (b.as_slice(), a.as_mut_slice())
        }
    }

    fn swap(&mut self) {
        self.current = 1 - self.current;
    }
}

/// Tunables for advection and reseeding.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimulationParams {
    pub speed_factor: f32,
    /// Base reseed probability per second.
    pub drop_rate: f32,
    /// Extra reseed probability per second per m/s of local wind.
    pub drop_rate_bump: f32,
    /// Seconds a particle lives before it is reseeded.
    pub max_age: f32,
}

impl Default for SimulationParams {
    fn default() -> Self {
        Self {
            speed_factor: 0.25,
            drop_rate: 0.003,
            drop_rate_bump: 0.01,
            max_age: 10.0,
        }
    }
}

impl SimulationParams {
    /// Normalized distance per (m/s * second).
    pub fn scale(&self) -> f32 {
        self.speed_factor * MOVE_SCALE
    }
}

/// Outcome of one tick.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TickStats {
    /// Particles that moved and aged without reseeding.
    pub advanced: usize,
    pub reseeded: usize,
    /// The time step actually integrated after clamping.
    pub dt: f32,
}

/// Owns the particle buffer and advances it over a grid.
#[derive(Debug, Clone)]
pub struct ParticleSimulator {
    buffer: ParticleBuffer,
    params: SimulationParams,
    rng: StdRng,
}

impl ParticleSimulator {
    pub fn new(count: usize, params: SimulationParams) -> Self {
        Self::from_rng(count, params, StdRng::from_entropy())
    }

    /// Reproducible simulator for tests and benchmarks.
    pub fn with_seed(count: usize, params: SimulationParams, seed: u64) -> Self {
        Self::from_rng(count, params, StdRng::seed_from_u64(seed))
    }

    fn from_rng(count: usize, params: SimulationParams, mut rng: StdRng) -> Self {
        let buffer = ParticleBuffer::new(count, params.max_age, &mut rng);
        Self { buffer, params, rng }
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn particles(&self) -> &[ParticleState] {
        self.buffer.current()
    }

    pub fn buffer(&self) -> &ParticleBuffer {
        &self.buffer
    }

    pub fn params(&self) -> SimulationParams {
        self.params
    }

    pub fn set_params(&mut self, params: SimulationParams) {
        self.params = params;
    }

    /// Replace the buffer with `count` freshly scattered particles.
    pub fn set_count(&mut self, count: usize) {
        self.buffer = ParticleBuffer::new(count, self.params.max_age, &mut self.rng);
    }

    /// Advance every particle by `dt` seconds (clamped to [`MAX_DT`]).
    pub fn step(&mut self, grid: &VectorFieldGrid, dt: f32) -> TickStats {
        let dt = clamp_dt(dt);
        let params = self.params;
        let count = self.buffer.len();

        let seeds: Vec<u64> = (0..count.div_ceil(CHUNK_SIZE))
            .map(|_| self.rng.gen())
            .collect();

        let (src, dst) = self.buffer.split();
        let run_chunk = |((src, dst), seed): ((&[ParticleState], &mut [ParticleState]), u64)| {
            let mut rng = StdRng::seed_from_u64(seed);
            let mut reseeded = 0;
            for (from, to) in src.iter().zip(dst.iter_mut()) {
                let (next, dropped) = advance(from, grid, &params, dt, &mut rng);
                *to = next;
                reseeded += dropped as usize;
            }
            reseeded
        };

        let reseeded: usize = if count >= PARALLEL_THRESHOLD {
            src.par_chunks(CHUNK_SIZE)
                .zip(dst.par_chunks_mut(CHUNK_SIZE))
                .zip(seeds.into_par_iter())
                .map(run_chunk)
                .sum()
        } else {
            src.chunks(CHUNK_SIZE)
                .zip(dst.chunks_mut(CHUNK_SIZE))
                .zip(seeds)
                .map(run_chunk)
                .sum()
        };

        self.buffer.swap();

        TickStats {
            advanced: count - reseeded,
            reseeded,
            dt,
        }
    }
}

/// Clamp a frame delta into `[0, MAX_DT]`; negative or non-finite reads as 0.
pub fn clamp_dt(dt: f32) -> f32 {
    if dt.is_finite() {
        dt.clamp(0.0, MAX_DT)
    } else {
        0.0
    }
}

/// One particle's tick. Returns the new state and whether it was reseeded.
#[inline]
fn advance<R: Rng>(
    p: &ParticleState,
    grid: &VectorFieldGrid,
    params: &SimulationParams,
    dt: f32,
    rng: &mut R,
) -> (ParticleState, bool) {
    let (u, v) = grid.sample(p.x, p.y);
    let speed = (u * u + v * v).sqrt();

    let mut x = p.x;
    let mut y = p.y;
    if speed > MIN_MOVE_SPEED {
        let step = speed * params.scale() * dt;
        x += u / speed * step;
        // Rows grow southward, so northward wind decreases y.
        y -= v / speed * step;
    }

    x -= x.floor();
    if x >= 1.0 {
        x = 0.0;
    }
    let y = y.clamp(0.0, 1.0);
    let age = p.age + dt;

    let drop_chance = (params.drop_rate + speed * params.drop_rate_bump) * dt;
    if age > params.max_age || rng.gen::<f32>() < drop_chance {
        return (p.reseeded(rng), true);
    }

    (
        ParticleState {
            x,
            y,
            age,
            seed_x: p.seed_x,
            seed_y: p.seed_y,
        },
        false,
    )
}
