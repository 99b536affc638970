//! Renderer options: defaults, environment overrides, validation and partial updates.

use serde::{Deserialize, Serialize};
use wind_common::{WindError, WindResult};

use crate::particles::SimulationParams;

/// Everything `configure` can change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RendererOptions {
    pub num_particles: usize,
    pub speed_factor: f32,
    /// Per-frame trail retention in (0, 1).
    pub fade_opacity: f32,
    pub drop_rate: f32,
    pub drop_rate_bump: f32,
    /// Seconds.
    pub particle_max_age: f32,
    /// Layer opacity in [0, 1], applied to particles and the static overlay.
    pub opacity: f32,
    /// Sprite size in pixels.
    pub point_size: f32,
    /// Speed range in m/s mapped onto the color ramp.
    pub speed_range: [f32; 2],
    pub color_by_speed: bool,
}

impl Default for RendererOptions {
    fn default() -> Self {
        Self {
            num_particles: 16384,
            speed_factor: 0.25,
            fade_opacity: 0.996,
            drop_rate: 0.003,
            drop_rate_bump: 0.01,
            particle_max_age: 10.0,
            opacity: 1.0,
            point_size: 1.5,
            speed_range: [0.0, 30.0],
            color_by_speed: false,
        }
    }
}

impl RendererOptions {
    /// Defaults overridden by `WIND_*` environment variables.
    ///
    /// Unparseable values are ignored; `validate` still applies afterwards.
    pub fn from_env() -> Self {
        let mut options = Self::default();

        if let Ok(val) = std::env::var("WIND_NUM_PARTICLES") {
            if let Ok(n) = val.parse() {
                options.num_particles = n;
            }
        }

        env_f32("WIND_SPEED_FACTOR", &mut options.speed_factor);
        env_f32("WIND_FADE_OPACITY", &mut options.fade_opacity);
        env_f32("WIND_DROP_RATE", &mut options.drop_rate);
        env_f32("WIND_DROP_RATE_BUMP", &mut options.drop_rate_bump);
        env_f32("WIND_PARTICLE_MAX_AGE", &mut options.particle_max_age);
        env_f32("WIND_OPACITY", &mut options.opacity);
        env_f32("WIND_POINT_SIZE", &mut options.point_size);

        if let Ok(val) = std::env::var("WIND_COLOR_BY_SPEED") {
            options.color_by_speed = val.to_lowercase() == "true" || val == "1";
        }

        options
    }

    pub fn from_json(json: &str) -> WindResult<Self> {
        let options: Self = serde_json::from_str(json)
            .map_err(|e| WindError::invalid_option("options", e.to_string()))?;
        options.validate()?;
        Ok(options)
    }

    /// Check every field, reporting the first invalid one.
    pub fn validate(&self) -> WindResult<()> {
        if self.num_particles == 0 {
            return Err(WindError::invalid_option("numParticles", "must be > 0"));
        }
        positive("speedFactor", self.speed_factor)?;
        if !(self.fade_opacity > 0.0 && self.fade_opacity < 1.0) {
            return Err(WindError::invalid_option(
                "fadeOpacity",
                format!("must be in (0, 1), got {}", self.fade_opacity),
            ));
        }
        non_negative("dropRate", self.drop_rate)?;
        non_negative("dropRateBump", self.drop_rate_bump)?;
        positive("particleMaxAge", self.particle_max_age)?;
        if !(0.0..=1.0).contains(&self.opacity) {
            return Err(WindError::invalid_option(
                "opacity",
                format!("must be in [0, 1], got {}", self.opacity),
            ));
        }
        positive("pointSize", self.point_size)?;

        let [min, max] = self.speed_range;
        if !min.is_finite() || !max.is_finite() || min >= max {
            return Err(WindError::invalid_option(
                "speedRange",
                format!("must be finite with min < max, got [{}, {}]", min, max),
            ));
        }

        Ok(())
    }

    /// Copy of these options with every field set in `update` replaced.
    pub fn merged(&self, update: &OptionsUpdate) -> Self {
        let mut next = self.clone();
        if let Some(v) = update.num_particles {
            next.num_particles = v;
        }
        if let Some(v) = update.speed_factor {
            next.speed_factor = v;
        }
        if let Some(v) = update.fade_opacity {
            next.fade_opacity = v;
        }
        if let Some(v) = update.drop_rate {
            next.drop_rate = v;
        }
        if let Some(v) = update.drop_rate_bump {
            next.drop_rate_bump = v;
        }
        if let Some(v) = update.particle_max_age {
            next.particle_max_age = v;
        }
        if let Some(v) = update.opacity {
            next.opacity = v;
        }
        if let Some(v) = update.point_size {
            next.point_size = v;
        }
        if let Some(v) = update.speed_range {
            next.speed_range = v;
        }
        if let Some(v) = update.color_by_speed {
            next.color_by_speed = v;
        }
        next
    }

    pub fn simulation_params(&self) -> SimulationParams {
        SimulationParams {
            speed_factor: self.speed_factor,
            drop_rate: self.drop_rate,
            drop_rate_bump: self.drop_rate_bump,
            max_age: self.particle_max_age,
        }
    }

    pub fn speed_range(&self) -> (f32, f32) {
        (self.speed_range[0], self.speed_range[1])
    }
}

/// Partial options; unset fields keep their current value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionsUpdate {
    pub num_particles: Option<usize>,
    pub speed_factor: Option<f32>,
    pub fade_opacity: Option<f32>,
    pub drop_rate: Option<f32>,
    pub drop_rate_bump: Option<f32>,
    pub particle_max_age: Option<f32>,
    pub opacity: Option<f32>,
    pub point_size: Option<f32>,
    pub speed_range: Option<[f32; 2]>,
    pub color_by_speed: Option<bool>,
}

impl OptionsUpdate {
    pub fn from_json(json: &str) -> WindResult<Self> {
        serde_json::from_str(json).map_err(|e| WindError::invalid_option("options", e.to_string()))
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

impl From<RendererOptions> for OptionsUpdate {
    fn from(o: RendererOptions) -> Self {
        Self {
            num_particles: Some(o.num_particles),
            speed_factor: Some(o.speed_factor),
            fade_opacity: Some(o.fade_opacity),
            drop_rate: Some(o.drop_rate),
            drop_rate_bump: Some(o.drop_rate_bump),
            particle_max_age: Some(o.particle_max_age),
            opacity: Some(o.opacity),
            point_size: Some(o.point_size),
            speed_range: Some(o.speed_range),
            color_by_speed: Some(o.color_by_speed),
        }
    }
}

fn env_f32(name: &str, target: &mut f32) {
    if let Ok(val) = std::env::var(name) {
        if let Ok(parsed) = val.parse() {
            *target = parsed;
        }
    }
}

fn positive(name: &str, value: f32) -> WindResult<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(WindError::invalid_option(name, format!("must be > 0, got {}", value)))
    }
}

fn non_negative(name: &str, value: f32) -> WindResult<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(WindError::invalid_option(name, format!("must be >= 0, got {}", value)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(RendererOptions::default().validate().is_ok());
    }

    #[test]
    fn test_merge_keeps_unset_fields() {
        let update = OptionsUpdate {
            opacity: Some(0.5),
            ..Default::default()
        };
        let merged = RendererOptions::default().merged(&update);
        assert_eq!(merged.opacity, 0.5);
        assert_eq!(merged.num_particles, 16384);
    }
}
