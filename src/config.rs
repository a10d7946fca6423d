use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

const DEFAULT_ALPHA_MIN: f32 = 0.001;
const COOLING_TICKS: f32 = 300.0;

#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct PhysicsConfig {
    pub rest_length: f32,
    pub spring_strength: f32,
    pub same_type_repulsion: f32,
    pub cross_type_repulsion: f32,
    pub repulsion_softening: f32,
    pub repulsion_cutoff: f32,
    pub cluster_strength: f32,
    pub center_strength: f32,
    pub velocity_decay: f32,
    pub max_speed: f32,
    pub collision_padding: f32,
    pub alpha_min: f32,
    pub alpha_decay: f32,
    pub drag_reheat_alpha: f32,
    pub seed_spread: f32,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            rest_length: 48.0,
            spring_strength: 0.06,
            same_type_repulsion: 900.0,
            cross_type_repulsion: 7_200.0,
            repulsion_softening: 25.0,
            repulsion_cutoff: 220.0,
            cluster_strength: 0.012,
            center_strength: 0.004,
            velocity_decay: 0.6,
            max_speed: 40.0,
            collision_padding: 2.0,
            alpha_min: DEFAULT_ALPHA_MIN,
            alpha_decay: 1.0 - DEFAULT_ALPHA_MIN.powf(1.0 / COOLING_TICKS),
            drag_reheat_alpha: 0.3,
            seed_spread: 36.0,
        }
    }
}

impl PhysicsConfig {
    /// Clamps user-supplied values into ranges where the integrator stays stable.
    pub fn sanitized(self) -> Self {
        let finite_or = |value: f32, fallback: f32| if value.is_finite() { value } else { fallback };
        let defaults = Self::default();

        Self {
            rest_length: finite_or(self.rest_length, defaults.rest_length).max(1.0),
            spring_strength: finite_or(self.spring_strength, defaults.spring_strength)
                .clamp(0.0, 1.0),
            same_type_repulsion: finite_or(self.same_type_repulsion, defaults.same_type_repulsion)
                .max(0.0),
            cross_type_repulsion: finite_or(
                self.cross_type_repulsion,
                defaults.cross_type_repulsion,
            )
            .max(0.0),
            repulsion_softening: finite_or(self.repulsion_softening, defaults.repulsion_softening)
                .max(1.0),
            repulsion_cutoff: finite_or(self.repulsion_cutoff, defaults.repulsion_cutoff)
                .max(1.0),
            cluster_strength: finite_or(self.cluster_strength, defaults.cluster_strength)
                .clamp(0.0, 0.5),
            center_strength: finite_or(self.center_strength, defaults.center_strength)
                .clamp(0.0, 0.5),
            velocity_decay: finite_or(self.velocity_decay, defaults.velocity_decay)
                .clamp(0.0, 0.99),
            max_speed: finite_or(self.max_speed, defaults.max_speed).clamp(0.1, 1_000.0),
            collision_padding: finite_or(self.collision_padding, defaults.collision_padding)
                .max(0.0),
            alpha_min: finite_or(self.alpha_min, defaults.alpha_min).clamp(1e-6, 0.5),
            alpha_decay: finite_or(self.alpha_decay, defaults.alpha_decay).clamp(1e-4, 0.5),
            drag_reheat_alpha: finite_or(self.drag_reheat_alpha, defaults.drag_reheat_alpha)
                .clamp(0.0, 1.0),
            seed_spread: finite_or(self.seed_spread, defaults.seed_spread).max(1.0),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    pub node_batch_size: usize,
    pub link_batch_size: usize,
    pub batch_interval_ms: u64,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            node_batch_size: 10,
            link_batch_size: 24,
            batch_interval_ms: 60,
        }
    }
}

impl LoaderConfig {
    pub fn batch_interval(&self) -> Duration {
        Duration::from_millis(self.batch_interval_ms)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub fov_degrees: f32,
    pub initial_distance: f32,
    pub min_distance: f32,
    pub max_distance: f32,
    pub orbit_sensitivity: f32,
    pub zoom_sensitivity: f32,
    pub click_tolerance_px: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fov_degrees: 55.0,
            initial_distance: 900.0,
            min_distance: 80.0,
            max_distance: 4_000.0,
            orbit_sensitivity: 0.006,
            zoom_sensitivity: 0.0015,
            click_tolerance_px: 4.0,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub physics: PhysicsConfig,
    pub loader: LoaderConfig,
    pub camera: CameraConfig,
    pub restart: RestartConfig,
}

#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct RestartConfig {
    /// Seconds between periodic reheats; zero disables them.
    pub interval_secs: f32,
}

impl Default for RestartConfig {
    fn default() -> Self {
        Self { interval_secs: 30.0 }
    }
}

impl RestartConfig {
    pub fn interval(&self) -> Option<Duration> {
        (self.interval_secs.is_finite() && self.interval_secs > 0.0)
            .then(|| Duration::from_secs_f32(self.interval_secs))
    }
}

pub fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    let Some(path) = path else {
        return Ok(EngineConfig::default());
    };

    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    let mut config: EngineConfig = serde_json::from_str(&raw)
        .with_context(|| format!("invalid config JSON in {}", path.display()))?;
    config.physics = config.physics.sanitized();
    Ok(config)
}
