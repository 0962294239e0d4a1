//! Engine configuration.

use armature_defs::MultibodyEntityDatabase;
use serde::{Deserialize, Serialize};

use crate::error::PhysicsError;

/// Physics engine settings, loadable from TOML.
///
/// ```toml
/// world_scale = 10.0
/// iterations = 20
/// tick_duration = 0.1
/// gravity = [0.0, 0.0, -9.81]
/// ground_plane = true
/// seed = 42
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Factor from scene units to physics units, applied to positions and
    /// dimensions but not to orientations.
    pub world_scale: f64,
    /// Sub-steps per tick.
    pub iterations: usize,
    /// Duration of one tick in seconds.
    pub tick_duration: f64,
    /// Gravity in scene units.
    pub gravity: [f64; 3],
    /// Whether to add a static ground half-space at z = 0.
    pub ground_plane: bool,
    /// Seed for the session random source, entropy if absent.
    pub seed: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            world_scale: 1.0,
            iterations: 50,
            tick_duration: 0.1,
            gravity: [0.0, 0.0, -9.81],
            ground_plane: true,
            seed: None,
        }
    }
}

impl EngineConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(source: &str) -> Result<Self, PhysicsError> {
        let config: Self =
            toml::from_str(source).map_err(|e| PhysicsError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges.
    pub fn validate(&self) -> Result<(), PhysicsError> {
        if !(self.world_scale.is_finite() && self.world_scale > 0.0) {
            return Err(PhysicsError::InvalidConfig(format!(
                "world_scale must be positive, got {}",
                self.world_scale
            )));
        }
        if self.iterations == 0 {
            return Err(PhysicsError::InvalidConfig(
                "iterations must be at least 1".to_string(),
            ));
        }
        if !(self.tick_duration.is_finite() && self.tick_duration > 0.0) {
            return Err(PhysicsError::InvalidConfig(format!(
                "tick_duration must be positive, got {}",
                self.tick_duration
            )));
        }
        if self.gravity.iter().any(|g| !g.is_finite()) {
            return Err(PhysicsError::InvalidConfig(format!(
                "gravity must be finite, got {:?}",
                self.gravity
            )));
        }
        Ok(())
    }

    /// Duration of one sub-step.
    pub fn sub_step(&self) -> f64 {
        self.tick_duration / self.iterations as f64
    }

    /// A definition database seeded from this configuration.
    pub fn entity_database(&self) -> MultibodyEntityDatabase {
        match self.seed {
            Some(seed) => MultibodyEntityDatabase::with_seed(seed),
            None => MultibodyEntityDatabase::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::from_toml_str("").unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.iterations, 50);
        assert!((config.sub_step() - 0.002).abs() < 1e-12);
    }

    #[test]
    fn test_partial_document() {
        let config = EngineConfig::from_toml_str(
            "world_scale = 10.0\nground_plane = false\nseed = 3\n",
        )
        .unwrap();
        assert_eq!(config.world_scale, 10.0);
        assert!(!config.ground_plane);
        assert_eq!(config.seed, Some(3));
        assert_eq!(config.iterations, 50);
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(EngineConfig::from_toml_str("world_scale = 0.0").is_err());
        assert!(EngineConfig::from_toml_str("world_scale = -2.0").is_err());
        assert!(EngineConfig::from_toml_str("iterations = 0").is_err());
        assert!(EngineConfig::from_toml_str("tick_duration = 0.0").is_err());
        assert!(EngineConfig::from_toml_str("iterations = \"many\"").is_err());
    }
}
