//! The physics engine: model registry, tick loop and spatial queries.

use std::collections::{BTreeMap, HashMap, HashSet};

use armature_kinematics::{Anchor, EntityKey, EntityKind, Scene};
use nalgebra::Vector3;
use tracing::{debug, info, trace};

use crate::config::EngineConfig;
use crate::error::PhysicsError;
use crate::model::PhysicsModel;
use crate::multibody::add_multibody;
use crate::ray::{box_edges, Ray3};
use crate::shapes::add_shape;
use crate::world::PhysicsWorld;

/// Builds and registers the physics models for one scene entity.
pub type ModelFactory = fn(&mut PhysicsEngine, &Scene, EntityKey) -> Result<(), PhysicsError>;

/// One model hit by a ray.
#[derive(Debug, Clone, PartialEq)]
pub struct RayHit {
    /// Registry key of the model.
    pub key: String,
    /// Entry parameter along the ray, in `[0, 1]`.
    pub t: f64,
}

/// Owns the physics world and every physics model, keyed by entity, link or
/// joint id.
///
/// A tick pushes logical state into the world, steps it and pulls the
/// result back, always in that order.
pub struct PhysicsEngine {
    config: EngineConfig,
    world: PhysicsWorld,
    models: BTreeMap<String, Box<dyn PhysicsModel>>,
    factories: HashMap<EntityKind, ModelFactory>,
}

impl std::fmt::Debug for PhysicsEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PhysicsEngine")
            .field("config", &self.config)
            .field("world", &self.world)
            .field("models", &self.models.keys().collect::<Vec<_>>())
            .field("factories", &self.factories.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Default for PhysicsEngine {
    fn default() -> Self {
        Self::with_valid_config(EngineConfig::default())
    }
}

impl PhysicsEngine {
    /// Create an engine with the built-in factories for every entity kind.
    pub fn new(config: EngineConfig) -> Result<Self, PhysicsError> {
        config.validate()?;
        Ok(Self::with_valid_config(config))
    }

    fn with_valid_config(config: EngineConfig) -> Self {
        let mut engine = Self {
            world: build_world(&config),
            config,
            models: BTreeMap::new(),
            factories: HashMap::new(),
        };
        engine.register_factory(EntityKind::Box, add_shape);
        engine.register_factory(EntityKind::Cylinder, add_shape);
        engine.register_factory(EntityKind::Sphere, add_shape);
        engine.register_factory(EntityKind::Multibody, add_multibody);
        engine
    }

    /// Replace the configuration and rebuild the world.
    ///
    /// Only allowed while no models are registered.
    pub fn configure(&mut self, config: EngineConfig) -> Result<(), PhysicsError> {
        config.validate()?;
        if !self.models.is_empty() {
            return Err(PhysicsError::InvalidConfig(format!(
                "cannot reconfigure with {} models registered",
                self.models.len()
            )));
        }
        info!(
            "Physics world scale {}, {} sub-steps per {}s tick",
            config.world_scale, config.iterations, config.tick_duration
        );
        self.world = build_world(&config);
        self.config = config;
        Ok(())
    }

    /// Current configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The physics world.
    pub fn world(&self) -> &PhysicsWorld {
        &self.world
    }

    pub(crate) fn world_and_config_mut(&mut self) -> (&mut PhysicsWorld, &EngineConfig) {
        (&mut self.world, &self.config)
    }

    /// Use `factory` for entities of `kind`, replacing any previous one.
    pub fn register_factory(&mut self, kind: EntityKind, factory: ModelFactory) {
        self.factories.insert(kind, factory);
    }

    /// Build the physics representation of a scene entity.
    pub fn add_entity(&mut self, scene: &Scene, entity: EntityKey) -> Result<(), PhysicsError> {
        let logical = scene
            .get(entity)
            .ok_or_else(|| PhysicsError::MissingEntity(format!("{entity:?}")))?;
        let kind = logical.kind();
        let factory = *self
            .factories
            .get(&kind)
            .ok_or(PhysicsError::NoFactory(kind))?;
        factory(self, scene, entity)?;
        debug!("Added {:?} entity {} to physics", kind, logical.id());
        Ok(())
    }

    /// Register a model built by a factory.
    ///
    /// A model whose key is taken is detached from the world and rejected.
    pub fn insert_model(&mut self, mut model: Box<dyn PhysicsModel>) -> Result<(), PhysicsError> {
        let key = model.key().to_string();
        if self.models.contains_key(&key) {
            model.detach(&mut self.world);
            return Err(PhysicsError::DuplicateModel(key));
        }
        model.calculate_bounding_box(&self.world, &self.config);
        self.models.insert(key, model);
        Ok(())
    }

    /// Remove a model and everything it owns. Unknown keys are ignored.
    ///
    /// Returns whether anything was removed.
    pub fn remove_entity(&mut self, key: &str) -> bool {
        let Some(mut model) = self.models.remove(key) else {
            return false;
        };
        for child in model.children().to_vec() {
            self.remove_entity(&child);
        }
        model.detach(&mut self.world);
        debug!("Removed physics model {}", key);
        true
    }

    /// Look up a model.
    pub fn model(&self, key: &str) -> Option<&dyn PhysicsModel> {
        self.models.get(key).map(|model| model.as_ref())
    }

    /// Registered keys in order.
    pub fn model_keys(&self) -> impl Iterator<Item = &str> {
        self.models.keys().map(String::as_str)
    }

    /// Number of registered models.
    pub fn model_count(&self) -> usize {
        self.models.len()
    }

    /// Run one tick. Returns the number of physics sub-steps taken.
    pub fn tick(&mut self, scene: &mut Scene) -> usize {
        for model in self.models.values_mut() {
            model.update_from_entity(scene, &mut self.world, &self.config);
        }
        let steps = self.world.step(
            self.config.tick_duration,
            self.config.iterations,
            self.config.sub_step(),
        );
        for model in self.models.values() {
            model.update_entity(scene, &self.world, &self.config);
        }
        trace!("Tick complete: {} models, {} sub-steps", self.models.len(), steps);
        steps
    }

    /// Put every model back at its logical initial state.
    ///
    /// Call [`Scene::reset`] first so link poses and joint angles are back
    /// at their blueprint values.
    pub fn reset(&mut self, scene: &Scene) {
        for model in self.models.values_mut() {
            model.reset(scene, &mut self.world, &self.config);
        }
        debug!("Reset {} physics models", self.models.len());
    }

    /// Move an entity in the scene and its models in the world.
    pub fn move_entity(&mut self, scene: &mut Scene, entity: EntityKey, anchor: Anchor) -> Result<(), PhysicsError> {
        scene.move_entity(entity, anchor)?;
        for model in self.models.values_mut().filter(|m| m.entity() == entity) {
            model.place(scene, &mut self.world, &self.config);
            model.calculate_bounding_box(&self.world, &self.config);
        }
        Ok(())
    }

    /// The model the ray enters first.
    pub fn intersect_ray_first(&self, ray: &Ray3) -> Option<RayHit> {
        self.ray_hits(ray).min_by(|a, b| a.t.total_cmp(&b.t))
    }

    /// Every model the ray enters, unordered.
    pub fn intersect_ray_all(&self, ray: &Ray3) -> Vec<RayHit> {
        self.ray_hits(ray).collect()
    }

    fn ray_hits<'a>(&'a self, ray: &'a Ray3) -> impl Iterator<Item = RayHit> + 'a {
        self.models.values().filter_map(move |model| {
            model
                .intersect_ray(ray, &self.world, &self.config)
                .map(|t| RayHit {
                    key: model.key().to_string(),
                    t,
                })
        })
    }

    /// Approximate overlap test for the model `key` and everything it owns.
    ///
    /// The 12 edges of each oriented bounding box are cast against every
    /// other model's ray test. Overlaps that cross no edge are missed, as
    /// are models with no exact ray test.
    pub fn is_colliding_with_something(&self, key: &str) -> bool {
        let mut subject = HashSet::new();
        let mut pending = vec![key];
        while let Some(next) = pending.pop() {
            if let Some(model) = self.models.get(next) {
                if subject.insert(model.key()) {
                    pending.extend(model.children().iter().map(String::as_str));
                }
            }
        }

        let edges: Vec<Ray3> = subject
            .iter()
            .filter_map(|k| self.models.get(*k))
            .filter_map(|m| m.oriented_bounds(&self.world, &self.config))
            .flat_map(|(pose, bounds)| box_edges(&bounds, &pose))
            .collect();
        if edges.is_empty() {
            return false;
        }

        self.models
            .values()
            .filter(|other| !subject.contains(other.key()))
            .any(|other| {
                edges
                    .iter()
                    .any(|edge| other.intersect_ray(edge, &self.world, &self.config).is_some())
            })
    }
}

fn build_world(config: &EngineConfig) -> PhysicsWorld {
    let gravity = (Vector3::from(config.gravity) * config.world_scale).cast::<f32>();
    let mut world = PhysicsWorld::new(gravity);
    if config.ground_plane {
        world.add_ground_plane();
    }
    world
}

#[cfg(test)]
mod tests {
    use super::*;
    use armature_kinematics::{BoxEntity, SceneError, SphereEntity};
    use nalgebra::Point3;

    fn engine() -> PhysicsEngine {
        PhysicsEngine::new(EngineConfig {
            ground_plane: false,
            gravity: [0.0; 3],
            ..EngineConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn test_add_and_remove() {
        let mut engine = engine();
        let mut scene = Scene::new();
        let key = scene
            .add(SphereEntity::new("ball", Anchor::at(0.0, 0.0, 1.0), 0.5, true, 1.0))
            .unwrap();
        engine.add_entity(&scene, key).unwrap();
        assert_eq!(engine.model_count(), 1);
        assert_eq!(engine.world().body_count(), 1);
        assert!(engine.model("ball").unwrap().aabb().is_some());

        assert!(matches!(
            engine.add_entity(&scene, key),
            Err(PhysicsError::DuplicateModel(_))
        ));
        assert_eq!(engine.world().body_count(), 1);

        assert!(engine.remove_entity("ball"));
        assert!(!engine.remove_entity("ball"));
        assert_eq!(engine.world().body_count(), 0);
    }

    #[test]
    fn test_default_engine() {
        let engine = PhysicsEngine::default();
        assert_eq!(engine.config(), &EngineConfig::default());
        assert!(engine.world().has_ground_plane());
        assert_eq!(engine.model_count(), 0);
        assert!(PhysicsEngine::new(EngineConfig {
            iterations: 0,
            ..EngineConfig::default()
        })
        .is_err());
    }

    #[test]
    fn test_move_missing_entity() {
        let mut engine = engine();
        let mut scene = Scene::new();
        let key = scene
            .add(SphereEntity::new("ball", Anchor::identity(), 0.5, true, 1.0))
            .unwrap();
        engine.add_entity(&scene, key).unwrap();
        scene.remove(key);
        assert!(matches!(
            engine.move_entity(&mut scene, key, Anchor::at(1.0, 0.0, 0.0)),
            Err(PhysicsError::Scene(SceneError::MissingEntity(_)))
        ));
    }

    #[test]
    fn test_missing_factory() {
        let mut engine = engine();
        engine.factories.clear();
        let mut scene = Scene::new();
        let key = scene
            .add(SphereEntity::new("ball", Anchor::identity(), 0.5, true, 1.0))
            .unwrap();
        assert!(matches!(
            engine.add_entity(&scene, key),
            Err(PhysicsError::NoFactory(EntityKind::Sphere))
        ));
    }

    #[test]
    fn test_configure_only_when_empty() {
        let mut engine = engine();
        let config = EngineConfig {
            world_scale: 100.0,
            ..EngineConfig::default()
        };
        engine.configure(config.clone()).unwrap();
        assert_eq!(engine.config().world_scale, 100.0);
        assert!(engine.world().has_ground_plane());

        let mut scene = Scene::new();
        let key = scene
            .add(SphereEntity::new("ball", Anchor::identity(), 0.5, false, 0.0))
            .unwrap();
        engine.add_entity(&scene, key).unwrap();
        assert!(matches!(
            engine.configure(config),
            Err(PhysicsError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_overlap_by_edges() {
        let mut engine = engine();
        let mut scene = Scene::new();
        let slab = scene
            .add(BoxEntity::new("slab", Anchor::identity(), Vector3::new(2.0, 2.0, 1.0), false, 0.0))
            .unwrap();
        let ball = scene
            .add(SphereEntity::new("ball", Anchor::at(1.0, 1.0, 1.0), 0.5, false, 0.0))
            .unwrap();
        engine.add_entity(&scene, slab).unwrap();
        engine.add_entity(&scene, ball).unwrap();
        assert!(engine.is_colliding_with_something("slab"));
        assert!(engine.is_colliding_with_something("ball"));

        engine
            .move_entity(&mut scene, ball, Anchor::at(5.0, 0.0, 1.0))
            .unwrap();
        assert!(!engine.is_colliding_with_something("slab"));
        assert!(!engine.is_colliding_with_something("missing"));
    }

    #[test]
    fn test_ray_all_and_first() {
        let mut engine = engine();
        let mut scene = Scene::new();
        for (id, x) in [("far", 6.0), ("near", 2.0)] {
            let key = scene
                .add(SphereEntity::new(id, Anchor::at(x, 0.0, 0.0), 0.5, false, 0.0))
                .unwrap();
            engine.add_entity(&scene, key).unwrap();
        }
        let ray = Ray3::new(Point3::new(0.0, 0.0, 0.0), Point3::new(10.0, 0.0, 0.0));
        assert_eq!(engine.intersect_ray_all(&ray).len(), 2);
        assert_eq!(engine.intersect_ray_first(&ray).unwrap().key, "near");

        let short = Ray3::new(Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 0.0, 0.0));
        assert!(engine.intersect_ray_first(&short).is_none());
    }
}
