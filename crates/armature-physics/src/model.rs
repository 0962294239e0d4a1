//! The physics model interface shared by every representation in the engine.

use std::fmt;

use armature_kinematics::{Anchor, EntityKey, Scene};
use nalgebra::Isometry3;
use rapier3d::dynamics::{RigidBody, RigidBodyHandle};

use crate::config::EngineConfig;
use crate::convert::anchor_to_physics;
use crate::ray::{Aabb, Ray3};
use crate::world::PhysicsWorld;

/// The physics side of one scene entity, link or joint.
///
/// Models are owned by the engine and refer back to the scene only through
/// an [`EntityKey`]; every method receives the scene and world it needs.
pub trait PhysicsModel: fmt::Debug {
    /// Registry key.
    fn key(&self) -> &str;

    /// The scene entity this model belongs to.
    fn entity(&self) -> EntityKey;

    /// The body this model owns, if any.
    fn rigid_body(&self) -> Option<RigidBodyHandle> {
        None
    }

    /// Keys of models owned by this one, removed along with it.
    fn children(&self) -> &[String] {
        &[]
    }

    /// Push logical state into the world before stepping.
    fn update_from_entity(&mut self, _scene: &Scene, _world: &mut PhysicsWorld, _config: &EngineConfig) {}

    /// Pull the stepped state back into the scene.
    fn update_entity(&self, scene: &mut Scene, world: &PhysicsWorld, config: &EngineConfig);

    /// Put the physics representation at the current logical pose, at rest.
    fn place(&mut self, scene: &Scene, world: &mut PhysicsWorld, config: &EngineConfig);

    /// Return to the logical initial state. The scene must be reset first.
    fn reset(&mut self, scene: &Scene, world: &mut PhysicsWorld, config: &EngineConfig) {
        self.place(scene, world, config);
        self.calculate_bounding_box(world, config);
    }

    /// Remove everything this model put into the world.
    fn detach(&mut self, world: &mut PhysicsWorld);

    /// Current pose in scene units.
    fn pose(&self, world: &PhysicsWorld, config: &EngineConfig) -> Option<Anchor>;

    /// A box around the model in its own frame and the pose of that frame,
    /// scene units.
    fn oriented_bounds(&self, _world: &PhysicsWorld, _config: &EngineConfig) -> Option<(Isometry3<f64>, Aabb)> {
        None
    }

    /// Cached world-aligned bounding box, scene units.
    fn aabb(&self) -> Option<Aabb> {
        None
    }

    /// Refresh the cached bounding box.
    fn calculate_bounding_box(&mut self, _world: &PhysicsWorld, _config: &EngineConfig) {}

    /// Entry parameter of `ray` into this model. Models without an exact
    /// test report no hit.
    fn intersect_ray(&self, _ray: &Ray3, _world: &PhysicsWorld, _config: &EngineConfig) -> Option<f64> {
        None
    }
}

/// Teleport a body and clear its motion.
pub(crate) fn place_body(body: &mut RigidBody, anchor: &Anchor, scale: f64) {
    body.set_position(anchor_to_physics(anchor, scale), true);
    body.set_linvel(nalgebra::Vector3::zeros(), true);
    body.set_angvel(nalgebra::Vector3::zeros(), true);
    body.reset_forces(true);
    body.reset_torques(true);
}

/// Bring a body to the logical pose, keeping its motion.
///
/// Differences below [`POSE_TOLERANCE`] are f32 round-trip noise from the
/// previous write-back and leave the body untouched, so resting bodies stay
/// asleep.
pub(crate) fn sync_body(body: &mut RigidBody, anchor: &Anchor, scale: f64) {
    let target = anchor_to_physics(anchor, scale);
    let current = body.position();
    let moved = (target.translation.vector - current.translation.vector).norm() > POSE_TOLERANCE
        || target.rotation.angle_to(&current.rotation) > POSE_TOLERANCE;
    if moved {
        body.set_position(target, true);
    }
}

/// Largest pose change, physics units and radians, treated as no change.
pub(crate) const POSE_TOLERANCE: f32 = 1e-4;

/// World-aligned box of a model with oriented bounds.
pub(crate) fn world_aabb<M: PhysicsModel + ?Sized>(
    model: &M,
    world: &PhysicsWorld,
    config: &EngineConfig,
) -> Option<Aabb> {
    model
        .oriented_bounds(world, config)
        .map(|(pose, bounds)| bounds.transformed(&pose))
}
