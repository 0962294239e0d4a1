//! Physics world management using Rapier3d.

use nalgebra::Vector3;
use rapier3d::dynamics::{
    CCDSolver, GenericJoint, ImpulseJoint, ImpulseJointHandle, ImpulseJointSet,
    IntegrationParameters, IslandManager, MultibodyJointSet, RigidBody, RigidBodyHandle,
    RigidBodySet,
};
use rapier3d::geometry::{
    BroadPhaseMultiSap, Collider, ColliderBuilder, ColliderHandle, ColliderSet, Group,
    InteractionGroups, NarrowPhase,
};
use rapier3d::pipeline::{PhysicsPipeline, QueryPipeline};
use tracing::trace;

/// Friction of the ground half-space.
pub const GROUND_FRICTION: f32 = 0.8;
/// Restitution of the ground half-space.
pub const GROUND_RESTITUTION: f32 = 0.8;

/// Collision groups for a body.
///
/// Static bodies only meet dynamic ones; dynamic bodies meet everything.
pub fn collision_groups(dynamic: bool) -> InteractionGroups {
    if dynamic {
        InteractionGroups::new(Group::from_bits_truncate(0x20), Group::from_bits_truncate(0x30))
    } else {
        InteractionGroups::new(Group::from_bits_truncate(0x10), Group::from_bits_truncate(0x20))
    }
}

/// Rapier sets and pipeline plus a fixed-step accumulator.
pub struct PhysicsWorld {
    // Rapier components
    pipeline: PhysicsPipeline,
    gravity: Vector3<f32>,
    integration_params: IntegrationParameters,
    islands: IslandManager,
    broad_phase: BroadPhaseMultiSap,
    narrow_phase: NarrowPhase,
    bodies: RigidBodySet,
    colliders: ColliderSet,
    impulse_joints: ImpulseJointSet,
    multibody_joints: MultibodyJointSet,
    ccd_solver: CCDSolver,
    query_pipeline: QueryPipeline,

    accumulator: f64,
    ground: Option<ColliderHandle>,
}

impl std::fmt::Debug for PhysicsWorld {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PhysicsWorld")
            .field("gravity", &self.gravity)
            .field("bodies", &self.bodies.len())
            .field("colliders", &self.colliders.len())
            .field("joints", &self.impulse_joints.len())
            .finish()
    }
}

impl PhysicsWorld {
    /// Create an empty world. `gravity` is in physics units.
    pub fn new(gravity: Vector3<f32>) -> Self {
        Self {
            pipeline: PhysicsPipeline::new(),
            gravity,
            integration_params: IntegrationParameters::default(),
            islands: IslandManager::new(),
            broad_phase: BroadPhaseMultiSap::new(),
            narrow_phase: NarrowPhase::new(),
            bodies: RigidBodySet::new(),
            colliders: ColliderSet::new(),
            impulse_joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            query_pipeline: QueryPipeline::new(),
            accumulator: 0.0,
            ground: None,
        }
    }

    /// Add a static half-space below z = 0. Adding it twice is a no-op.
    pub fn add_ground_plane(&mut self) -> ColliderHandle {
        if let Some(ground) = self.ground {
            return ground;
        }
        let collider = ColliderBuilder::halfspace(Vector3::z_axis())
            .friction(GROUND_FRICTION)
            .restitution(GROUND_RESTITUTION)
            .collision_groups(collision_groups(false))
            .build();
        let handle = self.colliders.insert(collider);
        self.ground = Some(handle);
        handle
    }

    /// Whether a ground plane was added.
    pub fn has_ground_plane(&self) -> bool {
        self.ground.is_some()
    }

    /// Set gravity vector, physics units.
    pub fn set_gravity(&mut self, gravity: Vector3<f32>) {
        self.gravity = gravity;
    }

    /// Gravity vector, physics units.
    pub fn gravity(&self) -> Vector3<f32> {
        self.gravity
    }

    /// Insert a body and attach its colliders.
    pub fn insert_body(&mut self, body: RigidBody, colliders: Vec<Collider>) -> RigidBodyHandle {
        let handle = self.bodies.insert(body);
        for collider in colliders {
            self.colliders
                .insert_with_parent(collider, handle, &mut self.bodies);
        }
        handle
    }

    /// Remove a body with its colliders and any joints attached to it.
    pub fn remove_body(&mut self, handle: RigidBodyHandle) -> Option<RigidBody> {
        self.bodies.remove(
            handle,
            &mut self.islands,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            true,
        )
    }

    /// Connect two bodies.
    pub fn insert_joint(
        &mut self,
        parent: RigidBodyHandle,
        child: RigidBodyHandle,
        joint: impl Into<GenericJoint>,
    ) -> ImpulseJointHandle {
        self.impulse_joints.insert(parent, child, joint, true)
    }

    /// Remove a joint. Returns `None` if it is already gone, e.g. because
    /// one of its bodies was removed first.
    pub fn remove_joint(&mut self, handle: ImpulseJointHandle) -> Option<ImpulseJoint> {
        self.impulse_joints.remove(handle, true)
    }

    /// Look up a body.
    pub fn body(&self, handle: RigidBodyHandle) -> Option<&RigidBody> {
        self.bodies.get(handle)
    }

    /// Look up a body mutably.
    pub fn body_mut(&mut self, handle: RigidBodyHandle) -> Option<&mut RigidBody> {
        self.bodies.get_mut(handle)
    }

    /// Look up a joint.
    pub fn joint(&self, handle: ImpulseJointHandle) -> Option<&ImpulseJoint> {
        self.impulse_joints.get(handle)
    }

    /// Look up a joint mutably, waking its bodies.
    pub fn joint_mut(&mut self, handle: ImpulseJointHandle) -> Option<&mut ImpulseJoint> {
        self.impulse_joints.get_mut(handle, true)
    }

    /// Advance by `duration` seconds in fixed steps of `sub_step`.
    ///
    /// Time that does not fill a whole sub-step carries over to the next
    /// call. At most `max_substeps` steps run; excess time is dropped.
    /// Returns the number of steps taken.
    pub fn step(&mut self, duration: f64, max_substeps: usize, sub_step: f64) -> usize {
        self.accumulator += duration;
        let due = (self.accumulator / sub_step + 1e-9).floor() as usize;
        self.accumulator = (self.accumulator - due as f64 * sub_step).max(0.0);
        let steps = due.min(max_substeps);

        self.integration_params.dt = sub_step as f32;
        for _ in 0..steps {
            self.pipeline.step(
                &self.gravity,
                &self.integration_params,
                &mut self.islands,
                &mut self.broad_phase,
                &mut self.narrow_phase,
                &mut self.bodies,
                &mut self.colliders,
                &mut self.impulse_joints,
                &mut self.multibody_joints,
                &mut self.ccd_solver,
                Some(&mut self.query_pipeline),
                &(),
                &(),
            );
        }
        trace!("Stepped physics world {} times (dt = {})", steps, sub_step);
        steps
    }

    /// Number of bodies.
    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    /// Number of joints.
    pub fn joint_count(&self) -> usize {
        self.impulse_joints.len()
    }

    /// Number of colliders, the ground included.
    pub fn collider_count(&self) -> usize {
        self.colliders.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rapier3d::dynamics::{GenericJointBuilder, JointAxesMask, RigidBodyBuilder};

    fn ball() -> Collider {
        ColliderBuilder::ball(0.5).build()
    }

    #[test]
    fn test_step_accumulates_remainder() {
        let mut world = PhysicsWorld::new(Vector3::zeros());
        assert_eq!(world.step(0.1, 50, 0.002), 50);
        // 0.003 is one and a half steps; the half carries over.
        assert_eq!(world.step(0.003, 50, 0.002), 1);
        assert_eq!(world.step(0.001, 50, 0.002), 1);
        assert_eq!(world.step(0.001, 50, 0.002), 0);
    }

    #[test]
    fn test_step_is_capped() {
        let mut world = PhysicsWorld::new(Vector3::zeros());
        assert_eq!(world.step(1.0, 10, 0.01), 10);
        // The dropped time does not come back.
        assert_eq!(world.step(0.01, 10, 0.01), 1);
    }

    #[test]
    fn test_body_falls_under_gravity() {
        let mut world = PhysicsWorld::new(Vector3::new(0.0, 0.0, -9.81));
        let handle = world.insert_body(
            RigidBodyBuilder::dynamic().translation(Vector3::new(0.0, 0.0, 5.0)).build(),
            vec![ball()],
        );
        world.step(0.5, 100, 0.01);
        let z = world.body(handle).unwrap().translation().z;
        assert!(z < 4.0, "body should have fallen, z = {z}");
    }

    #[test]
    fn test_ground_plane_holds_body() {
        let mut world = PhysicsWorld::new(Vector3::new(0.0, 0.0, -9.81));
        world.add_ground_plane();
        world.add_ground_plane();
        assert_eq!(world.collider_count(), 1);

        let handle = world.insert_body(
            RigidBodyBuilder::dynamic().translation(Vector3::new(0.0, 0.0, 1.0)).build(),
            vec![ColliderBuilder::ball(0.5).restitution(0.0).collision_groups(collision_groups(true)).build()],
        );
        world.step(3.0, 1000, 0.01);
        let z = world.body(handle).unwrap().translation().z;
        assert!(z > 0.3, "ball sank through the ground, z = {z}");
    }

    #[test]
    fn test_remove_body_drops_joints() {
        let mut world = PhysicsWorld::new(Vector3::zeros());
        let a = world.insert_body(RigidBodyBuilder::dynamic().build(), vec![ball()]);
        let b = world.insert_body(RigidBodyBuilder::dynamic().build(), vec![ball()]);
        let joint = world.insert_joint(a, b, GenericJointBuilder::new(JointAxesMask::LOCKED_FIXED_AXES));
        assert_eq!((world.body_count(), world.joint_count(), world.collider_count()), (2, 1, 2));

        assert!(world.remove_body(a).is_some());
        assert_eq!((world.body_count(), world.joint_count(), world.collider_count()), (1, 0, 1));
        assert!(world.remove_joint(joint).is_none());
        assert!(world.remove_body(a).is_none());
    }

    #[test]
    fn test_static_groups_ignore_each_other() {
        let static_groups = collision_groups(false);
        let dynamic_groups = collision_groups(true);
        assert!(!static_groups.test(static_groups));
        assert!(static_groups.test(dynamic_groups));
        assert!(dynamic_groups.test(dynamic_groups));
    }
}
