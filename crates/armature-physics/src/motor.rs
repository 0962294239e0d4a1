//! Motorised hinges and locked joints between link bodies.

use armature_kinematics::{Anchor, Entity, EntityKey, MotorKind, Scene};
use nalgebra::{Isometry3, Translation3, Unit, UnitQuaternion, Vector3};
use rapier3d::dynamics::{
    GenericJoint, GenericJointBuilder, ImpulseJointHandle, JointAxesMask, JointAxis,
    MotorModel as RapierMotorModel, RigidBodyHandle,
};
use tracing::debug;

use crate::config::EngineConfig;
use crate::convert::anchor_from_physics;
use crate::error::PhysicsError;
use crate::model::PhysicsModel;
use crate::world::PhysicsWorld;

/// Gain used when driving a hinge towards its velocity target.
pub const DEFAULT_MOTOR_DAMPING: f32 = 100.0;

/// A joint between two link bodies.
///
/// Continuous joints are revolute about the joint axis with a velocity
/// motor; fixed joints lock all six axes. In both cases the joint frame's
/// X axis is the rotation axis and the parent and child do not collide.
#[derive(Debug)]
pub struct MotorModel {
    key: String,
    entity: EntityKey,
    joint_name: String,
    kind: MotorKind,
    parent: RigidBodyHandle,
    child: RigidBodyHandle,
    frame1: Isometry3<f32>,
    frame2: Isometry3<f32>,
    joint: ImpulseJointHandle,
}

impl MotorModel {
    /// Connect the bodies of the parent and child links of `joint_name`.
    pub fn build(
        scene: &Scene,
        entity: EntityKey,
        joint_name: &str,
        parent: RigidBodyHandle,
        child: RigidBodyHandle,
        world: &mut PhysicsWorld,
        config: &EngineConfig,
    ) -> Result<Self, PhysicsError> {
        let multibody = scene
            .get(entity)
            .and_then(Entity::as_multibody)
            .ok_or_else(|| PhysicsError::MissingEntity(format!("{entity:?}")))?;
        let motor = multibody
            .motor(joint_name)
            .ok_or_else(|| PhysicsError::MissingLink {
                entity: multibody.id().to_string(),
                link: joint_name.to_string(),
            })?;

        let axis_frame = axis_rotation(&Unit::new_normalize(motor.axis().into_inner().cast::<f32>()));
        let frame1 = Isometry3::from_parts(
            Translation3::from((motor.mount_position() * config.world_scale).cast::<f32>()),
            motor.mount_orientation().cast::<f32>() * axis_frame,
        );
        let frame2 = Isometry3::from_parts(Translation3::identity(), axis_frame);

        let joint = joint_data(motor.kind(), frame1, frame2, motor.effort_max() as f32);
        let handle = world.insert_joint(parent, child, joint);
        debug!("Created {:?} joint {}", motor.kind(), motor.id());

        Ok(Self {
            key: motor.id().to_string(),
            entity,
            joint_name: joint_name.to_string(),
            kind: motor.kind(),
            parent,
            child,
            frame1,
            frame2,
            joint: handle,
        })
    }

    /// Joint name within the definition.
    pub fn joint_name(&self) -> &str {
        &self.joint_name
    }

    /// Measured hinge angle in `(-π, π]` and the relative angular velocity
    /// about the hinge axis.
    pub fn measure(&self, world: &PhysicsWorld) -> Option<(f64, f64)> {
        let parent = world.body(self.parent)?;
        let child = world.body(self.child)?;

        let joint1 = parent.position() * self.frame1;
        let joint2 = child.position() * self.frame2;
        let relative = joint1.rotation.inverse() * joint2.rotation;
        let angle = wrap_angle(2.0 * f64::from(relative.i).atan2(f64::from(relative.w)));

        let axis = joint1.rotation * Vector3::x();
        let velocity = (child.angvel() - parent.angvel()).dot(&axis);
        Some((angle, f64::from(velocity)))
    }
}

/// Rotation taking +X onto `axis`.
fn axis_rotation(axis: &Unit<Vector3<f32>>) -> UnitQuaternion<f32> {
    UnitQuaternion::rotation_between(&Vector3::x(), axis.as_ref())
        .unwrap_or_else(|| UnitQuaternion::from_axis_angle(&Vector3::z_axis(), std::f32::consts::PI))
}

fn wrap_angle(angle: f64) -> f64 {
    use std::f64::consts::{PI, TAU};
    let wrapped = (angle + PI).rem_euclid(TAU) - PI;
    if wrapped <= -PI {
        wrapped + TAU
    } else {
        wrapped
    }
}

fn joint_data(kind: MotorKind, frame1: Isometry3<f32>, frame2: Isometry3<f32>, effort: f32) -> GenericJoint {
    match kind {
        MotorKind::Continuous => GenericJointBuilder::new(JointAxesMask::LOCKED_REVOLUTE_AXES)
            .local_frame1(frame1)
            .local_frame2(frame2)
            .motor_model(JointAxis::AngX, RapierMotorModel::AccelerationBased)
            .motor_max_force(JointAxis::AngX, effort)
            .contacts_enabled(false)
            .build(),
        MotorKind::Fixed => GenericJointBuilder::new(JointAxesMask::LOCKED_FIXED_AXES)
            .local_frame1(frame1)
            .local_frame2(frame2)
            .contacts_enabled(false)
            .build(),
    }
}

impl PhysicsModel for MotorModel {
    fn key(&self) -> &str {
        &self.key
    }

    fn entity(&self) -> EntityKey {
        self.entity
    }

    /// Aim one tick ahead of the measured angle at the target velocity.
    fn update_from_entity(&mut self, scene: &Scene, world: &mut PhysicsWorld, config: &EngineConfig) {
        if self.kind == MotorKind::Fixed {
            return;
        }
        let Some(target) = scene
            .get(self.entity)
            .and_then(Entity::as_multibody)
            .and_then(|m| m.motor(&self.joint_name))
            .map(|motor| motor.velocity_target())
        else {
            return;
        };
        let Some((measured, _)) = self.measure(world) else {
            return;
        };

        let tick = config.tick_duration;
        let target_angle = measured + target * tick;
        let velocity = (target_angle - measured) / tick;
        if let Some(joint) = world.joint_mut(self.joint) {
            joint
                .data
                .set_motor_velocity(JointAxis::AngX, velocity as f32, DEFAULT_MOTOR_DAMPING);
        }
    }

    fn update_entity(&self, scene: &mut Scene, world: &PhysicsWorld, _config: &EngineConfig) {
        let Some((angle, velocity)) = self.measure(world) else {
            return;
        };
        if let Some(motor) = scene
            .get_mut(self.entity)
            .and_then(Entity::as_multibody_mut)
            .and_then(|m| m.motor_mut(&self.joint_name))
        {
            motor.set_position_current(angle);
            motor.set_velocity_current(velocity);
        }
    }

    fn place(&mut self, _scene: &Scene, world: &mut PhysicsWorld, _config: &EngineConfig) {
        if self.kind == MotorKind::Fixed {
            return;
        }
        if let Some(joint) = world.joint_mut(self.joint) {
            joint
                .data
                .set_motor_velocity(JointAxis::AngX, 0.0, DEFAULT_MOTOR_DAMPING);
        }
    }

    fn detach(&mut self, world: &mut PhysicsWorld) {
        world.remove_joint(self.joint);
    }

    /// The joint frame on the parent body.
    fn pose(&self, world: &PhysicsWorld, config: &EngineConfig) -> Option<Anchor> {
        let parent = world.body(self.parent)?;
        Some(anchor_from_physics(&(parent.position() * self.frame1), config.world_scale))
    }
}
