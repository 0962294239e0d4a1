//! Runtime joint wrappers.

use armature_defs::{JointDefinition, JointType};
use nalgebra::{Unit, UnitQuaternion, Vector3};

/// Whether the joint drives relative rotation or holds the links together.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotorKind {
    /// Unlimited motorised hinge.
    Continuous,
    /// Rigid connection; velocity targets are ignored.
    Fixed,
}

/// A motorised joint connecting a parent link to a child link.
///
/// The controller side sets a velocity target; the physics side writes the
/// measured hinge angle and velocity back every tick.
#[derive(Debug, Clone)]
pub struct MotorActuator {
    id: String,
    parent: String,
    child: String,
    mount_position: Vector3<f64>,
    mount_orientation: UnitQuaternion<f64>,
    axis: Unit<Vector3<f64>>,
    kind: MotorKind,
    velocity_max_forward: f64,
    velocity_max_reverse: f64,
    input_range: (f64, f64),
    effort_max: f64,
    damping: f64,
    friction: f64,
    velocity_target: f64,
    velocity_current: f64,
    position_current: f64,
}

impl MotorActuator {
    /// Build the wrapper for a joint. `id` is the scene-wide id.
    pub fn from_definition(id: impl Into<String>, joint: &JointDefinition) -> Self {
        let kind = match joint.joint_type {
            JointType::Fixed => MotorKind::Fixed,
            _ => MotorKind::Continuous,
        };
        let velocity = joint.limit.velocity.abs();
        Self {
            id: id.into(),
            parent: joint.parent.clone(),
            child: joint.child.clone(),
            mount_position: joint.origin,
            mount_orientation: joint.orientation(),
            axis: Unit::try_new(joint.axis, f64::EPSILON).unwrap_or_else(Vector3::x_axis),
            kind,
            velocity_max_forward: velocity,
            velocity_max_reverse: -velocity,
            input_range: (-1.0, 1.0),
            effort_max: joint.limit.effort,
            damping: joint.damping,
            friction: joint.friction,
            velocity_target: 0.0,
            velocity_current: 0.0,
            position_current: 0.0,
        }
    }

    /// Scene-wide id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Parent link name.
    pub fn parent(&self) -> &str {
        &self.parent
    }

    /// Child link name.
    pub fn child(&self) -> &str {
        &self.child
    }

    /// Joint origin in the parent frame.
    pub fn mount_position(&self) -> Vector3<f64> {
        self.mount_position
    }

    /// Joint frame orientation in the parent frame.
    pub fn mount_orientation(&self) -> UnitQuaternion<f64> {
        self.mount_orientation
    }

    /// Rotation axis in the joint frame.
    pub fn axis(&self) -> Unit<Vector3<f64>> {
        self.axis
    }

    /// Joint kind.
    pub fn kind(&self) -> MotorKind {
        self.kind
    }

    /// Maximum forward velocity, rad/s.
    pub fn velocity_max_forward(&self) -> f64 {
        self.velocity_max_forward
    }

    /// Maximum reverse velocity, rad/s, never positive.
    pub fn velocity_max_reverse(&self) -> f64 {
        self.velocity_max_reverse
    }

    /// Override the velocity bounds. A positive reverse bound is negated.
    pub fn set_velocity_limits(&mut self, forward: f64, reverse: f64) {
        self.velocity_max_forward = forward;
        self.velocity_max_reverse = -reverse.abs();
    }

    /// Maximum motor effort.
    pub fn effort_max(&self) -> f64 {
        self.effort_max
    }

    /// Viscous damping from the definition.
    pub fn damping(&self) -> f64 {
        self.damping
    }

    /// Static friction from the definition.
    pub fn friction(&self) -> f64 {
        self.friction
    }

    /// Set the target from a normalised controller input in `[-1, 1]`,
    /// mapped linearly onto `[reverse, forward]`.
    pub fn set_velocity_target(&mut self, input: f64) {
        let (low, high) = self.input_range;
        let normalised = (input.clamp(low, high) - low) / (high - low);
        let target = self.velocity_max_reverse
            + normalised * (self.velocity_max_forward - self.velocity_max_reverse);
        self.set_velocity_target_raw(target);
    }

    /// Set the target angular velocity directly, rad/s.
    pub fn set_velocity_target_raw(&mut self, velocity: f64) {
        if self.kind == MotorKind::Continuous {
            self.velocity_target = velocity;
        }
    }

    /// Target angular velocity, rad/s.
    pub fn velocity_target(&self) -> f64 {
        self.velocity_target
    }

    /// Measured angular velocity about the axis.
    pub fn current_velocity(&self) -> f64 {
        self.velocity_current
    }

    /// Measured hinge angle.
    pub fn current_position(&self) -> f64 {
        self.position_current
    }

    /// Record the measured hinge angle.
    pub fn set_position_current(&mut self, angle: f64) {
        self.position_current = angle;
    }

    /// Record the measured angular velocity.
    pub fn set_velocity_current(&mut self, velocity: f64) {
        self.velocity_current = velocity;
    }

    /// Child frame relative to the parent frame at the current angle.
    pub fn child_offset(&self) -> (Vector3<f64>, UnitQuaternion<f64>) {
        let spin = UnitQuaternion::from_axis_angle(&self.axis, self.position_current);
        (self.mount_position, self.mount_orientation * spin)
    }

    /// Zero targets and measurements.
    pub fn reset(&mut self) {
        self.velocity_target = 0.0;
        self.velocity_current = 0.0;
        self.position_current = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use armature_defs::JointLimit;

    fn joint(joint_type: JointType, velocity: f64) -> JointDefinition {
        JointDefinition {
            name: "j".into(),
            joint_type,
            parent: "a".into(),
            child: "b".into(),
            origin: Vector3::new(0.0, 0.0, 1.0),
            rpy: Vector3::zeros(),
            axis: Vector3::new(0.0, 0.0, 2.0),
            damping: 0.0,
            friction: 0.0,
            limit: JointLimit {
                velocity,
                effort: 7.0,
                ..Default::default()
            },
        }
    }

    #[test]
    fn test_input_maps_onto_velocity_range() {
        let mut motor = MotorActuator::from_definition("bot.j", &joint(JointType::Continuous, 4.0));
        assert_eq!(motor.velocity_max_reverse(), -4.0);
        assert_eq!(motor.effort_max(), 7.0);
        assert_relative_eq!(motor.axis().into_inner(), Vector3::z());

        motor.set_velocity_target(1.0);
        assert_relative_eq!(motor.velocity_target(), 4.0);
        motor.set_velocity_target(0.0);
        assert_relative_eq!(motor.velocity_target(), 0.0);
        motor.set_velocity_target(-0.5);
        assert_relative_eq!(motor.velocity_target(), -2.0);
        motor.set_velocity_target(3.0);
        assert_relative_eq!(motor.velocity_target(), 4.0);
    }

    #[test]
    fn test_asymmetric_limits() {
        let mut motor = MotorActuator::from_definition("bot.j", &joint(JointType::Continuous, 1.0));
        motor.set_velocity_limits(3.0, 1.0);
        assert_eq!(motor.velocity_max_reverse(), -1.0);
        motor.set_velocity_target(0.0);
        assert_relative_eq!(motor.velocity_target(), 1.0);
    }

    #[test]
    fn test_fixed_joint_ignores_targets() {
        let mut motor = MotorActuator::from_definition("bot.j", &joint(JointType::Fixed, 4.0));
        motor.set_velocity_target(1.0);
        motor.set_velocity_target_raw(2.0);
        assert_eq!(motor.velocity_target(), 0.0);
        assert_eq!(motor.kind(), MotorKind::Fixed);
    }

    #[test]
    fn test_reset_zeroes_state() {
        let mut motor = MotorActuator::from_definition("bot.j", &joint(JointType::Continuous, 4.0));
        motor.set_velocity_target_raw(1.0);
        motor.set_position_current(0.3);
        motor.set_velocity_current(0.9);
        motor.reset();
        assert_eq!(
            (motor.velocity_target(), motor.current_position(), motor.current_velocity()),
            (0.0, 0.0, 0.0)
        );
    }
}
