//! Joint definitions.

use nalgebra::{UnitQuaternion, Vector3};

/// The kinds of joint a definition may declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JointType {
    /// Hinge with position limits.
    Revolute,
    /// Unlimited hinge.
    Continuous,
    /// Slider with limits.
    Prismatic,
    /// Rigid connection.
    Fixed,
    /// Six degrees of freedom.
    Floating,
    /// Motion in a plane.
    Planar,
}

impl JointType {
    /// Parse a type name as written in a document.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "revolute" => Some(Self::Revolute),
            "continuous" => Some(Self::Continuous),
            "prismatic" => Some(Self::Prismatic),
            "fixed" => Some(Self::Fixed),
            "floating" => Some(Self::Floating),
            "planar" => Some(Self::Planar),
            _ => None,
        }
    }

    /// Name as written in a document.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Revolute => "revolute",
            Self::Continuous => "continuous",
            Self::Prismatic => "prismatic",
            Self::Fixed => "fixed",
            Self::Floating => "floating",
            Self::Planar => "planar",
        }
    }

    /// Only continuous and fixed joints can be simulated.
    pub fn is_supported(self) -> bool {
        matches!(self, Self::Continuous | Self::Fixed)
    }

    /// Whether the document must carry a `limit` element.
    pub fn requires_limit(self) -> bool {
        matches!(self, Self::Revolute | Self::Prismatic)
    }
}

/// Joint limits.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JointLimit {
    /// Lower position bound.
    pub lower: f64,
    /// Upper position bound.
    pub upper: f64,
    /// Maximum effort.
    pub effort: f64,
    /// Maximum velocity.
    pub velocity: f64,
}

impl Default for JointLimit {
    fn default() -> Self {
        Self {
            lower: 0.0,
            upper: 0.0,
            effort: 100.0,
            velocity: 0.0,
        }
    }
}

/// A joint between two links.
#[derive(Debug, Clone)]
pub struct JointDefinition {
    /// Unique name within the definition.
    pub name: String,
    /// Kind.
    pub joint_type: JointType,
    /// Parent link name.
    pub parent: String,
    /// Child link name.
    pub child: String,
    /// Joint origin in the parent frame.
    pub origin: Vector3<f64>,
    /// Roll, pitch, yaw of the joint frame.
    pub rpy: Vector3<f64>,
    /// Axis in the joint frame.
    pub axis: Vector3<f64>,
    /// Viscous damping.
    pub damping: f64,
    /// Static friction.
    pub friction: f64,
    /// Limits.
    pub limit: JointLimit,
}

impl JointDefinition {
    /// Orientation of the joint frame in the parent frame.
    pub fn orientation(&self) -> UnitQuaternion<f64> {
        UnitQuaternion::from_euler_angles(self.rpy.x, self.rpy.y, self.rpy.z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_names_round_trip() {
        for name in ["revolute", "continuous", "prismatic", "fixed", "floating", "planar"] {
            assert_eq!(JointType::parse(name).unwrap().as_str(), name);
        }
        assert_eq!(JointType::parse("Continuous"), None);
    }

    #[test]
    fn test_supported_gate() {
        assert!(JointType::Continuous.is_supported());
        assert!(JointType::Fixed.is_supported());
        assert!(!JointType::Revolute.is_supported());
        assert!(!JointType::Planar.is_supported());
    }
}
