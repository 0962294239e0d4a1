//! Link definitions.

use nalgebra::{Matrix3, UnitQuaternion, Vector3};

use crate::geometry::GeometrySpecification;
use crate::material::MaterialInstance;

/// Mass assumed when a link has no inertial block.
pub const DEFAULT_LINK_MASS: f64 = 1.0;

/// Symmetric inertia tensor coefficients.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Inertia {
    /// Ixx.
    pub ixx: f64,
    /// Ixy.
    pub ixy: f64,
    /// Ixz.
    pub ixz: f64,
    /// Iyy.
    pub iyy: f64,
    /// Iyz.
    pub iyz: f64,
    /// Izz.
    pub izz: f64,
}

impl Default for Inertia {
    /// Inertia of a 1 kg cube with 1 m edges, taken about a corner.
    fn default() -> Self {
        Self {
            ixx: 2.0 / 3.0,
            ixy: -0.25,
            ixz: -0.25,
            iyy: 2.0 / 3.0,
            iyz: -0.25,
            izz: 2.0 / 3.0,
        }
    }
}

impl Inertia {
    /// Full symmetric matrix.
    pub fn matrix(&self) -> Matrix3<f64> {
        Matrix3::new(
            self.ixx, self.ixy, self.ixz, //
            self.ixy, self.iyy, self.iyz, //
            self.ixz, self.iyz, self.izz,
        )
    }
}

/// One rigid segment of a multibody.
#[derive(Debug, Clone)]
pub struct Link {
    /// Unique name within the definition.
    pub name: String,
    /// Position relative to the parent link.
    pub origin: Vector3<f64>,
    /// Roll, pitch, yaw relative to the parent link.
    pub rpy: Vector3<f64>,
    /// Centre of gravity in the link frame.
    pub cog: Vector3<f64>,
    /// Mass in kg.
    pub mass: f64,
    /// Inertia tensor; only meaningful when `inertia_provided`.
    pub inertia: Inertia,
    /// Whether the definition gave an inertial block.
    pub inertia_provided: bool,
    /// Visual geometry.
    pub visual: Vec<GeometrySpecification>,
    /// Collision geometry.
    pub collision: Vec<GeometrySpecification>,
    /// Contact material drawn for this link.
    pub collision_material: MaterialInstance,
    /// Name of the parent link, `None` for the root.
    pub parent: Option<String>,
}

impl Link {
    /// Create a link with default mass and inertia and no geometry.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            origin: Vector3::zeros(),
            rpy: Vector3::zeros(),
            cog: Vector3::zeros(),
            mass: DEFAULT_LINK_MASS,
            inertia: Inertia::default(),
            inertia_provided: false,
            visual: Vec::new(),
            collision: Vec::new(),
            collision_material: MaterialInstance::default(),
            parent: None,
        }
    }

    /// Orientation relative to the parent link.
    pub fn orientation(&self) -> UnitQuaternion<f64> {
        UnitQuaternion::from_euler_angles(self.rpy.x, self.rpy.y, self.rpy.z)
    }

    /// Whether this link is a root of the tree.
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }
}
