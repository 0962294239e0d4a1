//! Geometry specifications attached to links.

use std::path::PathBuf;
use std::sync::Arc;

use nalgebra::{Isometry3, Translation3, UnitQuaternion, Vector3};

use crate::material::MaterialColour;
use crate::mesh::MeshData;

/// Shape of one geometry element.
#[derive(Debug, Clone)]
pub enum Shape {
    /// Box centred on its origin.
    Box {
        /// Full edge lengths.
        size: Vector3<f64>,
    },
    /// Cylinder centred on its origin, axis along local Z.
    Cylinder {
        /// Radius.
        radius: f64,
        /// Length along the axis.
        length: f64,
    },
    /// Sphere centred on its origin.
    Sphere {
        /// Radius.
        radius: f64,
    },
    /// Mesh loaded from a file.
    Mesh {
        /// Shared mesh data from the cache.
        mesh: Arc<MeshData>,
        /// Resolved path of the mesh file.
        filename: PathBuf,
        /// Per-axis scale.
        scale: Vector3<f64>,
    },
}

impl Shape {
    /// Short tag used in diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Shape::Box { .. } => "box",
            Shape::Cylinder { .. } => "cylinder",
            Shape::Sphere { .. } => "sphere",
            Shape::Mesh { .. } => "mesh",
        }
    }
}

/// A positioned shape within a link's frame.
#[derive(Debug, Clone)]
pub struct GeometrySpecification {
    /// The shape.
    pub shape: Shape,
    /// Offset from the link origin.
    pub origin: Vector3<f64>,
    /// Roll, pitch, yaw in radians.
    pub rpy: Vector3<f64>,
    /// Resolved colour; set for visual geometry only.
    pub colour: Option<MaterialColour>,
}

impl GeometrySpecification {
    /// Orientation relative to the link frame.
    pub fn orientation(&self) -> UnitQuaternion<f64> {
        UnitQuaternion::from_euler_angles(self.rpy.x, self.rpy.y, self.rpy.z)
    }

    /// Pose relative to the link frame.
    pub fn local_pose(&self) -> Isometry3<f64> {
        Isometry3::from_parts(Translation3::from(self.origin), self.orientation())
    }
}
