//! Primitive shape entities.

use nalgebra::Vector3;

use crate::anchor::{Anchor, EmbodiedEntity};

/// A box whose origin is the centre of its bottom face.
#[derive(Debug, Clone)]
pub struct BoxEntity {
    embodied: EmbodiedEntity,
    size: Vector3<f64>,
    mass: f64,
}

impl BoxEntity {
    /// Create a box. `mass` is ignored by the physics side when the box is
    /// not movable.
    pub fn new(id: impl Into<String>, anchor: Anchor, size: Vector3<f64>, movable: bool, mass: f64) -> Self {
        Self {
            embodied: EmbodiedEntity::new(id, anchor, movable),
            size,
            mass,
        }
    }

    /// Edge lengths.
    pub fn size(&self) -> Vector3<f64> {
        self.size
    }

    /// Mass in kg.
    pub fn mass(&self) -> f64 {
        self.mass
    }

    /// Embodiment.
    pub fn embodied(&self) -> &EmbodiedEntity {
        &self.embodied
    }

    /// Mutable embodiment.
    pub fn embodied_mut(&mut self) -> &mut EmbodiedEntity {
        &mut self.embodied
    }
}

/// A Z-up cylinder whose origin is the centre of its bottom face.
#[derive(Debug, Clone)]
pub struct CylinderEntity {
    embodied: EmbodiedEntity,
    radius: f64,
    height: f64,
    mass: f64,
}

impl CylinderEntity {
    /// Create a cylinder.
    pub fn new(
        id: impl Into<String>,
        anchor: Anchor,
        radius: f64,
        height: f64,
        movable: bool,
        mass: f64,
    ) -> Self {
        Self {
            embodied: EmbodiedEntity::new(id, anchor, movable),
            radius,
            height,
            mass,
        }
    }

    /// Radius.
    pub fn radius(&self) -> f64 {
        self.radius
    }

    /// Height along Z.
    pub fn height(&self) -> f64 {
        self.height
    }

    /// Mass in kg.
    pub fn mass(&self) -> f64 {
        self.mass
    }

    /// Embodiment.
    pub fn embodied(&self) -> &EmbodiedEntity {
        &self.embodied
    }

    /// Mutable embodiment.
    pub fn embodied_mut(&mut self) -> &mut EmbodiedEntity {
        &mut self.embodied
    }
}

/// A sphere whose origin is its centre.
#[derive(Debug, Clone)]
pub struct SphereEntity {
    embodied: EmbodiedEntity,
    radius: f64,
    mass: f64,
}

impl SphereEntity {
    /// Create a sphere.
    pub fn new(id: impl Into<String>, anchor: Anchor, radius: f64, movable: bool, mass: f64) -> Self {
        Self {
            embodied: EmbodiedEntity::new(id, anchor, movable),
            radius,
            mass,
        }
    }

    /// Radius.
    pub fn radius(&self) -> f64 {
        self.radius
    }

    /// Mass in kg.
    pub fn mass(&self) -> f64 {
        self.mass
    }

    /// Embodiment.
    pub fn embodied(&self) -> &EmbodiedEntity {
        &self.embodied
    }

    /// Mutable embodiment.
    pub fn embodied_mut(&mut self) -> &mut EmbodiedEntity {
        &mut self.embodied
    }
}
