//! Poses and embodied entities.

use nalgebra::{Isometry3, Translation3, UnitQuaternion, Vector3};

/// A position and orientation in the scene frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Anchor {
    /// Position.
    pub position: Vector3<f64>,
    /// Orientation.
    pub orientation: UnitQuaternion<f64>,
}

impl Default for Anchor {
    fn default() -> Self {
        Self::identity()
    }
}

impl Anchor {
    /// Create an anchor.
    pub fn new(position: Vector3<f64>, orientation: UnitQuaternion<f64>) -> Self {
        Self {
            position,
            orientation,
        }
    }

    /// Anchor at the origin with no rotation.
    pub fn identity() -> Self {
        Self::new(Vector3::zeros(), UnitQuaternion::identity())
    }

    /// Anchor at a position with no rotation.
    pub fn at(x: f64, y: f64, z: f64) -> Self {
        Self::new(Vector3::new(x, y, z), UnitQuaternion::identity())
    }

    /// The anchor as a rigid transform.
    pub fn isometry(&self) -> Isometry3<f64> {
        Isometry3::from_parts(Translation3::from(self.position), self.orientation)
    }

    /// Anchor from a rigid transform.
    pub fn from_isometry(iso: &Isometry3<f64>) -> Self {
        Self::new(iso.translation.vector, iso.rotation)
    }

    /// `self ∘ local`: place a pose given in this anchor's frame.
    pub fn compose(&self, local: &Anchor) -> Anchor {
        Anchor::new(
            self.position + self.orientation * local.position,
            self.orientation * local.orientation,
        )
    }
}

/// The physical presence of a scene entity: where it is, where it started
/// and whether the physics engine may move it.
#[derive(Debug, Clone)]
pub struct EmbodiedEntity {
    id: String,
    origin: Anchor,
    initial: Anchor,
    movable: bool,
}

impl EmbodiedEntity {
    /// Create an embodied entity at `anchor`.
    pub fn new(id: impl Into<String>, anchor: Anchor, movable: bool) -> Self {
        Self {
            id: id.into(),
            origin: anchor,
            initial: anchor,
            movable,
        }
    }

    /// Entity id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Current pose.
    pub fn origin_anchor(&self) -> &Anchor {
        &self.origin
    }

    /// Overwrite the current pose.
    pub fn set_origin_anchor(&mut self, anchor: Anchor) {
        self.origin = anchor;
    }

    /// Pose the entity was created with.
    pub fn initial_anchor(&self) -> &Anchor {
        &self.initial
    }

    /// Whether the entity is dynamic. Static entities have zero mass in the
    /// physics world.
    pub fn is_movable(&self) -> bool {
        self.movable
    }

    /// Return to the initial pose.
    pub fn reset(&mut self) {
        self.origin = self.initial;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn test_compose_rotates_offset() {
        let parent = Anchor::new(
            Vector3::new(1.0, 0.0, 0.0),
            UnitQuaternion::from_axis_angle(&Vector3::z_axis(), FRAC_PI_2),
        );
        let child = parent.compose(&Anchor::at(1.0, 0.0, 0.0));
        assert_relative_eq!(child.position, Vector3::new(1.0, 1.0, 0.0), epsilon = 1e-12);
        assert_relative_eq!(
            child.isometry(),
            parent.isometry() * Anchor::at(1.0, 0.0, 0.0).isometry(),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_reset_restores_initial() {
        let mut entity = EmbodiedEntity::new("e", Anchor::at(0.0, 0.0, 1.0), true);
        entity.set_origin_anchor(Anchor::at(5.0, 0.0, 0.0));
        entity.reset();
        assert_eq!(entity.origin_anchor(), &Anchor::at(0.0, 0.0, 1.0));
        assert!(entity.is_movable());
    }
}
