//! Conversions between scene poses (f64, scene units) and physics poses
//! (f32, physics units).

use armature_kinematics::Anchor;
use nalgebra::{Isometry3, Translation3, Vector3};

pub(crate) fn vector_to_physics(v: &Vector3<f64>, scale: f64) -> Vector3<f32> {
    (v * scale).cast::<f32>()
}

pub(crate) fn vector_from_physics(v: &Vector3<f32>, scale: f64) -> Vector3<f64> {
    v.cast::<f64>() / scale
}

pub(crate) fn anchor_to_physics(anchor: &Anchor, scale: f64) -> Isometry3<f32> {
    Isometry3::from_parts(
        Translation3::from(vector_to_physics(&anchor.position, scale)),
        anchor.orientation.cast::<f32>(),
    )
}

pub(crate) fn anchor_from_physics(iso: &Isometry3<f32>, scale: f64) -> Anchor {
    Anchor::new(
        vector_from_physics(&iso.translation.vector, scale),
        iso.rotation.cast::<f64>(),
    )
}
