//! Compound rigid bodies for multibody links.

use std::f32::consts::FRAC_PI_2;

use armature_defs::{GeometrySpecification, Link, Shape};
use armature_kinematics::{Anchor, Entity, EntityKey, MultibodyEntity, Scene};
use nalgebra::{Isometry3, Point3, Translation3, Vector3};
use parry3d::mass_properties::MassProperties;
use parry3d::shape::{ConvexPolyhedron, SharedShape};
use rapier3d::dynamics::{RigidBodyBuilder, RigidBodyHandle};
use rapier3d::geometry::ColliderBuilder;
use tracing::{debug, warn};

use crate::config::EngineConfig;
use crate::convert::{anchor_from_physics, anchor_to_physics};
use crate::error::PhysicsError;
use crate::model::{place_body, sync_body, world_aabb, PhysicsModel};
use crate::ray::Aabb;
use crate::world::{collision_groups, PhysicsWorld};

/// One link of a multibody entity: a single body carrying every collision
/// shape of the link as one compound collider.
///
/// Links have no exact ray test and report no hit.
#[derive(Debug)]
pub struct LinkModel {
    key: String,
    entity: EntityKey,
    link: String,
    dynamic: bool,
    body: RigidBodyHandle,
    bounds: Aabb,
    aabb: Option<Aabb>,
}

impl LinkModel {
    /// Build the body for link `link` of the multibody `entity`.
    pub fn build(
        scene: &Scene,
        entity: EntityKey,
        link: &str,
        world: &mut PhysicsWorld,
        config: &EngineConfig,
    ) -> Result<Self, PhysicsError> {
        let multibody = multibody(scene, entity)?;
        let missing = || PhysicsError::MissingLink {
            entity: multibody.id().to_string(),
            link: link.to_string(),
        };
        let wrapper = multibody.link(link).ok_or_else(missing)?;
        let definition = multibody.definition().link(link).ok_or_else(missing)?;
        let id = wrapper.id().to_string();

        let properties = &definition.collision_material.properties;
        if !properties.is_set() {
            return Err(PhysicsError::IncompleteMaterial { link: id });
        }

        let scale = config.world_scale;
        let shape = compound_shape(&id, &definition.collision, scale)?;
        let local = shape.compute_local_aabb();
        let bounds = Aabb::new(
            (local.mins.coords.cast::<f64>() / scale).into(),
            (local.maxs.coords.cast::<f64>() / scale).into(),
        );

        let dynamic = multibody.embodied().is_movable();
        let mut body = if dynamic {
            RigidBodyBuilder::dynamic()
        } else {
            RigidBodyBuilder::fixed()
        }
        .position(anchor_to_physics(wrapper.anchor(), scale))
        .can_sleep(false);

        let mut collider = ColliderBuilder::new(shape)
            .friction(properties.friction as f32)
            .restitution((1.0 - properties.dampening).clamp(0.0, 1.0) as f32)
            .collision_groups(collision_groups(dynamic));
        if definition.inertia_provided {
            collider = collider.density(0.0);
            body = body.additional_mass_properties(mass_properties(definition, scale));
        } else {
            collider = collider.mass(definition.mass as f32);
        }

        let body = world.insert_body(body.build(), vec![collider.build()]);
        debug!("Created link body {} (mass {})", id, definition.mass);

        Ok(Self {
            key: id,
            entity,
            link: link.to_string(),
            dynamic,
            body,
            bounds,
            aabb: None,
        })
    }

    /// The link body.
    pub fn body(&self) -> RigidBodyHandle {
        self.body
    }

    /// Link name within the definition.
    pub fn link_name(&self) -> &str {
        &self.link
    }

    /// Bounds in the link frame, scene units.
    pub fn local_bounds(&self) -> &Aabb {
        &self.bounds
    }

    fn logical_anchor(&self, scene: &Scene) -> Option<Anchor> {
        scene
            .get(self.entity)
            .and_then(Entity::as_multibody)
            .and_then(|m| m.link(&self.link))
            .map(|link| *link.anchor())
    }
}

fn multibody(scene: &Scene, entity: EntityKey) -> Result<&MultibodyEntity, PhysicsError> {
    scene
        .get(entity)
        .and_then(Entity::as_multibody)
        .ok_or_else(|| PhysicsError::MissingEntity(format!("{entity:?}")))
}

/// Explicit inertia tensor about the centre of gravity, physics units.
fn mass_properties(link: &Link, scale: f64) -> MassProperties {
    let com = Point3::from((link.cog * scale).cast::<f32>());
    let inertia = (link.inertia.matrix() * scale * scale).cast::<f32>();
    MassProperties::with_inertia_matrix(com, link.mass as f32, inertia)
}

/// Every collision specification of a link as one compound shape.
pub(crate) fn compound_shape(
    name: &str,
    specs: &[GeometrySpecification],
    scale: f64,
) -> Result<SharedShape, PhysicsError> {
    let mut parts: Vec<(Isometry3<f32>, SharedShape)> = Vec::new();

    for spec in specs {
        let pose = Isometry3::from_parts(
            Translation3::from((spec.origin * scale).cast::<f32>()),
            spec.orientation().cast::<f32>(),
        );
        match &spec.shape {
            Shape::Box { size } => {
                let h = (size * (scale / 2.0)).cast::<f32>();
                parts.push((pose, SharedShape::cuboid(h.x, h.y, h.z)));
            }
            // Parry cylinders run along Y, link cylinders along Z.
            Shape::Cylinder { radius, length } => parts.push((
                pose * Isometry3::rotation(Vector3::x() * FRAC_PI_2),
                SharedShape::cylinder((length * scale / 2.0) as f32, (radius * scale) as f32),
            )),
            Shape::Sphere { radius } => parts.push((pose, SharedShape::ball((radius * scale) as f32))),
            Shape::Mesh {
                mesh,
                filename,
                scale: mesh_scale,
            } => {
                let factor = (mesh_scale * scale).cast::<f32>();
                for submesh in &mesh.submeshes {
                    let points: Vec<Point3<f32>> = submesh
                        .points()
                        .map(|p| Point3::from(p.coords.component_mul(&factor)))
                        .collect();
                    if points.is_empty() {
                        continue;
                    }
                    match ConvexPolyhedron::from_convex_hull(&points) {
                        Some(hull) => parts.push((pose, SharedShape::new(hull))),
                        None => {
                            warn!(
                                "Degenerate hull for sub-mesh {} of {}, using its bounds",
                                submesh.name,
                                filename.display()
                            );
                            parts.push(bounds_box(pose, &points));
                        }
                    }
                }
            }
        }
    }

    if parts.is_empty() {
        return Err(PhysicsError::CollisionShape {
            name: name.to_string(),
            reason: "No collision geometry".to_string(),
        });
    }
    Ok(SharedShape::compound(parts))
}

fn bounds_box(pose: Isometry3<f32>, points: &[Point3<f32>]) -> (Isometry3<f32>, SharedShape) {
    let (min, max) = points[1..]
        .iter()
        .fold((points[0], points[0]), |(min, max), p| (min.inf(p), max.sup(p)));
    let half = (max - min) / 2.0;
    let centre = nalgebra::center(&min, &max);
    (
        pose * Translation3::from(centre.coords),
        SharedShape::cuboid(half.x, half.y, half.z),
    )
}

impl PhysicsModel for LinkModel {
    fn key(&self) -> &str {
        &self.key
    }

    fn entity(&self) -> EntityKey {
        self.entity
    }

    fn rigid_body(&self) -> Option<RigidBodyHandle> {
        Some(self.body)
    }

    fn update_from_entity(&mut self, scene: &Scene, world: &mut PhysicsWorld, config: &EngineConfig) {
        let Some(anchor) = self.logical_anchor(scene) else {
            return;
        };
        if let Some(body) = world.body_mut(self.body) {
            sync_body(body, &anchor, config.world_scale);
        }
    }

    fn update_entity(&self, scene: &mut Scene, world: &PhysicsWorld, config: &EngineConfig) {
        if !self.dynamic {
            return;
        }
        let Some(pose) = self.pose(world, config) else {
            return;
        };
        if let Some(link) = scene
            .get_mut(self.entity)
            .and_then(Entity::as_multibody_mut)
            .and_then(|m| m.link_mut(&self.link))
        {
            link.set_anchor(pose);
        }
    }

    fn place(&mut self, scene: &Scene, world: &mut PhysicsWorld, config: &EngineConfig) {
        let Some(anchor) = self.logical_anchor(scene) else {
            return;
        };
        if let Some(body) = world.body_mut(self.body) {
            place_body(body, &anchor, config.world_scale);
        }
    }

    fn detach(&mut self, world: &mut PhysicsWorld) {
        world.remove_body(self.body);
    }

    fn pose(&self, world: &PhysicsWorld, config: &EngineConfig) -> Option<Anchor> {
        let body = world.body(self.body)?;
        Some(anchor_from_physics(body.position(), config.world_scale))
    }

    fn oriented_bounds(&self, world: &PhysicsWorld, config: &EngineConfig) -> Option<(Isometry3<f64>, Aabb)> {
        Some((self.pose(world, config)?.isometry(), self.bounds))
    }

    fn aabb(&self) -> Option<Aabb> {
        self.aabb
    }

    fn calculate_bounding_box(&mut self, world: &PhysicsWorld, config: &EngineConfig) {
        self.aabb = world_aabb(self, world, config);
    }
}
