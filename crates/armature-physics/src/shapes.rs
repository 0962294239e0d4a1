//! Physics models for primitive shape entities.

use std::f32::consts::FRAC_PI_2;

use armature_kinematics::{Anchor, Entity, EntityKey, Scene};
use nalgebra::{Isometry3, Point3, UnitQuaternion, Vector3};
use rapier3d::dynamics::{RigidBodyBuilder, RigidBodyHandle};
use rapier3d::geometry::{ColliderBuilder, SharedShape};
use tracing::debug;

use crate::config::EngineConfig;
use crate::convert::{anchor_from_physics, anchor_to_physics};
use crate::engine::PhysicsEngine;
use crate::error::PhysicsError;
use crate::model::{place_body, sync_body, world_aabb, PhysicsModel};
use crate::ray::{intersect_box, intersect_cylinder, intersect_sphere, Aabb, Ray3};
use crate::world::{collision_groups, PhysicsWorld};

/// Friction of primitive shapes.
pub const SHAPE_FRICTION: f32 = 0.5;
/// Restitution of primitive shapes.
pub const SHAPE_RESTITUTION: f32 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Primitive {
    Box { half_extents: Vector3<f64> },
    Cylinder { radius: f64, half_height: f64 },
    Sphere { radius: f64 },
}

impl Primitive {
    /// Body centre relative to the entity origin.
    fn centre_offset(&self) -> Vector3<f64> {
        match *self {
            Primitive::Box { half_extents } => Vector3::new(0.0, 0.0, half_extents.z),
            Primitive::Cylinder { half_height, .. } => Vector3::new(0.0, 0.0, half_height),
            Primitive::Sphere { .. } => Vector3::zeros(),
        }
    }

    fn half_extents(&self) -> Vector3<f64> {
        match *self {
            Primitive::Box { half_extents } => half_extents,
            Primitive::Cylinder { radius, half_height } => Vector3::new(radius, radius, half_height),
            Primitive::Sphere { radius } => Vector3::repeat(radius),
        }
    }

    fn collider(&self, scale: f64) -> ColliderBuilder {
        match *self {
            Primitive::Box { half_extents } => {
                let h = (half_extents * scale).cast::<f32>();
                ColliderBuilder::cuboid(h.x, h.y, h.z)
            }
            // Parry cylinders run along Y.
            Primitive::Cylinder { radius, half_height } => ColliderBuilder::new(SharedShape::cylinder(
                (half_height * scale) as f32,
                (radius * scale) as f32,
            ))
            .position(Isometry3::rotation(Vector3::x() * FRAC_PI_2)),
            Primitive::Sphere { radius } => ColliderBuilder::ball((radius * scale) as f32),
        }
    }
}

/// A single rigid body for a box, cylinder or sphere entity.
///
/// The body sits at the shape's centre; the entity origin of boxes and
/// cylinders is the centre of the bottom face.
#[derive(Debug)]
pub struct ShapeModel {
    key: String,
    entity: EntityKey,
    primitive: Primitive,
    dynamic: bool,
    body: RigidBodyHandle,
    aabb: Option<Aabb>,
}

impl ShapeModel {
    /// Build the body for a primitive entity and insert it into `world`.
    pub fn build(
        scene: &Scene,
        entity: EntityKey,
        world: &mut PhysicsWorld,
        config: &EngineConfig,
    ) -> Result<Self, PhysicsError> {
        let logical = scene
            .get(entity)
            .ok_or_else(|| PhysicsError::MissingEntity(format!("{entity:?}")))?;
        let (primitive, mass) = match logical {
            Entity::Box(b) => (Primitive::Box { half_extents: b.size() / 2.0 }, b.mass()),
            Entity::Cylinder(c) => (
                Primitive::Cylinder {
                    radius: c.radius(),
                    half_height: c.height() / 2.0,
                },
                c.mass(),
            ),
            Entity::Sphere(s) => (Primitive::Sphere { radius: s.radius() }, s.mass()),
            Entity::Multibody(m) => {
                return Err(PhysicsError::CollisionShape {
                    name: m.id().to_string(),
                    reason: "multibody entities are not primitive shapes".to_string(),
                })
            }
        };

        let embodied = logical.embodied();
        let dynamic = embodied.is_movable() && mass > 0.0;
        let centre = body_anchor(embodied.origin_anchor(), &primitive);
        let body = if dynamic {
            RigidBodyBuilder::dynamic()
        } else {
            RigidBodyBuilder::fixed()
        }
        .position(anchor_to_physics(&centre, config.world_scale))
        .build();

        let mut collider = primitive
            .collider(config.world_scale)
            .friction(SHAPE_FRICTION)
            .restitution(SHAPE_RESTITUTION)
            .collision_groups(collision_groups(dynamic));
        if dynamic {
            collider = collider.mass(mass as f32);
        }

        let body = world.insert_body(body, vec![collider.build()]);
        debug!(
            "Created {} shape body for {} (mass {})",
            if dynamic { "dynamic" } else { "static" },
            embodied.id(),
            if dynamic { mass } else { 0.0 }
        );

        Ok(Self {
            key: embodied.id().to_string(),
            entity,
            primitive,
            dynamic,
            body,
            aabb: None,
        })
    }

    /// Whether the body moves under simulation.
    pub fn is_dynamic(&self) -> bool {
        self.dynamic
    }

    fn centre_pose(&self, world: &PhysicsWorld, config: &EngineConfig) -> Option<Isometry3<f64>> {
        let body = world.body(self.body)?;
        Some(anchor_from_physics(body.position(), config.world_scale).isometry())
    }
}

fn body_anchor(origin: &Anchor, primitive: &Primitive) -> Anchor {
    origin.compose(&Anchor::new(primitive.centre_offset(), UnitQuaternion::identity()))
}

impl PhysicsModel for ShapeModel {
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
        let Some(entity) = scene.get(self.entity) else {
            return;
        };
        let centre = body_anchor(entity.embodied().origin_anchor(), &self.primitive);
        if let Some(body) = world.body_mut(self.body) {
            sync_body(body, &centre, config.world_scale);
        }
    }

    fn update_entity(&self, scene: &mut Scene, world: &PhysicsWorld, config: &EngineConfig) {
        if !self.dynamic {
            return;
        }
        let Some(origin) = self.pose(world, config) else {
            return;
        };
        if let Some(entity) = scene.get_mut(self.entity) {
            entity.embodied_mut().set_origin_anchor(origin);
        }
    }

    fn place(&mut self, scene: &Scene, world: &mut PhysicsWorld, config: &EngineConfig) {
        let Some(entity) = scene.get(self.entity) else {
            return;
        };
        let centre = body_anchor(entity.embodied().origin_anchor(), &self.primitive);
        if let Some(body) = world.body_mut(self.body) {
            place_body(body, &centre, config.world_scale);
        }
    }

    fn detach(&mut self, world: &mut PhysicsWorld) {
        world.remove_body(self.body);
    }

    fn pose(&self, world: &PhysicsWorld, config: &EngineConfig) -> Option<Anchor> {
        let centre = Anchor::from_isometry(&self.centre_pose(world, config)?);
        Some(Anchor::new(
            centre.position - centre.orientation * self.primitive.centre_offset(),
            centre.orientation,
        ))
    }

    fn oriented_bounds(&self, world: &PhysicsWorld, config: &EngineConfig) -> Option<(Isometry3<f64>, Aabb)> {
        let pose = self.centre_pose(world, config)?;
        Some((pose, Aabb::from_half_extents(Point3::origin(), self.primitive.half_extents())))
    }

    fn aabb(&self) -> Option<Aabb> {
        self.aabb
    }

    fn calculate_bounding_box(&mut self, world: &PhysicsWorld, config: &EngineConfig) {
        self.aabb = world_aabb(self, world, config);
    }

    fn intersect_ray(&self, ray: &Ray3, world: &PhysicsWorld, config: &EngineConfig) -> Option<f64> {
        let pose = self.centre_pose(world, config)?;
        match self.primitive {
            Primitive::Box { half_extents } => intersect_box(ray, &pose, &half_extents),
            Primitive::Cylinder { radius, half_height } => intersect_cylinder(ray, &pose, radius, half_height),
            Primitive::Sphere { radius } => {
                intersect_sphere(ray, &Point3::from(pose.translation.vector), radius)
            }
        }
    }
}

/// Factory for box, cylinder and sphere entities.
pub fn add_shape(engine: &mut PhysicsEngine, scene: &Scene, entity: EntityKey) -> Result<(), PhysicsError> {
    let (world, config) = engine.world_and_config_mut();
    let model = ShapeModel::build(scene, entity, world, config)?;
    engine.insert_model(Box::new(model))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use armature_kinematics::{BoxEntity, CylinderEntity, SphereEntity};
    use std::f64::consts::FRAC_PI_2 as QUARTER;

    fn setup() -> (Scene, PhysicsWorld, EngineConfig) {
        let config = EngineConfig {
            world_scale: 10.0,
            ..EngineConfig::default()
        };
        (Scene::new(), PhysicsWorld::new(Vector3::zeros()), config)
    }

    #[test]
    fn test_box_body_sits_above_origin() {
        let (mut scene, mut world, config) = setup();
        let key = scene
            .add(BoxEntity::new("crate", Anchor::at(1.0, 0.0, 0.0), Vector3::new(1.0, 1.0, 2.0), true, 2.0))
            .unwrap();
        let model = ShapeModel::build(&scene, key, &mut world, &config).unwrap();
        assert!(model.is_dynamic());

        let body = world.body(model.rigid_body().unwrap()).unwrap();
        assert_relative_eq!(body.translation().x, 10.0);
        assert_relative_eq!(body.translation().z, 10.0);

        let pose = model.pose(&world, &config).unwrap();
        assert_relative_eq!(pose.position, Vector3::new(1.0, 0.0, 0.0), epsilon = 1e-6);
    }

    #[test]
    fn test_offset_follows_orientation() {
        let (mut scene, mut world, config) = setup();
        let tipped = Anchor::new(
            Vector3::zeros(),
            UnitQuaternion::from_axis_angle(&Vector3::x_axis(), QUARTER),
        );
        let key = scene
            .add(CylinderEntity::new("can", tipped, 0.5, 2.0, false, 1.0))
            .unwrap();
        let model = ShapeModel::build(&scene, key, &mut world, &config).unwrap();
        assert!(!model.is_dynamic());

        // Tipped over +X, the bottom-face origin puts the centre at -Y.
        let body = world.body(model.rigid_body().unwrap()).unwrap();
        assert_relative_eq!(body.translation().y, -10.0, epsilon = 1e-4);
        assert!(body.is_fixed());
    }

    #[test]
    fn test_ray_hits_primitives() {
        let (mut scene, mut world, config) = setup();
        let sphere = scene
            .add(SphereEntity::new("ball", Anchor::at(0.0, 0.0, 1.0), 0.5, false, 0.0))
            .unwrap();
        let cylinder = scene
            .add(CylinderEntity::new("can", Anchor::at(3.0, 0.0, 0.0), 0.5, 2.0, false, 0.0))
            .unwrap();
        let ball = ShapeModel::build(&scene, sphere, &mut world, &config).unwrap();
        let can = ShapeModel::build(&scene, cylinder, &mut world, &config).unwrap();

        let ray = Ray3::new(Point3::new(-2.0, 0.0, 1.0), Point3::new(8.0, 0.0, 1.0));
        let t = ball.intersect_ray(&ray, &world, &config).unwrap();
        assert_relative_eq!(ray.at(t).x, -0.5, epsilon = 1e-5);
        let t = can.intersect_ray(&ray, &world, &config).unwrap();
        assert_relative_eq!(ray.at(t).x, 2.5, epsilon = 1e-5);

        let above = Ray3::new(Point3::new(-2.0, 0.0, 2.5), Point3::new(8.0, 0.0, 2.5));
        assert!(ball.intersect_ray(&above, &world, &config).is_none());
        assert!(can.intersect_ray(&above, &world, &config).is_none());
    }

    #[test]
    fn test_bounding_box_and_place() {
        let (mut scene, mut world, config) = setup();
        let key = scene
            .add(BoxEntity::new("crate", Anchor::identity(), Vector3::new(2.0, 2.0, 1.0), true, 1.0))
            .unwrap();
        let mut model = ShapeModel::build(&scene, key, &mut world, &config).unwrap();
        model.calculate_bounding_box(&world, &config);
        let aabb = model.aabb().unwrap();
        assert_relative_eq!(aabb.min, Point3::new(-1.0, -1.0, 0.0), epsilon = 1e-5);
        assert_relative_eq!(aabb.max, Point3::new(1.0, 1.0, 1.0), epsilon = 1e-5);

        scene.move_entity(key, Anchor::at(0.0, 4.0, 0.0)).unwrap();
        model.reset(&scene, &mut world, &config);
        assert_relative_eq!(model.aabb().unwrap().min.y, 3.0, epsilon = 1e-5);
        let body = world.body(model.rigid_body().unwrap()).unwrap();
        assert_eq!(body.linvel(), &Vector3::zeros());
    }
}
