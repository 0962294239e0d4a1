//! The physics side of a whole multibody entity.

use std::collections::HashMap;

use armature_kinematics::{Anchor, Entity, EntityKey, MultibodyEntity, Scene};
use rapier3d::dynamics::RigidBodyHandle;
use tracing::{debug, warn};

use crate::config::EngineConfig;
use crate::convert::anchor_from_physics;
use crate::engine::PhysicsEngine;
use crate::error::PhysicsError;
use crate::link::LinkModel;
use crate::model::PhysicsModel;
use crate::motor::MotorModel;
use crate::world::PhysicsWorld;

/// Aggregator for the link and joint models of one multibody entity.
///
/// It owns no body of its own. After every step it derives the entity pose
/// from the root link body.
#[derive(Debug)]
pub struct MultibodyModel {
    key: String,
    entity: EntityKey,
    children: Vec<String>,
    root_body: RigidBodyHandle,
    root_offset: Anchor,
    dynamic: bool,
}

impl MultibodyModel {
    /// Number of link and joint models.
    pub fn child_count(&self) -> usize {
        self.children.len()
    }
}

impl PhysicsModel for MultibodyModel {
    fn key(&self) -> &str {
        &self.key
    }

    fn entity(&self) -> EntityKey {
        self.entity
    }

    /// Joint models first, then link models.
    fn children(&self) -> &[String] {
        &self.children
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

    fn place(&mut self, _scene: &Scene, _world: &mut PhysicsWorld, _config: &EngineConfig) {}

    fn detach(&mut self, _world: &mut PhysicsWorld) {}

    fn pose(&self, world: &PhysicsWorld, config: &EngineConfig) -> Option<Anchor> {
        let root = anchor_from_physics(world.body(self.root_body)?.position(), config.world_scale);
        let origin = root.isometry() * self.root_offset.isometry().inverse();
        Some(Anchor::from_isometry(&origin))
    }
}

/// Factory for multibody entities: one model per link, one per joint and
/// the aggregator. Nothing is left behind if any part fails.
pub fn add_multibody(engine: &mut PhysicsEngine, scene: &Scene, entity: EntityKey) -> Result<(), PhysicsError> {
    let multibody = scene
        .get(entity)
        .and_then(Entity::as_multibody)
        .ok_or_else(|| PhysicsError::MissingEntity(format!("{entity:?}")))?;

    let mut added = Vec::new();
    match add_parts(engine, scene, entity, multibody, &mut added) {
        Ok(aggregator) => {
            if let Err(err) = engine.insert_model(Box::new(aggregator)) {
                rollback(engine, &added);
                return Err(err);
            }
            debug!("Added multibody {} with {} parts", multibody.id(), added.len());
            Ok(())
        }
        Err(err) => {
            warn!("Failed to add multibody {}: {}", multibody.id(), err);
            rollback(engine, &added);
            Err(err)
        }
    }
}

fn add_parts(
    engine: &mut PhysicsEngine,
    scene: &Scene,
    entity: EntityKey,
    multibody: &MultibodyEntity,
    added: &mut Vec<String>,
) -> Result<MultibodyModel, PhysicsError> {
    let mut bodies: HashMap<&str, RigidBodyHandle> = HashMap::new();
    let mut links = Vec::new();
    for name in multibody.links().keys() {
        let (world, config) = engine.world_and_config_mut();
        let model = LinkModel::build(scene, entity, name, world, config)?;
        let body = model.body();
        let key = model.key().to_string();
        engine.insert_model(Box::new(model))?;
        bodies.insert(name.as_str(), body);
        added.push(key.clone());
        links.push(key);
    }

    let mut motors = Vec::new();
    for (name, motor) in multibody.motors() {
        let missing = |link: &str| PhysicsError::MissingLink {
            entity: multibody.id().to_string(),
            link: link.to_string(),
        };
        let parent = *bodies.get(motor.parent()).ok_or_else(|| missing(motor.parent()))?;
        let child = *bodies.get(motor.child()).ok_or_else(|| missing(motor.child()))?;
        let (world, config) = engine.world_and_config_mut();
        let model = MotorModel::build(scene, entity, name, parent, child, world, config)?;
        let key = model.key().to_string();
        engine.insert_model(Box::new(model))?;
        added.push(key.clone());
        motors.push(key);
    }

    let root = multibody.root_link();
    let root_body = *bodies.get(root).ok_or_else(|| PhysicsError::MissingLink {
        entity: multibody.id().to_string(),
        link: root.to_string(),
    })?;
    let root_offset = multibody
        .link(root)
        .map(|link| *link.offset())
        .unwrap_or_default();

    motors.extend(links);
    Ok(MultibodyModel {
        key: multibody.id().to_string(),
        entity,
        children: motors,
        root_body,
        root_offset,
        dynamic: multibody.embodied().is_movable(),
    })
}

fn rollback(engine: &mut PhysicsEngine, added: &[String]) {
    for key in added.iter().rev() {
        engine.remove_entity(key);
    }
}
