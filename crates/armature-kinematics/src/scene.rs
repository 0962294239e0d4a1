//! The scene: an arena of entities with unique string ids.

use std::collections::HashMap;

use slotmap::{new_key_type, SlotMap};
use tracing::debug;

use crate::anchor::{Anchor, EmbodiedEntity};
use crate::error::SceneError;
use crate::multibody::MultibodyEntity;
use crate::shapes::{BoxEntity, CylinderEntity, SphereEntity};

new_key_type! {
    /// Stable handle to an entity in a [`Scene`].
    pub struct EntityKey;
}

/// Type tag used to pick a physics representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    /// [`BoxEntity`].
    Box,
    /// [`CylinderEntity`].
    Cylinder,
    /// [`SphereEntity`].
    Sphere,
    /// [`MultibodyEntity`].
    Multibody,
}

/// Any entity the scene can hold.
#[derive(Debug, Clone)]
pub enum Entity {
    /// A box.
    Box(BoxEntity),
    /// A cylinder.
    Cylinder(CylinderEntity),
    /// A sphere.
    Sphere(SphereEntity),
    /// An articulated body.
    Multibody(MultibodyEntity),
}

impl Entity {
    /// Type tag.
    pub fn kind(&self) -> EntityKind {
        match self {
            Entity::Box(_) => EntityKind::Box,
            Entity::Cylinder(_) => EntityKind::Cylinder,
            Entity::Sphere(_) => EntityKind::Sphere,
            Entity::Multibody(_) => EntityKind::Multibody,
        }
    }

    /// Embodiment.
    pub fn embodied(&self) -> &EmbodiedEntity {
        match self {
            Entity::Box(e) => e.embodied(),
            Entity::Cylinder(e) => e.embodied(),
            Entity::Sphere(e) => e.embodied(),
            Entity::Multibody(e) => e.embodied(),
        }
    }

    /// Mutable embodiment.
    pub fn embodied_mut(&mut self) -> &mut EmbodiedEntity {
        match self {
            Entity::Box(e) => e.embodied_mut(),
            Entity::Cylinder(e) => e.embodied_mut(),
            Entity::Sphere(e) => e.embodied_mut(),
            Entity::Multibody(e) => e.embodied_mut(),
        }
    }

    /// Entity id.
    pub fn id(&self) -> &str {
        self.embodied().id()
    }

    /// Return to the initial state.
    pub fn reset(&mut self) {
        match self {
            Entity::Box(e) => e.embodied_mut().reset(),
            Entity::Cylinder(e) => e.embodied_mut().reset(),
            Entity::Sphere(e) => e.embodied_mut().reset(),
            Entity::Multibody(e) => e.reset(),
        }
    }

    /// Move to a new pose. Multibodies re-propagate their links.
    pub fn move_to(&mut self, anchor: Anchor) {
        match self {
            Entity::Box(e) => e.embodied_mut().set_origin_anchor(anchor),
            Entity::Cylinder(e) => e.embodied_mut().set_origin_anchor(anchor),
            Entity::Sphere(e) => e.embodied_mut().set_origin_anchor(anchor),
            Entity::Multibody(e) => e.move_to(anchor),
        }
    }

    /// The multibody, if this is one.
    pub fn as_multibody(&self) -> Option<&MultibodyEntity> {
        match self {
            Entity::Multibody(e) => Some(e),
            _ => None,
        }
    }

    /// The multibody, if this is one.
    pub fn as_multibody_mut(&mut self) -> Option<&mut MultibodyEntity> {
        match self {
            Entity::Multibody(e) => Some(e),
            _ => None,
        }
    }
}

impl From<BoxEntity> for Entity {
    fn from(e: BoxEntity) -> Self {
        Entity::Box(e)
    }
}

impl From<CylinderEntity> for Entity {
    fn from(e: CylinderEntity) -> Self {
        Entity::Cylinder(e)
    }
}

impl From<SphereEntity> for Entity {
    fn from(e: SphereEntity) -> Self {
        Entity::Sphere(e)
    }
}

impl From<MultibodyEntity> for Entity {
    fn from(e: MultibodyEntity) -> Self {
        Entity::Multibody(e)
    }
}

/// Entities keyed by [`EntityKey`], with a unique string id per entity.
#[derive(Debug, Default)]
pub struct Scene {
    entities: SlotMap<EntityKey, Entity>,
    ids: HashMap<String, EntityKey>,
}

impl Scene {
    /// Create an empty scene.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entity. Fails if its id is taken.
    pub fn add(&mut self, entity: impl Into<Entity>) -> Result<EntityKey, SceneError> {
        let entity = entity.into();
        let id = entity.id().to_string();
        if self.ids.contains_key(&id) {
            return Err(SceneError::DuplicateId(id));
        }
        debug!("Adding {:?} entity {}", entity.kind(), id);
        let key = self.entities.insert(entity);
        self.ids.insert(id, key);
        Ok(key)
    }

    /// Remove an entity, returning it.
    pub fn remove(&mut self, key: EntityKey) -> Option<Entity> {
        let entity = self.entities.remove(key)?;
        self.ids.remove(entity.id());
        Some(entity)
    }

    /// Look up an entity.
    pub fn get(&self, key: EntityKey) -> Option<&Entity> {
        self.entities.get(key)
    }

    /// Look up an entity mutably.
    pub fn get_mut(&mut self, key: EntityKey) -> Option<&mut Entity> {
        self.entities.get_mut(key)
    }

    /// Key of the entity with this id.
    pub fn key_of(&self, id: &str) -> Option<EntityKey> {
        self.ids.get(id).copied()
    }

    /// All entities.
    pub fn iter(&self) -> impl Iterator<Item = (EntityKey, &Entity)> {
        self.entities.iter()
    }

    /// Number of entities.
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Whether the scene is empty.
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Reset every entity.
    pub fn reset(&mut self) {
        for entity in self.entities.values_mut() {
            entity.reset();
        }
    }

    /// Move an entity.
    pub fn move_entity(&mut self, key: EntityKey, anchor: Anchor) -> Result<(), SceneError> {
        let entity = self
            .entities
            .get_mut(key)
            .ok_or_else(|| SceneError::MissingEntity(format!("{key:?}")))?;
        entity.move_to(anchor);
        Ok(())
    }
}
