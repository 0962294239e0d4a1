//! Error types for the physics bridge.

use armature_kinematics::{EntityKind, SceneError};
use thiserror::Error;

/// Errors that can occur while building or configuring physics models.
#[derive(Error, Debug)]
pub enum PhysicsError {
    /// Engine configuration rejected.
    #[error("Invalid engine configuration: {0}")]
    InvalidConfig(String),

    /// Entity not present in the scene.
    #[error("Entity not found: {0}")]
    MissingEntity(String),

    /// Link named by a multibody is missing from its definition.
    #[error("Link {link} not found in multibody {entity}")]
    MissingLink {
        /// Entity id.
        entity: String,
        /// Link name.
        link: String,
    },

    /// No factory registered for this kind of entity.
    #[error("No physics model factory for {0:?} entities")]
    NoFactory(EntityKind),

    /// A model with this key is already registered.
    #[error("Physics model already registered: {0}")]
    DuplicateModel(String),

    /// The link's collision material lacks friction or dampening.
    #[error("Collision material of link {link} is incomplete (friction and dampening are required)")]
    IncompleteMaterial {
        /// Scene-wide link id.
        link: String,
    },

    /// Failed to create collision shape.
    #[error("Failed to create collision shape for {name}: {reason}")]
    CollisionShape {
        /// Link or entity id.
        name: String,
        /// Reason for failure.
        reason: String,
    },

    /// The scene rejected an operation.
    #[error(transparent)]
    Scene(#[from] SceneError),
}
