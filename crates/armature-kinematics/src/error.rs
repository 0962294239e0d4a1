//! Error types for scene management.

use thiserror::Error;

/// Errors that can occur while building or editing a scene.
#[derive(Error, Debug)]
pub enum SceneError {
    /// Another entity already uses this id.
    #[error("Entity id already in use: {0}")]
    DuplicateId(String),

    /// The definition has no unique root link.
    #[error("Definition {file} of entity {entity} has no unique root link")]
    NoRootLink {
        /// Entity id.
        entity: String,
        /// Definition source.
        file: String,
    },

    /// No entity with this key or id.
    #[error("Entity not found: {0}")]
    MissingEntity(String),
}
