#![warn(missing_docs)]

//! Structural definitions for articulated bodies.
//!
//! This crate reads multibody definition documents into immutable
//! blueprints: links with geometry, mass and a contact material, joints
//! connecting them, and the scoped material stack that resolves material
//! names while parsing.
//!
//! # Example
//!
//! ```ignore
//! use armature_defs::MultibodyEntityDatabase;
//!
//! let mut database = MultibodyEntityDatabase::with_seed(7);
//! let rover = database.get_model("models/rover.xml")?;
//! tracing::info!("{} weighs {} kg", rover.name(), rover.mass());
//! ```

mod database;
mod definition;
mod error;
mod geometry;
mod joint;
mod link;
mod material;
mod mesh;
mod parser;
mod text;
mod xml;

pub use database::MultibodyEntityDatabase;
pub use definition::MultibodyDefinition;
pub use error::{DefinitionError, ParseErrorKind, Result};
pub use geometry::{GeometrySpecification, Shape};
pub use joint::{JointDefinition, JointLimit, JointType};
pub use link::{Inertia, Link, DEFAULT_LINK_MASS};
pub use material::{
    MaterialColour, MaterialInstance, MaterialProperties, MaterialPrototype,
    MaterialPrototypeStack, DEFAULT_COEFFICIENT,
};
pub use mesh::{MeshCache, MeshData, MeshError, MeshLoader, ObjMeshLoader, SubMesh, Texture};
pub use parser::{parse_definition, ParseContext};
