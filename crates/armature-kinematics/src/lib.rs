#![warn(missing_docs)]

//! Scene entities and forward kinematics for articulated bodies.
//!
//! A [`Scene`] holds primitive shapes and [`MultibodyEntity`] instances built
//! from shared [`armature_defs::MultibodyDefinition`] blueprints. Each
//! multibody keeps live link poses and motor state; forward kinematics places
//! every link from the entity pose and the current joint angles.
//!
//! # Example
//!
//! ```ignore
//! use armature_defs::MultibodyEntityDatabase;
//! use armature_kinematics::{Anchor, MultibodyEntity, Scene};
//!
//! let mut database = MultibodyEntityDatabase::new();
//! let definition = database.get_model("rover.xml")?;
//!
//! let mut scene = Scene::new();
//! let rover = MultibodyEntity::new("rover0", definition, Anchor::at(0.0, 0.0, 0.1), true)?;
//! let key = scene.add(rover)?;
//! ```

mod anchor;
mod error;
mod link;
mod motor;
mod multibody;
mod scene;
mod shapes;

pub use anchor::{Anchor, EmbodiedEntity};
pub use error::SceneError;
pub use link::LinkEntity;
pub use motor::{MotorActuator, MotorKind};
pub use multibody::MultibodyEntity;
pub use scene::{Entity, EntityKey, EntityKind, Scene};
pub use shapes::{BoxEntity, CylinderEntity, SphereEntity};
