#![warn(missing_docs)]

//! Rapier-backed physics for articulated bodies and primitive shapes.
//!
//! The [`PhysicsEngine`] owns a [`PhysicsWorld`] and one [`PhysicsModel`]
//! per shape entity, multibody link and joint. Each tick pushes the scene
//! into the world, steps it in fixed sub-steps and writes body poses and
//! joint angles back into the scene.
//!
//! # Example
//!
//! ```ignore
//! use armature_kinematics::{Anchor, MultibodyEntity, Scene};
//! use armature_physics::{EngineConfig, PhysicsEngine};
//!
//! let config = EngineConfig::from_toml_str(&std::fs::read_to_string("engine.toml")?)?;
//! let mut database = config.entity_database();
//! let mut engine = PhysicsEngine::new(config)?;
//!
//! let mut scene = Scene::new();
//! let rover = MultibodyEntity::new("rover0", database.get_model("rover.xml")?, Anchor::at(0.0, 0.0, 0.1), true)?;
//! let key = scene.add(rover)?;
//! engine.add_entity(&scene, key)?;
//!
//! if let Some(wheel) = scene
//!     .get_mut(key)
//!     .and_then(|e| e.as_multibody_mut())
//!     .and_then(|m| m.motor_mut("left_wheel"))
//! {
//!     wheel.set_velocity_target(1.0);
//! }
//! engine.tick(&mut scene);
//! ```

mod config;
mod convert;
mod engine;
mod error;
mod link;
mod model;
mod motor;
mod multibody;
pub mod ray;
mod shapes;
mod world;

pub use config::EngineConfig;
pub use engine::{ModelFactory, PhysicsEngine, RayHit};
pub use error::PhysicsError;
pub use link::LinkModel;
pub use model::PhysicsModel;
pub use motor::{MotorModel, DEFAULT_MOTOR_DAMPING};
pub use multibody::{add_multibody, MultibodyModel};
pub use ray::{Aabb, Ray3};
pub use shapes::{add_shape, ShapeModel, SHAPE_FRICTION, SHAPE_RESTITUTION};
pub use world::{collision_groups, PhysicsWorld, GROUND_FRICTION, GROUND_RESTITUTION};
