//! Core types describing bodies, shapes and shared data.

pub mod aabb;
pub mod collider;
pub mod rigidbody;
pub mod types;

pub use aabb::Aabb;
pub use collider::{Collider, ColliderShape, CollisionCallbacks, ShapeKind};
pub use rigidbody::{CollisionFilter, RigidBody, RigidBodyBuilder};
pub use types::{Material, MaterialPairProperties, Transform, Velocity};
