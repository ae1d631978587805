//! Rigid Tick – a fixed-step rigid-body simulation core.
//!
//! Each tick integrates forces, rebuilds a spatial index to find candidate
//! pairs, turns them into persistent contacts with enter/stay/exit events,
//! and resolves those contacts with a sequential-impulse solver.

pub mod collision;
pub mod config;
pub mod core;
pub mod dynamics;
pub mod error;
pub mod utils;
pub mod world;

pub use glam::{Mat3, Quat, Vec3};

pub use collision::{
    broadphase::BroadPhase,
    contact::{Contact, ContactEvent, ContactEventKind, ContactKey},
    narrowphase::{DispatchTable, NarrowPhase},
    spatial::{QuadTree, SpatialHash, SpatialIndex},
};
pub use config::{BroadPhaseConfig, SimulationConfig, SleepConfig, SolverConfig, SpatialIndexKind};
pub use core::{
    aabb::Aabb,
    collider::{Collider, ColliderBuilder, ColliderShape, CollisionCallbacks, ShapeKind},
    rigidbody::{CollisionFilter, RigidBody, RigidBodyBuilder},
    types::{Material, Transform, Velocity},
};
pub use dynamics::{integrator::Integrator, solver::ContactSolver};
pub use error::ConfigError;
pub use utils::{
    allocator::{Arena, EntityId},
    pool::Pool,
    profiling::PhysicsProfiler,
};
pub use world::PhysicsWorld;
