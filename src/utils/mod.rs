//! Utility helpers including math extensions, allocators, pooling, logging and profiling.

pub mod allocator;
pub mod logging;
pub mod math;
pub mod pool;
pub mod profiling;

pub use allocator::{Arena, EntityId};
pub use math::*;
pub use pool::Pool;
pub use profiling::PhysicsProfiler;
