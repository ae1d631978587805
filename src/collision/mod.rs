//! Collision detection: spatial indices, broad phase, shape-pair contact
//! generation and persistent contacts.

pub mod broadphase;
pub mod contact;
pub mod narrowphase;
pub mod shapes;
pub mod spatial;

pub use broadphase::BroadPhase;
pub use contact::{Contact, ContactEvent, ContactEventKind, ContactKey};
pub use narrowphase::{ContactFn, DispatchTable, NarrowPhase};
pub use shapes::{ContactGeometry, ShapeView};
pub use spatial::{QuadTree, SpatialHash, SpatialIndex};
