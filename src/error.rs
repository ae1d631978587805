//! Configuration-time errors.
//!
//! Nothing inside a simulation tick returns these; they are raised once when
//! parameters or bodies are handed to the world.

use crate::utils::allocator::EntityId;

/// A rejected configuration value or body registration.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum ConfigError {
    /// Spatial hash cells must have a positive, finite size.
    #[error("spatial hash cell size must be positive and finite, got {0}")]
    InvalidCellSize(f32),
    /// Quad-tree root must cover a positive, finite area.
    #[error("quad-tree world size must be positive and finite, got {0}")]
    InvalidWorldSize(f32),
    /// A quad-tree node has to hold at least one object before splitting.
    #[error("quad-tree node capacity must be at least 1")]
    InvalidNodeCapacity,
    /// Fixed time step must be positive and finite.
    #[error("time step must be positive and finite, got {0}")]
    InvalidTimeStep(f32),
    /// At least one sub-step has to run per call.
    #[error("max sub-steps must be at least 1")]
    InvalidSubSteps,
    /// Baumgarte factor outside of `[0, 1]`.
    #[error("baumgarte factor must lie in [0, 1], got {0}")]
    InvalidBaumgarte(f32),
    /// Penetration slop must be non-negative.
    #[error("penetration slop must be non-negative, got {0}")]
    InvalidSlop(f32),
    /// Time before a resting body sleeps must be non-negative.
    #[error("time to sleep must be non-negative, got {0}")]
    InvalidSleepTime(f32),
    /// A dynamic or kinematic body needs a positive, finite mass.
    #[error("body {body} is not static but has mass {mass}")]
    InvalidMass {
        /// Body being registered (null if not yet inserted).
        body: EntityId,
        /// Offending mass value.
        mass: f32,
    },
    /// The body id does not refer to a live body.
    #[error("no live body with id {0}")]
    UnknownBody(EntityId),
}
