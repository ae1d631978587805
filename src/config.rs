//! Simulation configuration and its default values.
//!
//! Algorithms never read the `DEFAULT_*` constants directly; they receive the
//! validated [`SimulationConfig`] owned by the world.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Default gravity vector applied in the physics world (Y-up).
pub const DEFAULT_GRAVITY: [f32; 3] = [0.0, -9.81, 0.0];

/// Default integration timestep (in seconds).
pub const DEFAULT_TIME_STEP: f32 = 1.0 / 60.0;

/// Upper bound on fixed ticks run by a single `step` call.
pub const DEFAULT_MAX_SUB_STEPS: u32 = 3;

/// Number of constraint solver iterations performed per tick.
pub const DEFAULT_SOLVER_ITERATIONS: u32 = 10;

/// Fraction of penetration fed back as separating velocity each tick.
pub const DEFAULT_BAUMGARTE: f32 = 0.2;

/// Penetration tolerated before the bias term kicks in.
pub const DEFAULT_SLOP: f32 = 0.01;

/// Tangential speed below which friction is skipped.
pub const DEFAULT_TANGENT_THRESHOLD: f32 = 1e-6;

/// Default cell size for the broad-phase spatial hash.
pub const DEFAULT_BROADPHASE_CELL_SIZE: f32 = 5.0;

/// Edge length of the square region covered by the quad-tree root.
pub const DEFAULT_QUADTREE_WORLD_SIZE: f32 = 1000.0;

/// Depth at which quad-tree nodes stop splitting.
pub const DEFAULT_QUADTREE_MAX_DEPTH: u32 = 5;

/// Objects a quad-tree node holds before it splits.
pub const DEFAULT_QUADTREE_MAX_OBJECTS: usize = 10;

/// Seconds a body must stay below its sleep threshold before sleeping.
pub const DEFAULT_TIME_TO_SLEEP: f32 = 0.5;

/// Default per-body squared-speed threshold for sleeping.
pub const DEFAULT_SLEEP_THRESHOLD: f32 = 0.01;

/// Which spatial index the broad phase rebuilds every tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum SpatialIndexKind {
    /// Uniform 3D hash of fixed-size cells.
    SpatialHash { cell_size: f32 },
    /// X/Z quad-tree rooted at the origin.
    QuadTree {
        world_size: f32,
        max_depth: u32,
        max_objects: usize,
    },
}

impl Default for SpatialIndexKind {
    fn default() -> Self {
        Self::SpatialHash {
            cell_size: DEFAULT_BROADPHASE_CELL_SIZE,
        }
    }
}

impl SpatialIndexKind {
    pub fn quad_tree() -> Self {
        Self::QuadTree {
            world_size: DEFAULT_QUADTREE_WORLD_SIZE,
            max_depth: DEFAULT_QUADTREE_MAX_DEPTH,
            max_objects: DEFAULT_QUADTREE_MAX_OBJECTS,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BroadPhaseConfig {
    pub index: SpatialIndexKind,
    /// Register static bodies too, so dynamic bodies can rest on them.
    /// Static–static pairs are never emitted.
    pub include_static_bodies: bool,
}

impl Default for BroadPhaseConfig {
    fn default() -> Self {
        Self {
            index: SpatialIndexKind::default(),
            include_static_bodies: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    pub iterations: u32,
    pub baumgarte: f32,
    pub slop: f32,
    pub tangent_threshold: f32,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            iterations: DEFAULT_SOLVER_ITERATIONS,
            baumgarte: DEFAULT_BAUMGARTE,
            slop: DEFAULT_SLOP,
            tangent_threshold: DEFAULT_TANGENT_THRESHOLD,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SleepConfig {
    pub time_to_sleep: f32,
}

impl Default for SleepConfig {
    fn default() -> Self {
        Self {
            time_to_sleep: DEFAULT_TIME_TO_SLEEP,
        }
    }
}

/// Everything the world needs besides the bodies themselves.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub gravity: Vec3,
    pub fixed_time_step: f32,
    pub max_sub_steps: u32,
    pub broad_phase: BroadPhaseConfig,
    pub solver: SolverConfig,
    pub sleep: SleepConfig,
    /// Warn when one `step` call takes longer than this many milliseconds.
    pub frame_budget_ms: Option<f32>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            gravity: Vec3::from_array(DEFAULT_GRAVITY),
            fixed_time_step: DEFAULT_TIME_STEP,
            max_sub_steps: DEFAULT_MAX_SUB_STEPS,
            broad_phase: BroadPhaseConfig::default(),
            solver: SolverConfig::default(),
            sleep: SleepConfig::default(),
            frame_budget_ms: None,
        }
    }
}

impl SimulationConfig {
    /// Checks every parameter once; the tick loop assumes a validated config.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.fixed_time_step.is_finite() && self.fixed_time_step > 0.0) {
            return Err(ConfigError::InvalidTimeStep(self.fixed_time_step));
        }
        if self.max_sub_steps == 0 {
            return Err(ConfigError::InvalidSubSteps);
        }

        match self.broad_phase.index {
            SpatialIndexKind::SpatialHash { cell_size } => {
                if !(cell_size.is_finite() && cell_size > 0.0) {
                    return Err(ConfigError::InvalidCellSize(cell_size));
                }
            }
            SpatialIndexKind::QuadTree {
                world_size,
                max_objects,
                ..
            } => {
                if !(world_size.is_finite() && world_size > 0.0) {
                    return Err(ConfigError::InvalidWorldSize(world_size));
                }
                if max_objects == 0 {
                    return Err(ConfigError::InvalidNodeCapacity);
                }
            }
        }

        let solver = &self.solver;
        if !(0.0..=1.0).contains(&solver.baumgarte) {
            return Err(ConfigError::InvalidBaumgarte(solver.baumgarte));
        }
        if !(solver.slop >= 0.0) {
            return Err(ConfigError::InvalidSlop(solver.slop));
        }
        if !(self.sleep.time_to_sleep >= 0.0) {
            return Err(ConfigError::InvalidSleepTime(self.sleep.time_to_sleep));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert_eq!(SimulationConfig::default().validate(), Ok(()));
        let mut config = SimulationConfig::default();
        config.broad_phase.index = SpatialIndexKind::quad_tree();
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn rejects_non_positive_cell_size() {
        let mut config = SimulationConfig::default();
        for bad in [0.0, -2.0, f32::NAN] {
            config.broad_phase.index = SpatialIndexKind::SpatialHash { cell_size: bad };
            assert!(matches!(
                config.validate(),
                Err(ConfigError::InvalidCellSize(_))
            ));
        }
    }

    #[test]
    fn rejects_bad_solver_and_step_parameters() {
        let mut config = SimulationConfig::default();
        config.solver.baumgarte = 1.5;
        assert_eq!(config.validate(), Err(ConfigError::InvalidBaumgarte(1.5)));

        let mut config = SimulationConfig::default();
        config.solver.slop = -0.1;
        assert_eq!(config.validate(), Err(ConfigError::InvalidSlop(-0.1)));

        let mut config = SimulationConfig::default();
        config.max_sub_steps = 0;
        assert_eq!(config.validate(), Err(ConfigError::InvalidSubSteps));

        let mut config = SimulationConfig::default();
        config.fixed_time_step = 0.0;
        assert_eq!(config.validate(), Err(ConfigError::InvalidTimeStep(0.0)));
    }

    #[test]
    fn rejects_empty_quad_tree_nodes() {
        let mut config = SimulationConfig::default();
        config.broad_phase.index = SpatialIndexKind::QuadTree {
            world_size: 100.0,
            max_depth: 4,
            max_objects: 0,
        };
        assert_eq!(config.validate(), Err(ConfigError::InvalidNodeCapacity));
    }
}
