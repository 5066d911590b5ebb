//! Navigation module: goal execution for point-to-point moves
pub mod execution;
pub mod server;
pub mod trace;

pub use self::execution::{CycleOutcome, ExecutionDriver, ExecutionState, GoalExecution};
pub use self::server::GoalServer;
pub use self::trace::{PathTrace, ProgressReporter};

use crate::common::{Pose2D, VelocityCommand};

/// A requested target pose
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Goal {
    pub target: Pose2D,
}

impl Goal {
    pub fn new(target: Pose2D) -> Self {
        Goal { target }
    }
}

/// Returned to the caller once a goal converges
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GoalReport {
    pub target: Pose2D,
    /// Pose sampled on the converging cycle
    pub final_pose: Pose2D,
    /// Number of control cycles evaluated, including the converging one
    pub cycles: u64,
}

/// Per-cycle status of the active goal
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GoalFeedback {
    pub cycle: u64,
    pub current: Pose2D,
    pub command: VelocityCommand,
    pub heading_error: f64,
    pub linear_error: f64,
    pub distance_remaining: f64,
}
