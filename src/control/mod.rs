//! Control module: turns (current pose, target pose) into a velocity command
pub mod controllers;

pub use self::controllers::BangBangController;

use crate::common::{Pose2D, VelocityCommand};
use std::fmt::Debug;

/// Result of evaluating a control law once
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlOutput {
    pub command: VelocityCommand,
    /// Normalized bearing error in radians
    pub heading_error: f64,
    /// Signed displacement driving the linear axis, in meters
    pub linear_error: f64,
}

impl ControlOutput {
    /// A zero command means both dead-bands are satisfied
    pub fn is_converged(&self) -> bool {
        self.command.is_zero()
    }
}

/// Trait for point-to-point control laws
pub trait GoalController: Debug + Send + Sync {
    /// Compute the command that moves `current` toward `target`
    fn compute(&self, current: &Pose2D, target: &Pose2D) -> ControlOutput;

    /// Get the name of this controller
    fn name(&self) -> &str;
}
