//! Controllers for the robot

use super::{ControlOutput, GoalController};
use crate::common::{normalize_angle, Pose2D, VelocityCommand};
use crate::config::{LinearErrorMode, OsmcParams};

/// Fixed-magnitude command for `error`, or zero inside the dead-band
///
/// The band is open: an error of exactly `tolerance` still commands motion.
pub fn dead_band(error: f64, tolerance: f64, magnitude: f64) -> f64 {
    if error.abs() < tolerance {
        0.0
    } else if error > 0.0 {
        magnitude
    } else {
        -magnitude
    }
}

/// Bearing from `current` to `target` in the world frame
pub fn path_heading(current: &Pose2D, target: &Pose2D) -> f64 {
    let d = current.displacement_to(target);
    d.y.atan2(d.x)
}

/// Decoupled bang-bang controller for differential drive robots
///
/// Each axis outputs either zero or a fixed magnitude. Both axes are
/// evaluated every cycle, so the robot may turn and drive at once.
#[derive(Debug, Clone)]
pub struct BangBangController {
    angular_tolerance: f64,
    linear_tolerance: f64,
    turn_rate: f64,
    speed: f64,
    linear_error: LinearErrorMode,
}

impl BangBangController {
    /// Create a controller with the default tolerances and magnitudes
    pub fn new() -> Self {
        Self::from_params(&OsmcParams::default())
    }

    pub fn from_params(params: &OsmcParams) -> Self {
        BangBangController {
            angular_tolerance: params.angular_tolerance,
            linear_tolerance: params.linear_tolerance,
            turn_rate: params.turn_rate,
            speed: params.speed,
            linear_error: params.linear_error,
        }
    }

    /// Signed heading error toward the target
    ///
    /// Once the target position is inside the linear dead-band the bearing
    /// is meaningless (it is undefined when the positions coincide), so the
    /// error is reported as zero.
    fn heading_error(&self, current: &Pose2D, target: &Pose2D) -> f64 {
        if current.distance_to(target) < self.linear_tolerance {
            return 0.0;
        }
        normalize_angle(path_heading(current, target) - current.heading)
    }

    /// Signed x displacement that drives the linear axis
    fn linear_error(&self, current: &Pose2D, target: &Pose2D) -> f64 {
        match self.linear_error {
            LinearErrorMode::BodyFrame => current.body_displacement_to(target).x,
            LinearErrorMode::WorldX => target.x - current.x,
        }
    }
}

impl Default for BangBangController {
    fn default() -> Self {
        Self::new()
    }
}

impl GoalController for BangBangController {
    fn compute(&self, current: &Pose2D, target: &Pose2D) -> ControlOutput {
        let heading_error = self.heading_error(current, target);
        let linear_error = self.linear_error(current, target);

        let angular_z = dead_band(heading_error, self.angular_tolerance, self.turn_rate);
        let linear_x = dead_band(linear_error, self.linear_tolerance, self.speed);

        ControlOutput {
            command: VelocityCommand::new(linear_x, angular_z),
            heading_error,
            linear_error,
        }
    }

    fn name(&self) -> &str {
        "BangBangController"
    }
}
