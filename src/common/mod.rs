//! Common types shared by the perception, control and navigation stacks

use nalgebra::{Rotation2, UnitQuaternion, Vector2};
use std::f64::consts::{PI, TAU};

/// Wrap an angle into (-pi, pi]
pub fn normalize_angle(angle: f64) -> f64 {
    let wrapped = angle.rem_euclid(TAU);
    if wrapped > PI {
        wrapped - TAU
    } else {
        wrapped
    }
}

/// A planar pose (x, y, heading)
///
/// Poses are plain values: an update always replaces the previous pose
/// rather than mutating it.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Pose2D {
    pub x: f64,
    pub y: f64,
    /// Heading in radians, normalized to (-pi, pi]
    pub heading: f64,
}

impl Pose2D {
    /// Create a pose, normalizing the heading
    pub fn new(x: f64, y: f64, heading: f64) -> Self {
        Pose2D {
            x,
            y,
            heading: normalize_angle(heading),
        }
    }

    /// Build a pose from an odometry position and orientation quaternion
    pub fn from_odometry(x: f64, y: f64, qx: f64, qy: f64, qz: f64, qw: f64) -> Self {
        let orientation =
            UnitQuaternion::from_quaternion(nalgebra::Quaternion::new(qw, qx, qy, qz));
        let (_, _, yaw) = orientation.euler_angles();
        Pose2D::new(x, y, yaw)
    }

    /// Position as a vector
    pub fn position(&self) -> Vector2<f64> {
        Vector2::new(self.x, self.y)
    }

    /// Displacement from this pose to `other`, in the world frame
    pub fn displacement_to(&self, other: &Pose2D) -> Vector2<f64> {
        other.position() - self.position()
    }

    /// Displacement from this pose to `other`, expressed in this pose's body frame
    pub fn body_displacement_to(&self, other: &Pose2D) -> Vector2<f64> {
        Rotation2::new(self.heading).inverse() * self.displacement_to(other)
    }

    /// Euclidean distance between the two positions
    pub fn distance_to(&self, other: &Pose2D) -> f64 {
        self.displacement_to(other).norm()
    }

    /// Whether every field is a finite number
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.heading.is_finite()
    }
}

/// Two degree of freedom velocity command (forward speed, turn rate)
///
/// All other twist axes are always zero.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct VelocityCommand {
    /// Forward speed in m/s
    pub linear_x: f64,
    /// Turn rate in rad/s
    pub angular_z: f64,
}

impl VelocityCommand {
    pub fn new(linear_x: f64, angular_z: f64) -> Self {
        VelocityCommand {
            linear_x,
            angular_z,
        }
    }

    /// The stop command
    pub fn zero() -> Self {
        VelocityCommand::default()
    }

    pub fn is_zero(&self) -> bool {
        self.linear_x == 0.0 && self.angular_z == 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn normalize_angle_wraps_into_half_open_range() {
        assert!((normalize_angle(3.0 * FRAC_PI_2) + FRAC_PI_2).abs() < 1e-12);
        assert!((normalize_angle(-3.0 * FRAC_PI_2) - FRAC_PI_2).abs() < 1e-12);
        assert_eq!(normalize_angle(PI), PI);
        assert_eq!(normalize_angle(-PI), PI);
        assert_eq!(normalize_angle(0.0), 0.0);
    }

    #[test]
    fn odometry_quaternion_yields_yaw() {
        let yaw = 0.7_f64;
        let pose = Pose2D::from_odometry(1.0, 2.0, 0.0, 0.0, (yaw / 2.0).sin(), (yaw / 2.0).cos());
        assert_eq!(pose.x, 1.0);
        assert_eq!(pose.y, 2.0);
        assert!((pose.heading - yaw).abs() < 1e-9);
    }

    #[test]
    fn body_displacement_rotates_into_robot_frame() {
        let robot = Pose2D::new(0.0, 0.0, FRAC_PI_2);
        let target = Pose2D::new(0.0, 1.0, 0.0);
        let d = robot.body_displacement_to(&target);
        assert!((d.x - 1.0).abs() < 1e-9);
        assert!(d.y.abs() < 1e-9);
    }

    #[test]
    fn zero_command() {
        assert!(VelocityCommand::zero().is_zero());
        assert!(!VelocityCommand::new(0.1, 0.0).is_zero());
        assert!(!VelocityCommand::new(0.0, -0.5).is_zero());
    }
}
