//! Parameters for the goal service, loadable from YAML

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::ConfigError;

/// How the linear dead-band measures the remaining x displacement
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinearErrorMode {
    /// Along the robot's own x axis, so `linear_x` always points at the target
    #[default]
    BodyFrame,
    /// Along the world x axis, ignoring heading
    WorldX,
}

/// Goal execution parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OsmcParams {
    /// Control loop cadence in Hz
    pub rate_hz: f64,
    /// Heading dead-band in radians (about three degrees)
    pub angular_tolerance: f64,
    /// Position dead-band in meters
    pub linear_tolerance: f64,
    /// Fixed turn rate magnitude in rad/s
    pub turn_rate: f64,
    /// Fixed forward speed magnitude in m/s
    pub speed: f64,
    pub linear_error: LinearErrorMode,
    /// Poses older than this are not commanded against. `None` disables the check.
    pub stale_pose_timeout_s: Option<f64>,
    /// Frame the path trace is published in
    pub frame_id: String,
}

impl Default for OsmcParams {
    fn default() -> Self {
        OsmcParams {
            rate_hz: 5.0,
            angular_tolerance: 0.05,
            linear_tolerance: 0.02,
            turn_rate: 0.5,
            speed: 0.1,
            linear_error: LinearErrorMode::BodyFrame,
            stale_pose_timeout_s: Some(1.0),
            frame_id: "odom".to_string(),
        }
    }
}

impl OsmcParams {
    /// Load and validate parameters from a YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&text)
    }

    /// Parse and validate parameters from YAML text. Missing keys take defaults.
    pub fn from_yaml_str(text: &str) -> Result<Self, ConfigError> {
        let params: OsmcParams = serde_yaml::from_str(text)?;
        params.validate()?;
        Ok(params)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("rate_hz", self.rate_hz),
            ("angular_tolerance", self.angular_tolerance),
            ("linear_tolerance", self.linear_tolerance),
            ("turn_rate", self.turn_rate),
            ("speed", self.speed),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::Invalid {
                    name,
                    reason: format!("must be a positive number, got {}", value),
                });
            }
        }
        if let Some(timeout) = self.stale_pose_timeout_s {
            if !(timeout.is_finite() && timeout > 0.0) {
                return Err(ConfigError::Invalid {
                    name: "stale_pose_timeout_s",
                    reason: format!("must be a positive number, got {}", timeout),
                });
            }
        }
        Ok(())
    }

    /// Time between control cycles
    pub fn period(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.rate_hz)
    }

    pub fn stale_pose_timeout(&self) -> Option<Duration> {
        self.stale_pose_timeout_s.map(Duration::from_secs_f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_fixed_controller() {
        let params = OsmcParams::default();
        assert_eq!(params.period(), Duration::from_millis(200));
        assert_eq!(params.angular_tolerance, 0.05);
        assert_eq!(params.linear_tolerance, 0.02);
        assert_eq!(params.turn_rate, 0.5);
        assert_eq!(params.speed, 0.1);
        params.validate().unwrap();
    }

    #[test]
    fn partial_yaml_falls_back_to_defaults() {
        let params = OsmcParams::from_yaml_str("rate_hz: 10.0\nlinear_error: world_x\n").unwrap();
        assert_eq!(params.rate_hz, 10.0);
        assert_eq!(params.linear_error, LinearErrorMode::WorldX);
        assert_eq!(params.speed, 0.1);
        assert_eq!(params.frame_id, "odom");
    }

    #[test]
    fn stale_check_can_be_disabled() {
        let params = OsmcParams::from_yaml_str("stale_pose_timeout_s: null\n").unwrap();
        assert_eq!(params.stale_pose_timeout(), None);
    }

    #[test]
    fn non_positive_values_are_rejected() {
        let err = OsmcParams::from_yaml_str("speed: 0.0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "speed", .. }));

        let err = OsmcParams::from_yaml_str("stale_pose_timeout_s: -1.0\n").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                name: "stale_pose_timeout_s",
                ..
            }
        ));
    }

    #[test]
    fn malformed_yaml_is_a_parse_error() {
        let err = OsmcParams::from_yaml_str("rate_hz: [fast]\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
