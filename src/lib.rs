//! OSMC: drive a mobile robot to a single target pose
//!
//! A [`GoalServer`] accepts one goal at a time, samples the latest pose from
//! a [`PoseStore`], and emits bang-bang velocity commands until both the
//! heading and position errors fall inside their dead-bands.

pub mod common;
pub mod config;
pub mod control;
pub mod error;
pub mod interfaces;
pub mod lifecycle;
pub mod navigation;
pub mod perception;
pub mod sim;

pub use crate::common::{normalize_angle, Pose2D, VelocityCommand};
pub use crate::config::{LinearErrorMode, OsmcParams};
pub use crate::control::{BangBangController, ControlOutput, GoalController};
pub use crate::error::{ConfigError, NavError, SinkError};
pub use crate::interfaces::{TraceSink, VelocitySink};
pub use crate::navigation::{Goal, GoalFeedback, GoalReport, GoalServer, PathTrace};
pub use crate::perception::PoseStore;
