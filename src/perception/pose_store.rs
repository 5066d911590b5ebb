//! Latest-pose cache shared between the pose feed and the control loop

use std::sync::{PoisonError, RwLock};
use std::time::Duration;
use tokio::time::Instant;

use crate::common::Pose2D;
use crate::error::NavError;

/// A pose together with the instant it was received
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PoseSample {
    pub pose: Pose2D,
    pub received_at: Instant,
}

impl PoseSample {
    pub fn age(&self) -> Duration {
        self.received_at.elapsed()
    }
}

/// Holds the most recently received pose estimate
///
/// Written by the pose feed listener, read by the control loop. Updates
/// replace the stored sample unconditionally; out-of-order delivery is not
/// detected.
#[derive(Debug, Default)]
pub struct PoseStore {
    latest: RwLock<Option<PoseSample>>,
}

impl PoseStore {
    pub fn new() -> Self {
        PoseStore::default()
    }

    /// Replace the stored pose
    pub fn update(&self, pose: Pose2D) {
        let sample = PoseSample {
            pose,
            received_at: Instant::now(),
        };
        *self.latest.write().unwrap_or_else(PoisonError::into_inner) = Some(sample);
    }

    /// Latest pose, or the zero pose if none has arrived yet
    pub fn read(&self) -> Pose2D {
        self.latest().map(|s| s.pose).unwrap_or_default()
    }

    pub fn latest(&self) -> Option<PoseSample> {
        *self.latest.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn has_pose(&self) -> bool {
        self.latest().is_some()
    }

    /// Latest pose if one exists and it is no older than `max_age`
    pub fn fresh(&self, max_age: Option<Duration>) -> Result<Pose2D, NavError> {
        let sample = self.latest().ok_or(NavError::StalePose { age: None })?;
        match max_age {
            Some(max_age) if sample.age() > max_age => Err(NavError::StalePose {
                age: Some(sample.age()),
            }),
            _ => Ok(sample.pose),
        }
    }
}
