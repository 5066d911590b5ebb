//! Path trace accumulation and best-effort publication

use std::sync::Arc;

use crate::common::Pose2D;
use crate::interfaces::TraceSink;

/// Poses sampled while executing one goal
///
/// Every cycle appends the sampled pose followed by the target, so a viewer
/// draws the robot's track together with where it was heading.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PathTrace {
    pub frame_id: String,
    pub poses: Vec<Pose2D>,
}

impl PathTrace {
    pub fn new(frame_id: &str) -> Self {
        PathTrace {
            frame_id: frame_id.to_string(),
            poses: Vec::new(),
        }
    }

    /// Append one cycle's sample and the target
    pub fn record(&mut self, current: Pose2D, target: Pose2D) {
        self.poses.push(current);
        self.poses.push(target);
    }

    /// The sampled robot poses, without the interleaved targets
    pub fn samples(&self) -> impl Iterator<Item = &Pose2D> {
        self.poses.iter().step_by(2)
    }

    pub fn len(&self) -> usize {
        self.poses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.poses.is_empty()
    }
}

/// Hands the trace to an external observer each cycle
#[derive(Clone)]
pub struct ProgressReporter {
    sink: Arc<dyn TraceSink>,
}

impl ProgressReporter {
    pub fn new(sink: Arc<dyn TraceSink>) -> Self {
        ProgressReporter { sink }
    }

    /// Publish the trace. Delivery failures are logged and swallowed.
    pub fn record(&self, trace: &PathTrace) {
        if let Err(e) = self.sink.publish(trace) {
            log::warn!("Failed to publish path trace: {}", e);
        }
    }
}
