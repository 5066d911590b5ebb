//! Outbound interfaces: where velocity commands and path traces go
//!
//! Both sinks are fire-and-forget. Implementations must not block the
//! control loop; a failed delivery is reported and the loop carries on.

use tokio::sync::{mpsc, watch};

use crate::common::VelocityCommand;
use crate::error::SinkError;
use crate::navigation::trace::PathTrace;

/// Receives one velocity command per control cycle
pub trait VelocitySink: Send + Sync {
    fn send(&self, command: VelocityCommand) -> Result<(), SinkError>;
}

/// Receives the path trace once per control cycle
pub trait TraceSink: Send + Sync {
    fn publish(&self, trace: &PathTrace) -> Result<(), SinkError>;
}

/// Velocity sink backed by a bounded tokio channel
#[derive(Debug, Clone)]
pub struct ChannelVelocitySink {
    tx: mpsc::Sender<VelocityCommand>,
}

impl ChannelVelocitySink {
    pub fn new(tx: mpsc::Sender<VelocityCommand>) -> Self {
        ChannelVelocitySink { tx }
    }

    /// Create a sink and the receiver that drains it
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<VelocityCommand>) {
        let (tx, rx) = mpsc::channel(capacity);
        (ChannelVelocitySink { tx }, rx)
    }
}

impl VelocitySink for ChannelVelocitySink {
    fn send(&self, command: VelocityCommand) -> Result<(), SinkError> {
        self.tx.try_send(command).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => SinkError::Full,
            mpsc::error::TrySendError::Closed(_) => SinkError::Closed,
        })
    }
}

/// Trace sink that keeps only the most recent trace for observers
#[derive(Debug)]
pub struct WatchTraceSink {
    tx: watch::Sender<PathTrace>,
}

impl WatchTraceSink {
    pub fn channel(frame_id: &str) -> (Self, watch::Receiver<PathTrace>) {
        let (tx, rx) = watch::channel(PathTrace::new(frame_id));
        (WatchTraceSink { tx }, rx)
    }
}

impl TraceSink for WatchTraceSink {
    fn publish(&self, trace: &PathTrace) -> Result<(), SinkError> {
        if self.tx.is_closed() {
            return Err(SinkError::Closed);
        }
        self.tx.send_replace(trace.clone());
        Ok(())
    }
}

/// Velocity sink that only logs, for dry runs
#[derive(Debug, Default, Clone, Copy)]
pub struct LogVelocitySink;

impl VelocitySink for LogVelocitySink {
    fn send(&self, command: VelocityCommand) -> Result<(), SinkError> {
        log::debug!(
            "cmd_vel: linear.x={:.2}, angular.z={:.2}",
            command.linear_x,
            command.angular_z
        );
        Ok(())
    }
}

/// Trace sink that only logs the trace length
#[derive(Debug, Default, Clone, Copy)]
pub struct LogTraceSink;

impl TraceSink for LogTraceSink {
    fn publish(&self, trace: &PathTrace) -> Result<(), SinkError> {
        log::debug!("Path trace in {}: {} poses", trace.frame_id, trace.len());
        Ok(())
    }
}
