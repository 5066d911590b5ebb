//! Perception module: the pose feed and the pose it leaves behind
pub mod pose_store;

pub use self::pose_store::{PoseSample, PoseStore};

use crate::common::Pose2D;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Drain an inbound pose feed into the store until the sender side closes
pub fn spawn_pose_listener(
    mut feed: mpsc::Receiver<Pose2D>,
    store: Arc<PoseStore>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(pose) = feed.recv().await {
            log::trace!(
                "Pose update: x={:.3}, y={:.3}, heading={:.3}",
                pose.x,
                pose.y,
                pose.heading
            );
            store.update(pose);
        }
        log::info!("Pose feed closed");
    })
}
