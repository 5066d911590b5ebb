//! Kinematic unicycle robot, used to close the loop without hardware
//!
//! Commands go in through a channel or a [`VelocitySink`], poses come out
//! through a pose feed or straight into the pose store, mirroring how cmd_vel
//! and odometry would be wired on a real robot.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};

use crate::common::{Pose2D, VelocityCommand};
use crate::error::SinkError;
use crate::interfaces::VelocitySink;
use crate::perception::PoseStore;

/// Unicycle model integrating (linear_x, angular_z) commands
#[derive(Debug, Clone)]
pub struct UnicycleSim {
    pose: Pose2D,
    command: VelocityCommand,
}

impl UnicycleSim {
    pub fn new(start: Pose2D) -> Self {
        UnicycleSim {
            pose: start,
            command: VelocityCommand::zero(),
        }
    }

    pub fn pose(&self) -> Pose2D {
        self.pose
    }

    /// Latch a command; it is held until the next one arrives
    pub fn set_command(&mut self, command: VelocityCommand) {
        self.command = command;
    }

    /// Advance by `dt` under the latched command
    pub fn advance(&mut self, dt: Duration) -> Pose2D {
        let dt = dt.as_secs_f64();
        let dtheta = self.command.angular_z * dt;
        let dist = self.command.linear_x * dt;

        // mid-point integration of the heading
        let mid = self.pose.heading + dtheta / 2.0;
        self.pose = Pose2D::new(
            self.pose.x + dist * mid.cos(),
            self.pose.y + dist * mid.sin(),
            self.pose.heading + dtheta,
        );
        self.pose
    }

    /// Latch `command` and advance by `dt`
    pub fn apply(&mut self, command: VelocityCommand, dt: Duration) -> Pose2D {
        self.set_command(command);
        self.advance(dt)
    }
}

/// Run the simulator at `period`, consuming commands and publishing poses
/// on `poses`
///
/// The starting pose is published immediately. A pose that cannot be queued
/// is dropped, like an odometry message lost on the wire. The task ends when
/// the command channel closes.
pub fn spawn_sim(
    mut sim: UnicycleSim,
    mut commands: mpsc::Receiver<VelocityCommand>,
    poses: mpsc::Sender<Pose2D>,
    period: Duration,
) -> JoinHandle<Pose2D> {
    tokio::spawn(async move {
        let publish = |pose: Pose2D| {
            if let Err(e) = poses.try_send(pose) {
                log::warn!("Dropping simulated pose: {}", e);
            }
        };
        publish(sim.pose());

        let mut ticker = time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // the first tick completes immediately
        ticker.tick().await;
        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(command) => sim.set_command(command),
                    None => break,
                },
                _ = ticker.tick() => publish(sim.advance(period)),
            }
        }
        log::info!("Simulator stopped at {:?}", sim.pose());
        sim.pose()
    })
}

/// Velocity sink that moves a simulated robot in lockstep with the loop
///
/// Each command is integrated over one control period and the resulting
/// pose is written to the store before `send` returns, so the next cycle
/// always observes the effect of the previous command.
#[derive(Debug)]
pub struct SimulatedBase {
    sim: Mutex<UnicycleSim>,
    store: Arc<PoseStore>,
    dt: Duration,
}

impl SimulatedBase {
    /// Publishes the starting pose immediately
    pub fn new(start: Pose2D, store: Arc<PoseStore>, dt: Duration) -> Self {
        store.update(start);
        SimulatedBase {
            sim: Mutex::new(UnicycleSim::new(start)),
            store,
            dt,
        }
    }

    pub fn pose(&self) -> Pose2D {
        self.sim.lock().unwrap_or_else(PoisonError::into_inner).pose()
    }
}

impl VelocitySink for SimulatedBase {
    fn send(&self, command: VelocityCommand) -> Result<(), SinkError> {
        let pose = self
            .sim
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .apply(command, self.dt);
        self.store.update(pose);
        Ok(())
    }
}
