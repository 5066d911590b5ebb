//! Goal service facade: one goal at a time, reported back to the caller

use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::watch;

use super::execution::{ExecutionDriver, GoalExecution};
use super::trace::ProgressReporter;
use super::{Goal, GoalFeedback, GoalReport};
use crate::config::OsmcParams;
use crate::control::{BangBangController, GoalController};
use crate::error::{ConfigError, NavError};
use crate::interfaces::{TraceSink, VelocitySink};
use crate::lifecycle::{LifecycleError, LifecycleNode, LifecycleNodeBase, State};
use crate::perception::PoseStore;

type CancelSlot = Mutex<Option<watch::Sender<bool>>>;

/// Frees the active-goal slot however `submit` ends, including when its
/// future is dropped mid-execution
struct ActiveGoal<'a> {
    slot: &'a CancelSlot,
}

impl Drop for ActiveGoal<'_> {
    fn drop(&mut self) {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

/// Accepts point-to-point goals and executes them one at a time
pub struct GoalServer {
    base: LifecycleNodeBase,
    params: OsmcParams,
    controller: Arc<dyn GoalController>,
    pose_store: Arc<PoseStore>,
    driver: ExecutionDriver,
    active: CancelSlot,
}

impl GoalServer {
    /// Create a goal server using the bang-bang controller
    ///
    /// Fails if `params` does not validate.
    pub fn new(
        params: OsmcParams,
        pose_store: Arc<PoseStore>,
        velocity_sink: Arc<dyn VelocitySink>,
        trace_sink: Arc<dyn TraceSink>,
    ) -> Result<Self, ConfigError> {
        let controller = Arc::new(BangBangController::from_params(&params));
        Self::with_controller(params, controller, pose_store, velocity_sink, trace_sink)
    }

    /// Create a goal server with a specific control law
    pub fn with_controller(
        params: OsmcParams,
        controller: Arc<dyn GoalController>,
        pose_store: Arc<PoseStore>,
        velocity_sink: Arc<dyn VelocitySink>,
        trace_sink: Arc<dyn TraceSink>,
    ) -> Result<Self, ConfigError> {
        params.validate()?;
        let driver = ExecutionDriver::new(
            &params,
            Arc::clone(&pose_store),
            velocity_sink,
            ProgressReporter::new(trace_sink),
        );
        Ok(GoalServer {
            base: LifecycleNodeBase::new("osmc"),
            params,
            controller,
            pose_store,
            driver,
            active: Mutex::new(None),
        })
    }

    pub fn name(&self) -> &str {
        &self.base.name
    }

    pub fn state(&self) -> State {
        self.base.get_state()
    }

    pub fn params(&self) -> &OsmcParams {
        &self.params
    }

    /// Name of the control law in use
    pub fn controller_name(&self) -> &str {
        self.controller.name()
    }

    /// Whether a goal is currently executing
    pub fn is_busy(&self) -> bool {
        self.active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Per-cycle feedback of whichever goal is running
    pub fn feedback(&self) -> watch::Receiver<Option<GoalFeedback>> {
        self.driver.subscribe_feedback()
    }

    /// Ask the active goal to stop at its next cycle boundary
    ///
    /// Returns false if no goal was running.
    pub fn cancel(&self) -> bool {
        match self
            .active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
        {
            Some(cancel) => {
                log::info!("{}: cancel requested", self.name());
                cancel.send_replace(true);
                true
            }
            None => false,
        }
    }

    /// Claim the active-goal slot, or fail with `Inactive` or `Busy`
    ///
    /// The state is checked under the slot lock. `on_deactivate` changes the
    /// state before it takes that lock, so a goal claimed here is always seen
    /// by its cancel.
    fn claim(&self) -> Result<(ActiveGoal<'_>, watch::Receiver<bool>), NavError> {
        let mut slot = self.active.lock().unwrap_or_else(PoisonError::into_inner);
        if self.state() != State::Active {
            return Err(NavError::Inactive);
        }
        if slot.is_some() {
            return Err(NavError::Busy);
        }
        let (tx, rx) = watch::channel(false);
        *slot = Some(tx);
        Ok((ActiveGoal { slot: &self.active }, rx))
    }

    /// Execute `goal`, resolving once the robot has converged on it
    ///
    /// Rejections (`Inactive`, `InvalidGoal`, `Busy`, `StalePose`) return
    /// immediately without touching a goal that is already running.
    pub async fn submit(&self, goal: Goal) -> Result<GoalReport, NavError> {
        if self.state() != State::Active {
            return Err(NavError::Inactive);
        }
        if !goal.target.is_finite() {
            return Err(NavError::InvalidGoal(format!(
                "target {:?} is not finite",
                goal.target
            )));
        }

        let (_active, mut cancel) = self.claim().map_err(|e| {
            log::warn!("{}: rejecting goal {:?}: {}", self.name(), goal.target, e);
            e
        })?;

        let start = self
            .pose_store
            .fresh(self.params.stale_pose_timeout())
            .map_err(|e| {
                log::warn!("{}: rejecting goal {:?}: {}", self.name(), goal.target, e);
                e
            })?;

        log::info!(
            "TARGET: pose ({:.3},{:.3}) heading {:.3}, starting from ({:.3},{:.3}) heading {:.3}",
            goal.target.x,
            goal.target.y,
            goal.target.heading,
            start.x,
            start.y,
            start.heading
        );

        let mut execution =
            GoalExecution::new(goal, Arc::clone(&self.controller), &self.params.frame_id);
        self.driver.run(&mut execution, &mut cancel).await
    }
}

impl LifecycleNode for GoalServer {
    fn on_configure(&self) -> Result<(), LifecycleError> {
        self.base
            .transition("configure", State::Unconfigured, State::Inactive)
    }

    fn on_activate(&self) -> Result<(), LifecycleError> {
        self.base.transition("activate", State::Inactive, State::Active)
    }

    fn on_deactivate(&self) -> Result<(), LifecycleError> {
        self.base
            .transition("deactivate", State::Active, State::Inactive)?;
        self.cancel();
        Ok(())
    }

    fn on_cleanup(&self) -> Result<(), LifecycleError> {
        self.base
            .transition("cleanup", State::Inactive, State::Unconfigured)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::Pose2D;
    use crate::interfaces::{LogTraceSink, LogVelocitySink};
    use crate::lifecycle;

    fn server() -> GoalServer {
        let server = GoalServer::new(
            OsmcParams::default(),
            Arc::new(PoseStore::new()),
            Arc::new(LogVelocitySink),
            Arc::new(LogTraceSink),
        )
        .unwrap();
        lifecycle::bring_up(&server).unwrap();
        server
    }

    #[test]
    fn claim_after_deactivate_is_inactive() {
        let server = server();
        server.on_deactivate().unwrap();
        assert!(matches!(server.claim(), Err(NavError::Inactive)));
        assert!(!server.is_busy());
    }

    #[test]
    fn deactivate_cancels_a_claimed_goal() {
        let server = server();
        let (_active, cancel) = server.claim().unwrap();
        assert!(!*cancel.borrow());

        server.on_deactivate().unwrap();
        assert!(*cancel.borrow());
        assert!(matches!(server.claim(), Err(NavError::Busy)));
    }

    #[test]
    fn zero_rate_is_rejected() {
        let result = GoalServer::new(
            OsmcParams {
                rate_hz: 0.0,
                ..OsmcParams::default()
            },
            Arc::new(PoseStore::new()),
            Arc::new(LogVelocitySink),
            Arc::new(LogTraceSink),
        );
        assert!(matches!(
            result,
            Err(ConfigError::Invalid { name: "rate_hz", .. })
        ));
    }

    #[tokio::test]
    async fn slot_is_free_after_a_goal() {
        let server = server();
        let pose = Pose2D::new(0.0, 0.0, 0.0);
        server.pose_store.update(pose);
        assert!(server.submit(Goal::new(pose)).await.is_ok());
        assert!(server.claim().is_ok());
    }
}
