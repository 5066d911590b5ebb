//! Per-goal control loop
//!
//! [`GoalExecution`] is the state machine for one goal and knows nothing
//! about time or I/O: feed it a pose, it returns the command and the next
//! state. [`ExecutionDriver`] runs it on a tokio interval, sampling the pose
//! store and pushing results to the sinks.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{self, MissedTickBehavior};

use super::trace::{PathTrace, ProgressReporter};
use super::{Goal, GoalFeedback, GoalReport};
use crate::common::{Pose2D, VelocityCommand};
use crate::config::OsmcParams;
use crate::control::{ControlOutput, GoalController};
use crate::error::NavError;
use crate::interfaces::VelocitySink;
use crate::perception::PoseStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionState {
    Running,
    /// Both dead-bands were satisfied in the same cycle
    Converged,
    Cancelled,
}

impl ExecutionState {
    pub fn is_terminal(&self) -> bool {
        *self != ExecutionState::Running
    }
}

/// What one control cycle produced
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CycleOutcome {
    pub current: Pose2D,
    pub output: ControlOutput,
    pub state: ExecutionState,
}

/// State machine for a single goal
#[derive(Debug)]
pub struct GoalExecution {
    goal: Goal,
    controller: Arc<dyn GoalController>,
    trace: PathTrace,
    cycles: u64,
    state: ExecutionState,
}

impl GoalExecution {
    /// Start executing `goal` with an empty trace
    pub fn new(goal: Goal, controller: Arc<dyn GoalController>, frame_id: &str) -> Self {
        GoalExecution {
            goal,
            controller,
            trace: PathTrace::new(frame_id),
            cycles: 0,
            state: ExecutionState::Running,
        }
    }

    /// Run one control cycle against `current`
    ///
    /// Once terminal, further steps return a zero command and leave the
    /// trace untouched.
    pub fn step(&mut self, current: Pose2D) -> CycleOutcome {
        if self.state.is_terminal() {
            return CycleOutcome {
                current,
                output: ControlOutput {
                    command: VelocityCommand::zero(),
                    heading_error: 0.0,
                    linear_error: 0.0,
                },
                state: self.state,
            };
        }

        let output = self.controller.compute(&current, &self.goal.target);
        self.trace.record(current, self.goal.target);
        self.cycles += 1;

        if output.is_converged() {
            self.state = ExecutionState::Converged;
        }

        CycleOutcome {
            current,
            output,
            state: self.state,
        }
    }

    pub fn cancel(&mut self) {
        if !self.state.is_terminal() {
            self.state = ExecutionState::Cancelled;
        }
    }

    pub fn goal(&self) -> &Goal {
        &self.goal
    }

    pub fn state(&self) -> ExecutionState {
        self.state
    }

    pub fn trace(&self) -> &PathTrace {
        &self.trace
    }

    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Feedback message describing `outcome`
    pub fn feedback(&self, outcome: &CycleOutcome) -> GoalFeedback {
        GoalFeedback {
            cycle: self.cycles,
            current: outcome.current,
            command: outcome.output.command,
            heading_error: outcome.output.heading_error,
            linear_error: outcome.output.linear_error,
            distance_remaining: outcome.current.distance_to(&self.goal.target),
        }
    }
}

/// Resolves once `cancel` flips to true. Never resolves if the sender is gone.
async fn cancelled(cancel: &mut watch::Receiver<bool>) {
    let sender_gone = cancel.wait_for(|&c| c).await.is_err();
    if sender_gone {
        std::future::pending::<()>().await;
    }
}

/// Runs a [`GoalExecution`] at a fixed cadence against live inputs
pub struct ExecutionDriver {
    pose_store: Arc<PoseStore>,
    velocity_sink: Arc<dyn VelocitySink>,
    reporter: ProgressReporter,
    feedback: watch::Sender<Option<GoalFeedback>>,
    period: Duration,
    stale_pose_timeout: Option<Duration>,
}

impl ExecutionDriver {
    pub fn new(
        params: &OsmcParams,
        pose_store: Arc<PoseStore>,
        velocity_sink: Arc<dyn VelocitySink>,
        reporter: ProgressReporter,
    ) -> Self {
        let (feedback, _) = watch::channel(None);
        ExecutionDriver {
            pose_store,
            velocity_sink,
            reporter,
            feedback,
            period: params.period(),
            stale_pose_timeout: params.stale_pose_timeout(),
        }
    }

    pub fn subscribe_feedback(&self) -> watch::Receiver<Option<GoalFeedback>> {
        self.feedback.subscribe()
    }

    fn emit(&self, command: VelocityCommand) {
        if let Err(e) = self.velocity_sink.send(command) {
            log::warn!("Failed to publish velocity command: {}", e);
        }
    }

    /// Cycle until the execution converges or `cancel` is raised
    pub async fn run(
        &self,
        execution: &mut GoalExecution,
        cancel: &mut watch::Receiver<bool>,
    ) -> Result<GoalReport, NavError> {
        // feedback from an earlier goal must not leak into this one
        self.feedback.send_replace(None);
        let mut ticker = time::interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = cancelled(cancel) => {
                    execution.cancel();
                    self.emit(VelocityCommand::zero());
                    log::info!("Goal cancelled after {} cycles", execution.cycles());
                    return Err(NavError::Cancelled);
                }
                _ = ticker.tick() => {}
            }

            let current = match self.pose_store.fresh(self.stale_pose_timeout) {
                Ok(pose) => pose,
                Err(e) => {
                    log::warn!("Holding position: {}", e);
                    self.emit(VelocityCommand::zero());
                    continue;
                }
            };

            let outcome = execution.step(current);
            log::debug!(
                "CURRENT: pose ({:.3},{:.3}) heading {:.3}, heading_error {:.3}, linear_error {:.3}",
                current.x,
                current.y,
                current.heading,
                outcome.output.heading_error,
                outcome.output.linear_error
            );

            self.emit(outcome.output.command);
            self.reporter.record(execution.trace());
            self.feedback
                .send_replace(Some(execution.feedback(&outcome)));

            if outcome.state == ExecutionState::Converged {
                log::info!(
                    "Goal reached at ({:.3},{:.3}) heading {:.3} after {} cycles",
                    current.x,
                    current.y,
                    current.heading,
                    execution.cycles()
                );
                return Ok(GoalReport {
                    target: execution.goal().target,
                    final_pose: current,
                    cycles: execution.cycles(),
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::BangBangController;
    use crate::sim::UnicycleSim;

    fn execution(target: Pose2D) -> GoalExecution {
        GoalExecution::new(Goal::new(target), Arc::new(BangBangController::new()), "odom")
    }

    #[test]
    fn coincident_pose_converges_on_first_cycle() {
        let pose = Pose2D::new(0.5, 0.5, 1.0);
        let mut exec = execution(pose);
        let outcome = exec.step(pose);
        assert_eq!(outcome.state, ExecutionState::Converged);
        assert!(outcome.output.command.is_zero());
        assert_eq!(exec.cycles(), 1);
        assert_eq!(exec.trace().len(), 2);
    }

    #[test]
    fn terminal_state_is_sticky() {
        let pose = Pose2D::new(0.0, 0.0, 0.0);
        let mut exec = execution(pose);
        exec.step(pose);
        let again = exec.step(Pose2D::new(5.0, 5.0, 0.0));
        assert_eq!(again.state, ExecutionState::Converged);
        assert!(again.output.command.is_zero());
        assert_eq!(exec.cycles(), 1);
    }

    #[test]
    fn cancel_stops_a_running_goal() {
        let mut exec = execution(Pose2D::new(1.0, 0.0, 0.0));
        let outcome = exec.step(Pose2D::new(0.0, 0.0, 0.0));
        assert_eq!(outcome.state, ExecutionState::Running);
        exec.cancel();
        assert_eq!(exec.state(), ExecutionState::Cancelled);
        assert!(exec.step(Pose2D::new(0.0, 0.0, 0.0)).output.command.is_zero());
    }

    #[test]
    fn straight_line_goal_drives_until_within_tolerance() {
        let target = Pose2D::new(1.0, 0.0, 0.0);
        let mut exec = execution(target);
        let mut sim = UnicycleSim::new(Pose2D::new(0.0, 0.0, 0.0));
        let dt = Duration::from_millis(200);

        let final_pose = loop {
            let pose = sim.pose();
            let outcome = exec.step(pose);
            if outcome.state == ExecutionState::Converged {
                break pose;
            }
            assert_eq!(outcome.output.command, VelocityCommand::new(0.1, 0.0));
            assert!(exec.cycles() < 100);
            sim.apply(outcome.output.command, dt);
        };

        assert!((final_pose.x - 1.0).abs() < 0.02);
        assert_eq!(final_pose.y, 0.0);
        // samples and targets interleave
        assert_eq!(exec.trace().len() as u64, 2 * exec.cycles());
    }

    #[tokio::test(start_paused = true)]
    async fn run_clears_feedback_from_the_previous_goal() {
        let params = OsmcParams::default();
        let driver = ExecutionDriver::new(
            &params,
            Arc::new(PoseStore::new()),
            Arc::new(crate::interfaces::LogVelocitySink),
            ProgressReporter::new(Arc::new(crate::interfaces::LogTraceSink)),
        );
        let feedback = driver.subscribe_feedback();

        let mut previous = execution(Pose2D::new(0.0, 0.0, 0.0));
        let outcome = previous.step(Pose2D::new(0.0, 0.0, 0.0));
        driver.feedback.send_replace(Some(previous.feedback(&outcome)));
        assert!(feedback.borrow().is_some());

        // With no pose the loop only holds, so no new feedback is produced
        let (_cancel_tx, mut cancel) = watch::channel(false);
        let mut next = execution(Pose2D::new(1.0, 0.0, 0.0));
        let run = driver.run(&mut next, &mut cancel);
        let result = time::timeout(Duration::from_millis(500), run).await;
        assert!(result.is_err());
        assert!(feedback.borrow().is_none());
        assert_eq!(next.cycles(), 0);
    }

    #[test]
    fn feedback_reports_remaining_distance() {
        let mut exec = execution(Pose2D::new(3.0, 4.0, 0.0));
        let outcome = exec.step(Pose2D::new(0.0, 0.0, 0.0));
        let feedback = exec.feedback(&outcome);
        assert_eq!(feedback.cycle, 1);
        assert!((feedback.distance_remaining - 5.0).abs() < 1e-12);
        assert_eq!(feedback.command, outcome.output.command);
    }
}
