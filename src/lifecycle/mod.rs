//! Lifecycle management for OSMC components

use std::sync::{Mutex, PoisonError};
use thiserror::Error;

/// Trait for components that follow a lifecycle pattern
///
/// Transitions take `&self` so a node shared between tasks can be driven
/// without exclusive access.
pub trait LifecycleNode: Send + Sync {
    /// Configure the node
    fn on_configure(&self) -> Result<(), LifecycleError>;

    /// Activate the node
    fn on_activate(&self) -> Result<(), LifecycleError>;

    /// Deactivate the node
    fn on_deactivate(&self) -> Result<(), LifecycleError>;

    /// Clean up the node
    fn on_cleanup(&self) -> Result<(), LifecycleError>;
}

/// State of a lifecycle node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Unconfigured,
    Inactive,
    Active,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{node}: cannot {transition} from {from:?}")]
pub struct LifecycleError {
    pub node: String,
    pub transition: &'static str,
    pub from: State,
}

/// Base implementation for lifecycle nodes
#[derive(Debug)]
pub struct LifecycleNodeBase {
    pub name: String,
    state: Mutex<State>,
}

impl LifecycleNodeBase {
    /// Create a new lifecycle node base
    pub fn new(name: &str) -> Self {
        LifecycleNodeBase {
            name: name.to_string(),
            state: Mutex::new(State::Unconfigured),
        }
    }

    /// Get the current state
    pub fn get_state(&self) -> State {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Move from `from` to `to`, failing if the node is elsewhere
    pub fn transition(
        &self,
        transition: &'static str,
        from: State,
        to: State,
    ) -> Result<(), LifecycleError> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if *state != from {
            return Err(LifecycleError {
                node: self.name.clone(),
                transition,
                from: *state,
            });
        }
        log::info!("{}: {} ({:?} -> {:?})", self.name, transition, from, to);
        *state = to;
        Ok(())
    }
}

/// Drive an unconfigured node straight to active
pub fn bring_up(node: &dyn LifecycleNode) -> Result<(), LifecycleError> {
    node.on_configure()?;
    node.on_activate()
}

/// Drive an active node back to unconfigured
pub fn tear_down(node: &dyn LifecycleNode) -> Result<(), LifecycleError> {
    node.on_deactivate()?;
    node.on_cleanup()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transitions_follow_the_state_chain() {
        let base = LifecycleNodeBase::new("node");
        assert_eq!(base.get_state(), State::Unconfigured);
        base.transition("configure", State::Unconfigured, State::Inactive)
            .unwrap();
        base.transition("activate", State::Inactive, State::Active)
            .unwrap();
        assert_eq!(base.get_state(), State::Active);
    }

    #[test]
    fn out_of_order_transition_is_rejected() {
        let base = LifecycleNodeBase::new("node");
        let err = base
            .transition("activate", State::Inactive, State::Active)
            .unwrap_err();
        assert_eq!(err.from, State::Unconfigured);
        assert_eq!(base.get_state(), State::Unconfigured);
    }
}
