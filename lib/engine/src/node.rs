//! The unit-of-work boundary.
//!
//! Every processing step is a [`NodeUnit`]: a pure function of the current
//! state to a partial-state update, or a failure. Units never mutate the
//! state in place, and a unit whose preconditions are unmet reports
//! [`NodeOutcome::Skipped`] rather than an error, so "nothing to do" stays
//! distinguishable from "something went wrong".

use crate::error::NodeError;
use crate::state::{StateUpdate, WorkflowState};
use async_trait::async_trait;

/// The successful result of a node invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeOutcome {
    /// The node did its work; merge this update into the shared state.
    Updated(StateUpdate),
    /// Preconditions were unmet; nothing was done and the pipeline continues.
    Skipped {
        /// Why the node had nothing to do.
        reason: String,
    },
}

impl NodeOutcome {
    /// Shorthand for a skip with the given reason.
    #[must_use]
    pub fn skipped(reason: impl Into<String>) -> Self {
        Self::Skipped {
            reason: reason.into(),
        }
    }
}

/// A named unit of work executed by the runner.
///
/// Implementations may suspend for their own external I/O, and may fan out
/// internal sub-calls concurrently, but each invocation owns its execution
/// slot: the runner dispatches the next node only after this one resolves.
#[async_trait]
pub trait NodeUnit: Send + Sync {
    /// Executes the unit against the current state.
    ///
    /// # Errors
    ///
    /// Returns a [`NodeError`] when the work itself fails: bad input, a
    /// collaborator returning non-200, a timeout, or a network fault.
    async fn execute(&self, state: &WorkflowState) -> Result<NodeOutcome, NodeError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EchoUnit;

    #[async_trait]
    impl NodeUnit for EchoUnit {
        async fn execute(&self, state: &WorkflowState) -> Result<NodeOutcome, NodeError> {
            Ok(NodeOutcome::Updated(StateUpdate {
                transcript: state.transcript.clone(),
                ..StateUpdate::default()
            }))
        }
    }

    #[tokio::test]
    async fn unit_reads_state_without_mutating_it() {
        let state = WorkflowState {
            transcript: Some("hello".to_string()),
            ..WorkflowState::default()
        };
        let outcome = EchoUnit.execute(&state).await.expect("execute");
        match outcome {
            NodeOutcome::Updated(update) => {
                assert_eq!(update.transcript.as_deref(), Some("hello"));
            }
            NodeOutcome::Skipped { .. } => panic!("expected update"),
        }
        assert_eq!(state.transcript.as_deref(), Some("hello"));
    }

    #[test]
    fn skipped_shorthand() {
        let outcome = NodeOutcome::skipped("no scope");
        assert_eq!(
            outcome,
            NodeOutcome::Skipped {
                reason: "no scope".to_string()
            }
        );
    }
}
