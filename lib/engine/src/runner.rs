//! Sequential pipeline runner.
//!
//! The runner drives a resolved plan to completion against one state
//! instance: look up the node at the cursor, invoke it, merge its update,
//! record the trace, advance, and re-evaluate the halt conditions. Exactly
//! one node executes at a time, which gives a total order on state
//! mutations without any locking at this layer. A node name may legally
//! repeat in the plan; the runner does not detect repetition.

use crate::node::NodeOutcome;
use crate::registry::NodeRegistry;
use crate::state::WorkflowState;
use callflow_core::RunId;
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Why a run halted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HaltReason {
    /// Every step in the plan executed.
    Completed,
    /// A node failed (or was missing at dispatch); remaining steps skipped.
    Error,
    /// A node raised the halt flag without failing.
    SkippedByNode,
}

/// The observable state of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunStatus {
    /// Not yet started.
    Pending,
    /// The named node is currently executing.
    Running(String),
    /// The run is over.
    Halted(HaltReason),
}

impl RunStatus {
    /// Returns true if this is a terminal state.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Halted(_))
    }
}

/// Summary of a finished run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    /// Correlation ID minted for this run.
    pub run_id: RunId,
    /// Why the run halted.
    pub reason: HaltReason,
    /// When the first node was dispatched.
    pub started_at: DateTime<Utc>,
    /// When the run halted.
    pub finished_at: DateTime<Utc>,
}

impl RunSummary {
    /// Wall-clock duration of the run.
    #[must_use]
    pub fn duration(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }
}

/// Drives resolved plans against the shared registry.
///
/// The runner is cheap to clone and safe to share: it holds only an `Arc`
/// to the immutable registry, and each run owns its state exclusively.
#[derive(Debug, Clone)]
pub struct PipelineRunner {
    registry: Arc<NodeRegistry>,
}

impl PipelineRunner {
    /// Creates a runner over the given registry.
    #[must_use]
    pub fn new(registry: Arc<NodeRegistry>) -> Self {
        Self { registry }
    }

    /// The registry this runner dispatches from.
    #[must_use]
    pub fn registry(&self) -> &Arc<NodeRegistry> {
        &self.registry
    }

    /// Runs the plan in `state.steps` to completion.
    ///
    /// Entry is `steps[current_step_index]`, normally index 0. All
    /// failures are folded into the state (`error`, `skip_remaining`,
    /// error-marked trace entry); this method itself never fails.
    pub async fn run(&self, state: &mut WorkflowState) -> RunSummary {
        let run_id = RunId::new();
        let started_at = Utc::now();
        tracing::info!(%run_id, steps = ?state.steps, "starting pipeline run");

        let mut status = RunStatus::Pending;
        let reason = loop {
            status = next_status(&status, state);
            match &status {
                RunStatus::Running(name) => {
                    let name = name.clone();
                    self.dispatch(run_id, &name, state).await;
                }
                RunStatus::Halted(reason) => break *reason,
                RunStatus::Pending => unreachable!("transition never yields Pending"),
            }
        };

        let finished_at = Utc::now();
        match reason {
            HaltReason::Completed => {
                tracing::info!(%run_id, trace = ?state.execution_trace, "pipeline run completed");
            }
            HaltReason::Error => {
                tracing::error!(
                    %run_id,
                    error = state.error.as_deref().unwrap_or("unknown"),
                    trace = ?state.execution_trace,
                    "pipeline run halted on error"
                );
            }
            HaltReason::SkippedByNode => {
                tracing::info!(%run_id, trace = ?state.execution_trace, "pipeline run halted by node");
            }
        }

        RunSummary {
            run_id,
            reason,
            started_at,
            finished_at,
        }
    }

    /// Executes one node and folds its result into the state.
    async fn dispatch(&self, run_id: RunId, name: &str, state: &mut WorkflowState) {
        let step = state.current_step_index + 1;
        let total = state.steps.len();
        tracing::info!(%run_id, node = %name, step, total, "executing node");

        let Some(unit) = self.registry.node(name) else {
            // Resolution should have caught this; a registered plan naming
            // an unregistered node is a programming error, fatal for the run.
            self.record_failure(state, name, "node is not registered");
            return;
        };

        match unit.execute(state).await {
            Ok(NodeOutcome::Updated(update)) => {
                state.apply(update);
                state.execution_trace.push(name.to_string());
                state.current_step_index += 1;
                tracing::info!(%run_id, node = %name, "node completed");
            }
            Ok(NodeOutcome::Skipped { reason }) => {
                state.skipped_steps.push(format!("{name}: {reason}"));
                state.execution_trace.push(name.to_string());
                state.current_step_index += 1;
                tracing::info!(%run_id, node = %name, %reason, "node skipped");
            }
            Err(err) => {
                tracing::error!(%run_id, node = %name, error = %err, "node failed");
                self.record_failure(state, name, &err.to_string());
            }
        }
    }

    /// Error bookkeeping: descriptive message, marked trace entry, halt
    /// flag, and a cursor increment so the final state shows how far we got.
    fn record_failure(&self, state: &mut WorkflowState, name: &str, cause: &str) {
        state.error = Some(format!("error in {name}: {cause}"));
        state.execution_trace.push(format!("{name}[ERROR]"));
        state.skip_remaining = true;
        state.current_step_index += 1;
    }
}

/// The single transition function of the run state machine.
///
/// Evaluated before each dispatch: halts on a set error, on the halt flag,
/// or on an exhausted plan, and otherwise moves to the node at the cursor.
/// `Halted` is terminal; transitioning from it returns it unchanged.
fn next_status(status: &RunStatus, state: &WorkflowState) -> RunStatus {
    if let RunStatus::Halted(reason) = status {
        return RunStatus::Halted(*reason);
    }
    if state.error.is_some() {
        return RunStatus::Halted(HaltReason::Error);
    }
    if state.skip_remaining {
        return RunStatus::Halted(HaltReason::SkippedByNode);
    }
    match state.steps.get(state.current_step_index) {
        Some(name) => RunStatus::Running(name.clone()),
        None => RunStatus::Halted(HaltReason::Completed),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::NodeError;
    use crate::node::NodeUnit;
    use crate::state::StateUpdate;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct RecordingUnit {
        marker: &'static str,
        calls: AtomicUsize,
    }

    impl RecordingUnit {
        fn new(marker: &'static str) -> Arc<Self> {
            Arc::new(Self {
                marker,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl NodeUnit for RecordingUnit {
        async fn execute(&self, _state: &WorkflowState) -> Result<NodeOutcome, NodeError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(NodeOutcome::Updated(StateUpdate {
                final_status: Some(self.marker.to_string()),
                ..StateUpdate::default()
            }))
        }
    }

    struct FailingUnit;

    #[async_trait]
    impl NodeUnit for FailingUnit {
        async fn execute(&self, _state: &WorkflowState) -> Result<NodeOutcome, NodeError> {
            Err(NodeError::Failed {
                message: "downstream returned 503".to_string(),
            })
        }
    }

    struct SkippingUnit;

    #[async_trait]
    impl NodeUnit for SkippingUnit {
        async fn execute(&self, _state: &WorkflowState) -> Result<NodeOutcome, NodeError> {
            Ok(NodeOutcome::skipped("nothing to do"))
        }
    }

    struct HaltingUnit;

    #[async_trait]
    impl NodeUnit for HaltingUnit {
        async fn execute(&self, _state: &WorkflowState) -> Result<NodeOutcome, NodeError> {
            Ok(NodeOutcome::Updated(StateUpdate {
                skip_remaining: Some(true),
                ..StateUpdate::default()
            }))
        }
    }

    fn steps(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| (*s).to_string()).collect()
    }

    #[tokio::test]
    async fn all_nodes_succeed_full_trace_and_cursor() {
        let mut registry = NodeRegistry::new();
        registry.register_node("a", RecordingUnit::new("a")).expect("register");
        registry.register_node("b", RecordingUnit::new("b")).expect("register");
        registry.register_node("c", RecordingUnit::new("c")).expect("register");
        let runner = PipelineRunner::new(Arc::new(registry));

        let mut state = WorkflowState::with_steps(steps(&["a", "b", "c"]));
        let summary = runner.run(&mut state).await;

        assert_eq!(summary.reason, HaltReason::Completed);
        assert_eq!(state.execution_trace, steps(&["a", "b", "c"]));
        assert_eq!(state.current_step_index, 3);
        assert!(state.error.is_none());
        assert!(!state.skip_remaining);
    }

    #[tokio::test]
    async fn failure_at_position_k_halts_remaining_steps() {
        let after = RecordingUnit::new("c");
        let mut registry = NodeRegistry::new();
        registry.register_node("a", RecordingUnit::new("a")).expect("register");
        registry.register_node("b", Arc::new(FailingUnit)).expect("register");
        registry.register_node("c", after.clone() as Arc<dyn NodeUnit>).expect("register");
        let runner = PipelineRunner::new(Arc::new(registry));

        let mut state = WorkflowState::with_steps(steps(&["a", "b", "c"]));
        let summary = runner.run(&mut state).await;

        assert_eq!(summary.reason, HaltReason::Error);
        assert_eq!(state.execution_trace, steps(&["a", "b[ERROR]"]));
        assert_eq!(state.current_step_index, 2);
        let error = state.error.expect("error set");
        assert!(error.contains("b"));
        assert!(error.contains("503"));
        assert_eq!(after.calls.load(Ordering::SeqCst), 0);
        // The earlier node's output survives in the merged state.
        assert_eq!(state.final_status.as_deref(), Some("a"));
    }

    #[tokio::test]
    async fn skip_outcome_continues_the_pipeline() {
        let mut registry = NodeRegistry::new();
        registry.register_node("email", Arc::new(SkippingUnit)).expect("register");
        registry.register_node("notify", RecordingUnit::new("done")).expect("register");
        let runner = PipelineRunner::new(Arc::new(registry));

        let mut state = WorkflowState::with_steps(steps(&["email", "notify"]));
        let summary = runner.run(&mut state).await;

        assert_eq!(summary.reason, HaltReason::Completed);
        assert_eq!(state.execution_trace, steps(&["email", "notify"]));
        assert_eq!(state.skipped_steps, vec!["email: nothing to do".to_string()]);
        assert!(state.error.is_none());
    }

    #[tokio::test]
    async fn successful_nodes_record_no_skip_entry() {
        let mut registry = NodeRegistry::new();
        registry.register_node("a", RecordingUnit::new("a")).expect("register");
        let runner = PipelineRunner::new(Arc::new(registry));

        let mut state = WorkflowState::with_steps(steps(&["a"]));
        runner.run(&mut state).await;

        assert!(state.skipped_steps.is_empty());
    }

    #[tokio::test]
    async fn node_raised_halt_flag_stops_without_error() {
        let after = RecordingUnit::new("b");
        let mut registry = NodeRegistry::new();
        registry.register_node("halt", Arc::new(HaltingUnit)).expect("register");
        registry.register_node("b", after.clone() as Arc<dyn NodeUnit>).expect("register");
        let runner = PipelineRunner::new(Arc::new(registry));

        let mut state = WorkflowState::with_steps(steps(&["halt", "b"]));
        let summary = runner.run(&mut state).await;

        assert_eq!(summary.reason, HaltReason::SkippedByNode);
        assert_eq!(state.execution_trace, steps(&["halt"]));
        assert!(state.error.is_none());
        assert_eq!(after.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn missing_node_at_dispatch_is_fatal_for_the_run() {
        let registry = NodeRegistry::new();
        let runner = PipelineRunner::new(Arc::new(registry));

        let mut state = WorkflowState::with_steps(steps(&["ghost"]));
        let summary = runner.run(&mut state).await;

        assert_eq!(summary.reason, HaltReason::Error);
        assert_eq!(state.execution_trace, steps(&["ghost[ERROR]"]));
        assert!(state.error.expect("error set").contains("not registered"));
    }

    #[tokio::test]
    async fn repeated_node_names_execute_repeatedly() {
        let unit = RecordingUnit::new("again");
        let mut registry = NodeRegistry::new();
        registry.register_node("again", unit.clone() as Arc<dyn NodeUnit>).expect("register");
        let runner = PipelineRunner::new(Arc::new(registry));

        let mut state = WorkflowState::with_steps(steps(&["again", "again", "again"]));
        let summary = runner.run(&mut state).await;

        assert_eq!(summary.reason, HaltReason::Completed);
        assert_eq!(unit.calls.load(Ordering::SeqCst), 3);
        assert_eq!(state.execution_trace.len(), 3);
    }

    #[tokio::test]
    async fn empty_plan_completes_immediately() {
        let runner = PipelineRunner::new(Arc::new(NodeRegistry::new()));
        let mut state = WorkflowState::default();
        let summary = runner.run(&mut state).await;

        assert_eq!(summary.reason, HaltReason::Completed);
        assert!(state.execution_trace.is_empty());
    }

    #[test]
    fn halted_status_is_absorbing() {
        let state = WorkflowState::with_steps(steps(&["a"]));
        let halted = RunStatus::Halted(HaltReason::Error);
        assert_eq!(next_status(&halted, &state), halted);
    }

    #[test]
    fn transition_prefers_error_over_halt_flag() {
        let mut state = WorkflowState::with_steps(steps(&["a"]));
        state.error = Some("boom".to_string());
        state.skip_remaining = true;
        assert_eq!(
            next_status(&RunStatus::Pending, &state),
            RunStatus::Halted(HaltReason::Error)
        );
    }

    #[test]
    fn run_status_terminality() {
        assert!(!RunStatus::Pending.is_terminal());
        assert!(!RunStatus::Running("a".to_string()).is_terminal());
        assert!(RunStatus::Halted(HaltReason::Completed).is_terminal());
        assert!(RunStatus::Halted(HaltReason::Error).is_terminal());
    }
}
