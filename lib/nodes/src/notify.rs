//! Generic completion notification.

use async_trait::async_trait;
use callflow_engine::{NodeError, NodeOutcome, NodeUnit, StateUpdate, WorkflowState};

/// Emits a completion notification.
///
/// Log-only for now; a chat or webhook backend can slot in behind the
/// same node name without touching any preset.
pub struct NotifyNode;

#[async_trait]
impl NodeUnit for NotifyNode {
    async fn execute(&self, state: &WorkflowState) -> Result<NodeOutcome, NodeError> {
        tracing::info!(
            conversation = state.conversation_id.as_deref().unwrap_or("none"),
            "processing notification"
        );
        Ok(NodeOutcome::Updated(StateUpdate {
            notification_result: Some("SUCCESS".to_string()),
            ..StateUpdate::default()
        }))
    }
}
