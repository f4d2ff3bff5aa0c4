//! Transcript persistence.

use crate::upstream;
use async_trait::async_trait;
use callflow_engine::{NodeError, NodeOutcome, NodeUnit, StateUpdate, WorkflowState};
use callflow_services::ServiceClient;
use std::sync::Arc;

/// Saves the transcript to the internal persistence API under the
/// transcription record type. Without a conversation id there is nothing
/// to attach the record to, so the node skips.
pub struct PersistNode {
    client: Arc<ServiceClient>,
}

impl PersistNode {
    #[must_use]
    pub fn new(client: Arc<ServiceClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl NodeUnit for PersistNode {
    async fn execute(&self, state: &WorkflowState) -> Result<NodeOutcome, NodeError> {
        let Some(conversation_id) = state.conversation_id.as_deref() else {
            tracing::warn!("no conversation id, skipping persistence");
            return Ok(NodeOutcome::skipped("no conversation id"));
        };
        let transcript = state.transcript.as_deref().ok_or_else(|| NodeError::InvalidInput {
            message: "no transcript to persist".to_string(),
        })?;

        let outcome = self
            .client
            .save_conversation(conversation_id, transcript, "TRASCRIZIONE")
            .await
            .map_err(|e| upstream(&e))?;

        tracing::info!(
            status = %outcome.status,
            id = outcome.id.as_deref().unwrap_or("none"),
            "transcript persisted"
        );
        Ok(NodeOutcome::Updated(StateUpdate {
            persistence_result: Some(format!(
                "{}:{}",
                outcome.status,
                outcome.id.as_deref().unwrap_or("none")
            )),
            ..StateUpdate::default()
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use callflow_services::ServiceConfig;

    fn node() -> PersistNode {
        let client = ServiceClient::new(ServiceConfig::local("test-key")).expect("client");
        PersistNode::new(Arc::new(client))
    }

    #[tokio::test]
    async fn skips_without_conversation_id() {
        let state = WorkflowState {
            transcript: Some("hello".to_string()),
            ..WorkflowState::default()
        };
        let outcome = node().execute(&state).await.expect("execute");
        assert!(matches!(outcome, NodeOutcome::Skipped { .. }));
    }

    #[tokio::test]
    async fn missing_transcript_is_invalid_input() {
        let state = WorkflowState {
            conversation_id: Some("conv-1".to_string()),
            ..WorkflowState::default()
        };
        let err = node().execute(&state).await.unwrap_err();
        assert!(matches!(err, NodeError::InvalidInput { .. }));
    }
}
