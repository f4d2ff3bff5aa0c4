//! Loading an existing transcript for flows that start mid-pipeline.

use crate::upstream;
use async_trait::async_trait;
use callflow_engine::{NodeError, NodeOutcome, NodeUnit, StateUpdate, WorkflowState};
use callflow_services::ServiceClient;
use std::sync::Arc;

/// Fetches the stored transcript of an already-processed conversation.
///
/// A transcript already in the state wins; the node then changes nothing.
pub struct LoadTranscriptNode {
    client: Arc<ServiceClient>,
}

impl LoadTranscriptNode {
    #[must_use]
    pub fn new(client: Arc<ServiceClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl NodeUnit for LoadTranscriptNode {
    async fn execute(&self, state: &WorkflowState) -> Result<NodeOutcome, NodeError> {
        if state.transcript.is_some() {
            tracing::info!("transcript already present");
            return Ok(NodeOutcome::Updated(StateUpdate::none()));
        }
        let conversation_id = state
            .conversation_id
            .as_deref()
            .ok_or_else(|| NodeError::InvalidInput {
                message: "conversation_id is required to load a transcript".to_string(),
            })?;

        let transcript = self
            .client
            .fetch_transcript(conversation_id)
            .await
            .map_err(|e| upstream(&e))?;
        tracing::info!(characters = transcript.len(), "transcript loaded");

        Ok(NodeOutcome::Updated(StateUpdate {
            transcript: Some(transcript),
            ..StateUpdate::default()
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use callflow_services::ServiceConfig;

    fn node() -> LoadTranscriptNode {
        let client = ServiceClient::new(ServiceConfig::local("test-key")).expect("client");
        LoadTranscriptNode::new(Arc::new(client))
    }

    #[tokio::test]
    async fn existing_transcript_is_left_alone() {
        let state = WorkflowState {
            transcript: Some("already here".to_string()),
            ..WorkflowState::default()
        };
        let outcome = node().execute(&state).await.expect("execute");
        assert_eq!(outcome, NodeOutcome::Updated(StateUpdate::none()));
    }

    #[tokio::test]
    async fn missing_conversation_id_is_invalid_input() {
        let state = WorkflowState::default();
        let err = node().execute(&state).await.unwrap_err();
        assert!(matches!(err, NodeError::InvalidInput { .. }));
    }
}
