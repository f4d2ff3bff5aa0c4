//! Audio reconstruction: two call legs in, one transcript out.

use crate::upstream;
use async_trait::async_trait;
use callflow_engine::{NodeError, NodeOutcome, NodeUnit, StateUpdate, WorkflowState};
use callflow_services::{ProcessingStage, ServiceClient};
use std::sync::Arc;

/// Reconstructs a conversation transcript from the stored audio legs.
///
/// Requires storage coordinates (`location`, `inbound_file`,
/// `outbound_file`) and a `project_name`; records the transcript and the
/// reconstruction's token/cost usage. When a conversation id is present,
/// the transcription stage marker is fired best-effort afterwards.
pub struct ReconstructNode {
    client: Arc<ServiceClient>,
}

impl ReconstructNode {
    #[must_use]
    pub fn new(client: Arc<ServiceClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl NodeUnit for ReconstructNode {
    async fn execute(&self, state: &WorkflowState) -> Result<NodeOutcome, NodeError> {
        let (Some(location), Some(inbound), Some(outbound)) = (
            state.location.as_deref(),
            state.inbound_file.as_deref(),
            state.outbound_file.as_deref(),
        ) else {
            return Err(NodeError::InvalidInput {
                message: "reconstruction needs location, inbound_file and outbound_file"
                    .to_string(),
            });
        };
        let project_name = state.project_name.as_deref().ok_or_else(|| NodeError::InvalidInput {
            message: "project_name is missing".to_string(),
        })?;

        tracing::info!(location = %location, project = %project_name, "reconstructing conversation");
        let reconstruction = self
            .client
            .reconstruct_from_storage(location, inbound, outbound, project_name)
            .await
            .map_err(|e| upstream(&e))?;

        if let Some(conversation_id) = state.conversation_id.as_deref() {
            if let Err(e) = self
                .client
                .mark_stage_completed(conversation_id, ProcessingStage::Transcription)
                .await
            {
                tracing::warn!(error = %e, "transcription stage marker failed");
            }
        }

        tracing::info!(
            tokens = reconstruction.usage.tokens,
            "reconstruction completed"
        );
        Ok(NodeOutcome::Updated(StateUpdate {
            transcript: Some(reconstruction.transcript),
            transcript_status: Some("CORRETTO".to_string()),
            tokens_used: Some(reconstruction.usage.tokens),
            cost_usd: Some(reconstruction.usage.cost_usd),
            ..StateUpdate::default()
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use callflow_services::ServiceConfig;

    fn node() -> ReconstructNode {
        let client = ServiceClient::new(ServiceConfig::local("test-key")).expect("client");
        ReconstructNode::new(Arc::new(client))
    }

    #[tokio::test]
    async fn missing_storage_coordinates_is_invalid_input() {
        let state = WorkflowState {
            location: Some("recordings/2024".to_string()),
            inbound_file: Some("in.mp3".to_string()),
            ..WorkflowState::default()
        };
        let err = node().execute(&state).await.unwrap_err();
        assert!(matches!(err, NodeError::InvalidInput { .. }));
    }

    #[tokio::test]
    async fn missing_project_name_is_invalid_input() {
        let state = WorkflowState {
            location: Some("recordings/2024".to_string()),
            inbound_file: Some("in.mp3".to_string()),
            outbound_file: Some("out.mp3".to_string()),
            ..WorkflowState::default()
        };
        let err = node().execute(&state).await.unwrap_err();
        assert!(matches!(err, NodeError::InvalidInput { message } if message.contains("project_name")));
    }
}
