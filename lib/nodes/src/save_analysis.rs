//! Persistence of the extracted analysis and suggestions.

use crate::upstream;
use async_trait::async_trait;
use callflow_engine::{NodeError, NodeOutcome, NodeUnit, StateUpdate, WorkflowState};
use callflow_services::ServiceClient;
use serde_json::{json, Value as JsonValue};
use std::sync::Arc;

/// Saves the analysis phases (and suggestions, when present) to the
/// internal persistence API.
///
/// The two record types are written concurrently. Skips when there is no
/// conversation id or no analysis data worth saving.
pub struct SaveAnalysisNode {
    client: Arc<ServiceClient>,
}

impl SaveAnalysisNode {
    #[must_use]
    pub fn new(client: Arc<ServiceClient>) -> Self {
        Self { client }
    }
}

fn is_empty_phase(value: Option<&JsonValue>) -> bool {
    match value {
        None => true,
        Some(JsonValue::Null) => true,
        Some(JsonValue::Object(map)) => map.is_empty(),
        Some(JsonValue::Array(items)) => items.is_empty(),
        Some(_) => false,
    }
}

#[async_trait]
impl NodeUnit for SaveAnalysisNode {
    async fn execute(&self, state: &WorkflowState) -> Result<NodeOutcome, NodeError> {
        let Some(conversation_id) = state.conversation_id.as_deref() else {
            tracing::warn!("no conversation id, skipping analysis save");
            return Ok(NodeOutcome::skipped("no conversation id"));
        };

        let clusters = state.cluster_analysis.as_ref();
        let interaction = state.interaction_analysis.as_ref();
        let patterns = state.patterns_insights.as_ref();
        if is_empty_phase(clusters) && is_empty_phase(interaction) && is_empty_phase(patterns) {
            tracing::warn!("no analysis data to save");
            return Ok(NodeOutcome::skipped("no analysis data"));
        }

        let analysis_payload = json!({
            "fase1_analisi_cluster": clusters.cloned().unwrap_or_else(|| json!({})),
            "fase2_analisi_interazione": interaction.cloned().unwrap_or_else(|| json!({})),
            "fase3_identificazione_pattern": patterns.cloned().unwrap_or_else(|| json!({})),
        });
        let analysis_json =
            serde_json::to_string_pretty(&analysis_payload).map_err(|e| NodeError::Failed {
                message: format!("failed to serialize analysis: {e}"),
            })?;

        let suggestions_json = match state.suggestions.as_ref() {
            Some(value) if !is_empty_phase(Some(value)) => Some(
                serde_json::to_string_pretty(value).map_err(|e| NodeError::Failed {
                    message: format!("failed to serialize suggestions: {e}"),
                })?,
            ),
            _ => None,
        };

        match suggestions_json {
            Some(suggestions) => {
                let (analysis_outcome, suggestions_outcome) = tokio::try_join!(
                    self.client
                        .save_conversation(conversation_id, &analysis_json, "ANALISI"),
                    self.client
                        .save_conversation(conversation_id, &suggestions, "SUGGERIMENTI"),
                )
                .map_err(|e| upstream(&e))?;
                tracing::info!(
                    analysis_status = %analysis_outcome.status,
                    suggestions_status = %suggestions_outcome.status,
                    "analysis and suggestions saved"
                );
            }
            None => {
                let outcome = self
                    .client
                    .save_conversation(conversation_id, &analysis_json, "ANALISI")
                    .await
                    .map_err(|e| upstream(&e))?;
                tracing::info!(status = %outcome.status, "analysis saved");
            }
        }

        Ok(NodeOutcome::Updated(StateUpdate {
            analysis_saved: Some(true),
            final_status: Some("COMPLETED".to_string()),
            ..StateUpdate::default()
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use callflow_services::ServiceConfig;

    fn node() -> SaveAnalysisNode {
        let client = ServiceClient::new(ServiceConfig::local("test-key")).expect("client");
        SaveAnalysisNode::new(Arc::new(client))
    }

    #[tokio::test]
    async fn skips_without_conversation_id() {
        let state = WorkflowState {
            cluster_analysis: Some(json!({"clusters": ["x"]})),
            ..WorkflowState::default()
        };
        let outcome = node().execute(&state).await.expect("execute");
        assert!(matches!(outcome, NodeOutcome::Skipped { .. }));
    }

    #[tokio::test]
    async fn skips_without_analysis_data() {
        let state = WorkflowState {
            conversation_id: Some("conv-1".to_string()),
            cluster_analysis: Some(json!({})),
            interaction_analysis: Some(json!({})),
            ..WorkflowState::default()
        };
        let outcome = node().execute(&state).await.expect("execute");
        assert!(
            matches!(outcome, NodeOutcome::Skipped { reason } if reason.contains("no analysis data"))
        );
    }

    #[test]
    fn empty_phase_detection() {
        assert!(is_empty_phase(None));
        assert!(is_empty_phase(Some(&json!({}))));
        assert!(is_empty_phase(Some(&json!([]))));
        assert!(is_empty_phase(Some(&JsonValue::Null)));
        assert!(!is_empty_phase(Some(&json!({"k": 1}))));
    }
}
