//! Extraction of the analysis phases into their own state fields.

use async_trait::async_trait;
use callflow_engine::{NodeError, NodeOutcome, NodeUnit, StateUpdate, WorkflowState};
use serde_json::{json, Value as JsonValue};

/// Splits `full_analysis` into its phases.
///
/// Pure local extraction; no collaborator calls. Absent phases come out as
/// empty objects so downstream consumers always see the same shape.
pub struct SuggestNode;

fn phase(analysis: &JsonValue, key: &str) -> JsonValue {
    analysis.get(key).cloned().unwrap_or_else(|| json!({}))
}

#[async_trait]
impl NodeUnit for SuggestNode {
    async fn execute(&self, state: &WorkflowState) -> Result<NodeOutcome, NodeError> {
        let analysis = match &state.full_analysis {
            Some(value) => value.clone(),
            None => {
                tracing::warn!("no analysis present, extracting empty phases");
                json!({})
            }
        };

        let suggestions = phase(&analysis, "fase4_suggerimenti_pedagogici");
        let action_plan = suggestions
            .get("strategie_operative")
            .cloned()
            .unwrap_or_else(|| json!([]));

        Ok(NodeOutcome::Updated(StateUpdate {
            cluster_analysis: Some(phase(&analysis, "fase1_analisi_cluster")),
            interaction_analysis: Some(phase(&analysis, "fase2_analisi_interazione")),
            patterns_insights: Some(phase(&analysis, "fase3_analisi_evento_critico")),
            suggestions: Some(suggestions),
            action_plan: Some(action_plan),
            ..StateUpdate::default()
        }))
    }
}
