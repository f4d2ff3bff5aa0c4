//! AI analysis of the transcript, with or without knowledge-base files.

use crate::upstream;
use async_trait::async_trait;
use callflow_engine::{NodeError, NodeOutcome, NodeUnit, StateUpdate, WorkflowState};
use callflow_services::{ProcessingStage, ServiceClient};
use std::sync::Arc;

/// Minimum prompt length; anything shorter is a caller mistake.
const MIN_PROMPT_CHARS: usize = 50;

/// Runs the AI analysis over the transcript.
///
/// The knowledge-base file list is mandatory; a file whose location or
/// name is the literal `"none"` downgrades the call to transcript-only
/// analysis. In knowledge-base mode every file is downloaded concurrently
/// before the multipart upload; one failed download fails the node.
pub struct AnalyzeNode {
    client: Arc<ServiceClient>,
}

impl AnalyzeNode {
    #[must_use]
    pub fn new(client: Arc<ServiceClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl NodeUnit for AnalyzeNode {
    async fn execute(&self, state: &WorkflowState) -> Result<NodeOutcome, NodeError> {
        let transcript = state.transcript.as_deref().ok_or_else(|| NodeError::InvalidInput {
            message: "no transcript to analyze".to_string(),
        })?;
        let prompt = state
            .analysis_prompt
            .as_deref()
            .ok_or_else(|| NodeError::InvalidInput {
                message: "analysis_prompt is missing".to_string(),
            })?;
        if prompt.trim().len() < MIN_PROMPT_CHARS {
            return Err(NodeError::InvalidInput {
                message: format!(
                    "analysis_prompt too short ({} characters)",
                    prompt.trim().len()
                ),
            });
        }
        if state.knowledge_base_files.is_empty() {
            return Err(NodeError::InvalidInput {
                message: "knowledge_base_files is missing".to_string(),
            });
        }
        let project_name = state.project_name.as_deref().ok_or_else(|| NodeError::InvalidInput {
            message: "project_name is missing".to_string(),
        })?;

        let use_knowledge_base = !state
            .knowledge_base_files
            .iter()
            .any(callflow_engine::KnowledgeBaseFile::is_placeholder);

        let output = if use_knowledge_base {
            tracing::info!(
                files = state.knowledge_base_files.len(),
                "analyzing with knowledge base"
            );
            let coordinates: Vec<(String, String)> = state
                .knowledge_base_files
                .iter()
                .map(|f| (f.location.clone(), f.file_name.clone()))
                .collect();
            let downloaded = self
                .client
                .download_knowledge_base(&coordinates)
                .await
                .map_err(|e| upstream(&e))?;
            self.client
                .analyze_with_knowledge_base(prompt, project_name, downloaded, transcript)
                .await
                .map_err(|e| upstream(&e))?
        } else {
            tracing::info!("knowledge-base placeholder found, analyzing transcript only");
            self.client
                .analyze_transcript_only(prompt, project_name, transcript)
                .await
                .map_err(|e| upstream(&e))?
        };

        tracing::info!(tokens = output.tokens_used, "analysis completed");

        if let Some(conversation_id) = state.conversation_id.as_deref() {
            if let Err(e) = self
                .client
                .mark_stage_completed(conversation_id, ProcessingStage::Analysis)
                .await
            {
                tracing::warn!(error = %e, "analysis stage marker failed");
            }
        }

        Ok(NodeOutcome::Updated(StateUpdate {
            full_analysis: Some(output.analysis),
            analysis_tokens_used: Some(output.tokens_used),
            analysis_status: Some("CORRETTO".to_string()),
            ..StateUpdate::default()
        }))
    }
}
