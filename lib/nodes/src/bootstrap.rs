//! Assembly of the default node and preset catalog.

use crate::{
    AnalyzeNode, EmailNode, LoadTranscriptNode, NotifyNode, PersistNode, QuickEmailNode,
    ReconstructNode, SaveAnalysisNode, SuggestNode,
};
use callflow_core::Result;
use callflow_engine::{NodeRegistry, RegistryError};
use callflow_services::ServiceClient;
use std::sync::Arc;

fn steps(names: &[&str]) -> Vec<String> {
    names.iter().map(ToString::to_string).collect()
}

/// Builds the registry with every node and workflow preset.
///
/// Called once at startup; the result is shared behind an `Arc` and never
/// mutated afterwards.
///
/// # Errors
///
/// Only if a registration name is empty, which the fixed catalog below
/// never produces.
pub fn default_registry(client: Arc<ServiceClient>) -> Result<NodeRegistry, RegistryError> {
    let mut registry = NodeRegistry::new();

    registry.register_node("reconstruct", Arc::new(ReconstructNode::new(Arc::clone(&client))))?;
    registry.register_node("persist", Arc::new(PersistNode::new(Arc::clone(&client))))?;
    registry.register_node("analyze", Arc::new(AnalyzeNode::new(Arc::clone(&client))))?;
    registry.register_node("suggest", Arc::new(SuggestNode))?;
    registry.register_node(
        "save_analysis",
        Arc::new(SaveAnalysisNode::new(Arc::clone(&client))),
    )?;
    registry.register_node("email", Arc::new(EmailNode::new(Arc::clone(&client))))?;
    registry.register_node(
        "load_transcript",
        Arc::new(LoadTranscriptNode::new(Arc::clone(&client))),
    )?;
    registry.register_node("quick_email", Arc::new(QuickEmailNode::new(client)))?;
    registry.register_node("notify", Arc::new(NotifyNode))?;

    registry.register_workflow(
        "full",
        steps(&["reconstruct", "persist", "analyze", "suggest", "save_analysis", "email"]),
        "complete processing: transcription, persistence, analysis, email",
    )?;
    registry.register_workflow(
        "quick",
        steps(&["reconstruct", "persist"]),
        "transcription and persistence only",
    )?;
    registry.register_workflow(
        "transcribe_only",
        steps(&["reconstruct"]),
        "transcription, nothing stored",
    )?;
    registry.register_workflow(
        "analysis_only",
        steps(&["analyze", "suggest", "save_analysis"]),
        "analysis of an existing transcript",
    )?;
    registry.register_workflow(
        "analysis_with_email",
        steps(&["analyze", "suggest", "save_analysis", "email"]),
        "analysis of an existing transcript plus the report email",
    )?;
    registry.register_workflow("email_only", steps(&["email"]), "report email only")?;
    registry.register_workflow(
        "resend_email",
        steps(&["load_transcript", "quick_email"]),
        "re-send the notification for a processed conversation",
    )?;
    registry.register_workflow(
        "no_email",
        steps(&["reconstruct", "persist", "analyze", "suggest", "save_analysis"]),
        "complete processing without the email",
    )?;
    registry.register_workflow(
        "with_notification",
        steps(&["reconstruct", "persist", "notify"]),
        "transcription and persistence with a completion notification",
    )?;
    registry.register_workflow(
        "persist_and_email",
        steps(&["persist", "email"]),
        "persist an in-state transcript and email it",
    )?;
    registry.register_workflow(
        "analyze_and_notify",
        steps(&["analyze", "notify"]),
        "analysis with a completion notification",
    )?;
    registry.register_workflow(
        "save_and_email",
        steps(&["persist", "email"]),
        "save the transcript and send the email",
    )?;
    registry.register_workflow(
        "transcribe_and_email",
        steps(&["reconstruct", "email"]),
        "transcription straight to email",
    )?;
    registry.register_workflow(
        "transcribe_save_email",
        steps(&["reconstruct", "persist", "email"]),
        "transcription, persistence, and email",
    )?;

    tracing::info!(
        nodes = registry.node_count(),
        workflows = registry.workflow_count(),
        "registry initialized"
    );
    Ok(registry)
}
