//! Workflow-request resolution.
//!
//! Turns whatever the caller sent — nothing, a preset name, a single node
//! name, or an explicit list — into a validated ordered plan. Unknown
//! names degrade gracefully: a single unknown name falls back to the
//! default preset, and unknown entries in a custom list are dropped with a
//! warning instead of failing the whole request.

use crate::error::ResolveError;
use crate::registry::NodeRegistry;
use serde::{Deserialize, Serialize};

/// Name of the preset used whenever the caller leaves the choice open.
pub const DEFAULT_WORKFLOW: &str = "full";

/// A caller-supplied workflow choice.
///
/// Deserializes untagged from either a string or a list of strings; an
/// absent field is represented as `Option::<WorkflowRequest>::None` at the
/// request boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WorkflowRequest {
    /// A preset name, or the name of a single node.
    Named(String),
    /// An explicit ordered list of node names.
    Custom(Vec<String>),
}

/// Resolves a workflow request into an ordered list of node names.
///
/// Resolution priority:
/// 1. Absent request: the steps of the default preset.
/// 2. A name matching a preset: that preset's steps. A name matching only
///    a node: a singleton plan. Anything else: fall back to the default.
/// 3. An explicit list: filtered to registered nodes, caller order
///    preserved; an entirely-invalid list falls back to the default.
///
/// # Errors
///
/// Returns [`ResolveError::NoDefaultWorkflow`] when a fallback is needed
/// but the default preset is not registered.
pub fn resolve_steps(
    registry: &NodeRegistry,
    request: Option<&WorkflowRequest>,
) -> Result<Vec<String>, ResolveError> {
    match request {
        None => default_steps(registry),
        Some(WorkflowRequest::Named(name)) => {
            if let Some(steps) = registry.workflow_steps(name) {
                return Ok(steps.to_vec());
            }
            if registry.has_node(name) {
                return Ok(vec![name.clone()]);
            }
            tracing::warn!(
                requested = %name,
                fallback = DEFAULT_WORKFLOW,
                "unknown workflow or node name, using default workflow"
            );
            default_steps(registry)
        }
        Some(WorkflowRequest::Custom(names)) => {
            let mut steps = Vec::with_capacity(names.len());
            for name in names {
                if registry.has_node(name) {
                    steps.push(name.clone());
                } else {
                    tracing::warn!(node = %name, "unknown node in custom plan, dropping it");
                }
            }
            if steps.is_empty() {
                tracing::warn!(
                    fallback = DEFAULT_WORKFLOW,
                    "custom plan contained no valid nodes, using default workflow"
                );
                return default_steps(registry);
            }
            Ok(steps)
        }
    }
}

fn default_steps(registry: &NodeRegistry) -> Result<Vec<String>, ResolveError> {
    registry
        .workflow_steps(DEFAULT_WORKFLOW)
        .map(<[String]>::to_vec)
        .ok_or(ResolveError::NoDefaultWorkflow {
            default_name: DEFAULT_WORKFLOW.to_string(),
        })
}
