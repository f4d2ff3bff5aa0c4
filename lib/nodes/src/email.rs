//! Email dispatch through the email service's graph endpoint.
//!
//! The email service runs its own tool graphs; both nodes here build a
//! single-node graph payload invoking the email plugin and post it. Email
//! failures are recorded in the state rather than failing the run, so a
//! fully processed conversation is never lost to a mail outage.

use async_trait::async_trait;
use callflow_engine::{NodeError, NodeOutcome, NodeUnit, StateUpdate, WorkflowState};
use callflow_services::{ServiceClient, ServiceError};
use serde_json::{json, Value as JsonValue};
use std::sync::Arc;

fn or_none(value: Option<&str>) -> &str {
    value.unwrap_or("none")
}

/// Serializes the caller's output mapping with its keys in the order the
/// email service expects, or an empty string when absent.
fn output_mapping_string(mapping: Option<&JsonValue>) -> String {
    let Some(mapping) = mapping else {
        return String::new();
    };
    if mapping.as_object().is_none_or(serde_json::Map::is_empty) {
        return String::new();
    }
    let ordered = json!({
        "report_type": mapping.get("report_type").cloned().unwrap_or(JsonValue::Null),
        "generator_class": mapping.get("generator_class").cloned().unwrap_or(JsonValue::Null),
        "output_mapping": mapping.get("output_mapping").cloned().unwrap_or(JsonValue::Null),
    });
    ordered.to_string()
}

/// Builds the full reconstruction-email graph payload.
fn reconstruction_payload(state: &WorkflowState) -> Result<JsonValue, NodeError> {
    let analysis_string = match state.full_analysis.as_ref() {
        Some(analysis) => serde_json::to_string(analysis).map_err(|e| NodeError::Failed {
            message: format!("failed to serialize analysis: {e}"),
        })?,
        None => String::new(),
    };

    Ok(json!({
        "request": {},
        "graph": {
            "edges": [],
            "nodes": [{
                "id": "email",
                "type": "tool",
                "plugin": "email",
                "function": "send_reconstruction_email",
                "outputKey": "emailResult",
                "parameters": {
                    "scope": "{{scope}}",
                    "co_code": "{{co_code}}",
                    "user_id": "{{user_id}}",
                    "caller_id": "{{caller_id}}",
                    "orgn_code": "{{orgn_code}}",
                    "conversationId": "{{conversationId}}",
                    "tenant_key": "{{tenant_key}}",
                    "id_assistito": "{{id_assistito}}",
                    "transcript": "{{transcript}}",
                    "structured_analysis": "{{structured_analysis}}",
                    "output_mapping": "{{output_mapping}}"
                }
            }],
            "startNodeId": "email"
        },
        "input": "",
        "state": {
            "scope": state.scope.clone(),
            "co_code": or_none(state.co_code.as_deref()),
            "user_id": or_none(state.user_id.as_deref()),
            "caller_id": or_none(state.caller_id.as_deref()),
            "orgn_code": or_none(state.orgn_code.as_deref()),
            "conversationId": or_none(state.conversation_id.as_deref()),
            "tenant_key": or_none(state.tenant_key.as_deref()),
            "id_assistito": or_none(state.id_assistito.as_deref()),
            "transcript": or_none(state.transcript.as_deref()),
            "structured_analysis": analysis_string,
            "output_mapping": output_mapping_string(state.output_mapping.as_ref()),
        }
    }))
}

/// Builds the simplified notification payload used for re-sends.
fn notification_payload(state: &WorkflowState) -> JsonValue {
    json!({
        "graph": {
            "edges": [],
            "nodes": [{
                "id": "email",
                "type": "tool",
                "plugin": "email",
                "function": "send_simple_notification",
                "outputKey": "emailResult",
                "parameters": {
                    "scope": "{{scope}}",
                    "conversationId": "{{conversationId}}",
                    "tenant_key": "{{tenant_key}}",
                    "transcript": "{{transcript}}"
                }
            }],
            "startNodeId": "email"
        },
        "input": "",
        "state": {
            "scope": state.scope.clone(),
            "conversationId": or_none(state.conversation_id.as_deref()),
            "tenant_key": or_none(state.tenant_key.as_deref()),
            "transcript": or_none(state.transcript.as_deref()),
        }
    })
}

/// The `email_result` marker recorded for a failed dispatch. Downstream
/// consumers branch on these strings, so the vocabulary is part of the
/// contract.
fn failure_marker(err: &ServiceError) -> String {
    match err {
        ServiceError::Status { status, .. } => format!("ERROR_{status}"),
        ServiceError::Timeout { .. } => "TIMEOUT".to_string(),
        ServiceError::Transport { .. } => "NETWORK_ERROR".to_string(),
        ServiceError::InvalidResponse { .. } => "ERROR".to_string(),
    }
}

/// Posts the payload and folds the result into an email update.
async fn dispatch(client: &ServiceClient, payload: &JsonValue) -> StateUpdate {
    match client.send_email_graph(payload).await {
        Ok(response) => {
            tracing::info!("email sent");
            StateUpdate {
                email_result: Some("SUCCESS".to_string()),
                email_response: Some(response),
                ..StateUpdate::default()
            }
        }
        Err(e) => {
            tracing::error!(error = %e, "email dispatch failed");
            StateUpdate {
                email_result: Some(failure_marker(&e)),
                email_error: Some(e.to_string()),
                ..StateUpdate::default()
            }
        }
    }
}

/// Sends the full reconstruction email: transcript, serialized analysis,
/// and the caller's output mapping. An empty `scope` means the caller did
/// not ask for email, so the node skips without touching the network.
pub struct EmailNode {
    client: Arc<ServiceClient>,
}

impl EmailNode {
    #[must_use]
    pub fn new(client: Arc<ServiceClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl NodeUnit for EmailNode {
    async fn execute(&self, state: &WorkflowState) -> Result<NodeOutcome, NodeError> {
        if state.scope.is_empty() {
            tracing::info!("email not requested, scope is empty");
            return Ok(NodeOutcome::skipped("scope is empty"));
        }
        let payload = reconstruction_payload(state)?;
        Ok(NodeOutcome::Updated(dispatch(&self.client, &payload).await))
    }
}

/// Sends the simplified notification email, with the same empty-scope
/// skip. Used by re-send flows on already-processed conversations.
pub struct QuickEmailNode {
    client: Arc<ServiceClient>,
}

impl QuickEmailNode {
    #[must_use]
    pub fn new(client: Arc<ServiceClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl NodeUnit for QuickEmailNode {
    async fn execute(&self, state: &WorkflowState) -> Result<NodeOutcome, NodeError> {
        if state.scope.is_empty() {
            tracing::info!("email not requested, scope is empty");
            return Ok(NodeOutcome::skipped("scope is empty"));
        }
        let payload = notification_payload(state);
        Ok(NodeOutcome::Updated(dispatch(&self.client, &payload).await))
    }
}
