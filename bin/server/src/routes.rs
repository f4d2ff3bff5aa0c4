//! HTTP handlers and response shaping.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use callflow_engine::{
    KnowledgeBaseFile, NodeRegistry, PipelineRunner, WorkflowRequest, WorkflowState, resolve_steps,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value as JsonValue};
use std::sync::Arc;

/// Shared handler state: the immutable registry and the runner driving it.
pub struct AppState {
    pub registry: Arc<NodeRegistry>,
    pub runner: PipelineRunner,
}

/// Builds the application router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/api/graph/run", post(run_workflow))
        .route("/api/workflows", get(list_workflows))
        .route("/api/workflows/{name}", get(workflow_detail))
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(state)
}

/// The caller's initial state for a run.
///
/// Field names mirror the public API contract; `conversationId` and the
/// bare `inbound`/`outbound` file names are the caller-facing spellings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InitialState {
    pub transcript: Option<String>,
    pub analysis_prompt: Option<String>,
    pub tenant_key: Option<String>,
    #[serde(alias = "conversationId")]
    pub conversation_id: Option<String>,
    pub co_code: Option<String>,
    pub orgn_code: Option<String>,
    pub user_id: Option<String>,
    pub caller_id: Option<String>,
    #[serde(default)]
    pub scope: Vec<String>,
    pub id_assistito: Option<String>,
    pub location: Option<String>,
    pub inbound: Option<String>,
    pub outbound: Option<String>,
    pub project_name: Option<String>,
    #[serde(default)]
    pub knowledge_base_files: Vec<KnowledgeBaseFile>,
    pub output_mapping: Option<JsonValue>,
}

/// Body of `POST /api/graph/run`.
#[derive(Debug, Deserialize)]
pub struct RunRequest {
    /// Preset name, single node name, explicit list, or absent for the
    /// default workflow.
    #[serde(default)]
    pub workflow: Option<WorkflowRequest>,
    #[serde(default)]
    pub state: InitialState,
}

#[derive(Debug, Serialize)]
struct AnalysisBlock {
    clusters: JsonValue,
    interaction: JsonValue,
    patterns: JsonValue,
}

#[derive(Debug, Serialize)]
struct ResponseState {
    conversation_id: Option<String>,
    transcript: String,
    persistence_result: Option<String>,
    email_result: Option<String>,
    tokens_used: u64,
    cost_usd: f64,
    analysis: Option<AnalysisBlock>,
    suggestions: JsonValue,
    final_status: String,
}

/// Body of a run response; always 200 once execution starts, with
/// `success` reporting whether any node failed.
#[derive(Debug, Serialize)]
struct RunResponse {
    success: bool,
    workflow_requested: Option<WorkflowRequest>,
    workflow_executed: Vec<String>,
    execution_trace: Vec<String>,
    skipped_steps: Vec<String>,
    state: ResponseState,
    error: Option<String>,
}

fn build_initial_state(steps: Vec<String>, input: InitialState) -> WorkflowState {
    WorkflowState {
        conversation_id: input.conversation_id,
        tenant_key: input.tenant_key,
        co_code: input.co_code,
        orgn_code: input.orgn_code,
        user_id: input.user_id,
        caller_id: input.caller_id,
        id_assistito: input.id_assistito,
        scope: input.scope,
        location: input.location,
        inbound_file: input.inbound,
        outbound_file: input.outbound,
        project_name: input.project_name,
        analysis_prompt: input.analysis_prompt,
        knowledge_base_files: input.knowledge_base_files,
        output_mapping: input.output_mapping,
        transcript: input.transcript,
        ..WorkflowState::with_steps(steps)
    }
}

/// True when the analysis phases carry data worth surfacing.
fn has_analysis(state: &WorkflowState) -> bool {
    state
        .cluster_analysis
        .as_ref()
        .is_some_and(|v| v.as_object().is_none_or(|m| !m.is_empty()) && !v.is_null())
}

fn shape_response(
    workflow_requested: Option<WorkflowRequest>,
    workflow_executed: Vec<String>,
    state: WorkflowState,
) -> RunResponse {
    let analysis = has_analysis(&state).then(|| AnalysisBlock {
        clusters: state.cluster_analysis.clone().unwrap_or_else(|| json!({})),
        interaction: state.interaction_analysis.clone().unwrap_or_else(|| json!({})),
        patterns: state.patterns_insights.clone().unwrap_or_else(|| json!({})),
    });

    RunResponse {
        success: state.error.is_none(),
        workflow_requested,
        workflow_executed,
        execution_trace: state.execution_trace.clone(),
        skipped_steps: state.skipped_steps.clone(),
        state: ResponseState {
            conversation_id: state.conversation_id.clone(),
            transcript: state.transcript.clone().unwrap_or_default(),
            persistence_result: state.persistence_result.clone(),
            email_result: state.email_result.clone(),
            tokens_used: state.tokens_used,
            cost_usd: state.cost_usd,
            analysis,
            suggestions: state.suggestions.clone().unwrap_or_else(|| json!({})),
            final_status: state
                .final_status
                .clone()
                .unwrap_or_else(|| "COMPLETED".to_string()),
        },
        error: state.error,
    }
}

async fn run_workflow(
    State(app): State<Arc<AppState>>,
    Json(request): Json<RunRequest>,
) -> Result<Json<RunResponse>, (StatusCode, Json<JsonValue>)> {
    let steps = resolve_steps(&app.registry, request.workflow.as_ref()).map_err(|e| {
        (
            StatusCode::BAD_REQUEST,
            Json(json!({ "detail": e.to_string() })),
        )
    })?;
    if steps.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(json!({ "detail": "no valid step in the requested workflow" })),
        ));
    }

    tracing::info!(workflow = ?request.workflow, steps = ?steps, "starting workflow");

    let mut state = build_initial_state(steps.clone(), request.state);
    let summary = app.runner.run(&mut state).await;
    tracing::info!(
        run_id = %summary.run_id,
        reason = ?summary.reason,
        duration_ms = summary.duration().num_milliseconds(),
        "workflow finished"
    );

    Ok(Json(shape_response(request.workflow, steps, state)))
}

async fn root(State(app): State<Arc<AppState>>) -> Json<JsonValue> {
    Json(json!({
        "message": "callflow dynamic workflow API",
        "version": env!("CARGO_PKG_VERSION"),
        "available_workflows": app.registry.workflows().map(|(n, _)| n).collect::<Vec<_>>(),
        "available_nodes": app.registry.node_names().collect::<Vec<_>>(),
    }))
}

async fn list_workflows(State(app): State<Arc<AppState>>) -> Json<JsonValue> {
    let workflows: serde_json::Map<String, JsonValue> = app
        .registry
        .workflows()
        .map(|(name, preset)| {
            (
                name.to_string(),
                json!({
                    "steps": preset.steps,
                    "description": preset.description,
                    "steps_count": preset.steps.len(),
                }),
            )
        })
        .collect();

    Json(json!({
        "workflows": workflows,
        "nodes": app.registry.node_names().collect::<Vec<_>>(),
        "usage_examples": {
            "full_workflow": {
                "description": "run the complete processing flow",
                "request": {
                    "workflow": "full",
                    "state": {"location": "...", "inbound": "...", "outbound": "..."}
                }
            },
            "email_only": {
                "description": "send only the email (needs an existing transcript)",
                "request": {
                    "workflow": "email_only",
                    "state": {"conversationId": "...", "scope": ["MAIL_PE"]}
                }
            },
            "custom_sequence": {
                "description": "run a custom node sequence",
                "request": {
                    "workflow": ["reconstruct", "notify", "email"],
                    "state": {"location": "...", "inbound": "...", "outbound": "..."}
                }
            },
            "single_node": {
                "description": "run a single node",
                "request": {
                    "workflow": "persist",
                    "state": {"conversationId": "...", "transcript": "..."}
                }
            }
        }
    }))
}

async fn workflow_detail(
    State(app): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<Json<JsonValue>, (StatusCode, Json<JsonValue>)> {
    let Some(preset) = app.registry.workflow(&name) else {
        return Err((
            StatusCode::NOT_FOUND,
            Json(json!({ "detail": format!("workflow '{name}' not found") })),
        ));
    };

    let steps_details: Vec<JsonValue> = preset
        .steps
        .iter()
        .enumerate()
        .map(|(i, step)| {
            json!({
                "order": i + 1,
                "node": step,
                "exists": app.registry.has_node(step),
            })
        })
        .collect();

    Ok(Json(json!({
        "name": name,
        "steps": preset.steps,
        "description": preset.description,
        "steps_details": steps_details,
    })))
}

async fn health(State(app): State<Arc<AppState>>) -> Json<JsonValue> {
    Json(json!({
        "status": "healthy",
        "config_loaded": true,
        "nodes_count": app.registry.node_count(),
        "workflows_count": app.registry.workflow_count(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use callflow_services::{ServiceClient, ServiceConfig};

    fn app_state() -> Arc<AppState> {
        let client =
            Arc::new(ServiceClient::new(ServiceConfig::local("test-key")).expect("client"));
        let registry = Arc::new(callflow_nodes::bootstrap::default_registry(client).expect("registry"));
        Arc::new(AppState {
            registry: Arc::clone(&registry),
            runner: PipelineRunner::new(registry),
        })
    }

    #[test]
    fn initial_state_accepts_caller_spellings() {
        let input: InitialState = serde_json::from_value(json!({
            "conversationId": "conv-1",
            "inbound": "in.mp3",
            "outbound": "out.mp3",
            "scope": ["MAIL_PE"],
        }))
        .expect("deserialize");
        let state = build_initial_state(vec!["reconstruct".to_string()], input);
        assert_eq!(state.conversation_id.as_deref(), Some("conv-1"));
        assert_eq!(state.inbound_file.as_deref(), Some("in.mp3"));
        assert_eq!(state.outbound_file.as_deref(), Some("out.mp3"));
        assert_eq!(state.steps, vec!["reconstruct".to_string()]);
        assert_eq!(state.current_step_index, 0);
    }

    #[test]
    fn success_flag_follows_error_presence() {
        let ok = shape_response(None, vec![], WorkflowState::default());
        assert!(ok.success);

        let failed_state = WorkflowState {
            error: Some("error in persist: boom".to_string()),
            ..WorkflowState::default()
        };
        let failed = shape_response(None, vec![], failed_state);
        assert!(!failed.success);
        assert_eq!(failed.error.as_deref(), Some("error in persist: boom"));
    }

    #[test]
    fn analysis_block_requires_cluster_data() {
        let without = shape_response(None, vec![], WorkflowState::default());
        assert!(without.state.analysis.is_none());

        let empty_clusters = WorkflowState {
            cluster_analysis: Some(json!({})),
            ..WorkflowState::default()
        };
        assert!(shape_response(None, vec![], empty_clusters).state.analysis.is_none());

        let with = WorkflowState {
            cluster_analysis: Some(json!({"clusters": ["billing"]})),
            interaction_analysis: Some(json!({"tone": "calm"})),
            ..WorkflowState::default()
        };
        let shaped = shape_response(None, vec![], with);
        let analysis = shaped.state.analysis.expect("analysis block");
        assert_eq!(analysis.clusters["clusters"][0], "billing");
        assert_eq!(analysis.interaction["tone"], "calm");
        assert_eq!(analysis.patterns, json!({}));
    }

    #[test]
    fn response_defaults_mirror_the_contract() {
        let shaped = shape_response(
            Some(WorkflowRequest::Named("quick".to_string())),
            vec!["reconstruct".to_string(), "persist".to_string()],
            WorkflowState::default(),
        );
        assert_eq!(shaped.state.transcript, "");
        assert_eq!(shaped.state.final_status, "COMPLETED");
        assert_eq!(shaped.state.suggestions, json!({}));
    }

    #[test]
    fn skipped_steps_surface_in_the_response() {
        let state = WorkflowState {
            execution_trace: vec!["persist".to_string(), "email".to_string()],
            skipped_steps: vec!["email: scope is empty".to_string()],
            ..WorkflowState::default()
        };
        let shaped = shape_response(None, vec![], state);
        assert!(shaped.success);
        assert_eq!(
            shaped.skipped_steps,
            vec!["email: scope is empty".to_string()]
        );
    }

    #[tokio::test]
    async fn workflow_detail_404_for_unknown_name() {
        let app = app_state();
        let result = workflow_detail(State(app), Path("does_not_exist".to_string())).await;
        let (status, _) = result.expect_err("should be a 404");
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn workflow_detail_lists_ordered_steps() {
        let app = app_state();
        let Json(body) = workflow_detail(State(app), Path("quick".to_string()))
            .await
            .expect("known workflow");
        assert_eq!(body["steps_details"][0]["order"], 1);
        assert_eq!(body["steps_details"][0]["node"], "reconstruct");
        assert_eq!(body["steps_details"][0]["exists"], true);
        assert_eq!(body["steps_details"][1]["node"], "persist");
    }
}
