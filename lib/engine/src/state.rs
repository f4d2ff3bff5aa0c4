//! Shared pipeline state.
//!
//! One [`WorkflowState`] is created per pipeline invocation and threaded
//! through every step. Nodes never mutate it directly; they return a
//! [`StateUpdate`] holding only the fields they changed, and the runner
//! merges that update between dispatches. Bookkeeping fields (`steps`,
//! `current_step_index`, `execution_trace`) are owned by the runner and are
//! not part of the update surface.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// A knowledge-base file coordinate: where it is stored and what it is called.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KnowledgeBaseFile {
    /// Folder within the file service.
    pub location: String,
    /// File name within the folder.
    pub file_name: String,
}

impl KnowledgeBaseFile {
    /// True if either coordinate is the literal placeholder `"none"`.
    ///
    /// Upstream callers use the placeholder to request transcript-only
    /// analysis while keeping the list field populated.
    #[must_use]
    pub fn is_placeholder(&self) -> bool {
        self.location == "none" || self.file_name == "none"
    }
}

/// The shared state of one pipeline run.
///
/// Fields group into caller-supplied identity and inputs, derived results
/// accumulated by nodes, runner-owned bookkeeping, and usage metrics.
/// Schema-less upstream payloads (the AI analysis phases) are carried as
/// opaque [`JsonValue`]s rather than typed fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkflowState {
    // Identity (opaque correlation strings from the caller).
    pub conversation_id: Option<String>,
    pub tenant_key: Option<String>,
    pub co_code: Option<String>,
    pub orgn_code: Option<String>,
    pub user_id: Option<String>,
    pub caller_id: Option<String>,
    pub id_assistito: Option<String>,

    // Inputs.
    /// Tags controlling optional steps; an empty scope means no email.
    #[serde(default)]
    pub scope: Vec<String>,
    pub location: Option<String>,
    pub inbound_file: Option<String>,
    pub outbound_file: Option<String>,
    pub project_name: Option<String>,
    pub analysis_prompt: Option<String>,
    #[serde(default)]
    pub knowledge_base_files: Vec<KnowledgeBaseFile>,
    pub output_mapping: Option<JsonValue>,

    // Derived results.
    pub transcript: Option<String>,
    pub transcript_status: Option<String>,
    pub persistence_result: Option<String>,
    pub full_analysis: Option<JsonValue>,
    pub cluster_analysis: Option<JsonValue>,
    pub interaction_analysis: Option<JsonValue>,
    pub patterns_insights: Option<JsonValue>,
    pub suggestions: Option<JsonValue>,
    pub action_plan: Option<JsonValue>,
    pub analysis_status: Option<String>,
    #[serde(default)]
    pub analysis_saved: bool,
    pub email_result: Option<String>,
    pub email_response: Option<String>,
    pub email_error: Option<String>,
    pub notification_result: Option<String>,
    pub final_status: Option<String>,

    // Bookkeeping (runner-owned).
    /// The resolved plan; immutable once execution starts.
    #[serde(default)]
    pub steps: Vec<String>,
    /// 0-based cursor into `steps`; increments exactly once per dispatch.
    #[serde(default)]
    pub current_step_index: usize,
    /// Names of nodes actually invoked, failing node suffixed `[ERROR]`.
    #[serde(default)]
    pub execution_trace: Vec<String>,
    /// Nodes that had nothing to do, as `"name: reason"` entries.
    #[serde(default)]
    pub skipped_steps: Vec<String>,
    /// Halt flag; once true no further node executes.
    #[serde(default)]
    pub skip_remaining: bool,
    /// Failure description naming the failing node and cause.
    pub error: Option<String>,

    // Metrics.
    #[serde(default)]
    pub tokens_used: u64,
    #[serde(default)]
    pub cost_usd: f64,
    #[serde(default)]
    pub analysis_tokens_used: u64,
}

impl WorkflowState {
    /// Creates a state for the given resolved plan, cursor at the start.
    #[must_use]
    pub fn with_steps(steps: Vec<String>) -> Self {
        Self {
            steps,
            ..Self::default()
        }
    }

    /// Merges a partial update into this state.
    ///
    /// Set fields overwrite; unset fields leave the current value untouched.
    pub fn apply(&mut self, update: StateUpdate) {
        macro_rules! merge {
            ($($field:ident),* $(,)?) => {
                $(if let Some(value) = update.$field {
                    self.$field = Some(value);
                })*
            };
        }
        merge!(
            transcript,
            transcript_status,
            persistence_result,
            full_analysis,
            cluster_analysis,
            interaction_analysis,
            patterns_insights,
            suggestions,
            action_plan,
            analysis_status,
            email_result,
            email_response,
            email_error,
            notification_result,
            final_status,
            error,
        );
        if let Some(saved) = update.analysis_saved {
            self.analysis_saved = saved;
        }
        if let Some(skip) = update.skip_remaining {
            self.skip_remaining = skip;
        }
        if let Some(tokens) = update.tokens_used {
            self.tokens_used = tokens;
        }
        if let Some(cost) = update.cost_usd {
            self.cost_usd = cost;
        }
        if let Some(tokens) = update.analysis_tokens_used {
            self.analysis_tokens_used = tokens;
        }
    }
}

/// A partial-state mapping returned by a node.
///
/// Every field is optional; only set fields are written back. Nodes may
/// request an early halt by setting `skip_remaining`, and may surface a
/// failure description via `error` (the runner also sets it when a node
/// returns an `Err`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StateUpdate {
    pub transcript: Option<String>,
    pub transcript_status: Option<String>,
    pub persistence_result: Option<String>,
    pub full_analysis: Option<JsonValue>,
    pub cluster_analysis: Option<JsonValue>,
    pub interaction_analysis: Option<JsonValue>,
    pub patterns_insights: Option<JsonValue>,
    pub suggestions: Option<JsonValue>,
    pub action_plan: Option<JsonValue>,
    pub analysis_status: Option<String>,
    pub analysis_saved: Option<bool>,
    pub email_result: Option<String>,
    pub email_response: Option<String>,
    pub email_error: Option<String>,
    pub notification_result: Option<String>,
    pub final_status: Option<String>,
    pub skip_remaining: Option<bool>,
    pub error: Option<String>,
    pub tokens_used: Option<u64>,
    pub cost_usd: Option<f64>,
    pub analysis_tokens_used: Option<u64>,
}

impl StateUpdate {
    /// An update that changes nothing.
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn apply_overwrites_set_fields_only() {
        let mut state = WorkflowState {
            transcript: Some("old transcript".to_string()),
            persistence_result: Some("SAVED:42".to_string()),
            ..WorkflowState::default()
        };

        state.apply(StateUpdate {
            transcript: Some("new transcript".to_string()),
            ..StateUpdate::default()
        });

        assert_eq!(state.transcript.as_deref(), Some("new transcript"));
        assert_eq!(state.persistence_result.as_deref(), Some("SAVED:42"));
    }

    #[test]
    fn apply_none_update_is_identity() {
        let mut state = WorkflowState {
            transcript: Some("kept".to_string()),
            tokens_used: 10,
            ..WorkflowState::default()
        };
        let before = state.clone();

        state.apply(StateUpdate::none());
        assert_eq!(state, before);
    }

    #[test]
    fn apply_does_not_touch_bookkeeping() {
        let mut state = WorkflowState::with_steps(vec!["a".to_string(), "b".to_string()]);
        state.current_step_index = 1;
        state.execution_trace.push("a".to_string());

        state.apply(StateUpdate {
            transcript: Some("t".to_string()),
            ..StateUpdate::default()
        });

        assert_eq!(state.steps.len(), 2);
        assert_eq!(state.current_step_index, 1);
        assert_eq!(state.execution_trace, vec!["a".to_string()]);
    }

    #[test]
    fn apply_sets_skip_and_error() {
        let mut state = WorkflowState::default();
        state.apply(StateUpdate {
            skip_remaining: Some(true),
            error: Some("boom".to_string()),
            ..StateUpdate::default()
        });

        assert!(state.skip_remaining);
        assert_eq!(state.error.as_deref(), Some("boom"));
    }

    #[test]
    fn knowledge_base_placeholder() {
        let real = KnowledgeBaseFile {
            location: "kb".to_string(),
            file_name: "manual.pdf".to_string(),
        };
        let placeholder = KnowledgeBaseFile {
            location: "none".to_string(),
            file_name: "manual.pdf".to_string(),
        };
        assert!(!real.is_placeholder());
        assert!(placeholder.is_placeholder());
    }

    #[test]
    fn state_serde_roundtrip() {
        let state = WorkflowState {
            conversation_id: Some("conv-1".to_string()),
            scope: vec!["MAIL_PE".to_string()],
            steps: vec!["reconstruct".to_string()],
            ..WorkflowState::default()
        };
        let json = serde_json::to_string(&state).expect("serialize");
        let parsed: WorkflowState = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(state, parsed);
    }
}
