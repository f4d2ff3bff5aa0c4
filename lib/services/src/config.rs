//! Configuration for outbound service calls.
//!
//! Base URLs default to local development ports; the API key has no
//! default and must be supplied. Timeout budgets are per call class: the
//! stage-completion marker is a fire-and-forget PUT with a tight budget,
//! while audio reconstruction, analysis, and email are long-running.

use serde::Deserialize;

/// Base URLs, credentials, and timeout budgets for collaborator services.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    /// Internal persistence API.
    #[serde(default = "default_internal_api_url")]
    pub internal_api_url: String,

    /// Audio reconstruction / AI analysis API.
    #[serde(default = "default_analysis_api_url")]
    pub analysis_api_url: String,

    /// File-download service.
    #[serde(default = "default_file_api_url")]
    pub file_api_url: String,

    /// Email service.
    #[serde(default = "default_email_api_url")]
    pub email_api_url: String,

    /// Shared API key sent as `X-Api-Key` on every call.
    pub api_key: String,

    /// Budget for ordinary JSON and download calls, in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Connect timeout, in seconds.
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// Budget for stage-completion markers, in seconds.
    #[serde(default = "default_marker_timeout_secs")]
    pub marker_timeout_secs: u64,

    /// Budget for reconstruction, analysis, and email calls, in seconds.
    #[serde(default = "default_long_call_timeout_secs")]
    pub long_call_timeout_secs: u64,
}

fn default_internal_api_url() -> String {
    "http://localhost:5010".to_string()
}

fn default_analysis_api_url() -> String {
    "http://localhost:5020".to_string()
}

fn default_file_api_url() -> String {
    "http://localhost:5019".to_string()
}

fn default_email_api_url() -> String {
    "http://localhost:5007".to_string()
}

fn default_request_timeout_secs() -> u64 {
    120
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_marker_timeout_secs() -> u64 {
    10
}

fn default_long_call_timeout_secs() -> u64 {
    180
}

impl ServiceConfig {
    /// A configuration pointing at local development ports.
    #[must_use]
    pub fn local(api_key: impl Into<String>) -> Self {
        Self {
            internal_api_url: default_internal_api_url(),
            analysis_api_url: default_analysis_api_url(),
            file_api_url: default_file_api_url(),
            email_api_url: default_email_api_url(),
            api_key: api_key.into(),
            request_timeout_secs: default_request_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
            marker_timeout_secs: default_marker_timeout_secs(),
            long_call_timeout_secs: default_long_call_timeout_secs(),
        }
    }
}
