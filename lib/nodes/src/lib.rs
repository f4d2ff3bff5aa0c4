//! Concrete units of work for conversation-processing pipelines.
//!
//! Each node is a struct holding a shared [`ServiceClient`] handle and
//! implementing [`NodeUnit`](callflow_engine::NodeUnit). Nodes whose
//! preconditions are unmet report a skip rather than an error; nodes whose
//! collaborator calls fail surface an upstream failure for the runner to
//! fold into the run state. [`bootstrap::default_registry`] assembles the
//! full node and preset catalog.

pub mod analyze;
pub mod bootstrap;
pub mod email;
pub mod notify;
pub mod persist;
pub mod reconstruct;
pub mod save_analysis;
pub mod suggest;
pub mod transcript;

pub use analyze::AnalyzeNode;
pub use email::{EmailNode, QuickEmailNode};
pub use notify::NotifyNode;
pub use persist::PersistNode;
pub use reconstruct::ReconstructNode;
pub use save_analysis::SaveAnalysisNode;
pub use suggest::SuggestNode;
pub use transcript::LoadTranscriptNode;

use callflow_engine::NodeError;
use callflow_services::ServiceError;

/// Folds a collaborator failure into a node-level upstream error.
pub(crate) fn upstream(err: &ServiceError) -> NodeError {
    let message = match err {
        ServiceError::Status { status, .. } => format!("status {status}"),
        ServiceError::Timeout { .. } => "timed out".to_string(),
        ServiceError::Transport { reason, .. } => reason.clone(),
        ServiceError::InvalidResponse { reason, .. } => {
            format!("invalid response: {reason}")
        }
    };
    NodeError::Upstream {
        service: err.service().to_string(),
        message,
    }
}
