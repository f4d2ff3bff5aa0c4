//! HTTP clients for the collaborator services callflow nodes talk to.
//!
//! Every outbound call goes through one [`ServiceClient`]: the internal
//! persistence API, the audio/analysis API, the file-download service, and
//! the email service. Calls carry the shared API key header and a
//! service-specific timeout budget; any response other than 200 is a
//! [`ServiceError`] for the calling node to handle — never for the engine.

pub mod client;
pub mod config;
pub mod error;

pub use client::{
    AnalysisOutput, ProcessingStage, Reconstruction, SaveOutcome, ServiceClient, UploadFile,
};
pub use config::ServiceConfig;
pub use error::ServiceError;
