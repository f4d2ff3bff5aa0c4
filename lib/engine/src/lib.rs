//! Step-orchestration engine for the callflow platform.
//!
//! This crate provides the dynamic pipeline machinery used to process
//! recorded call-center conversations:
//!
//! - **Shared State**: one [`WorkflowState`] record threaded through every step
//! - **Node Registry**: named unit-of-work handles and workflow presets
//! - **Step Resolver**: caller workflow requests into validated ordered plans
//! - **Runner**: a sequential dispatcher with per-step tracing and
//!   fail-fast semantics
//!
//! Node bodies live in `callflow-nodes`; the engine only knows the
//! [`NodeUnit`] capability boundary.

pub mod error;
pub mod node;
pub mod registry;
pub mod resolver;
pub mod runner;
pub mod state;

pub use error::{NodeError, RegistryError, ResolveError};
pub use node::{NodeOutcome, NodeUnit};
pub use registry::{NodeRegistry, WorkflowPreset};
pub use resolver::{DEFAULT_WORKFLOW, WorkflowRequest, resolve_steps};
pub use runner::{HaltReason, PipelineRunner, RunStatus, RunSummary};
pub use state::{KnowledgeBaseFile, StateUpdate, WorkflowState};
