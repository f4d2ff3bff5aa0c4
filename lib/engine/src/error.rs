//! Error types for the engine crate.
//!
//! Errors are designed for layered context using rootcause:
//! - `RegistryError`: registration-time failures
//! - `ResolveError`: workflow-request resolution failures
//! - `NodeError`: failures signalled by a unit of work
//!
//! The runner itself has no error type; every failure is folded into the
//! final state so the caller always receives a structured result.

use std::fmt;

/// Errors from registry operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// A node was registered under an empty name.
    EmptyNodeName,
    /// A workflow preset was registered under an empty name.
    EmptyWorkflowName,
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyNodeName => write!(f, "node name must not be empty"),
            Self::EmptyWorkflowName => write!(f, "workflow name must not be empty"),
        }
    }
}

impl std::error::Error for RegistryError {}

/// Errors from workflow-request resolution.
///
/// Unknown names degrade gracefully (dropped with a warning, or falling
/// back to the default preset); resolution only fails outright when there
/// is nothing left to fall back to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    /// The default preset is not registered, so no fallback exists.
    NoDefaultWorkflow { default_name: String },
}

impl fmt::Display for ResolveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoDefaultWorkflow { default_name } => {
                write!(f, "default workflow '{default_name}' is not registered")
            }
        }
    }
}

impl std::error::Error for ResolveError {}

/// Failures signalled by a unit of work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeError {
    /// The state does not carry the inputs this node requires.
    InvalidInput { message: String },
    /// A collaborator service call failed (non-200, timeout, transport).
    Upstream { service: String, message: String },
    /// Any other failure within the node body.
    Failed { message: String },
}

impl fmt::Display for NodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidInput { message } => write!(f, "invalid input: {message}"),
            Self::Upstream { service, message } => {
                write!(f, "{service} call failed: {message}")
            }
            Self::Failed { message } => write!(f, "{message}"),
        }
    }
}

impl std::error::Error for NodeError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_error_display() {
        assert_eq!(
            RegistryError::EmptyNodeName.to_string(),
            "node name must not be empty"
        );
    }

    #[test]
    fn resolve_error_display() {
        let err = ResolveError::NoDefaultWorkflow {
            default_name: "full".to_string(),
        };
        assert!(err.to_string().contains("'full'"));
    }

    #[test]
    fn node_error_display() {
        let err = NodeError::Upstream {
            service: "email service".to_string(),
            message: "status 503".to_string(),
        };
        assert_eq!(err.to_string(), "email service call failed: status 503");
    }
}
