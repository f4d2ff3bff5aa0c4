//! Error types for collaborator service calls.

use std::fmt;

/// A failed call to a collaborator service.
///
/// The `service` field names the collaborator (for error messages that
/// identify which backend misbehaved), not the URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    /// The service answered with a non-200 status.
    Status { service: &'static str, status: u16 },
    /// The call exceeded its timeout budget.
    Timeout { service: &'static str },
    /// The call never completed (connection refused, DNS, TLS, ...).
    Transport {
        service: &'static str,
        reason: String,
    },
    /// The service answered 200 but the body was not what we expected.
    InvalidResponse {
        service: &'static str,
        reason: String,
    },
}

impl ServiceError {
    /// Classifies a reqwest failure as timeout or transport.
    #[must_use]
    pub fn from_reqwest(service: &'static str, err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout { service }
        } else {
            Self::Transport {
                service,
                reason: err.to_string(),
            }
        }
    }

    /// The collaborator this error came from.
    #[must_use]
    pub fn service(&self) -> &'static str {
        match self {
            Self::Status { service, .. }
            | Self::Timeout { service }
            | Self::Transport { service, .. }
            | Self::InvalidResponse { service, .. } => service,
        }
    }
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Status { service, status } => {
                write!(f, "{service} returned status {status}")
            }
            Self::Timeout { service } => write!(f, "{service} timed out"),
            Self::Transport { service, reason } => {
                write!(f, "{service} transport error: {reason}")
            }
            Self::InvalidResponse { service, reason } => {
                write!(f, "{service} returned an invalid response: {reason}")
            }
        }
    }
}

impl std::error::Error for ServiceError {}
