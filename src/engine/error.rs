//! # Engine Errors
//!
//! Errors surfaced by the reconciliation engine, with a stable
//! machine-readable kind used by the error policy.

use std::error::Error as StdError;
use std::time::Duration;
use thiserror::Error;

/// Machine-readable classification of a [`ReconcileError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileErrorKind {
    /// A request timed out at the transport level
    Timeout,
    /// The per-operation deadline elapsed before the engine finished
    DeadlineExceeded,
    /// Credentials or client configuration could not be loaded
    Configuration,
    /// The Kubernetes API rejected or failed a request
    Api,
    /// An IP pool holds data that cannot be interpreted
    InvalidPool,
    /// Anything the engine cannot classify further
    Other,
}

impl ReconcileErrorKind {
    /// Get human-readable string representation
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ReconcileErrorKind::Timeout => "timeout",
            ReconcileErrorKind::DeadlineExceeded => "deadline-exceeded",
            ReconcileErrorKind::Configuration => "configuration",
            ReconcileErrorKind::Api => "api",
            ReconcileErrorKind::InvalidPool => "invalid-pool",
            ReconcileErrorKind::Other => "other",
        }
    }
}

#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("failed to read kubeconfig: {0}")]
    Kubeconfig(#[from] kube::config::KubeconfigError),

    #[error("failed to infer cluster configuration: {0}")]
    InferConfig(#[from] kube::config::InferConfigError),

    #[error("kubernetes API error: {0}")]
    Kube(#[source] kube::Error),

    #[error("context deadline exceeded while {operation} (after {}s)", .timeout.as_secs())]
    DeadlineExceeded {
        operation: &'static str,
        timeout: Duration,
    },

    #[error("request timeout: {0}")]
    Timeout(String),

    #[error("invalid IP pool {pool}: {reason}")]
    InvalidPool { pool: String, reason: String },

    #[error("{0}")]
    Other(String),
}

impl From<kube::Error> for ReconcileError {
    /// Client-side timeouts become [`ReconcileError::Timeout`]; everything
    /// else stays an API error.
    fn from(err: kube::Error) -> Self {
        if is_transport_timeout(&err) {
            ReconcileError::Timeout(err.to_string())
        } else {
            ReconcileError::Kube(err)
        }
    }
}

/// Whether any error in the source chain is a connect/read timeout
fn is_transport_timeout(err: &(dyn StdError + 'static)) -> bool {
    let mut current = Some(err);
    while let Some(e) = current {
        if let Some(io) = e.downcast_ref::<std::io::Error>() {
            if io.kind() == std::io::ErrorKind::TimedOut {
                return true;
            }
            // wrapped io errors do not report their payload through source()
            if let Some(inner) = io.get_ref() {
                if is_transport_timeout(inner) {
                    return true;
                }
            }
        }
        if e.is::<tokio::time::error::Elapsed>() {
            return true;
        }
        current = e.source();
    }
    false
}

impl ReconcileError {
    /// Convenience constructor for unstructured engine errors
    pub fn other(message: impl Into<String>) -> Self {
        ReconcileError::Other(message.into())
    }

    pub fn invalid_pool(pool: impl Into<String>, reason: impl Into<String>) -> Self {
        ReconcileError::InvalidPool {
            pool: pool.into(),
            reason: reason.into(),
        }
    }

    #[must_use]
    pub fn kind(&self) -> ReconcileErrorKind {
        match self {
            ReconcileError::Kubeconfig(_) | ReconcileError::InferConfig(_) => {
                ReconcileErrorKind::Configuration
            }
            ReconcileError::Kube(_) => ReconcileErrorKind::Api,
            ReconcileError::DeadlineExceeded { .. } => ReconcileErrorKind::DeadlineExceeded,
            ReconcileError::Timeout(_) => ReconcileErrorKind::Timeout,
            ReconcileError::InvalidPool { .. } => ReconcileErrorKind::InvalidPool,
            ReconcileError::Other(_) => ReconcileErrorKind::Other,
        }
    }
}
