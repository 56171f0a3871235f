//! # Constants
//!
//! Shared constants used throughout the reconciler.
//!
//! These values represent reasonable defaults and can be overridden via
//! command-line flags or environment variables where applicable.

/// Default request timeout (seconds) for every cluster operation
pub const DEFAULT_RECONCILER_TIMEOUT_SECS: i64 = 30;

/// Default log level name
pub const DEFAULT_LOG_LEVEL: &str = "error";

/// Default tracing filter target for this crate
pub const LOG_TARGET: &str = "ip_reconciler";

/// Pod annotation written by Multus with the attachment status of each network
pub const NETWORK_STATUS_ANNOTATION: &str = "k8s.v1.cni.cncf.io/network-status";

/// Pod phase during which network attachments may not be reported yet
pub const POD_PHASE_PENDING: &str = "Pending";

/// Error message fragments that mark an error as transient
pub const KNOWN_ERROR_TIMEOUT: &str = "timeout";
pub const KNOWN_ERROR_DEADLINE_EXCEEDED: &str = "context deadline exceeded";
