//! # Error Policy
//!
//! Decides whether an engine error is a known, transient condition.
//!
//! Known errors end the run with exit code 0: the job is re-run on a schedule,
//! and the next run starts from scratch. Everything else is a real incident.

use crate::constants::{KNOWN_ERROR_DEADLINE_EXCEEDED, KNOWN_ERROR_TIMEOUT};
use crate::engine::{ReconcileError, ReconcileErrorKind};
use tracing::info;

/// Classify an engine error
///
/// The structured kind is checked first. Errors the engine could not
/// structure fall back to a case-sensitive substring match on the message,
/// so a message that merely contains "timeout" in an unrelated word still
/// counts as known.
pub fn is_known_error(error: &ReconcileError) -> bool {
    match error.kind() {
        ReconcileErrorKind::Timeout => {
            info!("Timeout error [known error] ignored: {}", error);
            true
        }
        ReconcileErrorKind::DeadlineExceeded => {
            info!("context deadline exceeded [known error] ignored: {}", error);
            true
        }
        _ => is_known_error_message(&error.to_string()),
    }
}

/// Textual classification of an error message
pub fn is_known_error_message(message: &str) -> bool {
    if message.contains(KNOWN_ERROR_TIMEOUT) {
        info!("Timeout error [known error] ignored: {}", message);
        return true;
    }

    if message.contains(KNOWN_ERROR_DEADLINE_EXCEEDED) {
        info!("context deadline exceeded [known error] ignored: {}", message);
        return true;
    }

    false
}
