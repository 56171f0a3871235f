//! # Runtime
//!
//! Orchestration of a single reconciliation run.
//!
//! - `initialization`: builds the reconciliation handle
//! - `error_policy`: known vs. fatal error classification
//! - `orchestrator`: the fixed phase sequence
//! - `exit`: exit codes and process termination

pub mod error_policy;
pub mod exit;
pub mod initialization;
pub mod orchestrator;

pub use error_policy::{is_known_error, is_known_error_message};
pub use exit::{terminate, ExitDisposition};
pub use initialization::build_context;
pub use orchestrator::{run, Phase};
