//! # Observability
//!
//! - `logging`: log level parsing and tracing subscriber setup

pub mod logging;

pub use logging::{init_logging, LogLevel, UnknownLogLevel};
