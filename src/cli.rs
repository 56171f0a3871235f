//! # Command-Line Interface
//!
//! Flags accepted by the `ip-reconciler` binary.
//!
//! ## Usage
//!
//! ```bash
//! # In-cluster, default 30s timeout
//! ip-reconciler
//!
//! # Explicit kubeconfig with verbose logging
//! ip-reconciler --kubeconfig /etc/cni/net.d/whereabouts.d/whereabouts.kubeconfig --log-level verbose
//! ```

use crate::config::ReconcilerConfig;
use crate::constants::{DEFAULT_LOG_LEVEL, DEFAULT_RECONCILER_TIMEOUT_SECS};
use crate::observability::LogLevel;
use anyhow::{Context, Result};
use clap::Parser;

/// Clean up orphaned IP allocations and overlapping IP reservations
#[derive(Debug, Parser)]
#[command(name = "ip-reconciler", version, about, long_about = None)]
pub struct Cli {
    /// The path to the Kubernetes configuration file (empty uses in-cluster credentials)
    #[arg(long, env = "IP_RECONCILER_KUBECONFIG", default_value = "")]
    pub kubeconfig: String,

    /// The logging level. Valid values are: "debug", "verbose", "error", and "panic"
    #[arg(long, env = "IP_RECONCILER_LOG_LEVEL", default_value = DEFAULT_LOG_LEVEL)]
    pub log_level: String,

    /// The value for a request timeout in seconds
    #[arg(
        long,
        env = "IP_RECONCILER_TIMEOUT",
        default_value_t = DEFAULT_RECONCILER_TIMEOUT_SECS,
        allow_negative_numbers = true
    )]
    pub timeout: i64,
}

impl Cli {
    /// Validate the flags into a [`ReconcilerConfig`]
    pub fn into_config(self) -> Result<ReconcilerConfig> {
        let log_level: LogLevel = self
            .log_level
            .parse()
            .context("Invalid --log-level")?;
        ReconcilerConfig::new(&self.kubeconfig, self.timeout, log_level)
            .context("Invalid --timeout")
    }
}
