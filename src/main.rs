//! # IP Reconciler
//!
//! Cleans up IP addresses left behind by terminated pods in whereabouts IP
//! pools, then removes orphaned cluster-wide IP reservations. Meant to be run
//! periodically, e.g. from a Kubernetes CronJob.
//!
//! ## Exit codes
//!
//! - `0` - success, or a known transient error (timeouts)
//! - `1` - could not start (bad flags, unreadable credentials, API failure)
//! - `2` - failed to reconcile IP pools
//! - `3` - failed to reconcile cluster-wide IP reservations

use clap::Parser;
use ip_reconciler::cli::Cli;
use ip_reconciler::engine::KubeHandleFactory;
use ip_reconciler::observability::init_logging;
use ip_reconciler::runtime::{run, terminate, ExitDisposition};
use tracing::debug;

#[tokio::main]
async fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // --help and --version are not failures
            let disposition = if e.use_stderr() {
                ExitDisposition::CouldNotStartOrphanedIpMonitor
            } else {
                ExitDisposition::Success
            };
            if let Err(print_err) = e.print() {
                eprintln!("{print_err}");
            }
            terminate(disposition);
        }
    };

    let config = match cli.into_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e:#}");
            terminate(ExitDisposition::CouldNotStartOrphanedIpMonitor);
        }
    };

    init_logging(config.log_level);
    debug!(
        "Build info: timestamp={}, datetime={}, git_hash={}",
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_DATETIME"),
        env!("BUILD_GIT_HASH")
    );

    // Required for rustls 0.23+ when no default provider is set via features
    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        debug!("rustls crypto provider already installed");
    }

    terminate(run(&KubeHandleFactory, &config).await);
}
