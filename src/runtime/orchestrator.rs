//! # Phase Orchestrator
//!
//! Runs one reconciliation pass:
//!
//! 1. Build the reconciliation handle
//! 2. Remove orphaned allocations from the IP pools
//! 3. Remove orphaned cluster-wide IP reservations
//!
//! Each phase runs at most once. Its error is classified right after the call
//! returns: a known error ends the run successfully (later phases are skipped
//! and left to the next scheduled run), any other error ends it with that
//! phase's exit code.

use crate::config::ReconcilerConfig;
use crate::engine::{HandleFactory, ReconcileError, ReconcileHandle};
use crate::runtime::error_policy::is_known_error;
use crate::runtime::exit::ExitDisposition;
use crate::runtime::initialization::build_context;
use tracing::{debug, error, info_span, Instrument};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Construction,
    PoolCleanup,
    OverlapReconciliation,
}

impl Phase {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Construction => "construction",
            Phase::PoolCleanup => "pool-cleanup",
            Phase::OverlapReconciliation => "overlap-reconciliation",
        }
    }

    fn failure_message(self) -> &'static str {
        match self {
            Phase::Construction => "failed to create the reconcile looper",
            Phase::PoolCleanup => "failed to clean up IP for allocations",
            Phase::OverlapReconciliation => "failed to reconcile clusterwide IPs",
        }
    }
}

/// Decide the exit disposition for a failed phase
fn dispose(phase: Phase, err: &ReconcileError) -> ExitDisposition {
    if is_known_error(err) {
        return ExitDisposition::Success;
    }
    error!(
        phase = phase.as_str(),
        kind = err.kind().as_str(),
        "{}: {}",
        phase.failure_message(),
        err
    );
    ExitDisposition::fatal(phase)
}

/// Run all phases and return how the process should exit
///
/// Never terminates the process itself; see [`crate::runtime::exit::terminate`].
pub async fn run<F: HandleFactory>(factory: &F, config: &ReconcilerConfig) -> ExitDisposition {
    let handle = match build_context(factory, config)
        .instrument(info_span!("reconciler.phase", phase = Phase::Construction.as_str()))
        .await
    {
        Ok(handle) => handle,
        Err(e) => return dispose(Phase::Construction, &e),
    };

    match handle
        .reconcile_ip_pools()
        .instrument(info_span!("reconciler.phase", phase = Phase::PoolCleanup.as_str()))
        .await
    {
        Ok(cleaned) if cleaned.is_empty() => debug!("no IP addresses to cleanup"),
        Ok(cleaned) => debug!("successfully cleanup IPs: {:?}", cleaned),
        Err(e) => return dispose(Phase::PoolCleanup, &e),
    }

    if let Err(e) = handle
        .reconcile_overlapping_ip_addresses()
        .instrument(info_span!(
            "reconciler.phase",
            phase = Phase::OverlapReconciliation.as_str()
        ))
        .await
    {
        return dispose(Phase::OverlapReconciliation, &e);
    }

    ExitDisposition::Success
}
