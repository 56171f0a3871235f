//! # Process Exit
//!
//! Exit codes reported to the scheduler that runs the reconciler.
//!
//! The numeric values are a deployment contract: CronJob alerting and retry
//! policies may depend on them, so they must stay stable across releases.

use crate::runtime::Phase;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitDisposition {
    /// All phases completed, or a known transient error stopped the run
    Success = 0,
    /// The reconciliation handle could not be constructed
    CouldNotStartOrphanedIpMonitor = 1,
    /// Orphaned allocations could not be removed from the IP pools
    FailedToReconcileIpPools = 2,
    /// Orphaned cluster-wide IP reservations could not be removed
    FailedToReconcileClusterWideIps = 3,
}

impl ExitDisposition {
    /// Fatal exit code for a failure in `phase`
    #[must_use]
    pub fn fatal(phase: Phase) -> Self {
        match phase {
            Phase::Construction => ExitDisposition::CouldNotStartOrphanedIpMonitor,
            Phase::PoolCleanup => ExitDisposition::FailedToReconcileIpPools,
            Phase::OverlapReconciliation => ExitDisposition::FailedToReconcileClusterWideIps,
        }
    }

    #[must_use]
    pub fn code(self) -> i32 {
        self as i32
    }
}

/// Terminate the process with `disposition`'s exit code
///
/// No cleanup or rollback happens here; the engine leaves the cluster
/// consistent after every call it returns from.
pub fn terminate(disposition: ExitDisposition) -> ! {
    std::process::exit(disposition.code())
}
