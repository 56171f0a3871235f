//! # Reconciliation Engine
//!
//! Contract between the phase orchestrator and whatever performs the actual
//! pool scanning and overlap cleanup.
//!
//! - `error`: engine error type and its machine-readable kind
//! - `allocation`: pure allocation bookkeeping (offsets, liveness, orphans)
//! - `kube_engine`: engine backed by the Kubernetes API and whereabouts CRDs

pub mod allocation;
pub mod error;
pub mod kube_engine;

pub use error::{ReconcileError, ReconcileErrorKind};
pub use kube_engine::{KubeHandleFactory, ReconcileLooper};

use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;

/// Creates reconciliation handles
///
/// The two constructors differ only in where cluster credentials come from.
/// The timeout bounds every operation later performed through the handle.
#[async_trait]
pub trait HandleFactory: Send + Sync {
    type Handle: ReconcileHandle;

    /// Build a handle from ambient credentials (in-cluster service account,
    /// `KUBECONFIG`, or the default kubeconfig location)
    async fn new_handle(&self, timeout: Duration) -> Result<Self::Handle, ReconcileError>;

    /// Build a handle from an explicit kubeconfig file
    async fn new_handle_with_kubeconfig(
        &self,
        kubeconfig: &Path,
        timeout: Duration,
    ) -> Result<Self::Handle, ReconcileError>;
}

/// A live, timeout-bounded reconciliation session
#[async_trait]
pub trait ReconcileHandle: Send + Sync {
    /// Remove allocations whose pods are gone
    ///
    /// Returns the cleaned IP addresses, possibly empty.
    async fn reconcile_ip_pools(&self) -> Result<Vec<String>, ReconcileError>;

    /// Delete cluster-wide IP reservations whose pods are gone
    async fn reconcile_overlapping_ip_addresses(&self) -> Result<(), ReconcileError>;
}
