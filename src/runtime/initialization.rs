//! # Initialization
//!
//! Builds the single reconciliation handle for a run. This is the only place
//! that looks at where credentials come from; the phases afterwards only see
//! the handle.

use crate::config::{CredentialsSource, ReconcilerConfig};
use crate::engine::{HandleFactory, ReconcileError};
use tracing::debug;

/// Construct the reconciliation handle for `config`
///
/// Engine errors are returned unchanged so the error policy sees them as the
/// engine produced them.
pub async fn build_context<F: HandleFactory>(
    factory: &F,
    config: &ReconcilerConfig,
) -> Result<F::Handle, ReconcileError> {
    match &config.credentials {
        CredentialsSource::Ambient => {
            debug!(
                "creating reconcile looper with ambient credentials (timeout {}s)",
                config.timeout.as_secs()
            );
            factory.new_handle(config.timeout).await
        }
        CredentialsSource::KubeconfigFile(path) => {
            debug!(
                "creating reconcile looper from kubeconfig {} (timeout {}s)",
                path.display(),
                config.timeout.as_secs()
            );
            factory
                .new_handle_with_kubeconfig(path, config.timeout)
                .await
        }
    }
}
