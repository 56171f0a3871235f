//! Common test utilities
//!
//! Provides a counting test-double engine so orchestration tests can assert
//! which phases ran, how often, and with what credentials.

#![allow(dead_code, reason = "each test binary uses a different subset")]

use async_trait::async_trait;
use ip_reconciler::engine::{HandleFactory, ReconcileError, ReconcileHandle};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// How a fake engine call should fail
#[derive(Debug, Clone)]
pub enum FakeFailure {
    /// Unstructured error with the given message
    Message(String),
    /// Structured per-operation deadline
    Deadline,
}

impl FakeFailure {
    pub fn message(msg: &str) -> Self {
        FakeFailure::Message(msg.to_string())
    }

    fn to_error(&self) -> ReconcileError {
        match self {
            FakeFailure::Message(msg) => ReconcileError::other(msg.clone()),
            FakeFailure::Deadline => ReconcileError::DeadlineExceeded {
                operation: "fake operation",
                timeout: Duration::from_secs(1),
            },
        }
    }
}

/// Records every call made into the fake engine
#[derive(Debug, Default)]
pub struct CallLog {
    pub new_handle: AtomicUsize,
    pub new_handle_with_kubeconfig: AtomicUsize,
    pub reconcile_ip_pools: AtomicUsize,
    pub reconcile_overlapping: AtomicUsize,
    pub kubeconfig_paths: Mutex<Vec<PathBuf>>,
    pub timeouts: Mutex<Vec<Duration>>,
}

impl CallLog {
    pub fn constructions(&self) -> usize {
        self.new_handle.load(Ordering::SeqCst) + self.new_handle_with_kubeconfig.load(Ordering::SeqCst)
    }

    pub fn pool_calls(&self) -> usize {
        self.reconcile_ip_pools.load(Ordering::SeqCst)
    }

    pub fn overlap_calls(&self) -> usize {
        self.reconcile_overlapping.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Default)]
struct Script {
    construction: Option<FakeFailure>,
    pools: Option<FakeFailure>,
    cleaned: Vec<String>,
    overlapping: Option<FakeFailure>,
}

#[derive(Debug, Clone, Default)]
pub struct FakeFactory {
    pub calls: Arc<CallLog>,
    script: Script,
}

impl FakeFactory {
    /// Every call succeeds and nothing is cleaned
    pub fn succeeding() -> Self {
        Self::default()
    }

    pub fn fail_construction(mut self, failure: FakeFailure) -> Self {
        self.script.construction = Some(failure);
        self
    }

    pub fn fail_pools(mut self, failure: FakeFailure) -> Self {
        self.script.pools = Some(failure);
        self
    }

    pub fn fail_overlapping(mut self, failure: FakeFailure) -> Self {
        self.script.overlapping = Some(failure);
        self
    }

    pub fn with_cleaned(mut self, ips: &[&str]) -> Self {
        self.script.cleaned = ips.iter().map(ToString::to_string).collect();
        self
    }

    fn handle(&self) -> Result<FakeHandle, ReconcileError> {
        match &self.script.construction {
            Some(failure) => Err(failure.to_error()),
            None => Ok(FakeHandle {
                calls: Arc::clone(&self.calls),
                script: self.script.clone(),
            }),
        }
    }
}

#[async_trait]
impl HandleFactory for FakeFactory {
    type Handle = FakeHandle;

    async fn new_handle(&self, timeout: Duration) -> Result<FakeHandle, ReconcileError> {
        self.calls.new_handle.fetch_add(1, Ordering::SeqCst);
        self.calls.timeouts.lock().unwrap().push(timeout);
        self.handle()
    }

    async fn new_handle_with_kubeconfig(
        &self,
        kubeconfig: &Path,
        timeout: Duration,
    ) -> Result<FakeHandle, ReconcileError> {
        self.calls
            .new_handle_with_kubeconfig
            .fetch_add(1, Ordering::SeqCst);
        self.calls
            .kubeconfig_paths
            .lock()
            .unwrap()
            .push(kubeconfig.to_path_buf());
        self.calls.timeouts.lock().unwrap().push(timeout);
        self.handle()
    }
}

#[derive(Debug)]
pub struct FakeHandle {
    calls: Arc<CallLog>,
    script: Script,
}

#[async_trait]
impl ReconcileHandle for FakeHandle {
    async fn reconcile_ip_pools(&self) -> Result<Vec<String>, ReconcileError> {
        self.calls.reconcile_ip_pools.fetch_add(1, Ordering::SeqCst);
        match &self.script.pools {
            Some(failure) => Err(failure.to_error()),
            None => Ok(self.script.cleaned.clone()),
        }
    }

    async fn reconcile_overlapping_ip_addresses(&self) -> Result<(), ReconcileError> {
        self.calls.reconcile_overlapping.fetch_add(1, Ordering::SeqCst);
        match &self.script.overlapping {
            Some(failure) => Err(failure.to_error()),
            None => Ok(()),
        }
    }
}
