//! # Reconciler Configuration
//!
//! Validated, typed form of the command-line input. Built once at startup and
//! never modified afterwards.

use crate::constants::DEFAULT_RECONCILER_TIMEOUT_SECS;
use crate::observability::LogLevel;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Where cluster credentials come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialsSource {
    /// In-cluster service account or the default kubeconfig resolution
    Ambient,
    /// An explicit kubeconfig file
    KubeconfigFile(PathBuf),
}

impl CredentialsSource {
    /// An empty path selects ambient credentials
    #[must_use]
    pub fn from_kubeconfig_flag(kubeconfig: &str) -> Self {
        if kubeconfig.is_empty() {
            CredentialsSource::Ambient
        } else {
            CredentialsSource::KubeconfigFile(PathBuf::from(kubeconfig))
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("timeout must be a positive number of seconds, got {0}")]
    NonPositiveTimeout(i64),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcilerConfig {
    pub credentials: CredentialsSource,
    /// Bounds every cluster operation performed through the handle
    pub timeout: Duration,
    pub log_level: LogLevel,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            credentials: CredentialsSource::Ambient,
            timeout: Duration::from_secs(DEFAULT_RECONCILER_TIMEOUT_SECS.unsigned_abs()),
            log_level: LogLevel::Error,
        }
    }
}

impl ReconcilerConfig {
    pub fn new(
        kubeconfig: &str,
        timeout_secs: i64,
        log_level: LogLevel,
    ) -> Result<Self, ConfigError> {
        let secs = u64::try_from(timeout_secs)
            .ok()
            .filter(|secs| *secs > 0)
            .ok_or(ConfigError::NonPositiveTimeout(timeout_secs))?;
        Ok(Self {
            credentials: CredentialsSource::from_kubeconfig_flag(kubeconfig),
            timeout: Duration::from_secs(secs),
            log_level,
        })
    }
}
