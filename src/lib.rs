//! IP Reconciler Library
//!
//! One-shot reconciliation job for whereabouts IPAM: releases IP allocations
//! held by pods that no longer exist and removes their cluster-wide
//! reservations. Tests are included in the module files and under `tests/`.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use ip_reconciler::config::ReconcilerConfig;
//! use ip_reconciler::engine::KubeHandleFactory;
//! use ip_reconciler::runtime::{run, terminate};
//!
//! # async fn example() {
//! let disposition = run(&KubeHandleFactory, &ReconcilerConfig::default()).await;
//! terminate(disposition);
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod constants;
pub mod crd;
pub mod engine;
pub mod observability;
pub mod runtime;
