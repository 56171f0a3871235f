//! # IPPool
//!
//! Allocation state for one IP range, as stored by the whereabouts IPAM plugin.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// IPPool Custom Resource Definition
///
/// # Example
///
/// ```yaml
/// apiVersion: whereabouts.cni.cncf.io/v1alpha1
/// kind: IPPool
/// metadata:
///   name: 10.10.0.0-16
///   namespace: kube-system
/// spec:
///   range: 10.10.0.0/16
///   allocations:
///     "1":
///       id: 5a8b2c...
///       podref: default/web-0
///       ifname: net1
/// ```
#[derive(kube::CustomResource, Debug, Clone, Deserialize, Serialize, schemars::JsonSchema)]
#[kube(
    kind = "IPPool",
    root = "IpPool",
    group = "whereabouts.cni.cncf.io",
    version = "v1alpha1",
    namespaced,
    plural = "ippools"
)]
#[serde(rename_all = "camelCase")]
pub struct IpPoolSpec {
    /// CIDR notation of the pool's range
    pub range: String,
    /// Allocations keyed by the decimal offset from the network address
    #[serde(default)]
    pub allocations: BTreeMap<String, IpAllocation>,
}

/// A single address handed out from a pool
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, schemars::JsonSchema)]
pub struct IpAllocation {
    /// Container ID of the sandbox holding the address
    pub id: String,
    /// `namespace/name` of the owning pod
    #[serde(default)]
    pub podref: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ifname: Option<String>,
}
