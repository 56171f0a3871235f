//! # OverlappingRangeIPReservation
//!
//! Cluster-wide reservation of a single address, used by whereabouts to keep
//! overlapping ranges from handing out the same IP twice. The resource name
//! is the reserved IP in Kubernetes-safe form.

use serde::{Deserialize, Serialize};

#[derive(kube::CustomResource, Debug, Clone, Deserialize, Serialize, schemars::JsonSchema)]
#[kube(
    kind = "OverlappingRangeIPReservation",
    root = "OverlappingRangeIpReservation",
    group = "whereabouts.cni.cncf.io",
    version = "v1alpha1",
    namespaced,
    plural = "overlappingrangeipreservations"
)]
pub struct OverlappingRangeIpReservationSpec {
    pub containerid: String,
    /// `namespace/name` of the owning pod
    pub podref: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ifname: Option<String>,
}
