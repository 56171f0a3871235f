//! # Allocation Bookkeeping
//!
//! Pure functions over pool and pod snapshots: offset arithmetic, pod
//! liveness and orphan detection. Nothing here talks to the cluster.

use crate::constants::POD_PHASE_PENDING;
use crate::crd::{IpAllocation, IpPoolSpec};
use crate::engine::ReconcileError;
use serde::Deserialize;
use std::collections::{BTreeSet, HashMap};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

/// What the reconciler needs to know about a pod
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PodSnapshot {
    pub phase: Option<String>,
    /// Addresses reported for the pod's secondary networks
    pub ips: BTreeSet<IpAddr>,
}

/// Live pods keyed by `namespace/name`
pub type LivePods = HashMap<String, PodSnapshot>;

/// An allocation whose owning pod no longer holds the address
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrphanedAllocation {
    /// Allocation map key (decimal offset)
    pub offset: String,
    pub ip: IpAddr,
    pub allocation: IpAllocation,
}

/// Entry of the Multus network-status annotation
#[derive(Debug, Deserialize)]
struct NetworkStatus {
    #[serde(default)]
    ips: Vec<String>,
}

#[must_use]
pub fn pod_ref(namespace: &str, name: &str) -> String {
    format!("{namespace}/{name}")
}

/// Extract every IP listed in a network-status annotation
///
/// A malformed annotation yields no addresses.
#[must_use]
pub fn network_status_ips(annotation: &str) -> BTreeSet<IpAddr> {
    match serde_json::from_str::<Vec<NetworkStatus>>(annotation) {
        Ok(statuses) => statuses
            .into_iter()
            .flat_map(|status| status.ips)
            .filter_map(|ip| ip.parse().ok())
            .collect(),
        Err(e) => {
            tracing::debug!("ignoring malformed network-status annotation: {}", e);
            BTreeSet::new()
        }
    }
}

/// A pod holds `ip` if it exists and either reports the address or is still pending
#[must_use]
pub fn is_pod_alive(pods: &LivePods, podref: &str, ip: IpAddr) -> bool {
    match pods.get(podref) {
        Some(pod) => pod.ips.contains(&ip) || pod.phase.as_deref() == Some(POD_PHASE_PENDING),
        None => false,
    }
}

/// Resolve the address at `offset` from the network address of `range`
pub fn ip_at_offset(range: &str, offset: u128) -> Result<IpAddr, String> {
    let (addr, prefix) = range
        .split_once('/')
        .ok_or_else(|| format!("range {range:?} is not in CIDR notation"))?;
    let addr: IpAddr = addr
        .trim()
        .parse()
        .map_err(|e| format!("range {range:?} has an invalid address: {e}"))?;
    let prefix: u32 = prefix
        .trim()
        .parse()
        .map_err(|e| format!("range {range:?} has an invalid prefix length: {e}"))?;

    match addr {
        IpAddr::V4(v4) => {
            if prefix > 32 {
                return Err(format!("range {range:?} has prefix length {prefix} > 32"));
            }
            let mask = u32::MAX.checked_shl(32 - prefix).unwrap_or(0);
            let network = u128::from(u32::from(v4) & mask);
            let host_count = 1u128 << (32 - prefix);
            if offset >= host_count {
                return Err(format!("offset {offset} is outside range {range:?}"));
            }
            let ip = u32::try_from(network + offset)
                .map_err(|e| format!("offset {offset} overflows range {range:?}: {e}"))?;
            Ok(IpAddr::V4(Ipv4Addr::from(ip)))
        }
        IpAddr::V6(v6) => {
            if prefix > 128 {
                return Err(format!("range {range:?} has prefix length {prefix} > 128"));
            }
            let mask = u128::MAX.checked_shl(128 - prefix).unwrap_or(0);
            let network = u128::from(v6) & mask;
            let host_bits = 128 - prefix;
            if host_bits < 128 && offset >= (1u128 << host_bits) {
                return Err(format!("offset {offset} is outside range {range:?}"));
            }
            let ip = network
                .checked_add(offset)
                .ok_or_else(|| format!("offset {offset} overflows range {range:?}"))?;
            Ok(IpAddr::V6(Ipv6Addr::from(ip)))
        }
    }
}

/// Find allocations in `spec` whose pods are no longer alive
///
/// Results are ordered by numeric offset.
pub fn find_orphaned_allocations(
    pool_name: &str,
    spec: &IpPoolSpec,
    pods: &LivePods,
) -> Result<Vec<OrphanedAllocation>, ReconcileError> {
    let mut orphans = Vec::new();
    for (key, allocation) in &spec.allocations {
        let offset: u128 = key.parse().map_err(|e| {
            ReconcileError::invalid_pool(pool_name, format!("allocation key {key:?}: {e}"))
        })?;
        let ip = ip_at_offset(&spec.range, offset)
            .map_err(|reason| ReconcileError::invalid_pool(pool_name, reason))?;

        if !is_pod_alive(pods, &allocation.podref, ip) {
            orphans.push((
                offset,
                OrphanedAllocation {
                    offset: key.clone(),
                    ip,
                    allocation: allocation.clone(),
                },
            ));
        }
    }
    orphans.sort_by_key(|(offset, _)| *offset);
    Ok(orphans.into_iter().map(|(_, orphan)| orphan).collect())
}

/// Kubernetes-safe resource name for an IP reservation
///
/// This is the naming rule whereabouts applies when it creates an
/// `OverlappingRangeIPReservation`; the reconciler only reads those names
/// back through [`ip_from_reservation_name`]. IPv6 colons become dashes; a
/// leading or trailing dash gets a `0` so the name stays valid.
#[must_use]
pub fn reservation_name(ip: IpAddr) -> String {
    let mut name = ip.to_string().replace(':', "-");
    if name.ends_with('-') {
        name.push('0');
    }
    if name.starts_with('-') {
        name.insert(0, '0');
    }
    name
}

/// Inverse of [`reservation_name`]
#[must_use]
pub fn ip_from_reservation_name(name: &str) -> Option<IpAddr> {
    if let Ok(ip) = name.parse::<Ipv4Addr>() {
        return Some(IpAddr::V4(ip));
    }
    name.replace('-', ":").parse::<Ipv6Addr>().ok().map(IpAddr::V6)
}
