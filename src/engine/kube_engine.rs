//! # Kubernetes Engine
//!
//! Reconciliation engine backed by the Kubernetes API.
//!
//! Handle construction connects to the cluster and snapshots every IP pool
//! and pod. The pool phase then rewrites pools that hold orphaned
//! allocations; the overlap phase deletes cluster-wide reservations whose
//! pods are gone. Every API call is bounded by the configured timeout.

use crate::constants::NETWORK_STATUS_ANNOTATION;
use crate::crd::{IpPool, OverlappingRangeIpReservation};
use crate::engine::allocation::{
    find_orphaned_allocations, ip_from_reservation_name, is_pod_alive, network_status_ips,
    pod_ref, LivePods, OrphanedAllocation, PodSnapshot,
};
use crate::engine::{HandleFactory, ReconcileError, ReconcileHandle};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Pod;
use kube::{
    api::{Api, DeleteParams, ListParams, PostParams},
    config::{KubeConfigOptions, Kubeconfig},
    Client, Config, ResourceExt,
};
use std::future::Future;
use std::net::IpAddr;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Builds [`ReconcileLooper`] handles against a real cluster
#[derive(Debug, Clone, Copy, Default)]
pub struct KubeHandleFactory;

#[async_trait]
impl HandleFactory for KubeHandleFactory {
    type Handle = ReconcileLooper;

    async fn new_handle(&self, timeout: Duration) -> Result<ReconcileLooper, ReconcileError> {
        let config = Config::infer().await?;
        let client = client_with_timeout(config, timeout)?;
        ReconcileLooper::new(client, timeout).await
    }

    async fn new_handle_with_kubeconfig(
        &self,
        kubeconfig: &Path,
        timeout: Duration,
    ) -> Result<ReconcileLooper, ReconcileError> {
        let kubeconfig = Kubeconfig::read_from(kubeconfig)?;
        let config =
            Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default()).await?;
        let client = client_with_timeout(config, timeout)?;
        ReconcileLooper::new(client, timeout).await
    }
}

fn client_with_timeout(mut config: Config, timeout: Duration) -> Result<Client, ReconcileError> {
    config.connect_timeout = Some(timeout);
    config.read_timeout = Some(timeout);
    Ok(Client::try_from(config)?)
}

/// Run a cluster request, failing with `DeadlineExceeded` once `timeout` elapses
async fn with_deadline<T, F>(
    operation: &'static str,
    timeout: Duration,
    request: F,
) -> Result<T, ReconcileError>
where
    F: Future<Output = Result<T, kube::Error>>,
{
    match tokio::time::timeout(timeout, request).await {
        Ok(result) => Ok(result?),
        Err(_elapsed) => Err(ReconcileError::DeadlineExceeded { operation, timeout }),
    }
}

/// A pool together with the allocations found orphaned at construction time
#[derive(Debug, Clone)]
struct PoolOrphans {
    pool: IpPool,
    orphans: Vec<OrphanedAllocation>,
}

/// Reconciliation handle over a cluster snapshot
pub struct ReconcileLooper {
    client: Client,
    timeout: Duration,
    live_pods: LivePods,
    pools: Vec<PoolOrphans>,
}

impl std::fmt::Debug for ReconcileLooper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReconcileLooper")
            .field("timeout", &self.timeout)
            .field("live_pods", &self.live_pods.len())
            .field("pools", &self.pools.len())
            .finish_non_exhaustive()
    }
}

impl ReconcileLooper {
    /// Snapshot pools and pods, and work out which allocations are orphaned
    pub async fn new(client: Client, timeout: Duration) -> Result<Self, ReconcileError> {
        let pools_api: Api<IpPool> = Api::all(client.clone());
        let pods_api: Api<Pod> = Api::all(client.clone());

        let pools = with_deadline(
            "listing IP pools",
            timeout,
            pools_api.list(&ListParams::default()),
        )
        .await?;
        let pods = with_deadline("listing pods", timeout, pods_api.list(&ListParams::default()))
            .await?;

        let live_pods = live_pods(pods.items);
        debug!(
            "snapshot: {} IP pools, {} pods",
            pools.items.len(),
            live_pods.len()
        );

        let pool_orphans = plan_pools(pools.items, &live_pods)?;

        Ok(Self {
            client,
            timeout,
            live_pods,
            pools: pool_orphans,
        })
    }

    async fn clean_pool(&self, entry: &PoolOrphans) -> Result<Vec<String>, ReconcileError> {
        let name = entry.pool.name_any();
        let namespace = entry
            .pool
            .namespace()
            .ok_or_else(|| ReconcileError::invalid_pool(&name, "pool has no namespace"))?;

        let (pool, cleaned) = prune_pool(entry);

        // resourceVersion from the snapshot guards against concurrent writers
        let api: Api<IpPool> = Api::namespaced(self.client.clone(), &namespace);
        with_deadline(
            "updating IP pool",
            self.timeout,
            api.replace(&name, &PostParams::default(), &pool),
        )
        .await?;
        Ok(cleaned)
    }
}

/// Pair every pool with its orphaned allocations, keeping list order
fn plan_pools(
    pools: Vec<IpPool>,
    live_pods: &LivePods,
) -> Result<Vec<PoolOrphans>, ReconcileError> {
    let mut planned = Vec::with_capacity(pools.len());
    for pool in pools {
        let name = pool.name_any();
        let orphans = find_orphaned_allocations(&name, &pool.spec, live_pods)?;
        if !orphans.is_empty() {
            debug!("pool {} has {} orphaned allocations", name, orphans.len());
        }
        planned.push(PoolOrphans { pool, orphans });
    }
    Ok(planned)
}

/// Copy of the pool without its orphaned allocations, plus the released IPs
///
/// Metadata, including the snapshot resourceVersion, is left untouched.
fn prune_pool(entry: &PoolOrphans) -> (IpPool, Vec<String>) {
    let mut pool = entry.pool.clone();
    let mut cleaned = Vec::with_capacity(entry.orphans.len());
    for orphan in &entry.orphans {
        if pool.spec.allocations.remove(&orphan.offset).is_some() {
            debug!(
                "releasing {} (pod {}, container {}) from pool {}",
                orphan.ip,
                orphan.allocation.podref,
                orphan.allocation.id,
                entry.pool.name_any()
            );
            cleaned.push(orphan.ip.to_string());
        }
    }
    (pool, cleaned)
}

/// A cluster-wide reservation scheduled for deletion
#[derive(Debug, Clone, PartialEq, Eq)]
struct ReservationTarget {
    namespace: String,
    name: String,
    ip: IpAddr,
    podref: String,
}

impl std::fmt::Display for ReservationTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Reservations whose owning pod no longer holds the reserved address
fn orphaned_reservations(
    reservations: Vec<OverlappingRangeIpReservation>,
    live_pods: &LivePods,
) -> Vec<ReservationTarget> {
    reservations
        .into_iter()
        .filter_map(|reservation| {
            let name = reservation.name_any();
            let Some(ip) = ip_from_reservation_name(&name) else {
                warn!("skipping reservation {} whose name is not an IP address", name);
                return None;
            };
            if is_pod_alive(live_pods, &reservation.spec.podref, ip) {
                return None;
            }
            Some(ReservationTarget {
                namespace: reservation.namespace().unwrap_or_default(),
                name,
                ip,
                podref: reservation.spec.podref,
            })
        })
        .collect()
}

/// Attempt every deletion; a failure does not stop the sweep
///
/// Returns how many deletions succeeded and the first failure, if any.
async fn delete_all<F, Fut>(
    targets: &[ReservationTarget],
    mut delete: F,
) -> (usize, Option<ReconcileError>)
where
    F: FnMut(&ReservationTarget) -> Fut,
    Fut: Future<Output = Result<(), ReconcileError>>,
{
    let mut first_failure = None;
    let mut deleted = 0usize;
    for target in targets {
        debug!(
            "deleting reservation {} held by missing pod {}",
            target.ip, target.podref
        );
        match delete(target).await {
            Ok(()) => deleted += 1,
            Err(e) => {
                error!("failed to delete reservation {}: {}", target, e);
                first_failure.get_or_insert(e);
            }
        }
    }
    (deleted, first_failure)
}

fn live_pods(pods: Vec<Pod>) -> LivePods {
    pods.into_iter()
        .map(|pod| {
            let key = pod_ref(&pod.namespace().unwrap_or_default(), &pod.name_any());
            let ips = pod
                .annotations()
                .get(NETWORK_STATUS_ANNOTATION)
                .map(String::as_str)
                .map(network_status_ips)
                .unwrap_or_default();
            let phase = pod.status.and_then(|status| status.phase);
            (key, PodSnapshot { phase, ips })
        })
        .collect()
}

#[async_trait]
impl ReconcileHandle for ReconcileLooper {
    async fn reconcile_ip_pools(&self) -> Result<Vec<String>, ReconcileError> {
        let mut cleaned = Vec::new();
        for entry in self.pools.iter().filter(|p| !p.orphans.is_empty()) {
            cleaned.extend(self.clean_pool(entry).await?);
        }
        Ok(cleaned)
    }

    async fn reconcile_overlapping_ip_addresses(&self) -> Result<(), ReconcileError> {
        let api: Api<OverlappingRangeIpReservation> = Api::all(self.client.clone());
        let reservations = with_deadline(
            "listing overlapping range IP reservations",
            self.timeout,
            api.list(&ListParams::default()),
        )
        .await?;

        let targets = orphaned_reservations(reservations.items, &self.live_pods);
        let timeout = self.timeout;
        let (deleted, first_failure) = delete_all(&targets, |target| {
            let api: Api<OverlappingRangeIpReservation> =
                Api::namespaced(self.client.clone(), &target.namespace);
            let name = target.name.clone();
            async move {
                let params = DeleteParams::default();
                with_deadline(
                    "deleting overlapping range IP reservation",
                    timeout,
                    api.delete(&name, &params),
                )
                .await
                .map(|_| ())
            }
        })
        .await;

        if deleted > 0 {
            info!("removed {} orphaned cluster-wide IP reservations", deleted);
        }
        match first_failure {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::{IpAllocation, IpPoolSpec, OverlappingRangeIpReservationSpec};
    use crate::engine::ReconcileErrorKind;
    use k8s_openapi::api::core::v1::PodStatus;
    use std::collections::BTreeMap;

    fn running(ips: &[&str]) -> PodSnapshot {
        PodSnapshot {
            phase: Some("Running".to_string()),
            ips: ips.iter().map(|ip| ip.parse().unwrap()).collect(),
        }
    }

    fn ip_pool(name: &str, range: &str, allocations: &[(&str, &str)]) -> IpPool {
        let mut pool = IpPool::new(
            name,
            IpPoolSpec {
                range: range.to_string(),
                allocations: allocations
                    .iter()
                    .map(|(offset, podref)| {
                        (
                            (*offset).to_string(),
                            IpAllocation {
                                id: format!("container-{offset}"),
                                podref: (*podref).to_string(),
                                ifname: None,
                            },
                        )
                    })
                    .collect(),
            },
        );
        pool.metadata.namespace = Some("kube-system".to_string());
        pool.metadata.resource_version = Some("4711".to_string());
        pool
    }

    fn reservation(name: &str, podref: &str) -> OverlappingRangeIpReservation {
        let mut reservation = OverlappingRangeIpReservation::new(
            name,
            OverlappingRangeIpReservationSpec {
                containerid: "abc".to_string(),
                podref: podref.to_string(),
                ifname: None,
            },
        );
        reservation.metadata.namespace = Some("kube-system".to_string());
        reservation
    }

    fn pod(namespace: &str, name: &str, phase: &str, annotation: Option<&str>) -> Pod {
        let mut pod = Pod::default();
        pod.metadata.namespace = Some(namespace.to_string());
        pod.metadata.name = Some(name.to_string());
        if let Some(annotation) = annotation {
            pod.metadata.annotations = Some(BTreeMap::from([(
                NETWORK_STATUS_ANNOTATION.to_string(),
                annotation.to_string(),
            )]));
        }
        pod.status = Some(PodStatus {
            phase: Some(phase.to_string()),
            ..PodStatus::default()
        });
        pod
    }

    #[test]
    fn test_live_pods_keys_and_addresses() {
        let pods = live_pods(vec![
            pod(
                "default",
                "web-0",
                "Running",
                Some(r#"[{"name": "macvlan", "ips": ["192.168.2.10"]}]"#),
            ),
            pod("kube-system", "dns", "Pending", None),
        ]);

        assert_eq!(pods.len(), 2);
        let web = &pods["default/web-0"];
        assert_eq!(web.phase.as_deref(), Some("Running"));
        assert!(web.ips.contains(&"192.168.2.10".parse().unwrap()));
        assert!(pods["kube-system/dns"].ips.is_empty());
    }

    #[tokio::test]
    async fn test_with_deadline_maps_elapsed_to_deadline_exceeded() {
        let result: Result<(), ReconcileError> = with_deadline(
            "listing pods",
            Duration::from_millis(10),
            std::future::pending::<Result<(), kube::Error>>(),
        )
        .await;

        let err = result.unwrap_err();
        assert_eq!(err.kind(), crate::engine::ReconcileErrorKind::DeadlineExceeded);
        assert!(err.to_string().contains("context deadline exceeded"));
    }

    #[tokio::test]
    async fn test_missing_kubeconfig_is_configuration_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("does-not-exist");
        let err = KubeHandleFactory
            .new_handle_with_kubeconfig(&path, Duration::from_secs(1))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), crate::engine::ReconcileErrorKind::Configuration);
    }

    #[test]
    fn test_prune_pool_drops_only_orphans_and_keeps_resource_version() {
        let mut live = LivePods::new();
        live.insert("default/web-0".to_string(), running(&["10.0.0.1"]));
        let planned = plan_pools(
            vec![ip_pool(
                "10.0.0.0-24",
                "10.0.0.0/24",
                &[("1", "default/web-0"), ("2", "default/gone")],
            )],
            &live,
        )
        .unwrap();

        let (pool, cleaned) = prune_pool(&planned[0]);
        assert_eq!(cleaned, vec!["10.0.0.2"]);
        assert_eq!(pool.spec.allocations.keys().collect::<Vec<_>>(), vec!["1"]);
        assert_eq!(pool.metadata.resource_version.as_deref(), Some("4711"));
        // the snapshot itself is not modified
        assert_eq!(planned[0].pool.spec.allocations.len(), 2);
    }

    #[test]
    fn test_cleaned_ips_follow_pool_then_offset_order() {
        let planned = plan_pools(
            vec![
                ip_pool("b", "10.0.1.0/24", &[("9", "default/x"), ("3", "default/y")]),
                ip_pool("a", "10.0.0.0/24", &[("5", "default/z")]),
                ip_pool("c", "10.0.2.0/24", &[]),
            ],
            &LivePods::new(),
        )
        .unwrap();

        assert_eq!(planned.len(), 3);
        assert!(planned[2].orphans.is_empty());
        let cleaned: Vec<String> = planned
            .iter()
            .filter(|entry| !entry.orphans.is_empty())
            .flat_map(|entry| prune_pool(entry).1)
            .collect();
        assert_eq!(cleaned, vec!["10.0.1.3", "10.0.1.9", "10.0.0.5"]);
    }

    #[test]
    fn test_plan_pools_rejects_invalid_pool() {
        let err = plan_pools(
            vec![ip_pool("broken", "not-a-cidr", &[("1", "default/web-0")])],
            &LivePods::new(),
        )
        .unwrap_err();
        assert_eq!(err.kind(), ReconcileErrorKind::InvalidPool);
    }

    #[test]
    fn test_orphaned_reservations_skips_live_and_unparsable() {
        let mut live = LivePods::new();
        live.insert("default/web-0".to_string(), running(&["10.0.0.1"]));

        let targets = orphaned_reservations(
            vec![
                reservation("10.0.0.1", "default/web-0"),
                reservation("10.0.0.2", "default/gone"),
                reservation("not-an-ip", "default/gone"),
                reservation("fd00--0", "default/web-0"),
            ],
            &live,
        );

        let names: Vec<String> = targets.iter().map(ToString::to_string).collect();
        assert_eq!(names, vec!["kube-system/10.0.0.2", "kube-system/fd00--0"]);
        assert_eq!(targets[1].ip, "fd00::".parse::<IpAddr>().unwrap());
        assert_eq!(targets[0].podref, "default/gone");
    }

    #[tokio::test]
    async fn test_delete_all_continues_after_failure() {
        let targets = orphaned_reservations(
            vec![
                reservation("10.0.0.2", "default/a"),
                reservation("10.0.0.3", "default/b"),
                reservation("10.0.0.4", "default/c"),
                reservation("10.0.0.5", "default/d"),
            ],
            &LivePods::new(),
        );

        let mut attempted = Vec::new();
        let (deleted, failure) = delete_all(&targets, |target| {
            attempted.push(target.name.clone());
            let result = match target.name.as_str() {
                "10.0.0.3" => Err(ReconcileError::other("forbidden")),
                "10.0.0.4" => Err(ReconcileError::Timeout("i/o timeout".to_string())),
                _ => Ok(()),
            };
            async move { result }
        })
        .await;

        assert_eq!(attempted, vec!["10.0.0.2", "10.0.0.3", "10.0.0.4", "10.0.0.5"]);
        assert_eq!(deleted, 2);
        let failure = failure.unwrap();
        assert_eq!(failure.kind(), ReconcileErrorKind::Other);
        assert_eq!(failure.to_string(), "forbidden");
    }

    #[tokio::test]
    async fn test_delete_all_without_targets_is_a_no_op() {
        let (deleted, failure) = delete_all(&[], |_| async { Ok(()) }).await;
        assert_eq!(deleted, 0);
        assert!(failure.is_none());
    }
}
