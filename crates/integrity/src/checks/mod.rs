//! Check library.
//!
//! Each check issues one or more read-only queries through the adapters,
//! evaluates a predicate over the typed result and yields outcomes. Query,
//! decode and predicate errors are turned into outcomes here and never
//! propagate further.

pub mod capi;
pub mod cluster;
pub mod proxmox_api;
pub mod stack;
pub mod workloads;

use std::sync::Arc;

use async_trait::async_trait;
use k8s_openapi::api::core::v1::Pod;

use crate::adapter::{ClusterQuery, HypervisorApi};
use crate::outcome::Outcome;

pub use capi::{CapiComponents, ProviderPods, ProxmoxClusters, RequiredCrds};
pub use cluster::{ApiConnectivity, NodesReady, ProxmoxWorkers};
pub use proxmox_api::ProxmoxApiConnectivity;
pub use stack::{CsiDrivers, PodsRunning, StorageClasses};
pub use workloads::ErrorStateScan;

/// Maximum detail lines attached to a single outcome.
pub const MAX_DETAIL_LINES: usize = 5;

/// Adapters shared by every check in a run.
#[derive(Clone)]
pub struct CheckContext {
    pub cluster: Arc<dyn ClusterQuery>,
    pub hypervisor: Arc<dyn HypervisorApi>,
}

impl CheckContext {
    pub fn new(cluster: Arc<dyn ClusterQuery>, hypervisor: Arc<dyn HypervisorApi>) -> Self {
        Self {
            cluster,
            hypervisor,
        }
    }
}

/// A named check producing one or more outcomes.
#[async_trait]
pub trait Check: Send + Sync {
    /// Human-readable name, shown before the outcomes.
    fn name(&self) -> &str;

    /// Run the check. Never fails: errors become outcomes.
    async fn run(&self, ctx: &CheckContext) -> Vec<Outcome>;
}

/// Case-insensitive substring match.
#[must_use]
pub fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// Whether a pod is in the `Running` phase.
#[must_use]
pub fn pod_is_running(pod: &Pod) -> bool {
    pod.status
        .as_ref()
        .and_then(|s| s.phase.as_deref())
        .is_some_and(|phase| phase == "Running")
}

/// Number of running pods in a list.
#[must_use]
pub fn running_count(pods: &[Pod]) -> usize {
    pods.iter().filter(|p| pod_is_running(p)).count()
}

/// Resource name from metadata, `<unnamed>` when absent.
pub(crate) fn name_of(meta: &k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta) -> String {
    meta.name.clone().unwrap_or_else(|| "<unnamed>".to_string())
}

/// `namespace/name  phase` rows for the first few pods.
pub(crate) fn pod_rows(pods: &[Pod]) -> Vec<String> {
    pods.iter()
        .take(MAX_DETAIL_LINES)
        .map(|pod| {
            let phase = pod
                .status
                .as_ref()
                .and_then(|s| s.phase.as_deref())
                .unwrap_or("Unknown");
            format!(
                "{}/{}  {phase}",
                pod.metadata.namespace.as_deref().unwrap_or("-"),
                name_of(&pod.metadata)
            )
        })
        .collect()
}
