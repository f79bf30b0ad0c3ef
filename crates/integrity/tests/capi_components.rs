//! Cluster API and provider checks when their namespaces are missing.

mod common;

use std::sync::Arc;

use proxmox_integrity::checks::{CapiComponents, ProviderPods};
use proxmox_integrity::config::IntegrityConfig;
use proxmox_integrity::{Check, CheckContext, Status};

use common::{FakeCluster, FakeHypervisor};

fn context_for(cluster: &Arc<FakeCluster>) -> CheckContext {
    CheckContext::new(cluster.clone(), Arc::new(FakeHypervisor::default()))
}

#[tokio::test]
async fn test_capi_pods_skipped_without_namespace() {
    let config = IntegrityConfig::default();
    let cluster = Arc::new(FakeCluster::healthy().without_namespace(&config.capi_namespace));

    let outcomes = CapiComponents {
        namespace: config.capi_namespace.clone(),
    }
    .run(&context_for(&cluster))
    .await;

    let statuses: Vec<Status> = outcomes.iter().map(|o| o.status).collect();
    assert_eq!(statuses, vec![Status::Fail, Status::Info]);
    assert_eq!(outcomes[0].message, "CAPI namespace cozy-cluster-api not found");
    assert_eq!(cluster.pod_calls(), 0);
}

#[tokio::test]
async fn test_capi_pods_checked_with_namespace() {
    let config = IntegrityConfig::default();
    let cluster = Arc::new(FakeCluster::healthy());

    let outcomes = CapiComponents {
        namespace: config.capi_namespace,
    }
    .run(&context_for(&cluster))
    .await;

    let statuses: Vec<Status> = outcomes.iter().map(|o| o.status).collect();
    assert_eq!(statuses, vec![Status::Pass, Status::Pass]);
    assert_eq!(outcomes[1].message, "CAPI controllers running: 1/1");
    assert_eq!(cluster.pod_calls(), 1);
}

#[tokio::test]
async fn test_provider_namespace_missing_is_single_fail() {
    let config = IntegrityConfig::default();
    let cluster = Arc::new(FakeCluster::healthy().without_namespace(&config.provider_namespace));

    let outcomes = ProviderPods {
        namespace: config.provider_namespace,
    }
    .run(&context_for(&cluster))
    .await;

    assert_eq!(outcomes.len(), 1);
    assert_eq!(outcomes[0].status, Status::Fail);
    assert_eq!(outcomes[0].message, "capmox-system namespace not found");
    assert_eq!(cluster.pod_calls(), 0);
}
