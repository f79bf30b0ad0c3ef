//! Cluster API and Proxmox provider checks.

use async_trait::async_trait;
use k8s_openapi::api::core::v1::Pod;
use kube::api::DynamicObject;
use kube::discovery::ApiResource;
use serde::Deserialize;

use super::{name_of, pod_rows, running_count, Check, CheckContext};
use crate::error::PredicateError;
use crate::outcome::{Outcome, Status};

/// Cluster API controllers: namespace existence, then controller pods.
pub struct CapiComponents {
    pub namespace: String,
}

/// Any running controller passes; none running fails.
#[must_use]
pub fn capi_controllers_outcome(pods: &[Pod]) -> Outcome {
    let running = running_count(pods);
    if running > 0 {
        Outcome::pass(format!("CAPI controllers running: {running}/{}", pods.len()))
    } else {
        Outcome::fail("No CAPI controllers running")
    }
}

#[async_trait]
impl Check for CapiComponents {
    fn name(&self) -> &str {
        "CAPI namespace and controllers"
    }

    async fn run(&self, ctx: &CheckContext) -> Vec<Outcome> {
        let ns = self.namespace.as_str();

        let namespace = match ctx.cluster.namespace(ns).await {
            Ok(Some(_)) => Outcome::pass(format!("CAPI namespace {ns} exists")),
            Ok(None) => Outcome::fail(format!("CAPI namespace {ns} not found")),
            Err(e) => Outcome::fail(format!("Cannot look up CAPI namespace {ns}: {e}")),
        };

        if namespace.status != Status::Pass {
            return vec![
                namespace,
                Outcome::info("Skipping CAPI controller pods: namespace unavailable"),
            ];
        }

        let controllers = match ctx.cluster.pods(Some(ns), None).await {
            Ok(pods) => capi_controllers_outcome(&pods),
            Err(e) => Outcome::fail(format!("Cannot check CAPI pods: {e}")),
        };

        vec![namespace, controllers]
    }
}

/// Proxmox infrastructure provider (capmox) pods.
pub struct ProviderPods {
    pub namespace: String,
}

#[async_trait]
impl Check for ProviderPods {
    fn name(&self) -> &str {
        "Proxmox CAPI provider (capmox)"
    }

    async fn run(&self, ctx: &CheckContext) -> Vec<Outcome> {
        let ns = self.namespace.as_str();

        match ctx.cluster.namespace(ns).await {
            Ok(Some(_)) => {}
            Ok(None) => return vec![Outcome::fail(format!("{ns} namespace not found"))],
            Err(e) => {
                return vec![Outcome::fail(format!("Cannot look up {ns} namespace: {e}"))];
            }
        }

        let outcome = match ctx.cluster.pods(Some(ns), None).await {
            Ok(pods) => {
                let running = running_count(&pods);
                if running > 0 {
                    Outcome::pass(format!("Proxmox CAPI provider running: {running} pod(s)"))
                        .with_details(pod_rows(&pods))
                } else {
                    Outcome::fail("Proxmox CAPI provider not running")
                }
            }
            Err(e) => Outcome::fail(format!("Cannot check capmox pods: {e}")),
        };

        vec![outcome]
    }
}

/// The provider's CRDs must all be registered.
pub struct RequiredCrds {
    pub required: Vec<String>,
}

impl RequiredCrds {
    /// Compare installed CRD names against the required set.
    #[must_use]
    pub fn evaluate<S: AsRef<str>>(&self, installed: &[S]) -> Outcome {
        let missing: Vec<&str> = self
            .required
            .iter()
            .map(String::as_str)
            .filter(|required| !installed.iter().any(|name| name.as_ref() == *required))
            .collect();

        if missing.is_empty() {
            Outcome::pass(format!("All {} Proxmox CRDs installed", self.required.len()))
                .with_details(self.required.iter().map(|crd| format!("✓ {crd}")))
        } else {
            Outcome::fail(format!("Missing CRDs: {}", missing.join(", ")))
        }
    }
}

#[async_trait]
impl Check for RequiredCrds {
    fn name(&self) -> &str {
        "Proxmox CRDs"
    }

    async fn run(&self, ctx: &CheckContext) -> Vec<Outcome> {
        let outcome = match ctx.cluster.crds().await {
            Ok(crds) => {
                let names: Vec<String> = crds.iter().map(|crd| name_of(&crd.metadata)).collect();
                self.evaluate(&names)
            }
            Err(e) => Outcome::fail(format!("Cannot check CRDs: {e}")),
        };
        vec![outcome]
    }
}

/// `ProxmoxCluster` API resource definition.
#[must_use]
pub fn proxmox_cluster_api() -> ApiResource {
    ApiResource {
        group: "infrastructure.cluster.x-k8s.io".to_string(),
        version: "v1alpha1".to_string(),
        api_version: "infrastructure.cluster.x-k8s.io/v1alpha1".to_string(),
        kind: "ProxmoxCluster".to_string(),
        plural: "proxmoxclusters".to_string(),
    }
}

/// The part of `ProxmoxCluster.status` the checks read.
#[derive(Debug, Default, Deserialize)]
struct ProxmoxClusterStatus {
    #[serde(default)]
    ready: bool,
}

fn cluster_ready(object: &DynamicObject) -> Result<bool, PredicateError> {
    match object.data.get("status") {
        None => Ok(false),
        Some(status) => serde_json::from_value::<ProxmoxClusterStatus>(status.clone())
            .map(|s| s.ready)
            .map_err(|e| {
                PredicateError::new(
                    format!("ProxmoxCluster {}", name_of(&object.metadata)),
                    e.to_string(),
                )
            }),
    }
}

/// `ProxmoxCluster` readiness.
pub struct ProxmoxClusters;

impl ProxmoxClusters {
    /// None found is informational; all Ready passes; otherwise warns.
    ///
    /// # Errors
    ///
    /// Returns a [`PredicateError`] when an object's status cannot be read.
    pub fn evaluate(objects: &[DynamicObject]) -> Result<Outcome, PredicateError> {
        if objects.is_empty() {
            return Ok(Outcome::info("No ProxmoxCluster resources found"));
        }

        let mut ready = 0;
        let mut rows = Vec::with_capacity(objects.len());
        for object in objects {
            let is_ready = cluster_ready(object)?;
            if is_ready {
                ready += 1;
            }
            rows.push(format!(
                "{}/{}  ready={is_ready}",
                object.metadata.namespace.as_deref().unwrap_or("-"),
                name_of(&object.metadata)
            ));
        }

        let total = objects.len();
        let outcome = if ready == total {
            Outcome::pass(format!("All ProxmoxCluster resources Ready: {ready}/{total}"))
        } else {
            Outcome::warn(format!("ProxmoxCluster status: {ready}/{total} Ready"))
        };

        Ok(outcome.with_details(rows))
    }
}

#[async_trait]
impl Check for ProxmoxClusters {
    fn name(&self) -> &str {
        "ProxmoxCluster resources"
    }

    async fn run(&self, ctx: &CheckContext) -> Vec<Outcome> {
        let outcome = match ctx.cluster.custom_objects(&proxmox_cluster_api()).await {
            Ok(objects) => Self::evaluate(&objects).unwrap_or_else(|e| {
                Outcome::fail(format!("Cannot read ProxmoxCluster status: {e}"))
            }),
            Err(e) => Outcome::fail(format!("Cannot list ProxmoxCluster resources: {e}")),
        };
        vec![outcome]
    }
}

#[cfg(test)]
mod tests {
    use super::super::fixtures::pod;
    use super::*;
    use crate::config::IntegrityConfig;
    use serde_json::json;

    fn crds() -> RequiredCrds {
        RequiredCrds {
            required: IntegrityConfig::default().required_crds,
        }
    }

    fn proxmox_cluster(name: &str, status: serde_json::Value) -> DynamicObject {
        serde_json::from_value(json!({
            "apiVersion": "infrastructure.cluster.x-k8s.io/v1alpha1",
            "kind": "ProxmoxCluster",
            "metadata": { "name": name, "namespace": "tenant-root" },
            "status": status
        }))
        .unwrap()
    }

    #[test]
    fn test_capi_controllers_partial_is_pass_with_ratio() {
        let pods = vec![
            pod("cozy-cluster-api", "capi-controller", "Running"),
            pod("cozy-cluster-api", "capi-kubeadm", "Pending"),
        ];
        let outcome = capi_controllers_outcome(&pods);
        assert_eq!(outcome.status, Status::Pass);
        assert!(outcome.message.contains("1/2"));
    }

    #[test]
    fn test_capi_controllers_none_running_fails() {
        let pods = vec![pod("cozy-cluster-api", "capi-controller", "Pending")];
        assert_eq!(capi_controllers_outcome(&pods).status, Status::Fail);
        assert_eq!(capi_controllers_outcome(&[]).status, Status::Fail);
    }

    #[test]
    fn test_all_crds_present() {
        let installed = crds().required.clone();
        let outcome = crds().evaluate(&installed);
        assert_eq!(outcome.status, Status::Pass);
        assert_eq!(outcome.details.len(), 4);
    }

    #[test]
    fn test_missing_crd_is_named() {
        let mut installed = crds().required.clone();
        installed.retain(|crd| !crd.starts_with("proxmoxmachinetemplates"));
        installed.push("clusters.cluster.x-k8s.io".to_string());

        let outcome = crds().evaluate(&installed);
        assert_eq!(outcome.status, Status::Fail);
        assert_eq!(
            outcome.message,
            "Missing CRDs: proxmoxmachinetemplates.infrastructure.cluster.x-k8s.io"
        );
    }

    #[test]
    fn test_no_proxmox_clusters_is_info() {
        let outcome = ProxmoxClusters::evaluate(&[]).unwrap();
        assert_eq!(outcome.status, Status::Info);
    }

    #[test]
    fn test_proxmox_clusters_partially_ready() {
        let objects = vec![
            proxmox_cluster("a", json!({ "ready": true })),
            proxmox_cluster("b", json!({ "ready": false })),
        ];
        let outcome = ProxmoxClusters::evaluate(&objects).unwrap();
        assert_eq!(outcome.status, Status::Warn);
        assert_eq!(outcome.message, "ProxmoxCluster status: 1/2 Ready");
    }

    #[test]
    fn test_proxmox_clusters_all_ready() {
        let objects = vec![proxmox_cluster("a", json!({ "ready": true }))];
        let outcome = ProxmoxClusters::evaluate(&objects).unwrap();
        assert_eq!(outcome.status, Status::Pass);
        assert_eq!(outcome.details, vec!["tenant-root/a  ready=true"]);
    }

    #[test]
    fn test_malformed_cluster_status() {
        let objects = vec![proxmox_cluster("a", json!({ "ready": "yes" }))];
        assert!(ProxmoxClusters::evaluate(&objects).is_err());
    }
}
