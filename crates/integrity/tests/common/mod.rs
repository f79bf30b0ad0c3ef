//! In-memory adapters and resource builders shared by the integration tests.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use k8s_openapi::api::core::v1::{Namespace, Node, Pod, Secret};
use k8s_openapi::api::storage::v1::{CSIDriver, StorageClass};
use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::CustomResourceDefinition;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use k8s_openapi::apimachinery::pkg::version::Info;
use k8s_openapi::ByteString;
use kube::api::DynamicObject;
use kube::discovery::ApiResource;
use serde_json::json;

use proxmox_integrity::adapter::{ClusterQuery, HypervisorApi, PveVersion, Ticket};
use proxmox_integrity::config::IntegrityConfig;
use proxmox_integrity::error::{IntegrityError, QueryError};
use proxmox_integrity::CheckContext;

const NAME_LABEL: &str = "app.kubernetes.io/name";

/// Control plane backed by fixed resource lists.
#[derive(Default)]
pub struct FakeCluster {
    pub nodes: Vec<Node>,
    pub namespaces: Vec<String>,
    pub pods: Vec<Pod>,
    pub crds: Vec<String>,
    pub proxmox_clusters: Vec<DynamicObject>,
    pub csi_drivers: Vec<String>,
    pub storage_classes: Vec<StorageClass>,
    pub secrets: Vec<Secret>,
    pub pod_calls: AtomicUsize,
}

impl FakeCluster {
    /// A cluster that satisfies every check except Proxmox API connectivity.
    pub fn healthy() -> Self {
        let config = IntegrityConfig::default();
        Self {
            nodes: vec![
                node("cp-1", true, "6.8.12-4-pve", "Talos (v1.8.0)"),
                node("worker-1", true, "6.8.12-4-pve", "Proxmox VE 8.2"),
                node("worker-2", true, "6.8.12-4-pve", "Proxmox VE 8.2"),
            ],
            namespaces: vec![
                config.capi_namespace.clone(),
                config.provider_namespace.clone(),
                "kube-system".to_string(),
            ],
            pods: vec![
                running(&config.capi_namespace, "capi-controller-manager-0", &[]),
                running(&config.provider_namespace, "capmox-controller-manager-0", &[]),
                running("kube-system", "coredns-0", &[("k8s-app", "kube-dns")]),
                running("cozy-cilium", "cilium-abcde", &[(NAME_LABEL, "cilium")]),
                running("cozy-kubeovn", "kube-ovn-controller-0", &[("app", "kube-ovn-controller")]),
                running("cozy-monitoring", "prometheus-0", &[(NAME_LABEL, "prometheus")]),
                running("cozy-monitoring", "grafana-0", &[(NAME_LABEL, "grafana")]),
            ],
            crds: config.required_crds.clone(),
            proxmox_clusters: vec![proxmox_cluster("tenant-root", "pve", true)],
            csi_drivers: vec!["csi.proxmox.sinextra.dev".to_string()],
            storage_classes: vec![storage_class("replicated", true)],
            secrets: Vec::new(),
            pod_calls: AtomicUsize::new(0),
        }
    }

    pub fn without_namespace(mut self, name: &str) -> Self {
        self.namespaces.retain(|ns| ns != name);
        self
    }

    pub fn pod_calls(&self) -> usize {
        self.pod_calls.load(Ordering::SeqCst)
    }

    pub fn with_secret(mut self, secret: Secret) -> Self {
        self.secrets.push(secret);
        self
    }
}

fn matches_selector(pod: &Pod, selector: &str) -> bool {
    let labels = pod.metadata.labels.clone().unwrap_or_default();
    selector.split(',').all(|term| match term.split_once('=') {
        Some((key, value)) => labels.get(key.trim()).is_some_and(|v| v == value.trim()),
        None => labels.contains_key(term.trim()),
    })
}

#[async_trait]
impl ClusterQuery for FakeCluster {
    async fn server_version(&self) -> Result<Info, QueryError> {
        Ok(serde_json::from_value(json!({
            "buildDate": "2024-08-14T00:00:00Z",
            "compiler": "gc",
            "gitCommit": "",
            "gitTreeState": "clean",
            "gitVersion": "v1.30.3",
            "goVersion": "go1.22.5",
            "major": "1",
            "minor": "30",
            "platform": "linux/amd64"
        }))
        .expect("valid version info"))
    }

    async fn nodes(&self) -> Result<Vec<Node>, QueryError> {
        Ok(self.nodes.clone())
    }

    async fn namespace(&self, name: &str) -> Result<Option<Namespace>, QueryError> {
        Ok(self.namespaces.iter().any(|ns| ns == name).then(|| Namespace {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                ..ObjectMeta::default()
            },
            ..Namespace::default()
        }))
    }

    async fn pods(
        &self,
        namespace: Option<&str>,
        selector: Option<&str>,
    ) -> Result<Vec<Pod>, QueryError> {
        self.pod_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .pods
            .iter()
            .filter(|p| namespace.is_none_or(|ns| p.metadata.namespace.as_deref() == Some(ns)))
            .filter(|p| selector.is_none_or(|s| matches_selector(p, s)))
            .cloned()
            .collect())
    }

    async fn crds(&self) -> Result<Vec<CustomResourceDefinition>, QueryError> {
        Ok(self.crds.iter().map(|name| crd(name)).collect())
    }

    async fn custom_objects(
        &self,
        resource: &ApiResource,
    ) -> Result<Vec<DynamicObject>, QueryError> {
        if resource.kind == "ProxmoxCluster" {
            Ok(self.proxmox_clusters.clone())
        } else {
            Ok(Vec::new())
        }
    }

    async fn csi_drivers(&self) -> Result<Vec<CSIDriver>, QueryError> {
        Ok(self.csi_drivers.iter().map(|name| csi_driver(name)).collect())
    }

    async fn storage_classes(&self) -> Result<Vec<StorageClass>, QueryError> {
        Ok(self.storage_classes.clone())
    }

    async fn secret(&self, namespace: &str, name: &str) -> Result<Option<Secret>, QueryError> {
        Ok(self
            .secrets
            .iter()
            .find(|s| {
                s.metadata.namespace.as_deref() == Some(namespace)
                    && s.metadata.name.as_deref() == Some(name)
            })
            .cloned())
    }
}

/// Proxmox API double that counts calls and fails on demand.
#[derive(Default)]
pub struct FakeHypervisor {
    pub fail_auth: bool,
    pub fail_version: bool,
    pub auth_calls: AtomicUsize,
    pub version_calls: AtomicUsize,
}

impl FakeHypervisor {
    pub fn auth_calls(&self) -> usize {
        self.auth_calls.load(Ordering::SeqCst)
    }

    pub fn version_calls(&self) -> usize {
        self.version_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl HypervisorApi for FakeHypervisor {
    async fn authenticate(
        &self,
        _endpoint: &str,
        _username: &str,
        _password: &str,
    ) -> Result<Ticket, IntegrityError> {
        self.auth_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_auth {
            return Err(QueryError::Status {
                status: 401,
                message: "authentication failure".to_string(),
            }
            .into());
        }
        Ok(Ticket {
            ticket: "PVE:root@pam:TICKET".to_string(),
            csrf_prevention_token: "TOKEN".to_string(),
        })
    }

    async fn version(
        &self,
        _endpoint: &str,
        _ticket: &Ticket,
    ) -> Result<PveVersion, IntegrityError> {
        self.version_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_version {
            return Err(QueryError::Timeout(5).into());
        }
        Ok(PveVersion {
            version: Some("8.2.4".to_string()),
            release: Some("8.2".to_string()),
            repoid: Some("faa83925c9641325".to_string()),
        })
    }
}

pub fn context(cluster: FakeCluster, hypervisor: Arc<FakeHypervisor>) -> CheckContext {
    CheckContext::new(Arc::new(cluster), hypervisor)
}

pub fn node(name: &str, ready: bool, kernel: &str, os_image: &str) -> Node {
    serde_json::from_value(json!({
        "metadata": { "name": name },
        "status": {
            "conditions": [
                { "type": "Ready", "status": if ready { "True" } else { "False" } }
            ],
            "nodeInfo": {
                "architecture": "amd64",
                "bootID": "",
                "containerRuntimeVersion": "containerd://1.7.20",
                "kernelVersion": kernel,
                "kubeProxyVersion": "v1.30.3",
                "kubeletVersion": "v1.30.3",
                "machineID": "",
                "operatingSystem": "linux",
                "osImage": os_image,
                "systemUUID": ""
            }
        }
    }))
    .expect("valid node")
}

pub fn running(namespace: &str, name: &str, labels: &[(&str, &str)]) -> Pod {
    pod(namespace, name, labels, "Running")
}

pub fn pod(namespace: &str, name: &str, labels: &[(&str, &str)], phase: &str) -> Pod {
    let labels: BTreeMap<&str, &str> = labels.iter().copied().collect();
    serde_json::from_value(json!({
        "metadata": { "name": name, "namespace": namespace, "labels": labels },
        "status": { "phase": phase }
    }))
    .expect("valid pod")
}

pub fn crashing_pod(namespace: &str, name: &str) -> Pod {
    serde_json::from_value(json!({
        "metadata": { "name": name, "namespace": namespace },
        "status": {
            "phase": "Running",
            "containerStatuses": [{
                "name": "app",
                "image": "app:latest",
                "imageID": "",
                "ready": false,
                "restartCount": 7,
                "state": { "waiting": { "reason": "CrashLoopBackOff" } }
            }]
        }
    }))
    .expect("valid pod")
}

pub fn crd(name: &str) -> CustomResourceDefinition {
    let (plural, group) = name.split_once('.').unwrap_or((name, "example.com"));
    serde_json::from_value(json!({
        "metadata": { "name": name },
        "spec": {
            "group": group,
            "names": { "kind": plural, "plural": plural },
            "scope": "Namespaced",
            "versions": [{ "name": "v1alpha1", "served": true, "storage": true }]
        }
    }))
    .expect("valid crd")
}

pub fn csi_driver(name: &str) -> CSIDriver {
    serde_json::from_value(json!({ "metadata": { "name": name }, "spec": {} }))
        .expect("valid csi driver")
}

pub fn storage_class(name: &str, default: bool) -> StorageClass {
    serde_json::from_value(json!({
        "metadata": {
            "name": name,
            "annotations": {
                "storageclass.kubernetes.io/is-default-class": default.to_string()
            }
        },
        "provisioner": "csi.proxmox.sinextra.dev"
    }))
    .expect("valid storage class")
}

pub fn proxmox_cluster(namespace: &str, name: &str, ready: bool) -> DynamicObject {
    serde_json::from_value(json!({
        "apiVersion": "infrastructure.cluster.x-k8s.io/v1alpha1",
        "kind": "ProxmoxCluster",
        "metadata": { "name": name, "namespace": namespace },
        "status": { "ready": ready }
    }))
    .expect("valid proxmox cluster")
}

/// Credentials secret with raw (already decoded) values.
pub fn credentials_secret(endpoint: &str, user: &str, password: &str) -> Secret {
    let config = IntegrityConfig::default();
    let data = [
        ("PROXMOX_ENDPOINT", endpoint),
        ("PROXMOX_USER", user),
        ("PROXMOX_PASSWORD", password),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), ByteString(v.as_bytes().to_vec())))
    .collect();

    Secret {
        metadata: ObjectMeta {
            name: Some(config.credentials_secret),
            namespace: Some(config.provider_namespace),
            ..ObjectMeta::default()
        },
        data: Some(data),
        ..Secret::default()
    }
}
