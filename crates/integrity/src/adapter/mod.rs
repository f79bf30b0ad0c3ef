//! Read-only query adapters for the control plane and the Proxmox API.
//!
//! Checks only ever see these traits, so tests can substitute in-memory
//! fakes for the real `kube` and `reqwest` backed implementations.

pub mod cluster;
pub mod proxmox;

use async_trait::async_trait;
use k8s_openapi::api::core::v1::{Namespace, Node, Pod, Secret};
use k8s_openapi::api::storage::v1::{CSIDriver, StorageClass};
use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::CustomResourceDefinition;
use k8s_openapi::apimachinery::pkg::version::Info;
use kube::api::DynamicObject;
use kube::discovery::ApiResource;

use crate::error::{IntegrityError, QueryError};

pub use cluster::{KubeCluster, UnreachableCluster};
pub use proxmox::{ProxmoxClient, PveVersion, Ticket};

/// Read-only view of the cluster control plane.
///
/// List operations return an empty list when the namespace or resource
/// kind does not exist; single-object lookups return `None`.
#[async_trait]
pub trait ClusterQuery: Send + Sync {
    /// API server version, used as the connectivity test.
    async fn server_version(&self) -> Result<Info, QueryError>;

    async fn nodes(&self) -> Result<Vec<Node>, QueryError>;

    async fn namespace(&self, name: &str) -> Result<Option<Namespace>, QueryError>;

    /// Pods in `namespace` (all namespaces when `None`), optionally
    /// filtered by a label selector.
    async fn pods(
        &self,
        namespace: Option<&str>,
        selector: Option<&str>,
    ) -> Result<Vec<Pod>, QueryError>;

    async fn crds(&self) -> Result<Vec<CustomResourceDefinition>, QueryError>;

    /// All objects of a custom kind across namespaces.
    async fn custom_objects(
        &self,
        resource: &ApiResource,
    ) -> Result<Vec<DynamicObject>, QueryError>;

    async fn csi_drivers(&self) -> Result<Vec<CSIDriver>, QueryError>;

    async fn storage_classes(&self) -> Result<Vec<StorageClass>, QueryError>;

    async fn secret(&self, namespace: &str, name: &str) -> Result<Option<Secret>, QueryError>;
}

/// The subset of the Proxmox VE API the checks consume.
#[async_trait]
pub trait HypervisorApi: Send + Sync {
    /// Obtain an auth ticket via `POST /api2/json/access/ticket`.
    async fn authenticate(
        &self,
        endpoint: &str,
        username: &str,
        password: &str,
    ) -> Result<Ticket, IntegrityError>;

    /// Fetch `GET /api2/json/version` with an authenticated ticket.
    async fn version(&self, endpoint: &str, ticket: &Ticket) -> Result<PveVersion, IntegrityError>;
}
