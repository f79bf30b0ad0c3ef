//! Control-plane adapter backed by the `kube` client.

use std::fmt::Debug;
use std::future::Future;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::{Namespace, Node, Pod, Secret};
use k8s_openapi::api::storage::v1::{CSIDriver, StorageClass};
use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::CustomResourceDefinition;
use k8s_openapi::apimachinery::pkg::version::Info;
use kube::api::{Api, DynamicObject, ListParams};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::discovery::ApiResource;
use kube::{Client, Config, Resource};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use super::ClusterQuery;
use crate::error::QueryError;

/// `ClusterQuery` implementation talking to a live API server.
#[derive(Clone)]
pub struct KubeCluster {
    client: Client,
    timeout: Duration,
}

impl KubeCluster {
    #[must_use]
    pub fn new(client: Client, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    /// Create an adapter from a kubeconfig file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the kubeconfig cannot be read or the client cannot be created.
    pub async fn from_kubeconfig(path: &Path, timeout: Duration) -> Result<Self> {
        let kubeconfig = Kubeconfig::read_from(path)
            .with_context(|| format!("Failed to read kubeconfig from {}", path.display()))?;

        let config = Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
            .await
            .context("Failed to create Kubernetes config from kubeconfig")?;

        let client = Client::try_from(config).context("Failed to create Kubernetes client")?;

        Ok(Self::new(client, timeout))
    }

    /// Run a kube call under the query deadline.
    async fn bounded<T, F>(&self, query: &str, fut: F) -> Result<T, QueryError>
    where
        F: Future<Output = Result<T, kube::Error>>,
    {
        debug!(query, timeout_secs = self.timeout.as_secs(), "Querying control plane");

        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result.map_err(|e| {
                warn!(query, error = %e, "Control-plane query failed");
                QueryError::from(e)
            }),
            Err(_) => {
                warn!(query, "Control-plane query timed out");
                Err(QueryError::Timeout(self.timeout.as_secs()))
            }
        }
    }

    /// List resources, treating an unknown kind or namespace as empty.
    async fn list<K>(
        &self,
        query: &str,
        api: Api<K>,
        params: ListParams,
    ) -> Result<Vec<K>, QueryError>
    where
        K: Resource + Clone + DeserializeOwned + Debug,
    {
        match self.bounded(query, api.list(&params)).await {
            Ok(list) => Ok(list.items),
            Err(QueryError::Kube(kube::Error::Api(response))) if response.code == 404 => {
                debug!(query, "Resource not found, treating as empty list");
                Ok(Vec::new())
            }
            Err(e) => Err(e),
        }
    }

    /// Fetch a single resource, `None` when it does not exist.
    async fn get<K>(&self, query: &str, api: Api<K>, name: &str) -> Result<Option<K>, QueryError>
    where
        K: Resource + Clone + DeserializeOwned + Debug,
    {
        self.bounded(query, api.get_opt(name)).await
    }
}

#[async_trait]
impl ClusterQuery for KubeCluster {
    async fn server_version(&self) -> Result<Info, QueryError> {
        self.bounded("version", self.client.apiserver_version()).await
    }

    async fn nodes(&self) -> Result<Vec<Node>, QueryError> {
        let api: Api<Node> = Api::all(self.client.clone());
        self.list("nodes", api, ListParams::default()).await
    }

    async fn namespace(&self, name: &str) -> Result<Option<Namespace>, QueryError> {
        let api: Api<Namespace> = Api::all(self.client.clone());
        self.get("namespace", api, name).await
    }

    async fn pods(
        &self,
        namespace: Option<&str>,
        selector: Option<&str>,
    ) -> Result<Vec<Pod>, QueryError> {
        let api: Api<Pod> = match namespace {
            Some(ns) => Api::namespaced(self.client.clone(), ns),
            None => Api::all(self.client.clone()),
        };

        let params = match selector {
            Some(labels) => ListParams::default().labels(labels),
            None => ListParams::default(),
        };

        self.list("pods", api, params).await
    }

    async fn crds(&self) -> Result<Vec<CustomResourceDefinition>, QueryError> {
        let api: Api<CustomResourceDefinition> = Api::all(self.client.clone());
        self.list("crds", api, ListParams::default()).await
    }

    async fn custom_objects(
        &self,
        resource: &ApiResource,
    ) -> Result<Vec<DynamicObject>, QueryError> {
        let api: Api<DynamicObject> = Api::all_with(self.client.clone(), resource);
        self.list(&resource.plural, api, ListParams::default()).await
    }

    async fn csi_drivers(&self) -> Result<Vec<CSIDriver>, QueryError> {
        let api: Api<CSIDriver> = Api::all(self.client.clone());
        self.list("csidrivers", api, ListParams::default()).await
    }

    async fn storage_classes(&self) -> Result<Vec<StorageClass>, QueryError> {
        let api: Api<StorageClass> = Api::all(self.client.clone());
        self.list("storageclasses", api, ListParams::default()).await
    }

    async fn secret(&self, namespace: &str, name: &str) -> Result<Option<Secret>, QueryError> {
        let api: Api<Secret> = Api::namespaced(self.client.clone(), namespace);
        self.get("secret", api, name).await
    }
}

/// Stand-in used when no client could be built.
///
/// Every query fails with the construction error, so each cluster check
/// reports it and the run still reaches its summary.
#[derive(Debug, Clone)]
pub struct UnreachableCluster {
    reason: String,
}

impl UnreachableCluster {
    #[must_use]
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    fn error(&self) -> QueryError {
        QueryError::Unavailable(self.reason.clone())
    }
}

#[async_trait]
impl ClusterQuery for UnreachableCluster {
    async fn server_version(&self) -> Result<Info, QueryError> {
        Err(self.error())
    }

    async fn nodes(&self) -> Result<Vec<Node>, QueryError> {
        Err(self.error())
    }

    async fn namespace(&self, _name: &str) -> Result<Option<Namespace>, QueryError> {
        Err(self.error())
    }

    async fn pods(
        &self,
        _namespace: Option<&str>,
        _selector: Option<&str>,
    ) -> Result<Vec<Pod>, QueryError> {
        Err(self.error())
    }

    async fn crds(&self) -> Result<Vec<CustomResourceDefinition>, QueryError> {
        Err(self.error())
    }

    async fn custom_objects(
        &self,
        _resource: &ApiResource,
    ) -> Result<Vec<DynamicObject>, QueryError> {
        Err(self.error())
    }

    async fn csi_drivers(&self) -> Result<Vec<CSIDriver>, QueryError> {
        Err(self.error())
    }

    async fn storage_classes(&self) -> Result<Vec<StorageClass>, QueryError> {
        Err(self.error())
    }

    async fn secret(&self, _namespace: &str, _name: &str) -> Result<Option<Secret>, QueryError> {
        Err(self.error())
    }
}
