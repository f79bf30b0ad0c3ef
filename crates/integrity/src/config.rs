//! Integrity checker configuration.
//!
//! Every namespace, label selector, secret name and timeout the checks use
//! lives here so tests and the CLI can override them in one place.

use std::path::PathBuf;
use std::time::Duration;

/// Kubeconfig used when `KUBECONFIG` is not set.
pub const DEFAULT_KUBECONFIG: &str = "/root/cozy/mgr-cozy/kubeconfig";

/// Deadline for every control-plane query.
pub const DEFAULT_QUERY_TIMEOUT_SECS: u64 = 30;

/// Deadline for the Proxmox ticket request.
pub const DEFAULT_AUTH_TIMEOUT_SECS: u64 = 10;

/// Deadline for the Proxmox version request.
pub const DEFAULT_VERSION_TIMEOUT_SECS: u64 = 5;

/// A pod group located by namespace and label selector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PodTarget {
    pub namespace: String,
    pub selector: String,
}

impl PodTarget {
    #[must_use]
    pub fn new(namespace: &str, selector: &str) -> Self {
        Self {
            namespace: namespace.to_string(),
            selector: selector.to_string(),
        }
    }
}

/// Full integrity checker configuration.
#[derive(Debug, Clone)]
pub struct IntegrityConfig {
    /// Kubeconfig file for the management cluster.
    pub kubeconfig: PathBuf,

    // Cluster API
    /// Namespace of the core Cluster API controllers.
    pub capi_namespace: String,
    /// Namespace of the Proxmox infrastructure provider (capmox).
    pub provider_namespace: String,
    /// Secret in `provider_namespace` holding the Proxmox credentials.
    pub credentials_secret: String,
    /// CRDs the provider must have registered.
    pub required_crds: Vec<String>,

    // Node detection
    /// Kernel version marker identifying Proxmox hosts.
    pub kernel_marker: String,
    /// OS image marker identifying Proxmox hosts.
    pub os_image_marker: String,
    /// CSI driver name marker for the Proxmox CSI plugin.
    pub csi_marker: String,

    // Network
    pub coredns: PodTarget,
    pub cilium: PodTarget,
    pub kube_ovn: PodTarget,

    // Monitoring
    pub prometheus: PodTarget,
    pub grafana: PodTarget,

    // Timeouts
    pub query_timeout: Duration,
    pub auth_timeout: Duration,
    pub version_timeout: Duration,
}

impl Default for IntegrityConfig {
    fn default() -> Self {
        Self {
            kubeconfig: PathBuf::from(DEFAULT_KUBECONFIG),
            capi_namespace: "cozy-cluster-api".to_string(),
            provider_namespace: "capmox-system".to_string(),
            credentials_secret: "capmox-credentials".to_string(),
            required_crds: [
                "proxmoxclusters",
                "proxmoxmachines",
                "proxmoxclustertemplates",
                "proxmoxmachinetemplates",
            ]
            .iter()
            .map(|plural| format!("{plural}.infrastructure.cluster.x-k8s.io"))
            .collect(),
            kernel_marker: "pve".to_string(),
            os_image_marker: "proxmox".to_string(),
            csi_marker: "proxmox".to_string(),
            coredns: PodTarget::new("kube-system", "k8s-app=kube-dns"),
            cilium: PodTarget::new("cozy-cilium", "app.kubernetes.io/name=cilium"),
            kube_ovn: PodTarget::new("cozy-kubeovn", "app=kube-ovn-controller"),
            prometheus: PodTarget::new("cozy-monitoring", "app.kubernetes.io/name=prometheus"),
            grafana: PodTarget::new("cozy-monitoring", "app.kubernetes.io/name=grafana"),
            query_timeout: Duration::from_secs(DEFAULT_QUERY_TIMEOUT_SECS),
            auth_timeout: Duration::from_secs(DEFAULT_AUTH_TIMEOUT_SECS),
            version_timeout: Duration::from_secs(DEFAULT_VERSION_TIMEOUT_SECS),
        }
    }
}
