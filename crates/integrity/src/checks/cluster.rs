//! Cluster-level checks: API reachability, node readiness and Proxmox host
//! detection.

use async_trait::async_trait;
use k8s_openapi::api::core::v1::{Node, NodeSystemInfo};

use super::{contains_ignore_case, name_of, Check, CheckContext, MAX_DETAIL_LINES};
use crate::error::PredicateError;
use crate::outcome::Outcome;

/// Control-plane API connectivity.
pub struct ApiConnectivity;

#[async_trait]
impl Check for ApiConnectivity {
    fn name(&self) -> &str {
        "Kubernetes API connectivity"
    }

    async fn run(&self, ctx: &CheckContext) -> Vec<Outcome> {
        let outcome = match ctx.cluster.server_version().await {
            Ok(info) => Outcome::pass("Kubernetes API is accessible").with_details([
                format!("Server version: {}", info.git_version),
                format!("Platform: {}", info.platform),
            ]),
            Err(e) => Outcome::fail(format!("Cannot connect to Kubernetes API: {e}")),
        };
        vec![outcome]
    }
}

/// Whether the node's `Ready` condition is `True`.
#[must_use]
pub fn node_is_ready(node: &Node) -> bool {
    node.status
        .as_ref()
        .and_then(|s| s.conditions.as_ref())
        .and_then(|conditions| conditions.iter().find(|c| c.type_ == "Ready"))
        .is_some_and(|c| c.status == "True")
}

fn node_row(node: &Node) -> String {
    let readiness = if node_is_ready(node) { "Ready" } else { "NotReady" };
    match node.status.as_ref().and_then(|s| s.node_info.as_ref()) {
        Some(info) => format!(
            "{}  {readiness}  {}  {}  {}",
            name_of(&node.metadata),
            info.kubelet_version,
            info.os_image,
            info.kernel_version
        ),
        None => format!("{}  {readiness}", name_of(&node.metadata)),
    }
}

/// Classify node readiness: all Ready passes, some Ready warns, none fails.
#[must_use]
pub fn nodes_ready_outcome(nodes: &[Node]) -> Outcome {
    let total = nodes.len();
    let ready = nodes.iter().filter(|n| node_is_ready(n)).count();
    let rows: Vec<String> = nodes.iter().take(MAX_DETAIL_LINES).map(node_row).collect();

    let outcome = if total == 0 {
        Outcome::fail("No nodes found in cluster")
    } else if ready == total {
        Outcome::pass(format!("All {total} nodes are Ready"))
    } else if ready == 0 {
        Outcome::fail(format!("No nodes Ready ({ready}/{total})"))
    } else {
        Outcome::warn(format!("Only {ready}/{total} nodes Ready"))
    };

    outcome.with_details(rows)
}

/// Node readiness.
pub struct NodesReady;

#[async_trait]
impl Check for NodesReady {
    fn name(&self) -> &str {
        "Node status"
    }

    async fn run(&self, ctx: &CheckContext) -> Vec<Outcome> {
        let outcome = match ctx.cluster.nodes().await {
            Ok(nodes) => nodes_ready_outcome(&nodes),
            Err(e) => Outcome::fail(format!("Cannot retrieve node status: {e}")),
        };
        vec![outcome]
    }
}

/// Detection of Proxmox hosts among the cluster nodes.
pub struct ProxmoxWorkers {
    pub kernel_marker: String,
    pub os_image_marker: String,
}

impl ProxmoxWorkers {
    fn is_proxmox(&self, info: &NodeSystemInfo) -> bool {
        contains_ignore_case(&info.kernel_version, &self.kernel_marker)
            || contains_ignore_case(&info.os_image, &self.os_image_marker)
    }

    /// Classify nodes: any Proxmox host passes, none is only a warning.
    ///
    /// # Errors
    ///
    /// Returns a [`PredicateError`] when a node reports no system info.
    pub fn evaluate(&self, nodes: &[Node]) -> Result<Outcome, PredicateError> {
        let mut found = Vec::new();

        for node in nodes {
            let name = name_of(&node.metadata);
            let info = node
                .status
                .as_ref()
                .and_then(|s| s.node_info.as_ref())
                .ok_or_else(|| {
                    PredicateError::new(format!("node {name}"), "missing status.nodeInfo")
                })?;

            if self.is_proxmox(info) {
                found.push(format!(
                    "Node: {name}, OS: {}, Kernel: {}",
                    info.os_image, info.kernel_version
                ));
            }
        }

        if found.is_empty() {
            Ok(Outcome::warn("No Proxmox worker nodes detected"))
        } else {
            Ok(
                Outcome::pass(format!("Proxmox worker node(s) found: {}", found.len()))
                    .with_details(found),
            )
        }
    }
}

#[async_trait]
impl Check for ProxmoxWorkers {
    fn name(&self) -> &str {
        "Proxmox worker node"
    }

    async fn run(&self, ctx: &CheckContext) -> Vec<Outcome> {
        let outcome = match ctx.cluster.nodes().await {
            Ok(nodes) => self
                .evaluate(&nodes)
                .unwrap_or_else(|e| Outcome::fail(format!("Error parsing node data: {e}"))),
            Err(e) => Outcome::fail(format!("Cannot retrieve nodes: {e}")),
        };
        vec![outcome]
    }
}

#[cfg(test)]
mod tests {
    use super::super::fixtures::node;
    use super::*;
    use crate::outcome::Status;

    fn workers() -> ProxmoxWorkers {
        ProxmoxWorkers {
            kernel_marker: "pve".to_string(),
            os_image_marker: "proxmox".to_string(),
        }
    }

    #[test]
    fn test_all_nodes_ready() {
        let nodes = vec![
            node("cp-1", true, "6.6.43-talos", "Talos (v1.8.0)"),
            node("cp-2", true, "6.6.43-talos", "Talos (v1.8.0)"),
        ];
        let outcome = nodes_ready_outcome(&nodes);
        assert_eq!(outcome.status, Status::Pass);
        assert_eq!(outcome.message, "All 2 nodes are Ready");
        assert_eq!(outcome.details.len(), 2);
    }

    #[test]
    fn test_partial_nodes_ready_warns_with_ratio() {
        let nodes = vec![
            node("cp-1", true, "6.6.43-talos", "Talos (v1.8.0)"),
            node("cp-2", true, "6.6.43-talos", "Talos (v1.8.0)"),
            node("pve-1", false, "6.8.12-4-pve", "Debian GNU/Linux 12 (bookworm)"),
        ];
        let outcome = nodes_ready_outcome(&nodes);
        assert_eq!(outcome.status, Status::Warn);
        assert!(outcome.message.contains("2/3"));
        assert!(outcome.details[2].contains("NotReady"));
    }

    #[test]
    fn test_no_nodes_ready_fails() {
        let nodes = vec![node("cp-1", false, "6.6.43-talos", "Talos (v1.8.0)")];
        assert_eq!(nodes_ready_outcome(&nodes).status, Status::Fail);
        assert_eq!(nodes_ready_outcome(&[]).status, Status::Fail);
    }

    #[test]
    fn test_proxmox_detection_by_kernel_is_case_insensitive() {
        let nodes = vec![
            node("cp-1", true, "6.6.43-talos", "Talos (v1.8.0)"),
            node("pve-1", true, "5.15.0-PVE", "Debian GNU/Linux 12 (bookworm)"),
        ];
        let outcome = workers().evaluate(&nodes).unwrap();
        assert_eq!(outcome.status, Status::Pass);
        assert_eq!(outcome.details.len(), 1);
        assert!(outcome.details[0].contains("pve-1"));
    }

    #[test]
    fn test_proxmox_detection_by_os_image() {
        let nodes = vec![node("pve-2", true, "6.8.12", "Proxmox VE 8.2")];
        assert_eq!(workers().evaluate(&nodes).unwrap().status, Status::Pass);
    }

    #[test]
    fn test_no_proxmox_nodes_is_warning() {
        let nodes = vec![node("cp-1", true, "6.6.43-talos", "Talos (v1.8.0)")];
        let outcome = workers().evaluate(&nodes).unwrap();
        assert_eq!(outcome.status, Status::Warn);
    }

    #[test]
    fn test_node_without_info_is_predicate_error() {
        let bare: Node = serde_json::from_value(serde_json::json!({
            "metadata": { "name": "ghost" },
            "status": {}
        }))
        .unwrap();
        let err = workers().evaluate(&[bare]).unwrap_err();
        assert!(err.to_string().contains("ghost"));
    }
}
