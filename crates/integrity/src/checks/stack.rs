//! Platform stack checks: network, storage and monitoring components.

use async_trait::async_trait;
use k8s_openapi::api::core::v1::Pod;
use k8s_openapi::api::storage::v1::{CSIDriver, StorageClass};

use super::{contains_ignore_case, name_of, running_count, Check, CheckContext};
use crate::config::PodTarget;
use crate::outcome::{Outcome, Status};

const DEFAULT_CLASS_ANNOTATION: &str = "storageclass.kubernetes.io/is-default-class";

/// A component deployed as labelled pods in a known namespace.
///
/// `when_absent` applies when no pod is running; `when_unreachable` when
/// the pod query itself fails.
pub struct PodsRunning {
    pub component: String,
    pub target: PodTarget,
    pub when_absent: Status,
    pub when_unreachable: Status,
}

impl PodsRunning {
    /// A component whose absence fails the run.
    #[must_use]
    pub fn required(component: &str, target: PodTarget) -> Self {
        Self {
            component: component.to_string(),
            target,
            when_absent: Status::Fail,
            when_unreachable: Status::Fail,
        }
    }

    /// A component whose absence only warns.
    #[must_use]
    pub fn optional(component: &str, target: PodTarget) -> Self {
        Self {
            when_absent: Status::Warn,
            ..Self::required(component, target)
        }
    }

    /// Downgrade query failures to the given status.
    #[must_use]
    pub fn when_unreachable(mut self, status: Status) -> Self {
        self.when_unreachable = status;
        self
    }

    #[must_use]
    pub fn evaluate(&self, pods: &[Pod]) -> Outcome {
        let running = running_count(pods);
        if running > 0 {
            Outcome::pass(format!("{} running: {running} pod(s)", self.component))
        } else {
            Outcome::new(self.when_absent, format!("{} not running", self.component))
        }
    }
}

#[async_trait]
impl Check for PodsRunning {
    fn name(&self) -> &str {
        &self.component
    }

    async fn run(&self, ctx: &CheckContext) -> Vec<Outcome> {
        let outcome = match ctx
            .cluster
            .pods(Some(&self.target.namespace), Some(&self.target.selector))
            .await
        {
            Ok(pods) => self.evaluate(&pods),
            Err(e) => Outcome::new(
                self.when_unreachable,
                format!("Cannot check {} pods: {e}", self.component),
            ),
        };
        vec![outcome]
    }
}

/// Registered CSI drivers, looking for the Proxmox plugin.
pub struct CsiDrivers {
    pub marker: String,
}

impl CsiDrivers {
    #[must_use]
    pub fn evaluate(&self, drivers: &[CSIDriver]) -> Outcome {
        let matching: Vec<String> = drivers
            .iter()
            .map(|d| name_of(&d.metadata))
            .filter(|name| contains_ignore_case(name, &self.marker))
            .collect();

        if matching.is_empty() {
            Outcome::warn("No Proxmox CSI driver found")
        } else {
            Outcome::pass("Proxmox CSI driver found").with_details(matching)
        }
    }
}

#[async_trait]
impl Check for CsiDrivers {
    fn name(&self) -> &str {
        "CSI drivers"
    }

    async fn run(&self, ctx: &CheckContext) -> Vec<Outcome> {
        let outcome = match ctx.cluster.csi_drivers().await {
            Ok(drivers) => self.evaluate(&drivers),
            Err(e) => Outcome::fail(format!("Cannot list CSI drivers: {e}")),
        };
        vec![outcome]
    }
}

fn is_default_class(class: &StorageClass) -> bool {
    class
        .metadata
        .annotations
        .as_ref()
        .and_then(|a| a.get(DEFAULT_CLASS_ANNOTATION))
        .is_some_and(|v| v == "true")
}

/// At least one storage class must exist.
pub struct StorageClasses;

impl StorageClasses {
    #[must_use]
    pub fn evaluate(classes: &[StorageClass]) -> Outcome {
        if classes.is_empty() {
            return Outcome::warn("No storage classes found");
        }

        let rows = classes.iter().map(|class| {
            let name = name_of(&class.metadata);
            if is_default_class(class) {
                format!("{name} (default)  {}", class.provisioner)
            } else {
                format!("{name}  {}", class.provisioner)
            }
        });

        Outcome::pass(format!("Storage classes found: {}", classes.len())).with_details(rows)
    }
}

#[async_trait]
impl Check for StorageClasses {
    fn name(&self) -> &str {
        "Storage classes"
    }

    async fn run(&self, ctx: &CheckContext) -> Vec<Outcome> {
        let outcome = match ctx.cluster.storage_classes().await {
            Ok(classes) => Self::evaluate(&classes),
            Err(e) => Outcome::fail(format!("Cannot list storage classes: {e}")),
        };
        vec![outcome]
    }
}
