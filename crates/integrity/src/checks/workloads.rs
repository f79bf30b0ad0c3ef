//! Cluster-wide scan for pods stuck in error states.

use async_trait::async_trait;
use k8s_openapi::api::core::v1::{Pod, PodStatus};

use super::{name_of, Check, CheckContext, MAX_DETAIL_LINES};
use crate::outcome::Outcome;

/// Status substrings that mark a pod as broken.
pub const ERROR_MARKERS: [&str; 4] = ["Error", "CrashLoopBackOff", "ImagePullBackOff", "Unknown"];

/// Error-state pods at which the scan fails instead of warning.
const FAIL_THRESHOLD: usize = 10;

/// Status string for a pod, resolved the way `kubectl get pods` shows it:
/// a failing init container (`Init:<reason>`) wins over a main container's
/// waiting or terminated reason, which wins over the pod reason, which wins
/// over the phase.
#[must_use]
pub fn pod_display_status(pod: &Pod) -> String {
    let Some(status) = pod.status.as_ref() else {
        return "Pending".to_string();
    };

    if let Some(reason) = init_container_reason(status) {
        return format!("Init:{reason}");
    }

    let container_reason = status
        .container_statuses
        .iter()
        .flatten()
        .filter_map(|cs| cs.state.as_ref())
        .find_map(|state| {
            state
                .waiting
                .as_ref()
                .and_then(|w| w.reason.clone())
                .or_else(|| state.terminated.as_ref().and_then(|t| t.reason.clone()))
        });

    container_reason
        .or_else(|| status.reason.clone())
        .or_else(|| status.phase.clone())
        .unwrap_or_else(|| "Unknown".to_string())
}

/// Reason of the first init container that has not completed successfully.
fn init_container_reason(status: &PodStatus) -> Option<String> {
    status
        .init_container_statuses
        .iter()
        .flatten()
        .filter_map(|cs| cs.state.as_ref())
        .find_map(|state| {
            if let Some(terminated) = &state.terminated {
                if terminated.exit_code == 0 {
                    return None;
                }
                return Some(
                    terminated
                        .reason
                        .clone()
                        .unwrap_or_else(|| format!("ExitCode:{}", terminated.exit_code)),
                );
            }
            state
                .waiting
                .as_ref()
                .and_then(|w| w.reason.clone())
                .filter(|reason| reason != "PodInitializing")
        })
}

/// Whether a display status contains one of the error markers.
#[must_use]
pub fn is_error_state(display_status: &str) -> bool {
    ERROR_MARKERS
        .iter()
        .any(|marker| display_status.contains(marker))
}

/// Classify error-state pods: none passes, fewer than ten warns, more fails.
#[must_use]
pub fn error_state_outcome(pods: &[Pod]) -> Outcome {
    let broken: Vec<String> = pods
        .iter()
        .filter_map(|pod| {
            let status = pod_display_status(pod);
            is_error_state(&status).then(|| {
                format!(
                    "{}/{}: {status}",
                    pod.metadata.namespace.as_deref().unwrap_or("-"),
                    name_of(&pod.metadata)
                )
            })
        })
        .collect();

    let count = broken.len();
    let details = broken.into_iter().take(MAX_DETAIL_LINES);

    if count == 0 {
        Outcome::pass("No pods in error states")
    } else if count < FAIL_THRESHOLD {
        Outcome::warn(format!("{count} pods in error states")).with_details(details)
    } else {
        Outcome::fail(format!("{count} pods in error states")).with_details(details)
    }
}

/// Error-state scan over every pod in the cluster.
pub struct ErrorStateScan;

#[async_trait]
impl Check for ErrorStateScan {
    fn name(&self) -> &str {
        "Pods in error states"
    }

    async fn run(&self, ctx: &CheckContext) -> Vec<Outcome> {
        let outcome = match ctx.cluster.pods(None, None).await {
            Ok(pods) => error_state_outcome(&pods),
            Err(e) => Outcome::fail(format!("Cannot list pods: {e}")),
        };
        vec![outcome]
    }
}
