//! Section ordering and check execution.

use chrono::Utc;
use futures::future::join_all;
use tracing::{debug, info};

use crate::checks::{
    ApiConnectivity, CapiComponents, Check, CsiDrivers, ErrorStateScan, NodesReady, PodsRunning,
    CheckContext, ProviderPods, ProxmoxApiConnectivity, ProxmoxClusters, ProxmoxWorkers,
    RequiredCrds, StorageClasses,
};
use crate::config::IntegrityConfig;
use crate::outcome::{Outcome, Status};
use crate::report::{Reporter, RunReport, SectionReport};
use crate::tally::Aggregator;

/// A titled, ordered group of checks.
pub struct Section {
    pub title: String,
    pub checks: Vec<Box<dyn Check>>,
}

impl Section {
    pub fn new(title: impl Into<String>, checks: Vec<Box<dyn Check>>) -> Self {
        Self {
            title: title.into(),
            checks,
        }
    }
}

/// The standard sections, in reporting order.
#[must_use]
pub fn default_sections(config: &IntegrityConfig) -> Vec<Section> {
    vec![
        Section::new(
            "1. Kubernetes Cluster Health",
            vec![
                Box::new(ApiConnectivity),
                Box::new(NodesReady),
                Box::new(ProxmoxWorkers {
                    kernel_marker: config.kernel_marker.clone(),
                    os_image_marker: config.os_image_marker.clone(),
                }),
            ],
        ),
        Section::new(
            "2. Cluster API Components",
            vec![Box::new(CapiComponents {
                namespace: config.capi_namespace.clone(),
            })],
        ),
        Section::new(
            "3. Proxmox Provider",
            vec![Box::new(ProviderPods {
                namespace: config.provider_namespace.clone(),
            })],
        ),
        Section::new(
            "4. Proxmox CRDs",
            vec![Box::new(RequiredCrds {
                required: config.required_crds.clone(),
            })],
        ),
        Section::new("5. Proxmox Custom Resources", vec![Box::new(ProxmoxClusters)]),
        Section::new(
            "6. Network Stack Health",
            vec![
                Box::new(PodsRunning::required("CoreDNS", config.coredns.clone())),
                Box::new(PodsRunning::optional("Cilium", config.cilium.clone())),
                Box::new(PodsRunning::required(
                    "Kube-OVN controller",
                    config.kube_ovn.clone(),
                )),
            ],
        ),
        Section::new(
            "7. Storage Stack Health",
            vec![
                Box::new(CsiDrivers {
                    marker: config.csi_marker.clone(),
                }),
                Box::new(StorageClasses),
            ],
        ),
        Section::new(
            "8. Proxmox API Connectivity",
            vec![Box::new(ProxmoxApiConnectivity {
                namespace: config.provider_namespace.clone(),
                secret: config.credentials_secret.clone(),
            })],
        ),
        Section::new(
            "9. Monitoring Stack",
            vec![
                Box::new(
                    PodsRunning::optional("Prometheus", config.prometheus.clone())
                        .when_unreachable(Status::Warn),
                ),
                Box::new(
                    PodsRunning::optional("Grafana", config.grafana.clone())
                        .when_unreachable(Status::Warn),
                ),
            ],
        ),
        Section::new("10. Workload Health Summary", vec![Box::new(ErrorStateScan)]),
    ]
}

/// Outcomes of one check, kept with its name for ordered replay.
type CheckRun = (String, Vec<Outcome>);

/// Runs sections against a check context and aggregates the outcomes.
pub struct Orchestrator {
    ctx: CheckContext,
    sections: Vec<Section>,
}

impl Orchestrator {
    #[must_use]
    pub fn new(ctx: CheckContext, sections: Vec<Section>) -> Self {
        Self { ctx, sections }
    }

    /// Run every section in order, one check at a time, reporting each
    /// outcome as soon as it is produced.
    pub async fn run(&self, reporter: &mut dyn Reporter) -> RunReport {
        let started_at = Utc::now();
        reporter.run_started(started_at);
        info!(sections = self.sections.len(), "Starting integrity checks");

        let mut aggregator = Aggregator::new();
        let mut sections = Vec::with_capacity(self.sections.len());

        for section in &self.sections {
            reporter.section(&section.title);
            let mut outcomes = Vec::new();

            for check in &section.checks {
                reporter.check(check.name());
                for outcome in check.run(&self.ctx).await {
                    reporter.outcome(&outcome);
                    aggregator.record(&outcome);
                    outcomes.push(outcome);
                }
            }

            sections.push(SectionReport {
                title: section.title.clone(),
                outcomes,
            });
        }

        self.finish(started_at, sections, aggregator, reporter)
    }

    /// Run all sections concurrently, then report and record them in
    /// section order. Checks within a section stay sequential.
    pub async fn run_concurrent(&self, reporter: &mut dyn Reporter) -> RunReport {
        let started_at = Utc::now();
        reporter.run_started(started_at);
        info!(
            sections = self.sections.len(),
            "Starting integrity checks concurrently"
        );

        let results = join_all(self.sections.iter().map(|s| self.run_section(s))).await;

        let mut aggregator = Aggregator::new();
        let mut sections = Vec::with_capacity(self.sections.len());

        for (section, runs) in self.sections.iter().zip(results) {
            reporter.section(&section.title);
            let mut outcomes = Vec::new();

            for (name, check_outcomes) in runs {
                reporter.check(&name);
                for outcome in check_outcomes {
                    reporter.outcome(&outcome);
                    aggregator.record(&outcome);
                    outcomes.push(outcome);
                }
            }

            sections.push(SectionReport {
                title: section.title.clone(),
                outcomes,
            });
        }

        self.finish(started_at, sections, aggregator, reporter)
    }

    async fn run_section(&self, section: &Section) -> Vec<CheckRun> {
        let mut runs = Vec::with_capacity(section.checks.len());
        for check in &section.checks {
            debug!(section = %section.title, check = check.name(), "Running check");
            runs.push((check.name().to_string(), check.run(&self.ctx).await));
        }
        runs
    }

    fn finish(
        &self,
        started_at: chrono::DateTime<Utc>,
        sections: Vec<SectionReport>,
        aggregator: Aggregator,
        reporter: &mut dyn Reporter,
    ) -> RunReport {
        let (tally, verdict) = aggregator.finalize();
        info!(
            total = tally.total,
            passed = tally.passed,
            failed = tally.failed,
            warned = tally.warned,
            verdict = %verdict,
            "Integrity checks complete"
        );

        let report = RunReport {
            started_at,
            completed_at: Utc::now(),
            sections,
            tally,
            verdict,
        };
        reporter.summary(&report);
        report
    }
}
