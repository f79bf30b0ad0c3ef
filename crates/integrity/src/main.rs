//! Proxmox integration integrity checker CLI.
//!
//! Runs every integrity check against the management cluster and exits with
//! 0 (healthy), 1 (degraded) or 2 (critical).

// Allow product names without backticks in doc comments
#![allow(clippy::doc_markdown)]

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use proxmox_integrity::adapter::{ClusterQuery, KubeCluster, ProxmoxClient, UnreachableCluster};
use proxmox_integrity::config::{DEFAULT_KUBECONFIG, DEFAULT_QUERY_TIMEOUT_SECS};
use proxmox_integrity::report::QuietReporter;
use proxmox_integrity::ui::{self, ConsoleReporter};
use proxmox_integrity::{
    default_sections, CheckContext, IntegrityConfig, Orchestrator, Reporter, Verdict,
};

/// Proxmox integration system integrity checker.
#[derive(Parser)]
#[command(
    name = "proxmox-integrity",
    version,
    about = "Read-only integrity checker for Proxmox-backed Cluster API clusters",
    long_about = "Check the health of a Proxmox VE integration managed through Cluster API.\n\n\
                  Verifies the Kubernetes control plane, the CAPI controllers and the\n\
                  Proxmox provider, required CRDs, network and storage stacks, and\n\
                  connectivity to the Proxmox VE API. Nothing is ever modified.\n\n\
                  Exit codes: 0 = healthy, 1 = degraded, 2 = critical."
)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long)]
    verbose: bool,

    /// Kubeconfig for the management cluster.
    #[arg(long, env = "KUBECONFIG", default_value = DEFAULT_KUBECONFIG)]
    kubeconfig: PathBuf,

    /// Namespace of the Cluster API controllers.
    #[arg(long, env = "INTEGRITY_CAPI_NAMESPACE")]
    capi_namespace: Option<String>,

    /// Namespace of the Proxmox infrastructure provider.
    #[arg(long, env = "INTEGRITY_PROVIDER_NAMESPACE")]
    provider_namespace: Option<String>,

    /// Secret holding the Proxmox API credentials.
    #[arg(long, env = "INTEGRITY_CREDENTIALS_SECRET")]
    credentials_secret: Option<String>,

    /// Deadline for each control-plane query, in seconds.
    #[arg(long, env = "INTEGRITY_QUERY_TIMEOUT", default_value_t = DEFAULT_QUERY_TIMEOUT_SECS)]
    query_timeout: u64,

    /// Run sections concurrently (output order is unchanged).
    #[arg(long)]
    parallel: bool,

    /// Print the run report as JSON instead of the console summary.
    #[arg(long)]
    json: bool,

    /// Disable coloured output.
    #[arg(long)]
    no_color: bool,
}

impl Cli {
    fn integrity_config(&self) -> IntegrityConfig {
        let mut config = IntegrityConfig {
            kubeconfig: self.kubeconfig.clone(),
            query_timeout: Duration::from_secs(self.query_timeout),
            ..IntegrityConfig::default()
        };
        if let Some(ns) = &self.capi_namespace {
            config.capi_namespace.clone_from(ns);
        }
        if let Some(ns) = &self.provider_namespace {
            config.provider_namespace.clone_from(ns);
        }
        if let Some(name) = &self.credentials_secret {
            config.credentials_secret.clone_from(name);
        }
        config
    }
}

/// Exit status for a finished run. A run that could not complete is
/// reported as critical so only 0, 1 and 2 ever reach automation.
fn exit_status(result: &Result<Verdict>) -> u8 {
    match result {
        Ok(verdict) => verdict.exit_code(),
        Err(_) => Verdict::Critical.exit_code(),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Logs go to stderr so stdout stays clean for the report
    let filter = if cli.verbose {
        EnvFilter::new("info,proxmox_integrity=debug")
    } else {
        EnvFilter::new("warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    if cli.no_color || cli.json {
        ui::disable_color();
    }

    let result = run(&cli).await;
    if let Err(e) = &result {
        error!(error = %format!("{e:#}"), "Integrity check run aborted");
        eprintln!("Error: {e:#}");
    }

    ExitCode::from(exit_status(&result))
}

async fn run(cli: &Cli) -> Result<Verdict> {
    let config = cli.integrity_config();
    info!(kubeconfig = %config.kubeconfig.display(), "Loaded integrity configuration");

    // An unusable kubeconfig still produces a full report with every
    // control-plane check failing.
    let cluster: Arc<dyn ClusterQuery> =
        match KubeCluster::from_kubeconfig(&config.kubeconfig, config.query_timeout).await {
            Ok(cluster) => Arc::new(cluster),
            Err(e) => {
                warn!(error = %format!("{e:#}"), "Cannot build Kubernetes client");
                Arc::new(UnreachableCluster::new(format!("{e:#}")))
            }
        };
    let proxmox = ProxmoxClient::new(config.auth_timeout, config.version_timeout)
        .context("Failed to create Proxmox API client")?;

    let ctx = CheckContext::new(cluster, Arc::new(proxmox));
    let orchestrator = Orchestrator::new(ctx, default_sections(&config));

    let mut console;
    let mut quiet = QuietReporter;
    let reporter: &mut dyn Reporter = if cli.json {
        &mut quiet
    } else {
        console = ConsoleReporter::new(config.kubeconfig.clone());
        &mut console
    };

    let report = if cli.parallel {
        orchestrator.run_concurrent(reporter).await
    } else {
        orchestrator.run(reporter).await
    };

    if cli.json {
        println!("{}", report.to_json()?);
    }

    Ok(report.verdict)
}
