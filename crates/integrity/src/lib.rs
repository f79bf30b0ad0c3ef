//! Proxmox integration integrity checker.
//!
//! Walks a fixed set of read-only checks against a Cluster API management
//! cluster and the Proxmox VE API it provisions into, classifies every check
//! and rolls the outcomes up into a single verdict.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use proxmox_integrity::{default_sections, CheckContext, IntegrityConfig, Orchestrator};
//! use proxmox_integrity::adapter::{KubeCluster, ProxmoxClient};
//! use proxmox_integrity::ui::ConsoleReporter;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = IntegrityConfig::default();
//!     let cluster = KubeCluster::from_kubeconfig(&config.kubeconfig, config.query_timeout).await?;
//!     let proxmox = ProxmoxClient::new(config.auth_timeout, config.version_timeout)?;
//!     let ctx = CheckContext::new(Arc::new(cluster), Arc::new(proxmox));
//!
//!     let mut reporter = ConsoleReporter::new(config.kubeconfig.clone());
//!     let report = Orchestrator::new(ctx, default_sections(&config))
//!         .run(&mut reporter)
//!         .await;
//!     std::process::exit(report.verdict.exit_code().into());
//! }
//! ```

// Allow product names without backticks in doc comments
#![allow(clippy::doc_markdown)]

pub mod adapter;
pub mod checks;
pub mod config;
pub mod credentials;
pub mod error;
pub mod orchestrator;
pub mod outcome;
pub mod report;
pub mod tally;
pub mod ui;

// Re-export commonly used types at the crate root
pub use checks::{Check, CheckContext};
pub use config::IntegrityConfig;
pub use orchestrator::{default_sections, Orchestrator, Section};
pub use outcome::{Outcome, Status};
pub use report::{Reporter, RunReport};
pub use tally::{Aggregator, RunTally, Verdict};
