//! Proxmox API connectivity: credentials, authentication, version.
//!
//! The steps are chained. Each step yields its own outcome and the first
//! failure ends the chain, so a run that got through `M` steps reports
//! `M + 1` outcomes (or all of them when every step succeeded).

use async_trait::async_trait;

use super::{Check, CheckContext};
use crate::credentials::ProxmoxCredentials;
use crate::error::{DecodeError, IntegrityError};
use crate::outcome::Outcome;

/// Chained connectivity check against the Proxmox VE API.
pub struct ProxmoxApiConnectivity {
    pub namespace: String,
    pub secret: String,
}

impl ProxmoxApiConnectivity {
    async fn load_credentials(
        &self,
        ctx: &CheckContext,
    ) -> Result<ProxmoxCredentials, IntegrityError> {
        let secret = ctx
            .cluster
            .secret(&self.namespace, &self.secret)
            .await?
            .ok_or_else(|| DecodeError::SecretNotFound {
                namespace: self.namespace.clone(),
                name: self.secret.clone(),
            })?;

        Ok(ProxmoxCredentials::from_secret(&secret)?)
    }
}

#[async_trait]
impl Check for ProxmoxApiConnectivity {
    fn name(&self) -> &str {
        "Proxmox API"
    }

    async fn run(&self, ctx: &CheckContext) -> Vec<Outcome> {
        let mut outcomes = Vec::with_capacity(3);

        let credentials = match self.load_credentials(ctx).await {
            Ok(credentials) => credentials,
            Err(e) => {
                outcomes.push(Outcome::fail(format!("Cannot load Proxmox credentials: {e}")));
                return outcomes;
            }
        };
        outcomes.push(Outcome::pass("Proxmox credentials loaded").with_details([
            format!("Endpoint: {}", credentials.endpoint),
            format!("User: {}", credentials.username),
        ]));

        let ticket = match ctx
            .hypervisor
            .authenticate(
                &credentials.endpoint,
                &credentials.username,
                credentials.password(),
            )
            .await
        {
            Ok(ticket) => ticket,
            Err(e) => {
                outcomes.push(Outcome::fail(format!("Proxmox API authentication failed: {e}")));
                return outcomes;
            }
        };
        outcomes.push(Outcome::pass("Proxmox API authentication successful"));

        match ctx.hypervisor.version(&credentials.endpoint, &ticket).await {
            Ok(version) => {
                let mut details = Vec::new();
                if let Some(release) = &version.release {
                    details.push(format!("Release: {release}"));
                }
                if let Some(repoid) = &version.repoid {
                    details.push(format!("Repository id: {repoid}"));
                }
                outcomes.push(
                    Outcome::pass(format!(
                        "Proxmox VE version: {}",
                        version.version.as_deref().unwrap_or("unknown")
                    ))
                    .with_details(details),
                );
            }
            Err(e) => outcomes.push(Outcome::fail(format!("Cannot query Proxmox VE version: {e}"))),
        }

        outcomes
    }
}
