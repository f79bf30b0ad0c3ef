//! Proxmox VE API client.
//!
//! API Documentation: <https://pve.proxmox.com/pve-docs/api-viewer/>
//!
//! Proxmox endpoints commonly serve self-signed certificates, so certificate
//! validation is disabled for this client.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::COOKIE;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::HypervisorApi;
use crate::error::{DecodeError, IntegrityError, QueryError};

/// Ticket endpoint, relative to the API base.
const TICKET_PATH: &str = "/api2/json/access/ticket";

/// Version endpoint, relative to the API base.
const VERSION_PATH: &str = "/api2/json/version";

/// Header carrying the CSRF token on authenticated requests.
const CSRF_HEADER: &str = "CSRFPreventionToken";

/// Standard `{"data": ...}` response wrapper.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: Option<T>,
}

/// Body of a successful ticket response.
#[derive(Deserialize)]
struct TicketData {
    ticket: String,
    #[serde(rename = "CSRFPreventionToken")]
    csrf_prevention_token: String,
}

/// Authentication ticket for follow-up requests.
#[derive(Clone)]
pub struct Ticket {
    pub ticket: String,
    pub csrf_prevention_token: String,
}

impl fmt::Debug for Ticket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ticket")
            .field("ticket", &"<redacted>")
            .field("csrf_prevention_token", &"<redacted>")
            .finish()
    }
}

/// Version information from `GET /version`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PveVersion {
    pub version: Option<String>,
    pub release: Option<String>,
    pub repoid: Option<String>,
}

/// `HypervisorApi` implementation over HTTPS.
#[derive(Clone)]
pub struct ProxmoxClient {
    http: Client,
    auth_timeout: Duration,
    version_timeout: Duration,
}

impl ProxmoxClient {
    /// Create a new Proxmox API client.
    ///
    /// # Errors
    /// Returns error if HTTP client cannot be created.
    pub fn new(auth_timeout: Duration, version_timeout: Duration) -> Result<Self, QueryError> {
        let http = Client::builder()
            .user_agent(concat!("proxmox-integrity/", env!("CARGO_PKG_VERSION")))
            .danger_accept_invalid_certs(true)
            .build()?;

        Ok(Self {
            http,
            auth_timeout,
            version_timeout,
        })
    }

    /// Send a request and decode the `data` field of a JSON response.
    async fn send<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        timeout: Duration,
    ) -> Result<Option<T>, IntegrityError> {
        let response = request
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| transport_error(e, timeout))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| transport_error(e, timeout))?;

        if !status.is_success() {
            return Err(QueryError::Status {
                status: status.as_u16(),
                message: text.trim().to_string(),
            }
            .into());
        }

        let envelope: Envelope<T> = serde_json::from_str(&text).map_err(|e| {
            warn!(error = %e, "Failed to parse Proxmox response");
            DecodeError::Response(e.to_string())
        })?;

        Ok(envelope.data)
    }
}

#[async_trait]
impl HypervisorApi for ProxmoxClient {
    async fn authenticate(
        &self,
        endpoint: &str,
        username: &str,
        password: &str,
    ) -> Result<Ticket, IntegrityError> {
        let url = api_url(endpoint, TICKET_PATH);
        debug!(url = %url, username, "Requesting Proxmox ticket");

        let request = self
            .http
            .post(&url)
            .form(&[("username", username), ("password", password)]);

        let data: TicketData = self
            .send(request, self.auth_timeout)
            .await?
            .ok_or_else(|| DecodeError::Response("ticket response has no data".to_string()))?;

        Ok(Ticket {
            ticket: data.ticket,
            csrf_prevention_token: data.csrf_prevention_token,
        })
    }

    async fn version(&self, endpoint: &str, ticket: &Ticket) -> Result<PveVersion, IntegrityError> {
        let url = api_url(endpoint, VERSION_PATH);
        debug!(url = %url, "Requesting Proxmox version");

        let request = self
            .http
            .get(&url)
            .header(COOKIE, format!("PVEAuthCookie={}", ticket.ticket))
            .header(CSRF_HEADER, &ticket.csrf_prevention_token);

        self.send(request, self.version_timeout)
            .await?
            .ok_or_else(|| DecodeError::Response("version response has no data".to_string()).into())
    }
}

/// Join an API path onto the configured endpoint.
fn api_url(endpoint: &str, path: &str) -> String {
    format!("{}{path}", endpoint.trim_end_matches('/'))
}

fn transport_error(err: reqwest::Error, timeout: Duration) -> QueryError {
    if err.is_timeout() {
        QueryError::Timeout(timeout.as_secs())
    } else {
        QueryError::Http(err)
    }
}
