//! Proxmox credentials stored in the provider's secret.

use std::collections::BTreeMap;
use std::fmt;

use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::ByteString;
use url::Url;

use crate::error::DecodeError;

pub const ENDPOINT_KEY: &str = "PROXMOX_ENDPOINT";
pub const USER_KEY: &str = "PROXMOX_USER";
pub const PASSWORD_KEY: &str = "PROXMOX_PASSWORD";

/// Decoded Proxmox API credentials.
#[derive(Clone)]
pub struct ProxmoxCredentials {
    /// API base URL without trailing slash (e.g. `https://pve:8006`).
    pub endpoint: String,
    pub username: String,
    password: String,
}

impl ProxmoxCredentials {
    /// Decode credentials from the secret's data.
    ///
    /// Secret values arrive base64-encoded on the wire; `ByteString` has
    /// already decoded them, so this only checks presence, UTF-8 and the
    /// endpoint URL.
    ///
    /// # Errors
    ///
    /// Returns a [`DecodeError`] naming the first field that is missing or
    /// malformed.
    pub fn from_secret(secret: &Secret) -> Result<Self, DecodeError> {
        let empty = BTreeMap::new();
        let data = secret.data.as_ref().unwrap_or(&empty);

        // Secrets created with `echo` carry a trailing newline
        let endpoint = field(data, ENDPOINT_KEY)?.trim().to_string();
        let username = field(data, USER_KEY)?.trim().to_string();
        let password = field(data, PASSWORD_KEY)?;

        Ok(Self {
            endpoint: validate_endpoint(&endpoint)?,
            username,
            password,
        })
    }

    #[must_use]
    pub fn password(&self) -> &str {
        &self.password
    }
}

impl fmt::Debug for ProxmoxCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProxmoxCredentials")
            .field("endpoint", &self.endpoint)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

fn field(data: &BTreeMap<String, ByteString>, key: &'static str) -> Result<String, DecodeError> {
    let bytes = data.get(key).ok_or(DecodeError::MissingField(key))?;
    let value = std::str::from_utf8(&bytes.0).map_err(|_| DecodeError::NotUtf8(key))?;
    if value.trim().is_empty() {
        return Err(DecodeError::MissingField(key));
    }

    Ok(value.to_string())
}

fn validate_endpoint(endpoint: &str) -> Result<String, DecodeError> {
    let invalid = |reason: String| DecodeError::InvalidEndpoint {
        endpoint: endpoint.to_string(),
        reason,
    };

    let url = Url::parse(endpoint).map_err(|e| invalid(e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme {}", url.scheme())));
    }
    if url.host_str().is_none() {
        return Err(invalid("missing host".to_string()));
    }

    Ok(endpoint.trim_end_matches('/').to_string())
}
