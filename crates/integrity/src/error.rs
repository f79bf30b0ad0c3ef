//! Error taxonomy for the integrity checker.
//!
//! None of these errors ever escape a check: each one is converted into a
//! failing [`Outcome`](crate::outcome::Outcome) by the check that hit it.

use thiserror::Error;

/// Adapter-level failure while talking to the control plane or the
/// Proxmox API.
#[derive(Error, Debug)]
pub enum QueryError {
    /// The query did not complete within its deadline.
    #[error("query timed out after {0} seconds")]
    Timeout(u64),

    /// Kubernetes client error.
    #[error("Kubernetes API error: {0}")]
    Kube(#[from] kube::Error),

    /// HTTP transport error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Remote API answered with a non-success status.
    #[error("API returned status {status}: {message}")]
    Status { status: u16, message: String },

    /// No client could be constructed for the control plane.
    #[error("cluster unavailable: {0}")]
    Unavailable(String),
}

/// A payload (credential secret or API response) did not have the expected
/// shape.
#[derive(Error, Debug)]
pub enum DecodeError {
    /// Secret lookup succeeded but the object does not exist.
    #[error("secret {namespace}/{name} not found")]
    SecretNotFound { namespace: String, name: String },

    /// A required key is absent from the secret data.
    #[error("secret field {0} is missing")]
    MissingField(&'static str),

    /// A secret value is not valid UTF-8 once base64-decoded.
    #[error("secret field {0} is not valid UTF-8")]
    NotUtf8(&'static str),

    /// The endpoint is not a usable URL.
    #[error("invalid Proxmox endpoint '{endpoint}': {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },

    /// Response body could not be parsed.
    #[error("malformed response: {0}")]
    Response(String),
}

/// A successful query returned data the predicate cannot interpret.
#[derive(Error, Debug)]
#[error("unexpected shape for {resource}: {reason}")]
pub struct PredicateError {
    pub resource: String,
    pub reason: String,
}

impl PredicateError {
    pub fn new(resource: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            reason: reason.into(),
        }
    }
}

/// Any failure a check can encounter.
#[derive(Error, Debug)]
pub enum IntegrityError {
    #[error(transparent)]
    Query(#[from] QueryError),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Predicate(#[from] PredicateError),
}

impl From<kube::Error> for IntegrityError {
    fn from(err: kube::Error) -> Self {
        Self::Query(QueryError::Kube(err))
    }
}

impl From<reqwest::Error> for IntegrityError {
    fn from(err: reqwest::Error) -> Self {
        Self::Query(QueryError::Http(err))
    }
}

/// Result alias used across checks.
pub type Result<T, E = IntegrityError> = std::result::Result<T, E>;
