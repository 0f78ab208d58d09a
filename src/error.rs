//! Error types shared by the AWS client layer and the probers.

use crate::aws::error::ApiError;
use thiserror::Error;

/// Everything that can go wrong while probing a resource.
///
/// A resource that does not exist is *not* an error: probers turn a
/// confirmed absence into [`ProbeResult::not_found`](crate::probe::ProbeResult::not_found).
#[derive(Debug, Error)]
pub enum ProbeError {
    /// The normalized type key has no registered prober.
    #[error("unsupported resource type: {0}")]
    UnsupportedType(String),

    /// The vendor answered with an error response.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// The request never produced a response (DNS, TLS, connection reset).
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The vendor reported success but the body could not be interpreted.
    #[error("malformed {service} response: {detail}")]
    MalformedResponse {
        service: &'static str,
        detail: String,
    },

    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),

    /// No provider in the chain had credentials to offer.
    #[error("no AWS credentials configured")]
    MissingCredentials,

    /// A credentials provider was found but failed (expired SSO session,
    /// unreachable IMDS, bad assume-role config).
    #[error("failed to load AWS credentials: {0}")]
    Credentials(String),

    /// The request could not be put into canonical form for signing.
    #[error("failed to sign request: {0}")]
    Signing(String),

    #[error("probe cancelled")]
    Cancelled,

    #[error("probe deadline exceeded")]
    DeadlineExceeded,
}

impl ProbeError {
    pub(crate) fn malformed(service: &'static str, detail: impl Into<String>) -> Self {
        Self::MalformedResponse {
            service,
            detail: detail.into(),
        }
    }
}

pub type Result<T, E = ProbeError> = std::result::Result<T, E>;
