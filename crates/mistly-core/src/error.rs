// ── Core error types ──
//
// Workflow-level errors from mistly-core. These are NOT API-specific:
// consumers never see reqwest types or raw JSON failures. A resolver miss
// is `Ok(None)`, never an error.

use thiserror::Error;

use crate::model::{Halt, HaltCause, ResourceKind};

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Remote call failures ─────────────────────────────────────────
    /// A read or write could not complete: non-2xx response or no
    /// response at all.
    #[error("{kind} request failed: {source}")]
    Transport {
        kind: ResourceKind,
        #[source]
        source: mistly_api::Error,
    },

    /// A create, assign or claim call was refused after the resource was
    /// confirmed absent.
    #[error("{kind} provisioning failed{}: {reason}", fmt_status(*status))]
    Provisioning {
        kind: ResourceKind,
        status: Option<u16>,
        reason: String,
    },

    /// The claim endpoint answered with a body that is neither a clean
    /// add, a duplicate, nor a rejection.
    #[error("Ambiguous claim outcome: {body}")]
    AmbiguousClaimOutcome { body: String },

    #[error("Operation cancelled")]
    Cancelled,

    // ── Setup errors ─────────────────────────────────────────────────
    #[error("Validation failed: {message}")]
    ValidationFailed { message: String },

    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    #[error("Cannot reach {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

fn fmt_status(status: Option<u16>) -> String {
    status.map(|s| format!(" (HTTP {s})")).unwrap_or_default()
}

impl CoreError {
    /// Wrap an API error raised while working on `kind`.
    ///
    /// Authentication failures are lifted out of the per-resource bucket:
    /// a rejected token fails every later call too.
    pub fn from_api(kind: ResourceKind, err: mistly_api::Error) -> Self {
        match err {
            mistly_api::Error::Authentication { message } => Self::Authentication { message },
            other => Self::Transport {
                kind,
                source: other,
            },
        }
    }

    /// Wrap an API error from a create, claim or assign call.
    ///
    /// A refusal carrying an HTTP status becomes `Provisioning`; anything
    /// that never produced a response stays `Transport`.
    pub fn from_write(kind: ResourceKind, err: mistly_api::Error) -> Self {
        match err {
            mistly_api::Error::Api { status, message } => Self::Provisioning {
                kind,
                status: Some(status),
                reason: message,
            },
            other => Self::from_api(kind, other),
        }
    }

    /// Whether this error ends the whole run rather than one resource.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Cancelled | Self::Authentication { .. } | Self::Config { .. }
        )
    }

    /// Remote HTTP status, when the failure carried one.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Transport { source, .. } => source.status(),
            Self::Provisioning { status, .. } => *status,
            Self::Authentication { .. } => Some(401),
            _ => None,
        }
    }
}

impl From<&CoreError> for Halt {
    fn from(err: &CoreError) -> Self {
        let cause = match err {
            CoreError::Cancelled => HaltCause::Cancelled,
            CoreError::Authentication { .. } => HaltCause::Authentication,
            CoreError::ConnectionFailed { .. } => HaltCause::Unreachable,
            CoreError::Transport {
                source: mistly_api::Error::Transport(e),
                ..
            } if e.is_connect() || e.is_timeout() => HaltCause::Unreachable,
            _ => HaltCause::Failure,
        };
        Self {
            cause,
            reason: err.to_string(),
        }
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

/// Setup-time conversion (client construction, token minting), where no
/// resource kind is in play.
impl From<mistly_api::Error> for CoreError {
    fn from(err: mistly_api::Error) -> Self {
        match err {
            mistly_api::Error::Authentication { message } => Self::Authentication { message },
            mistly_api::Error::InvalidToken { reason } => Self::Authentication {
                message: format!("Invalid API token: {reason}"),
            },
            mistly_api::Error::Transport(ref e) if e.is_connect() || e.is_timeout() => {
                Self::ConnectionFailed {
                    url: e
                        .url()
                        .map(ToString::to_string)
                        .unwrap_or_else(|| "<unknown>".into()),
                    reason: e.to_string(),
                }
            }
            mistly_api::Error::Tls(reason) => Self::ConnectionFailed {
                url: String::new(),
                reason: format!("TLS error: {reason}"),
            },
            mistly_api::Error::InvalidUrl(e) => Self::Config {
                message: format!("Invalid URL: {e}"),
            },
            mistly_api::Error::Deserialization { message, body: _ } => {
                Self::Internal(format!("Deserialization error: {message}"))
            }
            other => Self::Internal(other.to_string()),
        }
    }
}
