// ── Runtime connection configuration ──
//
// These types describe *how* to reach the Mist cloud. They carry
// credential data and connection tuning, but never touch disk.
// The CLI constructs a `ClientConfig` and hands it in.

use std::time::Duration;

use secrecy::SecretString;
use url::Url;

use mistly_api::transport::{TlsMode, TransportConfig};

/// Default cloud API root.
pub const DEFAULT_API_URL: &str = mistly_api::DEFAULT_BASE_URL;

/// TLS verification strategy.
///
/// The cloud presents publicly trusted certificates, so the only
/// alternative to the system store is an extra CA (for TLS-inspecting
/// proxies). Verification is never disabled.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// System CA store.
    #[default]
    SystemDefaults,
    /// Additional CA certificate file.
    CustomCa(std::path::PathBuf),
}

/// Configuration for one provisioning run against one organization.
///
/// Built by the CLI, passed to `WorkflowContext::open`. Core never reads
/// config files.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// API root (e.g. `https://api.mist.com/api/v1/`).
    pub api_url: Url,
    /// Long-lived API token.
    pub token: SecretString,
    /// Organization all org-scoped calls are made against.
    pub org_id: String,
    /// Mint a short-lived token for the run and revoke it afterwards.
    pub ephemeral_token: bool,
    pub tls: TlsVerification,
    /// Per-request HTTP timeout.
    pub timeout: Duration,
}

impl ClientConfig {
    /// Configuration with default URL, TLS and timeout.
    pub fn new(org_id: impl Into<String>, token: SecretString) -> Result<Self, url::ParseError> {
        Ok(Self {
            api_url: Url::parse(DEFAULT_API_URL)?,
            token,
            org_id: org_id.into(),
            ephemeral_token: false,
            tls: TlsVerification::default(),
            timeout: Duration::from_secs(30),
        })
    }

    pub(crate) fn transport(&self) -> TransportConfig {
        TransportConfig {
            tls: match &self.tls {
                TlsVerification::SystemDefaults => TlsMode::System,
                TlsVerification::CustomCa(path) => TlsMode::CustomCa(path.clone()),
            },
            timeout: self.timeout,
        }
    }
}
