//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` variants into user-facing errors
//! with actionable help text and stable exit codes.

use miette::Diagnostic;
use thiserror::Error;

use mistly_config::ConfigError;
use mistly_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not reach the Mist API at {url}: {reason}")]
    #[diagnostic(
        code(mistly::connection_failed),
        help(
            "Check network access and the API URL for your region.\n\
             URL: {url}\n\
             Regional clouds use their own host, e.g. https://api.eu.mist.com/api/v1/"
        )
    )]
    ConnectionFailed { url: String, reason: String },

    // ── Authentication ───────────────────────────────────────────────
    #[error("Authentication failed: {message}")]
    #[diagnostic(
        code(mistly::auth_failed),
        help(
            "Verify the API token and that it has write access to the organization.\n\
             Store a new one with: mistly config set-token"
        )
    )]
    AuthFailed { message: String },

    #[error("No API token configured for profile '{profile}'")]
    #[diagnostic(
        code(mistly::no_credentials),
        help(
            "Configure credentials with: mistly config init\n\
             Or set the MIST_TOKEN environment variable."
        )
    )]
    NoCredentials { profile: String },

    // ── Desired state ────────────────────────────────────────────────
    #[error("Cannot read desired state from {path}")]
    #[diagnostic(code(mistly::document))]
    Document {
        path: String,
        #[help]
        reason: String,
    },

    #[error("Invalid desired state")]
    #[diagnostic(code(mistly::invalid_state))]
    InvalidState {
        #[help]
        problems: String,
    },

    // ── Run outcome ──────────────────────────────────────────────────
    #[error("Provisioning incomplete: {failed} step(s) failed")]
    #[diagnostic(
        code(mistly::run_failed),
        help("Fix the reported failures and run the same file again; existing resources are skipped.")
    )]
    RunFailed { failed: usize },

    #[error("Provisioning halted: {reason}")]
    #[diagnostic(
        code(mistly::run_halted),
        help("Resources created before the halt remain. Re-run once the cause is fixed.")
    )]
    RunHalted { reason: String },

    #[error("Deadline of {deadline} exceeded")]
    #[diagnostic(
        code(mistly::deadline),
        help("Resources created before the deadline remain. Raise --deadline or re-run.")
    )]
    DeadlineExceeded { deadline: String },

    #[error("Interrupted")]
    #[diagnostic(code(mistly::interrupted))]
    Interrupted,

    #[error("{message}")]
    #[diagnostic(code(mistly::api_error))]
    Api { message: String },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(mistly::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(mistly::profile_not_found),
        help(
            "Available profiles: {available}\n\
             Create one with: mistly config init"
        )
    )]
    ProfileNotFound { name: String, available: String },

    #[error("No organization configured")]
    #[diagnostic(
        code(mistly::no_config),
        help(
            "Create a profile with: mistly config init\n\
             Or pass --org / MIST_ORG_ID and --token / MIST_TOKEN.\n\
             Config file: {path}"
        )
    )]
    NoConfig { path: String },

    #[error(transparent)]
    #[diagnostic(code(mistly::config))]
    Config(Box<figment::Error>),

    #[error("Keyring error: {0}")]
    #[diagnostic(code(mistly::keyring))]
    Keyring(String),

    // ── IO / Serialization ───────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Failed to write config: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("Failed to render JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to render YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl From<figment::Error> for CliError {
    fn from(err: figment::Error) -> Self {
        Self::Config(Box::new(err))
    }
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::AuthFailed { .. } | Self::NoCredentials { .. } => exit_code::AUTH,
            Self::DeadlineExceeded { .. } => exit_code::TIMEOUT,
            Self::Document { .. }
            | Self::InvalidState { .. }
            | Self::Validation { .. }
            | Self::ProfileNotFound { .. }
            | Self::NoConfig { .. }
            | Self::Config(_) => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Authentication { message } => Self::AuthFailed { message },
            CoreError::ConnectionFailed { url, reason } => Self::ConnectionFailed { url, reason },
            CoreError::ValidationFailed { message } => Self::InvalidState {
                problems: message.split("; ").collect::<Vec<_>>().join("\n"),
            },
            CoreError::Config { message } => Self::Validation {
                field: "config".into(),
                reason: message,
            },
            CoreError::Cancelled => Self::Interrupted,
            other => Self::Api {
                message: other.to_string(),
            },
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => Self::Validation { field, reason },
            ConfigError::NoCredentials { profile } => Self::NoCredentials { profile },
            ConfigError::ProfileNotFound { name } => Self::ProfileNotFound {
                name,
                available: String::new(),
            },
            ConfigError::Serialization(e) => Self::TomlSer(e),
            ConfigError::Figment(e) => Self::Config(e),
            ConfigError::Keyring(e) => Self::Keyring(e.to_string()),
            ConfigError::Io(e) => Self::Io(e),
        }
    }
}
