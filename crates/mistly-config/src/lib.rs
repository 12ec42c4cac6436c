//! Configuration for the `mistly` CLI.
//!
//! TOML profiles, credential resolution (env + keyring + plaintext),
//! and translation to `mistly_core::ClientConfig`. The CLI layers its
//! flag overrides on top.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use mistly_core::{ClientConfig, DEFAULT_API_URL, TlsVerification};

/// Keyring service name; entries are keyed `<profile>/token`.
pub const KEYRING_SERVICE: &str = "mistly";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no API token configured for profile '{profile}'")]
    NoCredentials { profile: String },

    #[error("profile '{name}' not found")]
    ProfileNotFound { name: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("keyring error: {0}")]
    Keyring(#[from] keyring::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Config {
    /// Profile used when none is selected.
    pub default_profile: Option<String>,

    #[serde(default)]
    pub defaults: Defaults,

    /// Named organization profiles.
    #[serde(default)]
    pub profiles: BTreeMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: BTreeMap::new(),
        }
    }
}

impl Config {
    /// Look up a profile by name.
    pub fn profile(&self, name: &str) -> Result<&Profile, ConfigError> {
        self.profiles
            .get(name)
            .ok_or_else(|| ConfigError::ProfileNotFound { name: name.into() })
    }

    /// The profile to use when none is given explicitly.
    pub fn default_profile_name(&self) -> &str {
        self.default_profile.as_deref().unwrap_or("default")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,

    /// Per-request timeout, seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
            timeout: default_timeout(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_color() -> String {
    "auto".into()
}
fn default_timeout() -> u64 {
    30
}
fn default_api_url() -> String {
    DEFAULT_API_URL.into()
}

/// A named organization profile.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Profile {
    /// API root; regional clouds use their own host.
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Organization id.
    pub org_id: String,

    /// API token (plaintext, prefer keyring or env var).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    /// Environment variable name containing the API token.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_env: Option<String>,

    /// Mint a short-lived token per run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ephemeral_token: Option<bool>,

    /// Extra CA certificate (TLS-inspecting proxies).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ca_cert: Option<PathBuf>,

    /// Override timeout, seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
}

impl Profile {
    pub fn new(org_id: impl Into<String>) -> Self {
        Self {
            api_url: default_api_url(),
            org_id: org_id.into(),
            token: None,
            token_env: None,
            ephemeral_token: None,
            ca_cert: None,
            timeout: None,
        }
    }
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "mistly", "mistly").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("mistly");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load config from `path`, layered over defaults and under `MIST_`
/// environment overrides (`MIST_DEFAULTS__OUTPUT=json`). A missing file
/// yields the defaults.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("MIST_").split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Load config, returning a default if it cannot be read.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    save_config_to(cfg, &config_path())
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Credential resolution (without CLI flags) ───────────────────────

fn keyring_entry(profile_name: &str) -> Result<keyring::Entry, keyring::Error> {
    keyring::Entry::new(KEYRING_SERVICE, &format!("{profile_name}/token"))
}

/// Resolve an API token from the credential chain (no CLI flag step).
pub fn resolve_token(profile: &Profile, profile_name: &str) -> Result<SecretString, ConfigError> {
    // 1. Profile's token_env → env var lookup
    if let Some(ref env_name) = profile.token_env {
        if let Ok(val) = std::env::var(env_name) {
            return Ok(SecretString::from(val));
        }
    }

    // 2. System keyring
    if let Ok(entry) = keyring_entry(profile_name) {
        if let Ok(secret) = entry.get_password() {
            return Ok(SecretString::from(secret));
        }
    }

    // 3. Plaintext in config
    if let Some(ref token) = profile.token {
        return Ok(SecretString::from(token.clone()));
    }

    Err(ConfigError::NoCredentials {
        profile: profile_name.into(),
    })
}

/// Store a token in the system keyring for `profile_name`.
pub fn store_token(profile_name: &str, token: &str) -> Result<(), ConfigError> {
    keyring_entry(profile_name)?.set_password(token)?;
    Ok(())
}

/// Build a `ClientConfig` from a profile and an already-resolved token.
pub fn profile_to_client_config(
    profile: &Profile,
    token: SecretString,
    default_timeout: u64,
) -> Result<ClientConfig, ConfigError> {
    let api_url: url::Url = profile
        .api_url
        .parse()
        .map_err(|_| ConfigError::Validation {
            field: "api_url".into(),
            reason: format!("invalid URL: {}", profile.api_url),
        })?;

    if profile.org_id.trim().is_empty() {
        return Err(ConfigError::Validation {
            field: "org_id".into(),
            reason: "must not be empty".into(),
        });
    }

    let tls = match profile.ca_cert {
        Some(ref ca_path) => TlsVerification::CustomCa(ca_path.clone()),
        None => TlsVerification::SystemDefaults,
    };

    Ok(ClientConfig {
        api_url,
        token,
        org_id: profile.org_id.clone(),
        ephemeral_token: profile.ephemeral_token.unwrap_or(false),
        tls,
        timeout: Duration::from_secs(profile.timeout.unwrap_or(default_timeout)),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;
    use secrecy::ExposeSecret;

    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.default_profile_name(), "default");
        assert_eq!(config.defaults.timeout, 30);
        assert!(config.profiles.is_empty());
    }

    #[test]
    fn profiles_round_trip_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        let mut lab = Profile::new("org-123");
        lab.api_url = "https://api.eu.mist.com/api/v1/".into();
        lab.ephemeral_token = Some(true);
        config.profiles.insert("lab".into(), lab);
        config.default_profile = Some("lab".into());

        save_config_to(&config, &path).unwrap();
        let loaded = load_config_from(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn file_values_fill_profile_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "default_profile = \"lab\"\n\n[profiles.lab]\norg_id = \"o1\"\ntimeout = 5\n",
        )
        .unwrap();

        let config = load_config_from(&path).unwrap();
        let lab = config.profile("lab").unwrap();
        assert_eq!(lab.api_url, DEFAULT_API_URL);
        assert_eq!(lab.timeout, Some(5));
        assert!(matches!(
            config.profile("prod"),
            Err(ConfigError::ProfileNotFound { .. })
        ));
    }

    #[test]
    fn plaintext_token_is_last_resort() {
        let mut profile = Profile::new("o1");
        profile.token = Some("plain".into());
        profile.token_env = Some("MISTLY_TEST_TOKEN_THAT_IS_NEVER_SET".into());

        let token = resolve_token(&profile, "mistly-test-no-keyring-entry").unwrap();
        assert_eq!(token.expose_secret(), "plain");
    }

    #[test]
    fn no_token_anywhere_is_an_error() {
        let profile = Profile::new("o1");
        assert!(matches!(
            resolve_token(&profile, "mistly-test-no-keyring-entry"),
            Err(ConfigError::NoCredentials { .. })
        ));
    }

    #[test]
    fn client_config_from_profile() {
        let mut profile = Profile::new("o1");
        profile.ca_cert = Some("/etc/ca.pem".into());
        let config = profile_to_client_config(&profile, "k".to_string().into(), 45).unwrap();

        assert_eq!(config.org_id, "o1");
        assert_eq!(config.timeout, Duration::from_secs(45));
        assert_eq!(config.tls, TlsVerification::CustomCa("/etc/ca.pem".into()));
        assert!(!config.ephemeral_token);
    }

    #[test]
    fn bad_url_and_empty_org_are_rejected() {
        let mut profile = Profile::new("o1");
        profile.api_url = "not a url".into();
        assert!(profile_to_client_config(&profile, "k".to_string().into(), 30).is_err());

        let profile = Profile::new("  ");
        assert!(matches!(
            profile_to_client_config(&profile, "k".to_string().into(), 30),
            Err(ConfigError::Validation { ref field, .. }) if field == "org_id"
        ));
    }
}
