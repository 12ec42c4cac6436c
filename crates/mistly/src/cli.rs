//! Clap derive structures for the `mistly` CLI.
//!
//! Defines the command tree, global flags, and shared value enums.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// mistly -- idempotent site provisioning for the Mist cloud
#[derive(Debug, Parser)]
#[command(
    name = "mistly",
    version,
    about = "Provision Mist sites, WLANs and access points from a desired-state file",
    long_about = "Reads a desired-state document for one site and brings the Mist cloud\n\
        in line with it: the site, its settings, WLANs, device claims,\n\
        site assignments and radio settings, in dependency order.\n\n\
        Every step checks for an existing resource first, so re-running\n\
        the same file only creates what is still missing.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Organization profile to use
    #[arg(long, short = 'p', env = "MIST_PROFILE", global = true)]
    pub profile: Option<String>,

    /// API root URL (overrides profile)
    #[arg(long, env = "MIST_API_URL", global = true)]
    pub api_url: Option<String>,

    /// Organization id (overrides profile)
    #[arg(long = "org", env = "MIST_ORG_ID", global = true)]
    pub org_id: Option<String>,

    /// API token
    #[arg(long, env = "MIST_TOKEN", global = true, hide_env_values = true)]
    pub token: Option<String>,

    /// Mint a short-lived token for the run and revoke it afterwards
    #[arg(long, global = true)]
    pub ephemeral_token: bool,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "MIST_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Request timeout in seconds (overrides profile)
    #[arg(long, env = "MIST_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one result per line (scripting)
    Plain,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Create whatever the desired state names that does not exist yet
    #[command(alias = "apply")]
    Provision(ProvisionArgs),

    /// Show what `provision` would do, without writing anything
    #[command(alias = "diff")]
    Plan(PlanArgs),

    /// Manage CLI configuration and profiles
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Provisioning ─────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ProvisionArgs {
    /// Desired-state document (.json, .yaml/.yml or .toml)
    pub file: PathBuf,

    /// Cancel the run after this long (e.g. "90s", "5m")
    #[arg(long, value_parser = humantime::parse_duration)]
    pub deadline: Option<Duration>,
}

#[derive(Debug, Args)]
pub struct PlanArgs {
    /// Desired-state document (.json, .yaml/.yml or .toml)
    pub file: PathBuf,
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Create initial config file with guided setup
    Init,

    /// Display current configuration
    Show,

    /// Set a configuration value on the active profile
    Set {
        /// Profile key (api_url, org_id, token_env, ephemeral_token, timeout, ca_cert)
        key: String,

        /// Value to set
        value: String,
    },

    /// List configured profiles
    Profiles,

    /// Set the default profile
    Use {
        /// Profile name
        name: String,
    },

    /// Store the API token in the system keyring
    SetToken {
        /// Profile name (defaults to the active profile)
        #[arg(long)]
        profile: Option<String>,
    },

    /// Print the config file path
    Path,
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
