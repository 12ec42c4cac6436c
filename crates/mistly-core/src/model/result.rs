// ── Run results ──
//
// What the workflow observed and did, one entry per resource step, plus
// the summary assembled at the end of the run.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use strum::Display;

use super::entity_id::{EntityId, MacAddress};

/// Kinds of resource step the workflow performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum ResourceKind {
    Site,
    SiteSetting,
    Wlan,
    DeviceClaim,
    DeviceAssignment,
    RadioConfig,
}

/// A resource as observed in the cloud. Transient, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RemoteResource {
    pub kind: ResourceKind,
    /// Natural key: site name, SSID or MAC.
    pub key: String,
    pub id: EntityId,
    /// Every attribute the API returned, untouched.
    pub attributes: Map<String, Value>,
}

/// What to look for, and where.
///
/// Org-scoped lookups use the organization held by the workflow context.
#[derive(Debug, Clone, Copy)]
pub enum Lookup<'a> {
    /// Site by name, in the organization.
    Site { name: &'a str },
    /// WLAN by SSID, in a site.
    Wlan { site_id: &'a EntityId, ssid: &'a str },
    /// Device by MAC, in the organization's claimed inventory.
    ClaimedDevice { mac: &'a MacAddress },
    /// Device by MAC, among the devices assigned to a site.
    SiteDevice {
        site_id: &'a EntityId,
        mac: &'a MacAddress,
    },
}

impl Lookup<'_> {
    pub fn kind(&self) -> ResourceKind {
        match self {
            Self::Site { .. } => ResourceKind::Site,
            Self::Wlan { .. } => ResourceKind::Wlan,
            Self::ClaimedDevice { .. } => ResourceKind::DeviceClaim,
            Self::SiteDevice { .. } => ResourceKind::DeviceAssignment,
        }
    }

    pub fn key(&self) -> String {
        match self {
            Self::Site { name } => (*name).to_owned(),
            Self::Wlan { ssid, .. } => (*ssid).to_owned(),
            Self::ClaimedDevice { mac } | Self::SiteDevice { mac, .. } => mac.to_string(),
        }
    }
}

/// Per-resource outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Outcome {
    Created,
    AlreadyExisted,
    /// An idempotent configuration push was applied.
    Configured,
    /// Plan mode: absent, and would be created.
    WouldCreate,
    Failed { reason: String },
}

impl Outcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Created => f.write_str("created"),
            Self::AlreadyExisted => f.write_str("exists"),
            Self::Configured => f.write_str("configured"),
            Self::WouldCreate => f.write_str("would create"),
            Self::Failed { .. } => f.write_str("failed"),
        }
    }
}

/// Outcome of one resource step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvisioningResult {
    pub kind: ResourceKind,
    pub key: String,
    /// Cloud-assigned identifier, when known.
    pub remote_id: Option<EntityId>,
    #[serde(flatten)]
    pub outcome: Outcome,
}

impl ProvisioningResult {
    pub fn new(kind: ResourceKind, key: impl Into<String>, outcome: Outcome) -> Self {
        Self {
            kind,
            key: key.into(),
            remote_id: None,
            outcome,
        }
    }

    pub fn failed(kind: ResourceKind, key: impl Into<String>, reason: impl fmt::Display) -> Self {
        Self::new(
            kind,
            key,
            Outcome::Failed {
                reason: reason.to_string(),
            },
        )
    }

    #[must_use]
    pub fn with_id(mut self, id: Option<EntityId>) -> Self {
        self.remote_id = id;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum RunMode {
    Provision,
    Plan,
}

/// Category of the error that stopped a run early.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HaltCause {
    Cancelled,
    Authentication,
    /// No response from the cloud at all.
    Unreachable,
    Failure,
}

/// Why a run stopped before finishing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Halt {
    pub cause: HaltCause,
    pub reason: String,
}

/// Tally of outcomes across a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeCounts {
    pub created: usize,
    pub already_existed: usize,
    pub configured: usize,
    pub would_create: usize,
    pub failed: usize,
}

/// Everything a run did, in execution order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub mode: RunMode,
    pub site: String,
    pub results: Vec<ProvisioningResult>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Why the run stopped early, if it did.
    pub halted: Option<Halt>,
}

impl RunSummary {
    pub fn counts(&self) -> OutcomeCounts {
        let mut counts = OutcomeCounts::default();
        for result in &self.results {
            match result.outcome {
                Outcome::Created => counts.created += 1,
                Outcome::AlreadyExisted => counts.already_existed += 1,
                Outcome::Configured => counts.configured += 1,
                Outcome::WouldCreate => counts.would_create += 1,
                Outcome::Failed { .. } => counts.failed += 1,
            }
        }
        counts
    }

    /// True when nothing failed and the run was not cut short.
    pub fn is_success(&self) -> bool {
        self.halted.is_none() && !self.results.iter().any(|r| r.outcome.is_failure())
    }

    pub fn duration(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }
}
