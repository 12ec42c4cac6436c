// ── Desired state ──
//
// The on-disk document deserializes into `DesiredStateDocument`, a loose
// mirror of the file. `DesiredState` is the validated form the workflow
// runs on; the only way to obtain one is through `TryFrom`, so every
// check below runs exactly once, at load time.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::entity_id::MacAddress;
use super::radio::RadioSpec;
use crate::error::CoreError;

/// Longest SSID the 802.11 element can carry, in bytes.
pub const MAX_SSID_BYTES: usize = 32;

/// WPA2 passphrase bounds, in characters.
pub const PSK_LENGTH: std::ops::RangeInclusive<usize> = 8..=63;

// ── Site ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SiteSpec {
    pub name: String,
    #[serde(default)]
    pub address: String,
    pub timezone: String,
    pub country_code: String,
    pub lat: f64,
    pub lng: f64,
}

// ── WLAN ────────────────────────────────────────────────────────────

/// Bands a WLAN is broadcast on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
pub enum WlanBand {
    #[serde(rename = "24")]
    #[strum(serialize = "24")]
    Band24,
    #[serde(rename = "5")]
    #[strum(serialize = "5")]
    Band5,
    #[serde(rename = "6")]
    #[strum(serialize = "6")]
    Band6,
    #[serde(rename = "both")]
    #[strum(serialize = "both")]
    Both,
}

/// WLAN authentication.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum WlanSecurity {
    Open,
    Psk { psk: String },
}

impl fmt::Debug for WlanSecurity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open => f.write_str("Open"),
            Self::Psk { .. } => f.write_str("Psk { psk: [REDACTED] }"),
        }
    }
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
#[allow(clippy::struct_excessive_bools)]
pub struct WlanSpec {
    pub ssid: String,
    pub band: WlanBand,
    pub security: WlanSecurity,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub hide_ssid: bool,
    #[serde(default = "default_true")]
    pub hostname_ie: bool,
}

// ── Device ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceSpec {
    pub mac: MacAddress,
    pub name: String,
    pub claim_code: String,
    pub radio: RadioSpec,
}

/// Device entry as written in the document; the MAC is still raw text.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeviceDocument {
    pub mac: String,
    pub name: String,
    pub claim_code: String,
    #[serde(default)]
    pub radio: RadioSpec,
}

// ── Document ────────────────────────────────────────────────────────

/// Raw desired-state file, before validation.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DesiredStateDocument {
    pub site: SiteSpec,
    #[serde(default)]
    pub wlans: Vec<WlanSpec>,
    #[serde(default)]
    pub devices: Vec<DeviceDocument>,
}

/// One site's validated desired configuration. Immutable for the run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "DesiredStateDocument")]
pub struct DesiredState {
    pub site: SiteSpec,
    pub wlans: Vec<WlanSpec>,
    pub devices: Vec<DeviceSpec>,
}

impl TryFrom<DesiredStateDocument> for DesiredState {
    type Error = CoreError;

    fn try_from(doc: DesiredStateDocument) -> Result<Self, Self::Error> {
        let mut problems = Vec::new();

        let site = validate_site(doc.site, &mut problems);

        let mut ssids = HashSet::new();
        for wlan in &doc.wlans {
            validate_wlan(wlan, &mut problems);
            if !ssids.insert(wlan.ssid.as_str()) {
                problems.push(format!("duplicate SSID {:?}", wlan.ssid));
            }
        }

        let mut macs = HashSet::new();
        let mut devices = Vec::with_capacity(doc.devices.len());
        for device in doc.devices {
            if let Some(spec) = validate_device(device, &mut problems) {
                if macs.insert(spec.mac.clone()) {
                    devices.push(spec);
                } else {
                    problems.push(format!("duplicate device MAC {}", spec.mac));
                }
            }
        }

        if problems.is_empty() {
            Ok(Self {
                site,
                wlans: doc.wlans,
                devices,
            })
        } else {
            Err(CoreError::ValidationFailed {
                message: problems.join("; "),
            })
        }
    }
}

fn validate_site(mut site: SiteSpec, problems: &mut Vec<String>) -> SiteSpec {
    if site.name.trim().is_empty() {
        problems.push("site name must not be empty".into());
    }
    if site.timezone.trim().is_empty() {
        problems.push(format!("site {:?}: timezone must not be empty", site.name));
    }
    if site.country_code.len() == 2 && site.country_code.chars().all(|c| c.is_ascii_alphabetic())
    {
        site.country_code = site.country_code.to_ascii_uppercase();
    } else {
        problems.push(format!(
            "site {:?}: country code {:?} must be two letters",
            site.name, site.country_code
        ));
    }
    if !(-90.0..=90.0).contains(&site.lat) {
        problems.push(format!("site {:?}: latitude {} out of range", site.name, site.lat));
    }
    if !(-180.0..=180.0).contains(&site.lng) {
        problems.push(format!("site {:?}: longitude {} out of range", site.name, site.lng));
    }
    site
}

fn validate_wlan(wlan: &WlanSpec, problems: &mut Vec<String>) {
    if wlan.ssid.is_empty() {
        problems.push("WLAN SSID must not be empty".into());
    } else if wlan.ssid.len() > MAX_SSID_BYTES {
        problems.push(format!(
            "WLAN {:?}: SSID longer than {MAX_SSID_BYTES} bytes",
            wlan.ssid
        ));
    }
    if let WlanSecurity::Psk { psk } = &wlan.security {
        if !PSK_LENGTH.contains(&psk.chars().count()) {
            problems.push(format!(
                "WLAN {:?}: passphrase must be {}-{} characters",
                wlan.ssid,
                PSK_LENGTH.start(),
                PSK_LENGTH.end()
            ));
        }
    }
}

fn validate_device(doc: DeviceDocument, problems: &mut Vec<String>) -> Option<DeviceSpec> {
    let before = problems.len();

    let mac = match MacAddress::parse(&doc.mac) {
        Ok(mac) => Some(mac),
        Err(e) => {
            problems.push(format!("device {:?}: {e}", doc.name));
            None
        }
    };
    if doc.claim_code.trim().is_empty() {
        problems.push(format!("device {:?}: claim code must not be empty", doc.name));
    }
    for (band, radio) in doc.radio.bands() {
        problems.extend(
            radio
                .problems(band)
                .into_iter()
                .map(|p| format!("device {:?} {band}: {p}", doc.name)),
        );
    }
    let mac = mac?;
    (problems.len() == before).then(|| DeviceSpec {
        mac,
        name: doc.name,
        claim_code: doc.claim_code,
        radio: doc.radio,
    })
}
