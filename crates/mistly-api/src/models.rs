// Mist API wire types
//
// Response types keep the handful of fields the workflow reads and stash
// everything else in `extra`, so callers still see the raw attributes.
// Request payloads are strict: they serialize exactly what the endpoint
// expects and nothing more.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ── Responses ────────────────────────────────────────────────────────

/// A site, from `GET orgs/{org}/sites` or `POST orgs/{org}/sites`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Site {
    pub id: String,
    pub name: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A WLAN profile, from `GET sites/{site}/wlans`.
///
/// Template-derived WLANs can come back without an SSID.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Wlan {
    pub id: String,
    #[serde(default)]
    pub ssid: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// An entry of the org's claimed inventory, from
/// `GET installer/orgs/{org}/devices`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct InventoryDevice {
    pub mac: String,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub site_id: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A device assigned to a site, from `GET sites/{site}/devices`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SiteDevice {
    pub id: String,
    pub mac: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Body of `POST orgs/{org}/inventory`.
///
/// The endpoint answers 200 for every claim attempt and reports the
/// outcome through which of these arrays are populated.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ClaimResponse {
    /// Claim codes that were added.
    #[serde(default)]
    pub added: Vec<Value>,
    /// Claim codes already present in this org.
    #[serde(default)]
    pub duplicated: Vec<Value>,
    /// Claim codes that were rejected.
    #[serde(default)]
    pub error: Vec<Value>,
    /// Devices added to the inventory (objects with `mac`, `serial`, ...).
    #[serde(default)]
    pub inventory_added: Vec<Value>,
    /// Devices that were already in the inventory.
    #[serde(default)]
    pub inventory_duplicated: Vec<Value>,
    /// Human-readable reasons, parallel to `error`.
    #[serde(default)]
    pub reason: Vec<String>,
}

// ── Requests ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

/// Body of `POST orgs/{org}/sites`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteCreate {
    pub name: String,
    pub timezone: String,
    pub country_code: String,
    pub address: String,
    pub latlng: LatLng,
}

/// Body of `PUT sites/{site}/setting`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteSetting {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub persist_config_on_device: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WlanAuth {
    #[serde(rename = "type")]
    pub auth_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub psk: Option<String>,
}

/// Body of `POST sites/{site}/wlans`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[allow(clippy::struct_excessive_bools)]
pub struct WlanCreate {
    pub ssid: String,
    pub band: String,
    pub enabled: bool,
    pub hide_ssid: bool,
    pub hostname_ie: bool,
    pub apply_to: String,
    pub auth: WlanAuth,
}

/// Body of `PUT installer/orgs/{org}/devices/{mac}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceAssignment {
    pub name: String,
    pub site_id: String,
}

/// Per-band radio settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BandConfig {
    pub channel: u16,
    pub power: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bandwidth: Option<u16>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RadioConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub band_24: Option<BandConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub band_5: Option<BandConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub band_6: Option<BandConfig>,
}

/// Body of `PUT sites/{site}/devices/{device}` when pushing radio settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceRadioUpdate {
    pub radio_config: RadioConfig,
}
