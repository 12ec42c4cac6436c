// ── Domain/API conversions ──
//
// Specs become the typed request payloads `mistly-api` sends; API
// response types become `RemoteResource`s carrying their natural key.

use mistly_api::models::{
    BandConfig, DeviceAssignment, DeviceRadioUpdate, InventoryDevice, LatLng, RadioConfig, Site,
    SiteCreate, SiteDevice, SiteSetting, Wlan, WlanAuth, WlanCreate,
};

use crate::model::{
    BandRadio, DeviceSpec, EntityId, MacAddress, RadioBand, RemoteResource, ResourceKind,
    SiteSpec, WlanSecurity, WlanSpec,
};

// ── Spec → payload ──────────────────────────────────────────────────

impl From<&SiteSpec> for SiteCreate {
    fn from(spec: &SiteSpec) -> Self {
        Self {
            name: spec.name.clone(),
            timezone: spec.timezone.clone(),
            country_code: spec.country_code.clone(),
            address: spec.address.clone(),
            latlng: LatLng {
                lat: spec.lat,
                lng: spec.lng,
            },
        }
    }
}

impl From<&WlanSpec> for WlanCreate {
    fn from(spec: &WlanSpec) -> Self {
        let auth = match &spec.security {
            WlanSecurity::Open => WlanAuth {
                auth_type: "open".into(),
                psk: None,
            },
            WlanSecurity::Psk { psk } => WlanAuth {
                auth_type: "psk".into(),
                psk: Some(psk.clone()),
            },
        };
        Self {
            ssid: spec.ssid.clone(),
            band: spec.band.to_string(),
            enabled: spec.enabled,
            hide_ssid: spec.hide_ssid,
            hostname_ie: spec.hostname_ie,
            apply_to: "site".into(),
            auth,
        }
    }
}

/// Settings document pushed to every provisioned site.
pub fn persist_config_setting() -> SiteSetting {
    SiteSetting {
        persist_config_on_device: Some(true),
    }
}

pub fn device_assignment(spec: &DeviceSpec, site_id: &EntityId) -> DeviceAssignment {
    DeviceAssignment {
        name: spec.name.clone(),
        site_id: site_id.to_string(),
    }
}

/// Radio update touching a single band.
pub fn radio_update(band: RadioBand, radio: BandRadio) -> DeviceRadioUpdate {
    let config = BandConfig {
        channel: radio.channel,
        power: radio.power,
        bandwidth: radio.bandwidth,
    };
    let mut radio_config = RadioConfig::default();
    match band {
        RadioBand::Band24 => radio_config.band_24 = Some(config),
        RadioBand::Band5 => radio_config.band_5 = Some(config),
        RadioBand::Band6 => radio_config.band_6 = Some(config),
    }
    DeviceRadioUpdate { radio_config }
}

// ── API → RemoteResource ────────────────────────────────────────────

impl From<Site> for RemoteResource {
    fn from(site: Site) -> Self {
        Self {
            kind: ResourceKind::Site,
            key: site.name,
            id: EntityId::from(site.id),
            attributes: site.extra,
        }
    }
}

impl From<Wlan> for RemoteResource {
    fn from(wlan: Wlan) -> Self {
        Self {
            kind: ResourceKind::Wlan,
            key: wlan.ssid.unwrap_or_default(),
            id: EntityId::from(wlan.id),
            attributes: wlan.extra,
        }
    }
}

/// Inventory entries without an `id` are identified by their MAC.
impl From<InventoryDevice> for RemoteResource {
    fn from(device: InventoryDevice) -> Self {
        let key = display_mac(&device.mac);
        let id = EntityId::from(device.id.unwrap_or_else(|| device.mac.clone()));
        let mut attributes = device.extra;
        if let Some(site_id) = device.site_id {
            attributes.insert("site_id".into(), site_id.into());
        }
        if let Some(name) = device.name {
            attributes.insert("name".into(), name.into());
        }
        Self {
            kind: ResourceKind::DeviceClaim,
            key,
            id,
            attributes,
        }
    }
}

impl From<SiteDevice> for RemoteResource {
    fn from(device: SiteDevice) -> Self {
        let mut attributes = device.extra;
        if let Some(name) = device.name {
            attributes.insert("name".into(), name.into());
        }
        Self {
            kind: ResourceKind::DeviceAssignment,
            key: display_mac(&device.mac),
            id: EntityId::from(device.id),
            attributes,
        }
    }
}

fn display_mac(raw: &str) -> String {
    MacAddress::parse(raw).map_or_else(|_| raw.to_owned(), |mac| mac.to_string())
}
