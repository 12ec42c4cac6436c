// ── Resource creator ──
//
// Issues the write calls. Each creation here is only ever reached after
// the resolver reported the resource absent in the same run. Identifiers
// returned are the ones the cloud assigned.

use serde_json::Value;
use tracing::{debug, info};

use mistly_api::models::{ClaimResponse, SiteCreate, WlanCreate};

use crate::context::WorkflowContext;
use crate::convert;
use crate::error::CoreError;
use crate::model::{BandRadio, DeviceSpec, EntityId, RadioBand, ResourceKind, SiteSpec, WlanSpec};

/// How the cloud answered a device claim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClaimOutcome {
    /// Added to the org inventory now.
    Claimed,
    /// Already in this org's inventory.
    AlreadyClaimed,
    /// Code refused (unknown, or claimed by another org).
    Rejected { reason: String },
}

impl ClaimOutcome {
    /// Classify a claim response for a single code.
    ///
    /// Exactly one of added / duplicated / error must be populated;
    /// anything else is ambiguous and never guessed at.
    pub fn classify(resp: &ClaimResponse) -> Result<Self, CoreError> {
        let claimed = !resp.added.is_empty() || !resp.inventory_added.is_empty();
        let duplicate = !resp.duplicated.is_empty() || !resp.inventory_duplicated.is_empty();
        let rejected = !resp.error.is_empty();

        match (claimed, duplicate, rejected) {
            (true, false, false) => Ok(Self::Claimed),
            (false, true, false) => Ok(Self::AlreadyClaimed),
            (false, false, true) => Ok(Self::Rejected {
                reason: resp
                    .reason
                    .first()
                    .cloned()
                    .unwrap_or_else(|| "claim code rejected".into()),
            }),
            _ => Err(CoreError::AmbiguousClaimOutcome {
                body: serde_json::to_string(resp).unwrap_or_else(|_| Value::Null.to_string()),
            }),
        }
    }
}

pub async fn create_site(ctx: &WorkflowContext, spec: &SiteSpec) -> Result<EntityId, CoreError> {
    let payload = SiteCreate::from(spec);
    let site = ctx
        .guard(async {
            ctx.client()
                .create_site(ctx.org_id(), &payload)
                .await
                .map_err(|e| CoreError::from_write(ResourceKind::Site, e))
        })
        .await?;
    info!(name = %spec.name, site_id = %site.id, "site created");
    Ok(EntityId::from(site.id))
}

pub async fn create_wlan(
    ctx: &WorkflowContext,
    site_id: &EntityId,
    spec: &WlanSpec,
) -> Result<EntityId, CoreError> {
    let payload = WlanCreate::from(spec);
    let site_id = site_id.to_string();
    let wlan = ctx
        .guard(async {
            ctx.client()
                .create_wlan(&site_id, &payload)
                .await
                .map_err(|e| CoreError::from_write(ResourceKind::Wlan, e))
        })
        .await?;
    info!(ssid = %spec.ssid, wlan_id = %wlan.id, "wlan created");
    Ok(EntityId::from(wlan.id))
}

/// Claim one device by its claim code.
pub async fn claim_device(
    ctx: &WorkflowContext,
    spec: &DeviceSpec,
) -> Result<ClaimOutcome, CoreError> {
    let codes = [spec.claim_code.clone()];
    let resp = ctx
        .guard(async {
            ctx.client()
                .claim_devices(ctx.org_id(), &codes)
                .await
                .map_err(|e| CoreError::from_write(ResourceKind::DeviceClaim, e))
        })
        .await?;

    let outcome = ClaimOutcome::classify(&resp)?;
    info!(mac = %spec.mac, ?outcome, "claim answered");
    Ok(outcome)
}

/// Bind a claimed device to a site. The API does not return the
/// site-scoped device id.
pub async fn assign_device(
    ctx: &WorkflowContext,
    site_id: &EntityId,
    spec: &DeviceSpec,
) -> Result<(), CoreError> {
    let payload = convert::device_assignment(spec, site_id);
    ctx.guard(async {
        ctx.client()
            .assign_device(ctx.org_id(), spec.mac.compact(), &payload)
            .await
            .map_err(|e| CoreError::from_write(ResourceKind::DeviceAssignment, e))
    })
    .await?;
    info!(mac = %spec.mac, %site_id, "device assigned");
    Ok(())
}

/// Enable config persistence on the site. Idempotent; retried.
pub async fn push_site_setting(ctx: &WorkflowContext, site_id: &EntityId) -> Result<(), CoreError> {
    let setting = convert::persist_config_setting();
    let site_id = site_id.to_string();
    ctx.retry_idempotent(ResourceKind::SiteSetting, || {
        ctx.client().update_site_setting(&site_id, &setting)
    })
    .await?;
    debug!(%site_id, "site setting applied");
    Ok(())
}

/// Push one band's radio settings to a device. Idempotent; retried.
pub async fn push_radio(
    ctx: &WorkflowContext,
    site_id: &EntityId,
    device_id: &EntityId,
    band: RadioBand,
    radio: BandRadio,
) -> Result<(), CoreError> {
    let update = convert::radio_update(band, radio);
    let site_id = site_id.to_string();
    let device_id = device_id.to_string();
    ctx.retry_idempotent(ResourceKind::RadioConfig, || {
        ctx.client()
            .update_device_radio(&site_id, &device_id, &update)
    })
    .await?;
    debug!(%device_id, %band, "radio config applied");
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    fn response(value: Value) -> ClaimResponse {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn classify_added() {
        let resp = response(json!({
            "added": ["ABC"], "inventory_added": [{ "mac": "aabbccddeeff" }]
        }));
        assert_eq!(ClaimOutcome::classify(&resp).unwrap(), ClaimOutcome::Claimed);
    }

    #[test]
    fn classify_duplicate() {
        let resp = response(json!({ "duplicated": ["ABC"], "inventory_duplicated": [] }));
        assert_eq!(
            ClaimOutcome::classify(&resp).unwrap(),
            ClaimOutcome::AlreadyClaimed
        );
    }

    #[test]
    fn classify_rejected_keeps_reason() {
        let resp = response(json!({ "error": ["ABC"], "reason": ["already claimed by another org"] }));
        assert_eq!(
            ClaimOutcome::classify(&resp).unwrap(),
            ClaimOutcome::Rejected {
                reason: "already claimed by another org".into()
            }
        );
    }

    #[test]
    fn classify_rejected_without_reason() {
        let resp = response(json!({ "error": ["ABC"] }));
        assert!(matches!(
            ClaimOutcome::classify(&resp).unwrap(),
            ClaimOutcome::Rejected { reason } if reason == "claim code rejected"
        ));
    }

    #[test]
    fn empty_or_mixed_bodies_are_ambiguous() {
        for body in [
            json!({}),
            json!({ "added": ["A"], "error": ["B"] }),
            json!({ "inventory_added": [{}], "duplicated": ["A"] }),
        ] {
            let err = ClaimOutcome::classify(&response(body.clone())).unwrap_err();
            assert!(
                matches!(err, CoreError::AmbiguousClaimOutcome { .. }),
                "{body} -> {err:?}"
            );
        }
    }
}
