// ── Provisioning orchestrator ──
//
// Drives one site's desired state into the cloud in dependency order:
// site, site setting, WLANs, then per device claim, assignment and radio.
// Every creation is preceded by a resolve that came back empty. Failures
// are contained to the narrowest scope that depends on them; only a site
// failure or a run-wide error (cancellation, rejected token) halts.

use tracing::{info, warn};

use crate::context::WorkflowContext;
use crate::creator::{self, ClaimOutcome};
use crate::error::CoreError;
use crate::model::{
    DesiredState, DeviceSpec, EntityId, Halt, Lookup, Outcome, ProvisioningResult, ResourceKind,
    RunMode, RunSummary, SiteSpec, WlanSpec,
};
use crate::resolver::resolve;

/// Result of a step that only affects its own subtree.
///
/// `Err` is reserved for errors that halt the whole run.
type StepResult<T> = Result<Option<T>, CoreError>;

/// How a device came to be in the site.
enum Assignment {
    /// Already visible there, with its site-scoped id.
    Existing(EntityId),
    /// Assigned by this run; the id is not known yet.
    Assigned,
}

// ── Provision ───────────────────────────────────────────────────────

/// Bring the cloud in line with `state`, creating only what is missing.
pub async fn provision(ctx: &mut WorkflowContext, state: &DesiredState) -> RunSummary {
    info!(site = %state.site.name, wlans = state.wlans.len(), devices = state.devices.len(), "provisioning");

    let halted = match run_provision(ctx, state).await {
        Ok(()) => None,
        Err(e) => {
            warn!(error = %e, "run halted");
            Some(Halt::from(&e))
        }
    };
    ctx.summarize(RunMode::Provision, &state.site.name, halted)
}

async fn run_provision(ctx: &mut WorkflowContext, state: &DesiredState) -> Result<(), CoreError> {
    let (site_id, created) = ensure_site(ctx, &state.site).await?;

    // A fresh site's first settings document counts as part of creating it.
    let setting_outcome = if created {
        Outcome::Created
    } else {
        Outcome::Configured
    };
    match creator::push_site_setting(ctx, &site_id).await {
        Ok(()) => ctx.record(
            ProvisioningResult::new(ResourceKind::SiteSetting, &state.site.name, setting_outcome)
                .with_id(Some(site_id.clone())),
        ),
        Err(e) => contain(ctx, ResourceKind::SiteSetting, &state.site.name, e)?,
    }

    for wlan in &state.wlans {
        ensure_wlan(ctx, &site_id, wlan).await?;
    }

    for device in &state.devices {
        provision_device(ctx, &site_id, device).await?;
    }

    Ok(())
}

/// Resolve or create the site. Any failure halts the run.
async fn ensure_site(
    ctx: &mut WorkflowContext,
    spec: &SiteSpec,
) -> Result<(EntityId, bool), CoreError> {
    match find_or_create_site(ctx, spec).await {
        Ok((id, created)) => {
            let result = if created {
                Outcome::Created
            } else {
                Outcome::AlreadyExisted
            };
            ctx.record(
                ProvisioningResult::new(ResourceKind::Site, &spec.name, result)
                    .with_id(Some(id.clone())),
            );
            Ok((id, created))
        }
        Err(e) => {
            ctx.record(ProvisioningResult::failed(ResourceKind::Site, &spec.name, &e));
            Err(e)
        }
    }
}

async fn ensure_wlan(
    ctx: &mut WorkflowContext,
    site_id: &EntityId,
    spec: &WlanSpec,
) -> Result<(), CoreError> {
    match find_or_create_wlan(ctx, site_id, spec).await {
        Ok((id, result)) => {
            ctx.record(
                ProvisioningResult::new(ResourceKind::Wlan, &spec.ssid, result).with_id(Some(id)),
            );
            Ok(())
        }
        Err(e) => contain(ctx, ResourceKind::Wlan, &spec.ssid, e),
    }
}

/// Claim, assign and tune one device. A failed step skips the steps that
/// depend on it for this device only.
async fn provision_device(
    ctx: &mut WorkflowContext,
    site_id: &EntityId,
    device: &DeviceSpec,
) -> Result<(), CoreError> {
    if !ensure_claimed(ctx, device).await? {
        return Ok(());
    }

    let Some(assignment) = ensure_assigned(ctx, site_id, device).await? else {
        return Ok(());
    };

    if device.radio.is_empty() {
        return Ok(());
    }

    // Assignment does not return the site-scoped id; look it up.
    let device_id = match assignment {
        Assignment::Existing(id) => id,
        Assignment::Assigned => match locate_assigned(ctx, site_id, device).await? {
            Some(id) => id,
            None => return Ok(()),
        },
    };

    for (band, radio) in device.radio.bands() {
        let key = format!("{}/{band}", device.mac);
        match creator::push_radio(ctx, site_id, &device_id, band, radio).await {
            Ok(()) => ctx.record(
                ProvisioningResult::new(ResourceKind::RadioConfig, key, Outcome::Configured)
                    .with_id(Some(device_id.clone())),
            ),
            Err(e) => contain(ctx, ResourceKind::RadioConfig, &key, e)?,
        }
    }
    Ok(())
}

/// `true` once the device is in the org inventory.
async fn ensure_claimed(ctx: &mut WorkflowContext, device: &DeviceSpec) -> Result<bool, CoreError> {
    let key = device.mac.to_string();
    match find_or_claim(ctx, device).await {
        Ok((id, result)) => {
            ctx.record(ProvisioningResult::new(ResourceKind::DeviceClaim, key, result).with_id(id));
            Ok(true)
        }
        Err(e) => contain(ctx, ResourceKind::DeviceClaim, &key, e).map(|()| false),
    }
}

/// `Some` once the device is assigned to the site.
async fn ensure_assigned(
    ctx: &mut WorkflowContext,
    site_id: &EntityId,
    device: &DeviceSpec,
) -> StepResult<Assignment> {
    let key = device.mac.to_string();
    match find_or_assign(ctx, site_id, device).await {
        Ok(Assignment::Existing(id)) => {
            ctx.record(
                ProvisioningResult::new(ResourceKind::DeviceAssignment, key, Outcome::AlreadyExisted)
                    .with_id(Some(id.clone())),
            );
            Ok(Some(Assignment::Existing(id)))
        }
        Ok(Assignment::Assigned) => {
            ctx.record(
                ProvisioningResult::new(ResourceKind::DeviceAssignment, key, Outcome::Created)
                    .with_id(Some(site_id.clone())),
            );
            Ok(Some(Assignment::Assigned))
        }
        Err(e) => contain(ctx, ResourceKind::DeviceAssignment, &key, e).map(|()| None),
    }
}

/// Find a freshly assigned device in the site. A device that is not
/// visible fails its radio step.
async fn locate_assigned(
    ctx: &mut WorkflowContext,
    site_id: &EntityId,
    device: &DeviceSpec,
) -> StepResult<EntityId> {
    let lookup = Lookup::SiteDevice {
        site_id,
        mac: &device.mac,
    };
    match resolve(ctx, lookup).await {
        Ok(Some(found)) => Ok(Some(found.id)),
        Ok(None) => {
            ctx.record(ProvisioningResult::failed(
                ResourceKind::RadioConfig,
                device.mac.to_string(),
                "device not visible in site after assignment",
            ));
            Ok(None)
        }
        Err(e) => contain(ctx, ResourceKind::RadioConfig, &device.mac.to_string(), e).map(|()| None),
    }
}

/// Record a failed item. Run-wide errors are passed up to halt the run;
/// everything else stays with the item.
fn contain(
    ctx: &mut WorkflowContext,
    kind: ResourceKind,
    key: &str,
    err: CoreError,
) -> Result<(), CoreError> {
    warn!(%kind, key, error = %err, "step failed");
    ctx.record(ProvisioningResult::failed(kind, key, &err));
    if err.is_fatal() { Err(err) } else { Ok(()) }
}

// ── Resolve-then-create pairs ───────────────────────────────────────

async fn find_or_create_site(
    ctx: &WorkflowContext,
    spec: &SiteSpec,
) -> Result<(EntityId, bool), CoreError> {
    match resolve(ctx, Lookup::Site { name: &spec.name }).await? {
        Some(existing) => Ok((existing.id, false)),
        None => creator::create_site(ctx, spec).await.map(|id| (id, true)),
    }
}

async fn find_or_create_wlan(
    ctx: &WorkflowContext,
    site_id: &EntityId,
    spec: &WlanSpec,
) -> Result<(EntityId, Outcome), CoreError> {
    let lookup = Lookup::Wlan {
        site_id,
        ssid: &spec.ssid,
    };
    match resolve(ctx, lookup).await? {
        Some(existing) => Ok((existing.id, Outcome::AlreadyExisted)),
        None => creator::create_wlan(ctx, site_id, spec)
            .await
            .map(|id| (id, Outcome::Created)),
    }
}

async fn find_or_claim(
    ctx: &WorkflowContext,
    device: &DeviceSpec,
) -> Result<(Option<EntityId>, Outcome), CoreError> {
    match resolve(ctx, Lookup::ClaimedDevice { mac: &device.mac }).await? {
        Some(existing) => Ok((Some(existing.id), Outcome::AlreadyExisted)),
        None => match creator::claim_device(ctx, device).await? {
            ClaimOutcome::Claimed => Ok((None, Outcome::Created)),
            // Claimed between our read and write, or the inventory
            // listing lags behind.
            ClaimOutcome::AlreadyClaimed => Ok((None, Outcome::AlreadyExisted)),
            ClaimOutcome::Rejected { reason } => Err(CoreError::Provisioning {
                kind: ResourceKind::DeviceClaim,
                status: None,
                reason,
            }),
        },
    }
}

async fn find_or_assign(
    ctx: &WorkflowContext,
    site_id: &EntityId,
    device: &DeviceSpec,
) -> Result<Assignment, CoreError> {
    let lookup = Lookup::SiteDevice {
        site_id,
        mac: &device.mac,
    };
    match resolve(ctx, lookup).await? {
        Some(existing) => Ok(Assignment::Existing(existing.id)),
        None => creator::assign_device(ctx, site_id, device)
            .await
            .map(|()| Assignment::Assigned),
    }
}

// ── Plan ────────────────────────────────────────────────────────────

/// Report what `provision` would do, issuing only reads.
///
/// Without an existing site there is nothing to read site-scoped
/// resources from, so they are all reported as `WouldCreate`.
pub async fn plan(ctx: &mut WorkflowContext, state: &DesiredState) -> RunSummary {
    info!(site = %state.site.name, "planning");

    let halted = match run_plan(ctx, state).await {
        Ok(()) => None,
        Err(e) => {
            warn!(error = %e, "plan halted");
            Some(Halt::from(&e))
        }
    };
    ctx.summarize(RunMode::Plan, &state.site.name, halted)
}

async fn run_plan(ctx: &mut WorkflowContext, state: &DesiredState) -> Result<(), CoreError> {
    let site_id = match resolve(ctx, Lookup::Site {
        name: &state.site.name,
    })
    .await
    {
        Ok(Some(existing)) => {
            ctx.record(
                ProvisioningResult::new(
                    ResourceKind::Site,
                    &state.site.name,
                    Outcome::AlreadyExisted,
                )
                .with_id(Some(existing.id.clone())),
            );
            Some(existing.id)
        }
        Ok(None) => {
            ctx.record(ProvisioningResult::new(
                ResourceKind::Site,
                &state.site.name,
                Outcome::WouldCreate,
            ));
            None
        }
        Err(e) => {
            ctx.record(ProvisioningResult::failed(
                ResourceKind::Site,
                &state.site.name,
                &e,
            ));
            return Err(e);
        }
    };

    for wlan in &state.wlans {
        let Some(site_id) = &site_id else {
            ctx.record(ProvisioningResult::new(
                ResourceKind::Wlan,
                &wlan.ssid,
                Outcome::WouldCreate,
            ));
            continue;
        };
        let lookup = Lookup::Wlan {
            site_id,
            ssid: &wlan.ssid,
        };
        plan_lookup(ctx, lookup).await?;
    }

    for device in &state.devices {
        plan_lookup(ctx, Lookup::ClaimedDevice { mac: &device.mac }).await?;

        match &site_id {
            Some(site_id) => {
                let lookup = Lookup::SiteDevice {
                    site_id,
                    mac: &device.mac,
                };
                plan_lookup(ctx, lookup).await?;
            }
            None => ctx.record(ProvisioningResult::new(
                ResourceKind::DeviceAssignment,
                device.mac.to_string(),
                Outcome::WouldCreate,
            )),
        }
    }

    Ok(())
}

async fn plan_lookup(ctx: &mut WorkflowContext, lookup: Lookup<'_>) -> Result<(), CoreError> {
    let kind = lookup.kind();
    let key = lookup.key();
    match resolve(ctx, lookup).await {
        Ok(Some(existing)) => {
            ctx.record(
                ProvisioningResult::new(kind, key, Outcome::AlreadyExisted)
                    .with_id(Some(existing.id)),
            );
            Ok(())
        }
        Ok(None) => {
            ctx.record(ProvisioningResult::new(kind, key, Outcome::WouldCreate));
            Ok(())
        }
        Err(e) => contain(ctx, kind, &key, e),
    }
}
