// ── Resource resolver ──
//
// Answers "does this resource already exist?" by scanning the scope's
// collection page by page and stopping at the first exact natural-key
// match. A miss is `Ok(None)`; a failed read is an error. The resolver
// only ever issues GET requests.

use futures_util::{Stream, TryStreamExt};
use tracing::debug;

use crate::context::WorkflowContext;
use crate::error::CoreError;
use crate::model::{Lookup, RemoteResource, ResourceKind};

/// Find the remote resource matching `lookup`, if it exists.
pub async fn resolve(
    ctx: &WorkflowContext,
    lookup: Lookup<'_>,
) -> Result<Option<RemoteResource>, CoreError> {
    let client = ctx.client();
    let kind = lookup.kind();

    let found = match lookup {
        Lookup::Site { name } => {
            let sites = client.list_sites(ctx.org_id());
            first_match(ctx, kind, sites, |site| site.name == name)
                .await?
                .map(RemoteResource::from)
        }
        Lookup::Wlan { site_id, ssid } => {
            let site_id = site_id.to_string();
            let wlans = client.list_wlans(&site_id);
            first_match(ctx, kind, wlans, |wlan| wlan.ssid.as_deref() == Some(ssid))
                .await?
                .map(RemoteResource::from)
        }
        Lookup::ClaimedDevice { mac } => {
            let inventory = client.list_inventory(ctx.org_id());
            first_match(ctx, kind, inventory, |device| mac.matches(&device.mac))
                .await?
                .map(RemoteResource::from)
        }
        Lookup::SiteDevice { site_id, mac } => {
            let site_id = site_id.to_string();
            let devices = client.list_site_devices(&site_id);
            first_match(ctx, kind, devices, |device| mac.matches(&device.mac))
                .await?
                .map(RemoteResource::from)
        }
    };

    debug!(%kind, key = %lookup.key(), found = found.is_some(), "resolved");
    Ok(found)
}

/// Scan a paginated collection for the first item satisfying `pred`.
/// Later pages are never requested once a match is found.
async fn first_match<T, S, P>(
    ctx: &WorkflowContext,
    kind: ResourceKind,
    items: S,
    pred: P,
) -> Result<Option<T>, CoreError>
where
    S: Stream<Item = Result<T, mistly_api::Error>>,
    P: Fn(&T) -> bool,
{
    futures_util::pin_mut!(items);
    ctx.guard(async {
        while let Some(item) = items
            .try_next()
            .await
            .map_err(|e| CoreError::from_api(kind, e))?
        {
            if pred(&item) {
                return Ok(Some(item));
            }
        }
        Ok(None)
    })
    .await
}
