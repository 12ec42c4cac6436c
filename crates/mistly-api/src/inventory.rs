// Org inventory endpoints
//
// Claiming registers a device into the org inventory by claim code; the
// installer endpoints read that inventory and bind devices to sites.
// Devices are addressed by their compact MAC (12 hex digits, no separators).

use futures_util::Stream;
use tracing::debug;

use crate::client::MistClient;
use crate::error::Error;
use crate::models::{ClaimResponse, DeviceAssignment, InventoryDevice};
use crate::pagination::PAGE_LIMIT;

impl MistClient {
    /// Stream the devices claimed into an organization.
    ///
    /// `GET installer/orgs/{org}/devices`
    pub fn list_inventory(
        &self,
        org_id: &str,
    ) -> impl Stream<Item = Result<InventoryDevice, Error>> + Send + '_ {
        debug!(org_id, "listing claimed inventory");
        self.paginate(format!("installer/orgs/{org_id}/devices"), PAGE_LIMIT)
    }

    /// Claim devices into the org inventory.
    ///
    /// `POST orgs/{org}/inventory` with a JSON array of claim codes.
    pub async fn claim_devices(
        &self,
        org_id: &str,
        claim_codes: &[String],
    ) -> Result<ClaimResponse, Error> {
        debug!(org_id, count = claim_codes.len(), "claiming devices");
        self.post(&format!("orgs/{org_id}/inventory"), claim_codes)
            .await
    }

    /// Assign a claimed device to a site.
    ///
    /// `PUT installer/orgs/{org}/devices/{mac}`
    pub async fn assign_device(
        &self,
        org_id: &str,
        mac: &str,
        assignment: &DeviceAssignment,
    ) -> Result<(), Error> {
        debug!(org_id, mac, site_id = %assignment.site_id, "assigning device to site");
        self.put_no_response(&format!("installer/orgs/{org_id}/devices/{mac}"), assignment)
            .await
    }
}
