// Site device endpoints

use futures_util::Stream;
use tracing::debug;

use crate::client::MistClient;
use crate::error::Error;
use crate::models::{DeviceRadioUpdate, SiteDevice};
use crate::pagination::PAGE_LIMIT;

impl MistClient {
    /// Stream the devices assigned to a site.
    ///
    /// `GET sites/{site}/devices`
    pub fn list_site_devices(
        &self,
        site_id: &str,
    ) -> impl Stream<Item = Result<SiteDevice, Error>> + Send + '_ {
        debug!(site_id, "listing site devices");
        self.paginate(format!("sites/{site_id}/devices"), PAGE_LIMIT)
    }

    /// Overwrite a device's radio configuration.
    ///
    /// `PUT sites/{site}/devices/{device}`
    pub async fn update_device_radio(
        &self,
        site_id: &str,
        device_id: &str,
        update: &DeviceRadioUpdate,
    ) -> Result<(), Error> {
        debug!(site_id, device_id, "updating device radio config");
        self.put_no_response(&format!("sites/{site_id}/devices/{device_id}"), update)
            .await
    }
}
