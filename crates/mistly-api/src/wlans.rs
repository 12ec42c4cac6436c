// WLAN endpoints (site-scoped)

use futures_util::Stream;
use tracing::debug;

use crate::client::MistClient;
use crate::error::Error;
use crate::models::{Wlan, WlanCreate};
use crate::pagination::PAGE_LIMIT;

impl MistClient {
    /// Stream the WLAN profiles of a site.
    ///
    /// `GET sites/{site}/wlans`
    pub fn list_wlans(&self, site_id: &str) -> impl Stream<Item = Result<Wlan, Error>> + Send + '_ {
        debug!(site_id, "listing wlans");
        self.paginate(format!("sites/{site_id}/wlans"), PAGE_LIMIT)
    }

    /// Create a WLAN profile.
    ///
    /// `POST sites/{site}/wlans`
    pub async fn create_wlan(&self, site_id: &str, wlan: &WlanCreate) -> Result<Wlan, Error> {
        debug!(site_id, ssid = %wlan.ssid, band = %wlan.band, "creating wlan");
        self.post(&format!("sites/{site_id}/wlans"), wlan).await
    }
}
