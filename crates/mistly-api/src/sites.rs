// Site endpoints
//
// Sites are org-scoped; their settings document is site-scoped and
// overwritten in place.

use futures_util::Stream;
use tracing::debug;

use crate::client::MistClient;
use crate::error::Error;
use crate::models::{Site, SiteCreate, SiteSetting};
use crate::pagination::PAGE_LIMIT;

impl MistClient {
    /// Stream all sites of an organization.
    ///
    /// `GET orgs/{org}/sites`
    pub fn list_sites(&self, org_id: &str) -> impl Stream<Item = Result<Site, Error>> + Send + '_ {
        debug!(org_id, "listing sites");
        self.paginate(format!("orgs/{org_id}/sites"), PAGE_LIMIT)
    }

    /// Create a site and return it with its cloud-assigned id.
    ///
    /// `POST orgs/{org}/sites`
    pub async fn create_site(&self, org_id: &str, site: &SiteCreate) -> Result<Site, Error> {
        debug!(org_id, name = %site.name, "creating site");
        self.post(&format!("orgs/{org_id}/sites"), site).await
    }

    /// Overwrite fields of a site's settings document.
    ///
    /// `PUT sites/{site}/setting`
    pub async fn update_site_setting(
        &self,
        site_id: &str,
        setting: &SiteSetting,
    ) -> Result<(), Error> {
        debug!(site_id, "updating site setting");
        self.put_no_response(&format!("sites/{site_id}/setting"), setting)
            .await
    }
}
