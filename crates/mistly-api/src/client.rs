// Mist API HTTP client
//
// Wraps `reqwest::Client` with base-URL joining, token auth, and status
// classification. Endpoint groups (sites, wlans, inventory, devices,
// tokens) are implemented as inherent methods in separate files to keep
// this module focused on transport mechanics.

use std::sync::RwLock;

use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue, RETRY_AFTER};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::auth::ApiToken;
use crate::error::Error;
use crate::pagination::Page;
use crate::transport::TransportConfig;

/// Production cloud endpoint. Regional clouds (`api.eu.mist.com`,
/// `api.gc1.mist.com`, ...) are selected through configuration.
pub const DEFAULT_BASE_URL: &str = "https://api.mist.com/api/v1/";

/// Error response shape: Mist uses `detail` on most endpoints and
/// `message` on a few older ones.
#[derive(serde::Deserialize)]
struct ErrorResponse {
    #[serde(default)]
    detail: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// Raw HTTP client for the Mist cloud API.
///
/// Holds the long-lived master token and, while an ephemeral session is
/// open, the short-lived token minted from it. Requests always authenticate
/// with the session token when one exists.
pub struct MistClient {
    http: reqwest::Client,
    base_url: Url,
    master_token: SecretString,
    /// Temporary token minted by `start_ephemeral_session`.
    pub(crate) session: RwLock<Option<ApiToken>>,
}

impl MistClient {
    /// Create a new client from a `TransportConfig`.
    ///
    /// `base_url` is the API root (e.g. `https://api.mist.com/api/v1/`);
    /// a missing trailing slash is added so relative paths join correctly.
    pub fn new(
        base_url: &str,
        token: SecretString,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Self::with_client(http, base_url, token)
    }

    /// Create a client with a pre-built `reqwest::Client`.
    pub fn with_client(
        http: reqwest::Client,
        base_url: &str,
        token: SecretString,
    ) -> Result<Self, Error> {
        Ok(Self {
            http,
            base_url: normalize_base_url(base_url)?,
            master_token: token,
            session: RwLock::new(None),
        })
    }

    /// The API root URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    // ── Auth ─────────────────────────────────────────────────────────

    /// Build the `Authorization: Token <key>` header value.
    ///
    /// Uses the session token if one is open, the master token otherwise.
    fn auth_header(&self) -> Result<HeaderValue, Error> {
        let session = self.session.read().unwrap_or_else(|p| p.into_inner());
        let key = match session.as_ref() {
            Some(token) => token.key.expose_secret().to_owned(),
            None => self.master_token.expose_secret().to_owned(),
        };
        drop(session);
        token_header(&key)
    }

    /// Header value for the master token, used to manage session tokens.
    pub(crate) fn master_auth_header(&self) -> Result<HeaderValue, Error> {
        token_header(self.master_token.expose_secret())
    }

    // ── URL builder ──────────────────────────────────────────────────

    /// Join a relative path (e.g. `"orgs/{id}/sites"`) onto the base URL.
    pub(crate) fn url(&self, path: &str) -> Result<Url, Error> {
        Ok(self.base_url.join(path)?)
    }

    // ── HTTP verbs ───────────────────────────────────────────────────

    pub(crate) async fn get_page<T: DeserializeOwned>(
        &self,
        path: &str,
        page: u32,
        limit: u32,
    ) -> Result<Page<T>, Error> {
        let url = self.url(path)?;
        debug!("GET {url} page={page} limit={limit}");

        let resp = self
            .http
            .get(url)
            .header(AUTHORIZATION, self.auth_header()?)
            .query(&[("limit", limit.to_string()), ("page", page.to_string())])
            .send()
            .await?;

        let total = page_total(resp.headers());
        let items: Vec<T> = self.handle_response(resp).await?;
        Ok(Page { items, total })
    }

    pub(crate) async fn post<T: DeserializeOwned, B: Serialize + Sync + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, Error> {
        let url = self.url(path)?;
        debug!("POST {url}");

        let resp = self
            .http
            .post(url)
            .header(AUTHORIZATION, self.auth_header()?)
            .json(body)
            .send()
            .await?;
        self.handle_response(resp).await
    }

    pub(crate) async fn put_no_response<B: Serialize + Sync + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<(), Error> {
        let url = self.url(path)?;
        debug!("PUT {url}");

        let resp = self
            .http
            .put(url)
            .header(AUTHORIZATION, self.auth_header()?)
            .json(body)
            .send()
            .await?;
        self.handle_empty(resp).await
    }

    /// Send a prepared request (used by token management, which must
    /// authenticate with the master token).
    pub(crate) async fn send_with<T: DeserializeOwned>(
        &self,
        builder: reqwest::RequestBuilder,
    ) -> Result<T, Error> {
        let resp = builder.send().await?;
        self.handle_response(resp).await
    }

    pub(crate) async fn send_empty_with(&self, builder: reqwest::RequestBuilder) -> Result<(), Error> {
        let resp = builder.send().await?;
        self.handle_empty(resp).await
    }

    /// The underlying HTTP client.
    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.http
    }

    // ── Response handling ────────────────────────────────────────────

    async fn handle_response<T: DeserializeOwned>(
        &self,
        resp: reqwest::Response,
    ) -> Result<T, Error> {
        let status = resp.status();
        if status.is_success() {
            let body = resp.text().await?;
            serde_json::from_str(&body).map_err(|e| {
                let preview: String = body.chars().take(200).collect();
                Error::Deserialization {
                    message: format!("{e} (body preview: {preview:?})"),
                    body,
                }
            })
        } else {
            Err(self.parse_error(status, resp).await)
        }
    }

    async fn handle_empty(&self, resp: reqwest::Response) -> Result<(), Error> {
        let status = resp.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(self.parse_error(status, resp).await)
        }
    }

    async fn parse_error(&self, status: reqwest::StatusCode, resp: reqwest::Response) -> Error {
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after_secs = resp
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(1);
            return Error::RateLimited { retry_after_secs };
        }

        let raw = resp.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorResponse>(&raw)
            .ok()
            .and_then(|err| err.detail.or(err.message))
            .unwrap_or_else(|| {
                if raw.is_empty() {
                    status.to_string()
                } else {
                    raw.chars().take(200).collect()
                }
            });

        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Error::Authentication { message };
        }

        Error::Api {
            status: status.as_u16(),
            message,
        }
    }
}

fn normalize_base_url(raw: &str) -> Result<Url, Error> {
    let mut url = Url::parse(raw)?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

fn token_header(key: &str) -> Result<HeaderValue, Error> {
    let mut value =
        HeaderValue::from_str(&format!("Token {key}")).map_err(|e| Error::InvalidToken {
            reason: e.to_string(),
        })?;
    value.set_sensitive(true);
    Ok(value)
}

/// Total item count advertised by a paginated list response.
fn page_total(headers: &HeaderMap) -> Option<u64> {
    headers
        .get("X-Page-Total")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn base_url_gains_trailing_slash() {
        let url = normalize_base_url("https://api.eu.mist.com/api/v1").unwrap();
        assert_eq!(url.as_str(), "https://api.eu.mist.com/api/v1/");
        assert_eq!(
            url.join("orgs/o1/sites").unwrap().as_str(),
            "https://api.eu.mist.com/api/v1/orgs/o1/sites"
        );
    }

    #[test]
    fn token_header_is_sensitive() {
        let value = token_header("abc").unwrap();
        assert!(value.is_sensitive());
        assert_eq!(value.to_str().unwrap(), "Token abc");
    }

    #[test]
    fn token_with_newline_is_rejected() {
        assert!(matches!(
            token_header("bad\nkey"),
            Err(Error::InvalidToken { .. })
        ));
    }

    #[test]
    fn page_total_header_parses() {
        let mut headers = HeaderMap::new();
        headers.insert("X-Page-Total", HeaderValue::from_static("240"));
        assert_eq!(page_total(&headers), Some(240));
        assert_eq!(page_total(&HeaderMap::new()), None);
    }
}
