// Ephemeral API tokens
//
// A run can trade its long-lived token for a short-lived one minted via
// `POST self/apitokens` and revoke it on close. The master token is only
// used to mint and revoke; every other request carries the session token.

use reqwest::header::AUTHORIZATION;
use secrecy::SecretString;
use serde::Deserialize;
use tracing::{debug, info};

use crate::client::MistClient;
use crate::error::Error;

/// A token minted by `POST self/apitokens`.
#[derive(Deserialize)]
pub struct ApiToken {
    pub id: String,
    pub key: SecretString,
}

impl std::fmt::Debug for ApiToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiToken")
            .field("id", &self.id)
            .field("key", &"[REDACTED]")
            .finish()
    }
}

impl MistClient {
    /// Mint a short-lived token and use it for all subsequent requests.
    ///
    /// Returns the token id so the caller can log or revoke it.
    pub async fn start_ephemeral_session(&self) -> Result<String, Error> {
        let url = self.url("self/apitokens")?;
        debug!("POST {url}");

        let builder = self
            .http()
            .post(url)
            .header(AUTHORIZATION, self.master_auth_header()?)
            .json(&serde_json::json!({}));
        let token: ApiToken = self.send_with(builder).await?;
        let id = token.id.clone();

        let mut session = self.session.write().unwrap_or_else(|p| p.into_inner());
        *session = Some(token);
        drop(session);

        info!(token_id = %id, "ephemeral token minted");
        Ok(id)
    }

    /// Revoke the session token, if one is open, and fall back to the
    /// master token.
    ///
    /// `DELETE self/apitokens/{id}`
    pub async fn end_ephemeral_session(&self) -> Result<(), Error> {
        let token = {
            let mut session = self.session.write().unwrap_or_else(|p| p.into_inner());
            session.take()
        };
        let Some(token) = token else {
            return Ok(());
        };

        let url = self.url(&format!("self/apitokens/{}", token.id))?;
        debug!("DELETE {url}");
        let builder = self
            .http()
            .delete(url)
            .header(AUTHORIZATION, self.master_auth_header()?);
        self.send_empty_with(builder).await?;

        info!(token_id = %token.id, "ephemeral token revoked");
        Ok(())
    }

    /// Whether requests currently authenticate with a session token.
    pub fn has_ephemeral_session(&self) -> bool {
        self.session
            .read()
            .map(|s| s.is_some())
            .unwrap_or_else(|p| p.into_inner().is_some())
    }
}
