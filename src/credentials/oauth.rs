//! GitHub OAuth authorization-code handshake.
//!
//! 1. [`AuthorizationHandshake::begin`] generates a random `state` and the
//!    authorization URL the user opens in a browser.
//! 2. The browser is redirected to the loopback callback with `code` and `state`.
//! 3. [`AuthorizationHandshake::verify_callback`] checks `state` and extracts `code`.
//! 4. [`OAuthClient::exchange_code`] trades the code for an access token and
//!    [`OAuthClient::fetch_principal`] identifies the user.
//!
//! A state mismatch is a hard [`ReviewError::Security`] failure and no token
//! request is ever made for that callback.

use reqwest::Url;
use serde::Deserialize;
use tracing::{debug, warn};

use super::{CredentialProvider, Principal};
use crate::config::GitHubSection;
use crate::errors::{Result, ReviewError};

const USER_AGENT: &str = "repolens";

/// OAuth app settings resolved from configuration.
#[derive(Debug, Clone)]
pub struct OAuthConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    pub scope: String,
    /// Base for `/login/oauth/*` (normally `https://github.com`).
    pub oauth_base: String,
    /// Base for the REST API (normally `https://api.github.com`).
    pub api_base: String,
}

impl OAuthConfig {
    /// Build from the `[github]` section; fails with `Config` if the app
    /// credentials are missing.
    pub fn from_section(section: &GitHubSection) -> Result<Self> {
        let client_id = section.client_id.clone().filter(|s| !s.is_empty());
        let client_secret = section.client_secret.clone().filter(|s| !s.is_empty());
        match (client_id, client_secret) {
            (Some(client_id), Some(client_secret)) => Ok(Self {
                client_id,
                client_secret,
                redirect_uri: section.redirect_uri.clone(),
                scope: section.scope.clone(),
                oauth_base: section.oauth_base.trim_end_matches('/').to_string(),
                api_base: section.api_base.trim_end_matches('/').to_string(),
            }),
            _ => Err(ReviewError::Config(
                "GitHub OAuth is not configured. Please set GITHUB_CLIENT_ID and \
                 GITHUB_CLIENT_SECRET environment variables."
                    .to_string(),
            )),
        }
    }
}

/// Outcome of [`OAuthClient::revoke_token`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Revocation {
    Revoked,
    /// The app has no such token; nothing was revoked.
    NotFound,
}

/// Generate a random opaque state value: 16 random bytes as lowercase hex.
pub fn generate_state() -> String {
    let bytes: [u8; 16] = rand::random();
    hex::encode(bytes)
}

/// An in-progress authorization: the state we generated and the URL to open.
#[derive(Debug, Clone)]
pub struct AuthorizationHandshake {
    state: String,
    authorization_url: String,
}

impl AuthorizationHandshake {
    /// Start a handshake with a fresh random state.
    pub fn begin(config: &OAuthConfig) -> Result<Self> {
        Self::with_state(config, generate_state())
    }

    /// Start a handshake with a caller-supplied state.
    pub fn with_state(config: &OAuthConfig, state: impl Into<String>) -> Result<Self> {
        let state = state.into();
        let mut url = Url::parse(&format!("{}/login/oauth/authorize", config.oauth_base))
            .map_err(|e| ReviewError::Config(format!("Invalid OAuth base URL: {}", e)))?;
        url.query_pairs_mut()
            .append_pair("client_id", &config.client_id)
            .append_pair("redirect_uri", &config.redirect_uri)
            .append_pair("scope", &config.scope)
            .append_pair("state", &state)
            .append_pair("allow_signup", "true");

        Ok(Self {
            state,
            authorization_url: url.into(),
        })
    }

    pub fn state(&self) -> &str {
        &self.state
    }

    pub fn authorization_url(&self) -> &str {
        &self.authorization_url
    }

    /// Validate the redirect the browser delivered and return the `code`.
    pub fn verify_callback(&self, callback_url: &str) -> Result<String> {
        let url = Url::parse(callback_url)
            .map_err(|e| ReviewError::Auth(format!("Invalid OAuth callback URL: {}", e)))?;

        let param = |name: &str| {
            url.query_pairs()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.into_owned())
        };

        if let Some(error) = param("error") {
            let detail = param("error_description").unwrap_or(error);
            return Err(ReviewError::Auth(format!(
                "OAuth authorization failed: {}",
                detail
            )));
        }

        let code = param("code")
            .filter(|c| !c.is_empty())
            .ok_or_else(|| {
                ReviewError::Auth("No authorization code received from GitHub".to_string())
            })?;

        if param("state").as_deref() != Some(self.state.as_str()) {
            warn!("OAuth callback state did not match the handshake");
            return Err(ReviewError::Security);
        }

        Ok(code)
    }
}

/// Token endpoint response. GitHub answers 200 with an `error` field on failure.
#[derive(Debug, Deserialize)]
pub struct OAuthToken {
    pub access_token: Option<String>,
    pub token_type: Option<String>,
    pub scope: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

/// HTTP side of the handshake plus token maintenance.
pub struct OAuthClient {
    http: reqwest::Client,
    config: OAuthConfig,
}

impl OAuthClient {
    pub fn new(config: OAuthConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    pub fn config(&self) -> &OAuthConfig {
        &self.config
    }

    /// Exchange an authorization code for an access token.
    pub async fn exchange_code(&self, code: &str, state: &str) -> Result<String> {
        let url = format!("{}/login/oauth/access_token", self.config.oauth_base);
        debug!(%url, "exchanging OAuth code");

        let resp = self
            .http
            .post(&url)
            .header("Accept", "application/json")
            .header("User-Agent", USER_AGENT)
            .json(&serde_json::json!({
                "client_id": self.config.client_id,
                "client_secret": self.config.client_secret,
                "code": code,
                "redirect_uri": self.config.redirect_uri,
                "state": state,
            }))
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(ReviewError::Auth(format!(
                "OAuth token exchange failed: {}",
                resp.status()
            )));
        }

        let token: OAuthToken = resp.json().await?;
        if let Some(error) = token.error {
            return Err(ReviewError::Auth(format!(
                "OAuth error: {}",
                token.error_description.unwrap_or(error)
            )));
        }
        token
            .access_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ReviewError::Auth("OAuth response did not contain a token".to_string()))
    }

    /// Fetch the profile of the token's owner.
    pub async fn fetch_principal(&self, access_token: &str) -> Result<Principal> {
        let resp = self
            .http
            .get(format!("{}/user", self.config.api_base))
            .bearer_auth(access_token)
            .header("Accept", "application/vnd.github.v3+json")
            .header("User-Agent", USER_AGENT)
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(ReviewError::Auth(format!(
                "Failed to get user info: {}",
                resp.status()
            )));
        }
        Ok(resp.json().await?)
    }

    /// Verify the callback, exchange the code and identify the user.
    pub async fn complete(
        &self,
        handshake: &AuthorizationHandshake,
        callback_url: &str,
    ) -> Result<CredentialProvider> {
        let code = handshake.verify_callback(callback_url)?;
        let token = self.exchange_code(&code, handshake.state()).await?;
        let principal = self.fetch_principal(&token).await?;
        Ok(CredentialProvider::authorized(token, principal))
    }

    /// Check whether a token is still accepted. Transport errors count as invalid.
    pub async fn validate_token(&self, access_token: &str) -> bool {
        self.fetch_principal(access_token).await.is_ok()
    }

    /// Revoke an OAuth token issued to this app.
    ///
    /// GitHub answers 404 for tokens it does not know under this app (already
    /// revoked, or a personal access token); that is reported as
    /// [`Revocation::NotFound`], not as success.
    pub async fn revoke_token(&self, access_token: &str) -> Result<Revocation> {
        let url = format!(
            "{}/applications/{}/token",
            self.config.api_base, self.config.client_id
        );
        let resp = self
            .http
            .delete(&url)
            .basic_auth(&self.config.client_id, Some(&self.config.client_secret))
            .header("Accept", "application/vnd.github.v3+json")
            .header("User-Agent", USER_AGENT)
            .json(&serde_json::json!({ "access_token": access_token }))
            .send()
            .await?;

        let status = resp.status();
        if status.is_success() {
            Ok(Revocation::Revoked)
        } else if status == reqwest::StatusCode::NOT_FOUND {
            Ok(Revocation::NotFound)
        } else {
            Err(ReviewError::Http(format!(
                "Failed to revoke token: {}",
                status
            )))
        }
    }
}
