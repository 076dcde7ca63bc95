//! Credential provider for the forge.
//!
//! Two interchangeable strategies share one capability surface,
//! [`CredentialProvider::current_token`]:
//!
//! - a long-lived static token supplied directly by the user
//! - a token obtained through the OAuth authorization-code handshake in [`oauth`]

pub mod callback;
pub mod oauth;

use serde::{Deserialize, Serialize};
use std::fmt;

/// How a credential was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialMethod {
    StaticToken,
    AuthorizedSession,
}

impl fmt::Display for CredentialMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StaticToken => write!(f, "static token"),
            Self::AuthorizedSession => write!(f, "OAuth session"),
        }
    }
}

/// The authenticated forge user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub login: String,
    pub id: u64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

/// A bearer token plus what we know about its owner.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    value: String,
    principal: Option<Principal>,
}

impl Credential {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            principal: None,
        }
    }

    pub fn with_principal(mut self, principal: Principal) -> Self {
        self.principal = Some(principal);
        self
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn principal(&self) -> Option<&Principal> {
        self.principal.as_ref()
    }
}

// Keep tokens out of logs and panic messages.
impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("value", &"<redacted>")
            .field("principal", &self.principal)
            .finish()
    }
}

/// Source of the forge bearer token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialProvider {
    StaticToken(Credential),
    AuthorizedSession(Credential),
}

impl CredentialProvider {
    /// Wrap a user-supplied token.
    pub fn static_token(token: impl Into<String>) -> Self {
        Self::StaticToken(Credential::new(token))
    }

    /// Wrap a token obtained from the OAuth handshake.
    pub fn authorized(token: impl Into<String>, principal: Principal) -> Self {
        Self::AuthorizedSession(Credential::new(token).with_principal(principal))
    }

    fn credential(&self) -> &Credential {
        match self {
            Self::StaticToken(c) | Self::AuthorizedSession(c) => c,
        }
    }

    /// The bearer token, or `None` when it is blank.
    pub fn current_token(&self) -> Option<&str> {
        let value = self.credential().value();
        if value.trim().is_empty() {
            None
        } else {
            Some(value)
        }
    }

    pub fn method(&self) -> CredentialMethod {
        match self {
            Self::StaticToken(_) => CredentialMethod::StaticToken,
            Self::AuthorizedSession(_) => CredentialMethod::AuthorizedSession,
        }
    }

    pub fn principal(&self) -> Option<&Principal> {
        self.credential().principal()
    }
}

/// Known GitHub token prefixes.
/// See: https://github.blog/2021-04-05-behind-githubs-new-authentication-token-formats/
const GITHUB_TOKEN_PREFIXES: &[&str] = &[
    "ghp_",        // Personal access tokens (classic)
    "github_pat_", // Fine-grained personal access tokens
    "gho_",        // OAuth access tokens
    "ghu_",        // GitHub App user-to-server tokens
    "ghs_",        // GitHub App server-to-server tokens
    "ghr_",        // GitHub App refresh tokens
];

/// Check that a string looks like a GitHub token based on its prefix.
///
/// Format check only; it does not verify the token is active or scoped.
pub fn is_valid_github_token(token: &str) -> bool {
    if token.is_empty() {
        return false;
    }
    GITHUB_TOKEN_PREFIXES
        .iter()
        .any(|prefix| token.starts_with(prefix))
}
