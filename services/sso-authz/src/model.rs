//! Records owned by collaborators and the repository contract the core
//! reads applications through.

use crate::jose::{EncryptionMethod, JweAlgorithm};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Optional JWE wrapping applied to tokens issued for an application.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenEncryption {
    /// Encryption key id, else the default encryption key
    #[serde(default)]
    pub key_id: Option<String>,
    /// Key management algorithm, else the configured or preferred one
    #[serde(default)]
    pub algorithm: Option<JweAlgorithm>,
    /// Content encryption method, else the configured or preferred one
    #[serde(default)]
    pub method: Option<EncryptionMethod>,
}

/// Application protocol configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct App {
    /// Application id
    pub id: String,
    /// Display name
    #[serde(default)]
    pub name: String,
    /// Protocol as configured; matched case-insensitively
    pub protocol: String,
    /// External login URL for redirect protocols
    #[serde(default)]
    pub login_url: Option<String>,
    /// Where issued tokens are delivered
    #[serde(default)]
    pub redirect_uri: Option<String>,
    /// Token lifetime in minutes
    pub lifetime_minutes: i64,
    /// Nested JWE wrapping of issued tokens
    #[serde(default)]
    pub token_encryption: Option<TokenEncryption>,
}

/// Authenticated principal and the SSO session it belongs to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    /// Login name, becomes `sub`
    pub username: String,
    /// Internal user id
    pub user_id: String,
    /// Id in the user's source directory
    #[serde(default)]
    pub external_id: Option<String>,
    /// Email address
    #[serde(default)]
    pub email: Option<String>,
    /// Display name
    #[serde(default)]
    pub display_name: Option<String>,
    /// Preferred locale
    #[serde(default)]
    pub locale: Option<String>,
    /// Active SSO session ticket id
    #[serde(default)]
    pub session_ticket_id: Option<String>,
}

/// Repository failure.
#[derive(Debug, Error)]
#[error("repository unavailable: {0}")]
pub struct RepositoryError(pub String);

/// Read access to application records.
#[async_trait]
pub trait AppRepository: Send + Sync {
    /// Load an application, `None` if it does not exist.
    async fn get_app(&self, app_id: &str) -> Result<Option<App>, RepositoryError>;
}

/// Repository over a fixed set of applications.
#[derive(Debug, Clone, Default)]
pub struct InMemoryAppRepository {
    apps: HashMap<String, App>,
}

impl InMemoryAppRepository {
    /// Create an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace an application.
    #[must_use]
    pub fn with_app(mut self, app: App) -> Self {
        self.apps.insert(app.id.clone(), app);
        self
    }
}

impl FromIterator<App> for InMemoryAppRepository {
    fn from_iter<I: IntoIterator<Item = App>>(iter: I) -> Self {
        Self {
            apps: iter.into_iter().map(|app| (app.id.clone(), app)).collect(),
        }
    }
}

#[async_trait]
impl AppRepository for InMemoryAppRepository {
    async fn get_app(&self, app_id: &str) -> Result<Option<App>, RepositoryError> {
        Ok(self.apps.get(app_id).cloned())
    }
}
