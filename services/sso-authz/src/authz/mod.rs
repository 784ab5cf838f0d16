//! Token issuance adapters and the authorization entry point.
//!
//! An adapter turns an authenticated principal and an application into
//! delivery instructions: where the browser goes, how, and with which
//! parameters. Rendering is the host's job.

mod authorizer;
mod jwt;

pub use authorizer::{AuthorizeOutcome, Authorizer};
pub use jwt::{IssuedToken, JwtAdapter};

use crate::dispatch::Protocol;
use crate::error::IssuanceError;
use crate::jose::JweAlgorithm;
use crate::model::{App, Principal};
use serde::Serialize;
use std::fmt;

/// HTTP method the browser uses to deliver the payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DeliveryMethod {
    /// Auto-submitted form
    Post,
    /// Query parameters
    Get,
}

/// Browser delivery instructions.
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct Delivery {
    /// Target URL
    pub action: String,
    /// HTTP method
    pub method: DeliveryMethod,
    /// Form fields or query parameters
    pub parameters: Vec<(String, String)>,
}

impl Delivery {
    /// Value of a parameter.
    #[must_use]
    pub fn parameter(&self, name: &str) -> Option<&str> {
        self.parameters
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

// Parameter values are tokens; keep them out of logs.
impl fmt::Debug for Delivery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.parameters.iter().map(|(name, _)| name.as_str()).collect();
        f.debug_struct("Delivery")
            .field("action", &self.action)
            .field("method", &self.method)
            .field("parameters", &names)
            .finish()
    }
}

/// Protocol-specific token issuance.
pub trait AuthorizeAdapter: Send + Sync {
    /// Protocol this adapter serves.
    fn protocol(&self) -> Protocol;

    /// Build and sign the protocol token.
    ///
    /// # Errors
    ///
    /// Returns `InvalidLifetime` before any signing attempt if the lifetime
    /// is not positive, and `TokenIssuanceFailed` if signing fails.
    fn generate_info(&self, principal: &Principal, app: &App) -> Result<String, IssuanceError>;

    /// Wrap data in a JWE.
    ///
    /// # Errors
    ///
    /// Returns `EncryptionFailed` if encryption fails.
    fn encrypt(
        &self,
        data: &str,
        key_id: Option<&str>,
        algorithm: Option<JweAlgorithm>,
    ) -> Result<String, IssuanceError>;

    /// Issue the token and describe how to deliver it.
    ///
    /// # Errors
    ///
    /// Issuance errors, plus `MissingRedirectUri`.
    fn authorize(&self, principal: &Principal, app: &App) -> Result<Delivery, IssuanceError>;
}
