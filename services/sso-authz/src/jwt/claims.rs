//! SSO token claims.

use serde::{Deserialize, Serialize};

/// Claims of a token issued to an SSO application.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SsoClaims {
    // Standard JWT claims
    pub iss: String,
    pub sub: String,
    pub aud: Vec<String>,
    pub jti: String,
    pub iat: i64,
    pub exp: i64,

    // Principal claims
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,

    // Session binding
    #[serde(skip_serializing_if = "Option::is_none")]
    pub online_ticket: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kid: Option<String>,
}

impl SsoClaims {
    /// Lifetime in seconds.
    #[must_use]
    pub const fn lifetime_seconds(&self) -> i64 {
        self.exp - self.iat
    }
}
