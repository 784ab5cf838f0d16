//! JWT adapter: signs an SSO token and posts it to the application.

use super::{AuthorizeAdapter, Delivery, DeliveryMethod};
use crate::dispatch::{current_app_id, Protocol};
use crate::error::IssuanceError;
use crate::jose::{EncryptOptions, JweAlgorithm, JwsAlgorithm, SharedJoseService};
use crate::jwt::{ClaimsBuilder, SsoClaims};
use crate::metrics;
use crate::model::{App, Principal};
use tracing::{debug, instrument};

/// Form field carrying the token.
pub const TOKEN_PARAMETER: &str = "token";

/// A freshly issued token with the claims it carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedToken {
    /// Compact JWS, or compact JWE when the application wraps tokens
    pub token: String,
    /// Signed claims
    pub claims: SsoClaims,
    /// Signing key
    pub key_id: String,
    /// Signing algorithm
    pub algorithm: JwsAlgorithm,
    /// Whether `token` is a nested JWE
    pub encrypted: bool,
}

/// Issues signed JWTs through the shared JOSE service.
#[derive(Debug, Clone)]
pub struct JwtAdapter {
    jose: SharedJoseService,
    issuer: String,
}

impl JwtAdapter {
    /// Create an adapter issuing tokens as `issuer`.
    #[must_use]
    pub fn new(jose: SharedJoseService, issuer: impl Into<String>) -> Self {
        Self {
            jose,
            issuer: issuer.into(),
        }
    }

    /// Issue a token for `principal` to `app`.
    ///
    /// The lifetime is validated before any key is touched. The signing key
    /// and algorithm are the JOSE service defaults.
    ///
    /// # Errors
    ///
    /// Returns `InvalidLifetime`, `TokenIssuanceFailed` or, for applications
    /// with token encryption, `EncryptionFailed`.
    #[instrument(skip(self, principal, app), fields(app_id = %app.id))]
    pub fn issue_token(&self, principal: &Principal, app: &App) -> Result<IssuedToken, IssuanceError> {
        let jose = self.jose.snapshot();
        let kid = jose.default_signing_key_id().map(str::to_string);

        let claims = ClaimsBuilder::new(self.issuer.as_str())
            .principal(principal)
            .audience(app.id.as_str())
            .lifetime_minutes(app.lifetime_minutes)
            .kid(kid.clone())
            .build()?;

        let signed = jose
            .sign(&claims, kid.as_deref(), None)
            .map_err(|source| IssuanceError::TokenIssuanceFailed {
                app_id: app.id.clone(),
                source,
            })?;

        let (token, encrypted) = match &app.token_encryption {
            Some(wrapping) => {
                let options = EncryptOptions {
                    algorithm: wrapping.algorithm,
                    method: wrapping.method,
                    content_type: Some("JWT".to_string()),
                };
                let wrapped = jose
                    .encrypt_with(signed.compact.as_bytes(), wrapping.key_id.as_deref(), &options)
                    .map_err(|source| IssuanceError::EncryptionFailed {
                        app_id: app.id.clone(),
                        source,
                    })?;
                (wrapped.compact, true)
            }
            None => (signed.compact, false),
        };

        debug!(
            kid = %signed.key_id,
            alg = %signed.algorithm,
            lifetime_seconds = claims.lifetime_seconds(),
            encrypted,
            "token issued"
        );
        metrics::record_token_issued(Protocol::Jwt.as_str(), signed.algorithm.as_str());

        Ok(IssuedToken {
            token,
            claims,
            key_id: signed.key_id,
            algorithm: signed.algorithm,
            encrypted,
        })
    }
}

impl AuthorizeAdapter for JwtAdapter {
    fn protocol(&self) -> Protocol {
        Protocol::Jwt
    }

    fn generate_info(&self, principal: &Principal, app: &App) -> Result<String, IssuanceError> {
        self.issue_token(principal, app).map(|issued| issued.token)
    }

    fn encrypt(
        &self,
        data: &str,
        key_id: Option<&str>,
        algorithm: Option<JweAlgorithm>,
    ) -> Result<String, IssuanceError> {
        let options = EncryptOptions {
            algorithm,
            ..EncryptOptions::default()
        };
        self.jose
            .snapshot()
            .encrypt_with(data.as_bytes(), key_id, &options)
            .map(|token| token.compact)
            .map_err(|source| IssuanceError::EncryptionFailed {
                app_id: current_app_id().unwrap_or_default(),
                source,
            })
    }

    fn authorize(&self, principal: &Principal, app: &App) -> Result<Delivery, IssuanceError> {
        let action = app
            .redirect_uri
            .as_deref()
            .filter(|uri| !uri.trim().is_empty())
            .ok_or_else(|| IssuanceError::MissingRedirectUri { app_id: app.id.clone() })?
            .to_string();
        let token = self.generate_info(principal, app)?;
        Ok(Delivery {
            action,
            method: DeliveryMethod::Post,
            parameters: vec![(TOKEN_PARAMETER.to_string(), token)],
        })
    }
}
