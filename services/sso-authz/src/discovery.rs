//! Discovery metadata advertising the JOSE capabilities of the service.

use crate::jose::{EncryptionMethod, JoseService, JweAlgorithm, JwsAlgorithm};
use serde::{Deserialize, Serialize};

/// Path of the JWKS document relative to the issuer.
pub const JWKS_PATH: &str = "/.well-known/jwks.json";

/// Provider metadata document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderMetadata {
    /// Issuer identifier, the `iss` of every issued token.
    pub issuer: String,
    /// JWKS URI.
    pub jwks_uri: String,
    /// JWS algorithms tokens may be signed with.
    pub token_signing_alg_values_supported: Vec<JwsAlgorithm>,
    /// JWE key management algorithms accepted for token wrapping.
    pub token_encryption_alg_values_supported: Vec<JweAlgorithm>,
    /// JWE content encryption methods accepted for token wrapping.
    pub token_encryption_enc_values_supported: Vec<EncryptionMethod>,
}

impl ProviderMetadata {
    /// Build the document from the capability unions of the service.
    #[must_use]
    pub fn from_service(issuer: &str, service: &JoseService) -> Self {
        let issuer = issuer.trim_end_matches('/');
        Self {
            issuer: issuer.to_string(),
            jwks_uri: format!("{issuer}{JWKS_PATH}"),
            token_signing_alg_values_supported: service.supported_signing_algorithms().into_iter().collect(),
            token_encryption_alg_values_supported: service.supported_algorithms().into_iter().collect(),
            token_encryption_enc_values_supported: service.supported_encryption_methods().into_iter().collect(),
        }
    }
}
