//! Compact JWS signing and verification bound to a single key.

use super::algorithm::JwsAlgorithm;
use super::error::JoseError;
use super::jwk::{Jwk, KeyKind};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};
use rsa::pkcs1::EncodeRsaPrivateKey;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;
use tracing::{debug, warn};

/// Result of a JWS signing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedToken {
    /// Compact serialization
    pub compact: String,
    /// Key used
    pub key_id: String,
    /// Algorithm used
    pub algorithm: JwsAlgorithm,
}

impl SignedToken {
    /// Compact serialization.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.compact
    }
}

/// Algorithm a key signs with when nothing else is asked for: the JWK's
/// own `alg` if usable, then RS256 for RSA, then the strongest HMAC.
fn preferred_algorithm(hint: Option<&str>, supported: &[JwsAlgorithm]) -> Option<JwsAlgorithm> {
    if let Some(alg) = hint.and_then(|h| h.parse::<JwsAlgorithm>().ok()) {
        if supported.contains(&alg) {
            return Some(alg);
        }
    }
    if supported.iter().all(|alg| alg.is_hmac()) {
        supported.last().copied()
    } else {
        supported.first().copied()
    }
}

fn hmac_algorithms(kid: &str, len: usize) -> Vec<JwsAlgorithm> {
    let algorithms = JwsAlgorithm::hmac_for_secret_len(len);
    if algorithms.is_empty() {
        warn!(kid, bytes = len, "secret shorter than any HMAC output, no signer built");
    }
    algorithms
}

/// Signer bound to one private or secret key.
pub struct Signer {
    kid: String,
    key: EncodingKey,
    algorithms: Vec<JwsAlgorithm>,
    preferred: JwsAlgorithm,
}

impl fmt::Debug for Signer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signer")
            .field("kid", &self.kid)
            .field("algorithms", &self.algorithms)
            .field("preferred", &self.preferred)
            .finish_non_exhaustive()
    }
}

impl Signer {
    /// Build the signer for a key, or `None` if the key cannot sign.
    ///
    /// # Errors
    ///
    /// Returns `InvalidKeyMaterial` if an RSA or `oct` key is malformed.
    pub fn from_jwk(kid: &str, jwk: &Jwk) -> Result<Option<Self>, JoseError> {
        let (key, algorithms) = match jwk.kind() {
            KeyKind::Rsa => {
                let Some(private) = jwk.rsa_private_key()? else {
                    return Ok(None);
                };
                let der = private
                    .to_pkcs1_der()
                    .map_err(|e| JoseError::invalid_key(kid, e.to_string()))?;
                (EncodingKey::from_rsa_der(der.as_bytes()), JwsAlgorithm::RSA.to_vec())
            }
            KeyKind::Oct => {
                let secret = jwk.octet_bytes()?;
                let algorithms = hmac_algorithms(kid, secret.len());
                if algorithms.is_empty() {
                    return Ok(None);
                }
                (EncodingKey::from_secret(&secret), algorithms)
            }
            KeyKind::Ec | KeyKind::Okp | KeyKind::Other(_) => {
                debug!(kid, kty = %jwk.kty, "key type not supported for signing");
                return Ok(None);
            }
        };

        let Some(preferred) = preferred_algorithm(jwk.alg.as_deref(), &algorithms) else {
            return Ok(None);
        };
        Ok(Some(Self {
            kid: kid.to_string(),
            key,
            algorithms,
            preferred,
        }))
    }

    /// Key id.
    #[must_use]
    pub fn kid(&self) -> &str {
        &self.kid
    }

    /// Algorithms this key can sign with.
    #[must_use]
    pub fn supported_algorithms(&self) -> &[JwsAlgorithm] {
        &self.algorithms
    }

    /// Algorithm used when the caller has no preference.
    #[must_use]
    pub const fn preferred_algorithm(&self) -> JwsAlgorithm {
        self.preferred
    }

    /// Sign claims into compact serialization with `kid` in the header.
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedAlgorithm` if the key cannot use `algorithm`,
    /// and `SigningFailed` if encoding fails.
    pub fn sign<T: Serialize>(&self, claims: &T, algorithm: JwsAlgorithm) -> Result<SignedToken, JoseError> {
        if !self.algorithms.contains(&algorithm) {
            return Err(JoseError::unsupported(algorithm.as_str(), Some(&self.kid)));
        }
        let mut header = Header::new(algorithm.to_jsonwebtoken());
        header.kid = Some(self.kid.clone());

        let compact = jsonwebtoken::encode(&header, claims, &self.key)
            .map_err(|e| JoseError::signing(&self.kid, e.to_string()))?;
        Ok(SignedToken {
            compact,
            key_id: self.kid.clone(),
            algorithm,
        })
    }
}

/// Verifier bound to one public or secret key.
pub struct Verifier {
    kid: String,
    key: DecodingKey,
    algorithms: Vec<JwsAlgorithm>,
}

impl fmt::Debug for Verifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Verifier")
            .field("kid", &self.kid)
            .field("algorithms", &self.algorithms)
            .finish_non_exhaustive()
    }
}

impl Verifier {
    /// Build the verifier for a key, or `None` if the key cannot verify.
    ///
    /// # Errors
    ///
    /// Returns `InvalidKeyMaterial` if an RSA or `oct` key is malformed.
    pub fn from_jwk(kid: &str, jwk: &Jwk) -> Result<Option<Self>, JoseError> {
        match jwk.kind() {
            KeyKind::Rsa => {
                // Parse first so malformed components surface as key errors.
                jwk.rsa_public_key()?;
                let (Some(n), Some(e)) = (jwk.n.as_deref(), jwk.e.as_deref()) else {
                    return Err(JoseError::invalid_key(kid, "missing 'n' or 'e'"));
                };
                let key = DecodingKey::from_rsa_components(n, e)
                    .map_err(|e| JoseError::invalid_key(kid, e.to_string()))?;
                Ok(Some(Self {
                    kid: kid.to_string(),
                    key,
                    algorithms: JwsAlgorithm::RSA.to_vec(),
                }))
            }
            KeyKind::Oct => {
                let secret = jwk.octet_bytes()?;
                let algorithms = JwsAlgorithm::hmac_for_secret_len(secret.len());
                if algorithms.is_empty() {
                    return Ok(None);
                }
                Ok(Some(Self {
                    kid: kid.to_string(),
                    key: DecodingKey::from_secret(&secret),
                    algorithms,
                }))
            }
            KeyKind::Ec | KeyKind::Okp | KeyKind::Other(_) => Ok(None),
        }
    }

    /// Key id.
    #[must_use]
    pub fn kid(&self) -> &str {
        &self.kid
    }

    /// Algorithms this key can verify.
    #[must_use]
    pub fn supported_algorithms(&self) -> &[JwsAlgorithm] {
        &self.algorithms
    }

    /// Check the signature and return the claims.
    ///
    /// Only the signature is checked. Expiry and audience are the
    /// consumer's decision.
    ///
    /// # Errors
    ///
    /// Returns `VerificationFailed` if the token is malformed, uses an
    /// algorithm this key does not implement, or the signature is invalid.
    pub fn verify<T: DeserializeOwned>(&self, token: &str) -> Result<T, JoseError> {
        let header = jsonwebtoken::decode_header(token)
            .map_err(|e| JoseError::verification(&self.kid, e.to_string()))?;
        let algorithm = JwsAlgorithm::try_from(header.alg)
            .map_err(|e| JoseError::verification(&self.kid, e.to_string()))?;
        if !self.algorithms.contains(&algorithm) {
            return Err(JoseError::verification(
                &self.kid,
                format!("algorithm {algorithm} not allowed for this key"),
            ));
        }

        let mut validation = Validation::new(algorithm.to_jsonwebtoken());
        validation.required_spec_claims = HashSet::new();
        validation.validate_exp = false;
        validation.validate_aud = false;

        jsonwebtoken::decode::<T>(token, &self.key, &validation)
            .map(|data| data.claims)
            .map_err(|e| JoseError::verification(&self.kid, e.to_string()))
    }
}
