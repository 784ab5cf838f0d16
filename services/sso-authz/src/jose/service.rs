//! JOSE service.
//!
//! Derives every encrypter, decrypter, signer and verifier from a key
//! registry snapshot at construction, then serves keyed operations by key
//! id. Nothing is mutated after construction.

use super::algorithm::{EncryptionMethod, JweAlgorithm, JwsAlgorithm};
use super::error::{JoseError, KeyOperation};
use super::jwe::{Decrypter, EncryptedToken, Encrypter};
use super::jwk::Jwk;
use super::keystore::KeyRegistry;
use super::signer::{SignedToken, Signer, Verifier};
use crate::metrics;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use tracing::{debug, info, instrument, warn};

/// Configured defaults applied when a caller omits a key id or algorithm.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JoseDefaults {
    /// Encryption key id override
    pub encryption_key_id: Option<String>,
    /// Decryption key id override
    pub decryption_key_id: Option<String>,
    /// Signing key id override
    pub signing_key_id: Option<String>,
    /// Default JWS algorithm
    pub signing_algorithm: Option<JwsAlgorithm>,
    /// Default JWE key management algorithm
    pub encryption_algorithm: Option<JweAlgorithm>,
    /// Default JWE content encryption method
    pub encryption_method: Option<EncryptionMethod>,
}

/// Per-call JWE options.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EncryptOptions {
    /// Key management algorithm, else the configured default, else the
    /// key's preferred one
    pub algorithm: Option<JweAlgorithm>,
    /// Content encryption method, resolved the same way
    pub method: Option<EncryptionMethod>,
    /// `cty` header, e.g. `JWT` for a nested token
    pub content_type: Option<String>,
}

/// Keyed sign, verify, encrypt and decrypt over a key registry snapshot.
pub struct JoseService {
    registry: KeyRegistry,
    defaults: JoseDefaults,
    encrypters: BTreeMap<String, Encrypter>,
    decrypters: BTreeMap<String, Decrypter>,
    signers: BTreeMap<String, Signer>,
    verifiers: BTreeMap<String, Verifier>,
}

impl fmt::Debug for JoseService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JoseService")
            .field("keys", &self.registry.key_ids())
            .field("defaults", &self.defaults)
            .field("encrypters", &self.encrypters.keys().collect::<Vec<_>>())
            .field("decrypters", &self.decrypters.keys().collect::<Vec<_>>())
            .field("signers", &self.signers.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

fn insert_built<T>(map: &mut BTreeMap<String, T>, kid: &str, built: Option<T>) {
    if let Some(value) = built {
        map.insert(kid.to_string(), value);
    }
}

/// Record an operation outcome and pass the result through.
fn observe<T>(operation: KeyOperation, result: Result<T, JoseError>) -> Result<T, JoseError> {
    match &result {
        Ok(_) => metrics::record_jose_operation(operation, "success"),
        Err(e) => {
            warn!(%operation, error = %e, "jose operation failed");
            metrics::record_jose_operation(operation, "failure");
        }
    }
    result
}

impl JoseService {
    /// Build the service from a registry snapshot.
    ///
    /// Keys of unsupported kinds or sizes are logged and skipped.
    ///
    /// # Errors
    ///
    /// Returns `InvalidKeyMaterial` if a key of a supported kind is
    /// malformed.
    #[instrument(skip_all, fields(keys = registry.len()))]
    pub fn new(registry: KeyRegistry, defaults: JoseDefaults) -> Result<Self, JoseError> {
        let mut encrypters = BTreeMap::new();
        let mut decrypters = BTreeMap::new();
        let mut signers = BTreeMap::new();
        let mut verifiers = BTreeMap::new();

        for (kid, jwk) in registry.iter() {
            insert_built(&mut encrypters, kid, Encrypter::from_jwk(kid, jwk)?);
            insert_built(&mut decrypters, kid, Decrypter::from_jwk(kid, jwk)?);
            insert_built(&mut signers, kid, Signer::from_jwk(kid, jwk)?);
            insert_built(&mut verifiers, kid, Verifier::from_jwk(kid, jwk)?);
        }

        info!(
            encrypters = encrypters.len(),
            decrypters = decrypters.len(),
            signers = signers.len(),
            verifiers = verifiers.len(),
            "jose service built"
        );

        Ok(Self {
            registry,
            defaults,
            encrypters,
            decrypters,
            signers,
            verifiers,
        })
    }

    /// Configured defaults.
    #[must_use]
    pub const fn defaults(&self) -> &JoseDefaults {
        &self.defaults
    }

    /// Underlying registry snapshot.
    #[must_use]
    pub const fn registry(&self) -> &KeyRegistry {
        &self.registry
    }

    fn default_key_id<'a>(&'a self, configured: Option<&'a str>) -> Option<&'a str> {
        configured.or_else(|| self.registry.sole_key_id())
    }

    /// Configured encryption key id, else the only key's id.
    #[must_use]
    pub fn default_encryption_key_id(&self) -> Option<&str> {
        self.default_key_id(self.defaults.encryption_key_id.as_deref())
    }

    /// Configured decryption key id, else the only key's id.
    #[must_use]
    pub fn default_decryption_key_id(&self) -> Option<&str> {
        self.default_key_id(self.defaults.decryption_key_id.as_deref())
    }

    /// Configured signing key id, else the only key's id.
    #[must_use]
    pub fn default_signing_key_id(&self) -> Option<&str> {
        self.default_key_id(self.defaults.signing_key_id.as_deref())
    }

    /// Algorithm the default signer uses when none is requested.
    #[must_use]
    pub fn default_signing_algorithm(&self) -> Option<JwsAlgorithm> {
        self.defaults.signing_algorithm.or_else(|| {
            self.default_signing_key_id()
                .and_then(|kid| self.signers.get(kid))
                .map(Signer::preferred_algorithm)
        })
    }

    /// Resolve the capability object for an operation. An empty map on the
    /// default path is a configuration error; a named key that has no
    /// capability object is unknown.
    fn resolve<'a, T>(
        &'a self,
        map: &'a BTreeMap<String, T>,
        operation: KeyOperation,
        key_id: Option<&'a str>,
        default: Option<&'a str>,
    ) -> Result<&'a T, JoseError> {
        let kid = match key_id {
            Some(kid) => kid,
            None => {
                if map.is_empty() {
                    return Err(JoseError::NoUsableKeys { operation });
                }
                default.ok_or(JoseError::NoDefaultKey { operation })?
            }
        };
        map.get(kid).ok_or_else(|| JoseError::UnknownKeyId {
            kid: kid.to_string(),
            operation,
        })
    }

    /// Encrypt with the given key, or the default encryption key.
    ///
    /// # Errors
    ///
    /// Returns `NoDefaultKey`, `NoUsableKeys` or `UnknownKeyId` if no key
    /// resolves, and `EncryptionFailed` on cryptographic failure.
    pub fn encrypt(&self, plaintext: &[u8], key_id: Option<&str>) -> Result<EncryptedToken, JoseError> {
        self.encrypt_with(plaintext, key_id, &EncryptOptions::default())
    }

    /// Encrypt with explicit algorithm options.
    ///
    /// # Errors
    ///
    /// As [`JoseService::encrypt`], plus `UnsupportedAlgorithm` if the
    /// resolved key cannot use the requested or configured algorithm.
    #[instrument(skip(self, plaintext), fields(kid = key_id))]
    pub fn encrypt_with(
        &self,
        plaintext: &[u8],
        key_id: Option<&str>,
        options: &EncryptOptions,
    ) -> Result<EncryptedToken, JoseError> {
        let result = self
            .resolve(
                &self.encrypters,
                KeyOperation::Encrypt,
                key_id,
                self.default_encryption_key_id(),
            )
            .and_then(|encrypter| {
                let (preferred_alg, preferred_enc) = encrypter.preferred();
                let algorithm = options
                    .algorithm
                    .or(self.defaults.encryption_algorithm)
                    .unwrap_or(preferred_alg);
                let method = options
                    .method
                    .or(self.defaults.encryption_method)
                    .unwrap_or(preferred_enc);
                debug!(kid = encrypter.kid(), %algorithm, %method, "encrypting");
                encrypter.encrypt(plaintext, algorithm, method, options.content_type.as_deref())
            });
        observe(KeyOperation::Encrypt, result)
    }

    /// Decrypt with the given key, or the default decryption key.
    ///
    /// # Errors
    ///
    /// Returns `NoDefaultKey`, `NoUsableKeys` or `UnknownKeyId` if no key
    /// resolves, and `DecryptionFailed` if the token does not decrypt.
    #[instrument(skip(self, token), fields(kid = key_id))]
    pub fn decrypt(&self, token: &str, key_id: Option<&str>) -> Result<Vec<u8>, JoseError> {
        let result = self
            .resolve(
                &self.decrypters,
                KeyOperation::Decrypt,
                key_id,
                self.default_decryption_key_id(),
            )
            .and_then(|decrypter| decrypter.decrypt(token));
        observe(KeyOperation::Decrypt, result)
    }

    /// Sign claims with the given key and algorithm, falling back to the
    /// default signing key and algorithm.
    ///
    /// # Errors
    ///
    /// Returns `NoDefaultKey`, `NoUsableKeys` or `UnknownKeyId` if no key
    /// resolves, `UnsupportedAlgorithm` if the key cannot use the
    /// algorithm, and `SigningFailed` if encoding fails.
    #[instrument(skip(self, claims), fields(kid = key_id, alg = algorithm.map(JwsAlgorithm::as_str)))]
    pub fn sign<T: Serialize>(
        &self,
        claims: &T,
        key_id: Option<&str>,
        algorithm: Option<JwsAlgorithm>,
    ) -> Result<SignedToken, JoseError> {
        let result = self
            .resolve(
                &self.signers,
                KeyOperation::Sign,
                key_id,
                self.default_signing_key_id(),
            )
            .and_then(|signer| {
                let algorithm = algorithm
                    .or(self.defaults.signing_algorithm)
                    .unwrap_or_else(|| signer.preferred_algorithm());
                signer.sign(claims, algorithm)
            });
        observe(KeyOperation::Sign, result)
    }

    /// Verify a compact JWS and return its claims.
    ///
    /// The key is the given id, else the token's `kid` header, else the
    /// default signing key.
    ///
    /// # Errors
    ///
    /// Returns `NoDefaultKey`, `NoUsableKeys` or `UnknownKeyId` if no key
    /// resolves, and `VerificationFailed` if the signature does not check.
    #[instrument(skip(self, token), fields(kid = key_id))]
    pub fn verify<T: DeserializeOwned>(&self, token: &str, key_id: Option<&str>) -> Result<T, JoseError> {
        let header_kid = jsonwebtoken::decode_header(token).ok().and_then(|h| h.kid);
        let key_id = key_id.or(header_kid.as_deref());
        let result = self
            .resolve(
                &self.verifiers,
                KeyOperation::Verify,
                key_id,
                self.default_signing_key_id(),
            )
            .and_then(|verifier| verifier.verify(token));
        observe(KeyOperation::Verify, result)
    }

    /// Key management algorithms across every encrypter and decrypter.
    #[must_use]
    pub fn supported_algorithms(&self) -> BTreeSet<JweAlgorithm> {
        let encrypting = self.encrypters.values().flat_map(Encrypter::supported_algorithms);
        let decrypting = self.decrypters.values().flat_map(Decrypter::supported_algorithms);
        encrypting.chain(decrypting).copied().collect()
    }

    /// Content encryption methods across every encrypter and decrypter.
    #[must_use]
    pub fn supported_encryption_methods(&self) -> BTreeSet<EncryptionMethod> {
        let encrypting = self.encrypters.values().flat_map(Encrypter::supported_methods);
        let decrypting = self.decrypters.values().flat_map(Decrypter::supported_methods);
        encrypting.chain(decrypting).copied().collect()
    }

    /// Signing algorithms across every signer and verifier.
    #[must_use]
    pub fn supported_signing_algorithms(&self) -> BTreeSet<JwsAlgorithm> {
        let signing = self.signers.values().flat_map(Signer::supported_algorithms);
        let verifying = self.verifiers.values().flat_map(Verifier::supported_algorithms);
        signing.chain(verifying).copied().collect()
    }

    /// Public projection of every key, for publication.
    #[must_use]
    pub fn public_keys(&self) -> BTreeMap<String, Jwk> {
        self.registry.public_keys()
    }

    /// Ids of keys with an encrypter.
    #[must_use]
    pub fn encrypter_key_ids(&self) -> Vec<&str> {
        self.encrypters.keys().map(String::as_str).collect()
    }

    /// Ids of keys with a decrypter.
    #[must_use]
    pub fn decrypter_key_ids(&self) -> Vec<&str> {
        self.decrypters.keys().map(String::as_str).collect()
    }

    /// Ids of keys with a signer.
    #[must_use]
    pub fn signer_key_ids(&self) -> Vec<&str> {
        self.signers.keys().map(String::as_str).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};
    use test_utils::fixtures;

    fn service(keys: Vec<Value>, defaults: JoseDefaults) -> JoseService {
        let registry = KeyRegistry::from_json(&fixtures::key_set(keys)).unwrap();
        JoseService::new(registry, defaults).unwrap()
    }

    #[test]
    fn test_capability_maps() {
        let service = service(
            vec![
                fixtures::rsa_private_jwk("rsa-priv"),
                fixtures::rsa_public_jwk("rsa-pub"),
                fixtures::oct_jwk("aes", &[1u8; 16]),
                fixtures::ec_jwk("ec"),
            ],
            JoseDefaults::default(),
        );

        assert_eq!(service.encrypter_key_ids(), vec!["aes", "rsa-priv", "rsa-pub"]);
        assert_eq!(service.decrypter_key_ids(), vec!["aes", "rsa-priv"]);
        assert_eq!(service.signer_key_ids(), vec!["rsa-priv"]);
    }

    #[test]
    fn test_single_key_is_default() {
        let service = service(vec![fixtures::oct_jwk("only", &[2u8; 32])], JoseDefaults::default());
        assert_eq!(service.default_encryption_key_id(), Some("only"));
        assert_eq!(service.default_decryption_key_id(), Some("only"));
        assert_eq!(service.default_signing_key_id(), Some("only"));
        assert_eq!(service.default_signing_algorithm(), Some(JwsAlgorithm::HS256));

        let token = service.encrypt(b"data", None).unwrap();
        assert_eq!(token.key_id, "only");
        assert_eq!(service.decrypt(&token.compact, None).unwrap(), b"data");
    }

    #[test]
    fn test_multiple_keys_without_default_fail() {
        let service = service(
            vec![fixtures::oct_jwk("a", &[1u8; 16]), fixtures::oct_jwk("b", &[2u8; 16])],
            JoseDefaults::default(),
        );
        assert_eq!(service.default_encryption_key_id(), None);
        let err = service.encrypt(b"data", None).unwrap_err();
        assert!(matches!(err, JoseError::NoDefaultKey { operation: KeyOperation::Encrypt }));
    }

    #[test]
    fn test_configured_default_wins() {
        let service = service(
            vec![fixtures::oct_jwk("a", &[1u8; 16]), fixtures::oct_jwk("b", &[2u8; 32])],
            JoseDefaults {
                encryption_key_id: Some("b".into()),
                decryption_key_id: Some("b".into()),
                ..JoseDefaults::default()
            },
        );
        let token = service.encrypt(b"data", None).unwrap();
        assert_eq!(token.key_id, "b");
        assert_eq!(token.method, EncryptionMethod::A256Gcm);
        assert_eq!(service.decrypt(&token.compact, None).unwrap(), b"data");
    }

    #[test]
    fn test_unknown_key_id() {
        let service = service(vec![fixtures::rsa_public_jwk("pub")], JoseDefaults::default());
        let token = service.encrypt(b"data", Some("pub")).unwrap();

        let err = service.decrypt(&token.compact, Some("pub")).unwrap_err();
        assert!(matches!(err, JoseError::UnknownKeyId { ref kid, .. } if kid == "pub"));

        let err = service.encrypt(b"data", Some("missing")).unwrap_err();
        assert!(err.is_resolution());
    }

    #[test]
    fn test_no_usable_keys() {
        let service = service(vec![fixtures::ec_jwk("ec")], JoseDefaults::default());
        let err = service.encrypt(b"data", None).unwrap_err();
        assert!(matches!(err, JoseError::NoUsableKeys { .. }));
        assert!(err.is_configuration());

        let err = service.sign(&json!({}), Some("ec"), None).unwrap_err();
        assert!(matches!(err, JoseError::UnknownKeyId { .. }));
    }

    #[test]
    fn test_malformed_rsa_key_fails_construction() {
        let mut bad = fixtures::rsa_public_jwk("bad");
        bad["n"] = Value::String("***".into());
        let registry = KeyRegistry::from_json(&fixtures::key_set(vec![bad])).unwrap();
        let err = JoseService::new(registry, JoseDefaults::default()).unwrap_err();
        assert!(matches!(err, JoseError::InvalidKeyMaterial { .. }));
    }

    #[test]
    fn test_sign_algorithm_resolution() {
        let service = service(
            vec![fixtures::rsa_private_jwk("rsa")],
            JoseDefaults {
                signing_algorithm: Some(JwsAlgorithm::PS256),
                ..JoseDefaults::default()
            },
        );
        assert_eq!(service.sign(&json!({}), None, None).unwrap().algorithm, JwsAlgorithm::PS256);
        assert_eq!(
            service.sign(&json!({}), None, Some(JwsAlgorithm::RS512)).unwrap().algorithm,
            JwsAlgorithm::RS512
        );
        let err = service.sign(&json!({}), None, Some(JwsAlgorithm::HS256)).unwrap_err();
        assert!(matches!(err, JoseError::UnsupportedAlgorithm { .. }));
    }

    #[test]
    fn test_verify_uses_header_kid() {
        let service = service(
            vec![fixtures::rsa_private_jwk("a"), fixtures::second_rsa_private_jwk("b")],
            JoseDefaults::default(),
        );
        let token = service.sign(&json!({"sub": "bob"}), Some("b"), None).unwrap();
        let claims: Value = service.verify(&token.compact, None).unwrap();
        assert_eq!(claims["sub"], "bob");

        assert!(service.verify::<Value>(&token.compact, Some("a")).is_err());
    }

    #[test]
    fn test_capability_unions() {
        let service = service(
            vec![fixtures::rsa_public_jwk("rsa"), fixtures::oct_jwk("aes", &[1u8; 16])],
            JoseDefaults::default(),
        );
        assert_eq!(
            service.supported_algorithms(),
            BTreeSet::from([JweAlgorithm::RsaOaep256, JweAlgorithm::Dir])
        );
        assert_eq!(
            service.supported_encryption_methods(),
            BTreeSet::from([EncryptionMethod::A128Gcm, EncryptionMethod::A256Gcm])
        );
        assert!(service.supported_signing_algorithms().contains(&JwsAlgorithm::RS256));
        assert!(!service.supported_signing_algorithms().contains(&JwsAlgorithm::HS256));
    }

    #[test]
    fn test_nested_content_type() {
        let service = service(vec![fixtures::rsa_private_jwk("rsa")], JoseDefaults::default());
        let options = EncryptOptions {
            method: Some(EncryptionMethod::A128Gcm),
            content_type: Some("JWT".into()),
            ..EncryptOptions::default()
        };
        let token = service.encrypt_with(b"a.b.c", None, &options).unwrap();
        assert_eq!(token.algorithm, JweAlgorithm::RsaOaep256);
        assert_eq!(token.method, EncryptionMethod::A128Gcm);
        assert_eq!(service.decrypt(&token.compact, None).unwrap(), b"a.b.c");
    }
}
