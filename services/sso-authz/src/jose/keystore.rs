//! Key registry.
//!
//! Holds every configured key under its id. Built once and never mutated;
//! a reload builds a new registry and replaces the old one as a whole.

use super::error::JoseError;
use super::jwk::Jwk;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, instrument};

/// JWK set document as stored in the keystore file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KeySet {
    /// Keys in document order
    pub keys: Vec<Jwk>,
}

/// Immutable set of keys indexed by key id.
#[derive(Debug, Clone, Default)]
pub struct KeyRegistry {
    keys: BTreeMap<String, Jwk>,
}

impl KeyRegistry {
    /// Build a registry from caller-assigned ids.
    ///
    /// The map id becomes the key's `kid`.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateKeyId` if two entries share an id.
    pub fn load<I>(keys: I) -> Result<Self, JoseError>
    where
        I: IntoIterator<Item = (String, Jwk)>,
    {
        let mut registry = BTreeMap::new();
        for (kid, mut jwk) in keys {
            if registry.contains_key(&kid) {
                return Err(JoseError::DuplicateKeyId { kid });
            }
            jwk.kid = Some(kid.clone());
            registry.insert(kid, jwk);
        }
        Ok(Self { keys: registry })
    }

    /// Build a registry from a key set whose entries carry their own ids.
    ///
    /// # Errors
    ///
    /// Returns `MissingKeyId` for an entry without a non-empty `kid`, or
    /// `DuplicateKeyId` if two entries share one.
    pub fn from_key_set(set: KeySet) -> Result<Self, JoseError> {
        let mut entries = Vec::with_capacity(set.keys.len());
        for (index, jwk) in set.keys.into_iter().enumerate() {
            let kid = match jwk.kid.as_deref() {
                Some(kid) if !kid.is_empty() => kid.to_string(),
                _ => return Err(JoseError::MissingKeyId { index }),
            };
            entries.push((kid, jwk));
        }
        Self::load(entries)
    }

    /// Parse a JWK set document.
    ///
    /// # Errors
    ///
    /// Returns `KeyStore` if the document is not a JWK set, plus the
    /// errors of [`KeyRegistry::from_key_set`].
    pub fn from_json(document: &str) -> Result<Self, JoseError> {
        let set: KeySet = serde_json::from_str(document)
            .map_err(|e| JoseError::keystore(format!("invalid JWK set: {e}")))?;
        Self::from_key_set(set)
    }

    /// Read and parse a JWK set file.
    ///
    /// # Errors
    ///
    /// Returns `KeyStore` if the file cannot be read, plus the errors of
    /// [`KeyRegistry::from_json`].
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, JoseError> {
        let path = path.as_ref();
        let document = std::fs::read_to_string(path)
            .map_err(|e| JoseError::keystore(format!("cannot read {}: {e}", path.display())))?;
        let registry = Self::from_json(&document)?;
        debug!(keys = registry.len(), "keystore loaded");
        Ok(registry)
    }

    /// Public-only projection of every key that has one.
    #[must_use]
    pub fn public_keys(&self) -> BTreeMap<String, Jwk> {
        self.keys
            .iter()
            .filter_map(|(kid, jwk)| jwk.to_public().map(|public| (kid.clone(), public)))
            .collect()
    }

    /// Look up a key.
    #[must_use]
    pub fn get(&self, kid: &str) -> Option<&Jwk> {
        self.keys.get(kid)
    }

    /// Iterate keys in id order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Jwk)> {
        self.keys.iter().map(|(kid, jwk)| (kid.as_str(), jwk))
    }

    /// Key ids in order.
    #[must_use]
    pub fn key_ids(&self) -> Vec<&str> {
        self.keys.keys().map(String::as_str).collect()
    }

    /// The only key id, if the registry holds exactly one key.
    #[must_use]
    pub fn sole_key_id(&self) -> Option<&str> {
        if self.keys.len() == 1 {
            self.keys.keys().next().map(String::as_str)
        } else {
            None
        }
    }

    /// Number of keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Whether the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_utils::fixtures;

    fn jwk(value: serde_json::Value) -> Jwk {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_load_assigns_ids() {
        let registry = KeyRegistry::load(vec![
            ("enc".to_string(), jwk(fixtures::rsa_private_jwk("ignored"))),
            ("mac".to_string(), jwk(fixtures::oct_jwk("other", &[3u8; 32]))),
        ])
        .unwrap();

        assert_eq!(registry.key_ids(), vec!["enc", "mac"]);
        assert_eq!(registry.get("enc").unwrap().kid(), "enc");
        assert_eq!(registry.sole_key_id(), None);
    }

    #[test]
    fn test_load_rejects_duplicates() {
        let err = KeyRegistry::load(vec![
            ("k".to_string(), jwk(fixtures::oct_jwk("k", &[1u8; 16]))),
            ("k".to_string(), jwk(fixtures::oct_jwk("k", &[2u8; 16]))),
        ])
        .unwrap_err();
        assert!(matches!(err, JoseError::DuplicateKeyId { ref kid } if kid == "k"));
    }

    #[test]
    fn test_key_set_requires_ids() {
        let mut anonymous = fixtures::oct_jwk("x", &[1u8; 16]);
        anonymous.as_object_mut().unwrap().remove("kid");
        let document = fixtures::key_set(vec![fixtures::rsa_public_jwk("rsa-1"), anonymous]);

        let err = KeyRegistry::from_json(&document).unwrap_err();
        assert!(matches!(err, JoseError::MissingKeyId { index: 1 }));
    }

    #[test]
    fn test_key_set_rejects_duplicates() {
        let document = fixtures::key_set(vec![
            fixtures::rsa_public_jwk("same"),
            fixtures::second_rsa_private_jwk("same"),
        ]);
        let err = KeyRegistry::from_json(&document).unwrap_err();
        assert!(matches!(err, JoseError::DuplicateKeyId { .. }));
    }

    #[test]
    fn test_invalid_document() {
        let err = KeyRegistry::from_json("{\"not\":\"a key set\"}").unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_missing_file() {
        let err = KeyRegistry::from_file("/nonexistent/keystore.jwks.json").unwrap_err();
        assert!(matches!(err, JoseError::KeyStore { .. }));
    }

    #[test]
    fn test_public_keys_projection() {
        let document = fixtures::key_set(vec![
            fixtures::rsa_private_jwk("rsa-1"),
            fixtures::oct_jwk("mac", &[9u8; 32]),
            fixtures::ec_jwk("ec-1"),
        ]);
        let registry = KeyRegistry::from_json(&document).unwrap();
        let public = registry.public_keys();

        assert_eq!(public.len(), 2);
        assert!(public.contains_key("rsa-1"));
        assert!(public.contains_key("ec-1"));
        assert!(public.values().all(|k| !k.has_secret_members()));
    }
}
