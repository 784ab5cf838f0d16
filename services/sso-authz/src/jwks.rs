//! JWKS publication.

use crate::jose::{JoseService, Jwk};
use serde::{Deserialize, Serialize};

/// Published JSON Web Key Set. Only public projections ever land here.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Jwks {
    pub keys: Vec<Jwk>,
}

impl Jwks {
    /// Public keys of the service, ordered by key id. A key still holding
    /// secret members is never published.
    #[must_use]
    pub fn from_service(service: &JoseService) -> Self {
        Self {
            keys: service
                .public_keys()
                .into_values()
                .filter(|key| !key.has_secret_members())
                .collect(),
        }
    }

    /// Number of published keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Whether no key is published.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Serialize as the `/.well-known/jwks.json` body.
    ///
    /// # Errors
    ///
    /// Returns the serializer error.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jose::{JoseDefaults, KeyRegistry};
    use test_utils::fixtures;

    #[test]
    fn test_jwks_only_public_material() {
        let registry = KeyRegistry::from_json(&fixtures::key_set(vec![
            fixtures::rsa_private_jwk("rsa-1"),
            fixtures::oct_jwk("hmac-1", &[7u8; 32]),
            fixtures::ec_jwk("ec-1"),
        ]))
        .unwrap();
        let service = JoseService::new(registry, JoseDefaults::default()).unwrap();
        let jwks = Jwks::from_service(&service);

        let kids: Vec<&str> = jwks.keys.iter().map(Jwk::kid).collect();
        assert_eq!(kids, ["ec-1", "rsa-1"]);
        assert_eq!(jwks.len(), 2);

        let json = jwks.to_json().unwrap();
        for member in ["\"d\"", "\"p\"", "\"q\"", "\"k\"", "\"qi\""] {
            assert!(!json.contains(member), "{member} leaked");
        }
        let parsed: Jwks = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, jwks);
    }

    #[test]
    fn test_empty_jwks() {
        let jwks = Jwks::default();
        assert!(jwks.is_empty());
        assert_eq!(jwks.to_json().unwrap(), r#"{"keys":[]}"#);
    }
}
