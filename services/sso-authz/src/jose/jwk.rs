//! JSON Web Key model.
//!
//! Private and secret members live in [`SecretParams`], which is zeroized on
//! drop and never printed by `Debug`.

use super::error::JoseError;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use rsa::{BigUint, RsaPrivateKey, RsaPublicKey};
use serde::{Deserialize, Serialize};
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

/// Key type as classified by the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyKind {
    /// RSA key pair or public key
    Rsa,
    /// Symmetric secret
    Oct,
    /// Elliptic curve key
    Ec,
    /// Octet key pair (Ed25519, X25519)
    Okp,
    /// Any other `kty`
    Other(String),
}

/// Private and secret JWK members.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct SecretParams {
    /// RSA private exponent, or EC and OKP private key
    #[serde(skip_serializing_if = "Option::is_none")]
    pub d: Option<String>,
    /// RSA first prime factor
    #[serde(skip_serializing_if = "Option::is_none")]
    pub p: Option<String>,
    /// RSA second prime factor
    #[serde(skip_serializing_if = "Option::is_none")]
    pub q: Option<String>,
    /// RSA first factor CRT exponent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dp: Option<String>,
    /// RSA second factor CRT exponent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dq: Option<String>,
    /// RSA CRT coefficient
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qi: Option<String>,
    /// Symmetric key value
    #[serde(skip_serializing_if = "Option::is_none")]
    pub k: Option<String>,
}

impl SecretParams {
    fn is_empty(&self) -> bool {
        self.d.is_none()
            && self.p.is_none()
            && self.q.is_none()
            && self.dp.is_none()
            && self.dq.is_none()
            && self.qi.is_none()
            && self.k.is_none()
    }
}

/// JSON Web Key.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Jwk {
    /// Key type (RSA, EC, oct)
    pub kty: String,
    /// Key ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kid: Option<String>,
    /// Key use (sig, enc)
    #[serde(rename = "use", skip_serializing_if = "Option::is_none")]
    pub key_use: Option<String>,
    /// Algorithm hint
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alg: Option<String>,
    /// RSA modulus
    #[serde(skip_serializing_if = "Option::is_none")]
    pub n: Option<String>,
    /// RSA public exponent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub e: Option<String>,
    /// EC or OKP curve
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crv: Option<String>,
    /// EC x coordinate or OKP public key
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x: Option<String>,
    /// EC y coordinate
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y: Option<String>,
    /// Private and secret members
    #[serde(flatten)]
    pub secret: SecretParams,
}

impl fmt::Debug for Jwk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Jwk")
            .field("kty", &self.kty)
            .field("kid", &self.kid)
            .field("use", &self.key_use)
            .field("alg", &self.alg)
            .field("private", &self.is_private())
            .finish_non_exhaustive()
    }
}

impl Jwk {
    /// Classify the key by `kty`.
    #[must_use]
    pub fn kind(&self) -> KeyKind {
        match self.kty.as_str() {
            "RSA" => KeyKind::Rsa,
            "oct" => KeyKind::Oct,
            "EC" => KeyKind::Ec,
            "OKP" => KeyKind::Okp,
            other => KeyKind::Other(other.to_string()),
        }
    }

    /// Key id, or the empty string for an unnamed key.
    #[must_use]
    pub fn kid(&self) -> &str {
        self.kid.as_deref().unwrap_or_default()
    }

    /// Whether the key carries its private or secret half.
    #[must_use]
    pub fn is_private(&self) -> bool {
        match self.kind() {
            KeyKind::Oct => self.secret.k.is_some(),
            _ => self.secret.d.is_some(),
        }
    }

    /// Public-only projection, or `None` when the key has no public half.
    #[must_use]
    pub fn to_public(&self) -> Option<Self> {
        match self.kind() {
            KeyKind::Rsa | KeyKind::Ec | KeyKind::Okp => {
                let mut public = self.clone();
                public.secret = SecretParams::default();
                Some(public)
            }
            KeyKind::Oct | KeyKind::Other(_) => None,
        }
    }

    /// Whether any private or secret member is present.
    #[must_use]
    pub fn has_secret_members(&self) -> bool {
        !self.secret.is_empty()
    }

    fn decode(&self, member: &str, value: Option<&str>) -> Result<Zeroizing<Vec<u8>>, JoseError> {
        let value = value.ok_or_else(|| JoseError::invalid_key(self.kid(), format!("missing '{member}'")))?;
        URL_SAFE_NO_PAD
            .decode(value.trim_end_matches('='))
            .map(Zeroizing::new)
            .map_err(|e| JoseError::invalid_key(self.kid(), format!("'{member}' is not base64url: {e}")))
    }

    fn big_uint(&self, member: &str, value: Option<&str>) -> Result<BigUint, JoseError> {
        self.decode(member, value).map(|bytes| BigUint::from_bytes_be(&bytes))
    }

    /// Parse the RSA public key from `n` and `e`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidKeyMaterial` if a member is missing or inconsistent.
    pub fn rsa_public_key(&self) -> Result<RsaPublicKey, JoseError> {
        let n = self.big_uint("n", self.n.as_deref())?;
        let e = self.big_uint("e", self.e.as_deref())?;
        RsaPublicKey::new(n, e).map_err(|e| JoseError::invalid_key(self.kid(), e.to_string()))
    }

    /// Parse the RSA private key, or `None` for a public-only key.
    ///
    /// # Errors
    ///
    /// Returns `InvalidKeyMaterial` if the private members do not form a
    /// valid key.
    pub fn rsa_private_key(&self) -> Result<Option<RsaPrivateKey>, JoseError> {
        if self.secret.d.is_none() {
            return Ok(None);
        }
        let n = self.big_uint("n", self.n.as_deref())?;
        let e = self.big_uint("e", self.e.as_deref())?;
        let d = self.big_uint("d", self.secret.d.as_deref())?;
        // CRT members are optional; without both primes they are recovered from n, e and d.
        let primes = match (self.secret.p.as_deref(), self.secret.q.as_deref()) {
            (None, None) => Vec::new(),
            (p, q) => vec![self.big_uint("p", p)?, self.big_uint("q", q)?],
        };

        let mut key = RsaPrivateKey::from_components(n, e, d, primes)
            .map_err(|e| JoseError::invalid_key(self.kid(), e.to_string()))?;
        key.validate()
            .map_err(|e| JoseError::invalid_key(self.kid(), e.to_string()))?;
        key.precompute()
            .map_err(|e| JoseError::invalid_key(self.kid(), e.to_string()))?;
        Ok(Some(key))
    }

    /// Decode the symmetric secret `k`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidKeyMaterial` if `k` is missing, empty or not base64url.
    pub fn octet_bytes(&self) -> Result<Zeroizing<Vec<u8>>, JoseError> {
        let bytes = self.decode("k", self.secret.k.as_deref())?;
        if bytes.is_empty() {
            return Err(JoseError::invalid_key(self.kid(), "empty 'k'"));
        }
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_utils::fixtures;

    fn parse(value: serde_json::Value) -> Jwk {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_kind_and_privacy() {
        let rsa = parse(fixtures::rsa_private_jwk("rsa-1"));
        assert_eq!(rsa.kind(), KeyKind::Rsa);
        assert!(rsa.is_private());

        let public = parse(fixtures::rsa_public_jwk("rsa-1"));
        assert!(!public.is_private());

        let oct = parse(fixtures::oct_jwk("hmac", &[7u8; 32]));
        assert_eq!(oct.kind(), KeyKind::Oct);
        assert!(oct.is_private());

        let ec = parse(fixtures::ec_jwk("ec-1"));
        assert_eq!(ec.kind(), KeyKind::Ec);
    }

    #[test]
    fn test_public_projection_strips_secrets() {
        let rsa = parse(fixtures::rsa_private_jwk("rsa-1"));
        let public = rsa.to_public().unwrap();
        assert!(!public.has_secret_members());
        assert_eq!(public.n, rsa.n);

        let json = serde_json::to_value(&public).unwrap();
        assert!(json.get("d").is_none());
        assert!(json.get("qi").is_none());
        assert_eq!(json["kid"], "rsa-1");
    }

    #[test]
    fn test_oct_has_no_public_projection() {
        let oct = parse(fixtures::oct_jwk("hmac", &[7u8; 32]));
        assert!(oct.to_public().is_none());
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let oct = parse(fixtures::oct_jwk("hmac", b"super-secret-value-0123456789abc"));
        let printed = format!("{oct:?}");
        assert!(!printed.contains(oct.secret.k.as_deref().unwrap()));
        assert!(printed.contains("hmac"));
    }

    #[test]
    fn test_rsa_material() {
        let rsa = parse(fixtures::rsa_private_jwk("rsa-1"));
        assert!(rsa.rsa_public_key().is_ok());
        assert!(rsa.rsa_private_key().unwrap().is_some());

        let public = parse(fixtures::rsa_public_jwk("rsa-1"));
        assert!(public.rsa_private_key().unwrap().is_none());
    }

    #[test]
    fn test_rsa_private_key_recovers_primes() {
        let stripped = parse(fixtures::rsa_private_jwk_without_crt("rsa-min"));
        assert!(stripped.is_private());
        let recovered = stripped.rsa_private_key().unwrap().unwrap();
        let full = parse(fixtures::rsa_private_jwk("rsa-min")).rsa_private_key().unwrap().unwrap();
        assert_eq!(recovered.to_public_key(), full.to_public_key());

        let mut half = fixtures::rsa_private_jwk_without_crt("rsa-half");
        half["q"] = fixtures::rsa_private_jwk("rsa-half")["q"].clone();
        let err = parse(half).rsa_private_key().unwrap_err();
        assert!(matches!(err, JoseError::InvalidKeyMaterial { ref reason, .. } if reason.contains("'p'")));
    }

    #[test]
    fn test_okp_public_projection() {
        let okp = parse(serde_json::json!({
            "kty": "OKP",
            "kid": "ed-1",
            "crv": "Ed25519",
            "x": "11qYAYKxCrfVS_7TyWQHOg7hcvPapiMlrwIaaPcHURo",
            "d": "nWGxne_9WmC6hEr0kuwsxERJxWl7MmkZcDusAxyuf2A",
        }));
        assert_eq!(okp.kind(), KeyKind::Okp);
        assert!(okp.is_private());

        let public = okp.to_public().unwrap();
        assert!(!public.has_secret_members());
        assert_eq!(public.crv.as_deref(), Some("Ed25519"));
        assert_eq!(public.x, okp.x);
    }

    #[test]
    fn test_malformed_modulus() {
        let mut value = fixtures::rsa_public_jwk("bad");
        value["n"] = serde_json::Value::String("!!not-base64!!".into());
        let err = parse(value).rsa_public_key().unwrap_err();
        assert!(matches!(err, JoseError::InvalidKeyMaterial { ref kid, .. } if kid == "bad"));
    }

    #[test]
    fn test_octet_bytes() {
        let oct = parse(fixtures::oct_jwk("aes", &[1u8; 16]));
        assert_eq!(oct.octet_bytes().unwrap().len(), 16);
    }
}
