//! JWK fixtures with fixed key material.
//!
//! RSA keys are 2048-bit so they are accepted by every RS/PS signer; they are
//! checked in rather than generated because key generation dominates test time.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use serde_json::{json, Value};

/// First RSA private key (JWK, all CRT parameters present).
pub const RSA_KEY_A: &str = include_str!("../fixtures/rsa-2048-a.json");

/// Second, unrelated RSA private key.
pub const RSA_KEY_B: &str = include_str!("../fixtures/rsa-2048-b.json");

/// P-256 EC private key.
pub const EC_KEY: &str = include_str!("../fixtures/ec-p256.json");

const RSA_PRIVATE_MEMBERS: &[&str] = &["d", "p", "q", "dp", "dq", "qi"];

fn with_kid(raw: &str, kid: &str) -> Value {
    let mut value: Value = serde_json::from_str(raw).unwrap_or_else(|e| {
        panic!("fixture is not valid JSON: {e}");
    });
    value["kid"] = Value::String(kid.to_string());
    value
}

/// RSA private JWK (fixture A) under the given key id.
#[must_use]
pub fn rsa_private_jwk(kid: &str) -> Value {
    with_kid(RSA_KEY_A, kid)
}

/// RSA private JWK (fixture B) under the given key id.
#[must_use]
pub fn second_rsa_private_jwk(kid: &str) -> Value {
    with_kid(RSA_KEY_B, kid)
}

/// Public half of fixture A under the given key id.
#[must_use]
pub fn rsa_public_jwk(kid: &str) -> Value {
    let mut value = rsa_private_jwk(kid);
    if let Some(members) = value.as_object_mut() {
        for name in RSA_PRIVATE_MEMBERS {
            members.remove(*name);
        }
    }
    value
}

/// Fixture A with only `n`, `e` and `d`; the CRT members are left out.
#[must_use]
pub fn rsa_private_jwk_without_crt(kid: &str) -> Value {
    let mut value = rsa_private_jwk(kid);
    if let Some(members) = value.as_object_mut() {
        for name in ["p", "q", "dp", "dq", "qi"] {
            members.remove(name);
        }
    }
    value
}

/// EC P-256 private JWK under the given key id.
#[must_use]
pub fn ec_jwk(kid: &str) -> Value {
    with_kid(EC_KEY, kid)
}

/// Symmetric (`oct`) JWK holding the given secret.
#[must_use]
pub fn oct_jwk(kid: &str, secret: &[u8]) -> Value {
    json!({
        "kty": "oct",
        "kid": kid,
        "k": URL_SAFE_NO_PAD.encode(secret),
    })
}

/// Wrap keys into a JWK-set document.
#[must_use]
pub fn key_set(keys: Vec<Value>) -> String {
    json!({ "keys": keys }).to_string()
}

/// Application record as the persistence layer would hand it over.
#[must_use]
pub fn app_record(id: &str, protocol: &str, lifetime_minutes: i64) -> Value {
    json!({
        "id": id,
        "name": format!("{id} application"),
        "protocol": protocol,
        "login_url": format!("https://{id}.apps.example.com/login"),
        "redirect_uri": format!("https://{id}.apps.example.com/sso/jwt"),
        "lifetime_minutes": lifetime_minutes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rsa_fixture_has_private_members() {
        let key = rsa_private_jwk("rsa-1");
        assert_eq!(key["kty"], "RSA");
        assert_eq!(key["kid"], "rsa-1");
        for name in RSA_PRIVATE_MEMBERS {
            assert!(key.get(*name).is_some(), "missing {name}");
        }
    }

    #[test]
    fn test_rsa_public_projection() {
        let key = rsa_public_jwk("rsa-1");
        assert!(key.get("n").is_some());
        assert!(key.get("e").is_some());
        assert!(key.get("d").is_none());
        assert!(key.get("qi").is_none());
    }

    #[test]
    fn test_fixtures_are_distinct() {
        assert_ne!(rsa_private_jwk("a")["n"], second_rsa_private_jwk("a")["n"]);
    }

    #[test]
    fn test_oct_jwk_encoding() {
        let key = oct_jwk("hmac", &[0u8; 32]);
        assert_eq!(key["kty"], "oct");
        assert_eq!(key["k"].as_str().map(str::len), Some(43));
    }

    #[test]
    fn test_key_set_document() {
        let doc: Value = serde_json::from_str(&key_set(vec![ec_jwk("ec")])).unwrap();
        assert_eq!(doc["keys"].as_array().map(Vec::len), Some(1));
    }
}
