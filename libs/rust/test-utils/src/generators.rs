//! Shared proptest generators for SSO domain inputs.

use proptest::prelude::*;
use std::collections::HashSet;

/// Every protocol spelling the dispatcher is expected to accept, paired with
/// the canonical name it resolves to.
pub const PROTOCOL_SPELLINGS: &[(&str, &str)] = &[
    ("Extend_API", "Extend_API"),
    ("ExtendAPI", "Extend_API"),
    ("Form_Based", "Form_Based"),
    ("FormBased", "Form_Based"),
    ("OAuth_v2.0", "OAuth_v2.0"),
    ("OAuth20", "OAuth_v2.0"),
    ("OAuth_v2.1", "OAuth_v2.1"),
    ("OAuth21", "OAuth_v2.1"),
    ("OpenID_Connect_v1.0", "OpenID_Connect_v1.0"),
    ("OIDC10", "OpenID_Connect_v1.0"),
    ("OpenIDConnect10", "OpenID_Connect_v1.0"),
    ("SAML_v2.0", "SAML_v2.0"),
    ("SAML20", "SAML_v2.0"),
    ("Token_Based", "Token_Based"),
    ("TokenBased", "Token_Based"),
    ("CAS", "CAS"),
    ("JWT", "JWT"),
    ("Basic", "Basic"),
];

/// Generate key ids.
pub fn key_id_strategy() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9-]{3,24}"
}

/// Generate a list of distinct key ids.
pub fn unique_key_ids_strategy(
    size: impl Into<prop::collection::SizeRange>,
) -> impl Strategy<Value = Vec<String>> {
    prop::collection::hash_set(key_id_strategy(), size)
        .prop_map(|ids: HashSet<String>| ids.into_iter().collect())
}

/// Generate AES-GCM capable secrets (16 or 32 bytes).
pub fn aes_secret_strategy() -> impl Strategy<Value = Vec<u8>> {
    prop_oneof![
        prop::collection::vec(any::<u8>(), 16),
        prop::collection::vec(any::<u8>(), 32),
    ]
}

/// Generate secrets long enough for HS256 and `dir` + A256GCM.
pub fn signing_secret_strategy() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 32)
}

/// Generate plaintext payloads, including the empty one.
pub fn plaintext_strategy() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..512)
}

/// Generate usernames.
pub fn username_strategy() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9._]{2,31}"
}

/// Generate application ids.
pub fn app_id_strategy() -> impl Strategy<Value = String> {
    "[a-z0-9][a-z0-9-]{1,35}"
}

/// Generate work email addresses.
pub fn email_strategy() -> impl Strategy<Value = String> {
    ("[a-z]{3,12}", "[a-z]{3,10}").prop_map(|(user, domain)| format!("{user}@{domain}.example.com"))
}

/// Generate locales.
pub fn locale_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("en_US".to_string()),
        Just("zh_CN".to_string()),
        Just("de_DE".to_string()),
        Just("pt_BR".to_string()),
    ]
}

/// Generate SSO session ticket ids.
pub fn session_ticket_strategy() -> impl Strategy<Value = String> {
    "OT-[0-9a-f]{32}"
}

/// Generate positive token lifetimes in minutes (up to one day).
pub fn lifetime_minutes_strategy() -> impl Strategy<Value = i64> {
    1i64..=1440
}

/// Generate lifetimes that must be rejected.
pub fn invalid_lifetime_strategy() -> impl Strategy<Value = i64> {
    prop_oneof![Just(0i64), -100_000i64..0, Just(i64::MIN)]
}

/// Generate an accepted protocol spelling with random letter case, together
/// with the canonical protocol name.
pub fn protocol_spelling_strategy() -> impl Strategy<Value = (String, String)> {
    (prop::sample::select(PROTOCOL_SPELLINGS), any::<u64>()).prop_map(|((spelled, canonical), mask)| {
        let mixed: String = spelled
            .chars()
            .enumerate()
            .map(|(i, c)| {
                if mask & (1u64 << (i % 64)) == 0 {
                    c.to_ascii_lowercase()
                } else {
                    c.to_ascii_uppercase()
                }
            })
            .collect();
        (mixed, canonical.to_string())
    })
}

/// Generate protocol strings that match no known protocol.
pub fn unknown_protocol_strategy() -> impl Strategy<Value = String> {
    "[A-Za-z0-9_.]{1,20}".prop_filter("must not name a known protocol", |s| {
        !PROTOCOL_SPELLINGS
            .iter()
            .any(|(spelled, _)| spelled.eq_ignore_ascii_case(s))
    })
}
