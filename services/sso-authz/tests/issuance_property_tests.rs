//! Property-based tests for JWT issuance.

use proptest::prelude::*;
use sso_authz::authz::{AuthorizeAdapter, DeliveryMethod, JwtAdapter};
use sso_authz::error::IssuanceError;
use sso_authz::jose::{JoseDefaults, JoseService, KeyRegistry, SharedJoseService};
use sso_authz::jwt::SsoClaims;
use sso_authz::model::{App, Principal};
use std::time::Duration;
use test_utils::fixtures;
use test_utils::generators::{
    app_id_strategy, email_strategy, invalid_lifetime_strategy, lifetime_minutes_strategy,
    locale_strategy, session_ticket_strategy, signing_secret_strategy, username_strategy,
};

const ISSUER: &str = "https://sso.example.com";

fn adapter(keys: Vec<serde_json::Value>) -> JwtAdapter {
    let registry = KeyRegistry::from_json(&fixtures::key_set(keys)).unwrap();
    let service = JoseService::new(registry, JoseDefaults::default()).unwrap();
    JwtAdapter::new(SharedJoseService::new(service), ISSUER)
}

fn app(id: &str, lifetime_minutes: i64) -> App {
    serde_json::from_value(fixtures::app_record(id, "JWT", lifetime_minutes)).unwrap()
}

fn arb_principal() -> impl Strategy<Value = Principal> {
    (
        username_strategy(),
        "[0-9a-f]{8}",
        prop::option::of(email_strategy()),
        prop::option::of(locale_strategy()),
        prop::option::of(session_ticket_strategy()),
    )
        .prop_map(|(username, user_id, email, locale, session_ticket_id)| Principal {
            username,
            user_id,
            email,
            locale,
            session_ticket_id,
            ..Principal::default()
        })
}

/// Verify with an independent service over the same secret.
fn verify(token: &str, secret: &[u8]) -> SsoClaims {
    let registry = KeyRegistry::from_json(&fixtures::key_set(vec![fixtures::oct_jwk("mac", secret)])).unwrap();
    let checker = JoseService::new(registry, JoseDefaults::default()).unwrap();
    checker.verify(token, None).unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Issued claims carry the principal, the application and the lifetime.
    #[test]
    fn prop_claims_reflect_inputs(
        principal in arb_principal(),
        app_id in app_id_strategy(),
        lifetime in lifetime_minutes_strategy(),
        secret in signing_secret_strategy(),
    ) {
        let adapter = adapter(vec![fixtures::oct_jwk("mac", &secret)]);
        let issued = adapter.issue_token(&principal, &app(&app_id, lifetime)).unwrap();
        let claims = verify(&issued.token, &secret);

        prop_assert_eq!(&claims, &issued.claims);
        prop_assert_eq!(claims.iss.as_str(), ISSUER);
        prop_assert_eq!(&claims.sub, &principal.username);
        prop_assert_eq!(claims.aud, vec![app_id]);
        prop_assert_eq!(claims.exp - claims.iat, lifetime * 60);
        prop_assert!(claims.exp > claims.iat);
        prop_assert_eq!(claims.email, principal.email);
        prop_assert_eq!(claims.locale, principal.locale);
        prop_assert_eq!(claims.online_ticket, principal.session_ticket_id);
        prop_assert_eq!(claims.user_id.as_deref(), Some(principal.user_id.as_str()));
        prop_assert_eq!(claims.kid.as_deref(), Some("mac"));
    }

    /// Non-positive lifetimes fail before any key is resolved.
    #[test]
    fn prop_invalid_lifetime_before_signing(
        principal in arb_principal(),
        app_id in app_id_strategy(),
        lifetime in invalid_lifetime_strategy(),
        secret in signing_secret_strategy(),
    ) {
        // No default signing key: reaching the signer would fail differently.
        let adapter = adapter(vec![
            fixtures::oct_jwk("mac-1", &secret),
            fixtures::oct_jwk("mac-2", &secret),
        ]);
        let err = adapter.issue_token(&principal, &app(&app_id, lifetime)).unwrap_err();
        let is_lifetime = matches!(
            err,
            IssuanceError::InvalidLifetime { app_id: ref id, minutes } if *id == app_id && minutes == lifetime
        );
        prop_assert!(is_lifetime, "unexpected error: {}", err);
    }

    /// Delivery posts the token to the application's redirect URI.
    #[test]
    fn prop_delivery_targets_redirect_uri(
        principal in arb_principal(),
        app_id in app_id_strategy(),
        secret in signing_secret_strategy(),
    ) {
        let adapter = adapter(vec![fixtures::oct_jwk("mac", &secret)]);
        let delivery = adapter.authorize(&principal, &app(&app_id, 5)).unwrap();

        prop_assert_eq!(delivery.method, DeliveryMethod::Post);
        prop_assert_eq!(&delivery.action, &format!("https://{app_id}.apps.example.com/sso/jwt"));
        let token = delivery.parameter("token").unwrap();
        prop_assert_eq!(verify(token, &secret).sub, principal.username);
    }
}

/// Two issuances a second apart differ only in id and time.
#[test]
fn test_issuance_determinism() {
    let secret = [5u8; 32];
    let adapter = adapter(vec![fixtures::oct_jwk("mac", &secret)]);
    let principal = Principal {
        username: "carol".into(),
        user_id: "u-3".into(),
        ..Principal::default()
    };
    let app = app("app-9", 15);

    let first = adapter.issue_token(&principal, &app).unwrap().claims;
    std::thread::sleep(Duration::from_millis(1100));
    let second = adapter.issue_token(&principal, &app).unwrap().claims;

    assert_ne!(first.jti, second.jti);
    assert!(second.iat > first.iat);
    assert_eq!(first.iss, second.iss);
    assert_eq!(first.sub, second.sub);
    assert_eq!(first.aud, second.aud);
}

/// A reload is picked up by the next issuance without rebuilding the adapter.
#[test]
fn test_issuance_follows_reload() {
    let registry = KeyRegistry::from_json(&fixtures::key_set(vec![fixtures::oct_jwk("old", &[1u8; 32])])).unwrap();
    let shared = SharedJoseService::new(JoseService::new(registry, JoseDefaults::default()).unwrap());
    let adapter = JwtAdapter::new(shared.clone(), ISSUER);
    let principal = Principal {
        username: "dave".into(),
        ..Principal::default()
    };

    let before = adapter.issue_token(&principal, &app("app-1", 5)).unwrap();
    assert_eq!(before.key_id, "old");

    let rotated = KeyRegistry::from_json(&fixtures::key_set(vec![fixtures::oct_jwk("new", &[2u8; 48])])).unwrap();
    shared.reload(rotated, JoseDefaults::default()).unwrap();

    let after = adapter.issue_token(&principal, &app("app-1", 5)).unwrap();
    assert_eq!(after.key_id, "new");
    assert_eq!(after.claims.kid.as_deref(), Some("new"));
}
