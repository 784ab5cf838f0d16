//! Shared handle to the current JOSE service.
//!
//! Readers take a snapshot and keep using it for the whole request; a
//! reload swaps in a fully built service so no request ever observes a
//! partially replaced registry.

use super::error::JoseError;
use super::keystore::KeyRegistry;
use super::service::{JoseDefaults, JoseService};
use arc_swap::ArcSwap;
use std::sync::Arc;
use tracing::{info, warn};

/// Cloneable handle to an atomically replaceable [`JoseService`].
#[derive(Debug, Clone)]
pub struct SharedJoseService {
    current: Arc<ArcSwap<JoseService>>,
}

impl SharedJoseService {
    /// Wrap a built service.
    #[must_use]
    pub fn new(service: JoseService) -> Self {
        Self {
            current: Arc::new(ArcSwap::from_pointee(service)),
        }
    }

    /// Current service. Holding the snapshot pins it across a reload.
    #[must_use]
    pub fn snapshot(&self) -> Arc<JoseService> {
        self.current.load_full()
    }

    /// Replace the service with an already built one.
    pub fn replace(&self, service: JoseService) {
        self.current.store(Arc::new(service));
        info!("jose service replaced");
    }

    /// Build a service from a new registry and swap it in.
    ///
    /// The current service stays in place if the build fails.
    ///
    /// # Errors
    ///
    /// Returns the construction error of [`JoseService::new`].
    pub fn reload(&self, registry: KeyRegistry, defaults: JoseDefaults) -> Result<(), JoseError> {
        match JoseService::new(registry, defaults) {
            Ok(service) => {
                self.replace(service);
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "jose service reload rejected, keeping current keys");
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_utils::fixtures;

    fn registry(keys: Vec<serde_json::Value>) -> KeyRegistry {
        KeyRegistry::from_json(&fixtures::key_set(keys)).unwrap()
    }

    #[test]
    fn test_snapshot_survives_reload() {
        let shared = SharedJoseService::new(
            JoseService::new(registry(vec![fixtures::oct_jwk("old", &[1u8; 32])]), JoseDefaults::default())
                .unwrap(),
        );
        let before = shared.snapshot();
        let token = before.encrypt(b"in flight", None).unwrap();

        shared
            .reload(registry(vec![fixtures::oct_jwk("new", &[2u8; 32])]), JoseDefaults::default())
            .unwrap();

        assert_eq!(before.decrypt(&token.compact, None).unwrap(), b"in flight");
        assert_eq!(shared.snapshot().registry().key_ids(), vec!["new"]);
    }

    #[test]
    fn test_failed_reload_keeps_current() {
        let shared = SharedJoseService::new(
            JoseService::new(registry(vec![fixtures::oct_jwk("keep", &[1u8; 16])]), JoseDefaults::default())
                .unwrap(),
        );

        let mut bad = fixtures::rsa_public_jwk("bad");
        bad["e"] = serde_json::Value::String("%%%".into());
        assert!(shared.reload(registry(vec![bad]), JoseDefaults::default()).is_err());
        assert_eq!(shared.snapshot().registry().key_ids(), vec!["keep"]);
    }
}
