use super::{AuthorizeAdapter, Delivery};
use crate::dispatch::{Dispatcher, Protocol, RoutingDecision};
use crate::error::AuthzError;
use crate::model::Principal;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

/// Result of authorizing a principal for an application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AuthorizeOutcome {
    /// Token issued here; the host renders the delivery.
    Deliver(Delivery),
    /// No local adapter; the host follows the routing decision.
    Route(RoutingDecision),
}

/// Authorization entry point: dispatch, then issue through the adapter
/// registered for the application's protocol.
#[derive(Clone)]
pub struct Authorizer {
    dispatcher: Dispatcher,
    adapters: HashMap<Protocol, Arc<dyn AuthorizeAdapter>>,
}

impl std::fmt::Debug for Authorizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let protocols: Vec<&str> = self.adapters.keys().map(Protocol::as_str).collect();
        f.debug_struct("Authorizer")
            .field("dispatcher", &self.dispatcher)
            .field("adapters", &protocols)
            .finish()
    }
}

impl Authorizer {
    /// Create an authorizer without adapters.
    #[must_use]
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self {
            dispatcher,
            adapters: HashMap::new(),
        }
    }

    /// Register an adapter, replacing any previous one for its protocol.
    #[must_use]
    pub fn with_adapter(mut self, adapter: Arc<dyn AuthorizeAdapter>) -> Self {
        let protocol = adapter.protocol();
        if self.handles(&protocol) {
            warn!(protocol = protocol.as_str(), "replacing protocol adapter");
        }
        self.adapters.insert(protocol, adapter);
        self
    }

    /// Whether a protocol is issued locally.
    #[must_use]
    pub fn handles(&self, protocol: &Protocol) -> bool {
        self.adapters.contains_key(protocol)
    }

    /// Authorize `principal` for the application `app_id`.
    ///
    /// # Errors
    ///
    /// Dispatch errors, and issuance errors from the protocol adapter.
    #[instrument(skip(self, principal), fields(username = %principal.username))]
    pub async fn authorize(
        &self,
        app_id: &str,
        principal: &Principal,
    ) -> Result<AuthorizeOutcome, AuthzError> {
        let result: Result<AuthorizeOutcome, AuthzError> = self
            .dispatcher
            .dispatch_scoped(app_id, |route| async move {
                match self.adapters.get(&route.protocol) {
                    Some(adapter) => {
                        let delivery = adapter.authorize(principal, &route.app)?;
                        Ok(AuthorizeOutcome::Deliver(delivery))
                    }
                    None => Ok(AuthorizeOutcome::Route(route.decision)),
                }
            })
            .await;

        match &result {
            Ok(AuthorizeOutcome::Deliver(delivery)) => {
                info!(action = %delivery.action, "token delivered");
            }
            Ok(AuthorizeOutcome::Route(_)) => {}
            Err(e) => error!(code = e.code(), error = %e, "authorization failed"),
        }
        result
    }
}
