//! Protocol dispatch.
//!
//! Loads the application, matches its configured protocol against the
//! closed [`Protocol`] set and decides where the request goes. The
//! application id is held in a task-local for the rest of the request.

mod protocol;

pub use protocol::{Protocol, RoutingDecision};

use crate::error::DispatchError;
use crate::metrics;
use crate::model::{App, AppRepository};
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, field, instrument, warn, Span};

tokio::task_local! {
    static SSO_APP_ID: String;
}

/// Application id of the request being handled, if inside a dispatch scope.
#[must_use]
pub fn current_app_id() -> Option<String> {
    SSO_APP_ID.try_with(Clone::clone).ok()
}

/// Outcome of a successful dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    /// Application as loaded
    pub app: App,
    /// Parsed protocol
    pub protocol: Protocol,
    /// Where the request goes
    pub decision: RoutingDecision,
}

/// Routes authorization requests by application protocol.
#[derive(Clone)]
pub struct Dispatcher {
    apps: Arc<dyn AppRepository>,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher").finish_non_exhaustive()
    }
}

impl Dispatcher {
    /// Create a dispatcher over an application repository.
    #[must_use]
    pub fn new(apps: Arc<dyn AppRepository>) -> Self {
        Self { apps }
    }

    /// Load the application and decide its route.
    ///
    /// # Errors
    ///
    /// Returns `AppNotFound`, `UnsupportedProtocol`, `MissingLoginUrl` or
    /// `Repository`.
    #[instrument(skip(self), fields(protocol = field::Empty))]
    pub async fn route(&self, app_id: &str) -> Result<Route, DispatchError> {
        let app = self.apps.get_app(app_id).await.inspect_err(|e| {
            warn!(error = %e, "application lookup failed");
            metrics::record_dispatch("unknown", "error");
        })?;
        let Some(app) = app else {
            debug!("application not found");
            metrics::record_dispatch("unknown", "error");
            return Err(DispatchError::AppNotFound {
                app_id: app_id.to_string(),
            });
        };

        let protocol = Protocol::parse(&app.protocol);
        Span::current().record("protocol", protocol.as_str());

        let decision = match Self::decide(&app, &protocol) {
            Ok(decision) => decision,
            Err(e) => {
                warn!(error = %e, "dispatch rejected");
                metrics::record_dispatch(protocol.metric_label(), "error");
                return Err(e);
            }
        };

        let outcome = match decision {
            RoutingDecision::Forward { .. } => "forward",
            RoutingDecision::Redirect { .. } => "redirect",
        };
        debug!(outcome, "dispatched");
        metrics::record_dispatch(protocol.metric_label(), outcome);

        Ok(Route {
            app,
            protocol,
            decision,
        })
    }

    fn decide(app: &App, protocol: &Protocol) -> Result<RoutingDecision, DispatchError> {
        if let Some(prefix) = protocol.forward_prefix() {
            return Ok(RoutingDecision::Forward {
                path: format!("{prefix}/{}", app.id),
            });
        }
        if protocol.redirects_to_login() {
            return match app.login_url.as_deref().filter(|url| !url.trim().is_empty()) {
                Some(url) => Ok(RoutingDecision::Redirect { url: url.to_string() }),
                None => Err(DispatchError::MissingLoginUrl {
                    app_id: app.id.clone(),
                    protocol: protocol.to_string(),
                }),
            };
        }
        Err(DispatchError::UnsupportedProtocol {
            app_id: app.id.clone(),
            protocol: protocol.to_string(),
        })
    }

    /// Route an application id.
    ///
    /// # Errors
    ///
    /// As [`Dispatcher::route`].
    pub async fn dispatch(&self, app_id: &str) -> Result<RoutingDecision, DispatchError> {
        self.route(app_id).await.map(|route| route.decision)
    }

    /// Route an application id and run `handler` with the route while the
    /// id is visible through [`current_app_id`].
    ///
    /// # Errors
    ///
    /// Dispatch errors converted into `E`, or the handler's error.
    pub async fn dispatch_scoped<F, Fut, T, E>(&self, app_id: &str, handler: F) -> Result<T, E>
    where
        F: FnOnce(Route) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: From<DispatchError>,
    {
        SSO_APP_ID
            .scope(app_id.to_string(), async move {
                let route = self.route(app_id).await?;
                handler(route).await
            })
            .await
    }
}
