//! SSO authorization core.
//!
//! Holds the JOSE key registry and crypto service, the protocol dispatcher
//! that routes an authenticated user to the handler for an application's
//! SSO protocol, and the JWT issuance adapter.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod authz;
pub mod config;
pub mod discovery;
pub mod dispatch;
pub mod error;
pub mod jose;
pub mod jwks;
pub mod jwt;
pub mod metrics;
pub mod model;

// Re-exports for convenience
pub use authz::{AuthorizeAdapter, AuthorizeOutcome, Authorizer, Delivery, JwtAdapter};
pub use config::Config;
pub use dispatch::{Dispatcher, Protocol, RoutingDecision};
pub use error::{AuthzError, DispatchError, IssuanceError};
pub use jose::{JoseError, JoseService, KeyRegistry, SharedJoseService};
