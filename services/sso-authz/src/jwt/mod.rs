//! JWT claims issued to SSO applications.

pub mod builder;
pub mod claims;

pub use builder::ClaimsBuilder;
pub use claims::SsoClaims;
