//! Shared test utilities for auth-platform Rust crates.
//!
//! This crate provides:
//! - Proptest generators for SSO domain inputs (key ids, secrets, principals, protocols)
//! - JWK fixtures with fixed RSA and EC key material

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;

pub use generators::*;
