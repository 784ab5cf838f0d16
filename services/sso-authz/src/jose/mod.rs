//! JOSE key management and cryptographic operations.
//!
//! - [`KeyRegistry`]: immutable set of JWKs keyed by id
//! - [`JoseService`]: encrypters, decrypters, signers and verifiers derived
//!   from a registry snapshot, with default-key resolution
//! - [`SharedJoseService`]: atomic whole-service replacement on reload

pub mod algorithm;
pub mod error;
pub mod jwe;
pub mod jwk;
pub mod keystore;
pub mod service;
pub mod shared;
pub mod signer;

pub use algorithm::{EncryptionMethod, JweAlgorithm, JwsAlgorithm};
pub use error::{JoseError, KeyOperation};
pub use jwe::{Decrypter, EncryptedToken, Encrypter};
pub use jwk::{Jwk, KeyKind, SecretParams};
pub use keystore::{KeyRegistry, KeySet};
pub use service::{EncryptOptions, JoseDefaults, JoseService};
pub use shared::SharedJoseService;
pub use signer::{SignedToken, Signer, Verifier};
