//! Error types for key registry and JOSE operations.
//!
//! Messages carry key ids and algorithm names only. Key material and
//! plaintext never reach an error value.

use std::fmt;
use thiserror::Error;

/// Direction of a keyed JOSE operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyOperation {
    /// JWE encryption
    Encrypt,
    /// JWE decryption
    Decrypt,
    /// JWS signing
    Sign,
    /// JWS verification
    Verify,
}

impl KeyOperation {
    /// Label used in logs and metrics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Encrypt => "encrypt",
            Self::Decrypt => "decrypt",
            Self::Sign => "sign",
            Self::Verify => "verify",
        }
    }
}

impl fmt::Display for KeyOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors raised by the key registry and the JOSE service.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum JoseError {
    /// Two keys were loaded under the same id
    #[error("duplicate key id '{kid}'")]
    DuplicateKeyId {
        /// Offending key id
        kid: String,
    },

    /// A key-set entry has no `kid`
    #[error("key at position {index} has no key id")]
    MissingKeyId {
        /// Position within the key set
        index: usize,
    },

    /// Key material of a supported kind could not be parsed
    #[error("invalid key material for '{kid}': {reason}")]
    InvalidKeyMaterial {
        /// Key id
        kid: String,
        /// Parser message
        reason: String,
    },

    /// Algorithm is unknown or not supported by the selected key
    #[error("unsupported algorithm '{algorithm}'{}", .kid.as_ref().map(|k| format!(" for key '{k}'")).unwrap_or_default())]
    UnsupportedAlgorithm {
        /// Algorithm name as requested
        algorithm: String,
        /// Key the algorithm was requested for, if any
        kid: Option<String>,
    },

    /// No key id was given and no default could be resolved
    #[error("no default key for {operation}; an explicit key id is required")]
    NoDefaultKey {
        /// Operation that needed the key
        operation: KeyOperation,
    },

    /// The registry yields no key capable of the operation
    #[error("no usable key for {operation}")]
    NoUsableKeys {
        /// Operation that needed the key
        operation: KeyOperation,
    },

    /// The key id names no key capable of the operation
    #[error("unknown key id '{kid}' for {operation}")]
    UnknownKeyId {
        /// Requested key id
        kid: String,
        /// Operation that needed the key
        operation: KeyOperation,
    },

    /// JWE encryption failed
    #[error("encryption with key '{kid}' failed: {reason}")]
    EncryptionFailed {
        /// Key id
        kid: String,
        /// Failure description
        reason: String,
    },

    /// JWE decryption failed
    #[error("decryption with key '{kid}' failed: {reason}")]
    DecryptionFailed {
        /// Key id
        kid: String,
        /// Failure description
        reason: String,
    },

    /// JWS signing failed
    #[error("signing with key '{kid}' failed: {reason}")]
    SigningFailed {
        /// Key id
        kid: String,
        /// Failure description
        reason: String,
    },

    /// JWS verification failed
    #[error("verification with key '{kid}' failed: {reason}")]
    VerificationFailed {
        /// Key id
        kid: String,
        /// Failure description
        reason: String,
    },

    /// Key-set document could not be read or parsed
    #[error("keystore error: {reason}")]
    KeyStore {
        /// Failure description
        reason: String,
    },
}

impl JoseError {
    /// Operator must fix configuration; never retried.
    #[must_use]
    pub const fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::DuplicateKeyId { .. }
                | Self::MissingKeyId { .. }
                | Self::NoUsableKeys { .. }
                | Self::KeyStore { .. }
        )
    }

    /// Caller must supply an explicit key id or fix the registry.
    #[must_use]
    pub const fn is_resolution(&self) -> bool {
        matches!(self, Self::NoDefaultKey { .. } | Self::UnknownKeyId { .. })
    }

    /// Create an invalid key material error.
    #[must_use]
    pub fn invalid_key(kid: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidKeyMaterial {
            kid: kid.into(),
            reason: reason.into(),
        }
    }

    /// Create an unsupported algorithm error.
    #[must_use]
    pub fn unsupported(algorithm: impl Into<String>, kid: Option<&str>) -> Self {
        Self::UnsupportedAlgorithm {
            algorithm: algorithm.into(),
            kid: kid.map(str::to_string),
        }
    }

    /// Create an encryption error.
    #[must_use]
    pub fn encryption(kid: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::EncryptionFailed {
            kid: kid.into(),
            reason: reason.into(),
        }
    }

    /// Create a decryption error.
    #[must_use]
    pub fn decryption(kid: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::DecryptionFailed {
            kid: kid.into(),
            reason: reason.into(),
        }
    }

    /// Create a signing error.
    #[must_use]
    pub fn signing(kid: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::SigningFailed {
            kid: kid.into(),
            reason: reason.into(),
        }
    }

    /// Create a verification error.
    #[must_use]
    pub fn verification(kid: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::VerificationFailed {
            kid: kid.into(),
            reason: reason.into(),
        }
    }

    /// Create a keystore error.
    #[must_use]
    pub fn keystore(reason: impl Into<String>) -> Self {
        Self::KeyStore {
            reason: reason.into(),
        }
    }
}
