//! Error types for dispatch, issuance and configuration.
//!
//! Detail stays in logs. End users only ever see [`AuthzError::user_message`].

use crate::jose::JoseError;
use thiserror::Error;

/// Error codes returned to callers alongside the generic message.
pub const AUTHZ_CONFIGURATION_ERROR: &str = "AUTHZ_CONFIGURATION_ERROR";
/// Caller must name a key or the registry needs a default.
pub const AUTHZ_KEY_RESOLUTION_ERROR: &str = "AUTHZ_KEY_RESOLUTION_ERROR";
/// Cryptographic operation failed for this request.
pub const AUTHZ_CRYPTO_ERROR: &str = "AUTHZ_CRYPTO_ERROR";
/// Application record could not be loaded.
pub const AUTHZ_APP_NOT_FOUND: &str = "AUTHZ_APP_NOT_FOUND";
/// Collaborator failure.
pub const AUTHZ_UNAVAILABLE: &str = "AUTHZ_UNAVAILABLE";

const USER_MESSAGE: &str = "Authorization failed. Please contact your administrator.";

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Variable present but unparseable
    #[error("invalid {name}: {reason}")]
    Invalid {
        /// Variable name
        name: String,
        /// Parser message
        reason: String,
    },
}

impl ConfigError {
    /// Create an invalid variable error.
    #[must_use]
    pub fn invalid(name: impl Into<String>, reason: impl ToString) -> Self {
        Self::Invalid {
            name: name.into(),
            reason: reason.to_string(),
        }
    }
}

/// Protocol dispatch errors.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum DispatchError {
    /// No application with this id
    #[error("application not found: {app_id}")]
    AppNotFound {
        /// Requested id
        app_id: String,
    },

    /// Configured protocol matches no handler
    #[error("unsupported protocol '{protocol}' for application {app_id}")]
    UnsupportedProtocol {
        /// Application id
        app_id: String,
        /// Protocol as configured
        protocol: String,
    },

    /// Redirect protocol configured without a login URL
    #[error("application {app_id} uses {protocol} but has no login URL")]
    MissingLoginUrl {
        /// Application id
        app_id: String,
        /// Canonical protocol name
        protocol: String,
    },

    /// Application repository failed
    #[error("application repository error: {0}")]
    Repository(#[from] crate::model::RepositoryError),
}

/// Token issuance errors.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum IssuanceError {
    /// Lifetime must be a positive number of minutes
    #[error("invalid token lifetime {minutes} minutes for application {app_id}")]
    InvalidLifetime {
        /// Application id
        app_id: String,
        /// Configured lifetime
        minutes: i64,
    },

    /// A mandatory claim was not supplied
    #[error("missing claim '{claim}'")]
    MissingClaim {
        /// Claim name
        claim: &'static str,
    },

    /// Signing the token failed
    #[error("token issuance failed for application {app_id}: {source}")]
    TokenIssuanceFailed {
        /// Application id
        app_id: String,
        /// Underlying failure
        #[source]
        source: JoseError,
    },

    /// Wrapping the token failed
    #[error("token encryption failed for application {app_id}: {source}")]
    EncryptionFailed {
        /// Application id
        app_id: String,
        /// Underlying failure
        #[source]
        source: JoseError,
    },

    /// Browser delivery needs a redirect URI
    #[error("application {app_id} has no redirect URI")]
    MissingRedirectUri {
        /// Application id
        app_id: String,
    },
}

impl IssuanceError {
    /// Underlying JOSE failure, if any.
    #[must_use]
    pub const fn jose(&self) -> Option<&JoseError> {
        match self {
            Self::TokenIssuanceFailed { source, .. } | Self::EncryptionFailed { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Top-level error of an authorization request.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum AuthzError {
    /// Dispatch failed
    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    /// Issuance failed
    #[error(transparent)]
    Issuance(#[from] IssuanceError),

    /// Key registry or crypto failure outside issuance
    #[error(transparent)]
    Jose(#[from] JoseError),

    /// Configuration failure
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl AuthzError {
    /// Stable machine-readable code.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Dispatch(DispatchError::AppNotFound { .. }) => AUTHZ_APP_NOT_FOUND,
            Self::Dispatch(DispatchError::Repository(_)) => AUTHZ_UNAVAILABLE,
            Self::Dispatch(_) | Self::Config(_) => AUTHZ_CONFIGURATION_ERROR,
            Self::Issuance(e) => match e.jose() {
                Some(jose) => jose_code(jose),
                None => AUTHZ_CONFIGURATION_ERROR,
            },
            Self::Jose(e) => jose_code(e),
        }
    }

    /// Message safe to show an end user. Never includes internal detail.
    #[must_use]
    pub const fn user_message(&self) -> &'static str {
        USER_MESSAGE
    }
}

const fn jose_code(error: &JoseError) -> &'static str {
    if error.is_configuration() {
        AUTHZ_CONFIGURATION_ERROR
    } else if error.is_resolution() {
        AUTHZ_KEY_RESOLUTION_ERROR
    } else {
        AUTHZ_CRYPTO_ERROR
    }
}
