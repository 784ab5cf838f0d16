//! Centralized configuration for the SSO authorization core.
//!
//! All configuration is loaded from environment variables and validated
//! at startup. Empty values count as unset.

use crate::error::ConfigError;
use crate::jose::{EncryptionMethod, JoseDefaults, JweAlgorithm, JwsAlgorithm};
use rust_common::{LogFormat, TracingConfig};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

/// Service configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Service name recorded in logs
    pub service_name: String,
    /// `iss` claim and discovery issuer
    pub issuer: String,
    /// JWK-set file loaded into the key registry
    pub keystore_path: PathBuf,

    // Key and algorithm defaults
    /// Default encryption key id
    pub default_encryption_key_id: Option<String>,
    /// Default decryption key id
    pub default_decryption_key_id: Option<String>,
    /// Default signing key id
    pub default_signing_key_id: Option<String>,
    /// Default JWS algorithm
    pub default_signing_algorithm: Option<JwsAlgorithm>,
    /// Default JWE key management algorithm
    pub default_encryption_algorithm: Option<JweAlgorithm>,
    /// Default JWE content encryption method
    pub default_encryption_method: Option<EncryptionMethod>,

    // Logging
    /// Tracing filter directive
    pub log_level: String,
    /// Log output format
    pub log_format: LogFormat,
}

impl Config {
    /// Load configuration from `.env` and the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is present but invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration from an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is present but invalid.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        Ok(Self {
            service_name: var("SSO_SERVICE_NAME").unwrap_or_else(|| "sso-authz".to_string()),
            issuer: var("SSO_ISSUER").unwrap_or_else(|| "https://sso.example.com".to_string()),
            keystore_path: var("SSO_KEYSTORE_PATH")
                .map_or_else(|| PathBuf::from("keystore.jwks.json"), PathBuf::from),
            default_encryption_key_id: var("JOSE_DEFAULT_ENCRYPTION_KEY_ID"),
            default_decryption_key_id: var("JOSE_DEFAULT_DECRYPTION_KEY_ID"),
            default_signing_key_id: var("JOSE_DEFAULT_SIGNING_KEY_ID"),
            default_signing_algorithm: parse_var(&var, "JOSE_DEFAULT_SIGNING_ALGORITHM")?,
            default_encryption_algorithm: parse_var(&var, "JOSE_DEFAULT_ENCRYPTION_ALGORITHM")?,
            default_encryption_method: parse_var(&var, "JOSE_DEFAULT_ENCRYPTION_METHOD")?,
            log_level: var("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            log_format: parse_var(&var, "LOG_FORMAT")?.unwrap_or(LogFormat::Json),
        })
    }

    /// Defaults handed to the JOSE service.
    #[must_use]
    pub fn jose_defaults(&self) -> JoseDefaults {
        JoseDefaults {
            encryption_key_id: self.default_encryption_key_id.clone(),
            decryption_key_id: self.default_decryption_key_id.clone(),
            signing_key_id: self.default_signing_key_id.clone(),
            signing_algorithm: self.default_signing_algorithm,
            encryption_algorithm: self.default_encryption_algorithm,
            encryption_method: self.default_encryption_method,
        }
    }

    /// Subscriber configuration for `rust_common::init_tracing`.
    #[must_use]
    pub fn tracing_config(&self) -> TracingConfig {
        TracingConfig::default()
            .with_service_name(self.service_name.as_str())
            .with_log_level(self.log_level.as_str())
            .with_format(self.log_format)
    }
}

/// Parse an optional variable.
fn parse_var<T, V>(var: V, name: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    V: Fn(&str) -> Option<String>,
{
    var(name)
        .map(|value| value.trim().parse().map_err(|e| ConfigError::invalid(name, e)))
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        Config::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_config_defaults() {
        let config = load(&[]).unwrap();

        assert_eq!(config.service_name, "sso-authz");
        assert_eq!(config.issuer, "https://sso.example.com");
        assert_eq!(config.keystore_path, PathBuf::from("keystore.jwks.json"));
        assert_eq!(config.log_level, "info");
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.jose_defaults(), JoseDefaults::default());
    }

    #[test]
    fn test_config_overrides() {
        let config = load(&[
            ("SSO_ISSUER", "https://idp.corp.example"),
            ("SSO_KEYSTORE_PATH", "/etc/sso/keys.json"),
            ("JOSE_DEFAULT_SIGNING_KEY_ID", "rsa-1"),
            ("JOSE_DEFAULT_SIGNING_ALGORITHM", "ps384"),
            ("JOSE_DEFAULT_ENCRYPTION_ALGORITHM", "RSA-OAEP-256"),
            ("JOSE_DEFAULT_ENCRYPTION_METHOD", "A128GCM"),
            ("LOG_FORMAT", "text"),
        ])
        .unwrap();

        assert_eq!(config.issuer, "https://idp.corp.example");
        assert_eq!(config.keystore_path, PathBuf::from("/etc/sso/keys.json"));
        assert_eq!(config.log_format, LogFormat::Text);

        let defaults = config.jose_defaults();
        assert_eq!(defaults.signing_key_id.as_deref(), Some("rsa-1"));
        assert_eq!(defaults.signing_algorithm, Some(JwsAlgorithm::PS384));
        assert_eq!(defaults.encryption_algorithm, Some(JweAlgorithm::RsaOaep256));
        assert_eq!(defaults.encryption_method, Some(EncryptionMethod::A128Gcm));
    }

    #[test]
    fn test_empty_values_are_unset() {
        let config = load(&[
            ("JOSE_DEFAULT_ENCRYPTION_KEY_ID", ""),
            ("JOSE_DEFAULT_SIGNING_ALGORITHM", "  "),
            ("SSO_ISSUER", ""),
        ])
        .unwrap();

        assert_eq!(config.default_encryption_key_id, None);
        assert_eq!(config.default_signing_algorithm, None);
        assert_eq!(config.issuer, "https://sso.example.com");
    }

    #[test]
    fn test_invalid_algorithm_rejected() {
        let err = load(&[("JOSE_DEFAULT_SIGNING_ALGORITHM", "ES256")]).unwrap_err();
        assert!(err.to_string().contains("JOSE_DEFAULT_SIGNING_ALGORITHM"));

        assert!(load(&[("JOSE_DEFAULT_ENCRYPTION_METHOD", "A192CBC")]).is_err());
        assert!(load(&[("LOG_FORMAT", "xml")]).is_err());
    }

    #[test]
    fn test_tracing_config() {
        let config = load(&[("SSO_SERVICE_NAME", "sso-edge"), ("LOG_LEVEL", "debug")]).unwrap();
        let tracing = config.tracing_config();
        assert_eq!(tracing.service_name, "sso-edge");
        assert_eq!(tracing.log_level, "debug");
    }
}
