//! Closed set of SSO protocols an application can be configured with.

use serde::Serialize;
use std::fmt;

/// SSO protocol of an application.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Protocol {
    /// Extended API authentication
    ExtendApi,
    /// Form-based credential replay
    FormBased,
    /// OAuth 2.0
    OAuth20,
    /// OAuth 2.1, handled outside this service
    OAuth21,
    /// OpenID Connect 1.0, served by the OAuth 2.0 endpoint
    OpenIdConnect10,
    /// SAML 2.0 IdP-initiated
    Saml20,
    /// Token-based
    TokenBased,
    /// CAS
    Cas,
    /// Signed JWT posted to the application
    Jwt,
    /// Basic authentication, handled outside this service
    Basic,
    /// Anything else, kept verbatim
    Unsupported(String),
}

impl Protocol {
    /// Every supported protocol.
    pub const ALL: [Self; 10] = [
        Self::ExtendApi,
        Self::FormBased,
        Self::OAuth20,
        Self::OAuth21,
        Self::OpenIdConnect10,
        Self::Saml20,
        Self::TokenBased,
        Self::Cas,
        Self::Jwt,
        Self::Basic,
    ];

    /// Parse a configured protocol. Matching ignores case and surrounding
    /// whitespace; unknown values become [`Protocol::Unsupported`].
    #[must_use]
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "extend_api" | "extendapi" => Self::ExtendApi,
            "form_based" | "formbased" => Self::FormBased,
            "oauth_v2.0" | "oauth20" => Self::OAuth20,
            "oauth_v2.1" | "oauth21" => Self::OAuth21,
            "openid_connect_v1.0" | "oidc10" | "openidconnect10" => Self::OpenIdConnect10,
            "saml_v2.0" | "saml20" => Self::Saml20,
            "token_based" | "tokenbased" => Self::TokenBased,
            "cas" => Self::Cas,
            "jwt" => Self::Jwt,
            "basic" => Self::Basic,
            _ => Self::Unsupported(value.to_string()),
        }
    }

    /// Canonical configuration name; the raw value for unsupported ones.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::ExtendApi => "Extend_API",
            Self::FormBased => "Form_Based",
            Self::OAuth20 => "OAuth_v2.0",
            Self::OAuth21 => "OAuth_v2.1",
            Self::OpenIdConnect10 => "OpenID_Connect_v1.0",
            Self::Saml20 => "SAML_v2.0",
            Self::TokenBased => "Token_Based",
            Self::Cas => "CAS",
            Self::Jwt => "JWT",
            Self::Basic => "Basic",
            Self::Unsupported(raw) => raw,
        }
    }

    /// Internal endpoint prefix the request is forwarded to, or `None` for
    /// protocols that redirect to an external login URL.
    #[must_use]
    pub const fn forward_prefix(&self) -> Option<&'static str> {
        match self {
            Self::ExtendApi => Some("/authz/api"),
            Self::FormBased => Some("/authz/formbased"),
            Self::OAuth20 | Self::OpenIdConnect10 => Some("/authz/oauth/v20"),
            Self::Saml20 => Some("/authz/saml20/idpinit"),
            Self::TokenBased => Some("/authz/tokenbased"),
            Self::Cas => Some("/authz/cas"),
            Self::Jwt => Some("/authz/jwt"),
            Self::OAuth21 | Self::Basic | Self::Unsupported(_) => None,
        }
    }

    /// Protocols whose issuance happens entirely outside this service.
    #[must_use]
    pub const fn redirects_to_login(&self) -> bool {
        matches!(self, Self::OAuth21 | Self::Basic)
    }

    /// Whether the value matched a known protocol.
    #[must_use]
    pub const fn is_supported(&self) -> bool {
        !matches!(self, Self::Unsupported(_))
    }

    /// Low-cardinality label for metrics.
    #[must_use]
    pub fn metric_label(&self) -> &str {
        if self.is_supported() { self.as_str() } else { "unsupported" }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where the host sends the browser next.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RoutingDecision {
    /// Internal forward to a protocol endpoint
    Forward {
        /// Endpoint path including the application id
        path: String,
    },
    /// External redirect
    Redirect {
        /// Target URL
        url: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_names_round_trip() {
        for protocol in Protocol::ALL {
            assert_eq!(Protocol::parse(protocol.as_str()), protocol);
        }
    }

    #[test]
    fn test_aliases_and_case() {
        assert_eq!(Protocol::parse("SAML20"), Protocol::Saml20);
        assert_eq!(Protocol::parse("saml_V2.0"), Protocol::Saml20);
        assert_eq!(Protocol::parse(" oidc10 "), Protocol::OpenIdConnect10);
        assert_eq!(Protocol::parse("cas"), Protocol::Cas);
        assert_eq!(Protocol::parse("XYZ"), Protocol::Unsupported("XYZ".into()));
    }

    #[test]
    fn test_every_protocol_has_one_destination() {
        for protocol in Protocol::ALL {
            assert_ne!(protocol.forward_prefix().is_some(), protocol.redirects_to_login(), "{protocol}");
        }
        let unknown = Protocol::parse("nope");
        assert!(unknown.forward_prefix().is_none());
        assert!(!unknown.redirects_to_login());
        assert_eq!(unknown.metric_label(), "unsupported");
    }

    #[test]
    fn test_decision_serialization() {
        let decision = RoutingDecision::Forward {
            path: "/authz/cas/app-1".into(),
        };
        let json = serde_json::to_value(&decision).unwrap();
        assert_eq!(json["type"], "forward");
        assert_eq!(json["path"], "/authz/cas/app-1");
    }
}
