//! Write-once assembly of token claims.

use crate::error::IssuanceError;
use crate::jwt::claims::SsoClaims;
use crate::model::Principal;
use chrono::{DateTime, Utc};

/// Builder for [`SsoClaims`]. Times are whole seconds since the epoch.
pub struct ClaimsBuilder {
    issuer: String,
    subject: Option<String>,
    audience: Vec<String>,
    lifetime_minutes: i64,
    issued_at: Option<DateTime<Utc>>,
    email: Option<String>,
    name: Option<String>,
    user_id: Option<String>,
    external_id: Option<String>,
    locale: Option<String>,
    online_ticket: Option<String>,
    kid: Option<String>,
}

impl ClaimsBuilder {
    /// Start a builder for tokens issued by `issuer`.
    #[must_use]
    pub fn new(issuer: impl Into<String>) -> Self {
        Self {
            issuer: issuer.into(),
            subject: None,
            audience: Vec::new(),
            lifetime_minutes: 0,
            issued_at: None,
            email: None,
            name: None,
            user_id: None,
            external_id: None,
            locale: None,
            online_ticket: None,
            kid: None,
        }
    }

    /// Copy subject and profile claims from the authenticated principal.
    pub fn principal(mut self, principal: &Principal) -> Self {
        self.subject = Some(principal.username.clone());
        self.user_id = Some(principal.user_id.clone()).filter(|id| !id.is_empty());
        self.external_id.clone_from(&principal.external_id);
        self.email.clone_from(&principal.email);
        self.name.clone_from(&principal.display_name);
        self.locale.clone_from(&principal.locale);
        self.online_ticket.clone_from(&principal.session_ticket_id);
        self
    }

    /// Override the subject.
    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    /// Add an audience; the application id for SSO tokens.
    pub fn audience(mut self, audience: impl Into<String>) -> Self {
        self.audience.push(audience.into());
        self
    }

    /// Token lifetime in minutes; must be positive.
    pub fn lifetime_minutes(mut self, minutes: i64) -> Self {
        self.lifetime_minutes = minutes;
        self
    }

    /// Fix the issue time instead of reading the clock at build.
    pub fn issued_at(mut self, at: DateTime<Utc>) -> Self {
        self.issued_at = Some(at);
        self
    }

    /// Key id recorded in the `kid` claim.
    pub fn kid(mut self, kid: Option<String>) -> Self {
        self.kid = kid;
        self
    }

    /// Assemble the claims with a fresh `jti`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidLifetime` unless the lifetime is a positive number
    /// of minutes, and `MissingClaim` without a subject.
    pub fn build(self) -> Result<SsoClaims, IssuanceError> {
        let invalid_lifetime = || IssuanceError::InvalidLifetime {
            app_id: self.audience.join(","),
            minutes: self.lifetime_minutes,
        };
        if self.lifetime_minutes <= 0 {
            return Err(invalid_lifetime());
        }
        let lifetime_seconds = self
            .lifetime_minutes
            .checked_mul(60)
            .ok_or_else(invalid_lifetime)?;

        let iat = self.issued_at.unwrap_or_else(Utc::now).timestamp();
        let exp = iat.checked_add(lifetime_seconds).ok_or_else(invalid_lifetime)?;

        let subject = self.subject.ok_or(IssuanceError::MissingClaim { claim: "sub" })?;

        Ok(SsoClaims {
            iss: self.issuer,
            sub: subject,
            aud: self.audience,
            jti: uuid::Uuid::new_v4().to_string(),
            iat,
            exp,
            email: self.email,
            name: self.name,
            user_id: self.user_id,
            external_id: self.external_id,
            locale: self.locale,
            online_ticket: self.online_ticket,
            kid: self.kid,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn principal() -> Principal {
        Principal {
            username: "alice".into(),
            user_id: "u-1".into(),
            email: Some("alice@example.com".into()),
            display_name: Some("Alice".into()),
            session_ticket_id: Some("OT-1".into()),
            ..Principal::default()
        }
    }

    #[test]
    fn test_builder_basic() {
        let issued = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let claims = ClaimsBuilder::new("https://sso.example.com")
            .principal(&principal())
            .audience("app-1")
            .lifetime_minutes(10)
            .issued_at(issued)
            .kid(Some("rsa-1".into()))
            .build()
            .unwrap();

        assert_eq!(claims.sub, "alice");
        assert_eq!(claims.aud, vec!["app-1".to_string()]);
        assert_eq!(claims.iat, issued.timestamp());
        assert_eq!(claims.exp, issued.timestamp() + 600);
        assert_eq!(claims.online_ticket.as_deref(), Some("OT-1"));
        assert_eq!(claims.kid.as_deref(), Some("rsa-1"));
    }

    #[test]
    fn test_builder_rejects_lifetime() {
        for minutes in [0, -5, i64::MIN] {
            let err = ClaimsBuilder::new("iss")
                .subject("alice")
                .audience("app-1")
                .lifetime_minutes(minutes)
                .build()
                .unwrap_err();
            assert!(matches!(err, IssuanceError::InvalidLifetime { .. }));
        }
    }

    #[test]
    fn test_builder_overflowing_lifetime() {
        let err = ClaimsBuilder::new("iss")
            .subject("alice")
            .lifetime_minutes(i64::MAX)
            .build()
            .unwrap_err();
        assert!(matches!(err, IssuanceError::InvalidLifetime { .. }));
    }

    #[test]
    fn test_builder_missing_subject() {
        let result = ClaimsBuilder::new("iss").lifetime_minutes(5).build();
        assert!(matches!(result, Err(IssuanceError::MissingClaim { claim: "sub" })));
    }

    #[test]
    fn test_unique_token_ids() {
        let build = || {
            ClaimsBuilder::new("iss")
                .subject("alice")
                .lifetime_minutes(5)
                .build()
                .unwrap()
        };
        assert_ne!(build().jti, build().jti);
    }
}
