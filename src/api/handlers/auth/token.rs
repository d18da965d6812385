//! Access token issuance and verification.
//!
//! Tokens are compact HS256 JWTs carrying the subject (user email) and an
//! absolute expiry. They are stateless: no revocation list exists, expiry is
//! the only invalidation mechanism.

use chrono::Utc;
use jsonwebtoken::{decode, encode, errors::ErrorKind, Header};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::state::AuthState;

/// Claim set carried by an access token.
///
/// New claims are added as explicit optional fields, not a free-form map.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    /// Subject: the authenticated user's email.
    pub sub: String,
    /// Absolute expiry as a unix timestamp.
    pub exp: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("token expired")]
    Expired,
    #[error("invalid token")]
    Invalid,
    #[error("token encoding failed")]
    Encoding(#[source] jsonwebtoken::errors::Error),
}

impl AuthState {
    /// Issue an access token for `subject` using the configured lifetime.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::Encoding`] if the claims cannot be serialized
    /// and signed.
    pub fn issue_token(&self, subject: &str) -> Result<String, TokenError> {
        self.issue_token_with_ttl(subject, self.token_ttl_seconds())
    }

    /// Issue an access token with an explicit lifetime in seconds.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::Encoding`] if the claims cannot be serialized
    /// and signed.
    pub fn issue_token_with_ttl(
        &self,
        subject: &str,
        ttl_seconds: i64,
    ) -> Result<String, TokenError> {
        let claims = Claims {
            sub: subject.to_string(),
            exp: Utc::now().timestamp() + ttl_seconds,
            scope: None,
        };

        encode(&Header::default(), &claims, self.encoding()).map_err(TokenError::Encoding)
    }

    /// Verify signature, algorithm, structure, and expiry, then return the
    /// claims. Never returns partial data.
    ///
    /// # Errors
    ///
    /// [`TokenError::Expired`] when the expiry instant has passed; every
    /// other failure (bad signature, wrong algorithm, malformed token,
    /// missing subject) is [`TokenError::Invalid`].
    pub fn decode_token(&self, token: &str) -> Result<Claims, TokenError> {
        decode::<Claims>(token, self.decoding(), self.validation())
            .map(|data| data.claims)
            .map_err(|err| match err.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::handlers::auth::state::AuthConfig;
    use secrecy::SecretString;

    fn state(secret: &str) -> AuthState {
        AuthState::new(&AuthConfig::new(SecretString::from(secret)))
    }

    #[test]
    fn test_issue_and_decode_roundtrip() {
        let auth = state("test-secret-key-for-token-tests");

        let token = auth.issue_token("alice@example.com").unwrap();
        let claims = auth.decode_token(&token).unwrap();

        assert_eq!(claims.sub, "alice@example.com");
        assert_eq!(claims.scope, None);
        assert!(claims.exp > Utc::now().timestamp());
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let auth = state("test-secret-key-for-token-tests");

        let token = auth
            .issue_token_with_ttl("alice@example.com", -120)
            .unwrap();

        assert!(matches!(
            auth.decode_token(&token),
            Err(TokenError::Expired)
        ));
    }

    #[test]
    fn test_wrong_secret_is_rejected() {
        let auth = state("test-secret-key-for-token-tests");
        let other = state("a-different-secret-entirely");

        let token = auth.issue_token("alice@example.com").unwrap();

        assert!(matches!(
            other.decode_token(&token),
            Err(TokenError::Invalid)
        ));
    }

    #[test]
    fn test_tampered_signature_is_rejected() {
        let auth = state("test-secret-key-for-token-tests");

        let mut token = auth.issue_token("alice@example.com").unwrap();
        // Flip the last signature character
        let last = token.pop().unwrap();
        token.push(if last == 'A' { 'B' } else { 'A' });

        assert!(matches!(
            auth.decode_token(&token),
            Err(TokenError::Invalid)
        ));
    }

    #[test]
    fn test_garbage_token_is_rejected() {
        let auth = state("test-secret-key-for-token-tests");

        assert!(matches!(
            auth.decode_token("not.a.token"),
            Err(TokenError::Invalid)
        ));
        assert!(matches!(auth.decode_token(""), Err(TokenError::Invalid)));
    }

    #[test]
    fn test_missing_subject_is_rejected() {
        #[derive(serde::Serialize)]
        struct NoSubject {
            exp: i64,
        }

        let auth = state("test-secret-key-for-token-tests");
        let token = encode(
            &Header::default(),
            &NoSubject {
                exp: Utc::now().timestamp() + 600,
            },
            auth.encoding(),
        )
        .unwrap();

        assert!(matches!(
            auth.decode_token(&token),
            Err(TokenError::Invalid)
        ));
    }

    #[test]
    fn test_scope_claim_is_optional_on_the_wire() {
        let claims = Claims {
            sub: "alice@example.com".to_string(),
            exp: 1_700_000_000,
            scope: None,
        };
        let json = serde_json::to_string(&claims).unwrap();
        assert!(!json.contains("scope"));

        let claims = Claims {
            scope: Some("profile".to_string()),
            ..claims
        };
        let json = serde_json::to_string(&claims).unwrap();
        assert!(json.contains(r#""scope":"profile""#));
    }
}
