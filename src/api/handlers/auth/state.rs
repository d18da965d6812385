//! Auth configuration and signing state.

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Validation};
use secrecy::{ExposeSecret, SecretString};

const DEFAULT_TOKEN_TTL_SECONDS: i64 = 30 * 60;

/// Token-signing configuration, built once at startup from CLI/env.
#[derive(Clone)]
pub struct AuthConfig {
    token_secret: SecretString,
    token_ttl_seconds: i64,
}

impl AuthConfig {
    #[must_use]
    pub fn new(token_secret: SecretString) -> Self {
        Self {
            token_secret,
            token_ttl_seconds: DEFAULT_TOKEN_TTL_SECONDS,
        }
    }

    #[must_use]
    pub fn with_token_ttl_minutes(mut self, minutes: i64) -> Self {
        self.token_ttl_seconds = minutes * 60;
        self
    }

    #[must_use]
    pub fn with_token_ttl_seconds(mut self, seconds: i64) -> Self {
        self.token_ttl_seconds = seconds;
        self
    }

    pub(super) fn token_secret(&self) -> &SecretString {
        &self.token_secret
    }

    pub(super) fn token_ttl_seconds(&self) -> i64 {
        self.token_ttl_seconds
    }
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("token_secret", &"***")
            .field("token_ttl_seconds", &self.token_ttl_seconds)
            .finish()
    }
}

/// Derived signing state shared by all requests, read-only after startup.
pub struct AuthState {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    token_ttl_seconds: i64,
}

impl AuthState {
    #[must_use]
    pub fn new(config: &AuthConfig) -> Self {
        let secret = config.token_secret().expose_secret().as_bytes();

        let mut validation = Validation::new(Algorithm::HS256);
        // No clock-skew allowance: a token is rejected the instant it expires.
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
            token_ttl_seconds: config.token_ttl_seconds(),
        }
    }

    pub(super) fn encoding(&self) -> &EncodingKey {
        &self.encoding
    }

    pub(super) fn decoding(&self) -> &DecodingKey {
        &self.decoding
    }

    pub(super) fn validation(&self) -> &Validation {
        &self.validation
    }

    pub(super) fn token_ttl_seconds(&self) -> i64 {
        self.token_ttl_seconds
    }
}

impl std::fmt::Debug for AuthState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthState")
            .field("token_ttl_seconds", &self.token_ttl_seconds)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_ttl_is_thirty_minutes() {
        let config = AuthConfig::new(SecretString::from("s3cret"));
        assert_eq!(config.token_ttl_seconds(), 30 * 60);
    }

    #[test]
    fn test_ttl_builders() {
        let config = AuthConfig::new(SecretString::from("s3cret")).with_token_ttl_minutes(5);
        assert_eq!(config.token_ttl_seconds(), 5 * 60);

        let config = AuthConfig::new(SecretString::from("s3cret")).with_token_ttl_seconds(42);
        assert_eq!(config.token_ttl_seconds(), 42);
    }

    #[test]
    fn test_debug_redacts_secret() {
        let config = AuthConfig::new(SecretString::from("s3cret"));
        let debug = format!("{config:?}");
        assert!(!debug.contains("s3cret"));

        let state = AuthState::new(&config);
        let debug = format!("{state:?}");
        assert!(!debug.contains("s3cret"));
    }
}
