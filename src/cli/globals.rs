use secrecy::SecretString;

/// Process-wide configuration, built once at startup and injected into the
/// server. The token secret and AI key never appear in logs.
#[derive(Clone)]
pub struct GlobalArgs {
    pub token_secret: SecretString,
    pub token_ttl_minutes: i64,
    pub storage_endpoint: Option<String>,
    pub storage_public_endpoint: Option<String>,
    pub storage_bucket: String,
    pub genai_api_key: Option<SecretString>,
}

impl GlobalArgs {
    #[must_use]
    pub fn new(token_secret: SecretString, token_ttl_minutes: i64) -> Self {
        Self {
            token_secret,
            token_ttl_minutes,
            storage_endpoint: None,
            storage_public_endpoint: None,
            storage_bucket: String::new(),
            genai_api_key: None,
        }
    }
}

impl std::fmt::Debug for GlobalArgs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GlobalArgs")
            .field("token_secret", &"***")
            .field("token_ttl_minutes", &self.token_ttl_minutes)
            .field("storage_endpoint", &self.storage_endpoint)
            .field("storage_public_endpoint", &self.storage_public_endpoint)
            .field("storage_bucket", &self.storage_bucket)
            .field(
                "genai_api_key",
                &self.genai_api_key.as_ref().map(|_| "***"),
            )
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn test_global_args() {
        let args = GlobalArgs::new(SecretString::from("s3cret"), 30);
        assert_eq!(args.token_secret.expose_secret(), "s3cret");
        assert_eq!(args.token_ttl_minutes, 30);
        assert!(args.storage_endpoint.is_none());
        assert!(args.genai_api_key.is_none());
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let mut args = GlobalArgs::new(SecretString::from("s3cret"), 30);
        args.genai_api_key = Some(SecretString::from("genai-key"));

        let debug = format!("{args:?}");
        assert!(!debug.contains("s3cret"));
        assert!(!debug.contains("genai-key"));
    }
}
