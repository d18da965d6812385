//! # Vigoro (Personal Health & Fitness API)
//!
//! `vigoro` is the backend for a personal health and fitness tracker. It
//! handles user registration and login, profile management, activity
//! logging, meal-photo analysis through an external generative-AI vision
//! service, and AI-generated diet/workout plans.
//!
//! ## Authentication
//!
//! Passwords are stored as salted bcrypt digests only. A successful login
//! issues a short-lived HS256 JWT; every protected route resolves the
//! bearer token back to a persisted user before any handler logic runs.
//! All authentication failures collapse into a single generic `401` so
//! callers cannot distinguish expired tokens, bad signatures, or deleted
//! accounts.

pub mod api;
pub mod cli;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_git_commit_hash_format() {
        if GIT_COMMIT_HASH == "unknown" {
            // Acceptable in non-git build environments
            return;
        }
        assert!(
            GIT_COMMIT_HASH.chars().all(|c| c.is_ascii_hexdigit()),
            "GIT_COMMIT_HASH should be a hex string, got: {GIT_COMMIT_HASH}"
        );
        assert!(
            GIT_COMMIT_HASH.len() >= 7,
            "GIT_COMMIT_HASH should be at least 7 characters long, got: {GIT_COMMIT_HASH}"
        );
    }

    #[test]
    fn test_app_user_agent_format() {
        assert!(APP_USER_AGENT.starts_with(env!("CARGO_PKG_NAME")));
        assert!(APP_USER_AGENT.contains(env!("CARGO_PKG_VERSION")));
    }
}
