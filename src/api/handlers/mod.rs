//! API handlers and shared utilities.
//!
//! This module organizes the service's route handlers and provides common
//! validation helpers used before persisting data.

pub mod activity;
pub mod auth;
pub mod chat;
pub mod health;
pub mod me;
pub mod plan;
pub mod root;
pub mod upload;
pub mod user_login;
pub mod user_register;

use regex::Regex;

/// Lightweight email sanity check used by auth handlers before persisting data.
pub fn valid_email(email: &str) -> bool {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").map_or(false, |re| re.is_match(email))
}

/// Usernames are short handles: letters, digits, underscore, dot, dash.
pub fn valid_username(username: &str) -> bool {
    Regex::new(r"^[A-Za-z0-9_.-]{3,32}$").map_or(false, |re| re.is_match(username))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_email() {
        assert!(valid_email("alice@example.com"));
        assert!(valid_email("a.b+c@sub.example.org"));

        assert!(!valid_email("alice"));
        assert!(!valid_email("alice@example"));
        assert!(!valid_email("alice @example.com"));
        assert!(!valid_email("@example.com"));
    }

    #[test]
    fn test_valid_username() {
        assert!(valid_username("alice"));
        assert!(valid_username("alice_92"));
        assert!(valid_username("a.b-c"));

        assert!(!valid_username("al"));
        assert!(!valid_username("alice with spaces"));
        assert!(!valid_username(&"a".repeat(33)));
    }
}
