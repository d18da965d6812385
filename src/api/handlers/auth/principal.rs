//! Authenticated principal extraction.
//!
//! Flow Overview: read the bearer token from the `Authorization` header,
//! decode it, and resolve the subject to a persisted user. This is the
//! single authentication boundary — every protected handler goes through
//! [`require_auth`] or never runs.

use axum::{
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use sqlx::PgPool;
use tracing::{debug, error};

use super::state::AuthState;
use super::storage::{find_user_by_email, User};
use super::token::TokenError;

/// Authenticated user context, owned by a single request.
#[derive(Debug, Clone)]
pub struct Principal {
    pub user: User,
}

/// External outcome of a failed authentication.
///
/// Every internal cause (missing header, bad signature, expired token,
/// deleted account) collapses into `Unauthenticated` so callers cannot probe
/// accounts or token internals. Lookup infrastructure failures are the one
/// exception and surface as a plain 500.
#[derive(Debug)]
pub enum AuthError {
    Unauthenticated,
    Internal,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        match self {
            Self::Unauthenticated => (
                StatusCode::UNAUTHORIZED,
                [(header::WWW_AUTHENTICATE, "Bearer")],
                "Could not validate credentials",
            )
                .into_response(),
            Self::Internal => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
        }
    }
}

/// Internal rejection causes; logged at debug, never surfaced.
enum Rejection {
    MissingBearer,
    Token(TokenError),
    UnknownSubject,
    Database(sqlx::Error),
}

/// Resolve the request's bearer token into a [`Principal`].
///
/// # Errors
///
/// [`AuthError::Unauthenticated`] for any token or subject problem;
/// [`AuthError::Internal`] when the user lookup itself fails.
pub async fn require_auth(
    headers: &HeaderMap,
    pool: &PgPool,
    auth: &AuthState,
) -> Result<Principal, AuthError> {
    match resolve(headers, pool, auth).await {
        Ok(principal) => Ok(principal),
        Err(Rejection::Database(err)) => {
            error!("Failed to look up token subject: {err}");
            Err(AuthError::Internal)
        }
        Err(Rejection::MissingBearer) => {
            debug!("Missing bearer token");
            Err(AuthError::Unauthenticated)
        }
        Err(Rejection::Token(err)) => {
            debug!("Token rejected: {err}");
            Err(AuthError::Unauthenticated)
        }
        Err(Rejection::UnknownSubject) => {
            debug!("Token subject has no matching user");
            Err(AuthError::Unauthenticated)
        }
    }
}

async fn resolve(
    headers: &HeaderMap,
    pool: &PgPool,
    auth: &AuthState,
) -> Result<Principal, Rejection> {
    let token = bearer_token(headers).ok_or(Rejection::MissingBearer)?;

    let claims = auth.decode_token(token).map_err(Rejection::Token)?;

    match find_user_by_email(pool, &claims.sub).await {
        Ok(Some(user)) => Ok(Principal { user }),
        Ok(None) => Err(Rejection::UnknownSubject),
        Err(err) => Err(Rejection::Database(err)),
    }
}

/// Extract the token from an `Authorization: Bearer <token>` header. The
/// scheme is matched case-insensitively per RFC 7235.
fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;

    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }

    let token = token.trim();
    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers_with_authorization(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_bearer_token_extraction() {
        let headers = headers_with_authorization("Bearer abc.def.ghi");
        assert_eq!(bearer_token(&headers), Some("abc.def.ghi"));
    }

    #[test]
    fn test_bearer_scheme_is_case_insensitive() {
        let headers = headers_with_authorization("bearer abc.def.ghi");
        assert_eq!(bearer_token(&headers), Some("abc.def.ghi"));

        let headers = headers_with_authorization("BEARER abc.def.ghi");
        assert_eq!(bearer_token(&headers), Some("abc.def.ghi"));
    }

    #[test]
    fn test_missing_or_foreign_schemes_are_rejected() {
        assert_eq!(bearer_token(&HeaderMap::new()), None);

        let headers = headers_with_authorization("Basic dXNlcjpwYXNz");
        assert_eq!(bearer_token(&headers), None);

        let headers = headers_with_authorization("Bearer");
        assert_eq!(bearer_token(&headers), None);

        let headers = headers_with_authorization("Bearer   ");
        assert_eq!(bearer_token(&headers), None);
    }

    #[tokio::test]
    async fn test_unauthenticated_response_shape() {
        let response = AuthError::Unauthenticated.into_response();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            response
                .headers()
                .get(header::WWW_AUTHENTICATE)
                .and_then(|v| v.to_str().ok()),
            Some("Bearer")
        );

        let body = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
        assert_eq!(&body[..], b"Could not validate credentials");
    }

    #[tokio::test]
    async fn test_internal_response_shape() {
        let response = AuthError::Internal.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
