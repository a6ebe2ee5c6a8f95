//! Anti-forgery tokens.
//!
//! [`csrf_token_middleware`] mints one random token per session, exposes it
//! to handlers as a [`CsrfToken`] extension and echoes it in the
//! `x-csrf-token` response header. [`require_csrf`] guards state-changing
//! routes: the token must come back in the header, a `csrf_token` query
//! parameter, or a `csrf_token` urlencoded form field.

use axum::{
    body::{Body, to_bytes},
    extract::{FromRequestParts, Request},
    http::{HeaderValue, header::CONTENT_TYPE, request::Parts},
    middleware::Next,
    response::Response,
};
use base64::{Engine, engine::general_purpose::STANDARD};
use rand::RngCore;
use tower_sessions::Session;
use tracing::warn;

use crate::error::AppError;
use crate::models::ShopSession;

/// Header carrying the token in both directions.
pub const CSRF_HEADER: &str = "x-csrf-token";

/// Query parameter and form field name.
pub const CSRF_FIELD: &str = "csrf_token";

/// Largest form body buffered while looking for the token.
const MAX_FORM_BYTES: usize = 64 * 1024;

/// The session's anti-forgery token (128-bit, base64-encoded).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CsrfToken(pub String);

impl CsrfToken {
    /// Generate a new random token.
    #[must_use]
    pub fn generate() -> Self {
        let mut bytes = [0u8; 16];
        rand::rng().fill_bytes(&mut bytes);
        Self(STANDARD.encode(bytes))
    }

    /// The token value.
    #[must_use]
    pub fn value(&self) -> &str {
        &self.0
    }
}

impl<S> FromRequestParts<S> for CsrfToken
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts.extensions.get::<Self>().cloned().unwrap_or_else(|| {
            warn!("CSRF token not found in request extensions - middleware may be misconfigured");
            Self(String::new())
        }))
    }
}

/// Ensure the session has a token and make it available to the request.
///
/// Must run inside the session layer.
///
/// # Errors
///
/// Returns `AppError` if the session store fails.
pub async fn csrf_token_middleware(mut request: Request, next: Next) -> Result<Response, AppError> {
    let session = request
        .extensions()
        .get::<Session>()
        .cloned()
        .map(ShopSession::new)
        .ok_or_else(|| AppError::Internal("session layer not installed".to_string()))?;

    let token = if let Some(token) = session.csrf_token().await? {
        CsrfToken(token)
    } else {
        let token = CsrfToken::generate();
        session.set_csrf_token(token.value()).await?;
        token
    };
    request.extensions_mut().insert(token);

    let mut response = next.run(request).await;

    // Re-read: the handler may have flushed the session.
    if let Some(value) = session
        .csrf_token()
        .await?
        .and_then(|current| HeaderValue::from_str(&current).ok())
    {
        response.headers_mut().insert(CSRF_HEADER, value);
    }

    Ok(response)
}

/// Reject the request with 403 unless it presents the session's token.
///
/// # Errors
///
/// Returns `AppError::Forbidden` if the token is missing or wrong, or
/// `AppError::BadRequest` if a form body cannot be read.
pub async fn require_csrf(request: Request, next: Next) -> Result<Response, AppError> {
    let expected = request
        .extensions()
        .get::<CsrfToken>()
        .cloned()
        .ok_or_else(|| AppError::Forbidden("anti-forgery token not issued".to_string()))?;

    if let Some(presented) = header_token(&request).or_else(|| query_token(&request)) {
        verify(&expected, &presented)?;
        return Ok(next.run(request).await);
    }

    if is_form(&request) {
        let (parts, body) = request.into_parts();
        let bytes = to_bytes(body, MAX_FORM_BYTES)
            .await
            .map_err(|e| AppError::BadRequest(format!("unreadable form body: {e}")))?;
        let presented = field_value(&bytes).unwrap_or_default();
        verify(&expected, &presented)?;
        let request = Request::from_parts(parts, Body::from(bytes));
        return Ok(next.run(request).await);
    }

    Err(AppError::Forbidden("missing anti-forgery token".to_string()))
}

fn verify(expected: &CsrfToken, presented: &str) -> Result<(), AppError> {
    if expected.value().is_empty() || !constant_time_compare(expected.value(), presented) {
        return Err(AppError::Forbidden("invalid anti-forgery token".to_string()));
    }
    Ok(())
}

fn header_token(request: &Request) -> Option<String> {
    request
        .headers()
        .get(CSRF_HEADER)
        .and_then(|h| h.to_str().ok())
        .map(String::from)
}

fn query_token(request: &Request) -> Option<String> {
    request.uri().query().and_then(|q| field_value(q.as_bytes()))
}

fn field_value(encoded: &[u8]) -> Option<String> {
    url::form_urlencoded::parse(encoded)
        .find(|(key, _)| key == CSRF_FIELD)
        .map(|(_, value)| value.into_owned())
}

fn is_form(request: &Request) -> bool {
    request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|h| h.to_str().ok())
        .is_some_and(|ct| ct.starts_with("application/x-www-form-urlencoded"))
}

/// Constant-time string comparison.
fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result: u8 = 0;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }

    result == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_tokens_are_distinct_and_sized() {
        let a = CsrfToken::generate();
        let b = CsrfToken::generate();
        assert_ne!(a, b);
        // 16 bytes of base64 with padding.
        assert_eq!(a.value().len(), 24);
    }

    #[test]
    fn test_field_value_decodes() {
        assert_eq!(
            field_value(b"Quantity=1&csrf_token=ab%2Bc%3D%3D&ProductId=3"),
            Some("ab+c==".to_string())
        );
        assert_eq!(field_value(b"Quantity=1"), None);
    }

    #[test]
    fn test_constant_time_compare() {
        assert!(constant_time_compare("hello", "hello"));
        assert!(!constant_time_compare("hello", "world"));
        assert!(!constant_time_compare("hello", "hell"));
    }

    #[test]
    fn test_empty_expected_token_never_matches() {
        assert!(verify(&CsrfToken(String::new()), "").is_err());
    }
}
