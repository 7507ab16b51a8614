use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, Request, header},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

use super::service::AuthenticatedAccount;
use crate::gateway::{state::AppState, types::ApiError};

/// Cookie carrying an OAuth login session
pub const SESSION_COOKIE: &str = "session_token";

/// Value of the session cookie, if the request carries one
pub fn session_cookie(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|h| h.to_str().ok())
        .flat_map(|h| h.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.to_string())
        .filter(|value| !value.is_empty())
}

fn bearer_token(headers: &HeaderMap) -> Result<Option<&str>, ApiError> {
    let Some(auth_header) = headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
    else {
        return Ok(None);
    };
    match auth_header.strip_prefix("Bearer ") {
        Some(token) => Ok(Some(token.trim())),
        None => Err(ApiError::unauthorized("Invalid token format")),
    }
}

/// Resolves the caller from the session cookie or bearer token and stores an
/// [`AuthenticatedAccount`] in the request extensions.
pub async fn jwt_auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let cookie = session_cookie(request.headers());
    let bearer = bearer_token(request.headers())?;
    if cookie.is_none() && bearer.is_none() {
        return Err(ApiError::missing_auth());
    }

    let caller = state
        .services
        .auth
        .authenticate(cookie.as_deref(), bearer)
        .await
        .map_err(|_| ApiError::unauthorized("Invalid or expired credentials"))?;

    request.extensions_mut().insert(caller);
    Ok(next.run(request).await)
}

/// Layered inside [`jwt_auth_middleware`]; rejects non-admin callers
pub async fn admin_middleware(request: Request<Body>, next: Next) -> Result<Response, ApiError> {
    let caller = request
        .extensions()
        .get::<AuthenticatedAccount>()
        .copied()
        .ok_or_else(ApiError::missing_auth)?;
    caller.require_admin()?;
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_session_cookie_parsing() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; session_token=abc123; lang=en"),
        );
        assert_eq!(session_cookie(&headers).as_deref(), Some("abc123"));

        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("session_token="));
        assert_eq!(session_cookie(&headers), None);
        assert_eq!(session_cookie(&HeaderMap::new()), None);
    }

    #[test]
    fn test_bearer_token() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers).unwrap(), None);
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer tok"));
        assert_eq!(bearer_token(&headers).unwrap(), Some("tok"));
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic xyz"));
        assert!(bearer_token(&headers).is_err());
    }
}
