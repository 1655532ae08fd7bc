//! Extractors for getting the authenticated identity in handlers.

use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, request::Parts},
};

use crate::{
    AppState,
    errors::{Error, Result},
    types::Identity,
};

/// Extract the session token from a request's cookie header, if present.
///
/// Malformed cookie headers are treated as "no session" rather than an
/// error: absence of a token is an expected state, not a failure.
pub fn session_token_from_headers(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    let cookie_header = headers.get(axum::http::header::COOKIE)?;
    let cookie_str = cookie_header.to_str().ok()?;

    for cookie in cookie_str.split(';') {
        let cookie = cookie.trim();
        if let Some((name, value)) = cookie.split_once('=') {
            if name == cookie_name && !value.is_empty() {
                return Some(value.to_string());
            }
        }
    }
    None
}

/// The authenticated identity for this request.
///
/// Prefers the identity stashed in request extensions by the route
/// middleware (already resolved once); otherwise resolves the session cookie
/// directly. Rejects with 401 when neither yields an identity; routes that
/// should redirect browsers to the sign-in form use the middleware instead.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub Identity);

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        if let Some(identity) = parts.extensions.get::<Identity>() {
            return Ok(Self(identity.clone()));
        }

        let token = session_token_from_headers(&parts.headers, &state.config.auth.session.cookie_name);
        match state.guard.identity(token.as_deref()) {
            Some(identity) => Ok(Self(identity)),
            None => Err(Error::Unauthenticated { message: None }),
        }
    }
}
