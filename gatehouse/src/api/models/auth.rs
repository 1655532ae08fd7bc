//! Request/response models for authentication endpoints.

use std::collections::BTreeMap;
use std::fmt;

use axum::{
    http::{HeaderValue, header::SET_COOKIE},
    response::{IntoResponse, Redirect, Response},
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::errors::Error;
use crate::types::Identity;

/// Sign-in form submission.
#[derive(Clone, Serialize, Deserialize, ToSchema)]
pub struct LoginRequest {
    /// Login identifier (email address or username)
    pub identifier: String,
    pub password: String,
}

// Keep the plaintext secret out of debug output and logs.
impl fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginRequest")
            .field("identifier", &self.identifier)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Static information about the sign-in flow.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoginInfo {
    pub message: String,
    pub sign_in_path: String,
    pub landing_path: String,
}

/// What the rendering layer may know about the current request.
///
/// Read-only: templates use this to show or hide affordances. Enforcement is
/// always the route-level admit call, never this payload.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SessionInfo {
    pub authenticated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identity: Option<Identity>,
    /// Capability name -> granted, for every registered gate
    #[serde(default)]
    pub capabilities: BTreeMap<String, bool>,
    /// Anti-forgery token to embed in state-changing forms
    #[serde(skip_serializing_if = "Option::is_none")]
    pub csrf_token: Option<String>,
}

impl SessionInfo {
    pub fn anonymous() -> Self {
        Self {
            authenticated: false,
            identity: None,
            capabilities: BTreeMap::new(),
            csrf_token: None,
        }
    }
}

/// Redirect response that also sets (or clears) the session cookie.
#[derive(Debug)]
pub struct LoginResponse {
    pub cookie: Option<String>,
    pub location: String,
}

impl IntoResponse for LoginResponse {
    fn into_response(self) -> Response {
        let mut response = Redirect::to(&self.location).into_response();
        if let Some(cookie) = self.cookie {
            match HeaderValue::from_str(&cookie) {
                Ok(value) => {
                    response.headers_mut().append(SET_COOKIE, value);
                }
                Err(e) => {
                    return Error::Internal {
                        operation: format!("encode session cookie header: {e}"),
                    }
                    .into_response();
                }
            }
        }
        response
    }
}

/// Redirect response clearing the session cookie.
#[derive(Debug)]
pub struct LogoutResponse {
    pub cookie: String,
    pub location: String,
}

impl IntoResponse for LogoutResponse {
    fn into_response(self) -> Response {
        LoginResponse {
            cookie: Some(self.cookie),
            location: self.location,
        }
        .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{StatusCode, header::LOCATION};

    #[test]
    fn test_login_request_debug_redacts_password() {
        let request = LoginRequest {
            identifier: "ada@example.com".to_string(),
            password: "hunter2".to_string(),
        };
        let debug = format!("{request:?}");
        assert!(debug.contains("ada@example.com"));
        assert!(!debug.contains("hunter2"));
    }

    #[test]
    fn test_login_response_sets_cookie_and_redirects() {
        let response = LoginResponse {
            cookie: Some("session=abc; Path=/; HttpOnly".to_string()),
            location: "/".to_string(),
        }
        .into_response();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers().get(LOCATION).unwrap(), "/");
        assert!(response.headers().get(SET_COOKIE).unwrap().to_str().unwrap().starts_with("session=abc"));
    }

    #[test]
    fn test_login_response_without_cookie_sets_no_header() {
        let response = LoginResponse {
            cookie: None,
            location: "/sign-in".to_string(),
        }
        .into_response();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert!(response.headers().get(SET_COOKIE).is_none());
    }
}
