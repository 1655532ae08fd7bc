//! Route protection middleware.
//!
//! Routers opt in per route group:
//!
//! ```ignore
//! let protected = middleware::require_capability(
//!     Router::new().route("/posts/{id}/edit", post(edit_post)),
//!     &state,
//!     "edit",
//! );
//! ```
//!
//! Every wrapper runs [`AccessGuard::admit`] ahead of the inner handler and
//! branches on the decision: `Allow` stashes the identity in request
//! extensions (picked up by the [`CurrentUser`] extractor),
//! `DenyUnauthenticated` redirects to the configured sign-in path, and
//! `DenyForbidden` renders as 403. Capability names are checked against the
//! registry when the wrapper is built, so a dangling name aborts startup
//! instead of surfacing per-request.
//!
//! [`CurrentUser`]: crate::auth::current_user::CurrentUser

use axum::{
    Router,
    extract::{Request, State},
    http::Method,
    middleware::{Next, from_fn_with_state},
    response::{IntoResponse, Redirect, Response},
};

use crate::{
    AppState,
    auth::{current_user::session_token_from_headers, guard::Decision},
    errors::Error,
};

#[derive(Clone)]
struct GuardContext {
    state: AppState,
    capability: Option<String>,
}

async fn enforce(State(ctx): State<GuardContext>, mut request: Request, next: Next) -> Response {
    let token = session_token_from_headers(request.headers(), &ctx.state.config.auth.session.cookie_name);

    match ctx.state.guard.admit(token.as_deref(), ctx.capability.as_deref()) {
        Decision::Allow(identity) => {
            request.extensions_mut().insert(identity);
            next.run(request).await
        }
        Decision::DenyUnauthenticated => Redirect::to(&ctx.state.config.auth.sign_in_path).into_response(),
        Decision::DenyForbidden { capability } => Error::InsufficientCapability { capability }.into_response(),
    }
}

/// Require a valid session for every route in `routes`.
pub fn require_session(routes: Router, state: &AppState) -> Router {
    let ctx = GuardContext {
        state: state.clone(),
        capability: None,
    };
    routes.layer(from_fn_with_state(ctx, enforce))
}

/// Require a valid session whose identity passes `capability` for every
/// route in `routes`.
///
/// # Panics
///
/// Panics immediately if `capability` is not registered, so route binding
/// aborts at startup rather than serving requests against a dangling
/// capability reference.
pub fn require_capability(routes: Router, state: &AppState, capability: &str) -> Router {
    state
        .gates
        .require(capability)
        .unwrap_or_else(|e| panic!("route binding failed: {e}"));

    let ctx = GuardContext {
        state: state.clone(),
        capability: Some(capability.to_string()),
    };
    routes.layer(from_fn_with_state(ctx, enforce))
}

async fn enforce_csrf(State(state): State<AppState>, request: Request, next: Next) -> Response {
    // Safe methods carry no state change to protect
    if matches!(*request.method(), Method::GET | Method::HEAD | Method::OPTIONS) {
        return next.run(request).await;
    }

    let token = session_token_from_headers(request.headers(), &state.config.auth.session.cookie_name);
    let presented = request.headers().get("x-csrf-token").and_then(|v| v.to_str().ok());

    let valid = match (token.as_deref(), presented) {
        (Some(token), Some(presented)) => state.sessions.verify_csrf(token, presented),
        _ => false,
    };

    if !valid {
        return Error::BadRequest {
            message: "Missing or invalid anti-forgery token".to_string(),
        }
        .into_response();
    }

    next.run(request).await
}

/// Validate the `x-csrf-token` header against the session's anti-forgery
/// token for every state-changing request in `routes`.
///
/// Layer this inside [`require_session`]/[`require_capability`]: it assumes
/// session enforcement, it does not replace it.
pub fn require_csrf(routes: Router, state: &AppState) -> Router {
    routes.layer(from_fn_with_state(state.clone(), enforce_csrf))
}
