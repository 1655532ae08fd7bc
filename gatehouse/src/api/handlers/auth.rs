use axum::{Form, Json, extract::State, http::HeaderMap};

use crate::{
    AppState,
    api::models::auth::{LoginInfo, LoginRequest, LoginResponse, LogoutResponse, SessionInfo},
    auth::current_user::session_token_from_headers,
    config::Config,
    errors::Error,
};

/// Get sign-in flow information
#[utoipa::path(
    get,
    path = "/authentication/login",
    tag = "authentication",
    responses(
        (status = 200, description = "Sign-in info", body = LoginInfo),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn get_login_info(State(state): State<AppState>) -> Json<LoginInfo> {
    Json(LoginInfo {
        message: "Form sign-in is enabled".to_string(),
        sign_in_path: state.config.auth.sign_in_path.clone(),
        landing_path: state.config.auth.landing_path.clone(),
    })
}

/// Sign in with identifier and password
///
/// On success a fresh session token is issued (any session presented with the
/// request is destroyed first, so a pre-login token never survives sign-in),
/// the anti-forgery token is rotated, and the browser is redirected to the
/// landing page. On failure the browser is redirected back to the sign-in
/// form with no session side effects; the response never distinguishes an
/// unknown identifier from a wrong password.
#[utoipa::path(
    post,
    path = "/authentication/login",
    request_body(content = LoginRequest, content_type = "application/x-www-form-urlencoded"),
    tag = "authentication",
    responses(
        (status = 303, description = "Redirect: landing page on success, sign-in form on failure"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(request): Form<LoginRequest>,
) -> Result<LoginResponse, Error> {
    let prior_token = session_token_from_headers(&headers, &state.config.auth.session.cookie_name);

    let identity = match state.verifier.verify(&request.identifier, &request.password).await {
        Ok(identity) => identity,
        Err(Error::InvalidCredentials) => {
            // Back to the form, empty-handed. The generic failure message is
            // the rendering layer's concern.
            return Ok(LoginResponse {
                cookie: None,
                location: state.config.auth.sign_in_path.clone(),
            });
        }
        Err(e) => return Err(e),
    };

    // The pre-login token must never become the post-login token
    if let Some(token) = prior_token {
        state.sessions.destroy(&token);
    }

    let session = state.sessions.create(identity);
    state.sessions.rotate_csrf(&session.token);

    Ok(LoginResponse {
        cookie: Some(create_session_cookie(&session.token, &state.config)),
        location: state.config.auth.landing_path.clone(),
    })
}

/// Sign out (destroy session)
///
/// Rotates the anti-forgery token and destroys the session, so neither a
/// captured session token nor a captured anti-forgery token survives
/// sign-out. Idempotent: signing out without a session is still a redirect.
#[utoipa::path(
    post,
    path = "/authentication/logout",
    tag = "authentication",
    responses(
        (status = 303, description = "Redirect to the sign-in form"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> LogoutResponse {
    if let Some(token) = session_token_from_headers(&headers, &state.config.auth.session.cookie_name) {
        state.sessions.rotate_csrf(&token);
        state.sessions.destroy(&token);
    }

    LogoutResponse {
        cookie: clear_session_cookie(&state.config),
        location: state.config.auth.sign_in_path.clone(),
    }
}

/// Session state for the rendering layer
///
/// Read-only: templates use this to conditionally show navigation and action
/// affordances, and to embed the anti-forgery token in forms. Authoritative
/// enforcement is always the route-level admit call.
#[utoipa::path(
    get,
    path = "/authentication/session",
    tag = "authentication",
    responses(
        (status = 200, description = "Session state for this request", body = SessionInfo),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn get_session_info(State(state): State<AppState>, headers: HeaderMap) -> Json<SessionInfo> {
    let token = session_token_from_headers(&headers, &state.config.auth.session.cookie_name);

    let Some(identity) = state.guard.identity(token.as_deref()) else {
        return Json(SessionInfo::anonymous());
    };

    let capabilities = state.gates.evaluate_all(&identity);
    let csrf_token = token.as_deref().and_then(|t| state.sessions.csrf_token(t));

    Json(SessionInfo {
        authenticated: true,
        identity: Some(identity),
        capabilities,
        csrf_token,
    })
}

/// Helper function to create a session cookie
fn create_session_cookie(token: &str, config: &Config) -> String {
    let session_config = &config.auth.session;
    let mut cookie = format!(
        "{}={}; Path=/; HttpOnly; SameSite={}; Max-Age={}",
        session_config.cookie_name,
        token,
        session_config.cookie_same_site,
        session_config.timeout.as_secs()
    );
    if session_config.cookie_secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// Helper function to create an expired cookie that clears the session
fn clear_session_cookie(config: &Config) -> String {
    let session_config = &config.auth.session;
    let mut cookie = format!(
        "{}=; Path=/; HttpOnly; SameSite={}; Max-Age=0",
        session_config.cookie_name, session_config.cookie_same_site
    );
    if session_config.cookie_secure {
        cookie.push_str("; Secure");
    }
    cookie
}
