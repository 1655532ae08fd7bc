//! # gatehouse: Session Authentication and Capability Gating
//!
//! `gatehouse` is the authentication-and-authorization decision core for an
//! Axum web application: it verifies presented credentials against an
//! external user store, establishes and invalidates server-side sessions
//! bound to verified identities, and evaluates named capabilities ("gates")
//! against role attributes to admit or reject actions.
//!
//! ## Overview
//!
//! CRUD applications that grow a sign-in form usually end up with the same
//! three questions scattered through their routing layer: is this credential
//! real, is there a session, and may this session do that? This crate
//! answers all three behind one narrow surface, so route handlers never
//! touch hashes, cookies, or role comparisons directly.
//!
//! The decision path for a protected request is deliberately two-staged:
//! authentication ("is there a valid session?") is checked before
//! authorization ("does the identity pass the required capability?"), because
//! the two failures have different remediations. An anonymous caller is
//! redirected to the sign-in form; an authenticated caller without the
//! capability gets a 403. The two outcomes are never conflated.
//!
//! ### Core Components
//!
//! The **credential verifier** ([`auth::verifier`]) checks an (identifier,
//! secret) pair against the Argon2 hash held by the external
//! [`store::UserStore`]. Unknown identifiers and wrong secrets are
//! indistinguishable in both the returned error and the time taken to
//! produce it.
//!
//! The **session manager** ([`auth::session`]) owns the server-side session
//! records: creation on successful verification (with a freshly generated
//! token, so a pre-login token can never be fixated into a post-login
//! session), resolution on every request, idempotent destruction on
//! sign-out, and rotation of the per-session anti-forgery token.
//!
//! The **gate registry** ([`auth::gates`]) holds named authorization
//! predicates, defined once at boot and evaluated everywhere. Evaluating a
//! name that was never defined is a configuration bug and fails loudly;
//! route binding validates names up front so the process refuses to start
//! with a dangling capability reference.
//!
//! The **access guard** ([`auth::guard`]) composes the two into the single
//! decision the routing layer branches on, and exposes the read-only
//! queries the rendering layer uses to show or hide affordances.
//!
//! ## Quick Start
//!
//! ```no_run
//! use clap::Parser;
//! use gatehouse::{Application, Config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let args = gatehouse::config::Args::parse();
//!     let config = Config::load(&args)?;
//!
//!     gatehouse::telemetry::init_telemetry()?;
//!
//!     let app = Application::new(config)?;
//!     app.serve(async {
//!         tokio::signal::ctrl_c().await.expect("Failed to listen for Ctrl+C");
//!     })
//!     .await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Protecting Application Routes
//!
//! The application's own router is wrapped per route group and merged in:
//!
//! ```ignore
//! use axum::{routing::get, Router};
//! use gatehouse::auth::middleware;
//!
//! let protected = middleware::require_capability(
//!     Router::new().route("/articles/{id}/edit", get(edit_article)),
//!     &state,
//!     "edit",
//! );
//! let router = gatehouse::build_router(&state, protected)?;
//! ```
//!
//! ## Configuration
//!
//! See the [`config`] module for configuration options, including the
//! `auth.capabilities` table that maps capability names to minimum roles.

pub mod api;
pub mod auth;
pub mod config;
pub mod errors;
mod openapi;
pub mod store;
pub mod telemetry;
pub mod types;

#[cfg(test)]
pub mod test_utils;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use bon::Builder;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{debug, info};
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};
use uuid::Uuid;

use crate::{
    auth::{
        gates::{GateRegistry, role_at_least},
        guard::AccessGuard,
        password::{self, Argon2Params},
        session::SessionManager,
        verifier::CredentialVerifier,
    },
    openapi::ApiDoc,
    store::{MemoryUserStore, UserRecord, UserStore},
};

pub use config::Config;
pub use errors::{Error, Result};
pub use types::{Identity, Role, UserId};

/// Application state shared across all request handlers.
///
/// Everything is passed by explicit handle: the guard receives its session
/// manager and gate registry at construction, and no component reaches into
/// ambient process state.
#[derive(Clone, Builder)]
pub struct AppState {
    pub config: Config,
    pub verifier: Arc<CredentialVerifier>,
    pub sessions: Arc<SessionManager>,
    pub gates: Arc<GateRegistry>,
    pub guard: AccessGuard,
}

impl AppState {
    /// Build state from configuration, a user store, and code-defined gates.
    ///
    /// The `auth.capabilities` table from the configuration is defined into
    /// `gates` as role-threshold predicates (last write wins), then the
    /// registry is frozen behind a shared handle.
    pub fn from_parts(config: Config, store: Arc<dyn UserStore>, mut gates: GateRegistry) -> Result<Self> {
        for (name, role) in &config.auth.capabilities {
            gates.define(name.clone(), role_at_least(*role));
        }

        let verifier = Arc::new(CredentialVerifier::with_params(store, Argon2Params::from(&config.auth.password))?);
        let sessions = Arc::new(SessionManager::new(config.auth.session.timeout));
        let gates = Arc::new(gates);
        let guard = AccessGuard::new(sessions.clone(), gates.clone());

        Ok(AppState::builder()
            .config(config)
            .verifier(verifier)
            .sessions(sessions)
            .gates(gates)
            .guard(guard)
            .build())
    }

    /// Build state with gates taken solely from the configuration table.
    pub fn from_store(config: Config, store: Arc<dyn UserStore>) -> Result<Self> {
        Self::from_parts(config, store, GateRegistry::new())
    }
}

/// Build the application router: authentication routes, the caller's
/// protected routes, API docs, and tracing middleware.
///
/// Every capability named in the configuration is validated against the gate
/// registry here, so a dangling reference aborts startup instead of
/// surfacing per-request.
pub fn build_router(state: &AppState, protected: Router) -> anyhow::Result<Router> {
    for name in state.config.auth.capabilities.keys() {
        state.gates.require(name)?;
    }

    let auth_routes = Router::new()
        .route(
            "/authentication/login",
            get(api::handlers::auth::get_login_info).post(api::handlers::auth::login),
        )
        .route("/authentication/logout", post(api::handlers::auth::logout))
        .route("/authentication/session", get(api::handlers::auth::get_session_info))
        .with_state(state.clone());

    Ok(Router::new()
        .merge(auth_routes)
        .merge(protected)
        .merge(Scalar::with_url("/docs", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http()))
}

/// Main application struct that owns the router and configuration.
///
/// # Lifecycle
///
/// 1. **Create**: [`Application::new`] seeds the reference user store from
///    configuration, wires the state, and builds the router (aborting on
///    dangling capability references)
/// 2. **Serve**: [`Application::serve`] binds a TCP port and handles
///    requests until the shutdown future resolves
pub struct Application {
    router: Router,
    state: AppState,
}

impl Application {
    /// Create an application backed by the in-memory reference store,
    /// seeded from `config.seed_users`.
    pub fn new(config: Config) -> anyhow::Result<Self> {
        debug!("Starting gatehouse with configuration: {:#?}", config);

        let store = Arc::new(MemoryUserStore::new());
        let params = Argon2Params::from(&config.auth.password);
        for seed in &config.seed_users {
            let password_hash = seed
                .password
                .as_deref()
                .map(|pwd| password::hash_string_with_params(pwd, Some(params)))
                .transpose()?;
            store.insert(UserRecord {
                id: Uuid::new_v4(),
                identifier: seed.identifier.clone(),
                display_name: seed.display_name.clone(),
                role: seed.role,
                password_hash,
            });
        }
        if !store.is_empty() {
            info!(users = store.len(), "seeded user store from configuration");
        }

        let state = AppState::from_store(config, store)?;
        Self::from_state(state, Router::new())
    }

    /// Create an application over pre-built state, merging the caller's
    /// protected routes into the router.
    pub fn from_state(state: AppState, protected: Router) -> anyhow::Result<Self> {
        let router = build_router(&state, protected)?;
        Ok(Self { router, state })
    }

    /// Convert application into a test server (for tests)
    #[cfg(test)]
    pub fn into_test_server(self) -> axum_test::TestServer {
        axum_test::TestServer::new(self.router).expect("Failed to create test server")
    }

    /// Start serving the application
    pub async fn serve<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let bind_addr = self.state.config.bind_address();
        let listener = TcpListener::bind(&bind_addr).await?;
        info!("gatehouse listening on http://{bind_addr}");

        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(shutdown)
            .await?;

        info!("Shutdown complete");
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::auth::middleware;
    use crate::test_utils::{TEST_PASSWORD, create_test_config, seeded_state, seeded_store, session_cookie_value};
    use axum::http::{StatusCode, header};
    use axum_test::TestServer;

    async fn edit_handler() -> &'static str {
        "editing"
    }

    /// A full application: auth routes plus one route behind the "edit"
    /// capability.
    fn scenario_app() -> (AppState, TestServer) {
        let state = seeded_state();
        let protected = middleware::require_capability(
            Router::new().route("/articles/edit", axum::routing::get(edit_handler)),
            &state,
            "edit",
        );
        let router = build_router(&state, protected).unwrap();
        (state, TestServer::new(router).unwrap())
    }

    async fn sign_in(server: &TestServer, state: &AppState, identifier: &str) -> String {
        let response = server
            .post("/authentication/login")
            .form(&crate::api::models::auth::LoginRequest {
                identifier: identifier.to_string(),
                password: TEST_PASSWORD.to_string(),
            })
            .await;
        response.assert_status(StatusCode::SEE_OTHER);
        session_cookie_value(&response, &state.config).expect("session cookie set")
    }

    fn cookie(state: &AppState, token: &str) -> String {
        format!("{}={}", state.config.auth.session.cookie_name, token)
    }

    #[tokio::test]
    async fn test_anonymous_request_is_redirected_to_sign_in_never_403() {
        let (state, server) = scenario_app();

        let response = server.get("/articles/edit").await;
        response.assert_status(StatusCode::SEE_OTHER);
        assert_eq!(
            response.headers().get(header::LOCATION).unwrap().to_str().unwrap(),
            state.config.auth.sign_in_path
        );
    }

    #[tokio::test]
    async fn test_standard_user_is_forbidden_on_edit_route() {
        let (state, server) = scenario_app();
        let token = sign_in(&server, &state, "standard@example.com").await;

        let response = server.get("/articles/edit").add_header(header::COOKIE, cookie(&state, &token)).await;
        response.assert_status(StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_privileged_user_passes_edit_route() {
        let (state, server) = scenario_app();
        let token = sign_in(&server, &state, "privileged@example.com").await;

        let response = server.get("/articles/edit").add_header(header::COOKIE, cookie(&state, &token)).await;
        response.assert_status_ok();
        response.assert_text("editing");
    }

    #[tokio::test]
    async fn test_sign_in_rotates_session_and_anti_forgery_tokens() {
        let (state, server) = scenario_app();

        // The client holds a token from before this sign-in
        let prior = state.sessions.create(crate::test_utils::standard_identity());
        let prior_csrf = prior.csrf_token.clone();

        let response = server
            .post("/authentication/login")
            .add_header(header::COOKIE, cookie(&state, &prior.token))
            .form(&crate::api::models::auth::LoginRequest {
                identifier: "standard@example.com".to_string(),
                password: TEST_PASSWORD.to_string(),
            })
            .await;
        response.assert_status(StatusCode::SEE_OTHER);

        let fresh = session_cookie_value(&response, &state.config).unwrap();
        assert_ne!(fresh, prior.token, "post-login token must differ from any pre-login token");
        assert!(state.sessions.resolve(&prior.token).is_none());

        let fresh_csrf = state.sessions.csrf_token(&fresh).unwrap();
        assert_ne!(fresh_csrf, prior_csrf, "anti-forgery token must change across sign-in");
    }

    #[tokio::test]
    async fn test_sign_out_returns_client_to_anonymous() {
        let (state, server) = scenario_app();
        let token = sign_in(&server, &state, "privileged@example.com").await;

        let response = server
            .post("/authentication/logout")
            .add_header(header::COOKIE, cookie(&state, &token))
            .await;
        response.assert_status(StatusCode::SEE_OTHER);

        // Back to anonymous: the protected route redirects again
        let response = server.get("/articles/edit").add_header(header::COOKIE, cookie(&state, &token)).await;
        response.assert_status(StatusCode::SEE_OTHER);
    }

    #[tokio::test]
    async fn test_build_router_rejects_config_capability_without_gate() {
        // State assembled by hand with an empty registry, bypassing the
        // config-table wiring in from_parts
        let config = create_test_config();
        let store = seeded_store(&config);
        let verifier = Arc::new(CredentialVerifier::with_params(store, crate::test_utils::fast_argon2_params()).unwrap());
        let sessions = Arc::new(SessionManager::new(config.auth.session.timeout));
        let gates = Arc::new(GateRegistry::new());
        let guard = AccessGuard::new(sessions.clone(), gates.clone());
        let state = AppState::builder()
            .config(config)
            .verifier(verifier)
            .sessions(sessions)
            .gates(gates)
            .guard(guard)
            .build();

        let error = build_router(&state, Router::new()).unwrap_err();
        assert!(error.to_string().contains("no registered predicate"));
    }

    #[tokio::test]
    async fn test_application_new_seeds_store_from_config() {
        let mut config = create_test_config();
        config.seed_users.push(crate::config::SeedUser {
            identifier: "seeded@example.com".to_string(),
            display_name: Some("Seeded".to_string()),
            role: Role::Privileged,
            password: Some(TEST_PASSWORD.to_string()),
        });

        let app = Application::new(config).unwrap();
        let state = app.state.clone();
        let server = app.into_test_server();

        let token = sign_in(&server, &state, "seeded@example.com").await;
        let identity = state.sessions.resolve(&token).unwrap();
        assert_eq!(identity.role, Role::Privileged);
        assert_eq!(identity.display_name.as_deref(), Some("Seeded"));
    }
}
