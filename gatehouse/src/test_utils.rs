//! Shared constructors for tests.

use std::sync::Arc;

use uuid::Uuid;

use crate::{
    AppState,
    auth::{
        gates::GateRegistry,
        password::{self, Argon2Params},
    },
    config::Config,
    store::{MemoryUserStore, UserRecord},
    types::{Identity, Role},
};

/// Password shared by every seeded test user.
pub const TEST_PASSWORD: &str = "correct-horse-battery";

/// Argon2 parameters weak enough to keep tests fast.
pub fn fast_argon2_params() -> Argon2Params {
    Argon2Params {
        memory_kib: 1024,
        iterations: 1,
        parallelism: 1,
    }
}

pub fn create_test_config() -> Config {
    let mut config = Config::default();
    config.auth.session.cookie_secure = false;
    config.auth.password.argon2_memory_kib = 1024;
    config.auth.password.argon2_iterations = 1;
    config.auth.capabilities.insert("edit".to_string(), Role::Privileged);
    config.auth.capabilities.insert("view".to_string(), Role::Standard);
    config
}

pub fn standard_identity() -> Identity {
    Identity {
        id: Uuid::new_v4(),
        identifier: "standard@example.com".to_string(),
        display_name: Some("Standard User".to_string()),
        role: Role::Standard,
    }
}

pub fn privileged_identity() -> Identity {
    Identity {
        id: Uuid::new_v4(),
        identifier: "privileged@example.com".to_string(),
        display_name: Some("Privileged User".to_string()),
        role: Role::Privileged,
    }
}

/// A store holding one standard and one privileged user, both with
/// [`TEST_PASSWORD`].
pub fn seeded_store(config: &Config) -> Arc<MemoryUserStore> {
    let store = Arc::new(MemoryUserStore::new());
    let params = Argon2Params::from(&config.auth.password);
    for (identifier, role) in [
        ("standard@example.com", Role::Standard),
        ("privileged@example.com", Role::Privileged),
    ] {
        store.insert(UserRecord {
            id: Uuid::new_v4(),
            identifier: identifier.to_string(),
            display_name: None,
            role,
            password_hash: Some(password::hash_string_with_params(TEST_PASSWORD, Some(params)).unwrap()),
        });
    }
    store
}

/// Full application state over a seeded store and the test config's gates.
pub fn seeded_state() -> AppState {
    let config = create_test_config();
    let store = seeded_store(&config);
    AppState::from_parts(config, store, GateRegistry::new()).expect("build test app state")
}

/// The session token from a response's `Set-Cookie` header, if one was set.
pub fn session_cookie_value(response: &axum_test::TestResponse, config: &Config) -> Option<String> {
    let header = response.headers().get(axum::http::header::SET_COOKIE)?;
    let pair = header.to_str().ok()?.split(';').next()?;
    let (name, token) = pair.split_once('=')?;
    (name == config.auth.session.cookie_name && !token.is_empty()).then(|| token.to_string())
}
