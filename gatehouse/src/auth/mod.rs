//! Authentication and authorization core.
//!
//! This module is the decision core of the crate:
//!
//! - [`verifier`]: credential verification against the external user store
//! - [`session`]: server-side session lifecycle and anti-forgery tokens
//! - [`gates`]: named capability predicates, defined once at boot
//! - [`guard`]: the request-time decision composing sessions and gates
//! - [`middleware`]: route protection built on the guard
//! - [`current_user`]: extractor for the authenticated identity in handlers
//! - [`password`]: Argon2 hashing and random token generation
//!
//! # Flow
//!
//! Sign-in verifies the presented credential ([`verifier`]), establishes a
//! session with a freshly generated token ([`session`]), and rotates the
//! anti-forgery token. Every protected request then passes through
//! [`guard::AccessGuard::admit`], which checks authentication before
//! authorization: a missing session is always `DenyUnauthenticated`, and only
//! a valid session with an insufficient role yields `DenyForbidden`.
//!
//! # Usage in Handlers
//!
//! ```ignore
//! use gatehouse::auth::current_user::CurrentUser;
//!
//! async fn protected_handler(CurrentUser(identity): CurrentUser) -> String {
//!     format!("Hello, {}!", identity.identifier)
//! }
//! ```

pub mod current_user;
pub mod gates;
pub mod guard;
pub mod middleware;
pub mod password;
pub mod session;
pub mod verifier;
