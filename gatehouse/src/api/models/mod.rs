//! API request and response data models.
//!
//! API models are distinct from the store's record types so the HTTP
//! contract can evolve independently of what the user store holds.
//!
//! - [`auth`]: sign-in/sign-out payloads and the session query response

pub mod auth;
