//! Axum route handlers.

pub mod auth;
