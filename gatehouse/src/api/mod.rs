//! API layer for HTTP request handling and data models.
//!
//! - **[`handlers`]**: Axum route handlers for sign-in, sign-out, and the
//!   rendering-layer session query
//! - **[`models`]**: Request/response data structures for API communication
//!
//! All endpoints are documented with OpenAPI annotations using `utoipa`;
//! the document is served at `/docs` when the server is running.

pub mod handlers;
pub mod models;
