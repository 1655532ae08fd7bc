//! OpenAPI documentation assembly.

use utoipa::OpenApi;

use crate::api::models;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "gatehouse",
        description = "Session authentication and capability gating for Axum web applications"
    ),
    paths(
        crate::api::handlers::auth::get_login_info,
        crate::api::handlers::auth::login,
        crate::api::handlers::auth::logout,
        crate::api::handlers::auth::get_session_info,
    ),
    components(schemas(
        models::auth::LoginRequest,
        models::auth::LoginInfo,
        models::auth::SessionInfo,
        crate::types::Identity,
        crate::types::Role,
    )),
    tags(
        (name = "authentication", description = "Sign-in, sign-out, and session state")
    )
)]
pub struct ApiDoc;
