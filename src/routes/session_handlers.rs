use axum::{Extension, Json, debug_handler};
use serde::Serialize;
use utoipa::ToSchema;

use crate::auth::Claims;

/// Identity carried by the caller's bearer token
#[derive(ToSchema, Serialize)]
pub struct Identity {
    /// Absent when the token carries no `sub` claim
    pub subject: Option<String>,
    pub issuer: String,
    pub expires_at: u64,
}

/// Echo the authenticated caller
#[debug_handler]
#[utoipa::path(
    get,
    tag = "session",
    path = "/me",
    responses(
        (status = OK, description = "Token accepted", body = Identity),
        (status = UNAUTHORIZED, description = "Missing or invalid bearer token")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn me(Extension(claims): Extension<Claims>) -> Json<Identity> {
    Json(Identity {
        subject: claims.sub,
        issuer: claims.iss,
        expires_at: claims.exp,
    })
}
