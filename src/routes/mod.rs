#![allow(clippy::needless_for_each)]
mod misc_handlers;
mod session_handlers;
use crate::{auth::jwt_auth_middleware, middleware::apply_axum_middleware, state::AppState};
use axum::{Json, Router, middleware, routing::get};
use utoipa::OpenApi;
use utoipa_axum::{router::OpenApiRouter, routes};
use utoipa_scalar::{Scalar, Servable};

#[derive(OpenApi)]
#[openapi(
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "session", description = "Authenticated caller endpoints"),
    ),
    components(
        schemas(
            misc_handlers::Health,
            session_handlers::Identity,
        )
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                utoipa::openapi::security::SecurityScheme::Http(
                    utoipa::openapi::security::HttpBuilder::new()
                        .scheme(utoipa::openapi::security::HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    // Health endpoints (no auth required)
    let public_routes = OpenApiRouter::<AppState>::with_openapi(ApiDoc::openapi())
        .routes(routes!(misc_handlers::ping))
        .routes(routes!(misc_handlers::health));

    // route_layer only wraps routes registered before it
    let protected_routes = OpenApiRouter::<AppState>::new()
        .routes(routes!(session_handlers::me))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            jwt_auth_middleware,
        ));

    let (api_routes, mut openapi) = public_routes.merge(protected_routes).split_for_parts();

    openapi.paths.paths = openapi
        .paths
        .paths
        .into_iter()
        .map(|(path, item)| (format!("/api{path}"), item))
        .collect::<utoipa::openapi::path::PathsMap<_, _>>();

    let mut router = Router::new().nest("/api", api_routes);
    // API docs are only published in development
    if state.environment.is_development() {
        router = router
            .merge(Scalar::with_url("/api/scalar", openapi.clone()))
            .route("/api/openapi.json", get(|| async move { Json(openapi) }));
    }

    // Apply middleware
    apply_axum_middleware(router.with_state(state))
}
