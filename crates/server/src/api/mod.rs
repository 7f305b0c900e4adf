//! HTTP surface.
//!
//! - `oauth2::endpoints` - grant endpoints (/oauth/*)
//! - `ticket` - ticket introspection and logout (/ticket/*)
//! - `health` - health check endpoint (/healthz)
//! - `openapi` - OpenAPI/Utoipa configuration (served at /api-docs)

pub mod auth;
pub mod health;
pub mod openapi;
pub mod ticket;

pub use health::MISC_TAG;
pub use ticket::TICKET_TAG;

use crate::AppResources;
use crate::oauth2::{self, OAuth2State};
use axum::Router;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_axum::{router::OpenApiRouter, routes};
use utoipa_redoc::{Redoc, Servable};

/// Assembles every route with its middleware and the API documentation.
pub fn build_router(resources: &AppResources) -> Router {
    let state = OAuth2State::new(resources);

    let (router, api) = OpenApiRouter::with_openapi(openapi::ApiDoc::openapi())
        .nest("/oauth", oauth2::router(state.clone()))
        .nest("/ticket", ticket::router(state))
        .routes(routes!(health::health))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .split_for_parts();

    router.merge(Redoc::with_url("/api-docs", api))
}

/// Starts the web server on the configured address.
#[tracing::instrument(skip(resources))]
pub async fn start_webserver(resources: AppResources) -> color_eyre::Result<()> {
    let router = build_router(&resources);

    let addr = format!(
        "{}:{}",
        resources.config.server.address, resources.config.server.port
    );
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "Server running");
    axum::serve(listener, router)
        .await
        .map_err(|e| color_eyre::Report::msg(format!("Failed to start server: {e}")))?;

    Ok(())
}
