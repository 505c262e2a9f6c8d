//! Combines the per-module API routers into the unified application router.

use axum::{routing::get, Json, Router};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::shared::models::ApiResponse;
use crate::shared::state::AppState;

async fn health() -> Json<ApiResponse<&'static str>> {
    Json(ApiResponse::success("ok"))
}

/// Configure all API routes from all modules
pub fn configure_api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(health))
        .merge(crate::tenancy::configure_tenancy_api_routes())
        .merge(crate::params::configure_params_api_routes())
        .merge(crate::contacts::configure_contacts_api_routes())
        .merge(crate::funnel::configure_funnel_api_routes())
        .merge(crate::onboarding::configure_onboarding_api_routes())
        .merge(crate::helpdesk::configure_helpdesk_api_routes())
}

/// Final router with shared state and the cross-cutting layers applied.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = crate::security::cors::create_cors_layer(&state.config);

    configure_api_routes()
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
