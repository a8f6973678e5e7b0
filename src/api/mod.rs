pub mod handlers;
pub mod state;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::{
    compression::CompressionLayer,
    cors::CorsLayer,
    trace::TraceLayer,
};
use std::sync::Arc;

use crate::{
    config::Settings,
    service::ServiceContext,
};
use state::AppState;

pub fn create_app(service_context: Arc<ServiceContext>, settings: Arc<Settings>) -> Router {
    let app_state = AppState::new(service_context, settings);

    Router::new()
        // Root and health endpoints
        .route("/", get(handlers::root::root))
        .route("/health", get(handlers::root::health_check))
        .route("/api", get(handlers::root::api_info))

        // API routes
        .nest("/api", api_routes())

        // Add state to the router
        .with_state(app_state)

        // Middleware
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive()) // Configure properly for production
        .layer(TraceLayer::new_for_http())
}

fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/payments", payment_routes())
        .nest("/memberships", membership_routes())
}

fn payment_routes() -> Router<AppState> {
    Router::new()
        // Gateway callback endpoint (unauthenticated; the handler verifies
        // the notification against the gateway itself)
        .route("/webhook/gateway", post(handlers::payment_requests::gateway_webhook))
        .route("/", post(handlers::payment_requests::create))
        .route("/types", get(handlers::payment_requests::list_types))
        .route("/user/:user_id", get(handlers::payment_requests::list_by_user))
        .route("/:id/status", get(handlers::payment_requests::status))
        .route("/:id/confirm-cash", post(handlers::payment_requests::confirm_cash))
        .route("/:id/cancel", post(handlers::payment_requests::cancel))
        .route("/:id/checkout", post(handlers::payment_requests::checkout))
}

fn membership_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::memberships::list))
        .route("/validity/:user_id", get(handlers::memberships::validity))
        .route("/:id", get(handlers::memberships::get))
}
