use std::time::Duration;

use axum::{
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer, cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::handlers::{
    auth::{login, logout, register},
    health::health_check,
    payments::{create_payment, list_payments},
    purchases::{create_purchase, list_purchases},
    summary::summary,
};
use crate::schemas::{ApiDoc, AppState};

/// Create application router with all routes and middleware
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health_check))
        // Session gate routes
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", get(logout))
        // Settlement routes
        .route("/purchase", post(create_purchase))
        .route("/purchases", get(list_purchases))
        .route("/payment", post(create_payment))
        .route("/payments", get(list_payments))
        // Summary
        .route("/", get(summary))
        // Swagger UI
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // Add middleware
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CompressionLayer::new())
                .layer(TimeoutLayer::new(Duration::from_secs(30)))
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}
