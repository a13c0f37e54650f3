use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Redirect, Response},
};
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use utoipa::{OpenApi, ToSchema};

use crate::auth::SessionStore;
use crate::settlement::SettlementError;

/// Application state shared across handlers
#[derive(Clone, Debug)]
pub struct AppState {
    /// Database connection
    pub db: DatabaseConnection,
    /// Server-side session store, keyed by opaque token
    pub sessions: SessionStore,
}

/// API response wrapper
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiResponse<T> {
    /// Response data
    pub data: T,
    /// Response message
    pub message: String,
    /// Success status
    pub success: bool,
}

/// Error response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// Error message
    pub error: String,
    /// Error code
    pub code: String,
    /// Success status (always false for errors)
    pub success: bool,
}

/// Health check response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    /// Service status
    pub status: String,
    /// Service version
    pub version: String,
    /// Database connection status
    pub database: String,
}

/// Failure surface of the HTTP layer. Unauthenticated access produces a
/// redirect to the login page; everything else produces a status code with a
/// machine-readable body.
#[derive(Debug)]
pub enum ApiError {
    LoginRequired,
    Message(StatusCode, ErrorResponse),
}

impl ApiError {
    pub fn message(status: StatusCode, code: &str, error: impl Into<String>) -> Self {
        ApiError::Message(
            status,
            ErrorResponse {
                error: error.into(),
                code: code.to_string(),
                success: false,
            },
        )
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::LoginRequired => Redirect::to("/login").into_response(),
            ApiError::Message(status, body) => (status, Json(body)).into_response(),
        }
    }
}

impl From<SettlementError> for ApiError {
    fn from(err: SettlementError) -> Self {
        let (status, code) = match &err {
            SettlementError::MissingField(_) => (StatusCode::BAD_REQUEST, "MISSING_FIELD"),
            SettlementError::InvalidStatus(_) => (StatusCode::BAD_REQUEST, "INVALID_STATUS"),
            SettlementError::InvalidPurchase(_) => (StatusCode::BAD_REQUEST, "INVALID_PURCHASE"),
            SettlementError::PurchaseNotFound(_) => (StatusCode::NOT_FOUND, "PURCHASE_NOT_FOUND"),
            SettlementError::UserNotFound(_) => (StatusCode::NOT_FOUND, "USER_NOT_FOUND"),
            SettlementError::Storage(_) => (StatusCode::INTERNAL_SERVER_ERROR, "DATABASE_ERROR"),
        };
        ApiError::message(status, code, err.to_string())
    }
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::health::health_check,
        crate::handlers::auth::register,
        crate::handlers::auth::login,
        crate::handlers::auth::logout,
        crate::handlers::purchases::create_purchase,
        crate::handlers::purchases::list_purchases,
        crate::handlers::payments::create_payment,
        crate::handlers::payments::list_payments,
        crate::handlers::summary::summary,
    ),
    components(
        schemas(
            ApiResponse<crate::handlers::auth::IdentityResponse>,
            ApiResponse<crate::handlers::purchases::PurchaseResponse>,
            ApiResponse<crate::handlers::purchases::PurchaseListResponse>,
            ApiResponse<crate::handlers::payments::PaymentResponse>,
            ApiResponse<Vec<crate::handlers::payments::PaymentResponse>>,
            ApiResponse<crate::handlers::summary::SummaryResponse>,
            ErrorResponse,
            HealthResponse,
            crate::handlers::auth::RegisterForm,
            crate::handlers::auth::LoginForm,
            crate::handlers::auth::IdentityResponse,
            crate::handlers::purchases::PurchaseResponse,
            crate::handlers::purchases::PurchaseListResponse,
            crate::handlers::payments::PaymentResponse,
            crate::handlers::summary::SummaryResponse,
            crate::settlement::PurchaseForm,
            crate::settlement::PaymentForm,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "auth", description = "Registration, login and logout"),
        (name = "purchases", description = "Purchase registration and listing"),
        (name = "payments", description = "Payment settlement and listing"),
        (name = "summary", description = "Per-user balance summary"),
    ),
    info(
        title = "Debtbook API",
        description = "Purchase and payment debt tracker",
        version = "0.1.0",
    )
)]
pub struct ApiDoc;
