use axum::{
    extract::{Form, State},
    http::StatusCode,
    response::Json,
};
use axum_extra::extract::cookie::CookieJar;
use model::entities::payment;
use rust_decimal::Decimal;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, instrument};
use utoipa::ToSchema;

use crate::auth::require_session;
use crate::helpers::format::{format_currency, format_timestamp};
use crate::schemas::{ApiError, ApiResponse, AppState};
use crate::settlement::{self, PaymentForm};

/// Payment response model
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PaymentResponse {
    pub id: i32,
    /// The applied amount after clamping
    pub amount: Decimal,
    pub amount_display: String,
    /// Application timestamp, sub-second precision stripped
    pub date: String,
    pub purchase_id: i32,
}

impl From<payment::Model> for PaymentResponse {
    fn from(model: payment::Model) -> Self {
        Self {
            id: model.id,
            amount: model.amount,
            amount_display: format_currency(model.amount),
            date: format_timestamp(model.date),
            purchase_id: model.purchase_id,
        }
    }
}

/// Apply a payment against one of the session user's pending purchases
#[utoipa::path(
    post,
    path = "/payment",
    tag = "payments",
    request_body(content = PaymentForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 201, description = "Payment applied", body = ApiResponse<PaymentResponse>),
        (status = 303, description = "No session, redirect to login"),
        (status = 400, description = "Missing field or no pending purchase with that id", body = crate::schemas::ErrorResponse)
    )
)]
#[instrument(skip(state, jar, form))]
pub async fn create_payment(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<PaymentForm>,
) -> Result<(StatusCode, Json<ApiResponse<PaymentResponse>>), ApiError> {
    let identity = require_session(&state, &jar).await?;
    debug!("Applying payment for user {}", identity.user_id);

    let payment_model = settlement::record_payment(&state.db, identity.user_id, form).await?;

    info!(
        "Payment {} applied via API for user {}",
        payment_model.id, identity.user_id
    );
    let response = ApiResponse {
        data: PaymentResponse::from(payment_model),
        message: "Payment applied successfully".to_string(),
        success: true,
    };
    Ok((StatusCode::CREATED, Json(response)))
}

/// List the session user's payments, newest first
#[utoipa::path(
    get,
    path = "/payments",
    tag = "payments",
    responses(
        (status = 200, description = "Payments retrieved", body = ApiResponse<Vec<PaymentResponse>>),
        (status = 303, description = "No session, redirect to login")
    )
)]
#[instrument(skip(state, jar))]
pub async fn list_payments(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<Json<ApiResponse<Vec<PaymentResponse>>>, ApiError> {
    let identity = require_session(&state, &jar).await?;

    let payments = payment::Entity::find()
        .filter(payment::Column::UserId.eq(identity.user_id))
        .order_by_desc(payment::Column::Date)
        .all(&state.db)
        .await
        .map_err(|db_error| {
            error!(
                "Failed to list payments for user {}: {}",
                identity.user_id, db_error
            );
            ApiError::message(
                StatusCode::INTERNAL_SERVER_ERROR,
                "DATABASE_ERROR",
                "internal server error while listing payments",
            )
        })?;

    debug!(
        "Retrieved {} payments for user {}",
        payments.len(),
        identity.user_id
    );

    let response = ApiResponse {
        data: payments.into_iter().map(PaymentResponse::from).collect(),
        message: "Payments retrieved successfully".to_string(),
        success: true,
    };
    Ok(Json(response))
}
