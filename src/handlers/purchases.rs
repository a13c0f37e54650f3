use axum::{
    extract::{Form, State},
    http::StatusCode,
    response::Json,
};
use axum_extra::extract::cookie::CookieJar;
use model::entities::purchase::{self, PurchaseStatus};
use rust_decimal::Decimal;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, instrument};
use utoipa::ToSchema;

use crate::auth::require_session;
use crate::helpers::format::{format_currency, format_timestamp};
use crate::schemas::{ApiError, ApiResponse, AppState};
use crate::settlement::{self, PurchaseForm};

/// Purchase response model
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PurchaseResponse {
    pub id: i32,
    pub seller: String,
    pub item: String,
    pub description: Option<String>,
    pub status: String,
    pub price: Decimal,
    pub debt: Decimal,
    pub price_display: String,
    pub debt_display: String,
    /// Creation timestamp, sub-second precision stripped
    pub date: String,
}

impl From<purchase::Model> for PurchaseResponse {
    fn from(model: purchase::Model) -> Self {
        Self {
            id: model.id,
            seller: model.seller,
            item: model.item,
            description: model.description,
            status: model.status.to_string(),
            price: model.price,
            debt: model.debt,
            price_display: format_currency(model.price),
            debt_display: format_currency(model.debt),
            date: format_timestamp(model.date),
        }
    }
}

/// Purchases grouped by settlement state, each newest first
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PurchaseListResponse {
    pub pending: Vec<PurchaseResponse>,
    pub cleared: Vec<PurchaseResponse>,
}

/// Register a purchase for the session user
#[utoipa::path(
    post,
    path = "/purchase",
    tag = "purchases",
    request_body(content = PurchaseForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 201, description = "Purchase recorded", body = ApiResponse<PurchaseResponse>),
        (status = 303, description = "No session, redirect to login"),
        (status = 400, description = "Missing field or invalid status", body = crate::schemas::ErrorResponse)
    )
)]
#[instrument(skip(state, jar, form))]
pub async fn create_purchase(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<PurchaseForm>,
) -> Result<(StatusCode, Json<ApiResponse<PurchaseResponse>>), ApiError> {
    let identity = require_session(&state, &jar).await?;
    debug!("Recording purchase for user {}", identity.user_id);

    let purchase_model = settlement::record_purchase(&state.db, identity.user_id, form).await?;

    info!(
        "Purchase {} recorded via API for user {}",
        purchase_model.id, identity.user_id
    );
    let response = ApiResponse {
        data: PurchaseResponse::from(purchase_model),
        message: "Purchase recorded successfully".to_string(),
        success: true,
    };
    Ok((StatusCode::CREATED, Json(response)))
}

/// List the session user's purchases, split by status
#[utoipa::path(
    get,
    path = "/purchases",
    tag = "purchases",
    responses(
        (status = 200, description = "Purchases retrieved", body = ApiResponse<PurchaseListResponse>),
        (status = 303, description = "No session, redirect to login")
    )
)]
#[instrument(skip(state, jar))]
pub async fn list_purchases(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<Json<ApiResponse<PurchaseListResponse>>, ApiError> {
    let identity = require_session(&state, &jar).await?;

    let purchases = purchase::Entity::find()
        .filter(purchase::Column::UserId.eq(identity.user_id))
        .order_by_desc(purchase::Column::Date)
        .all(&state.db)
        .await
        .map_err(|db_error| {
            error!(
                "Failed to list purchases for user {}: {}",
                identity.user_id, db_error
            );
            ApiError::message(
                StatusCode::INTERNAL_SERVER_ERROR,
                "DATABASE_ERROR",
                "internal server error while listing purchases",
            )
        })?;

    debug!(
        "Retrieved {} purchases for user {}",
        purchases.len(),
        identity.user_id
    );

    let (pending, cleared): (Vec<_>, Vec<_>) = purchases
        .into_iter()
        .partition(|p| p.status == PurchaseStatus::Pending);

    let response = ApiResponse {
        data: PurchaseListResponse {
            pending: pending.into_iter().map(PurchaseResponse::from).collect(),
            cleared: cleared.into_iter().map(PurchaseResponse::from).collect(),
        },
        message: "Purchases retrieved successfully".to_string(),
        success: true,
    };
    Ok(Json(response))
}
