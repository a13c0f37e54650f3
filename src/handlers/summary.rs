use axum::{extract::State, http::StatusCode, response::Json};
use axum_extra::extract::cookie::CookieJar;
use model::entities::purchase::{self, PurchaseStatus};
use model::entities::{payment, user};
use rust_decimal::Decimal;
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, instrument};
use utoipa::ToSchema;

use crate::auth::require_session;
use crate::handlers::purchases::PurchaseResponse;
use crate::helpers::format::format_currency;
use crate::schemas::{ApiError, ApiResponse, AppState};

/// Per-user balance summary: totals plus the split purchase listing.
/// Read-only; every figure is derived from the ledger at request time.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SummaryResponse {
    pub username: String,
    pub avatar_url: Option<String>,
    pub purchase_count: u64,
    pub payment_count: u64,
    pub total_purchased: Decimal,
    pub total_purchased_display: String,
    pub outstanding_debt: Decimal,
    pub outstanding_debt_display: String,
    pub pending: Vec<PurchaseResponse>,
    pub cleared: Vec<PurchaseResponse>,
}

fn storage_error(context: &str, db_error: sea_orm::DbErr) -> ApiError {
    error!("Summary query failed ({}): {}", context, db_error);
    ApiError::message(
        StatusCode::INTERNAL_SERVER_ERROR,
        "DATABASE_ERROR",
        "internal server error while building summary",
    )
}

/// Render the session user's summary
#[utoipa::path(
    get,
    path = "/",
    tag = "summary",
    responses(
        (status = 200, description = "Summary retrieved", body = ApiResponse<SummaryResponse>),
        (status = 303, description = "No session, redirect to login"),
        (status = 404, description = "Session user no longer exists", body = crate::schemas::ErrorResponse)
    )
)]
#[instrument(skip(state, jar))]
pub async fn summary(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<Json<ApiResponse<SummaryResponse>>, ApiError> {
    let identity = require_session(&state, &jar).await?;

    let user_model = user::Entity::find_by_id(identity.user_id)
        .one(&state.db)
        .await
        .map_err(|e| storage_error("user", e))?
        .ok_or_else(|| {
            ApiError::message(
                StatusCode::NOT_FOUND,
                "USER_NOT_FOUND",
                "session user no longer exists",
            )
        })?;

    let purchases = purchase::Entity::find()
        .filter(purchase::Column::UserId.eq(identity.user_id))
        .order_by_desc(purchase::Column::Date)
        .all(&state.db)
        .await
        .map_err(|e| storage_error("purchases", e))?;

    let payment_count = payment::Entity::find()
        .filter(payment::Column::UserId.eq(identity.user_id))
        .count(&state.db)
        .await
        .map_err(|e| storage_error("payments", e))?;

    let purchase_count = purchases.len() as u64;
    let total_purchased: Decimal = purchases.iter().map(|p| p.price).sum();

    debug!(
        "Summary for user {}: {} purchases, {} payments, debt {}",
        identity.user_id, purchase_count, payment_count, user_model.debt
    );

    let (pending, cleared): (Vec<_>, Vec<_>) = purchases
        .into_iter()
        .partition(|p| p.status == PurchaseStatus::Pending);

    let response = ApiResponse {
        data: SummaryResponse {
            username: user_model.username,
            avatar_url: user_model.avatar_url,
            purchase_count,
            payment_count,
            total_purchased,
            total_purchased_display: format_currency(total_purchased),
            outstanding_debt: user_model.debt,
            outstanding_debt_display: format_currency(user_model.debt),
            pending: pending.into_iter().map(PurchaseResponse::from).collect(),
            cleared: cleared.into_iter().map(PurchaseResponse::from).collect(),
        },
        message: "Summary retrieved successfully".to_string(),
        success: true,
    };
    Ok(Json(response))
}
