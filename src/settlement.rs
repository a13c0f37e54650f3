//! Debt settlement engine: the two operations that mutate the ledger.
//!
//! `record_purchase` and `record_payment` each run inside one transaction and
//! keep three figures mutually consistent: the purchase's remaining `debt`,
//! the stored payment `amount`, and the owning user's aggregate `debt`.

use chrono::Utc;
use model::entities::purchase::PurchaseStatus;
use model::entities::{payment, purchase, user};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction, DbErr, EntityTrait,
    QueryFilter, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, instrument};
use utoipa::ToSchema;

/// Form payload for registering a purchase. Fields stay optional so that
/// presence is checked here with a field-level error rather than rejected by
/// the extractor.
#[derive(Debug, Default, Deserialize, Serialize, ToSchema)]
pub struct PurchaseForm {
    pub seller: Option<String>,
    pub item: Option<String>,
    pub description: Option<String>,
    /// "Pending" or "Cleared"
    pub status: Option<String>,
    /// Original amount, decimal string, must be positive
    pub price: Option<String>,
}

/// Form payload for applying a payment against a purchase.
#[derive(Debug, Default, Deserialize, Serialize, ToSchema)]
pub struct PaymentForm {
    pub purchase_id: Option<String>,
    /// Requested amount; the applied amount is clamped to the remaining debt
    pub amount: Option<String>,
}

#[derive(Debug, Error)]
pub enum SettlementError {
    #[error("missing or malformed field: {0}")]
    MissingField(&'static str),
    #[error("invalid purchase status: {0}")]
    InvalidStatus(String),
    #[error("no pending purchase with id {0}")]
    InvalidPurchase(i32),
    #[error("purchase {0} not found")]
    PurchaseNotFound(i32),
    #[error("user {0} not found")]
    UserNotFound(i32),
    #[error("storage error: {0}")]
    Storage(#[from] DbErr),
}

fn required(field: Option<String>, name: &'static str) -> Result<String, SettlementError> {
    match field {
        Some(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(SettlementError::MissingField(name)),
    }
}

/// Register a purchase for `user_id`.
///
/// A Pending purchase opens with `debt = price` and raises the user's
/// aggregate debt by the same amount; a Cleared purchase opens with zero debt
/// and leaves the user untouched. Purchase insert and user update commit in
/// one transaction.
#[instrument(skip(db, form))]
pub async fn record_purchase(
    db: &DatabaseConnection,
    user_id: i32,
    form: PurchaseForm,
) -> Result<purchase::Model, SettlementError> {
    let seller = required(form.seller, "seller")?;
    let item = required(form.item, "item")?;
    let status_raw = required(form.status, "status")?;
    let price_raw = required(form.price, "price")?;

    let price: Decimal = price_raw
        .trim()
        .parse()
        .map_err(|_| SettlementError::MissingField("price"))?;
    if price <= Decimal::ZERO {
        return Err(SettlementError::MissingField("price"));
    }
    let status: PurchaseStatus = status_raw
        .trim()
        .parse()
        .map_err(|_| SettlementError::InvalidStatus(status_raw.trim().to_string()))?;

    let debt = match status {
        PurchaseStatus::Pending => price,
        PurchaseStatus::Cleared => Decimal::ZERO,
    };

    let txn = db.begin().await?;

    let purchase_model = purchase::ActiveModel {
        seller: Set(seller),
        item: Set(item),
        description: Set(form.description.filter(|d| !d.trim().is_empty())),
        status: Set(status),
        price: Set(price),
        debt: Set(debt),
        date: Set(Utc::now()),
        user_id: Set(user_id),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    if status == PurchaseStatus::Pending {
        adjust_user_debt(&txn, user_id, price).await?;
    }

    txn.commit().await?;

    info!(
        "Purchase {} recorded for user {}: {} at {} ({})",
        purchase_model.id, user_id, purchase_model.item, purchase_model.price, status
    );
    Ok(purchase_model)
}

/// Apply a payment against a pending purchase owned by some user.
///
/// The requested amount is clamped to the purchase's remaining debt; the
/// stored payment reflects what was actually applied. Reaching exactly zero
/// debt flips the purchase to Cleared. Payment insert, purchase update and
/// user update commit atomically; an early return rolls all three back.
#[instrument(skip(db, form))]
pub async fn record_payment(
    db: &DatabaseConnection,
    user_id: i32,
    form: PaymentForm,
) -> Result<payment::Model, SettlementError> {
    let purchase_id: i32 = required(form.purchase_id, "purchase_id")?
        .trim()
        .parse()
        .map_err(|_| SettlementError::MissingField("purchase_id"))?;
    let requested: Decimal = required(form.amount, "amount")?
        .trim()
        .parse()
        .map_err(|_| SettlementError::MissingField("amount"))?;
    if requested <= Decimal::ZERO {
        return Err(SettlementError::MissingField("amount"));
    }

    let txn = db.begin().await?;

    // A payment only applies to a purchase that still carries debt. A miss
    // here covers both "already cleared" and "no such id" as one condition.
    let pending = purchase::Entity::find()
        .filter(purchase::Column::Id.eq(purchase_id))
        .filter(purchase::Column::Status.eq(PurchaseStatus::Pending))
        .one(&txn)
        .await?;
    if pending.is_none() {
        return Err(SettlementError::InvalidPurchase(purchase_id));
    }

    // Defensive re-fetch; cannot miss given the check above, kept as a guard
    // against the two lookups diverging.
    let purchase_model = purchase::Entity::find_by_id(purchase_id)
        .one(&txn)
        .await?
        .ok_or(SettlementError::PurchaseNotFound(purchase_id))?;

    let effective = requested.min(purchase_model.debt);
    if effective < requested {
        debug!(
            "Clamping requested payment {} to outstanding debt {}",
            requested, purchase_model.debt
        );
    }

    let remaining = purchase_model.debt - effective;
    let owner_id = purchase_model.user_id;

    let payment_model = payment::ActiveModel {
        amount: Set(effective),
        date: Set(Utc::now()),
        purchase_id: Set(purchase_model.id),
        user_id: Set(owner_id),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    let mut purchase_active: purchase::ActiveModel = purchase_model.into();
    purchase_active.debt = Set(remaining);
    // Exact zero; Decimal arithmetic makes the comparison safe.
    if remaining == Decimal::ZERO {
        purchase_active.status = Set(PurchaseStatus::Cleared);
    }
    purchase_active.update(&txn).await?;

    adjust_user_debt(&txn, owner_id, -effective).await?;

    txn.commit().await?;

    info!(
        "Payment {} of {} applied to purchase {} (session user {}, remaining debt {})",
        payment_model.id, effective, purchase_id, user_id, remaining
    );
    Ok(payment_model)
}

/// Shift a user's aggregate debt by `delta` inside the caller's transaction.
async fn adjust_user_debt(
    txn: &DatabaseTransaction,
    user_id: i32,
    delta: Decimal,
) -> Result<(), SettlementError> {
    let owner = user::Entity::find_by_id(user_id)
        .one(txn)
        .await?
        .ok_or(SettlementError::UserNotFound(user_id))?;

    let new_debt = owner.debt + delta;
    let mut owner_active: user::ActiveModel = owner.into();
    owner_active.debt = Set(new_debt);
    owner_active.update(txn).await?;
    Ok(())
}

/// Check ledger invariants for one user: the user's aggregate debt equals the
/// sum of purchase debts, each purchase's debt equals price minus its
/// payments, and status matches debt.
#[cfg(test)]
pub async fn assert_ledger_invariants(
    db: &impl sea_orm::ConnectionTrait,
    user_id: i32,
) -> Result<(), DbErr> {
    let owner = user::Entity::find_by_id(user_id)
        .one(db)
        .await?
        .expect("user exists");
    let purchases = purchase::Entity::find()
        .filter(purchase::Column::UserId.eq(user_id))
        .all(db)
        .await?;

    let mut total = Decimal::ZERO;
    for p in &purchases {
        let payments = payment::Entity::find()
            .filter(payment::Column::PurchaseId.eq(p.id))
            .all(db)
            .await?;
        let paid: Decimal = payments.iter().map(|pay| pay.amount).sum();

        assert_eq!(p.debt, p.price - paid, "purchase {} debt mismatch", p.id);
        assert!(p.debt >= Decimal::ZERO, "purchase {} debt negative", p.id);
        assert_eq!(
            p.status == PurchaseStatus::Cleared,
            p.debt == Decimal::ZERO,
            "purchase {} status out of step with debt",
            p.id
        );
        total += p.debt;
    }

    assert_eq!(owner.debt, total, "user {} aggregate debt mismatch", user_id);
    Ok(())
}
