use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;

use super::{purchase, user};

/// A payment applied against a purchase. Append-only: created once by the
/// settlement engine and never mutated afterwards. The stored `amount` is the
/// effective amount after clamping, not the requested one.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "payments")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(column_type = "Decimal(Some((16, 2)))")]
    pub amount: Decimal,
    /// Application timestamp, immutable after insert.
    pub date: DateTimeUtc,
    /// The purchase this payment settles against.
    pub purchase_id: i32,
    /// Denormalized owner reference so per-user payment listings do not need
    /// a join through purchases.
    pub user_id: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "purchase::Entity",
        from = "Column::PurchaseId",
        to = "purchase::Column::Id"
    )]
    Purchase,
    #[sea_orm(
        belongs_to = "user::Entity",
        from = "Column::UserId",
        to = "user::Column::Id"
    )]
    User,
}

impl Related<purchase::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Purchase.def()
    }
}

impl Related<user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
