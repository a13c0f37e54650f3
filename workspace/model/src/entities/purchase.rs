use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;

use super::user;

/// Settlement state of a purchase.
/// Pending means unpaid debt remains; Cleared means the purchase is fully
/// paid off (`debt == 0`). The two are kept in lockstep by the settlement
/// engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(10))")]
pub enum PurchaseStatus {
    #[sea_orm(string_value = "Pending")]
    Pending,
    #[sea_orm(string_value = "Cleared")]
    Cleared,
}

impl fmt::Display for PurchaseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PurchaseStatus::Pending => write!(f, "Pending"),
            PurchaseStatus::Cleared => write!(f, "Cleared"),
        }
    }
}

impl FromStr for PurchaseStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(PurchaseStatus::Pending),
            "Cleared" => Ok(PurchaseStatus::Cleared),
            _ => Err(()),
        }
    }
}

/// A purchase owed to a seller.
/// `price` is the original amount and never changes; `debt` is the remaining
/// unpaid amount, with `0 <= debt <= price` at all times.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "purchases")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub seller: String,
    pub item: String,
    pub description: Option<String>,
    pub status: PurchaseStatus,
    #[sea_orm(column_type = "Decimal(Some((16, 2)))")]
    pub price: Decimal,
    #[sea_orm(column_type = "Decimal(Some((16, 2)))")]
    pub debt: Decimal,
    /// Creation timestamp, immutable after insert.
    pub date: DateTimeUtc,
    /// The user who owes this purchase.
    pub user_id: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// A purchase belongs to one user.
    #[sea_orm(
        belongs_to = "user::Entity",
        from = "Column::UserId",
        to = "user::Column::Id"
    )]
    User,
    /// A purchase accumulates payments until it is cleared.
    #[sea_orm(has_many = "super::payment::Entity")]
    Payment,
}

impl Related<user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::payment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Payment.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
