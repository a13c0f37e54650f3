use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;

/// A registered user of the tracker.
/// `debt` is the running total owed across all of the user's purchases and is
/// mutated only by the settlement engine.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub username: String,
    /// One-way hash of the password; verified, never decrypted.
    pub password_hash: String,
    pub avatar_url: Option<String>,
    /// Invariant: equals the sum of `purchase.debt` over the user's purchases.
    #[sea_orm(column_type = "Decimal(Some((16, 2)))")]
    pub debt: Decimal,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// A user can own multiple purchases.
    #[sea_orm(has_many = "super::purchase::Entity")]
    Purchase,
    /// Payments carry a denormalized reference back to their user.
    #[sea_orm(has_many = "super::payment::Entity")]
    Payment,
}

impl Related<super::purchase::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Purchase.def()
    }
}

impl Related<super::payment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Payment.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
