//! Root for all SeaORM entity modules.
//! Three flat tables make up the ledger: users own purchases, purchases
//! accumulate payments. Relationships are expressed as explicit foreign-key
//! columns plus query filters rather than materialized back-references.

pub mod payment;
pub mod purchase;
pub mod user;

pub mod prelude {
    //! A prelude module for easy importing of all entities.
    pub use super::payment::Entity as Payment;
    pub use super::purchase::Entity as Purchase;
    pub use super::user::Entity as User;
}
