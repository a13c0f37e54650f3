use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Create users table
        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(pk_auto(Users::Id))
                    .col(string(Users::Username).unique_key())
                    .col(string(Users::PasswordHash))
                    .col(string_null(Users::AvatarUrl))
                    .col(decimal(Users::Debt).decimal_len(16, 2).default(0))
                    .to_owned(),
            )
            .await?;

        // Create purchases table
        manager
            .create_table(
                Table::create()
                    .table(Purchases::Table)
                    .if_not_exists()
                    .col(pk_auto(Purchases::Id))
                    .col(string(Purchases::Seller))
                    .col(string(Purchases::Item))
                    .col(string_null(Purchases::Description))
                    .col(string_len(Purchases::Status, 10))
                    .col(decimal(Purchases::Price).decimal_len(16, 2))
                    .col(decimal(Purchases::Debt).decimal_len(16, 2))
                    .col(timestamp_with_time_zone(Purchases::Date))
                    .col(integer(Purchases::UserId))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_purchase_user")
                            .from(Purchases::Table, Purchases::UserId)
                            .to(Users::Table, Users::Id)
                            // No cascading delete: rows are never deleted in scope.
                            .on_delete(ForeignKeyAction::Restrict)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Create payments table
        manager
            .create_table(
                Table::create()
                    .table(Payments::Table)
                    .if_not_exists()
                    .col(pk_auto(Payments::Id))
                    .col(decimal(Payments::Amount).decimal_len(16, 2))
                    .col(timestamp_with_time_zone(Payments::Date))
                    .col(integer(Payments::PurchaseId))
                    .col(integer(Payments::UserId))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_payment_purchase")
                            .from(Payments::Table, Payments::PurchaseId)
                            .to(Purchases::Table, Purchases::Id)
                            .on_delete(ForeignKeyAction::Restrict)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_payment_user")
                            .from(Payments::Table, Payments::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Restrict)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Payments::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Purchases::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Users::Table).to_owned())
            .await?;

        Ok(())
    }
}

// Define identifiers for all tables

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
    Username,
    PasswordHash,
    AvatarUrl,
    Debt,
}

#[derive(DeriveIden)]
enum Purchases {
    Table,
    Id,
    Seller,
    Item,
    Description,
    Status,
    Price,
    Debt,
    Date,
    UserId,
}

#[derive(DeriveIden)]
enum Payments {
    Table,
    Id,
    Amount,
    Date,
    PurchaseId,
    UserId,
}
