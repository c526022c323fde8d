//! Create `account` table.
//!
//! Uniqueness of email and username lives in named indexes (see add_indexes)
//! so violations can be told apart by constraint name.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Account::Table)
                    .if_not_exists()
                    .col(uuid(Account::Id).primary_key())
                    .col(string_len(Account::Email, 255).not_null())
                    .col(string_len(Account::Username, 64).not_null())
                    .col(string_len(Account::PasswordHash, 255).not_null())
                    .col(boolean(Account::EmailVerified).not_null().default(false))
                    .col(timestamp_with_time_zone(Account::CreatedAt).not_null())
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(Account::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum Account { Table, Id, Email, Username, PasswordHash, EmailVerified, CreatedAt }
