//! Create `password_reset_token` table with FK to `account`.
//!
//! Tokens are deleted together with their account. Earlier reset tokens are
//! not purged when a new one is issued.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(PasswordResetToken::Table)
                    .if_not_exists()
                    .col(uuid(PasswordResetToken::Id).primary_key())
                    .col(string_len(PasswordResetToken::Token, 128).unique_key().not_null())
                    .col(uuid(PasswordResetToken::AccountId).not_null())
                    .col(timestamp_with_time_zone(PasswordResetToken::ExpiresAt).not_null())
                    .col(boolean(PasswordResetToken::Used).not_null().default(false))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_password_reset_token_account")
                            .from(PasswordResetToken::Table, PasswordResetToken::AccountId)
                            .to(Account::Table, Account::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(PasswordResetToken::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum PasswordResetToken { Table, Id, Token, AccountId, ExpiresAt, Used }

#[derive(DeriveIden)]
enum Account { Table, Id }
