//! Create `verification_token` table with FK to `account`.
//!
//! Tokens are deleted together with their account.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(VerificationToken::Table)
                    .if_not_exists()
                    .col(uuid(VerificationToken::Id).primary_key())
                    .col(string_len(VerificationToken::Token, 128).unique_key().not_null())
                    .col(uuid(VerificationToken::AccountId).not_null())
                    .col(timestamp_with_time_zone(VerificationToken::ExpiresAt).not_null())
                    .col(boolean(VerificationToken::Used).not_null().default(false))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_verification_token_account")
                            .from(VerificationToken::Table, VerificationToken::AccountId)
                            .to(Account::Table, Account::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(VerificationToken::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum VerificationToken { Table, Id, Token, AccountId, ExpiresAt, Used }

#[derive(DeriveIden)]
enum Account { Table, Id }
