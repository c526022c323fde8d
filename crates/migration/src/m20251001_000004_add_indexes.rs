use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Account: email and username are each globally unique
        manager
            .create_index(
                Index::create()
                    .name("uniq_account_email")
                    .table(Account::Table)
                    .col(Account::Email)
                    .unique()
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("uniq_account_username")
                    .table(Account::Table)
                    .col(Account::Username)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Tokens: purge-by-account on resend, cascade on account delete
        manager
            .create_index(
                Index::create()
                    .name("idx_verification_token_account")
                    .table(VerificationToken::Table)
                    .col(VerificationToken::AccountId)
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("idx_password_reset_token_account")
                    .table(PasswordResetToken::Table)
                    .col(PasswordResetToken::AccountId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name("uniq_account_email").table(Account::Table).to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name("uniq_account_username").table(Account::Table).to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name("idx_verification_token_account").table(VerificationToken::Table).to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name("idx_password_reset_token_account").table(PasswordResetToken::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Account { Table, Email, Username }

#[derive(DeriveIden)]
enum VerificationToken { Table, AccountId }

#[derive(DeriveIden)]
enum PasswordResetToken { Table, AccountId }
