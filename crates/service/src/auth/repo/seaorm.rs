use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{DatabaseConnection, DatabaseTransaction, TransactionTrait};
use uuid::Uuid;

use models::{account, password_reset_token, verification_token};

use crate::auth::domain::{Account, SingleUseToken, TokenPurpose};
use crate::auth::errors::AuthError;
use crate::auth::repository::{AuthRepository, AuthTransaction, CredentialStore, TokenStore};

pub struct SeaOrmAuthRepository {
    pub db: DatabaseConnection,
}

impl SeaOrmAuthRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

/// Wraps a database transaction; sea-orm rolls it back on drop.
pub struct SeaOrmAuthTx {
    txn: DatabaseTransaction,
}

#[async_trait]
impl AuthRepository for SeaOrmAuthRepository {
    type Tx = SeaOrmAuthTx;

    async fn begin(&self) -> Result<SeaOrmAuthTx, AuthError> {
        let txn = self.db.begin().await?;
        Ok(SeaOrmAuthTx { txn })
    }
}

fn to_account(m: account::Model) -> Account {
    Account::from_parts(m.id, m.email, m.username, m.password_hash, m.email_verified, m.created_at.with_timezone(&Utc))
}

fn from_account(a: &Account) -> account::Model {
    account::Model {
        id: a.id(),
        email: a.email().to_string(),
        username: a.username().to_string(),
        password_hash: a.password_hash().to_string(),
        email_verified: a.is_email_verified(),
        created_at: a.created_at().fixed_offset(),
    }
}

#[async_trait]
impl CredentialStore for SeaOrmAuthTx {
    async fn find_account_by_id(&mut self, id: Uuid) -> Result<Option<Account>, AuthError> {
        Ok(account::find_by_id(&self.txn, id).await?.map(to_account))
    }

    async fn find_account_by_email(&mut self, email: &str) -> Result<Option<Account>, AuthError> {
        Ok(account::find_by_email(&self.txn, email).await?.map(to_account))
    }

    async fn find_account_by_username(&mut self, username: &str) -> Result<Option<Account>, AuthError> {
        Ok(account::find_by_username(&self.txn, username).await?.map(to_account))
    }

    async fn save_account(&mut self, acc: &Account) -> Result<(), AuthError> {
        let model = from_account(acc);
        if account::find_by_id(&self.txn, acc.id()).await?.is_some() {
            account::update(&self.txn, model).await?;
        } else {
            account::insert(&self.txn, model).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl TokenStore for SeaOrmAuthTx {
    async fn find_token(&mut self, purpose: TokenPurpose, token: &str) -> Result<Option<SingleUseToken>, AuthError> {
        let found = match purpose {
            TokenPurpose::EmailVerification => verification_token::find_by_token(&self.txn, token)
                .await?
                .map(|m| (m.id, m.token, m.account_id, m.expires_at, m.used)),
            TokenPurpose::PasswordReset => password_reset_token::find_by_token(&self.txn, token)
                .await?
                .map(|m| (m.id, m.token, m.account_id, m.expires_at, m.used)),
        };
        Ok(found.map(|(id, token, account_id, expires_at, used)| {
            SingleUseToken::from_parts(id, token, account_id, purpose, expires_at.with_timezone(&Utc), used)
        }))
    }

    async fn save_token(&mut self, t: &SingleUseToken) -> Result<(), AuthError> {
        let expires_at = t.expires_at().fixed_offset();
        match t.purpose() {
            TokenPurpose::EmailVerification => {
                let model = verification_token::Model {
                    id: t.id(),
                    token: t.token().to_string(),
                    account_id: t.account_id(),
                    expires_at,
                    used: t.is_used(),
                };
                verification_token::insert(&self.txn, model).await?;
            }
            TokenPurpose::PasswordReset => {
                let model = password_reset_token::Model {
                    id: t.id(),
                    token: t.token().to_string(),
                    account_id: t.account_id(),
                    expires_at,
                    used: t.is_used(),
                };
                password_reset_token::insert(&self.txn, model).await?;
            }
        }
        Ok(())
    }

    async fn consume_token(&mut self, t: &SingleUseToken) -> Result<bool, AuthError> {
        let flipped = match t.purpose() {
            TokenPurpose::EmailVerification => verification_token::mark_used(&self.txn, t.id()).await?,
            TokenPurpose::PasswordReset => password_reset_token::mark_used(&self.txn, t.id()).await?,
        };
        Ok(flipped)
    }

    async fn delete_tokens_for_account(&mut self, purpose: TokenPurpose, account_id: Uuid) -> Result<u64, AuthError> {
        let n = match purpose {
            TokenPurpose::EmailVerification => verification_token::delete_all_for_account(&self.txn, account_id).await?,
            TokenPurpose::PasswordReset => password_reset_token::delete_all_for_account(&self.txn, account_id).await?,
        };
        Ok(n)
    }
}

#[async_trait]
impl AuthTransaction for SeaOrmAuthTx {
    async fn commit(self) -> Result<(), AuthError> {
        self.txn.commit().await?;
        Ok(())
    }
}
