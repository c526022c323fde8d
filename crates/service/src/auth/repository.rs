use async_trait::async_trait;
use uuid::Uuid;

use super::domain::{Account, SingleUseToken, TokenPurpose};
use super::errors::AuthError;

/// Account persistence as seen from inside one unit of work. Misses are `Ok(None)`.
#[async_trait]
pub trait CredentialStore: Send {
    async fn find_account_by_id(&mut self, id: Uuid) -> Result<Option<Account>, AuthError>;
    async fn find_account_by_email(&mut self, email: &str) -> Result<Option<Account>, AuthError>;
    async fn find_account_by_username(&mut self, username: &str) -> Result<Option<Account>, AuthError>;
    /// Insert or update. A taken email or username is `AuthError::Conflict`,
    /// enforced by the store itself.
    async fn save_account(&mut self, account: &Account) -> Result<(), AuthError>;
}

/// Token persistence, partitioned by purpose.
#[async_trait]
pub trait TokenStore: Send {
    /// Exact match on the opaque token string within one purpose.
    async fn find_token(&mut self, purpose: TokenPurpose, token: &str) -> Result<Option<SingleUseToken>, AuthError>;
    async fn save_token(&mut self, token: &SingleUseToken) -> Result<(), AuthError>;
    /// Flip `used` only if it is still unset. `Ok(false)` means someone else got there first.
    async fn consume_token(&mut self, token: &SingleUseToken) -> Result<bool, AuthError>;
    async fn delete_tokens_for_account(&mut self, purpose: TokenPurpose, account_id: Uuid) -> Result<u64, AuthError>;
}

/// One atomic unit of work. Dropping it without `commit` rolls everything back.
#[async_trait]
pub trait AuthTransaction: CredentialStore + TokenStore {
    async fn commit(self) -> Result<(), AuthError>;
}

/// Repository abstraction for auth-related persistence.
#[async_trait]
pub trait AuthRepository: Send + Sync {
    type Tx: AuthTransaction + 'static;

    async fn begin(&self) -> Result<Self::Tx, AuthError>;
}

/// Simple in-memory mock repository for tests and doc examples
pub mod mock {
    use super::*;
    use crate::auth::errors::ConflictReason;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio::sync::{Mutex, OwnedMutexGuard};

    #[derive(Debug, Default, Clone)]
    struct MemState {
        accounts: HashMap<Uuid, Account>,
        tokens: HashMap<(TokenPurpose, String), SingleUseToken>,
    }

    /// Transactions are fully serialized: `begin` takes the store lock and a
    /// working copy, `commit` writes the copy back.
    #[derive(Default)]
    pub struct MockAuthRepository {
        state: Arc<Mutex<MemState>>,
        begun: AtomicUsize,
        fail_commits: AtomicBool,
    }

    pub struct MockTx {
        guard: OwnedMutexGuard<MemState>,
        work: MemState,
        fail_commit: bool,
    }

    impl MockAuthRepository {
        /// How many units of work have been opened.
        pub fn transactions_started(&self) -> usize {
            self.begun.load(Ordering::SeqCst)
        }

        /// While set, every commit fails and its writes are discarded.
        pub fn fail_commits(&self, fail: bool) {
            self.fail_commits.store(fail, Ordering::SeqCst);
        }

        pub async fn account_by_email(&self, email: &str) -> Option<Account> {
            self.state.lock().await.accounts.values().find(|a| a.email() == email).cloned()
        }

        pub async fn account_count(&self) -> usize {
            self.state.lock().await.accounts.len()
        }

        pub async fn tokens_for(&self, purpose: TokenPurpose, account_id: Uuid) -> Vec<SingleUseToken> {
            let st = self.state.lock().await;
            st.tokens
                .values()
                .filter(|t| t.purpose() == purpose && t.account_id() == account_id)
                .cloned()
                .collect()
        }

        pub async fn seed_account(&self, account: Account) {
            self.state.lock().await.accounts.insert(account.id(), account);
        }

        pub async fn seed_token(&self, token: SingleUseToken) {
            self.state.lock().await.tokens.insert((token.purpose(), token.token().to_string()), token);
        }
    }

    #[async_trait]
    impl AuthRepository for MockAuthRepository {
        type Tx = MockTx;

        async fn begin(&self) -> Result<MockTx, AuthError> {
            self.begun.fetch_add(1, Ordering::SeqCst);
            let guard = self.state.clone().lock_owned().await;
            let work = guard.clone();
            Ok(MockTx { guard, work, fail_commit: self.fail_commits.load(Ordering::SeqCst) })
        }
    }

    #[async_trait]
    impl CredentialStore for MockTx {
        async fn find_account_by_id(&mut self, id: Uuid) -> Result<Option<Account>, AuthError> {
            Ok(self.work.accounts.get(&id).cloned())
        }

        async fn find_account_by_email(&mut self, email: &str) -> Result<Option<Account>, AuthError> {
            Ok(self.work.accounts.values().find(|a| a.email() == email).cloned())
        }

        async fn find_account_by_username(&mut self, username: &str) -> Result<Option<Account>, AuthError> {
            Ok(self.work.accounts.values().find(|a| a.username() == username).cloned())
        }

        async fn save_account(&mut self, account: &Account) -> Result<(), AuthError> {
            for other in self.work.accounts.values().filter(|a| a.id() != account.id()) {
                if other.email() == account.email() {
                    return Err(AuthError::Conflict(ConflictReason::EmailTaken));
                }
                if other.username() == account.username() {
                    return Err(AuthError::Conflict(ConflictReason::UsernameTaken));
                }
            }
            self.work.accounts.insert(account.id(), account.clone());
            Ok(())
        }
    }

    #[async_trait]
    impl TokenStore for MockTx {
        async fn find_token(&mut self, purpose: TokenPurpose, token: &str) -> Result<Option<SingleUseToken>, AuthError> {
            Ok(self.work.tokens.get(&(purpose, token.to_string())).cloned())
        }

        async fn save_token(&mut self, token: &SingleUseToken) -> Result<(), AuthError> {
            if !self.work.accounts.contains_key(&token.account_id()) {
                return Err(AuthError::Repository("token references unknown account".into()));
            }
            self.work.tokens.insert((token.purpose(), token.token().to_string()), token.clone());
            Ok(())
        }

        async fn consume_token(&mut self, token: &SingleUseToken) -> Result<bool, AuthError> {
            match self.work.tokens.get_mut(&(token.purpose(), token.token().to_string())) {
                Some(t) if t.id() == token.id() && !t.is_used() => {
                    *t = t.clone().mark_used();
                    Ok(true)
                }
                _ => Ok(false),
            }
        }

        async fn delete_tokens_for_account(&mut self, purpose: TokenPurpose, account_id: Uuid) -> Result<u64, AuthError> {
            let before = self.work.tokens.len();
            self.work.tokens.retain(|(p, _), t| !(*p == purpose && t.account_id() == account_id));
            Ok((before - self.work.tokens.len()) as u64)
        }
    }

    #[async_trait]
    impl AuthTransaction for MockTx {
        async fn commit(mut self) -> Result<(), AuthError> {
            if self.fail_commit {
                return Err(AuthError::Repository("mock commit failure".into()));
            }
            *self.guard = self.work;
            Ok(())
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use chrono::Utc;

        fn account(email: &str, username: &str) -> Account {
            Account::register(email.into(), username.into(), "hash".into(), Utc::now())
        }

        #[tokio::test]
        async fn uncommitted_work_is_discarded() {
            let repo = MockAuthRepository::default();
            {
                let mut tx = repo.begin().await.unwrap();
                tx.save_account(&account("a@x.com", "alice")).await.unwrap();
            }
            assert_eq!(repo.account_count().await, 0);

            let mut tx = repo.begin().await.unwrap();
            tx.save_account(&account("a@x.com", "alice")).await.unwrap();
            tx.commit().await.unwrap();
            assert_eq!(repo.account_count().await, 1);
            assert_eq!(repo.transactions_started(), 2);
        }

        #[tokio::test]
        async fn uniqueness_is_enforced_on_save() {
            let repo = MockAuthRepository::default();
            let mut tx = repo.begin().await.unwrap();
            tx.save_account(&account("a@x.com", "alice")).await.unwrap();
            let e = tx.save_account(&account("a@x.com", "bob")).await.unwrap_err();
            assert!(matches!(e, AuthError::Conflict(ConflictReason::EmailTaken)));
            let e = tx.save_account(&account("b@x.com", "alice")).await.unwrap_err();
            assert!(matches!(e, AuthError::Conflict(ConflictReason::UsernameTaken)));
        }

        #[tokio::test]
        async fn consume_flips_once() {
            let repo = MockAuthRepository::default();
            let acc = account("a@x.com", "alice");
            repo.seed_account(acc.clone()).await;
            let tok = SingleUseToken::mint(TokenPurpose::EmailVerification, acc.id(), Utc::now());
            repo.seed_token(tok.clone()).await;

            let mut tx = repo.begin().await.unwrap();
            assert!(tx.consume_token(&tok).await.unwrap());
            assert!(!tx.consume_token(&tok).await.unwrap());
            // purposes are separate partitions
            assert!(tx.find_token(TokenPurpose::PasswordReset, tok.token()).await.unwrap().is_none());
        }
    }
}
