#![cfg(test)]
use std::sync::Arc;

use migration::MigratorTrait;
use sea_orm::DatabaseConnection;
use tokio::sync::OnceCell;

use configs::DatabaseConfig;
use models::db::connect_with_config;

// Ensure migrations run only once across the entire test process
static MIGRATED: OnceCell<bool> = OnceCell::const_new();

fn db_config() -> Option<DatabaseConfig> {
    if std::env::var("SKIP_DB_TESTS").is_ok() {
        return None;
    }
    let url = std::env::var("DATABASE_URL").ok()?;
    Some(DatabaseConfig { url, max_connections: 10, min_connections: 1, ..Default::default() })
}

/// A migrated connection, or `None` when this run has no database.
pub async fn get_db() -> Option<DatabaseConnection> {
    let cfg = db_config()?;
    let migrated = MIGRATED
        .get_or_init(|| async {
            let Ok(db) = connect_with_config(&cfg).await else { return false };
            migration::Migrator::up(&db, None).await.is_ok()
        })
        .await;
    if !*migrated {
        eprintln!("skip: database not reachable or migration failed");
        return None;
    }
    // fresh connection for the current test's runtime
    connect_with_config(&cfg).await.ok()
}

pub fn unique(tag: &str) -> (String, String) {
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    (format!("{tag}_{suffix}@example.com"), format!("{tag}_{}", &suffix[..12]))
}

pub fn recording() -> Arc<crate::auth::notify::mock::RecordingNotifier> {
    Arc::new(crate::auth::notify::mock::RecordingNotifier::default())
}

#[cfg(test)]
mod seaorm_repo_tests {
    use super::*;
    use crate::auth::domain::{
        Account, ForgotPasswordInput, LoginInput, RegisterInput, ResetPasswordInput, SingleUseToken, TokenPurpose,
        VerifyEmailInput,
    };
    use crate::auth::errors::{AuthError, ConflictReason};
    use crate::auth::password::Passwords;
    use crate::auth::repo::seaorm::SeaOrmAuthRepository;
    use crate::auth::repository::{AuthRepository, AuthTransaction, CredentialStore, TokenStore};
    use crate::auth::service::{AuthConfig, AuthService};
    use chrono::Utc;

    fn service(db: DatabaseConnection, mail: Arc<crate::auth::notify::mock::RecordingNotifier>) -> AuthService<SeaOrmAuthRepository> {
        let cfg = AuthConfig {
            jwt_secret: "db-test-secret".into(),
            access_ttl_secs: 3600,
            public_base_url: "http://localhost:8080".into(),
        };
        AuthService::new(Arc::new(SeaOrmAuthRepository::new(db)), mail, cfg)
            .unwrap()
            .with_passwords(Passwords::with_params(8, 1, 1).unwrap())
    }

    #[tokio::test]
    async fn save_account_inserts_then_updates() {
        let Some(db) = get_db().await else { return };
        let repo = SeaOrmAuthRepository::new(db);
        let (email, username) = unique("save");
        let acc = Account::register(email.clone(), username, "hash".into(), Utc::now());

        let mut tx = repo.begin().await.unwrap();
        tx.save_account(&acc).await.unwrap();
        tx.save_account(&acc.clone().verified()).await.unwrap();
        tx.commit().await.unwrap();

        let mut tx = repo.begin().await.unwrap();
        let loaded = tx.find_account_by_email(&email).await.unwrap().unwrap();
        assert_eq!(loaded.id(), acc.id());
        assert!(loaded.is_email_verified());
        assert!(tx.find_account_by_username("no-such-user-anywhere").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn duplicate_email_surfaces_as_conflict() {
        let Some(db) = get_db().await else { return };
        let repo = SeaOrmAuthRepository::new(db);
        let (email, username) = unique("dup");

        let mut tx = repo.begin().await.unwrap();
        tx.save_account(&Account::register(email.clone(), username, "hash".into(), Utc::now())).await.unwrap();
        tx.commit().await.unwrap();

        let (_, other_name) = unique("dup");
        let mut tx = repo.begin().await.unwrap();
        let e = tx.save_account(&Account::register(email, other_name, "hash".into(), Utc::now())).await.unwrap_err();
        assert!(matches!(e, AuthError::Conflict(ConflictReason::EmailTaken)));
    }

    #[tokio::test]
    async fn dropped_transaction_rolls_back() {
        let Some(db) = get_db().await else { return };
        let repo = SeaOrmAuthRepository::new(db);
        let (email, username) = unique("rollback");
        {
            let mut tx = repo.begin().await.unwrap();
            tx.save_account(&Account::register(email.clone(), username, "hash".into(), Utc::now())).await.unwrap();
        }
        let mut tx = repo.begin().await.unwrap();
        assert!(tx.find_account_by_email(&email).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn tokens_are_partitioned_and_consumed_once() {
        let Some(db) = get_db().await else { return };
        let repo = SeaOrmAuthRepository::new(db);
        let (email, username) = unique("tok");
        let acc = Account::register(email, username, "hash".into(), Utc::now());
        let tok = SingleUseToken::mint(TokenPurpose::EmailVerification, acc.id(), Utc::now());

        let mut tx = repo.begin().await.unwrap();
        tx.save_account(&acc).await.unwrap();
        tx.save_token(&tok).await.unwrap();
        tx.commit().await.unwrap();

        let mut tx = repo.begin().await.unwrap();
        assert!(tx.find_token(TokenPurpose::PasswordReset, tok.token()).await.unwrap().is_none());
        let found = tx.find_token(TokenPurpose::EmailVerification, tok.token()).await.unwrap().unwrap();
        assert_eq!(found.id(), tok.id());
        assert!(tx.consume_token(&found).await.unwrap());
        assert!(!tx.consume_token(&found).await.unwrap());
        assert_eq!(tx.delete_tokens_for_account(TokenPurpose::EmailVerification, acc.id()).await.unwrap(), 1);
        tx.commit().await.unwrap();
    }

    #[tokio::test]
    async fn full_flow_against_postgres() {
        let Some(db) = get_db().await else { return };
        let mail = recording();
        let svc = service(db, mail.clone());
        let (email, username) = unique("flow");

        svc.register(RegisterInput { email: email.clone(), username: username.clone(), password: "Passw0rd".into() })
            .await
            .unwrap();
        let token = mail.last_token_for(&email).unwrap();
        let session = svc.verify_email(VerifyEmailInput { token: token.clone() }).await.unwrap();
        assert_eq!(svc.issuer().verify(&session.access_token).unwrap(), session.account_id);
        assert!(matches!(svc.verify_email(VerifyEmailInput { token }).await, Err(AuthError::InvalidToken)));

        let attempts = mail.attempts();
        svc.forgot_password(ForgotPasswordInput { email: email.clone() }).await.unwrap();
        mail.wait_for_attempts(attempts + 1).await;
        let reset = mail.last_token_for(&email).unwrap();
        svc.reset_password(ResetPasswordInput { token: reset, new_password: "NewPass1".into() }).await.unwrap();
        assert!(matches!(
            svc.login(LoginInput { login: username.clone(), password: "Passw0rd".into() }).await,
            Err(AuthError::Unauthorized)
        ));
        svc.login(LoginInput { login: username, password: "NewPass1".into() }).await.unwrap();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_registration_hits_unique_index() {
        let Some(db) = get_db().await else { return };
        let svc = Arc::new(service(db, recording()));
        let (email, _) = unique("race");
        let mut handles = Vec::new();
        for _ in 0..4 {
            let svc = svc.clone();
            let email = email.clone();
            let (_, username) = unique("race");
            handles.push(tokio::spawn(async move {
                svc.register(RegisterInput { email, username, password: "Passw0rd".into() }).await
            }));
        }
        let mut ok = 0;
        for h in handles {
            match h.await.unwrap() {
                Ok(()) => ok += 1,
                Err(AuthError::Conflict(ConflictReason::EmailTaken)) => {}
                Err(e) => panic!("unexpected error: {e}"),
            }
        }
        assert_eq!(ok, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_registration_hits_username_index() {
        let Some(db) = get_db().await else { return };
        let svc = Arc::new(service(db, recording()));
        let (_, username) = unique("race_name");
        let mut handles = Vec::new();
        for _ in 0..4 {
            let svc = svc.clone();
            let username = username.clone();
            let (email, _) = unique("race_name");
            handles.push(tokio::spawn(async move {
                svc.register(RegisterInput { email, username, password: "Passw0rd".into() }).await
            }));
        }
        let mut ok = 0;
        let mut conflicts = 0;
        for h in handles {
            match h.await.unwrap() {
                Ok(()) => ok += 1,
                Err(AuthError::Conflict(ConflictReason::UsernameTaken)) => conflicts += 1,
                Err(e) => panic!("unexpected error: {e}"),
            }
        }
        assert_eq!((ok, conflicts), (1, 3));
    }

    #[tokio::test]
    async fn duplicate_username_surfaces_as_conflict() {
        let Some(db) = get_db().await else { return };
        let repo = SeaOrmAuthRepository::new(db);
        let (email, username) = unique("dupname");

        let mut tx = repo.begin().await.unwrap();
        tx.save_account(&Account::register(email, username.clone(), "hash".into(), Utc::now())).await.unwrap();
        tx.commit().await.unwrap();

        let (other_email, _) = unique("dupname");
        let mut tx = repo.begin().await.unwrap();
        let e = tx.save_account(&Account::register(other_email, username, "hash".into(), Utc::now())).await.unwrap_err();
        assert!(matches!(e, AuthError::Conflict(ConflictReason::UsernameTaken)));
    }
}
