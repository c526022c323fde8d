use migration::MigratorTrait;
use sea_orm::DatabaseConnection;



/// Token single-use and cascade tests
pub mod token_tests;

/// Connect and migrate, or `None` when no database is configured for this run.
pub(crate) async fn setup_test_db() -> Option<DatabaseConnection> {
    if std::env::var("SKIP_DB_TESTS").is_ok() || std::env::var("DATABASE_URL").is_err() {
        eprintln!("skip: no database configured");
        return None;
    }
    let db = match crate::db::connect().await {
        Ok(db) => db,
        Err(e) => {
            eprintln!("skip: cannot connect to db: {}", e);
            return None;
        }
    };
    if let Err(e) = migration::Migrator::up(&db, None).await {
        eprintln!("skip: migrate up failed: {}", e);
        return None;
    }
    Some(db)
}

pub(crate) fn sample_account(tag: &str) -> crate::account::Model {
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    crate::account::Model {
        id: uuid::Uuid::new_v4(),
        email: format!("{tag}_{suffix}@example.com"),
        username: format!("{tag}_{}", &suffix[..12]),
        password_hash: "$argon2id$v=19$m=1024,t=1,p=1$c2FsdA$aGFzaA".into(),
        email_verified: false,
        created_at: chrono::Utc::now().into(),
    }
}
