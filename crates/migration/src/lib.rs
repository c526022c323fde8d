//! Migrator registering entity-specific migrations in dependency order.
//! Indexes are applied last.
pub use sea_orm_migration::prelude::*;

mod m20251001_000001_create_account;
mod m20251001_000002_create_verification_token;
mod m20251001_000003_create_password_reset_token;
mod m20251001_000004_add_indexes;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20251001_000001_create_account::Migration),
            Box::new(m20251001_000002_create_verification_token::Migration),
            Box::new(m20251001_000003_create_password_reset_token::Migration),
            // Indexes should always be applied last
            Box::new(m20251001_000004_add_indexes::Migration),
        ]
    }
}
