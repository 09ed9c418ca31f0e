//! Shared test database setup
//!
//! Integration tests run against in-memory SQLite with the full
//! per-domain layout applied through the migration crate.

use gemelo_migration::{Migrator, MigratorTrait};
use sea_orm::{ConnectOptions, Database, DatabaseConnection};

pub async fn setup() -> DatabaseConnection {
    let mut options = ConnectOptions::new("sqlite::memory:");
    // a single pooled connection so every statement sees the same
    // in-memory database
    options.max_connections(1);
    let db = Database::connect(options)
        .await
        .expect("connect test database");
    Migrator::up(&db, None).await.expect("apply migrations");
    db
}
