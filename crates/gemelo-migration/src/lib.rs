//! Gemelo Migration - Database migrations
//!
//! One migration per domain, each applying the domain's table pattern
//! from `gemelo-persistence`.

pub use sea_orm_migration::prelude::*;

mod m20250301_000001_create_location_tables;
mod m20250301_000002_create_sensor_tables;
mod m20250301_000003_create_model_tables;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250301_000001_create_location_tables::Migration),
            Box::new(m20250301_000002_create_sensor_tables::Migration),
            Box::new(m20250301_000003_create_model_tables::Migration),
        ]
    }
}
