use sea_orm_migration::prelude::*;

use gemelo_persistence::ddl;
use gemelo_persistence::domain::SENSORS;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let statements = ddl::create_statements(&SENSORS);
        for table in statements.tables {
            manager.create_table(table).await?;
        }
        for index in statements.indexes {
            manager.create_index(index).await?;
        }
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        for table in ddl::drop_statements(&SENSORS) {
            manager.drop_table(table).await?;
        }
        Ok(())
    }
}
