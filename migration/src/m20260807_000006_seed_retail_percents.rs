use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
  async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    let db = manager.get_connection();

    db.execute_unprepared(
      "INSERT INTO commission_settings \
         (\"key\", role, kind, percent, description) \
       VALUES \
         ('ctv_retail', 'ctv', 'retail', 10, \
          'Retail commission for collaborators'), \
         ('agent_retail', 'agent', 'retail', 15, \
          'Retail commission for agents'), \
         ('distributor_retail', 'distributor', 'retail', 20, \
          'Retail commission for distributors')",
    )
    .await?;

    Ok(())
  }

  async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    let db = manager.get_connection();

    db.execute_unprepared(
      "DELETE FROM commission_settings WHERE \"key\" IN \
       ('ctv_retail', 'agent_retail', 'distributor_retail')",
    )
    .await?;

    Ok(())
  }
}
