use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
  async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager
      .create_table(
        Table::create()
          .table(CommissionSettings::Table)
          .if_not_exists()
          .col(
            ColumnDef::new(CommissionSettings::Key)
              .string()
              .not_null()
              .primary_key(),
          )
          .col(ColumnDef::new(CommissionSettings::Role).string().not_null())
          .col(ColumnDef::new(CommissionSettings::Kind).string().not_null())
          .col(
            ColumnDef::new(CommissionSettings::Percent).integer().not_null(),
          )
          .col(
            ColumnDef::new(CommissionSettings::Description).string().null(),
          )
          .to_owned(),
      )
      .await
  }

  async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager
      .drop_table(Table::drop().table(CommissionSettings::Table).to_owned())
      .await
  }
}

#[derive(DeriveIden)]
pub enum CommissionSettings {
  Table,
  Key,
  Role,
  Kind,
  Percent,
  Description,
}
