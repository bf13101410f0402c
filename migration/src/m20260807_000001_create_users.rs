use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
  async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager
      .create_table(
        Table::create()
          .table(Users::Table)
          .if_not_exists()
          .col(
            ColumnDef::new(Users::Id)
              .big_integer()
              .not_null()
              .auto_increment()
              .primary_key(),
          )
          .col(ColumnDef::new(Users::Name).string().not_null())
          .col(ColumnDef::new(Users::Email).string().not_null().unique_key())
          .col(
            ColumnDef::new(Users::Role)
              .string()
              .not_null()
              .default("customer"),
          )
          .col(
            ColumnDef::new(Users::Balance)
              .big_integer()
              .not_null()
              .default(0),
          )
          .col(ColumnDef::new(Users::ParentId).big_integer().null())
          .col(ColumnDef::new(Users::CreatedAt).date_time().not_null())
          .foreign_key(
            ForeignKey::create()
              .name("fk_users_parent")
              .from(Users::Table, Users::ParentId)
              .to(Users::Table, Users::Id)
              .on_delete(ForeignKeyAction::SetNull),
          )
          .to_owned(),
      )
      .await?;

    manager
      .create_index(
        Index::create()
          .name("idx_users_parent")
          .table(Users::Table)
          .col(Users::ParentId)
          .to_owned(),
      )
      .await
  }

  async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager.drop_table(Table::drop().table(Users::Table).to_owned()).await
  }
}

#[derive(DeriveIden)]
pub enum Users {
  Table,
  Id,
  Name,
  Email,
  Role,
  Balance,
  ParentId,
  CreatedAt,
}
