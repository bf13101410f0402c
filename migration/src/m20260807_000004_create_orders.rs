use sea_orm_migration::prelude::*;

use super::m20260807_000001_create_users::Users;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
  async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager
      .create_table(
        Table::create()
          .table(Orders::Table)
          .if_not_exists()
          .col(
            ColumnDef::new(Orders::Id)
              .big_integer()
              .not_null()
              .auto_increment()
              .primary_key(),
          )
          .col(ColumnDef::new(Orders::CustomerId).big_integer().null())
          .col(ColumnDef::new(Orders::TotalPrice).big_integer().not_null())
          .col(ColumnDef::new(Orders::ReferrerId).big_integer().null())
          .col(
            ColumnDef::new(Orders::Status)
              .string()
              .not_null()
              .default("pending"),
          )
          .col(ColumnDef::new(Orders::CreatedAt).date_time().not_null())
          .col(ColumnDef::new(Orders::UpdatedAt).date_time().not_null())
          .foreign_key(
            ForeignKey::create()
              .name("fk_orders_referrer")
              .from(Orders::Table, Orders::ReferrerId)
              .to(Users::Table, Users::Id)
              .on_delete(ForeignKeyAction::SetNull),
          )
          .to_owned(),
      )
      .await?;

    manager
      .create_index(
        Index::create()
          .name("idx_orders_referrer")
          .table(Orders::Table)
          .col(Orders::ReferrerId)
          .to_owned(),
      )
      .await
  }

  async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager.drop_table(Table::drop().table(Orders::Table).to_owned()).await
  }
}

#[derive(DeriveIden)]
pub enum Orders {
  Table,
  Id,
  CustomerId,
  TotalPrice,
  ReferrerId,
  Status,
  CreatedAt,
  UpdatedAt,
}
