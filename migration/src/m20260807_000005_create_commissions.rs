use sea_orm_migration::prelude::*;

use super::{
  m20260807_000001_create_users::Users, m20260807_000004_create_orders::Orders,
};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
  async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager
      .create_table(
        Table::create()
          .table(Commissions::Table)
          .if_not_exists()
          .col(
            ColumnDef::new(Commissions::Id)
              .integer()
              .not_null()
              .auto_increment()
              .primary_key(),
          )
          .col(ColumnDef::new(Commissions::OrderId).big_integer().not_null())
          .col(ColumnDef::new(Commissions::UserId).big_integer().not_null())
          .col(ColumnDef::new(Commissions::Amount).big_integer().not_null())
          .col(ColumnDef::new(Commissions::Percent).integer().not_null())
          .col(ColumnDef::new(Commissions::Level).integer().not_null())
          .col(
            ColumnDef::new(Commissions::Status)
              .string()
              .not_null()
              .default("pending"),
          )
          .col(ColumnDef::new(Commissions::CreatedAt).date_time().not_null())
          .col(ColumnDef::new(Commissions::UpdatedAt).date_time().not_null())
          .foreign_key(
            ForeignKey::create()
              .name("fk_commissions_order")
              .from(Commissions::Table, Commissions::OrderId)
              .to(Orders::Table, Orders::Id)
              .on_delete(ForeignKeyAction::Cascade),
          )
          .foreign_key(
            ForeignKey::create()
              .name("fk_commissions_user")
              .from(Commissions::Table, Commissions::UserId)
              .to(Users::Table, Users::Id)
              .on_delete(ForeignKeyAction::Cascade),
          )
          .to_owned(),
      )
      .await?;

    // A recipient earns at most one commission per order and level; a
    // second concurrent writer fails here instead of double-crediting.
    manager
      .create_index(
        Index::create()
          .name("idx_commissions_order_user_level")
          .table(Commissions::Table)
          .col(Commissions::OrderId)
          .col(Commissions::UserId)
          .col(Commissions::Level)
          .unique()
          .to_owned(),
      )
      .await?;

    manager
      .create_index(
        Index::create()
          .name("idx_commissions_user")
          .table(Commissions::Table)
          .col(Commissions::UserId)
          .to_owned(),
      )
      .await
  }

  async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager
      .drop_table(Table::drop().table(Commissions::Table).to_owned())
      .await
  }
}

#[derive(DeriveIden)]
pub enum Commissions {
  Table,
  Id,
  OrderId,
  UserId,
  Amount,
  Percent,
  Level,
  Status,
  CreatedAt,
  UpdatedAt,
}
