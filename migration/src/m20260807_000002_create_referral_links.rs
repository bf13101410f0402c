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
          .table(ReferralLinks::Table)
          .if_not_exists()
          .col(
            ColumnDef::new(ReferralLinks::Id)
              .integer()
              .not_null()
              .auto_increment()
              .primary_key(),
          )
          .col(ColumnDef::new(ReferralLinks::Code).string().not_null())
          .col(
            ColumnDef::new(ReferralLinks::UserId).big_integer().not_null(),
          )
          .col(
            ColumnDef::new(ReferralLinks::IsActive)
              .boolean()
              .not_null()
              .default(true),
          )
          .col(
            ColumnDef::new(ReferralLinks::ClickCount)
              .integer()
              .not_null()
              .default(0),
          )
          .col(
            ColumnDef::new(ReferralLinks::OrderCount)
              .integer()
              .not_null()
              .default(0),
          )
          .col(
            ColumnDef::new(ReferralLinks::Revenue)
              .big_integer()
              .not_null()
              .default(0),
          )
          .col(
            ColumnDef::new(ReferralLinks::CreatedAt).date_time().not_null(),
          )
          .foreign_key(
            ForeignKey::create()
              .name("fk_referral_links_user")
              .from(ReferralLinks::Table, ReferralLinks::UserId)
              .to(Users::Table, Users::Id)
              .on_delete(ForeignKeyAction::Cascade),
          )
          .to_owned(),
      )
      .await?;

    manager
      .create_index(
        Index::create()
          .name("idx_referral_links_code")
          .table(ReferralLinks::Table)
          .col(ReferralLinks::Code)
          .unique()
          .to_owned(),
      )
      .await?;

    manager
      .create_index(
        Index::create()
          .name("idx_referral_links_user")
          .table(ReferralLinks::Table)
          .col(ReferralLinks::UserId)
          .to_owned(),
      )
      .await
  }

  async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager
      .drop_table(Table::drop().table(ReferralLinks::Table).to_owned())
      .await
  }
}

#[derive(DeriveIden)]
pub enum ReferralLinks {
  Table,
  Id,
  Code,
  UserId,
  IsActive,
  ClickCount,
  OrderCount,
  Revenue,
  CreatedAt,
}
