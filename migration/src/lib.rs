pub use sea_orm_migration::prelude::*;

mod m20260807_000001_create_users;
mod m20260807_000002_create_referral_links;
mod m20260807_000003_create_commission_settings;
mod m20260807_000004_create_orders;
mod m20260807_000005_create_commissions;
mod m20260807_000006_seed_retail_percents;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
  fn migrations() -> Vec<Box<dyn MigrationTrait>> {
    vec![
      Box::new(m20260807_000001_create_users::Migration),
      Box::new(m20260807_000002_create_referral_links::Migration),
      Box::new(m20260807_000003_create_commission_settings::Migration),
      Box::new(m20260807_000004_create_orders::Migration),
      Box::new(m20260807_000005_create_commissions::Migration),
      Box::new(m20260807_000006_seed_retail_percents::Migration),
    ]
  }
}
