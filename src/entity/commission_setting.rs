use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Keyed percent table, one row per `{role}_{kind}` key. Role spellings
/// in keys are always canonical (see `UserRole::canonical`).
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "commission_settings")]
pub struct Model {
  #[sea_orm(primary_key, auto_increment = false)]
  pub key: String,
  pub role: String,
  pub kind: String,
  pub percent: i32,
  pub description: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
