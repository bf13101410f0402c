use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::{commission, referral_link};

#[derive(Debug, Default, Clone, PartialEq, Eq)]
#[derive(EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
  #[sea_orm(string_value = "admin")]
  Admin,
  #[sea_orm(string_value = "master_agent")]
  MasterAgent,
  #[sea_orm(string_value = "distributor")]
  Distributor,
  #[sea_orm(string_value = "agent")]
  Agent,
  #[sea_orm(string_value = "senior_collaborator")]
  SeniorCollaborator,
  #[sea_orm(string_value = "collaborator")]
  Collaborator,
  #[sea_orm(string_value = "ctv")]
  Ctv,
  #[sea_orm(string_value = "staff")]
  Staff,
  #[sea_orm(string_value = "customer")]
  #[default]
  Customer,
}

impl UserRole {
  /// Canonical spelling used in commission settings keys.
  /// `collaborator`/`ctv` and `master_agent`/`distributor` are synonym
  /// pairs left over from older registrations.
  pub fn canonical(&self) -> &'static str {
    match self {
      Self::Admin => "admin",
      Self::MasterAgent | Self::Distributor => "distributor",
      Self::Agent => "agent",
      Self::SeniorCollaborator => "senior_collaborator",
      Self::Collaborator | Self::Ctv => "ctv",
      Self::Staff => "staff",
      Self::Customer => "customer",
    }
  }

  /// Roles allowed to own a referral link.
  pub fn is_referral_eligible(&self) -> bool {
    matches!(
      self,
      Self::Admin
        | Self::MasterAgent
        | Self::Distributor
        | Self::Agent
        | Self::Collaborator
        | Self::Ctv
    )
  }

  /// Top of the hierarchy; the only roles that can earn the second
  /// override level.
  pub fn is_top_tier(&self) -> bool {
    matches!(self, Self::MasterAgent | Self::Distributor)
  }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
  #[sea_orm(primary_key)]
  pub id: i64,
  pub name: String,
  #[sea_orm(unique)]
  pub email: String,
  pub role: UserRole,
  pub balance: i64,
  pub parent_id: Option<i64>,
  pub created_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
  #[sea_orm(
    belongs_to = "Entity",
    from = "Column::ParentId",
    to = "Column::Id"
  )]
  Parent,
  #[sea_orm(has_many = "commission::Entity")]
  Commissions,
  #[sea_orm(has_one = "referral_link::Entity")]
  ReferralLink,
}

impl Related<commission::Entity> for Entity {
  fn to() -> RelationDef {
    Relation::Commissions.def()
  }
}

impl Related<referral_link::Entity> for Entity {
  fn to() -> RelationDef {
    Relation::ReferralLink.def()
  }
}

impl ActiveModelBehavior for ActiveModel {}
