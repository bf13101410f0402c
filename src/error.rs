#[derive(Debug, thiserror::Error)]
pub enum Error {
  #[error("User not found")]
  UserNotFound,
  #[error("Order not found")]
  OrderNotFound,
  #[error("Commission not found")]
  CommissionNotFound,
  #[error("Referral link not found")]
  ReferralNotFound,
  #[error("User {0} cannot become its own ancestor")]
  HierarchyCycle(i64),
  #[error("Invalid arguments: {0}")]
  InvalidArgs(String),
  #[error(transparent)]
  Db(#[from] sea_orm::DbErr),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
