use sea_orm::SqlErr;
use uuid::Uuid;

use crate::{
  entity::{referral_link, user, user::UserRole},
  prelude::*,
};

pub const CODE_PREFIX: &str = "REF-";
pub const CODE_LENGTH: usize = 6;
pub const CODE_ATTEMPTS: u32 = 10;

const CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

fn generate_code() -> String {
  let bytes = Uuid::new_v4().into_bytes();
  let suffix: String = bytes
    .iter()
    .take(CODE_LENGTH)
    .map(|b| CODE_ALPHABET[*b as usize % CODE_ALPHABET.len()] as char)
    .collect();

  format!("{CODE_PREFIX}{suffix}")
}

pub struct Referral<'a> {
  db: &'a DatabaseConnection,
}

impl<'a> Referral<'a> {
  pub fn new(db: &'a DatabaseConnection) -> Self {
    Self { db }
  }

  /// Issue a referral link for a user, or return the active one they
  /// already have. Unknown users and ineligible roles get `None`; so
  /// does a user whose code minting keeps colliding, since callers
  /// invoke this opportunistically and can retry later.
  pub async fn create_for_user(
    &self,
    user_id: i64,
  ) -> Result<Option<referral_link::Model>> {
    let Some(user) = user::Entity::find_by_id(user_id).one(self.db).await?
    else {
      return Ok(None);
    };
    if !user.role.is_referral_eligible() {
      return Ok(None);
    }

    if let Some(link) = self.active_by_user(user_id).await? {
      return Ok(Some(link));
    }

    for _ in 0..CODE_ATTEMPTS {
      let now = Utc::now().naive_utc();
      let link = referral_link::ActiveModel {
        id: NotSet,
        code: Set(generate_code()),
        user_id: Set(user_id),
        is_active: Set(true),
        click_count: Set(0),
        order_count: Set(0),
        revenue: Set(0),
        created_at: Set(now),
      };

      match link.insert(self.db).await {
        Ok(link) => return Ok(Some(link)),
        Err(err)
          if matches!(
            err.sql_err(),
            Some(SqlErr::UniqueConstraintViolation(_))
          ) =>
        {
          continue;
        }
        Err(err) => return Err(err.into()),
      }
    }

    warn!(
      "gave up minting a referral code for user {user_id} \
       after {CODE_ATTEMPTS} attempts"
    );
    Ok(None)
  }

  /// Backfill: give every eligible user without an active link one.
  /// Returns how many links were created.
  pub async fn create_for_all_eligible(&self) -> Result<u64> {
    let users = user::Entity::find()
      .filter(user::Column::Role.is_in([
        UserRole::Admin,
        UserRole::MasterAgent,
        UserRole::Distributor,
        UserRole::Agent,
        UserRole::Collaborator,
        UserRole::Ctv,
      ]))
      .all(self.db)
      .await?;

    let mut created = 0;
    for user in users {
      if self.active_by_user(user.id).await?.is_some() {
        continue;
      }
      if self.create_for_user(user.id).await?.is_some() {
        created += 1;
      }
    }

    Ok(created)
  }

  pub async fn active_by_user(
    &self,
    user_id: i64,
  ) -> Result<Option<referral_link::Model>> {
    Ok(
      referral_link::Entity::find()
        .filter(referral_link::Column::UserId.eq(user_id))
        .filter(referral_link::Column::IsActive.eq(true))
        .one(self.db)
        .await?,
    )
  }

  pub async fn by_code(
    &self,
    code: &str,
  ) -> Result<Option<referral_link::Model>> {
    Ok(
      referral_link::Entity::find()
        .filter(referral_link::Column::Code.eq(code))
        .filter(referral_link::Column::IsActive.eq(true))
        .one(self.db)
        .await?,
    )
  }

  /// Count a landing-page visit against an active link.
  pub async fn record_click(&self, code: &str) -> Result<()> {
    use sea_orm::sea_query::Expr;

    let updated = referral_link::Entity::update_many()
      .col_expr(
        referral_link::Column::ClickCount,
        Expr::col(referral_link::Column::ClickCount).add(1),
      )
      .filter(referral_link::Column::Code.eq(code))
      .filter(referral_link::Column::IsActive.eq(true))
      .exec(self.db)
      .await?;

    if updated.rows_affected == 0 {
      return Err(Error::ReferralNotFound);
    }
    Ok(())
  }

  /// Roll the order and revenue counters of a referrer's active link.
  /// Referrers without a link are fine; there is nothing to count on.
  pub async fn record_order(&self, user_id: i64, revenue: i64) -> Result<()> {
    use sea_orm::sea_query::Expr;

    referral_link::Entity::update_many()
      .col_expr(
        referral_link::Column::OrderCount,
        Expr::col(referral_link::Column::OrderCount).add(1),
      )
      .col_expr(
        referral_link::Column::Revenue,
        Expr::col(referral_link::Column::Revenue).add(revenue),
      )
      .filter(referral_link::Column::UserId.eq(user_id))
      .filter(referral_link::Column::IsActive.eq(true))
      .exec(self.db)
      .await?;

    Ok(())
  }
}
