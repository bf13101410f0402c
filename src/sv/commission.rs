use serde::Serialize;

use crate::{
  entity::{CommissionStatus, commission, order, user, user::UserRole},
  prelude::*,
  sv::settings::RetailPercents,
};

/// Ancestor levels beyond the direct referrer that can earn an override.
pub const MAX_OVERRIDE_LEVELS: u32 = 2;

/// An ancestor earns overrides on its downline's sales only once it has
/// built a team of at least this many direct sub-agents.
pub const OVERRIDE_MIN_SUB_AGENTS: u64 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CommissionKind {
  Retail,
  Override,
}

#[derive(Debug, Clone, Serialize)]
pub struct CommissionResult {
  pub user_id: i64,
  pub user_name: String,
  pub role: UserRole,
  pub amount: i64,
  pub percent: i32,
  pub level: i32,
  pub kind: CommissionKind,
}

pub struct Commission<'a> {
  db: &'a DatabaseConnection,
}

impl<'a> Commission<'a> {
  pub fn new(db: &'a DatabaseConnection) -> Self {
    Self { db }
  }

  /// Compute and persist all commissions for an order.
  ///
  /// Credits the direct referrer at level 1 and qualifying ancestors at
  /// levels 2..=1 + MAX_OVERRIDE_LEVELS, inside a single transaction.
  /// Orders without a referrer and orders that already carry commission
  /// rows are silent no-ops, so a webhook retry can never double-credit.
  pub async fn calculate_and_create(
    &self,
    order_id: i64,
  ) -> Result<Vec<CommissionResult>> {
    let txn = self.db.begin().await?;

    let Some(order) = order::Entity::find_by_id(order_id).one(&txn).await?
    else {
      return Ok(vec![]);
    };
    let Some(referrer_id) = order.referrer_id else {
      return Ok(vec![]);
    };

    let processed = commission::Entity::find()
      .filter(commission::Column::OrderId.eq(order_id))
      .count(&txn)
      .await?;
    if processed > 0 {
      debug!("order {order_id} already has commissions, skipping");
      return Ok(vec![]);
    }

    let Some(referrer) =
      user::Entity::find_by_id(referrer_id).one(&txn).await?
    else {
      return Ok(vec![]);
    };

    let percents = RetailPercents::load(&txn).await?;
    let mut results = Vec::new();

    // Level 1: retail commission for the direct referrer.
    if let Some(percent) = percents.for_role(&referrer.role) {
      let amount = order.total_price * percent as i64 / 100;
      Self::credit(&txn, order_id, referrer.id, amount, percent, 1).await?;

      results.push(CommissionResult {
        user_id: referrer.id,
        user_name: referrer.name.clone(),
        role: referrer.role.clone(),
        amount,
        percent,
        level: 1,
        kind: CommissionKind::Retail,
      });
    } else {
      warn!(
        "no retail percent configured for role `{}`",
        referrer.role.canonical()
      );
    }

    // Walk up the hierarchy; each qualifying ancestor earns the spread
    // between its own retail percent and its child's.
    let mut child = referrer;
    for depth in 0..MAX_OVERRIDE_LEVELS {
      let Some(parent_id) = child.parent_id else {
        break;
      };
      let Some(ancestor) =
        user::Entity::find_by_id(parent_id).one(&txn).await?
      else {
        break;
      };

      let level = depth as i32 + 2;

      let team_size = user::Entity::find()
        .filter(user::Column::ParentId.eq(ancestor.id))
        .count(&txn)
        .await?;

      let top_tier_ok = level < 3 || ancestor.role.is_top_tier();

      if team_size >= OVERRIDE_MIN_SUB_AGENTS && top_tier_ok {
        if let (Some(ancestor_percent), Some(child_percent)) =
          (percents.for_role(&ancestor.role), percents.for_role(&child.role))
        {
          let percent = ancestor_percent - child_percent;
          if percent > 0 {
            let amount = order.total_price * percent as i64 / 100;
            Self::credit(&txn, order_id, ancestor.id, amount, percent, level)
              .await?;

            results.push(CommissionResult {
              user_id: ancestor.id,
              user_name: ancestor.name.clone(),
              role: ancestor.role.clone(),
              amount,
              percent,
              level,
              kind: CommissionKind::Override,
            });
          }
        }
      }

      child = ancestor;
    }

    txn.commit().await?;
    Ok(results)
  }

  /// Insert one commission row and credit the recipient's balance as an
  /// in-database increment, not a read-modify-write.
  async fn credit<C: ConnectionTrait>(
    conn: &C,
    order_id: i64,
    user_id: i64,
    amount: i64,
    percent: i32,
    level: i32,
  ) -> Result<()> {
    use sea_orm::sea_query::Expr;

    let now = Utc::now().naive_utc();
    commission::ActiveModel {
      id: NotSet,
      order_id: Set(order_id),
      user_id: Set(user_id),
      amount: Set(amount),
      percent: Set(percent),
      level: Set(level),
      status: Set(CommissionStatus::Pending),
      created_at: Set(now),
      updated_at: Set(now),
    }
    .insert(conn)
    .await?;

    user::Entity::update_many()
      .col_expr(
        user::Column::Balance,
        Expr::col(user::Column::Balance).add(amount),
      )
      .filter(user::Column::Id.eq(user_id))
      .exec(conn)
      .await?;

    Ok(())
  }

  pub async fn for_order(
    &self,
    order_id: i64,
  ) -> Result<Vec<commission::Model>> {
    Ok(
      commission::Entity::find()
        .filter(commission::Column::OrderId.eq(order_id))
        .order_by_asc(commission::Column::Level)
        .all(self.db)
        .await?,
    )
  }

  /// Payout hook: transition a commission to `paid`. Already-paid rows
  /// are returned unchanged.
  pub async fn mark_paid(
    &self,
    commission_id: i32,
  ) -> Result<commission::Model> {
    let row = commission::Entity::find_by_id(commission_id)
      .one(self.db)
      .await?
      .ok_or(Error::CommissionNotFound)?;

    if row.status == CommissionStatus::Paid {
      return Ok(row);
    }

    let now = Utc::now().naive_utc();
    Ok(
      commission::ActiveModel {
        status: Set(CommissionStatus::Paid),
        updated_at: Set(now),
        ..row.into()
      }
      .update(self.db)
      .await?,
    )
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{
    entity::{OrderStatus, commission_setting, order},
    sv::test_utils::test_db,
  };

  async fn seed_user(
    db: &DatabaseConnection,
    name: &str,
    role: UserRole,
    parent_id: Option<i64>,
  ) -> user::Model {
    let now = Utc::now().naive_utc();
    user::ActiveModel {
      id: NotSet,
      name: Set(name.into()),
      email: Set(format!("{name}@example.com")),
      role: Set(role),
      balance: Set(0),
      parent_id: Set(parent_id),
      created_at: Set(now),
    }
    .insert(db)
    .await
    .unwrap()
  }

  /// Pad a parent's team with extra sub-agents so it clears (or misses)
  /// the override threshold.
  async fn seed_team(db: &DatabaseConnection, parent_id: i64, extra: usize) {
    for i in 0..extra {
      seed_user(
        db,
        &format!("sub-{parent_id}-{i}"),
        UserRole::Ctv,
        Some(parent_id),
      )
      .await;
    }
  }

  async fn seed_setting(db: &DatabaseConnection, role: &str, percent: i32) {
    commission_setting::ActiveModel {
      key: Set(format!("{role}_retail")),
      role: Set(role.into()),
      kind: Set("retail".into()),
      percent: Set(percent),
      description: Set(None),
    }
    .insert(db)
    .await
    .unwrap();
  }

  async fn seed_order(
    db: &DatabaseConnection,
    total_price: i64,
    referrer_id: Option<i64>,
  ) -> order::Model {
    let now = Utc::now().naive_utc();
    order::ActiveModel {
      id: NotSet,
      customer_id: Set(None),
      total_price: Set(total_price),
      referrer_id: Set(referrer_id),
      status: Set(OrderStatus::Pending),
      created_at: Set(now),
      updated_at: Set(now),
    }
    .insert(db)
    .await
    .unwrap()
  }

  async fn balance_of(db: &DatabaseConnection, user_id: i64) -> i64 {
    user::Entity::find_by_id(user_id).one(db).await.unwrap().unwrap().balance
  }

  #[tokio::test]
  async fn no_referrer_is_a_noop() {
    let db = test_db::setup().await;
    seed_setting(&db, "ctv", 10).await;

    let order = seed_order(&db, 500_000, None).await;
    let results =
      Commission::new(&db).calculate_and_create(order.id).await.unwrap();

    assert!(results.is_empty());
    assert_eq!(commission::Entity::find().count(&db).await.unwrap(), 0);
  }

  #[tokio::test]
  async fn missing_order_is_a_noop() {
    let db = test_db::setup().await;

    let results =
      Commission::new(&db).calculate_and_create(999).await.unwrap();

    assert!(results.is_empty());
  }

  #[tokio::test]
  async fn direct_retail_commission() {
    let db = test_db::setup().await;
    seed_setting(&db, "ctv", 10).await;

    let referrer = seed_user(&db, "lan", UserRole::Collaborator, None).await;
    let order = seed_order(&db, 500_000, Some(referrer.id)).await;

    let results =
      Commission::new(&db).calculate_and_create(order.id).await.unwrap();

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].user_id, referrer.id);
    assert_eq!(results[0].amount, 50_000);
    assert_eq!(results[0].percent, 10);
    assert_eq!(results[0].level, 1);
    assert_eq!(results[0].kind, CommissionKind::Retail);

    assert_eq!(balance_of(&db, referrer.id).await, 50_000);

    let rows = Commission::new(&db).for_order(order.id).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].status, CommissionStatus::Pending);
  }

  #[tokio::test]
  async fn collaborator_and_ctv_resolve_to_the_same_key() {
    let db = test_db::setup().await;
    seed_setting(&db, "ctv", 10).await;

    let a = seed_user(&db, "mai", UserRole::Collaborator, None).await;
    let b = seed_user(&db, "huy", UserRole::Ctv, None).await;

    let order_a = seed_order(&db, 200_000, Some(a.id)).await;
    let order_b = seed_order(&db, 200_000, Some(b.id)).await;

    let sv = Commission::new(&db);
    let results_a = sv.calculate_and_create(order_a.id).await.unwrap();
    let results_b = sv.calculate_and_create(order_b.id).await.unwrap();

    assert_eq!(results_a[0].amount, results_b[0].amount);
    assert_eq!(results_a[0].percent, results_b[0].percent);
  }

  #[tokio::test]
  async fn processing_an_order_twice_never_double_credits() {
    let db = test_db::setup().await;
    seed_setting(&db, "ctv", 10).await;

    let referrer = seed_user(&db, "lan", UserRole::Ctv, None).await;
    let order = seed_order(&db, 500_000, Some(referrer.id)).await;

    let sv = Commission::new(&db);
    let first = sv.calculate_and_create(order.id).await.unwrap();
    let second = sv.calculate_and_create(order.id).await.unwrap();

    assert_eq!(first.len(), 1);
    assert!(second.is_empty());
    assert_eq!(commission::Entity::find().count(&db).await.unwrap(), 1);
    assert_eq!(balance_of(&db, referrer.id).await, 50_000);
  }

  #[tokio::test]
  async fn override_skipped_below_team_threshold() {
    let db = test_db::setup().await;
    seed_setting(&db, "ctv", 10).await;
    seed_setting(&db, "agent", 15).await;

    let parent = seed_user(&db, "agent-a", UserRole::Agent, None).await;
    let referrer =
      seed_user(&db, "ctv-a", UserRole::Ctv, Some(parent.id)).await;
    // Two direct sub-agents in total, one short of the threshold.
    seed_team(&db, parent.id, 1).await;

    let order = seed_order(&db, 500_000, Some(referrer.id)).await;
    let results =
      Commission::new(&db).calculate_and_create(order.id).await.unwrap();

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].level, 1);
    assert_eq!(balance_of(&db, parent.id).await, 0);
  }

  #[tokio::test]
  async fn override_granted_at_team_threshold() {
    let db = test_db::setup().await;
    seed_setting(&db, "ctv", 10).await;
    seed_setting(&db, "agent", 15).await;

    let parent = seed_user(&db, "agent-a", UserRole::Agent, None).await;
    let referrer =
      seed_user(&db, "ctv-a", UserRole::Ctv, Some(parent.id)).await;
    seed_team(&db, parent.id, 2).await;

    let order = seed_order(&db, 500_000, Some(referrer.id)).await;
    let results =
      Commission::new(&db).calculate_and_create(order.id).await.unwrap();

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].amount, 50_000);
    assert_eq!(results[1].user_id, parent.id);
    assert_eq!(results[1].percent, 5);
    assert_eq!(results[1].amount, 25_000);
    assert_eq!(results[1].level, 2);
    assert_eq!(results[1].kind, CommissionKind::Override);
    assert_eq!(balance_of(&db, parent.id).await, 25_000);
  }

  #[tokio::test]
  async fn no_override_when_parent_percent_not_higher() {
    let db = test_db::setup().await;
    seed_setting(&db, "ctv", 10).await;
    seed_setting(&db, "agent", 10).await;

    let parent = seed_user(&db, "agent-a", UserRole::Agent, None).await;
    let referrer =
      seed_user(&db, "ctv-a", UserRole::Ctv, Some(parent.id)).await;
    seed_team(&db, parent.id, 2).await;

    let order = seed_order(&db, 500_000, Some(referrer.id)).await;
    let results =
      Commission::new(&db).calculate_and_create(order.id).await.unwrap();

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].level, 1);
  }

  #[tokio::test]
  async fn three_level_chain_pays_all_tiers() {
    let db = test_db::setup().await;
    seed_setting(&db, "ctv", 10).await;
    seed_setting(&db, "agent", 15).await;
    seed_setting(&db, "distributor", 20).await;

    let top = seed_user(&db, "dist", UserRole::Distributor, None).await;
    let mid = seed_user(&db, "agent-a", UserRole::Agent, Some(top.id)).await;
    let referrer =
      seed_user(&db, "ctv-a", UserRole::Collaborator, Some(mid.id)).await;
    seed_team(&db, top.id, 2).await;
    seed_team(&db, mid.id, 2).await;

    let order = seed_order(&db, 1_000_000, Some(referrer.id)).await;
    let results =
      Commission::new(&db).calculate_and_create(order.id).await.unwrap();

    assert_eq!(results.len(), 3);

    assert_eq!(results[0].user_id, referrer.id);
    assert_eq!(results[0].amount, 100_000);
    assert_eq!(results[0].level, 1);

    assert_eq!(results[1].user_id, mid.id);
    assert_eq!(results[1].amount, 50_000);
    assert_eq!(results[1].percent, 5);
    assert_eq!(results[1].level, 2);

    assert_eq!(results[2].user_id, top.id);
    assert_eq!(results[2].amount, 50_000);
    assert_eq!(results[2].percent, 5);
    assert_eq!(results[2].level, 3);

    assert_eq!(balance_of(&db, referrer.id).await, 100_000);
    assert_eq!(balance_of(&db, mid.id).await, 50_000);
    assert_eq!(balance_of(&db, top.id).await, 50_000);
    assert_eq!(commission::Entity::find().count(&db).await.unwrap(), 3);
  }

  #[tokio::test]
  async fn master_agent_is_a_distributor_synonym_at_the_top() {
    let db = test_db::setup().await;
    seed_setting(&db, "ctv", 10).await;
    seed_setting(&db, "agent", 15).await;
    seed_setting(&db, "distributor", 20).await;

    let top = seed_user(&db, "master", UserRole::MasterAgent, None).await;
    let mid = seed_user(&db, "agent-a", UserRole::Agent, Some(top.id)).await;
    let referrer =
      seed_user(&db, "ctv-a", UserRole::Ctv, Some(mid.id)).await;
    seed_team(&db, top.id, 2).await;
    seed_team(&db, mid.id, 2).await;

    let order = seed_order(&db, 1_000_000, Some(referrer.id)).await;
    let results =
      Commission::new(&db).calculate_and_create(order.id).await.unwrap();

    assert_eq!(results.len(), 3);
    assert_eq!(results[2].user_id, top.id);
    assert_eq!(results[2].amount, 50_000);
  }

  #[tokio::test]
  async fn grandparent_must_be_top_tier() {
    let db = test_db::setup().await;
    seed_setting(&db, "ctv", 10).await;
    seed_setting(&db, "agent", 15).await;
    seed_setting(&db, "admin", 25).await;

    // The grandparent outranks everyone on percent but holds the wrong
    // role for the second override.
    let top = seed_user(&db, "boss", UserRole::Admin, None).await;
    let mid = seed_user(&db, "agent-a", UserRole::Agent, Some(top.id)).await;
    let referrer =
      seed_user(&db, "ctv-a", UserRole::Ctv, Some(mid.id)).await;
    seed_team(&db, top.id, 2).await;
    seed_team(&db, mid.id, 2).await;

    let order = seed_order(&db, 1_000_000, Some(referrer.id)).await;
    let results =
      Commission::new(&db).calculate_and_create(order.id).await.unwrap();

    assert_eq!(results.len(), 2);
    assert!(results.iter().all(|r| r.level < 3));
    assert_eq!(balance_of(&db, top.id).await, 0);
  }

  #[tokio::test]
  async fn gated_level_two_does_not_block_level_three() {
    let db = test_db::setup().await;
    seed_setting(&db, "ctv", 10).await;
    seed_setting(&db, "agent", 15).await;
    seed_setting(&db, "distributor", 20).await;

    let top = seed_user(&db, "dist", UserRole::Distributor, None).await;
    let mid = seed_user(&db, "agent-a", UserRole::Agent, Some(top.id)).await;
    let referrer =
      seed_user(&db, "ctv-a", UserRole::Ctv, Some(mid.id)).await;
    // The parent's only sub-agent is the referrer; the grandparent has a
    // full team.
    seed_team(&db, top.id, 2).await;

    let order = seed_order(&db, 1_000_000, Some(referrer.id)).await;
    let results =
      Commission::new(&db).calculate_and_create(order.id).await.unwrap();

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].level, 1);
    assert_eq!(results[1].level, 3);
    assert_eq!(results[1].user_id, top.id);
    assert_eq!(results[1].percent, 5);
    assert_eq!(balance_of(&db, mid.id).await, 0);
  }

  #[tokio::test]
  async fn missing_retail_setting_skips_every_level() {
    let db = test_db::setup().await;

    let top = seed_user(&db, "dist", UserRole::Distributor, None).await;
    let mid = seed_user(&db, "agent-a", UserRole::Agent, Some(top.id)).await;
    let referrer =
      seed_user(&db, "ctv-a", UserRole::Ctv, Some(mid.id)).await;
    seed_team(&db, top.id, 2).await;
    seed_team(&db, mid.id, 2).await;

    let order = seed_order(&db, 1_000_000, Some(referrer.id)).await;
    let results =
      Commission::new(&db).calculate_and_create(order.id).await.unwrap();

    assert!(results.is_empty());
    assert_eq!(commission::Entity::find().count(&db).await.unwrap(), 0);
    assert_eq!(balance_of(&db, referrer.id).await, 0);
  }

  #[tokio::test]
  async fn missing_child_percent_skips_that_override_only() {
    let db = test_db::setup().await;
    // No ctv_retail: level 1 and the agent's override both depend on it
    // and are skipped, but the distributor/agent spread still pays out.
    seed_setting(&db, "agent", 15).await;
    seed_setting(&db, "distributor", 20).await;

    let top = seed_user(&db, "dist", UserRole::Distributor, None).await;
    let mid = seed_user(&db, "agent-a", UserRole::Agent, Some(top.id)).await;
    let referrer =
      seed_user(&db, "ctv-a", UserRole::Ctv, Some(mid.id)).await;
    seed_team(&db, top.id, 2).await;
    seed_team(&db, mid.id, 2).await;

    let order = seed_order(&db, 1_000_000, Some(referrer.id)).await;
    let results =
      Commission::new(&db).calculate_and_create(order.id).await.unwrap();

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].user_id, top.id);
    assert_eq!(results[0].level, 3);
    assert_eq!(results[0].amount, 50_000);
    assert_eq!(balance_of(&db, referrer.id).await, 0);
    assert_eq!(balance_of(&db, mid.id).await, 0);
  }

  #[tokio::test]
  async fn mark_paid_transitions_status() {
    let db = test_db::setup().await;
    seed_setting(&db, "ctv", 10).await;

    let referrer = seed_user(&db, "lan", UserRole::Ctv, None).await;
    let order = seed_order(&db, 500_000, Some(referrer.id)).await;

    let sv = Commission::new(&db);
    sv.calculate_and_create(order.id).await.unwrap();

    let row = &sv.for_order(order.id).await.unwrap()[0];
    let paid = sv.mark_paid(row.id).await.unwrap();
    assert_eq!(paid.status, CommissionStatus::Paid);

    // Repeating the payout is harmless.
    let again = sv.mark_paid(row.id).await.unwrap();
    assert_eq!(again.status, CommissionStatus::Paid);
  }
}
