use serde::Serialize;

use crate::{
  entity::{CommissionStatus, OrderStatus, commission, order, user},
  prelude::*,
  sv,
};

#[derive(Debug, Default, Clone, Serialize)]
pub struct CommissionStats {
  pub pending_amount: i64,
  pub pending_count: u64,
  pub paid_amount: i64,
  pub paid_count: u64,
  pub total_amount: i64,
  pub total_count: u64,
}

#[derive(Debug, Serialize)]
pub struct TeamMember {
  pub user: user::Model,
  pub order_count: u64,
  pub sub_agent_count: u64,
  pub revenue: i64,
}

pub struct Stats<'a> {
  db: &'a DatabaseConnection,
}

impl<'a> Stats<'a> {
  pub fn new(db: &'a DatabaseConnection) -> Self {
    Self { db }
  }

  /// Commission sums and counts for one recipient, grouped by status.
  pub async fn commission_stats(
    &self,
    user_id: i64,
  ) -> Result<CommissionStats> {
    use sea_orm::sea_query::Expr;

    type Row = (CommissionStatus, Option<i64>, i64);
    let rows: Vec<Row> = commission::Entity::find()
      .select_only()
      .column(commission::Column::Status)
      .column_as(Expr::col(commission::Column::Amount).sum(), "amount")
      .column_as(Expr::col(commission::Column::Id).count(), "count")
      .filter(commission::Column::UserId.eq(user_id))
      .group_by(commission::Column::Status)
      .into_tuple()
      .all(self.db)
      .await?;

    let mut stats = CommissionStats::default();
    for (status, amount, count) in rows {
      let amount = amount.unwrap_or(0);
      match status {
        CommissionStatus::Pending => {
          stats.pending_amount = amount;
          stats.pending_count = count as u64;
        }
        CommissionStatus::Paid => {
          stats.paid_amount = amount;
          stats.paid_count = count as u64;
        }
      }
      stats.total_amount += amount;
      stats.total_count += count as u64;
    }

    Ok(stats)
  }

  /// Direct children of a user, each annotated with order, sub-agent and
  /// confirmed-revenue rollups. One aggregate round-trip per member;
  /// team sizes stay small.
  pub async fn team_members(&self, user_id: i64) -> Result<Vec<TeamMember>> {
    use sea_orm::sea_query::Expr;

    let members = sv::User::new(self.db).sub_agents(user_id).await?;

    let mut team = Vec::with_capacity(members.len());
    for member in members {
      let order_count = order::Entity::find()
        .filter(order::Column::ReferrerId.eq(member.id))
        .count(self.db)
        .await?;

      let sub_agent_count = user::Entity::find()
        .filter(user::Column::ParentId.eq(member.id))
        .count(self.db)
        .await?;

      let revenue: Option<Option<i64>> = order::Entity::find()
        .select_only()
        .column_as(Expr::col(order::Column::TotalPrice).sum(), "revenue")
        .filter(order::Column::ReferrerId.eq(member.id))
        .filter(
          order::Column::Status
            .is_in([OrderStatus::Confirmed, OrderStatus::Completed]),
        )
        .into_tuple()
        .one(self.db)
        .await?;

      team.push(TeamMember {
        user: member,
        order_count,
        sub_agent_count,
        revenue: revenue.flatten().unwrap_or(0),
      });
    }

    Ok(team)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{entity::user::UserRole, sv::test_utils::test_db};

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

  async fn seed_commission(
    db: &DatabaseConnection,
    order_id: i64,
    user_id: i64,
    amount: i64,
    status: CommissionStatus,
  ) {
    let now = Utc::now().naive_utc();
    commission::ActiveModel {
      id: NotSet,
      order_id: Set(order_id),
      user_id: Set(user_id),
      amount: Set(amount),
      percent: Set(10),
      level: Set(1),
      status: Set(status),
      created_at: Set(now),
      updated_at: Set(now),
    }
    .insert(db)
    .await
    .unwrap();
  }

  async fn seed_order(
    db: &DatabaseConnection,
    total_price: i64,
    referrer_id: Option<i64>,
    status: OrderStatus,
  ) -> order::Model {
    let now = Utc::now().naive_utc();
    order::ActiveModel {
      id: NotSet,
      customer_id: Set(None),
      total_price: Set(total_price),
      referrer_id: Set(referrer_id),
      status: Set(status),
      created_at: Set(now),
      updated_at: Set(now),
    }
    .insert(db)
    .await
    .unwrap()
  }

  #[tokio::test]
  async fn empty_stats_are_zero() {
    let db = test_db::setup().await;
    let user = seed_user(&db, "lan", UserRole::Ctv, None).await;

    let stats =
      Stats::new(&db).commission_stats(user.id).await.unwrap();

    assert_eq!(stats.total_count, 0);
    assert_eq!(stats.total_amount, 0);
    assert_eq!(stats.pending_amount, 0);
    assert_eq!(stats.paid_amount, 0);
  }

  #[tokio::test]
  async fn sums_are_grouped_by_status() {
    let db = test_db::setup().await;
    let user = seed_user(&db, "lan", UserRole::Ctv, None).await;
    let other = seed_user(&db, "mai", UserRole::Ctv, None).await;

    let o1 = seed_order(&db, 100, None, OrderStatus::Confirmed).await;
    let o2 = seed_order(&db, 100, None, OrderStatus::Confirmed).await;
    let o3 = seed_order(&db, 100, None, OrderStatus::Confirmed).await;

    seed_commission(&db, o1.id, user.id, 30_000, CommissionStatus::Pending)
      .await;
    seed_commission(&db, o2.id, user.id, 20_000, CommissionStatus::Pending)
      .await;
    seed_commission(&db, o3.id, user.id, 40_000, CommissionStatus::Paid)
      .await;
    // Someone else's commission must not leak in.
    seed_commission(&db, o1.id, other.id, 99_000, CommissionStatus::Pending)
      .await;

    let stats =
      Stats::new(&db).commission_stats(user.id).await.unwrap();

    assert_eq!(stats.pending_amount, 50_000);
    assert_eq!(stats.pending_count, 2);
    assert_eq!(stats.paid_amount, 40_000);
    assert_eq!(stats.paid_count, 1);
    assert_eq!(stats.total_amount, 90_000);
    assert_eq!(stats.total_count, 3);
  }

  #[tokio::test]
  async fn team_members_carry_their_rollups() {
    let db = test_db::setup().await;
    let leader = seed_user(&db, "agent-a", UserRole::Agent, None).await;
    let member =
      seed_user(&db, "ctv-a", UserRole::Ctv, Some(leader.id)).await;
    let quiet =
      seed_user(&db, "ctv-b", UserRole::Ctv, Some(leader.id)).await;
    seed_user(&db, "ctv-c", UserRole::Ctv, Some(member.id)).await;

    seed_order(&db, 1_000, Some(member.id), OrderStatus::Confirmed).await;
    seed_order(&db, 700, Some(member.id), OrderStatus::Completed).await;
    // Pending and cancelled orders count, their revenue does not.
    seed_order(&db, 500, Some(member.id), OrderStatus::Pending).await;
    seed_order(&db, 300, Some(member.id), OrderStatus::Cancelled).await;

    let team = Stats::new(&db).team_members(leader.id).await.unwrap();

    assert_eq!(team.len(), 2);

    let m = team.iter().find(|m| m.user.id == member.id).unwrap();
    assert_eq!(m.order_count, 4);
    assert_eq!(m.sub_agent_count, 1);
    assert_eq!(m.revenue, 1_700);

    let q = team.iter().find(|m| m.user.id == quiet.id).unwrap();
    assert_eq!(q.order_count, 0);
    assert_eq!(q.sub_agent_count, 0);
    assert_eq!(q.revenue, 0);
  }
}
