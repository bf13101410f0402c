use crate::{
  entity::{OrderStatus, order},
  prelude::*,
  sv::{Commission, Referral, commission::CommissionResult},
};

pub struct Order<'a> {
  db: &'a DatabaseConnection,
}

impl<'a> Order<'a> {
  pub fn new(db: &'a DatabaseConnection) -> Self {
    Self { db }
  }

  /// Take an order, resolving the referrer through an active referral
  /// link. An unknown or inactive code simply yields an unreferred
  /// order.
  pub async fn create(
    &self,
    customer_id: Option<i64>,
    total_price: i64,
    referral_code: Option<&str>,
  ) -> Result<order::Model> {
    if total_price <= 0 {
      return Err(Error::InvalidArgs("Order total must be positive".into()));
    }

    let referrer_id = match referral_code {
      Some(code) => {
        Referral::new(self.db).by_code(code).await?.map(|link| link.user_id)
      }
      None => None,
    };

    let now = Utc::now().naive_utc();
    Ok(
      order::ActiveModel {
        id: NotSet,
        customer_id: Set(customer_id),
        total_price: Set(total_price),
        referrer_id: Set(referrer_id),
        status: Set(OrderStatus::Pending),
        created_at: Set(now),
        updated_at: Set(now),
      }
      .insert(self.db)
      .await?,
    )
  }

  pub async fn by_id(&self, order_id: i64) -> Result<Option<order::Model>> {
    Ok(order::Entity::find_by_id(order_id).one(self.db).await?)
  }

  /// Transition an order into `confirmed` and settle its commissions.
  /// Called from the payment webhook and the admin confirm action; only
  /// the first confirmation does anything.
  pub async fn confirm(&self, order_id: i64) -> Result<Vec<CommissionResult>> {
    let order = self.by_id(order_id).await?.ok_or(Error::OrderNotFound)?;

    match order.status {
      OrderStatus::Confirmed | OrderStatus::Completed => return Ok(vec![]),
      OrderStatus::Cancelled => {
        return Err(Error::InvalidArgs(
          "Cancelled orders cannot be confirmed".into(),
        ));
      }
      OrderStatus::Pending => {}
    }

    let total_price = order.total_price;
    let referrer_id = order.referrer_id;

    let now = Utc::now().naive_utc();
    order::ActiveModel {
      status: Set(OrderStatus::Confirmed),
      updated_at: Set(now),
      ..order.into()
    }
    .update(self.db)
    .await?;

    if let Some(referrer_id) = referrer_id {
      Referral::new(self.db).record_order(referrer_id, total_price).await?;
    }

    let results =
      Commission::new(self.db).calculate_and_create(order_id).await?;

    info!(
      "order {order_id} confirmed, {} commission(s) created",
      results.len()
    );

    Ok(results)
  }
}
