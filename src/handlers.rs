use axum::{
  Json,
  body::Bytes,
  extract::{Path, State},
  http::{HeaderMap, StatusCode},
};
use serde::{Deserialize, Serialize};

use crate::{
  entity::user::UserRole,
  prelude::*,
  state::AppState,
  sv::{Commission, Order, Referral, Settings, Stats, User, settings::RETAIL},
};

#[derive(Serialize)]
pub struct Status {
  success: bool,
  msg: Option<String>,
}

impl Status {
  fn ok() -> Json<Status> {
    Json(Status { success: true, msg: None })
  }

  fn err(msg: impl Into<String>) -> Json<Status> {
    Json(Status { success: false, msg: Some(msg.into()) })
  }
}

fn authorized(app: &AppState, headers: &HeaderMap) -> bool {
  headers
    .get("x-admin-token")
    .and_then(|value| value.to_str().ok())
    .is_some_and(|token| token == app.admin_token)
}

pub async fn health() -> &'static str {
  "OK"
}

#[derive(Deserialize)]
pub struct PaymentEvent {
  pub order_id: i64,
}

/// Verify a webhook signature: HMAC-SHA256 of the raw body keyed with
/// the shared secret, hex encoded.
pub fn verify_signature(secret: &str, body: &[u8], signature: &str) -> bool {
  use hmac::{Hmac, Mac};
  use sha2::Sha256;

  type HmacSha256 = Hmac<Sha256>;

  let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
    .expect("HMAC can take key of any size");
  mac.update(body);

  let expected = hex::encode(mac.finalize().into_bytes());
  expected == signature
}

/// Payment provider notification. Confirms the referenced order, which
/// settles its commissions as a side effect.
pub async fn payment_webhook(
  State(app): State<Arc<AppState>>,
  headers: HeaderMap,
  body: Bytes,
) -> (StatusCode, Json<Status>) {
  let signature = headers
    .get("x-signature")
    .and_then(|value| value.to_str().ok())
    .unwrap_or_default();

  if !verify_signature(&app.secret, &body, signature) {
    return (StatusCode::UNAUTHORIZED, Status::err("Invalid signature"));
  }

  let event: PaymentEvent = match json::from_slice(&body) {
    Ok(event) => event,
    Err(_) => {
      return (StatusCode::BAD_REQUEST, Status::err("Malformed payload"));
    }
  };

  match Order::new(&app.db).confirm(event.order_id).await {
    Ok(_) => (StatusCode::OK, Status::ok()),
    Err(Error::OrderNotFound) => {
      (StatusCode::NOT_FOUND, Status::err("Unknown order"))
    }
    Err(Error::InvalidArgs(msg)) => (StatusCode::CONFLICT, Status::err(msg)),
    Err(err) => {
      error!("webhook confirmation failed: {err}");
      (StatusCode::INTERNAL_SERVER_ERROR, Status::err("Internal error"))
    }
  }
}

#[derive(Deserialize)]
pub struct CreateOrderReq {
  pub total_price: i64,
  pub customer_id: Option<i64>,
  pub referral_code: Option<String>,
}

pub async fn create_order(
  State(app): State<Arc<AppState>>,
  Json(req): Json<CreateOrderReq>,
) -> (StatusCode, Json<json::Value>) {
  let result = Order::new(&app.db)
    .create(req.customer_id, req.total_price, req.referral_code.as_deref())
    .await;

  match result {
    Ok(order) => (
      StatusCode::CREATED,
      Json(json::json!({ "success": true, "order": order })),
    ),
    Err(Error::InvalidArgs(msg)) => (
      StatusCode::BAD_REQUEST,
      Json(json::json!({ "success": false, "msg": msg })),
    ),
    Err(err) => {
      error!("order intake failed: {err}");
      (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json::json!({ "success": false, "msg": "Internal error" })),
      )
    }
  }
}

/// Manual confirmation from the admin dashboard.
pub async fn confirm_order(
  State(app): State<Arc<AppState>>,
  headers: HeaderMap,
  Path(order_id): Path<i64>,
) -> (StatusCode, Json<json::Value>) {
  if !authorized(&app, &headers) {
    return (
      StatusCode::UNAUTHORIZED,
      Json(json::json!({ "success": false, "msg": "Unauthorized" })),
    );
  }

  match Order::new(&app.db).confirm(order_id).await {
    Ok(results) => (
      StatusCode::OK,
      Json(json::json!({ "success": true, "commissions": results })),
    ),
    Err(Error::OrderNotFound) => (
      StatusCode::NOT_FOUND,
      Json(json::json!({ "success": false, "msg": "Unknown order" })),
    ),
    Err(Error::InvalidArgs(msg)) => (
      StatusCode::CONFLICT,
      Json(json::json!({ "success": false, "msg": msg })),
    ),
    Err(err) => {
      error!("confirmation of order {order_id} failed: {err}");
      (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json::json!({ "success": false, "msg": "Internal error" })),
      )
    }
  }
}

#[derive(Deserialize)]
pub struct CreateUserReq {
  pub name: String,
  pub email: String,
  pub role: UserRole,
  pub parent_id: Option<i64>,
}

pub async fn create_user(
  State(app): State<Arc<AppState>>,
  headers: HeaderMap,
  Json(req): Json<CreateUserReq>,
) -> (StatusCode, Json<json::Value>) {
  if !authorized(&app, &headers) {
    return (
      StatusCode::UNAUTHORIZED,
      Json(json::json!({ "success": false, "msg": "Unauthorized" })),
    );
  }

  let result = User::new(&app.db)
    .create(&req.name, &req.email, req.role, req.parent_id)
    .await;

  match result {
    Ok(user) => (
      StatusCode::CREATED,
      Json(json::json!({ "success": true, "user": user })),
    ),
    Err(Error::UserNotFound) => (
      StatusCode::NOT_FOUND,
      Json(json::json!({ "success": false, "msg": "Unknown parent" })),
    ),
    Err(err) => {
      error!("user creation failed: {err}");
      (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json::json!({ "success": false, "msg": "Internal error" })),
      )
    }
  }
}

pub async fn get_user(
  State(app): State<Arc<AppState>>,
  Path(user_id): Path<i64>,
) -> (StatusCode, Json<json::Value>) {
  match User::new(&app.db).by_id(user_id).await {
    Ok(Some(user)) => (
      StatusCode::OK,
      Json(json::json!({ "success": true, "user": user })),
    ),
    Ok(None) => (
      StatusCode::NOT_FOUND,
      Json(json::json!({ "success": false, "msg": "Unknown user" })),
    ),
    Err(err) => {
      error!("user lookup failed: {err}");
      (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json::json!({ "success": false, "msg": "Internal error" })),
      )
    }
  }
}

#[derive(Deserialize)]
pub struct SetRoleReq {
  pub role: UserRole,
}

pub async fn set_user_role(
  State(app): State<Arc<AppState>>,
  headers: HeaderMap,
  Path(user_id): Path<i64>,
  Json(req): Json<SetRoleReq>,
) -> (StatusCode, Json<Status>) {
  if !authorized(&app, &headers) {
    return (StatusCode::UNAUTHORIZED, Status::err("Unauthorized"));
  }

  match User::new(&app.db).set_role(user_id, req.role).await {
    Ok(()) => (StatusCode::OK, Status::ok()),
    Err(Error::UserNotFound) => {
      (StatusCode::NOT_FOUND, Status::err("Unknown user"))
    }
    Err(err) => {
      error!("role change for user {user_id} failed: {err}");
      (StatusCode::INTERNAL_SERVER_ERROR, Status::err("Internal error"))
    }
  }
}

#[derive(Deserialize)]
pub struct SetParentReq {
  pub parent_id: i64,
}

pub async fn set_user_parent(
  State(app): State<Arc<AppState>>,
  headers: HeaderMap,
  Path(user_id): Path<i64>,
  Json(req): Json<SetParentReq>,
) -> (StatusCode, Json<Status>) {
  if !authorized(&app, &headers) {
    return (StatusCode::UNAUTHORIZED, Status::err("Unauthorized"));
  }

  match User::new(&app.db).set_parent(user_id, req.parent_id).await {
    Ok(()) => (StatusCode::OK, Status::ok()),
    Err(Error::UserNotFound) => {
      (StatusCode::NOT_FOUND, Status::err("Unknown user"))
    }
    Err(Error::HierarchyCycle(_)) => (
      StatusCode::CONFLICT,
      Status::err("Move would create a hierarchy cycle"),
    ),
    Err(err) => {
      error!("parent change for user {user_id} failed: {err}");
      (StatusCode::INTERNAL_SERVER_ERROR, Status::err("Internal error"))
    }
  }
}

pub async fn order_commissions(
  State(app): State<Arc<AppState>>,
  Path(order_id): Path<i64>,
) -> (StatusCode, Json<json::Value>) {
  match Order::new(&app.db).by_id(order_id).await {
    Ok(Some(_)) => {}
    Ok(None) => {
      return (
        StatusCode::NOT_FOUND,
        Json(json::json!({ "success": false, "msg": "Unknown order" })),
      );
    }
    Err(err) => {
      error!("order lookup failed: {err}");
      return (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json::json!({ "success": false, "msg": "Internal error" })),
      );
    }
  }

  match Commission::new(&app.db).for_order(order_id).await {
    Ok(rows) => (
      StatusCode::OK,
      Json(json::json!({ "success": true, "commissions": rows })),
    ),
    Err(err) => {
      error!("commission listing failed: {err}");
      (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json::json!({ "success": false, "msg": "Internal error" })),
      )
    }
  }
}

pub async fn create_referral_link(
  State(app): State<Arc<AppState>>,
  Path(user_id): Path<i64>,
) -> (StatusCode, Json<json::Value>) {
  match Referral::new(&app.db).create_for_user(user_id).await {
    Ok(Some(link)) => (
      StatusCode::OK,
      Json(json::json!({ "success": true, "link": link })),
    ),
    Ok(None) => (
      StatusCode::NOT_FOUND,
      Json(json::json!({
        "success": false,
        "msg": "No referral link available for this user"
      })),
    ),
    Err(err) => {
      error!("referral link issue failed: {err}");
      (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json::json!({ "success": false, "msg": "Internal error" })),
      )
    }
  }
}

pub async fn backfill_links(
  State(app): State<Arc<AppState>>,
  headers: HeaderMap,
) -> (StatusCode, Json<json::Value>) {
  if !authorized(&app, &headers) {
    return (
      StatusCode::UNAUTHORIZED,
      Json(json::json!({ "success": false, "msg": "Unauthorized" })),
    );
  }

  match Referral::new(&app.db).create_for_all_eligible().await {
    Ok(created) => (
      StatusCode::OK,
      Json(json::json!({ "success": true, "created": created })),
    ),
    Err(err) => {
      error!("referral link backfill failed: {err}");
      (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json::json!({ "success": false, "msg": "Internal error" })),
      )
    }
  }
}

pub async fn track_click(
  State(app): State<Arc<AppState>>,
  Path(code): Path<String>,
) -> (StatusCode, Json<Status>) {
  match Referral::new(&app.db).record_click(&code).await {
    Ok(()) => (StatusCode::OK, Status::ok()),
    Err(Error::ReferralNotFound) => {
      (StatusCode::NOT_FOUND, Status::err("Unknown referral code"))
    }
    Err(err) => {
      error!("click tracking failed: {err}");
      (StatusCode::INTERNAL_SERVER_ERROR, Status::err("Internal error"))
    }
  }
}

pub async fn commission_stats(
  State(app): State<Arc<AppState>>,
  Path(user_id): Path<i64>,
) -> (StatusCode, Json<json::Value>) {
  match Stats::new(&app.db).commission_stats(user_id).await {
    Ok(stats) => (
      StatusCode::OK,
      Json(json::json!({ "success": true, "stats": stats })),
    ),
    Err(err) => {
      error!("commission stats failed: {err}");
      (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json::json!({ "success": false, "msg": "Internal error" })),
      )
    }
  }
}

pub async fn team_members(
  State(app): State<Arc<AppState>>,
  Path(user_id): Path<i64>,
) -> (StatusCode, Json<json::Value>) {
  match Stats::new(&app.db).team_members(user_id).await {
    Ok(team) => (
      StatusCode::OK,
      Json(json::json!({ "success": true, "team": team })),
    ),
    Err(err) => {
      error!("team rollup failed: {err}");
      (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json::json!({ "success": false, "msg": "Internal error" })),
      )
    }
  }
}

pub async fn list_settings(
  State(app): State<Arc<AppState>>,
) -> (StatusCode, Json<json::Value>) {
  match Settings::new(&app.db).all().await {
    Ok(settings) => (
      StatusCode::OK,
      Json(json::json!({ "success": true, "settings": settings })),
    ),
    Err(err) => {
      error!("settings listing failed: {err}");
      (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json::json!({ "success": false, "msg": "Internal error" })),
      )
    }
  }
}

#[derive(Deserialize)]
pub struct UpsertSettingReq {
  pub role: UserRole,
  pub kind: Option<String>,
  pub percent: i32,
  pub description: Option<String>,
}

pub async fn upsert_setting(
  State(app): State<Arc<AppState>>,
  headers: HeaderMap,
  Json(req): Json<UpsertSettingReq>,
) -> (StatusCode, Json<json::Value>) {
  if !authorized(&app, &headers) {
    return (
      StatusCode::UNAUTHORIZED,
      Json(json::json!({ "success": false, "msg": "Unauthorized" })),
    );
  }

  let kind = req.kind.as_deref().unwrap_or(RETAIL);
  let result = Settings::new(&app.db)
    .upsert(&req.role, kind, req.percent, req.description)
    .await;

  match result {
    Ok(setting) => (
      StatusCode::OK,
      Json(json::json!({ "success": true, "setting": setting })),
    ),
    Err(Error::InvalidArgs(msg)) => (
      StatusCode::BAD_REQUEST,
      Json(json::json!({ "success": false, "msg": msg })),
    ),
    Err(err) => {
      error!("settings upsert failed: {err}");
      (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json::json!({ "success": false, "msg": "Internal error" })),
      )
    }
  }
}

pub async fn pay_commission(
  State(app): State<Arc<AppState>>,
  headers: HeaderMap,
  Path(commission_id): Path<i32>,
) -> (StatusCode, Json<json::Value>) {
  if !authorized(&app, &headers) {
    return (
      StatusCode::UNAUTHORIZED,
      Json(json::json!({ "success": false, "msg": "Unauthorized" })),
    );
  }

  match Commission::new(&app.db).mark_paid(commission_id).await {
    Ok(row) => (
      StatusCode::OK,
      Json(json::json!({ "success": true, "commission": row })),
    ),
    Err(Error::CommissionNotFound) => (
      StatusCode::NOT_FOUND,
      Json(json::json!({ "success": false, "msg": "Unknown commission" })),
    ),
    Err(err) => {
      error!("payout of commission {commission_id} failed: {err}");
      (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json::json!({ "success": false, "msg": "Internal error" })),
      )
    }
  }
}

#[cfg(test)]
mod tests {
  use hmac::{Hmac, Mac};
  use sha2::Sha256;

  use super::*;

  fn sign(secret: &str, body: &[u8]) -> String {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).unwrap();
    mac.update(body);
    hex::encode(mac.finalize().into_bytes())
  }

  #[test]
  fn accepts_a_valid_signature() {
    let body = br#"{"order_id":7}"#;
    let signature = sign("topsecret", body);

    assert!(verify_signature("topsecret", body, &signature));
  }

  #[test]
  fn rejects_a_tampered_body() {
    let signature = sign("topsecret", br#"{"order_id":7}"#);

    assert!(!verify_signature("topsecret", br#"{"order_id":8}"#, &signature));
  }

  #[test]
  fn rejects_a_wrong_secret() {
    let body = br#"{"order_id":7}"#;
    let signature = sign("topsecret", body);

    assert!(!verify_signature("other", body, &signature));
  }
}
