mod entity;
mod error;
mod handlers;
mod prelude;
mod state;
mod sv;

use std::{env, net::SocketAddr};

use axum::{
  Router,
  routing::{get, post, put},
};
use tower::ServiceBuilder;
use tower_governor::{GovernorLayer, governor::GovernorConfigBuilder};
use tower_http::{
  cors::{Any, CorsLayer},
  trace::TraceLayer,
};
use tracing_subscriber::{
  EnvFilter, layer::SubscriberExt, util::SubscriberInitExt,
};

use crate::{prelude::*, state::AppState};

#[tokio::main]
async fn main() {
  dotenvy::dotenv().ok();

  tracing_subscriber::registry()
    .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
      "agency=debug,tower_http=debug,axum=trace,sea_orm=warn".into()
    }))
    .with(tracing_subscriber::fmt::layer())
    .init();

  let db_url = env::var("DATABASE_URL")
    .unwrap_or_else(|_| "sqlite:agency.db?mode=rwc".into());
  let secret = env::var("WEBHOOK_SECRET").expect("WEBHOOK_SECRET not set");
  let admin_token = env::var("ADMIN_TOKEN").expect("ADMIN_TOKEN not set");

  info!("Starting Agency Server v{}", env!("CARGO_PKG_VERSION"));

  let app_state = Arc::new(
    AppState::new(&db_url, &secret, &admin_token)
      .await
      .expect("Failed to initialize app state"),
  );

  let governor_conf = Arc::new(
    GovernorConfigBuilder::default()
      .per_second(2)
      .burst_size(100)
      .finish()
      .expect("Failed to build rate limiter config"),
  );

  let governor_limiter = governor_conf.limiter().clone();

  tokio::spawn(async move {
    loop {
      tokio::time::sleep(Duration::from_secs(60)).await;
      governor_limiter.retain_recent();
    }
  });

  let app = Router::new()
    .route("/health", get(handlers::health))
    .route("/api/webhooks/payment", post(handlers::payment_webhook))
    .route("/api/orders", post(handlers::create_order))
    .route("/api/orders/{id}/confirm", post(handlers::confirm_order))
    .route(
      "/api/orders/{id}/commissions",
      get(handlers::order_commissions),
    )
    .route("/api/users", post(handlers::create_user))
    .route("/api/users/{id}", get(handlers::get_user))
    .route("/api/users/{id}/role", put(handlers::set_user_role))
    .route("/api/users/{id}/parent", put(handlers::set_user_parent))
    .route(
      "/api/users/{id}/referral-link",
      post(handlers::create_referral_link),
    )
    .route("/api/users/{id}/stats", get(handlers::commission_stats))
    .route("/api/users/{id}/team", get(handlers::team_members))
    .route("/api/referral-links/backfill", post(handlers::backfill_links))
    .route(
      "/api/settings",
      get(handlers::list_settings).put(handlers::upsert_setting),
    )
    .route("/api/commissions/{id}/pay", post(handlers::pay_commission))
    .route("/r/{code}", get(handlers::track_click))
    .layer(
      ServiceBuilder::new()
        .layer(TraceLayer::new_for_http())
        .layer(GovernorLayer::new(governor_conf))
        .layer(
          CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any),
        ),
    )
    .with_state(app_state);

  let port: u16 =
    env::var("PORT").ok().and_then(|p| p.parse().ok()).unwrap_or(3000);
  let addr = SocketAddr::from(([0, 0, 0, 0], port));

  info!("HTTP server listening on {}", addr);

  let listener =
    tokio::net::TcpListener::bind(addr).await.expect("Failed to bind");
  axum::serve(
    listener,
    app.into_make_service_with_connect_info::<SocketAddr>(),
  )
  .await
  .expect("Server error");
}
