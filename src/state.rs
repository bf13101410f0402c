use migration::Migrator;

use crate::prelude::*;

pub struct AppState {
  pub db: DatabaseConnection,
  /// Shared secret the payment provider signs webhook bodies with.
  pub secret: String,
  /// Bearer token for the admin endpoints.
  pub admin_token: String,
}

impl AppState {
  pub async fn new(
    db_url: &str,
    secret: &str,
    admin_token: &str,
  ) -> anyhow::Result<Self> {
    let db = Database::connect(db_url).await?;
    Migrator::up(&db, None).await?;

    Ok(Self {
      db,
      secret: secret.to_string(),
      admin_token: admin_token.to_string(),
    })
  }
}
