use crate::{
  entity::{commission_setting, user::UserRole},
  prelude::*,
};

pub const RETAIL: &str = "retail";

/// Settings key for a role and commission kind, e.g. `ctv_retail`.
/// Synonym roles collapse to one key via `UserRole::canonical`.
pub fn key_for(role: &UserRole, kind: &str) -> String {
  format!("{}_{}", role.canonical(), kind)
}

/// Snapshot of every retail percent, loaded once per engine run so all
/// level lookups see the same configuration.
pub struct RetailPercents {
  by_key: HashMap<String, i32>,
}

impl RetailPercents {
  pub async fn load<C: ConnectionTrait>(conn: &C) -> Result<Self> {
    let rows = commission_setting::Entity::find()
      .filter(commission_setting::Column::Kind.eq(RETAIL))
      .all(conn)
      .await?;

    let by_key =
      rows.into_iter().map(|row| (row.key, row.percent)).collect();

    Ok(Self { by_key })
  }

  /// `None` means the role is unconfigured and the associated commission
  /// level is skipped; there is no zero default.
  pub fn for_role(&self, role: &UserRole) -> Option<i32> {
    self.by_key.get(&key_for(role, RETAIL)).copied()
  }
}

pub struct Settings<'a> {
  db: &'a DatabaseConnection,
}

impl<'a> Settings<'a> {
  pub fn new(db: &'a DatabaseConnection) -> Self {
    Self { db }
  }

  #[allow(dead_code)]
  pub async fn retail_percent(&self, role: &UserRole) -> Result<Option<i32>> {
    let row = commission_setting::Entity::find_by_id(key_for(role, RETAIL))
      .one(self.db)
      .await?;
    Ok(row.map(|row| row.percent))
  }

  pub async fn all(&self) -> Result<Vec<commission_setting::Model>> {
    Ok(
      commission_setting::Entity::find()
        .order_by_asc(commission_setting::Column::Key)
        .all(self.db)
        .await?,
    )
  }

  pub async fn upsert(
    &self,
    role: &UserRole,
    kind: &str,
    percent: i32,
    description: Option<String>,
  ) -> Result<commission_setting::Model> {
    if !(0..=100).contains(&percent) {
      return Err(Error::InvalidArgs(
        "Percent must be between 0 and 100".into(),
      ));
    }

    let key = key_for(role, kind);

    if let Some(existing) =
      commission_setting::Entity::find_by_id(key.as_str()).one(self.db).await?
    {
      return Ok(
        commission_setting::ActiveModel {
          percent: Set(percent),
          description: Set(description),
          ..existing.into()
        }
        .update(self.db)
        .await?,
      );
    }

    Ok(
      commission_setting::ActiveModel {
        key: Set(key),
        role: Set(role.canonical().to_string()),
        kind: Set(kind.to_string()),
        percent: Set(percent),
        description: Set(description),
      }
      .insert(self.db)
      .await?,
    )
  }
}
