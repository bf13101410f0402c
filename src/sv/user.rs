use crate::{
  entity::{user, user::UserRole},
  prelude::*,
};

pub struct User<'a> {
  db: &'a DatabaseConnection,
}

impl<'a> User<'a> {
  pub fn new(db: &'a DatabaseConnection) -> Self {
    Self { db }
  }

  pub async fn create(
    &self,
    name: &str,
    email: &str,
    role: UserRole,
    parent_id: Option<i64>,
  ) -> Result<user::Model> {
    if let Some(parent_id) = parent_id {
      user::Entity::find_by_id(parent_id)
        .one(self.db)
        .await?
        .ok_or(Error::UserNotFound)?;
    }

    let now = Utc::now().naive_utc();
    let user = user::ActiveModel {
      id: NotSet,
      name: Set(name.to_string()),
      email: Set(email.to_string()),
      role: Set(role),
      balance: Set(0),
      parent_id: Set(parent_id),
      created_at: Set(now),
    };

    Ok(user.insert(self.db).await?)
  }

  pub async fn by_id(&self, user_id: i64) -> Result<Option<user::Model>> {
    Ok(user::Entity::find_by_id(user_id).one(self.db).await?)
  }

  pub async fn set_role(&self, user_id: i64, role: UserRole) -> Result<()> {
    let user = user::Entity::find_by_id(user_id)
      .one(self.db)
      .await?
      .ok_or(Error::UserNotFound)?;

    user::ActiveModel { role: Set(role), ..user.into() }
      .update(self.db)
      .await?;

    Ok(())
  }

  /// Attach a user under a new parent. The proposed ancestor chain is
  /// walked first so a user can never become its own ancestor, even
  /// over bad pre-existing data.
  pub async fn set_parent(&self, user_id: i64, parent_id: i64) -> Result<()> {
    let user = user::Entity::find_by_id(user_id)
      .one(self.db)
      .await?
      .ok_or(Error::UserNotFound)?;

    if user_id == parent_id {
      return Err(Error::HierarchyCycle(user_id));
    }

    let mut seen = HashSet::from([user_id]);
    let mut cursor = Some(parent_id);
    while let Some(id) = cursor {
      if !seen.insert(id) {
        return Err(Error::HierarchyCycle(user_id));
      }
      let ancestor = user::Entity::find_by_id(id)
        .one(self.db)
        .await?
        .ok_or(Error::UserNotFound)?;
      cursor = ancestor.parent_id;
    }

    user::ActiveModel { parent_id: Set(Some(parent_id)), ..user.into() }
      .update(self.db)
      .await?;

    Ok(())
  }

  pub async fn sub_agents(&self, user_id: i64) -> Result<Vec<user::Model>> {
    Ok(
      user::Entity::find()
        .filter(user::Column::ParentId.eq(user_id))
        .order_by_asc(user::Column::CreatedAt)
        .all(self.db)
        .await?,
    )
  }
}
