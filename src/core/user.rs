//! User business logic - account records and role lookup.
//!
//! Registration and token issuance live outside this crate; these functions
//! only maintain the user rows the rest of the core refers to.

use crate::{
    core::validation,
    entities::{Role, User, user},
    errors::{Error, Result},
};
use sea_orm::{Set, prelude::*};
use tracing::info;

/// Input for [`create_user`].
#[derive(Clone, Debug)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
    pub phone: Option<String>,
}

impl NewUser {
    /// An agent with blank names and no phone.
    #[must_use]
    pub fn agent(username: &str, email: &str) -> Self {
        Self {
            username: username.to_string(),
            email: email.to_string(),
            first_name: String::new(),
            last_name: String::new(),
            role: Role::Agent,
            phone: None,
        }
    }

    /// Same user with a different role.
    #[must_use]
    pub fn with_role(mut self, role: Role) -> Self {
        self.role = role;
        self
    }
}

/// Creates a user after checking the username is free and the fields are well-formed.
pub async fn create_user(db: &DatabaseConnection, new: NewUser) -> Result<user::Model> {
    let username = new.username.trim().to_string();
    validation::required("username", &username, 150)?;
    validation::email("email", &new.email)?;
    validation::max_len("first_name", &new.first_name, 150)?;
    validation::max_len("last_name", &new.last_name, 150)?;
    if let Some(phone) = &new.phone {
        validation::max_len("phone", phone, validation::PHONE_MAX)?;
    }

    if get_user_by_username(db, &username).await?.is_some() {
        return Err(Error::validation(
            "username",
            "A user with that username already exists.",
        ));
    }

    let user = user::ActiveModel {
        username: Set(username),
        email: Set(new.email.trim().to_string()),
        first_name: Set(new.first_name),
        last_name: Set(new.last_name),
        role: Set(new.role),
        phone: Set(new.phone),
        ..Default::default()
    }
    .insert(db)
    .await?;

    info!(user_id = user.id, "Created user {}", user.display_name());
    Ok(user)
}

/// Finds a user by primary key.
pub async fn get_user(db: &DatabaseConnection, user_id: i64) -> Result<user::Model> {
    User::find_by_id(user_id)
        .one(db)
        .await?
        .ok_or(Error::NotFound {
            entity: "User",
            id: user_id,
        })
}

/// Finds a user by login name.
pub async fn get_user_by_username(
    db: &DatabaseConnection,
    username: &str,
) -> Result<Option<user::Model>> {
    User::find()
        .filter(user::Column::Username.eq(username))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Ensures a referenced user exists, reporting a validation error on `field` otherwise.
pub(crate) async fn ensure_exists<C>(db: &C, user_id: i64, field: &str) -> Result<user::Model>
where
    C: ConnectionTrait,
{
    User::find_by_id(user_id)
        .one(db)
        .await?
        .ok_or_else(|| {
            Error::validation(
                field,
                format!("Invalid pk \"{user_id}\" - object does not exist."),
            )
        })
}
