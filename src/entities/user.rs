//! User entity - An authenticated CRM operator.
//!
//! The role is the only attribute with business meaning: it drives the
//! permission outcomes computed in [`crate::core::permissions`].

use sea_orm::{Set, entity::prelude::*};
use serde::{Deserialize, Serialize};

/// Role granted to a user. Managers hold a superset of agent privileges.
#[derive(
    Copy, Clone, Debug, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// May read, create, update and delete
    #[sea_orm(string_value = "manager")]
    Manager,
    /// May read, create and update
    #[sea_orm(string_value = "agent")]
    Agent,
}

impl Role {
    /// Human-readable label, as shown next to usernames.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Manager => "Manager",
            Self::Agent => "Agent",
        }
    }
}

/// User database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    /// Unique identifier for the user
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Login name, unique across the system
    #[sea_orm(unique)]
    pub username: String,
    /// Address reminder notifications are delivered to
    pub email: String,
    /// Given name, may be blank
    pub first_name: String,
    /// Family name, may be blank
    pub last_name: String,
    /// Permission role
    pub role: Role,
    /// Optional phone number
    pub phone: Option<String>,
    /// When the user was created
    pub created_at: DateTimeUtc,
}

impl Model {
    /// Whether this user holds the manager role.
    #[must_use]
    pub fn is_manager(&self) -> bool {
        self.role == Role::Manager
    }

    /// Display form used in listings, e.g. `"jkamau (Manager)"`.
    #[must_use]
    pub fn display_name(&self) -> String {
        format!("{} ({})", self.username, self.role.label())
    }
}

/// Users are referenced by other entities; the inverse relations are not navigated.
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

#[async_trait::async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C>(mut self, _db: &C, insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        if insert {
            self.created_at = Set(chrono::Utc::now());
        }
        Ok(self)
    }
}
