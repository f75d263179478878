//! Audit log entity - Immutable record of one mutation of a lead or contact.
//!
//! Rows are append-only through this crate: the active model behavior stamps
//! the timestamp on insert and refuses to update or delete an existing row.
//! The store itself does not enforce this.

use sea_orm::{Set, entity::prelude::*};
use serde::{Deserialize, Serialize};

/// Kind of mutation that was recorded.
#[derive(
    Copy, Clone, Debug, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "lowercase")]
pub enum AuditAction {
    /// Entity was inserted
    #[sea_orm(string_value = "create")]
    Create,
    /// Entity was modified
    #[sea_orm(string_value = "update")]
    Update,
    /// Entity was removed
    #[sea_orm(string_value = "delete")]
    Delete,
}

impl AuditAction {
    /// Human-readable label, as shown in activity feeds.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Create => "Create",
            Self::Update => "Update",
            Self::Delete => "Delete",
        }
    }
}

/// Audit log database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "audit_logs")]
pub struct Model {
    /// Unique identifier for the entry
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Acting user, None for system actions or once the user is removed
    pub user_id: Option<i64>,
    /// What happened
    pub action: AuditAction,
    /// Entity type name of the target (e.g., `"Lead"`)
    #[sea_orm(indexed)]
    pub model_name: String,
    /// Primary key of the target
    #[sea_orm(indexed)]
    pub object_id: i64,
    /// Human-readable form of the target at the time of the action
    pub object_repr: String,
    /// Changed tracked fields as `{field: {old, new}}`, empty for create and delete
    pub changes: Json,
    /// When the entry was written
    #[sea_orm(indexed)]
    pub timestamp: DateTimeUtc,
    /// Originating client address, if known
    pub ip_address: Option<String>,
}

/// Defines relationships between AuditLog and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each entry may reference the acting user
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id",
        on_delete = "SetNull"
    )]
    User,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

#[async_trait::async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C>(mut self, _db: &C, insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        if !insert {
            return Err(DbErr::Custom(
                "audit log entries are append-only and cannot be updated".to_string(),
            ));
        }
        self.timestamp = Set(chrono::Utc::now());
        Ok(self)
    }

    async fn before_delete<C>(self, _db: &C) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        Err(DbErr::Custom(
            "audit log entries are append-only and cannot be deleted".to_string(),
        ))
    }
}
