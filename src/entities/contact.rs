//! Contact entity - A person at a lead's company.
//!
//! Contacts are owned by exactly one lead and are destroyed with it. Several
//! contacts of the same lead may carry `is_primary`; nothing enforces a single one.

use sea_orm::{Set, entity::prelude::*};
use serde::{Deserialize, Serialize};

/// Contact database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "contacts")]
pub struct Model {
    /// Unique identifier for the contact
    #[sea_orm(primary_key)]
    pub id: i64,
    /// ID of the lead this contact belongs to
    #[sea_orm(indexed)]
    pub lead_id: i64,
    /// Full name
    pub name: String,
    /// Email address
    pub email: String,
    /// Phone number, may be blank
    pub phone: String,
    /// Job title, may be blank
    pub position: String,
    /// Whether this is the main person to talk to
    pub is_primary: bool,
    /// Free-text notes about the person
    #[sea_orm(column_type = "Text")]
    pub notes: String,
    /// When the contact was created
    pub created_at: DateTimeUtc,
    /// When the contact was last modified
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between Contact and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each contact belongs to one lead
    #[sea_orm(
        belongs_to = "super::lead::Entity",
        from = "Column::LeadId",
        to = "super::lead::Column::Id",
        on_delete = "Cascade"
    )]
    Lead,
    /// One contact has many logged correspondences
    #[sea_orm(has_many = "super::correspondence::Entity")]
    Correspondences,
}

impl Related<super::lead::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Lead.def()
    }
}

impl Related<super::correspondence::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Correspondences.def()
    }
}

#[async_trait::async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C>(mut self, _db: &C, insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        let now = chrono::Utc::now();
        if insert {
            self.created_at = Set(now);
        }
        self.updated_at = Set(now);
        Ok(self)
    }
}
