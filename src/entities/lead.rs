//! Lead entity - A prospective customer, the primary CRM record.
//!
//! A lead owns its contacts, notes and reminders: deleting a lead cascades to
//! all of them. The owner reference is cleared when the owning user is removed.

use sea_orm::{Set, entity::prelude::*};
use serde::{Deserialize, Serialize};

/// Pipeline stage of a lead.
#[derive(
    Copy, Clone, Debug, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "lowercase")]
pub enum LeadStatus {
    /// Freshly captured, nobody has reached out yet
    #[sea_orm(string_value = "new")]
    New,
    /// First contact made
    #[sea_orm(string_value = "contacted")]
    Contacted,
    /// Confirmed as a real opportunity
    #[sea_orm(string_value = "qualified")]
    Qualified,
    /// Opportunity abandoned
    #[sea_orm(string_value = "lost")]
    Lost,
    /// Became a customer
    #[sea_orm(string_value = "converted")]
    Converted,
}

/// How urgently a lead should be worked.
#[derive(
    Copy, Clone, Debug, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    /// Low priority
    #[sea_orm(string_value = "low")]
    Low,
    /// Medium priority (default)
    #[sea_orm(string_value = "medium")]
    Medium,
    /// High priority
    #[sea_orm(string_value = "high")]
    High,
}

/// Lead database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "leads")]
pub struct Model {
    /// Unique identifier for the lead
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Name of the prospect (e.g., "John Kamau")
    pub name: String,
    /// Company the prospect works for, may be blank
    pub company: String,
    /// Primary email address
    pub email: String,
    /// Phone number, may be blank
    pub phone: String,
    /// Pipeline stage
    pub status: LeadStatus,
    /// Work priority
    pub priority: Priority,
    /// Free-text origin of the lead (e.g., "Website", "Referral")
    pub source: String,
    /// User responsible for the lead, None once that user is removed
    #[sea_orm(indexed)]
    pub owner_id: Option<i64>,
    /// Estimated deal value
    #[sea_orm(column_type = "Decimal(Some((10, 2)))")]
    pub estimated_value: Option<Decimal>,
    /// Free-text description
    #[sea_orm(column_type = "Text")]
    pub description: String,
    /// When the lead was created
    pub created_at: DateTimeUtc,
    /// When the lead was last modified
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between Lead and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each lead may be owned by one user
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::OwnerId",
        to = "super::user::Column::Id",
        on_delete = "SetNull"
    )]
    Owner,
    /// One lead has many contacts
    #[sea_orm(has_many = "super::contact::Entity")]
    Contacts,
    /// One lead has many notes
    #[sea_orm(has_many = "super::note::Entity")]
    Notes,
    /// One lead has many reminders
    #[sea_orm(has_many = "super::reminder::Entity")]
    Reminders,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Owner.def()
    }
}

impl Related<super::contact::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Contacts.def()
    }
}

impl Related<super::note::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Notes.def()
    }
}

impl Related<super::reminder::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Reminders.def()
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
