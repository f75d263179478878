//! Reminder entity - A scheduled follow-up on a lead for one user.
//!
//! Reminders start `pending`. They move to `sent` through the reminder
//! scheduler (periodic sweep or deferred dispatch) and may be `cancelled`
//! by a user. A reminder is overdue while it is pending past its date.

use chrono::{DateTime, Utc};
use sea_orm::{Set, entity::prelude::*};
use serde::{Deserialize, Serialize};

/// Delivery state of a reminder.
#[derive(
    Copy, Clone, Debug, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "lowercase")]
pub enum ReminderStatus {
    /// Waiting for its date
    #[sea_orm(string_value = "pending")]
    Pending,
    /// Notification dispatched
    #[sea_orm(string_value = "sent")]
    Sent,
    /// Withdrawn by a user
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
}

/// Reminder database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "reminders")]
pub struct Model {
    /// Unique identifier for the reminder
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Lead the follow-up is about
    #[sea_orm(indexed)]
    pub lead_id: i64,
    /// User to notify
    #[sea_orm(indexed)]
    pub user_id: i64,
    /// Short title, used as the notification subject
    pub title: String,
    /// Longer description, may be blank
    #[sea_orm(column_type = "Text")]
    pub description: String,
    /// When the reminder falls due
    #[sea_orm(indexed)]
    pub reminder_date: DateTimeUtc,
    /// Delivery state
    pub status: ReminderStatus,
    /// When the reminder was created
    pub created_at: DateTimeUtc,
    /// When the reminder was last modified
    pub updated_at: DateTimeUtc,
}

impl Model {
    /// A reminder is overdue while it is still pending and its date has passed.
    #[must_use]
    pub fn is_overdue_at(&self, now: DateTime<Utc>) -> bool {
        self.status == ReminderStatus::Pending && self.reminder_date < now
    }

    /// [`Self::is_overdue_at`] evaluated against the current clock.
    #[must_use]
    pub fn is_overdue(&self) -> bool {
        self.is_overdue_at(Utc::now())
    }
}

/// Defines relationships between Reminder and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each reminder belongs to one lead
    #[sea_orm(
        belongs_to = "super::lead::Entity",
        from = "Column::LeadId",
        to = "super::lead::Column::Id",
        on_delete = "Cascade"
    )]
    Lead,
    /// Each reminder is addressed to one user
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    User,
}

impl Related<super::lead::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Lead.def()
    }
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
        let now = Utc::now();
        if insert {
            self.created_at = Set(now);
        }
        self.updated_at = Set(now);
        Ok(self)
    }
}
