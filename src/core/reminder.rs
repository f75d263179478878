//! Reminder business logic - follow-ups on a lead for one user.
//!
//! Users create, edit, cancel and delete reminders. The `pending -> sent`
//! transition belongs to the reminder scheduler and goes through
//! [`mark_sent`], a conditional update that is safe to repeat.

use crate::{
    core::{
        context::RequestContext,
        lead::referenced_lead,
        permissions::{ResourceKind, Verb, authorize},
        user::ensure_exists,
        validation::{self, NAME_MAX},
    },
    entities::{Lead, Reminder, ReminderStatus, User, lead, reminder, user},
    errors::{Error, Result},
};
use chrono::{DateTime, Utc};
use sea_orm::{
    Condition, IntoActiveModel, QueryOrder, QuerySelect, Set, prelude::*, sea_query::Expr,
};
use tracing::{debug, info};

/// Input for [`create_reminder`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewReminder {
    pub lead_id: i64,
    /// User to remind; the requesting user when None
    pub user_id: Option<i64>,
    pub title: String,
    pub description: String,
    pub reminder_date: DateTime<Utc>,
}

impl NewReminder {
    #[must_use]
    pub fn new(lead_id: i64, title: &str, reminder_date: DateTime<Utc>) -> Self {
        Self {
            lead_id,
            user_id: None,
            title: title.to_string(),
            description: String::new(),
            reminder_date,
        }
    }
}

/// Partial update for [`update_reminder`]. Status is not editable here.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReminderChanges {
    pub user_id: Option<i64>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub reminder_date: Option<DateTime<Utc>>,
}

/// Creates a pending reminder. Dispatch is arranged by the scheduler.
pub async fn create_reminder(
    db: &DatabaseConnection,
    ctx: &RequestContext,
    new: NewReminder,
) -> Result<reminder::Model> {
    let user = authorize(ctx.user(), Verb::Create, ResourceKind::Reminder)?;

    validation::required("title", &new.title, NAME_MAX)?;
    let lead = referenced_lead(db, new.lead_id).await?;
    let recipient_id = new.user_id.unwrap_or(user.id);
    ensure_exists(db, recipient_id, "user_id").await?;

    let reminder = reminder::ActiveModel {
        lead_id: Set(lead.id),
        user_id: Set(recipient_id),
        title: Set(new.title.trim().to_string()),
        description: Set(new.description),
        reminder_date: Set(new.reminder_date),
        status: Set(ReminderStatus::Pending),
        ..Default::default()
    }
    .insert(db)
    .await?;

    info!(
        reminder_id = reminder.id,
        lead_id = lead.id,
        recipient_id,
        due = %reminder.reminder_date,
        "Created reminder '{}'",
        reminder.title
    );
    Ok(reminder)
}

pub async fn update_reminder(
    db: &DatabaseConnection,
    ctx: &RequestContext,
    reminder_id: i64,
    changes: ReminderChanges,
) -> Result<reminder::Model> {
    authorize(ctx.user(), Verb::Update, ResourceKind::Reminder)?;
    let existing = find_reminder(db, reminder_id).await?;

    if let Some(title) = &changes.title {
        validation::required("title", title, NAME_MAX)?;
    }
    if let Some(user_id) = changes.user_id {
        ensure_exists(db, user_id, "user_id").await?;
    }

    let mut active = existing.into_active_model();
    if let Some(user_id) = changes.user_id {
        active.user_id = Set(user_id);
    }
    if let Some(title) = changes.title {
        active.title = Set(title.trim().to_string());
    }
    if let Some(description) = changes.description {
        active.description = Set(description);
    }
    if let Some(date) = changes.reminder_date {
        active.reminder_date = Set(date);
    }
    Ok(active.update(db).await?)
}

/// Withdraws a pending reminder.
///
/// Cancelling an already cancelled reminder changes nothing. A reminder that
/// has been sent can no longer be cancelled.
pub async fn cancel_reminder(
    db: &DatabaseConnection,
    ctx: &RequestContext,
    reminder_id: i64,
) -> Result<reminder::Model> {
    let user = authorize(ctx.user(), Verb::Update, ResourceKind::Reminder)?;

    // same race discipline as mark_sent: only a pending row moves
    let moved = transition(db, reminder_id, ReminderStatus::Cancelled).await?;
    let reminder = find_reminder(db, reminder_id).await?;
    match reminder.status {
        ReminderStatus::Cancelled => {
            if moved {
                info!(reminder_id, user = %user.username, "Cancelled reminder");
            }
            Ok(reminder)
        }
        ReminderStatus::Sent => Err(Error::validation(
            "status",
            "A reminder that has been sent cannot be cancelled.",
        )),
        ReminderStatus::Pending => Ok(reminder),
    }
}

/// Deletes a reminder. Managers only.
pub async fn delete_reminder(
    db: &DatabaseConnection,
    ctx: &RequestContext,
    reminder_id: i64,
) -> Result<()> {
    let user = authorize(ctx.user(), Verb::Delete, ResourceKind::Reminder)?;
    let reminder = find_reminder(db, reminder_id).await?;
    reminder.delete(db).await?;
    info!(reminder_id, user = %user.username, "Deleted reminder");
    Ok(())
}

pub async fn get_reminder(
    db: &DatabaseConnection,
    ctx: &RequestContext,
    reminder_id: i64,
) -> Result<reminder::Model> {
    authorize(ctx.user(), Verb::Retrieve, ResourceKind::Reminder)?;
    find_reminder(db, reminder_id).await
}

/// Filters for [`list_reminders`]. Unset fields do not restrict.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReminderFilter {
    pub lead_id: Option<i64>,
    pub user_id: Option<i64>,
    pub status: Option<ReminderStatus>,
    /// Substring match on title and description
    pub search: Option<String>,
}

/// Reminders ordered by due date, earliest first.
pub async fn list_reminders(
    db: &DatabaseConnection,
    ctx: &RequestContext,
    filter: &ReminderFilter,
) -> Result<Vec<reminder::Model>> {
    authorize(ctx.user(), Verb::List, ResourceKind::Reminder)?;

    let mut condition = Condition::all();
    if let Some(lead_id) = filter.lead_id {
        condition = condition.add(reminder::Column::LeadId.eq(lead_id));
    }
    if let Some(user_id) = filter.user_id {
        condition = condition.add(reminder::Column::UserId.eq(user_id));
    }
    if let Some(status) = filter.status {
        condition = condition.add(reminder::Column::Status.eq(status));
    }
    if let Some(term) = filter.search.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
        condition = condition.add(
            Condition::any()
                .add(reminder::Column::Title.contains(term))
                .add(reminder::Column::Description.contains(term)),
        );
    }

    let reminders = Reminder::find()
        .filter(condition)
        .order_by_asc(reminder::Column::ReminderDate)
        .order_by_asc(reminder::Column::Id)
        .all(db)
        .await?;
    debug!("Fetched {} reminders.", reminders.len());
    Ok(reminders)
}

/// The requesting user's pending reminders.
pub async fn my_reminders(
    db: &DatabaseConnection,
    ctx: &RequestContext,
) -> Result<Vec<reminder::Model>> {
    let user = authorize(ctx.user(), Verb::List, ResourceKind::Reminder)?;
    let filter = ReminderFilter {
        user_id: Some(user.id),
        status: Some(ReminderStatus::Pending),
        ..Default::default()
    };
    list_reminders(db, ctx, &filter).await
}

/// Pending reminders of every user whose date has passed.
pub async fn overdue_reminders(
    db: &DatabaseConnection,
    ctx: &RequestContext,
) -> Result<Vec<reminder::Model>> {
    authorize(ctx.user(), Verb::List, ResourceKind::Reminder)?;
    Ok(Reminder::find()
        .filter(reminder::Column::Status.eq(ReminderStatus::Pending))
        .filter(reminder::Column::ReminderDate.lt(Utc::now()))
        .order_by_asc(reminder::Column::ReminderDate)
        .all(db)
        .await?)
}

/// Pending reminders due at or before `now`, oldest first.
pub(crate) async fn due_reminders(
    db: &DatabaseConnection,
    now: DateTime<Utc>,
) -> Result<Vec<reminder::Model>> {
    Ok(Reminder::find()
        .filter(reminder::Column::Status.eq(ReminderStatus::Pending))
        .filter(reminder::Column::ReminderDate.lte(now))
        .order_by_asc(reminder::Column::ReminderDate)
        .order_by_asc(reminder::Column::Id)
        .all(db)
        .await?)
}

/// Moves a pending reminder to `sent`. Returns false, without error, when the
/// reminder is no longer pending.
pub(crate) async fn mark_sent(db: &DatabaseConnection, reminder_id: i64) -> Result<bool> {
    transition(db, reminder_id, ReminderStatus::Sent).await
}

async fn transition(db: &DatabaseConnection, reminder_id: i64, to: ReminderStatus) -> Result<bool> {
    let result = Reminder::update_many()
        .col_expr(reminder::Column::Status, Expr::value(to))
        .col_expr(reminder::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(reminder::Column::Id.eq(reminder_id))
        .filter(reminder::Column::Status.eq(ReminderStatus::Pending))
        .exec(db)
        .await?;
    Ok(result.rows_affected == 1)
}

/// A reminder with the lead it is about and the user it is for.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReminderDetails {
    pub reminder: reminder::Model,
    pub lead: lead::Model,
    pub user: user::Model,
}

/// Loads a reminder together with its lead and recipient.
pub(crate) async fn reminder_details(
    db: &DatabaseConnection,
    reminder: reminder::Model,
) -> Result<ReminderDetails> {
    let lead = Lead::find_by_id(reminder.lead_id)
        .one(db)
        .await?
        .ok_or(Error::NotFound {
            entity: "Lead",
            id: reminder.lead_id,
        })?;
    let user = User::find_by_id(reminder.user_id)
        .one(db)
        .await?
        .ok_or(Error::NotFound {
            entity: "User",
            id: reminder.user_id,
        })?;
    Ok(ReminderDetails {
        reminder,
        lead,
        user,
    })
}

/// The `limit` next pending reminders of one user that are not yet due.
pub(crate) async fn upcoming_for_user(
    db: &DatabaseConnection,
    user_id: i64,
    now: DateTime<Utc>,
    limit: u64,
) -> Result<Vec<(reminder::Model, Option<lead::Model>)>> {
    Ok(Reminder::find()
        .find_also_related(Lead)
        .filter(reminder::Column::UserId.eq(user_id))
        .filter(reminder::Column::Status.eq(ReminderStatus::Pending))
        .filter(reminder::Column::ReminderDate.gte(now))
        .order_by_asc(reminder::Column::ReminderDate)
        .limit(limit)
        .all(db)
        .await?)
}

pub(crate) async fn find_reminder(
    db: &DatabaseConnection,
    reminder_id: i64,
) -> Result<reminder::Model> {
    Reminder::find_by_id(reminder_id)
        .one(db)
        .await?
        .ok_or(Error::NotFound {
            entity: "Reminder",
            id: reminder_id,
        })
}
