//! Dashboard statistics - a read-only summary of the pipeline for the
//! requesting user.

use crate::{
    core::{
        audit,
        context::RequestContext,
        permissions::{ResourceKind, Verb, authorize},
        reminder,
    },
    entities::{
        AuditAction, Contact, Lead, LeadStatus, Note, Reminder, ReminderStatus, lead,
        reminder as reminder_entity,
    },
    errors::Result,
};
use chrono::{DateTime, Utc};
use sea_orm::{ActiveEnum, FromQueryResult, PaginatorTrait, QuerySelect, prelude::*};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::debug;

const RECENT_ACTIVITY_LIMIT: u64 = 10;
const UPCOMING_REMINDER_LIMIT: u64 = 5;

/// One line of the recent activity feed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ActivityItem {
    pub id: i64,
    /// Acting username, `System` when no user is recorded
    pub user: String,
    pub action: AuditAction,
    pub model: String,
    pub object: String,
    pub timestamp: DateTime<Utc>,
}

/// One of the requester's next reminders.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct UpcomingReminder {
    pub id: i64,
    pub title: String,
    /// Name of the lead the reminder is about
    pub lead: String,
    pub date: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DashboardStats {
    pub total_leads: u64,
    pub user_total_leads: u64,
    pub new_leads: u64,
    pub contacted_leads: u64,
    pub qualified_leads: u64,
    pub converted_leads: u64,
    pub lost_leads: u64,
    pub total_value: Decimal,
    pub user_total_value: Decimal,
    /// Lead count per status value; statuses without leads are absent
    pub status_distribution: BTreeMap<String, u64>,
    /// Lead count per priority value; priorities without leads are absent
    pub priority_distribution: BTreeMap<String, u64>,
    pub recent_activity: Vec<ActivityItem>,
    pub upcoming_reminders: Vec<UpcomingReminder>,
    pub overdue_reminders_count: u64,
    pub total_contacts: u64,
    pub total_notes: u64,
}

impl DashboardStats {
    fn status_count(&self, status: LeadStatus) -> u64 {
        self.status_distribution
            .get(&status.to_value())
            .copied()
            .unwrap_or_default()
    }
}

/// Sum of estimated values in cents, so the total stays exact whatever
/// numeric type the store hands back.
const VALUE_CENTS_SUM: &str = "COALESCE(SUM(CAST(ROUND(estimated_value * 100) AS INTEGER)), 0)";

#[derive(Debug, FromQueryResult)]
struct GroupCount {
    key: String,
    total: i64,
}

#[derive(Debug, Default, FromQueryResult)]
struct LeadTotals {
    leads: i64,
    cents: i64,
}

/// Lead count per distinct value of `column`.
async fn count_leads_by(db: &DatabaseConnection, column: lead::Column) -> Result<BTreeMap<String, u64>> {
    let rows = Lead::find()
        .select_only()
        .column_as(column, "key")
        .column_as(Expr::col(lead::Column::Id).count(), "total")
        .group_by(column)
        .into_model::<GroupCount>()
        .all(db)
        .await?;
    Ok(rows
        .into_iter()
        .map(|row| (row.key, u64::try_from(row.total).unwrap_or_default()))
        .collect())
}

/// Lead count and summed estimated value, optionally for one owner.
async fn lead_totals(db: &DatabaseConnection, owner_id: Option<i64>) -> Result<(u64, Decimal)> {
    let mut query = Lead::find()
        .select_only()
        .column_as(Expr::col(lead::Column::Id).count(), "leads")
        .column_as(Expr::cust(VALUE_CENTS_SUM), "cents");
    if let Some(owner_id) = owner_id {
        query = query.filter(lead::Column::OwnerId.eq(owner_id));
    }
    let totals = query.into_model::<LeadTotals>().one(db).await?.unwrap_or_default();
    Ok((
        u64::try_from(totals.leads).unwrap_or_default(),
        Decimal::new(totals.cents, 2),
    ))
}

/// Computes the dashboard for the requesting user.
pub async fn dashboard_stats(
    db: &DatabaseConnection,
    ctx: &RequestContext,
) -> Result<DashboardStats> {
    let user = authorize(ctx.user(), Verb::Retrieve, ResourceKind::Dashboard)?;
    let now = Utc::now();

    let (total_leads, total_value) = lead_totals(db, None).await?;
    let (user_total_leads, user_total_value) = lead_totals(db, Some(user.id)).await?;
    let status_distribution = count_leads_by(db, lead::Column::Status).await?;
    let priority_distribution = count_leads_by(db, lead::Column::Priority).await?;

    let recent_activity = audit::recent_activity(db, RECENT_ACTIVITY_LIMIT)
        .await?
        .into_iter()
        .map(|(log, actor)| ActivityItem {
            id: log.id,
            user: actor.map_or_else(|| "System".to_string(), |u| u.username),
            action: log.action,
            model: log.model_name,
            object: log.object_repr,
            timestamp: log.timestamp,
        })
        .collect();

    let upcoming_reminders = reminder::upcoming_for_user(db, user.id, now, UPCOMING_REMINDER_LIMIT)
        .await?
        .into_iter()
        .map(|(reminder, lead)| UpcomingReminder {
            id: reminder.id,
            title: reminder.title,
            lead: lead.map(|l| l.name).unwrap_or_default(),
            date: reminder.reminder_date,
        })
        .collect();

    let overdue_reminders_count = Reminder::find()
        .filter(reminder_entity::Column::UserId.eq(user.id))
        .filter(reminder_entity::Column::Status.eq(ReminderStatus::Pending))
        .filter(reminder_entity::Column::ReminderDate.lt(now))
        .count(db)
        .await?;

    let mut stats = DashboardStats {
        total_leads,
        user_total_leads,
        new_leads: 0,
        contacted_leads: 0,
        qualified_leads: 0,
        converted_leads: 0,
        lost_leads: 0,
        total_value,
        user_total_value,
        status_distribution,
        priority_distribution,
        recent_activity,
        upcoming_reminders,
        overdue_reminders_count,
        total_contacts: Contact::find().count(db).await?,
        total_notes: Note::find().count(db).await?,
    };
    stats.new_leads = stats.status_count(LeadStatus::New);
    stats.contacted_leads = stats.status_count(LeadStatus::Contacted);
    stats.qualified_leads = stats.status_count(LeadStatus::Qualified);
    stats.converted_leads = stats.status_count(LeadStatus::Converted);
    stats.lost_leads = stats.status_count(LeadStatus::Lost);

    debug!(user_id = user.id, total_leads = stats.total_leads, "Computed dashboard");
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::lead::{LeadChanges, update_lead};
    use crate::entities::Priority;
    use crate::errors::Error;
    use crate::test_utils::*;
    use chrono::Duration;
    use sea_orm::{IntoActiveModel, Set};

    #[tokio::test]
    async fn test_dashboard_counts_and_values() -> Result<()> {
        let db = setup_test_db().await?;
        let manager = create_test_manager(&db, "akinyi").await?;
        let agent = create_test_agent(&db, "otieno").await?;

        let mine = create_lead_owned_by(&db, &agent, "Peter Mwangi").await?;
        let mut valued = mine.clone().into_active_model();
        valued.estimated_value = Set(Some(Decimal::new(150_000, 0)));
        valued.update(&db).await?;
        let theirs = create_lead_owned_by(&db, &manager, "Grace Achieng").await?;
        let mut valued = theirs.clone().into_active_model();
        valued.estimated_value = Set(Some(Decimal::new(50_000, 0)));
        valued.priority = Set(Priority::High);
        valued.update(&db).await?;
        create_lead_owned_by(&db, &manager, "Brian Kiprop").await?;

        let ctx = RequestContext::authenticated(agent.clone());
        update_lead(
            &db,
            &ctx,
            mine.id,
            LeadChanges {
                status: Some(LeadStatus::Qualified),
                ..Default::default()
            },
        )
        .await?;

        let contact = create_contact_for(&db, &mine, "Mary Njeri").await?;
        create_correspondence_for(&db, &contact, &agent).await?;
        create_note_for(&db, &mine, &agent).await?;
        let now = Utc::now();
        create_reminder_for(&db, &mine, &agent, now - Duration::hours(2)).await?;
        let next = create_reminder_for(&db, &mine, &agent, now + Duration::hours(2)).await?;
        create_reminder_for(&db, &mine, &manager, now + Duration::hours(1)).await?;

        let stats = dashboard_stats(&db, &ctx).await?;
        assert_eq!(stats.total_leads, 3);
        assert_eq!(stats.user_total_leads, 1);
        assert_eq!(stats.new_leads, 2);
        assert_eq!(stats.qualified_leads, 1);
        assert_eq!(stats.lost_leads, 0);
        assert_eq!(stats.total_value, Decimal::new(200_000, 0));
        assert_eq!(stats.user_total_value, Decimal::new(150_000, 0));
        assert_eq!(stats.status_distribution.get("qualified"), Some(&1));
        assert!(!stats.status_distribution.contains_key("lost"));
        assert_eq!(stats.priority_distribution.get("high"), Some(&1));
        assert_eq!(stats.priority_distribution.get("medium"), Some(&2));
        assert_eq!(stats.overdue_reminders_count, 1);
        assert_eq!(stats.total_contacts, 1);
        assert_eq!(stats.total_notes, 1);

        assert_eq!(stats.upcoming_reminders.len(), 1);
        assert_eq!(stats.upcoming_reminders[0].id, next.id);
        assert_eq!(stats.upcoming_reminders[0].lead, "Peter Mwangi");

        assert_eq!(stats.recent_activity.len(), 1);
        assert_eq!(stats.recent_activity[0].user, "otieno");
        assert_eq!(stats.recent_activity[0].action, AuditAction::Update);
        Ok(())
    }

    #[tokio::test]
    async fn test_dashboard_totals_keep_cents() -> Result<()> {
        let db = setup_test_db().await?;
        let agent = create_test_agent(&db, "otieno").await?;
        let ctx = RequestContext::authenticated(agent.clone());

        let empty = dashboard_stats(&db, &ctx).await?;
        assert_eq!(empty.total_leads, 0);
        assert_eq!(empty.total_value, Decimal::ZERO);
        assert!(empty.status_distribution.is_empty());

        for (name, cents) in [("Peter Mwangi", 1_050_i64), ("Grace Achieng", 99_999_999_99)] {
            let lead = create_lead_owned_by(&db, &agent, name).await?;
            let mut valued = lead.into_active_model();
            valued.estimated_value = Set(Some(Decimal::new(cents, 2)));
            valued.update(&db).await?;
        }

        let stats = dashboard_stats(&db, &ctx).await?;
        assert_eq!(stats.total_leads, 2);
        assert_eq!(stats.user_total_leads, 2);
        assert_eq!(stats.total_value, Decimal::new(100_000_010_49, 2));
        assert_eq!(stats.user_total_value, stats.total_value);
        assert_eq!(stats.new_leads, 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_dashboard_requires_authentication() -> Result<()> {
        let db = setup_test_db().await?;
        let denied = dashboard_stats(&db, &RequestContext::anonymous()).await;
        assert!(matches!(denied, Err(Error::AuthorizationDenied { .. })));
        Ok(())
    }
}
