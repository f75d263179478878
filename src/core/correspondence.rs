//! Correspondence business logic - the log of emails, calls and meetings with
//! a contact. Entries are attributed to the user who logged them.

use crate::{
    core::{
        context::RequestContext,
        contact::find_contact,
        permissions::{ResourceKind, Verb, authorize},
        validation::{self, NAME_MAX},
    },
    entities::{Correspondence, CorrespondenceType, correspondence},
    errors::{Error, Result},
};
use chrono::{DateTime, Utc};
use sea_orm::{Condition, IntoActiveModel, QueryOrder, Set, prelude::*};
use tracing::info;

/// Input for [`log_correspondence`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewCorrespondence {
    pub contact_id: i64,
    pub kind: CorrespondenceType,
    pub subject: String,
    pub description: String,
    /// When it happened; now when None
    pub date: Option<DateTime<Utc>>,
}

impl NewCorrespondence {
    #[must_use]
    pub fn new(contact_id: i64, kind: CorrespondenceType, subject: &str) -> Self {
        Self {
            contact_id,
            kind,
            subject: subject.to_string(),
            description: String::new(),
            date: None,
        }
    }
}

/// Partial update for [`update_correspondence`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CorrespondenceChanges {
    pub kind: Option<CorrespondenceType>,
    pub subject: Option<String>,
    pub description: Option<String>,
    pub date: Option<DateTime<Utc>>,
}

/// Logs an interaction with a contact on behalf of the requesting user.
pub async fn log_correspondence(
    db: &DatabaseConnection,
    ctx: &RequestContext,
    new: NewCorrespondence,
) -> Result<correspondence::Model> {
    let user = authorize(ctx.user(), Verb::Create, ResourceKind::Correspondence)?;

    validation::required("subject", &new.subject, NAME_MAX)?;
    let contact = match find_contact(db, new.contact_id).await {
        Err(Error::NotFound { id, .. }) => {
            return Err(Error::validation(
                "contact_id",
                format!("Contact #{id} does not exist."),
            ));
        }
        found => found?,
    };

    let entry = correspondence::ActiveModel {
        contact_id: Set(contact.id),
        kind: Set(new.kind),
        subject: Set(new.subject.trim().to_string()),
        description: Set(new.description),
        date: Set(new.date.unwrap_or_else(Utc::now)),
        logged_by: Set(Some(user.id)),
        ..Default::default()
    }
    .insert(db)
    .await?;

    info!(
        correspondence_id = entry.id,
        contact_id = contact.id,
        kind = entry.kind.label(),
        user = %user.username,
        "Logged correspondence '{}'",
        entry.subject
    );
    Ok(entry)
}

pub async fn update_correspondence(
    db: &DatabaseConnection,
    ctx: &RequestContext,
    correspondence_id: i64,
    changes: CorrespondenceChanges,
) -> Result<correspondence::Model> {
    authorize(ctx.user(), Verb::Update, ResourceKind::Correspondence)?;
    let existing = find_correspondence(db, correspondence_id).await?;
    if let Some(subject) = &changes.subject {
        validation::required("subject", subject, NAME_MAX)?;
    }

    let mut active = existing.into_active_model();
    if let Some(kind) = changes.kind {
        active.kind = Set(kind);
    }
    if let Some(subject) = changes.subject {
        active.subject = Set(subject.trim().to_string());
    }
    if let Some(description) = changes.description {
        active.description = Set(description);
    }
    if let Some(date) = changes.date {
        active.date = Set(date);
    }
    Ok(active.update(db).await?)
}

/// Deletes a logged interaction. Managers only.
pub async fn delete_correspondence(
    db: &DatabaseConnection,
    ctx: &RequestContext,
    correspondence_id: i64,
) -> Result<()> {
    let user = authorize(ctx.user(), Verb::Delete, ResourceKind::Correspondence)?;
    let entry = find_correspondence(db, correspondence_id).await?;
    entry.delete(db).await?;
    info!(correspondence_id, user = %user.username, "Deleted correspondence");
    Ok(())
}

pub async fn get_correspondence(
    db: &DatabaseConnection,
    ctx: &RequestContext,
    correspondence_id: i64,
) -> Result<correspondence::Model> {
    authorize(ctx.user(), Verb::Retrieve, ResourceKind::Correspondence)?;
    find_correspondence(db, correspondence_id).await
}

/// Filters for [`list_correspondences`]. Unset fields do not restrict.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CorrespondenceFilter {
    pub contact_id: Option<i64>,
    pub kind: Option<CorrespondenceType>,
    pub logged_by: Option<i64>,
    /// Substring match on subject and description
    pub search: Option<String>,
}

/// Logged interactions, most recent first.
pub async fn list_correspondences(
    db: &DatabaseConnection,
    ctx: &RequestContext,
    filter: &CorrespondenceFilter,
) -> Result<Vec<correspondence::Model>> {
    authorize(ctx.user(), Verb::List, ResourceKind::Correspondence)?;

    let mut condition = Condition::all();
    if let Some(contact_id) = filter.contact_id {
        condition = condition.add(correspondence::Column::ContactId.eq(contact_id));
    }
    if let Some(kind) = filter.kind {
        condition = condition.add(correspondence::Column::Kind.eq(kind));
    }
    if let Some(logged_by) = filter.logged_by {
        condition = condition.add(correspondence::Column::LoggedBy.eq(logged_by));
    }
    if let Some(term) = filter.search.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
        condition = condition.add(
            Condition::any()
                .add(correspondence::Column::Subject.contains(term))
                .add(correspondence::Column::Description.contains(term)),
        );
    }

    Ok(Correspondence::find()
        .filter(condition)
        .order_by_desc(correspondence::Column::Date)
        .order_by_desc(correspondence::Column::Id)
        .all(db)
        .await?)
}

async fn find_correspondence(
    db: &DatabaseConnection,
    correspondence_id: i64,
) -> Result<correspondence::Model> {
    Correspondence::find_by_id(correspondence_id)
        .one(db)
        .await?
        .ok_or(Error::NotFound {
            entity: "Correspondence",
            id: correspondence_id,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::*;
    use chrono::Duration;

    #[tokio::test]
    async fn test_log_defaults_date_and_author() -> Result<()> {
        let db = setup_test_db().await?;
        let agent = create_test_agent(&db, "otieno").await?;
        let lead = create_lead_owned_by(&db, &agent, "Peter Mwangi").await?;
        let contact = create_contact_for(&db, &lead, "Mary Njeri").await?;
        let ctx = RequestContext::authenticated(agent.clone());

        let before = Utc::now();
        let entry = log_correspondence(
            &db,
            &ctx,
            NewCorrespondence::new(contact.id, CorrespondenceType::Phone, "Pricing follow-up"),
        )
        .await?;
        assert_eq!(entry.logged_by, Some(agent.id));
        assert!(entry.date >= before);
        assert_eq!(entry.kind.label(), "Phone Call");
        Ok(())
    }

    #[tokio::test]
    async fn test_log_rejects_unknown_contact_and_blank_subject() -> Result<()> {
        let db = setup_test_db().await?;
        let agent = create_test_agent(&db, "otieno").await?;
        let lead = create_lead_owned_by(&db, &agent, "Peter Mwangi").await?;
        let contact = create_contact_for(&db, &lead, "Mary Njeri").await?;
        let ctx = RequestContext::authenticated(agent);

        let orphan = log_correspondence(
            &db,
            &ctx,
            NewCorrespondence::new(404, CorrespondenceType::Email, "Hello"),
        )
        .await;
        assert!(matches!(orphan, Err(Error::Validation { field, .. }) if field == "contact_id"));

        let blank = log_correspondence(
            &db,
            &ctx,
            NewCorrespondence::new(contact.id, CorrespondenceType::Email, " "),
        )
        .await;
        assert!(matches!(blank, Err(Error::Validation { field, .. }) if field == "subject"));
        Ok(())
    }

    #[tokio::test]
    async fn test_list_filters_and_delete() -> Result<()> {
        let db = setup_test_db().await?;
        let manager = create_test_manager(&db, "akinyi").await?;
        let agent = create_test_agent(&db, "otieno").await?;
        let lead = create_lead_owned_by(&db, &agent, "Peter Mwangi").await?;
        let contact = create_contact_for(&db, &lead, "Mary Njeri").await?;
        let ctx = RequestContext::authenticated(agent);

        let mut older = NewCorrespondence::new(contact.id, CorrespondenceType::Meeting, "Site visit");
        older.date = Some(Utc::now() - Duration::days(3));
        older.description = "Walked through the Mombasa warehouse".to_string();
        let older = log_correspondence(&db, &ctx, older).await?;
        let newer = log_correspondence(
            &db,
            &ctx,
            NewCorrespondence::new(contact.id, CorrespondenceType::Email, "Proposal"),
        )
        .await?;

        let all = list_correspondences(&db, &ctx, &CorrespondenceFilter::default()).await?;
        let ids: Vec<i64> = all.iter().map(|c| c.id).collect();
        assert_eq!(ids, [newer.id, older.id]);

        let meetings = CorrespondenceFilter {
            kind: Some(CorrespondenceType::Meeting),
            ..Default::default()
        };
        assert_eq!(list_correspondences(&db, &ctx, &meetings).await?.len(), 1);

        let searched = CorrespondenceFilter {
            search: Some("Mombasa".to_string()),
            ..Default::default()
        };
        assert_eq!(list_correspondences(&db, &ctx, &searched).await?[0].id, older.id);

        let renamed = update_correspondence(
            &db,
            &ctx,
            newer.id,
            CorrespondenceChanges {
                subject: Some("Revised proposal".to_string()),
                ..Default::default()
            },
        )
        .await?;
        assert_eq!(renamed.subject, "Revised proposal");

        assert!(delete_correspondence(&db, &ctx, older.id).await.is_err());
        delete_correspondence(&db, &RequestContext::authenticated(manager), older.id).await?;
        assert!(matches!(
            get_correspondence(&db, &ctx, older.id).await,
            Err(Error::NotFound { .. })
        ));
        Ok(())
    }
}
