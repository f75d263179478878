//! Note business logic - free-text annotations on a lead.
//!
//! Notes are not audited. The author is always the user who wrote the note.

use crate::{
    core::{
        context::RequestContext,
        lead::referenced_lead,
        permissions::{ResourceKind, Verb, authorize},
    },
    entities::{Note, note},
    errors::{Error, Result},
};
use sea_orm::{Condition, IntoActiveModel, QueryOrder, Set, prelude::*};
use tracing::info;

fn validate_content(content: &str) -> Result<()> {
    if content.trim().is_empty() {
        return Err(Error::validation("content", "This field may not be blank."));
    }
    Ok(())
}

/// Adds a note to a lead, authored by the requesting user.
pub async fn create_note(
    db: &DatabaseConnection,
    ctx: &RequestContext,
    lead_id: i64,
    content: &str,
) -> Result<note::Model> {
    let user = authorize(ctx.user(), Verb::Create, ResourceKind::Note)?;
    validate_content(content)?;
    let lead = referenced_lead(db, lead_id).await?;

    let note = note::ActiveModel {
        lead_id: Set(lead.id),
        author_id: Set(Some(user.id)),
        content: Set(content.to_string()),
        ..Default::default()
    }
    .insert(db)
    .await?;

    info!(note_id = note.id, lead_id, user = %user.username, "Added note");
    Ok(note)
}

/// Replaces the text of a note.
pub async fn update_note(
    db: &DatabaseConnection,
    ctx: &RequestContext,
    note_id: i64,
    content: &str,
) -> Result<note::Model> {
    authorize(ctx.user(), Verb::Update, ResourceKind::Note)?;
    let existing = find_note(db, note_id).await?;
    validate_content(content)?;

    let mut active = existing.into_active_model();
    active.content = Set(content.to_string());
    Ok(active.update(db).await?)
}

/// Deletes a note. Managers only.
pub async fn delete_note(db: &DatabaseConnection, ctx: &RequestContext, note_id: i64) -> Result<()> {
    let user = authorize(ctx.user(), Verb::Delete, ResourceKind::Note)?;
    let note = find_note(db, note_id).await?;
    note.delete(db).await?;
    info!(note_id, user = %user.username, "Deleted note");
    Ok(())
}

pub async fn get_note(
    db: &DatabaseConnection,
    ctx: &RequestContext,
    note_id: i64,
) -> Result<note::Model> {
    authorize(ctx.user(), Verb::Retrieve, ResourceKind::Note)?;
    find_note(db, note_id).await
}

/// Filters for [`list_notes`]. Unset fields do not restrict.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NoteFilter {
    pub lead_id: Option<i64>,
    pub author_id: Option<i64>,
    /// Substring match on the content
    pub search: Option<String>,
}

/// Notes, newest first.
pub async fn list_notes(
    db: &DatabaseConnection,
    ctx: &RequestContext,
    filter: &NoteFilter,
) -> Result<Vec<note::Model>> {
    authorize(ctx.user(), Verb::List, ResourceKind::Note)?;

    let mut condition = Condition::all();
    if let Some(lead_id) = filter.lead_id {
        condition = condition.add(note::Column::LeadId.eq(lead_id));
    }
    if let Some(author_id) = filter.author_id {
        condition = condition.add(note::Column::AuthorId.eq(author_id));
    }
    if let Some(term) = filter.search.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
        condition = condition.add(note::Column::Content.contains(term));
    }

    Ok(Note::find()
        .filter(condition)
        .order_by_desc(note::Column::CreatedAt)
        .order_by_desc(note::Column::Id)
        .all(db)
        .await?)
}

async fn find_note(db: &DatabaseConnection, note_id: i64) -> Result<note::Model> {
    Note::find_by_id(note_id)
        .one(db)
        .await?
        .ok_or(Error::NotFound {
            entity: "Note",
            id: note_id,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::AuditLog;
    use crate::test_utils::*;
    use sea_orm::PaginatorTrait;

    #[tokio::test]
    async fn test_note_lifecycle() -> Result<()> {
        let db = setup_test_db().await?;
        let manager = create_test_manager(&db, "akinyi").await?;
        let agent = create_test_agent(&db, "otieno").await?;
        let lead = create_lead_owned_by(&db, &agent, "Peter Mwangi").await?;
        let agent_ctx = RequestContext::authenticated(agent.clone());

        let note = create_note(&db, &agent_ctx, lead.id, "Called, asked for a quote").await?;
        assert_eq!(note.author_id, Some(agent.id));

        let edited = update_note(&db, &agent_ctx, note.id, "Quote sent on Monday").await?;
        assert_eq!(edited.content, "Quote sent on Monday");
        assert!(edited.updated_at >= note.updated_at);

        let denied = delete_note(&db, &agent_ctx, note.id).await;
        assert!(matches!(denied, Err(Error::AuthorizationDenied { .. })));

        delete_note(&db, &RequestContext::authenticated(manager), note.id).await?;
        let for_lead = NoteFilter {
            lead_id: Some(lead.id),
            ..Default::default()
        };
        assert!(list_notes(&db, &agent_ctx, &for_lead).await?.is_empty());
        assert_eq!(AuditLog::find().count(&db).await?, 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_note_rejects_blank_content_and_unknown_lead() -> Result<()> {
        let db = setup_test_db().await?;
        let agent = create_test_agent(&db, "otieno").await?;
        let lead = create_lead_owned_by(&db, &agent, "Peter Mwangi").await?;
        let ctx = RequestContext::authenticated(agent);

        let blank = create_note(&db, &ctx, lead.id, "   ").await;
        assert!(matches!(blank, Err(Error::Validation { field, .. }) if field == "content"));

        let orphan = create_note(&db, &ctx, 404, "Hello").await;
        assert!(matches!(orphan, Err(Error::Validation { field, .. }) if field == "lead_id"));

        assert_eq!(Note::find().count(&db).await?, 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_list_notes_by_lead() -> Result<()> {
        let db = setup_test_db().await?;
        let agent = create_test_agent(&db, "otieno").await?;
        let lead = create_lead_owned_by(&db, &agent, "Peter Mwangi").await?;
        let other = create_lead_owned_by(&db, &agent, "Grace Achieng").await?;
        let author = agent.clone();
        let ctx = RequestContext::authenticated(agent);

        let first = create_note(&db, &ctx, lead.id, "First").await?;
        let second = create_note(&db, &ctx, lead.id, "Second").await?;
        create_note(&db, &ctx, other.id, "Elsewhere").await?;

        let for_lead = NoteFilter {
            lead_id: Some(lead.id),
            ..Default::default()
        };
        let notes = list_notes(&db, &ctx, &for_lead).await?;
        let ids: Vec<i64> = notes.iter().map(|n| n.id).collect();
        assert_eq!(ids, [second.id, first.id]);
        assert_eq!(list_notes(&db, &ctx, &NoteFilter::default()).await?.len(), 3);

        let searched = NoteFilter {
            search: Some("where".to_string()),
            author_id: Some(author.id),
            ..Default::default()
        };
        assert_eq!(list_notes(&db, &ctx, &searched).await?.len(), 1);
        assert_eq!(get_note(&db, &ctx, first.id).await?.content, "First");
        Ok(())
    }
}
