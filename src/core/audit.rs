//! Audit logger - append-only record of who did what to which entity, and when.
//!
//! Recording is a sink, not a validator: it never rejects an entry for business
//! reasons. Store failures propagate to the caller, whose mutation has already
//! committed by then. Reads are open to any authenticated user; there is no
//! write, update or delete operation on entries anywhere in this crate.

use crate::{
    core::{
        changes::ChangeSet,
        context::RequestContext,
        permissions::{ResourceKind, Verb, authorize},
        target::AuditTarget,
    },
    entities::{AuditAction, AuditLog, User, audit_log, user},
    errors::{Error, Result},
};
use sea_orm::{Condition, QueryOrder, QuerySelect, Set, prelude::*};
use tracing::{debug, info};

/// Everything one audit entry records.
#[derive(Clone, Debug, PartialEq)]
pub struct AuditEntry {
    /// Acting user, None for system actions
    pub user_id: Option<i64>,
    /// Kind of mutation
    pub action: AuditAction,
    /// Entity type name of the target
    pub model_name: String,
    /// Primary key of the target
    pub object_id: i64,
    /// Human-readable form of the target at the time of the action
    pub object_repr: String,
    /// Changed tracked fields, empty for create and delete
    pub changes: ChangeSet,
    /// Originating client address
    pub ip_address: Option<String>,
}

impl AuditEntry {
    /// Entry describing `action` on `target`. Diffs are only kept for updates.
    #[must_use]
    pub fn for_target(
        user: Option<&user::Model>,
        action: AuditAction,
        target: &AuditTarget<'_>,
        changes: ChangeSet,
        ip_address: Option<String>,
    ) -> Self {
        let changes = if action == AuditAction::Update {
            changes
        } else {
            ChangeSet::default()
        };

        Self {
            user_id: user.map(|u| u.id),
            action,
            model_name: target.type_name().to_string(),
            object_id: target.id(),
            object_repr: target.display_repr(),
            changes,
            ip_address,
        }
    }
}

/// Appends one entry to the audit trail.
pub async fn record<C>(db: &C, entry: AuditEntry) -> Result<audit_log::Model>
where
    C: ConnectionTrait,
{
    let model = audit_log::ActiveModel {
        user_id: Set(entry.user_id),
        action: Set(entry.action),
        model_name: Set(entry.model_name),
        object_id: Set(entry.object_id),
        object_repr: Set(entry.object_repr),
        changes: Set(entry.changes.to_json()),
        ip_address: Set(entry.ip_address),
        ..Default::default()
    }
    .insert(db)
    .await?;

    info!(
        audit_id = model.id,
        user_id = model.user_id,
        action = model.action.label(),
        model = %model.model_name,
        object_id = model.object_id,
        "Audit entry recorded"
    );
    Ok(model)
}

/// Final step of the mutation workflow: records `action` on `target` on behalf of
/// the caller in `ctx`.
pub(crate) async fn record_mutation<C>(
    db: &C,
    ctx: &RequestContext,
    action: AuditAction,
    target: &AuditTarget<'_>,
    changes: ChangeSet,
) -> Result<audit_log::Model>
where
    C: ConnectionTrait,
{
    let entry = AuditEntry::for_target(ctx.user(), action, target, changes, ctx.client_ip());
    record(db, entry).await
}

/// Resolves the client address: the first value of a forwarded-for header when
/// present and non-blank, else the direct connection address, else none.
#[must_use]
pub fn resolve_client_ip(forwarded_for: Option<&str>, remote_addr: Option<&str>) -> Option<String> {
    forwarded_for
        .and_then(|header| header.split(',').next())
        .map(str::trim)
        .filter(|first| !first.is_empty())
        .or_else(|| remote_addr.map(str::trim).filter(|addr| !addr.is_empty()))
        .map(str::to_string)
}

/// Filters for [`list_audit_logs`]. Unset fields do not restrict.
#[derive(Clone, Debug, Default)]
pub struct AuditLogFilter {
    /// Only entries by this user
    pub user_id: Option<i64>,
    /// Only entries of this action
    pub action: Option<AuditAction>,
    /// Only entries about this entity type
    pub model_name: Option<String>,
    /// Substring match on the stored representation
    pub search: Option<String>,
}

/// Lists audit entries, newest first.
pub async fn list_audit_logs(
    db: &DatabaseConnection,
    ctx: &RequestContext,
    filter: &AuditLogFilter,
) -> Result<Vec<audit_log::Model>> {
    authorize(ctx.user(), Verb::List, ResourceKind::AuditLog)?;

    let mut condition = Condition::all();
    if let Some(user_id) = filter.user_id {
        condition = condition.add(audit_log::Column::UserId.eq(user_id));
    }
    if let Some(action) = filter.action {
        condition = condition.add(audit_log::Column::Action.eq(action));
    }
    if let Some(model_name) = &filter.model_name {
        condition = condition.add(audit_log::Column::ModelName.eq(model_name.as_str()));
    }
    if let Some(term) = filter.search.as_deref().filter(|t| !t.trim().is_empty()) {
        condition = condition.add(audit_log::Column::ObjectRepr.contains(term.trim()));
    }

    let logs = AuditLog::find()
        .filter(condition)
        .order_by_desc(audit_log::Column::Timestamp)
        .order_by_desc(audit_log::Column::Id)
        .all(db)
        .await?;
    debug!("Fetched {} audit entries.", logs.len());
    Ok(logs)
}

/// Fetches one audit entry.
pub async fn get_audit_log(
    db: &DatabaseConnection,
    ctx: &RequestContext,
    audit_id: i64,
) -> Result<audit_log::Model> {
    authorize(ctx.user(), Verb::Retrieve, ResourceKind::AuditLog)?;

    AuditLog::find_by_id(audit_id)
        .one(db)
        .await?
        .ok_or(Error::NotFound {
            entity: "AuditLog",
            id: audit_id,
        })
}

/// History of one entity, newest first. Callers check read access on the entity.
pub(crate) async fn history_for(
    db: &DatabaseConnection,
    model_name: &str,
    object_id: i64,
) -> Result<Vec<audit_log::Model>> {
    AuditLog::find()
        .filter(audit_log::Column::ModelName.eq(model_name))
        .filter(audit_log::Column::ObjectId.eq(object_id))
        .order_by_desc(audit_log::Column::Timestamp)
        .order_by_desc(audit_log::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// The `limit` most recent entries with their acting users.
pub(crate) async fn recent_activity(
    db: &DatabaseConnection,
    limit: u64,
) -> Result<Vec<(audit_log::Model, Option<user::Model>)>> {
    AuditLog::find()
        .find_also_related(User)
        .order_by_desc(audit_log::Column::Timestamp)
        .order_by_desc(audit_log::Column::Id)
        .limit(limit)
        .all(db)
        .await
        .map_err(Into::into)
}
