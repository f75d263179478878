//! Lead business logic - the audited mutation workflow and lead queries.
//!
//! Every mutation runs the same sequence, stopping at the first failure:
//! authorize, resolve defaults, snapshot tracked fields (update), persist,
//! diff (update), record the audit entry. A denied or rejected request
//! leaves neither a store change nor an audit entry behind. The audit entry
//! is written after the write has committed and is never rolled back.

use crate::{
    core::{
        audit,
        changes::ChangeSet,
        context::RequestContext,
        permissions::{ResourceKind, Verb, authorize},
        target::AuditTarget,
        user::ensure_exists,
        validation::{self, NAME_MAX, PHONE_MAX, SHORT_TEXT_MAX},
    },
    entities::{AuditAction, Lead, LeadStatus, Priority, audit_log, lead},
    errors::{Error, Result},
};
use sea_orm::{Condition, IntoActiveModel, Order, QueryOrder, Set, prelude::*};
use tracing::{debug, info};

/// Input for [`create_lead`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewLead {
    pub name: String,
    pub company: String,
    pub email: String,
    pub phone: String,
    pub status: LeadStatus,
    pub priority: Priority,
    pub source: String,
    /// Owner; the requesting user when None
    pub owner_id: Option<i64>,
    pub estimated_value: Option<Decimal>,
    pub description: String,
}

impl NewLead {
    /// A `new`, `medium` priority lead with only the required fields set.
    #[must_use]
    pub fn new(name: &str, email: &str) -> Self {
        Self {
            name: name.to_string(),
            company: String::new(),
            email: email.to_string(),
            phone: String::new(),
            status: LeadStatus::New,
            priority: Priority::Medium,
            source: String::new(),
            owner_id: None,
            estimated_value: None,
            description: String::new(),
        }
    }

    fn validate(&self) -> Result<()> {
        validation::required("name", &self.name, NAME_MAX)?;
        validation::max_len("company", &self.company, NAME_MAX)?;
        validation::email("email", &self.email)?;
        validation::max_len("phone", &self.phone, PHONE_MAX)?;
        validation::max_len("source", &self.source, SHORT_TEXT_MAX)?;
        validate_estimated_value(self.estimated_value)
    }
}

/// Partial update for [`update_lead`]. `None` leaves a field untouched.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LeadChanges {
    pub name: Option<String>,
    pub company: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub status: Option<LeadStatus>,
    pub priority: Option<Priority>,
    pub source: Option<String>,
    /// `Some(None)` clears the owner
    pub owner_id: Option<Option<i64>>,
    /// `Some(None)` clears the value
    pub estimated_value: Option<Option<Decimal>>,
    pub description: Option<String>,
}

impl LeadChanges {
    fn validate(&self) -> Result<()> {
        if let Some(name) = &self.name {
            validation::required("name", name, NAME_MAX)?;
        }
        if let Some(company) = &self.company {
            validation::max_len("company", company, NAME_MAX)?;
        }
        if let Some(email) = &self.email {
            validation::email("email", email)?;
        }
        if let Some(phone) = &self.phone {
            validation::max_len("phone", phone, PHONE_MAX)?;
        }
        if let Some(source) = &self.source {
            validation::max_len("source", source, SHORT_TEXT_MAX)?;
        }
        if let Some(value) = self.estimated_value {
            validate_estimated_value(value)?;
        }
        Ok(())
    }

    fn apply(self, active: &mut lead::ActiveModel) {
        if let Some(name) = self.name {
            active.name = Set(name.trim().to_string());
        }
        if let Some(company) = self.company {
            active.company = Set(company);
        }
        if let Some(email) = self.email {
            active.email = Set(email.trim().to_string());
        }
        if let Some(phone) = self.phone {
            active.phone = Set(phone);
        }
        if let Some(status) = self.status {
            active.status = Set(status);
        }
        if let Some(priority) = self.priority {
            active.priority = Set(priority);
        }
        if let Some(source) = self.source {
            active.source = Set(source);
        }
        if let Some(owner_id) = self.owner_id {
            active.owner_id = Set(owner_id);
        }
        if let Some(value) = self.estimated_value {
            active.estimated_value = Set(value);
        }
        if let Some(description) = self.description {
            active.description = Set(description);
        }
    }
}

/// Largest value a `decimal(10, 2)` column holds.
fn estimated_value_max() -> Decimal {
    Decimal::new(9_999_999_999, 2)
}

fn validate_estimated_value(value: Option<Decimal>) -> Result<()> {
    match value {
        Some(v) if v.abs() > estimated_value_max() => Err(Error::validation(
            "estimated_value",
            "Ensure that there are no more than 10 digits in total.",
        )),
        Some(v) if v.scale() > 2 && v != v.round_dp(2) => Err(Error::validation(
            "estimated_value",
            "Ensure that there are no more than 2 decimal places.",
        )),
        _ => Ok(()),
    }
}

/// Creates a lead. Without an explicit owner the requesting user owns it.
pub async fn create_lead(
    db: &DatabaseConnection,
    ctx: &RequestContext,
    new: NewLead,
) -> Result<lead::Model> {
    let user = authorize(ctx.user(), Verb::Create, ResourceKind::Lead)?;

    let owner_id = new.owner_id.unwrap_or(user.id);
    new.validate()?;
    ensure_exists(db, owner_id, "owner_id").await?;

    let lead = lead::ActiveModel {
        name: Set(new.name.trim().to_string()),
        company: Set(new.company),
        email: Set(new.email.trim().to_string()),
        phone: Set(new.phone),
        status: Set(new.status),
        priority: Set(new.priority),
        source: Set(new.source),
        owner_id: Set(Some(owner_id)),
        estimated_value: Set(new.estimated_value),
        description: Set(new.description),
        ..Default::default()
    }
    .insert(db)
    .await?;

    info!(lead_id = lead.id, user = %user.username, "Created lead '{}'", lead.name);
    audit::record_mutation(
        db,
        ctx,
        AuditAction::Create,
        &AuditTarget::Lead(&lead),
        ChangeSet::default(),
    )
    .await?;

    Ok(lead)
}

/// Applies a partial update and records which tracked fields changed.
pub async fn update_lead(
    db: &DatabaseConnection,
    ctx: &RequestContext,
    lead_id: i64,
    changes: LeadChanges,
) -> Result<lead::Model> {
    let user = authorize(ctx.user(), Verb::Update, ResourceKind::Lead)?;

    let existing = find_lead(db, lead_id).await?;
    let before = AuditTarget::Lead(&existing).tracked_values();

    changes.validate()?;
    if let Some(Some(owner_id)) = changes.owner_id {
        ensure_exists(db, owner_id, "owner_id").await?;
    }

    let mut active = existing.into_active_model();
    changes.apply(&mut active);
    let updated = active.update(db).await?;

    let target = AuditTarget::Lead(&updated);
    let diff = ChangeSet::between(&before, &target.tracked_values());
    info!(
        lead_id,
        user = %user.username,
        changed = diff.len(),
        "Updated lead '{}'",
        updated.name
    );
    audit::record_mutation(db, ctx, AuditAction::Update, &target, diff).await?;

    Ok(updated)
}

/// Deletes a lead together with its contacts, notes and reminders. Managers only.
pub async fn delete_lead(db: &DatabaseConnection, ctx: &RequestContext, lead_id: i64) -> Result<()> {
    let user = authorize(ctx.user(), Verb::Delete, ResourceKind::Lead)?;

    let lead = find_lead(db, lead_id).await?;
    lead.clone().delete(db).await?;

    info!(lead_id, user = %user.username, "Deleted lead '{}'", lead.name);
    audit::record_mutation(
        db,
        ctx,
        AuditAction::Delete,
        &AuditTarget::Lead(&lead),
        ChangeSet::default(),
    )
    .await?;

    Ok(())
}

/// Fetches one lead.
pub async fn get_lead(
    db: &DatabaseConnection,
    ctx: &RequestContext,
    lead_id: i64,
) -> Result<lead::Model> {
    authorize(ctx.user(), Verb::Retrieve, ResourceKind::Lead)?;
    find_lead(db, lead_id).await
}

pub(crate) async fn find_lead<C>(db: &C, lead_id: i64) -> Result<lead::Model>
where
    C: ConnectionTrait,
{
    Lead::find_by_id(lead_id)
        .one(db)
        .await?
        .ok_or(Error::NotFound {
            entity: "Lead",
            id: lead_id,
        })
}

/// Resolves a lead named by another record. A dangling reference is an input
/// error on `lead_id`, not a missing resource.
pub(crate) async fn referenced_lead<C>(db: &C, lead_id: i64) -> Result<lead::Model>
where
    C: ConnectionTrait,
{
    Lead::find_by_id(lead_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::validation("lead_id", format!("Lead #{lead_id} does not exist.")))
}

/// Column a lead listing is ordered by.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum LeadSort {
    /// Creation time (default)
    #[default]
    CreatedAt,
    /// Last modification time
    UpdatedAt,
    /// Estimated value
    EstimatedValue,
    /// Status value
    Status,
}

/// Filters for [`list_leads`]. Unset fields do not restrict.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LeadFilter {
    pub status: Option<LeadStatus>,
    pub priority: Option<Priority>,
    pub owner_id: Option<i64>,
    /// Substring match on name, company, email, phone and description
    pub search: Option<String>,
    pub sort: LeadSort,
    pub descending: bool,
}

impl Default for LeadFilter {
    fn default() -> Self {
        Self {
            status: None,
            priority: None,
            owner_id: None,
            search: None,
            sort: LeadSort::CreatedAt,
            descending: true,
        }
    }
}

/// Lists leads, newest first unless the filter says otherwise.
pub async fn list_leads(
    db: &DatabaseConnection,
    ctx: &RequestContext,
    filter: &LeadFilter,
) -> Result<Vec<lead::Model>> {
    authorize(ctx.user(), Verb::List, ResourceKind::Lead)?;

    let mut condition = Condition::all();
    if let Some(status) = filter.status {
        condition = condition.add(lead::Column::Status.eq(status));
    }
    if let Some(priority) = filter.priority {
        condition = condition.add(lead::Column::Priority.eq(priority));
    }
    if let Some(owner_id) = filter.owner_id {
        condition = condition.add(lead::Column::OwnerId.eq(owner_id));
    }
    if let Some(term) = filter.search.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
        condition = condition.add(
            Condition::any()
                .add(lead::Column::Name.contains(term))
                .add(lead::Column::Company.contains(term))
                .add(lead::Column::Email.contains(term))
                .add(lead::Column::Phone.contains(term))
                .add(lead::Column::Description.contains(term)),
        );
    }

    let column = match filter.sort {
        LeadSort::CreatedAt => lead::Column::CreatedAt,
        LeadSort::UpdatedAt => lead::Column::UpdatedAt,
        LeadSort::EstimatedValue => lead::Column::EstimatedValue,
        LeadSort::Status => lead::Column::Status,
    };
    let order = if filter.descending { Order::Desc } else { Order::Asc };

    let leads = Lead::find()
        .filter(condition)
        .order_by(column, order.clone())
        .order_by(lead::Column::Id, order)
        .all(db)
        .await?;
    debug!("Fetched {} leads.", leads.len());
    Ok(leads)
}

/// Leads owned by the requesting user, newest first.
pub async fn my_leads(db: &DatabaseConnection, ctx: &RequestContext) -> Result<Vec<lead::Model>> {
    let user = authorize(ctx.user(), Verb::List, ResourceKind::Lead)?;
    let filter = LeadFilter {
        owner_id: Some(user.id),
        ..LeadFilter::default()
    };
    list_leads(db, ctx, &filter).await
}

/// Audit history of one lead, newest first.
pub async fn lead_audit_log(
    db: &DatabaseConnection,
    ctx: &RequestContext,
    lead_id: i64,
) -> Result<Vec<audit_log::Model>> {
    let lead = get_lead(db, ctx, lead_id).await?;
    audit::history_for(db, "Lead", lead.id).await
}
