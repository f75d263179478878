//! Contact business logic - people at a lead's company, with the same audited
//! mutation workflow as leads.

use crate::{
    core::{
        audit,
        changes::ChangeSet,
        context::RequestContext,
        lead::referenced_lead,
        permissions::{ResourceKind, Verb, authorize},
        target::AuditTarget,
        validation::{self, NAME_MAX, PHONE_MAX, SHORT_TEXT_MAX},
    },
    entities::{AuditAction, Contact, Correspondence, Lead, audit_log, contact, correspondence, lead},
    errors::{Error, Result},
};
use sea_orm::{Condition, IntoActiveModel, QueryOrder, Set, prelude::*};
use tracing::{debug, info};

/// Input for [`create_contact`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewContact {
    pub lead_id: i64,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub position: String,
    pub is_primary: bool,
    pub notes: String,
}

impl NewContact {
    /// A non-primary contact with only the required fields set.
    #[must_use]
    pub fn new(lead_id: i64, name: &str, email: &str) -> Self {
        Self {
            lead_id,
            name: name.to_string(),
            email: email.to_string(),
            phone: String::new(),
            position: String::new(),
            is_primary: false,
            notes: String::new(),
        }
    }

    fn validate(&self) -> Result<()> {
        validation::required("name", &self.name, NAME_MAX)?;
        validation::email("email", &self.email)?;
        validation::max_len("phone", &self.phone, PHONE_MAX)?;
        validation::max_len("position", &self.position, SHORT_TEXT_MAX)
    }
}

/// Partial update for [`update_contact`]. `None` leaves a field untouched.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ContactChanges {
    /// Moves the contact to another lead
    pub lead_id: Option<i64>,
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub position: Option<String>,
    pub is_primary: Option<bool>,
    pub notes: Option<String>,
}

impl ContactChanges {
    fn validate(&self) -> Result<()> {
        if let Some(name) = &self.name {
            validation::required("name", name, NAME_MAX)?;
        }
        if let Some(email) = &self.email {
            validation::email("email", email)?;
        }
        if let Some(phone) = &self.phone {
            validation::max_len("phone", phone, PHONE_MAX)?;
        }
        if let Some(position) = &self.position {
            validation::max_len("position", position, SHORT_TEXT_MAX)?;
        }
        Ok(())
    }

    fn apply(self, active: &mut contact::ActiveModel) {
        if let Some(lead_id) = self.lead_id {
            active.lead_id = Set(lead_id);
        }
        if let Some(name) = self.name {
            active.name = Set(name.trim().to_string());
        }
        if let Some(email) = self.email {
            active.email = Set(email.trim().to_string());
        }
        if let Some(phone) = self.phone {
            active.phone = Set(phone);
        }
        if let Some(position) = self.position {
            active.position = Set(position);
        }
        if let Some(is_primary) = self.is_primary {
            active.is_primary = Set(is_primary);
        }
        if let Some(notes) = self.notes {
            active.notes = Set(notes);
        }
    }
}

/// Creates a contact under an existing lead.
pub async fn create_contact(
    db: &DatabaseConnection,
    ctx: &RequestContext,
    new: NewContact,
) -> Result<contact::Model> {
    let user = authorize(ctx.user(), Verb::Create, ResourceKind::Contact)?;

    new.validate()?;
    let lead = referenced_lead(db, new.lead_id).await?;

    let contact = contact::ActiveModel {
        lead_id: Set(lead.id),
        name: Set(new.name.trim().to_string()),
        email: Set(new.email.trim().to_string()),
        phone: Set(new.phone),
        position: Set(new.position),
        is_primary: Set(new.is_primary),
        notes: Set(new.notes),
        ..Default::default()
    }
    .insert(db)
    .await?;

    info!(
        contact_id = contact.id,
        lead_id = lead.id,
        user = %user.username,
        "Created contact '{}'",
        contact.name
    );
    audit::record_mutation(
        db,
        ctx,
        AuditAction::Create,
        &AuditTarget::Contact(&contact, &lead),
        ChangeSet::default(),
    )
    .await?;

    Ok(contact)
}

/// Applies a partial update and records which tracked fields changed.
pub async fn update_contact(
    db: &DatabaseConnection,
    ctx: &RequestContext,
    contact_id: i64,
    changes: ContactChanges,
) -> Result<contact::Model> {
    let user = authorize(ctx.user(), Verb::Update, ResourceKind::Contact)?;

    let (existing, old_lead) = find_contact_with_lead(db, contact_id).await?;
    let before = AuditTarget::Contact(&existing, &old_lead).tracked_values();

    changes.validate()?;
    let lead = match changes.lead_id {
        Some(lead_id) if lead_id != old_lead.id => referenced_lead(db, lead_id).await?,
        _ => old_lead,
    };

    let mut active = existing.into_active_model();
    changes.apply(&mut active);
    let updated = active.update(db).await?;

    let target = AuditTarget::Contact(&updated, &lead);
    let diff = ChangeSet::between(&before, &target.tracked_values());
    info!(
        contact_id,
        user = %user.username,
        changed = diff.len(),
        "Updated contact '{}'",
        updated.name
    );
    audit::record_mutation(db, ctx, AuditAction::Update, &target, diff).await?;

    Ok(updated)
}

/// Deletes a contact and its correspondences. Managers only.
pub async fn delete_contact(
    db: &DatabaseConnection,
    ctx: &RequestContext,
    contact_id: i64,
) -> Result<()> {
    let user = authorize(ctx.user(), Verb::Delete, ResourceKind::Contact)?;

    let (contact, lead) = find_contact_with_lead(db, contact_id).await?;
    contact.clone().delete(db).await?;

    info!(contact_id, user = %user.username, "Deleted contact '{}'", contact.name);
    audit::record_mutation(
        db,
        ctx,
        AuditAction::Delete,
        &AuditTarget::Contact(&contact, &lead),
        ChangeSet::default(),
    )
    .await?;

    Ok(())
}

/// Fetches one contact.
pub async fn get_contact(
    db: &DatabaseConnection,
    ctx: &RequestContext,
    contact_id: i64,
) -> Result<contact::Model> {
    authorize(ctx.user(), Verb::Retrieve, ResourceKind::Contact)?;
    find_contact(db, contact_id).await
}

pub(crate) async fn find_contact<C>(db: &C, contact_id: i64) -> Result<contact::Model>
where
    C: ConnectionTrait,
{
    Contact::find_by_id(contact_id)
        .one(db)
        .await?
        .ok_or(Error::NotFound {
            entity: "Contact",
            id: contact_id,
        })
}

async fn find_contact_with_lead(
    db: &DatabaseConnection,
    contact_id: i64,
) -> Result<(contact::Model, lead::Model)> {
    match Contact::find_by_id(contact_id)
        .find_also_related(Lead)
        .one(db)
        .await?
    {
        Some((contact, Some(lead))) => Ok((contact, lead)),
        // the lead cascade removes its contacts, so a contact without one is gone
        _ => Err(Error::NotFound {
            entity: "Contact",
            id: contact_id,
        }),
    }
}

/// Filters for [`list_contacts`]. Unset fields do not restrict.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ContactFilter {
    pub lead_id: Option<i64>,
    pub is_primary: Option<bool>,
    /// Substring match on name, email, phone and position
    pub search: Option<String>,
}

/// Lists contacts, primary contacts first, then by name.
pub async fn list_contacts(
    db: &DatabaseConnection,
    ctx: &RequestContext,
    filter: &ContactFilter,
) -> Result<Vec<contact::Model>> {
    authorize(ctx.user(), Verb::List, ResourceKind::Contact)?;

    let mut condition = Condition::all();
    if let Some(lead_id) = filter.lead_id {
        condition = condition.add(contact::Column::LeadId.eq(lead_id));
    }
    if let Some(is_primary) = filter.is_primary {
        condition = condition.add(contact::Column::IsPrimary.eq(is_primary));
    }
    if let Some(term) = filter.search.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
        condition = condition.add(
            Condition::any()
                .add(contact::Column::Name.contains(term))
                .add(contact::Column::Email.contains(term))
                .add(contact::Column::Phone.contains(term))
                .add(contact::Column::Position.contains(term)),
        );
    }

    let contacts = Contact::find()
        .filter(condition)
        .order_by_desc(contact::Column::IsPrimary)
        .order_by_asc(contact::Column::Name)
        .order_by_asc(contact::Column::Id)
        .all(db)
        .await?;
    debug!("Fetched {} contacts.", contacts.len());
    Ok(contacts)
}

/// Correspondences logged against one contact, most recent first.
pub async fn correspondences_for_contact(
    db: &DatabaseConnection,
    ctx: &RequestContext,
    contact_id: i64,
) -> Result<Vec<correspondence::Model>> {
    let contact = get_contact(db, ctx, contact_id).await?;
    Ok(contact
        .find_related(Correspondence)
        .order_by_desc(correspondence::Column::Date)
        .all(db)
        .await?)
}

/// Audit history of one contact, newest first.
pub async fn contact_audit_log(
    db: &DatabaseConnection,
    ctx: &RequestContext,
    contact_id: i64,
) -> Result<Vec<audit_log::Model>> {
    let contact = get_contact(db, ctx, contact_id).await?;
    audit::history_for(db, "Contact", contact.id).await
}
