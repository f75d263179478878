//! Entities that take part in the audited mutation workflow.

use crate::core::changes::{TrackedValues, decimal_value, flag_value};
use crate::entities::{contact, lead};
use sea_orm::ActiveEnum;

/// Fields whose changes are recorded when a lead is updated.
pub const LEAD_TRACKED_FIELDS: [&str; 5] =
    ["name", "company", "status", "priority", "estimated_value"];

/// Fields whose changes are recorded when a contact is updated.
pub const CONTACT_TRACKED_FIELDS: [&str; 5] = ["name", "email", "phone", "position", "is_primary"];

/// A mutated entity as seen by the audit trail.
///
/// A contact is described together with its lead because its display form
/// names the lead's company.
#[derive(Clone, Copy, Debug)]
pub enum AuditTarget<'a> {
    /// A lead
    Lead(&'a lead::Model),
    /// A contact and the lead it belongs to
    Contact(&'a contact::Model, &'a lead::Model),
}

impl AuditTarget<'_> {
    /// Entity type name stored on audit entries.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Lead(_) => "Lead",
            Self::Contact(..) => "Contact",
        }
    }

    /// Primary key of the target.
    #[must_use]
    pub const fn id(&self) -> i64 {
        match self {
            Self::Lead(lead) => lead.id,
            Self::Contact(contact, _) => contact.id,
        }
    }

    /// Human-readable form, `"<name> - <company>"` for both variants.
    #[must_use]
    pub fn display_repr(&self) -> String {
        match self {
            Self::Lead(lead) => format!("{} - {}", lead.name, lead.company),
            Self::Contact(contact, lead) => format!("{} - {}", contact.name, lead.company),
        }
    }

    /// Whitelist of tracked fields for this entity type.
    #[must_use]
    pub const fn tracked_fields(&self) -> &'static [&'static str] {
        match self {
            Self::Lead(_) => &LEAD_TRACKED_FIELDS,
            Self::Contact(..) => &CONTACT_TRACKED_FIELDS,
        }
    }

    /// Current values of the tracked fields, stringified.
    #[must_use]
    pub fn tracked_values(&self) -> TrackedValues {
        match self {
            Self::Lead(lead) => TrackedValues::from([
                ("name", lead.name.clone()),
                ("company", lead.company.clone()),
                ("status", lead.status.to_value()),
                ("priority", lead.priority.to_value()),
                ("estimated_value", decimal_value(lead.estimated_value)),
            ]),
            Self::Contact(contact, _) => TrackedValues::from([
                ("name", contact.name.clone()),
                ("email", contact.email.clone()),
                ("phone", contact.phone.clone()),
                ("position", contact.position.clone()),
                ("is_primary", flag_value(contact.is_primary)),
            ]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::LeadStatus;
    use crate::test_utils::{contact_model, lead_model};

    #[test]
    fn test_tracked_values_cover_whitelist() {
        let lead = lead_model(1, "Peter Mwangi", "Equity Bank");
        let contact = contact_model(7, lead.id, "Mary Njeri");

        for target in [AuditTarget::Lead(&lead), AuditTarget::Contact(&contact, &lead)] {
            let values = target.tracked_values();
            let keys: Vec<&str> = values.keys().copied().collect();
            let mut expected = target.tracked_fields().to_vec();
            expected.sort_unstable();
            assert_eq!(keys, expected);
        }
    }

    #[test]
    fn test_identity_and_display() {
        let lead = lead_model(3, "Peter Mwangi", "Equity Bank");
        let contact = contact_model(9, lead.id, "Mary Njeri");

        let target = AuditTarget::Lead(&lead);
        assert_eq!(target.type_name(), "Lead");
        assert_eq!(target.id(), 3);
        assert_eq!(target.display_repr(), "Peter Mwangi - Equity Bank");

        let target = AuditTarget::Contact(&contact, &lead);
        assert_eq!(target.type_name(), "Contact");
        assert_eq!(target.id(), 9);
        assert_eq!(target.display_repr(), "Mary Njeri - Equity Bank");
    }

    #[test]
    fn test_enum_fields_use_stored_value() {
        let mut lead = lead_model(1, "Peter Mwangi", "Equity Bank");
        lead.status = LeadStatus::Qualified;
        let values = AuditTarget::Lead(&lead).tracked_values();
        assert_eq!(values["status"], "qualified");
        assert_eq!(values["priority"], "medium");
        assert_eq!(values["estimated_value"], "null");
    }
}
