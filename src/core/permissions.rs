//! Permission evaluator - the single source of truth for who may do what.
//!
//! Decisions depend only on the caller's role, the verb and the resource kind.
//! There is no per-object ownership check: any authenticated user may read or
//! write any lead or contact regardless of its owner.

use crate::entities::user;
use crate::errors::{Error, Result};
use std::fmt;
use tracing::warn;

/// Operation a caller wants to perform, mirroring HTTP-style verbs.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Verb {
    /// Enumerate resources
    List,
    /// Fetch a single resource
    Retrieve,
    /// Insert a resource
    Create,
    /// Modify a resource
    Update,
    /// Remove a resource
    Delete,
}

impl Verb {
    /// All verbs, for exhaustive checks.
    pub const ALL: [Self; 5] = [
        Self::List,
        Self::Retrieve,
        Self::Create,
        Self::Update,
        Self::Delete,
    ];

    /// Whether the verb leaves the store untouched.
    #[must_use]
    pub const fn is_read(self) -> bool {
        matches!(self, Self::List | Self::Retrieve)
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::List => "list",
            Self::Retrieve => "retrieve",
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        })
    }
}

/// Kind of resource a request targets.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    /// Leads
    Lead,
    /// Contacts
    Contact,
    /// Notes on leads
    Note,
    /// Reminders
    Reminder,
    /// Correspondence logs
    Correspondence,
    /// Audit trail, read-only for everyone
    AuditLog,
    /// Dashboard statistics, read-only for everyone
    Dashboard,
}

impl ResourceKind {
    /// All resource kinds, for exhaustive checks.
    pub const ALL: [Self; 7] = [
        Self::Lead,
        Self::Contact,
        Self::Note,
        Self::Reminder,
        Self::Correspondence,
        Self::AuditLog,
        Self::Dashboard,
    ];

    /// Kinds that can never be written through this crate, whatever the role.
    #[must_use]
    pub const fn is_read_only(self) -> bool {
        matches!(self, Self::AuditLog | Self::Dashboard)
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Lead => "lead",
            Self::Contact => "contact",
            Self::Note => "note",
            Self::Reminder => "reminder",
            Self::Correspondence => "correspondence",
            Self::AuditLog => "audit log",
            Self::Dashboard => "dashboard",
        })
    }
}

/// Decides whether `user` may perform `verb` on resources of `kind`.
///
/// - Unauthenticated callers are denied everything.
/// - Reads are open to any authenticated user.
/// - Read-only kinds deny every write verb, for every role.
/// - Create and update are open to any authenticated user.
/// - Delete requires the manager role.
#[must_use]
pub fn allow(user: Option<&user::Model>, verb: Verb, kind: ResourceKind) -> bool {
    let Some(user) = user else {
        return false;
    };

    if verb.is_read() {
        return true;
    }
    if kind.is_read_only() {
        return false;
    }

    verb != Verb::Delete || user.is_manager()
}

/// Gate form of [`allow`]: returns the authenticated user or
/// [`Error::AuthorizationDenied`].
pub fn authorize(
    user: Option<&user::Model>,
    verb: Verb,
    kind: ResourceKind,
) -> Result<&user::Model> {
    match user {
        Some(u) if allow(Some(u), verb, kind) => Ok(u),
        _ => {
            warn!(
                user = user.map(|u| u.username.as_str()),
                %verb,
                resource = %kind,
                "Permission denied"
            );
            Err(Error::AuthorizationDenied {
                verb,
                resource: kind,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::user::Role;
    use crate::test_utils::user_with_role;

    #[test]
    fn test_anonymous_is_denied_everything() {
        for kind in ResourceKind::ALL {
            for verb in Verb::ALL {
                assert!(!allow(None, verb, kind), "{verb} on {kind}");
            }
        }
    }

    #[test]
    fn test_reads_are_open_to_every_role() {
        for role in [Role::Manager, Role::Agent] {
            let user = user_with_role(role);
            for kind in ResourceKind::ALL {
                assert!(allow(Some(&user), Verb::List, kind));
                assert!(allow(Some(&user), Verb::Retrieve, kind));
            }
        }
    }

    #[test]
    fn test_agent_may_create_and_update_but_not_delete() {
        let agent = user_with_role(Role::Agent);
        for kind in [
            ResourceKind::Lead,
            ResourceKind::Contact,
            ResourceKind::Note,
            ResourceKind::Reminder,
            ResourceKind::Correspondence,
        ] {
            assert!(allow(Some(&agent), Verb::Create, kind));
            assert!(allow(Some(&agent), Verb::Update, kind));
            assert!(!allow(Some(&agent), Verb::Delete, kind));
        }
    }

    #[test]
    fn test_manager_may_delete_writable_kinds() {
        let manager = user_with_role(Role::Manager);
        assert!(allow(Some(&manager), Verb::Delete, ResourceKind::Lead));
        assert!(allow(Some(&manager), Verb::Delete, ResourceKind::Contact));
        assert!(allow(Some(&manager), Verb::Delete, ResourceKind::Reminder));
    }

    #[test]
    fn test_audit_log_writes_denied_for_every_role() {
        for role in [Role::Manager, Role::Agent] {
            let user = user_with_role(role);
            for verb in [Verb::Create, Verb::Update, Verb::Delete] {
                assert!(!allow(Some(&user), verb, ResourceKind::AuditLog));
                assert!(!allow(Some(&user), verb, ResourceKind::Dashboard));
            }
        }
    }

    #[test]
    fn test_authorize_returns_user_or_denial() {
        let agent = user_with_role(Role::Agent);
        let granted = authorize(Some(&agent), Verb::Update, ResourceKind::Lead);
        assert!(matches!(granted, Ok(u) if u.id == agent.id));

        let denied = authorize(Some(&agent), Verb::Delete, ResourceKind::Lead);
        assert!(matches!(
            denied,
            Err(Error::AuthorizationDenied {
                verb: Verb::Delete,
                resource: ResourceKind::Lead
            })
        ));

        assert!(authorize(None, Verb::List, ResourceKind::Lead).is_err());
    }
}
