//! Core layer - framework-agnostic CRM operations
//!
//! Every operation takes a database handle and a [`context::RequestContext`]
//! describing the caller. Lead and contact mutations run through the audited
//! workflow; the remaining resources share the same permission gate.

/// Audit trail recording and reads
pub mod audit;
/// Field-level diffs of tracked values
pub mod changes;
/// Contact operations
pub mod contact;
/// Caller identity and origin
pub mod context;
/// Logged interactions with contacts
pub mod correspondence;
/// Dashboard statistics
pub mod dashboard;
/// Lead operations
pub mod lead;
/// Lead notes
pub mod note;
/// Role-based permission rules
pub mod permissions;
/// Reminder operations and the sent transition
pub mod reminder;
/// Audited entity descriptions
pub mod target;
/// User records
pub mod user;
/// Input checks shared by the operations
pub mod validation;
