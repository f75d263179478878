//! Entity module - Contains all SeaORM entity definitions for the database.
//! These entities represent the database tables and their relationships.
//! Each entity has a Model struct for data and an Entity struct for operations.

pub mod audit_log;
pub mod contact;
pub mod correspondence;
pub mod lead;
pub mod note;
pub mod reminder;
pub mod user;

// Re-export specific types to avoid conflicts
pub use audit_log::{
    AuditAction, Column as AuditLogColumn, Entity as AuditLog, Model as AuditLogModel,
};
pub use contact::{Column as ContactColumn, Entity as Contact, Model as ContactModel};
pub use correspondence::{
    Column as CorrespondenceColumn, CorrespondenceType, Entity as Correspondence,
    Model as CorrespondenceModel,
};
pub use lead::{Column as LeadColumn, Entity as Lead, LeadStatus, Model as LeadModel, Priority};
pub use note::{Column as NoteColumn, Entity as Note, Model as NoteModel};
pub use reminder::{
    Column as ReminderColumn, Entity as Reminder, Model as ReminderModel, ReminderStatus,
};
pub use user::{Column as UserColumn, Entity as User, Model as UserModel, Role};
