//! Shared test utilities for `leadtrack`.
//!
//! This module provides common helper functions for setting up test databases
//! and creating test entities with sensible defaults. Helpers that insert rows
//! write them directly, without going through the audited operations, so a
//! fresh fixture leaves the audit trail empty.

use crate::{
    core::user::{NewUser, create_user},
    entities::{
        CorrespondenceType, LeadStatus, Priority, ReminderStatus, Role, contact, correspondence,
        lead, note, reminder, user,
    },
    errors::{Error, Result},
    notify::{Notifier, ReminderMessage},
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};
use tokio::sync::Mutex;
use tracing_subscriber::EnvFilter;

/// Company given to every lead created by [`create_lead_owned_by`].
pub const TEST_COMPANY: &str = "Safaricom Ltd";

pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")))
        .with_test_writer()
        .try_init();
}

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    init_test_tracing();
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// An unsaved user with the given role, for checks that never touch the store.
#[must_use]
pub fn user_with_role(role: Role) -> user::Model {
    user::Model {
        id: 1,
        username: "kamau".to_string(),
        email: "kamau@crm.co.ke".to_string(),
        first_name: String::new(),
        last_name: String::new(),
        role,
        phone: None,
        created_at: Utc::now(),
    }
}

async fn create_test_user(db: &DatabaseConnection, username: &str, role: Role) -> Result<user::Model> {
    create_user(
        db,
        NewUser::agent(username, &format!("{username}@crm.co.ke")).with_role(role),
    )
    .await
}

/// Creates a stored manager named `username`.
pub async fn create_test_manager(db: &DatabaseConnection, username: &str) -> Result<user::Model> {
    create_test_user(db, username, Role::Manager).await
}

/// Creates a stored agent named `username`.
pub async fn create_test_agent(db: &DatabaseConnection, username: &str) -> Result<user::Model> {
    create_test_user(db, username, Role::Agent).await
}

/// Creates a lead owned by `owner` with defaults.
///
/// # Defaults
/// * `company`: [`TEST_COMPANY`]
/// * `status`: new
/// * `priority`: medium
/// * `estimated_value`: None
pub async fn create_lead_owned_by(
    db: &DatabaseConnection,
    owner: &user::Model,
    name: &str,
) -> Result<lead::Model> {
    let email = format!("{}@example.co.ke", name.to_lowercase().replace(' ', "."));
    Ok(lead::ActiveModel {
        name: Set(name.to_string()),
        company: Set(TEST_COMPANY.to_string()),
        email: Set(email),
        phone: Set(String::new()),
        status: Set(LeadStatus::New),
        priority: Set(Priority::Medium),
        source: Set(String::new()),
        owner_id: Set(Some(owner.id)),
        estimated_value: Set(None),
        description: Set(String::new()),
        ..Default::default()
    }
    .insert(db)
    .await?)
}

/// Creates a non-primary contact under `lead`.
pub async fn create_contact_for(
    db: &DatabaseConnection,
    lead: &lead::Model,
    name: &str,
) -> Result<contact::Model> {
    let email = format!("{}@example.co.ke", name.to_lowercase().replace(' ', "."));
    Ok(contact::ActiveModel {
        lead_id: Set(lead.id),
        name: Set(name.to_string()),
        email: Set(email),
        phone: Set(String::new()),
        position: Set(String::new()),
        is_primary: Set(false),
        notes: Set(String::new()),
        ..Default::default()
    }
    .insert(db)
    .await?)
}

/// Logs an email to `contact` by `user`, dated now.
pub async fn create_correspondence_for(
    db: &DatabaseConnection,
    contact: &contact::Model,
    user: &user::Model,
) -> Result<correspondence::Model> {
    Ok(correspondence::ActiveModel {
        contact_id: Set(contact.id),
        kind: Set(CorrespondenceType::Email),
        subject: Set("Introduction".to_string()),
        description: Set(String::new()),
        date: Set(Utc::now()),
        logged_by: Set(Some(user.id)),
        ..Default::default()
    }
    .insert(db)
    .await?)
}

pub async fn create_note_for(
    db: &DatabaseConnection,
    lead: &lead::Model,
    author: &user::Model,
) -> Result<note::Model> {
    Ok(note::ActiveModel {
        lead_id: Set(lead.id),
        author_id: Set(Some(author.id)),
        content: Set("Interested, follow up next week".to_string()),
        ..Default::default()
    }
    .insert(db)
    .await?)
}

/// Creates a pending reminder on `lead` for `user`, due at `date`.
pub async fn create_reminder_for(
    db: &DatabaseConnection,
    lead: &lead::Model,
    user: &user::Model,
    date: DateTime<Utc>,
) -> Result<reminder::Model> {
    Ok(reminder::ActiveModel {
        lead_id: Set(lead.id),
        user_id: Set(user.id),
        title: Set(format!("Follow up with {}", lead.name)),
        description: Set(String::new()),
        reminder_date: Set(date),
        status: Set(ReminderStatus::Pending),
        ..Default::default()
    }
    .insert(db)
    .await?)
}

/// An unsaved lead.
#[must_use]
pub fn lead_model(id: i64, name: &str, company: &str) -> lead::Model {
    let now = Utc::now();
    lead::Model {
        id,
        name: name.to_string(),
        company: company.to_string(),
        email: "lead@example.co.ke".to_string(),
        phone: String::new(),
        status: LeadStatus::New,
        priority: Priority::Medium,
        source: String::new(),
        owner_id: None,
        estimated_value: None,
        description: String::new(),
        created_at: now,
        updated_at: now,
    }
}

/// An unsaved contact.
#[must_use]
pub fn contact_model(id: i64, lead_id: i64, name: &str) -> contact::Model {
    let now = Utc::now();
    contact::Model {
        id,
        lead_id,
        name: name.to_string(),
        email: "contact@example.co.ke".to_string(),
        phone: String::new(),
        position: String::new(),
        is_primary: false,
        notes: String::new(),
        created_at: now,
        updated_at: now,
    }
}

/// Notifier that keeps every message it is asked to send.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<ReminderMessage>>,
}

impl RecordingNotifier {
    pub async fn messages(&self) -> Vec<ReminderMessage> {
        self.sent.lock().await.clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, message: &ReminderMessage) -> Result<()> {
        self.sent.lock().await.push(message.clone());
        Ok(())
    }
}

/// Notifier whose every delivery fails.
#[derive(Debug, Default)]
pub struct FailingNotifier;

#[async_trait]
impl Notifier for FailingNotifier {
    async fn send(&self, message: &ReminderMessage) -> Result<()> {
        Err(Error::NotificationDelivery {
            message: format!("mail relay refused {}", message.to),
        })
    }
}
