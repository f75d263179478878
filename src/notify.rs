//! Reminder notifications - message composition and the delivery seam.
//!
//! Delivery is pluggable through [`Notifier`]. The bundled [`LogNotifier`]
//! writes messages to the tracing output, which is what a deployment without
//! a mail relay gets.

use crate::{
    core::reminder::ReminderDetails,
    errors::{Error, Result},
};
use async_trait::async_trait;
use tracing::info;

/// A composed reminder message, ready for delivery.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReminderMessage {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub body: String,
}

impl ReminderMessage {
    /// Builds the message for `details`, sent from `from_address`.
    ///
    /// # Errors
    /// Returns [`Error::NotificationDelivery`] when the recipient has no email address.
    pub fn compose(details: &ReminderDetails, from_address: &str) -> Result<Self> {
        let ReminderDetails {
            reminder,
            lead,
            user,
        } = details;

        if user.email.trim().is_empty() {
            return Err(Error::NotificationDelivery {
                message: format!("user {} has no email address", user.username),
            });
        }

        let greeting = if user.first_name.trim().is_empty() {
            user.username.as_str()
        } else {
            user.first_name.as_str()
        };
        let body = format!(
            "Hi {greeting},\n\n\
             This is a reminder for:\n\n\
             Title: {}\n\
             Lead: {} - {}\n\
             Description: {}\n\n\
             Please take appropriate action.\n\n\
             Best regards,\n\
             CRM System\n",
            reminder.title, lead.name, lead.company, reminder.description
        );

        Ok(Self {
            from: from_address.to_string(),
            to: user.email.clone(),
            subject: format!("Reminder: {}", reminder.title),
            body,
        })
    }
}

/// Delivers reminder messages.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Sends one message.
    async fn send(&self, message: &ReminderMessage) -> Result<()>;
}

/// Notifier that writes each message to the log.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, message: &ReminderMessage) -> Result<()> {
        info!(
            from = %message.from,
            to = %message.to,
            subject = %message.subject,
            "Reminder notification:\n{}",
            message.body
        );
        Ok(())
    }
}
