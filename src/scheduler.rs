//! Reminder scheduler - delivers reminders when they fall due.
//!
//! Two paths lead to delivery. The periodic sweep ([`ReminderScheduler::tick`])
//! picks up every pending reminder whose date has passed. A reminder can also
//! be scheduled on creation ([`ReminderScheduler::schedule`]): already due
//! means inline delivery, a future date means a deferred dispatch at that
//! instant. Both paths end in the same conditional `pending -> sent` update,
//! and a per-scheduler lock keeps them from delivering the same reminder twice.
//!
//! Notification failures never block the transition; they are logged and the
//! reminder is still marked sent.

use crate::{
    config::AppConfig,
    core::{
        context::RequestContext,
        reminder::{self, NewReminder},
    },
    entities::{ReminderStatus, reminder as reminder_entity},
    errors::{Error, Result},
    notify::{Notifier, ReminderMessage},
};
use chrono::{DateTime, Utc};
use sea_orm::DatabaseConnection;
use std::{sync::Arc, time::Duration};
use tokio::{
    sync::{Mutex, mpsc},
    task::JoinHandle,
    time::sleep,
};
use tracing::{debug, error, info, instrument, warn};

/// Settings for the reminder scheduler.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// Whether [`ReminderScheduler::start`] runs the periodic sweep
    pub enabled: bool,
    /// Time between sweeps
    pub interval: Duration,
    /// Fire sweeps on interval boundaries of the wall clock
    pub align_to_interval: bool,
    /// Sender address on reminder messages
    pub from_address: String,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self::from_app_config(&AppConfig::default())
    }
}

impl SchedulerConfig {
    /// Scheduler settings from the `[scheduler]` and `[notifications]` sections.
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            enabled: config.scheduler.enabled,
            interval: config.scheduler.interval(),
            align_to_interval: config.scheduler.align_to_minute,
            from_address: config.notifications.from_address.clone(),
        }
    }

    /// Same settings with a different sweep interval.
    #[must_use]
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval.max(Duration::from_millis(1));
        self
    }

    /// How long to wait at `now` before the next sweep.
    #[must_use]
    pub fn next_tick_delay(&self, now: DateTime<Utc>) -> Duration {
        if !self.align_to_interval {
            return self.interval;
        }
        let period = u64::try_from(self.interval.as_millis()).unwrap_or(u64::MAX).max(1);
        let elapsed = u64::try_from(now.timestamp_millis()).unwrap_or_default() % period;
        Duration::from_millis(period - elapsed)
    }
}

/// Outcome of one sweep.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Reminders moved to `sent` by this sweep
    pub processed: usize,
    /// Reminders whose notification could not be delivered (still marked sent)
    pub failed_notifications: usize,
}

/// What [`ReminderScheduler::schedule`] did with a reminder.
#[derive(Debug)]
pub enum Scheduled {
    /// The reminder was due and has been handled inline
    Dispatched {
        /// Whether this call moved it to `sent`
        sent: bool,
    },
    /// A dispatch will run at the reminder's date
    Deferred(JoinHandle<()>),
    /// The reminder is no longer pending
    Skipped,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Delivery {
    Sent { notified: bool },
    AlreadyHandled,
}

/// Delivers due reminders through a [`Notifier`].
#[derive(Clone)]
pub struct ReminderScheduler {
    db: Arc<DatabaseConnection>,
    notifier: Arc<dyn Notifier>,
    config: SchedulerConfig,
    dispatch_lock: Arc<Mutex<()>>,
}

impl ReminderScheduler {
    /// Scheduler over a shared connection. Nothing runs until [`Self::start`]
    /// or [`Self::schedule`] is called.
    #[must_use]
    pub fn new(db: Arc<DatabaseConnection>, notifier: Arc<dyn Notifier>, config: SchedulerConfig) -> Self {
        Self {
            db,
            notifier,
            config,
            dispatch_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Runs one sweep against the current clock.
    pub async fn tick(&self) -> Result<TickReport> {
        self.tick_at(Utc::now()).await
    }

    /// Runs one sweep, delivering every pending reminder due at or before `now`.
    #[instrument(skip(self))]
    pub async fn tick_at(&self, now: DateTime<Utc>) -> Result<TickReport> {
        let _guard = self.dispatch_lock.lock().await;

        let mut report = TickReport::default();
        for due in reminder::due_reminders(&self.db, now).await? {
            if let Delivery::Sent { notified } = self.deliver(due).await? {
                report.processed += 1;
                if !notified {
                    report.failed_notifications += 1;
                }
            }
        }

        if report.processed > 0 {
            info!(
                processed = report.processed,
                failed_notifications = report.failed_notifications,
                "Processed {} reminders",
                report.processed
            );
        } else {
            debug!("No reminders due");
        }
        Ok(report)
    }

    /// Arranges delivery of a freshly created reminder.
    ///
    /// A due reminder is delivered before this returns. A future one gets a
    /// background dispatch at its date; the sweep remains a fallback.
    pub async fn schedule(&self, reminder: &reminder_entity::Model) -> Result<Scheduled> {
        if reminder.status != ReminderStatus::Pending {
            return Ok(Scheduled::Skipped);
        }

        let now = Utc::now();
        if reminder.reminder_date <= now {
            let sent = self.dispatch(reminder.id).await?;
            return Ok(Scheduled::Dispatched { sent });
        }

        let delay = (reminder.reminder_date - now).to_std().unwrap_or_default();
        let reminder_id = reminder.id;
        let scheduler = self.clone();
        debug!(reminder_id, delay_ms = delay.as_millis(), "Deferred reminder dispatch");
        let handle = tokio::spawn(async move {
            sleep(delay).await;
            if let Err(e) = scheduler.dispatch(reminder_id).await {
                error!(reminder_id, error = %e, "Deferred reminder dispatch failed");
            }
        });
        Ok(Scheduled::Deferred(handle))
    }

    /// Creates a reminder on behalf of the caller and schedules it.
    ///
    /// Returns the reminder as stored after scheduling, so an already due
    /// reminder comes back `sent`.
    pub async fn create_and_schedule(
        &self,
        ctx: &RequestContext,
        new: NewReminder,
    ) -> Result<(reminder_entity::Model, Scheduled)> {
        let created = reminder::create_reminder(&self.db, ctx, new).await?;
        let scheduled = self.schedule(&created).await?;
        let current = reminder::find_reminder(&self.db, created.id).await?;
        Ok((current, scheduled))
    }

    /// Delivers one reminder if it is still pending and due. Returns whether it was sent.
    pub async fn dispatch(&self, reminder_id: i64) -> Result<bool> {
        let _guard = self.dispatch_lock.lock().await;

        let current = match reminder::find_reminder(&self.db, reminder_id).await {
            Ok(found) => found,
            Err(Error::NotFound { .. }) => {
                debug!(reminder_id, "Reminder removed before dispatch");
                return Ok(false);
            }
            Err(e) => return Err(e),
        };
        if current.status != ReminderStatus::Pending {
            return Ok(false);
        }
        if current.reminder_date > Utc::now() {
            // rescheduled after this dispatch was arranged; the sweep delivers it
            debug!(reminder_id, due = %current.reminder_date, "Reminder not yet due");
            return Ok(false);
        }

        Ok(matches!(self.deliver(current).await?, Delivery::Sent { .. }))
    }

    /// Notifies the recipient, then marks the reminder sent. Callers hold the
    /// dispatch lock.
    async fn deliver(&self, due: reminder_entity::Model) -> Result<Delivery> {
        let reminder_id = due.id;
        let details = match reminder::reminder_details(&self.db, due).await {
            Ok(details) => details,
            // lead or user removed mid-sweep; the cascade takes the reminder too
            Err(Error::NotFound { .. }) => return Ok(Delivery::AlreadyHandled),
            Err(e) => return Err(e),
        };

        let outcome = match ReminderMessage::compose(&details, &self.config.from_address) {
            Ok(message) => self.notifier.send(&message).await,
            Err(e) => Err(e),
        };
        let notified = match outcome {
            Ok(()) => true,
            Err(e) => {
                warn!(reminder_id, error = %e, "Reminder notification failed");
                false
            }
        };

        if reminder::mark_sent(&self.db, reminder_id).await? {
            debug!(reminder_id, notified, "Reminder marked sent");
            Ok(Delivery::Sent { notified })
        } else {
            Ok(Delivery::AlreadyHandled)
        }
    }

    /// Starts the periodic sweep on a background task.
    pub fn start(self) -> SchedulerHandle {
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel(1);
        let task = tokio::spawn(async move {
            self.run(&mut shutdown_rx).await;
        });
        SchedulerHandle { shutdown_tx, task }
    }

    async fn run(&self, shutdown_rx: &mut mpsc::Receiver<()>) {
        if !self.config.enabled {
            info!("Reminder scheduler is disabled, not starting");
            return;
        }
        info!(
            interval_secs = self.config.interval.as_secs(),
            aligned = self.config.align_to_interval,
            "Reminder scheduler started"
        );

        loop {
            let wait = self.config.next_tick_delay(Utc::now());
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    info!("Reminder scheduler received shutdown signal");
                    break;
                }
                () = sleep(wait) => {}
            }

            if let Err(e) = self.tick().await {
                error!(error = %e, "Reminder sweep failed");
            }
        }

        info!("Reminder scheduler stopped");
    }
}

/// Handle for a running periodic sweep.
pub struct SchedulerHandle {
    shutdown_tx: mpsc::Sender<()>,
    task: JoinHandle<()>,
}

impl SchedulerHandle {
    /// Signals the sweep loop to stop and waits for it to finish.
    pub async fn shutdown(self) -> Result<()> {
        if self.shutdown_tx.send(()).await.is_err() {
            // a disabled scheduler returns at once and drops its receiver
            debug!("Reminder scheduler already stopped");
        }
        self.task.await.map_err(|e| Error::Scheduler {
            message: format!("Scheduler task ended abnormally: {e}"),
        })
    }
}
