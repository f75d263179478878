//! `leadtrack` - A CRM backend core for leads, contacts and follow-ups
//!
//! This crate provides role-gated operations over leads, contacts, notes,
//! reminders and correspondence logs, an append-only audit trail of lead and
//! contact mutations, dashboard statistics, and a reminder scheduler that
//! notifies users when their follow-ups fall due.

#![deny(
    unsafe_code,
    unreachable_code,
    unreachable_patterns,
    unused_must_use,
    rustdoc::broken_intra_doc_links,
    rustdoc::private_intra_doc_links,
)]
#![warn(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,

    // Non-test code propagates errors instead of panicking
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::unwrap_used,

    // Shared handles (connection, notifier, dispatch lock) are cloned explicitly
    clippy::clone_on_ref_ptr,
    clippy::dbg_macro,
    clippy::large_enum_variant,
    clippy::semicolon_if_nothing_returned,

    future_incompatible,
    rust_2018_idioms,
)]
#![allow(
    clippy::module_name_repetitions,
    // Every fallible operation returns `errors::Error`; its variants say when each occurs
    clippy::missing_errors_doc,
)]

/// Configuration management for database and application settings
pub mod config;
/// Core business logic - framework-agnostic lead, contact, reminder and audit operations
pub mod core;
/// SeaORM entity definitions for database tables
pub mod entities;
/// Unified error types and result handling
pub mod errors;
/// Reminder message composition and delivery
pub mod notify;
/// Periodic and deferred reminder dispatch
pub mod scheduler;

#[cfg(test)]
pub mod test_utils;
