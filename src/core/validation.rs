//! Field validation applied before a write reaches the store.
//!
//! Limits follow the column sizes of the schema: a rejected value aborts the
//! write with [`Error::Validation`] and no audit entry is produced.

use crate::errors::{Error, Result};
use regex::Regex;
use std::sync::LazyLock;

/// Maximum length of names, companies, titles and subjects.
pub const NAME_MAX: usize = 200;
/// Maximum length of phone numbers.
pub const PHONE_MAX: usize = 20;
/// Maximum length of lead sources and contact positions.
pub const SHORT_TEXT_MAX: usize = 100;
/// Maximum length of an email address.
pub const EMAIL_MAX: usize = 254;

static EMAIL_RE: LazyLock<std::result::Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s.]+$"));

/// Rejects blank values and values longer than `max` characters.
pub fn required(field: &str, value: &str, max: usize) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::validation(field, "This field may not be blank."));
    }
    max_len(field, value, max)
}

/// Rejects values longer than `max` characters.
pub fn max_len(field: &str, value: &str, max: usize) -> Result<()> {
    if value.chars().count() > max {
        return Err(Error::validation(
            field,
            format!("Ensure this field has no more than {max} characters."),
        ));
    }
    Ok(())
}

/// Rejects malformed email addresses.
pub fn email(field: &str, value: &str) -> Result<()> {
    required(field, value, EMAIL_MAX)?;
    let pattern = EMAIL_RE.as_ref().map_err(|e| Error::Config {
        message: format!("invalid email pattern: {e}"),
    })?;
    if pattern.is_match(value.trim()) {
        Ok(())
    } else {
        Err(Error::validation(field, "Enter a valid email address."))
    }
}
