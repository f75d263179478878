//! Change tracker - field-level diffs between two states of an entity.
//!
//! Only whitelisted ("tracked") fields take part. Values are compared and stored
//! as strings, so the diff does not preserve type information.

use sea_orm::prelude::{Decimal, Json};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Stringified values of the tracked fields of one entity state, keyed by field name.
pub type TrackedValues = BTreeMap<&'static str, String>;

/// Old and new value of one changed field.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldChange {
    /// Value before the write
    pub old: String,
    /// Value after the write
    pub new: String,
}

/// Mapping of changed field name to its [`FieldChange`].
///
/// Serializes to the `{"field": {"old": .., "new": ..}}` shape stored on audit entries.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChangeSet(BTreeMap<String, FieldChange>);

impl ChangeSet {
    /// Diff of two snapshots of the same tracked-field whitelist.
    ///
    /// Contains exactly the fields of `before` whose value differs in `after`.
    /// Fields missing from `after` are treated as unchanged.
    #[must_use]
    pub fn between(before: &TrackedValues, after: &TrackedValues) -> Self {
        let changes = before
            .iter()
            .filter_map(|(field, old)| {
                let new = after.get(field)?;
                (old != new).then(|| {
                    (
                        (*field).to_string(),
                        FieldChange {
                            old: old.clone(),
                            new: new.clone(),
                        },
                    )
                })
            })
            .collect();
        Self(changes)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn get(&self, field: &str) -> Option<&FieldChange> {
        self.0.get(field)
    }

    /// Changed field names in alphabetical order.
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// JSON form stored in the audit log `changes` column.
    #[must_use]
    pub fn to_json(&self) -> Json {
        let map = self
            .0
            .iter()
            .map(|(field, change)| {
                (
                    field.clone(),
                    serde_json::json!({ "old": change.old, "new": change.new }),
                )
            })
            .collect::<serde_json::Map<_, _>>();
        Json::Object(map)
    }

    /// Reads a stored `changes` column back. Malformed content yields an empty set.
    #[must_use]
    pub fn from_json(value: &Json) -> Self {
        serde_json::from_value(value.clone()).unwrap_or_default()
    }
}

/// Stringified form of a nullable decimal: two fractional digits, or `null`.
#[must_use]
pub fn decimal_value(value: Option<Decimal>) -> String {
    value.map_or_else(|| "null".to_string(), |d| format!("{d:.2}"))
}

/// Stringified form of a flag.
#[must_use]
pub fn flag_value(value: bool) -> String {
    value.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(pairs: &[(&'static str, &str)]) -> TrackedValues {
        pairs.iter().map(|(k, v)| (*k, (*v).to_string())).collect()
    }

    #[test]
    fn test_between_reports_only_changed_fields() {
        let before = snapshot(&[("name", "Peter Mwangi"), ("status", "new"), ("priority", "low")]);
        let after = snapshot(&[
            ("name", "Peter Mwangi"),
            ("status", "qualified"),
            ("priority", "high"),
        ]);

        let changes = ChangeSet::between(&before, &after);
        assert_eq!(changes.len(), 2);
        assert_eq!(
            changes.get("status"),
            Some(&FieldChange {
                old: "new".to_string(),
                new: "qualified".to_string()
            })
        );
        assert!(changes.get("priority").is_some());
        assert!(changes.get("name").is_none());
    }

    #[test]
    fn test_between_identical_snapshots_is_empty() {
        let state = snapshot(&[("name", "Amina"), ("company", "KCB Group")]);
        assert!(ChangeSet::between(&state, &state).is_empty());
    }

    #[test]
    fn test_fields_outside_before_are_ignored() {
        let before = snapshot(&[("name", "Amina")]);
        let after = snapshot(&[("name", "Amina"), ("description", "changed")]);
        assert!(ChangeSet::between(&before, &after).is_empty());
    }

    #[test]
    fn test_json_shape_and_round_trip() {
        let changes = ChangeSet::between(
            &snapshot(&[("status", "new")]),
            &snapshot(&[("status", "qualified")]),
        );
        let json = changes.to_json();
        assert_eq!(
            json,
            serde_json::json!({"status": {"old": "new", "new": "qualified"}})
        );
        assert_eq!(ChangeSet::from_json(&json), changes);
        assert!(ChangeSet::from_json(&serde_json::json!("garbage")).is_empty());
    }

    #[test]
    fn test_value_stringification() {
        assert_eq!(decimal_value(None), "null");
        assert_eq!(decimal_value(Some(Decimal::new(2_500_000, 0))), "2500000.00");
        assert_eq!(decimal_value(Some(Decimal::new(12_345, 1))), "1234.50");
        assert_eq!(flag_value(true), "true");
    }
}
