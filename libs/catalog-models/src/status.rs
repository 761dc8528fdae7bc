//! Record status model
//!
//! Every catalog record carries a `Status`: a state name, the time it was
//! entered, and an optional free-text message. Statuses double as the
//! soft-delete mechanism: a record whose status name is [`Status::DELETED`]
//! is logically gone and excluded from default queries.

use serde::{Deserialize, Serialize};

use crate::time;

/// Status of a catalog record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Status {
    /// State name, one of the entity's status list.
    pub name: String,

    /// Display timestamp of the last state change.
    pub date: String,

    /// Free-text note attached to the state change.
    pub message: String,
}

impl Status {
    /// Record is usable.
    pub const READY: &'static str = "READY";
    /// Record is logically deleted.
    pub const DELETED: &'static str = "DELETED";

    /// Base status list shared by every entity type.
    pub const STATUS_LIST: &'static [&'static str] = &[Self::READY, Self::DELETED];

    pub fn new(name: impl Into<String>) -> Self {
        Status {
            name: name.into(),
            date: time::now_display(),
            message: String::new(),
        }
    }

    pub fn with_message(name: impl Into<String>, message: impl Into<String>) -> Self {
        Status {
            name: name.into(),
            date: time::now_display(),
            message: message.into(),
        }
    }
}

impl Default for Status {
    fn default() -> Self {
        Status::new(Status::READY)
    }
}

/// Rewrite a status query value into its positive form.
///
/// Callers may query by negation (`!=DELETED`, `!DONE`). Stored documents
/// only ever hold positive names, so a negated value is replaced by the
/// comma-joined complement against the entity's status list. Positive
/// values pass through untouched, including unknown names (the query will
/// simply match nothing).
pub fn positive_status(status_list: &[&str], value: &str) -> String {
    let negated = value
        .strip_prefix("!=")
        .or_else(|| value.strip_prefix('!'));
    match negated {
        Some(excluded) => {
            let excluded: Vec<&str> = excluded.split(',').map(str::trim).collect();
            status_list
                .iter()
                .filter(|name| !excluded.contains(*name))
                .copied()
                .collect::<Vec<_>>()
                .join(",")
        }
        None => value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LIST: &[&str] = &["PENDING", "READY", "DONE", "DELETED"];

    #[test]
    fn positive_values_pass_through() {
        assert_eq!(positive_status(LIST, "READY"), "READY");
        assert_eq!(positive_status(LIST, "READY,DONE"), "READY,DONE");
    }

    #[test]
    fn negation_becomes_complement() {
        assert_eq!(positive_status(LIST, "!=DELETED"), "PENDING,READY,DONE");
        assert_eq!(positive_status(LIST, "!DONE"), "PENDING,READY,DELETED");
    }

    #[test]
    fn negated_list_excludes_every_name() {
        assert_eq!(positive_status(LIST, "!=DELETED,DONE"), "PENDING,READY");
    }

    #[test]
    fn default_status_is_ready() {
        let status = Status::default();
        assert_eq!(status.name, Status::READY);
        assert!(!status.date.is_empty());
    }
}
