//! Partial-update document building
//!
//! An [`UpdateDocument`] accumulates the three MongoDB update families the
//! catalog uses: plain `$set`, `$addToSet` (append without duplicating) and
//! `$pullAll` (remove matching elements). A field may land in exactly one
//! of the three per call; which one is decided by the per-field
//! [`UpdateAction`](crate::query::UpdateAction) the caller configured.
//!
//! Builders validate before anything is written: a validation failure
//! leaves the store untouched, never a half-applied update.

use bson::{doc, Bson, Document};

/// Structured partial update, rendered to a native update document at the
/// end of building.
#[derive(Debug, Clone, Default)]
pub struct UpdateDocument {
    pub set: Document,
    pub add_to_set: Document,
    pub pull_all: Document,
}

impl UpdateDocument {
    pub fn new() -> Self {
        UpdateDocument::default()
    }

    pub fn is_empty(&self) -> bool {
        self.set.is_empty() && self.add_to_set.is_empty() && self.pull_all.is_empty()
    }

    /// Render to the native update operation.
    ///
    /// Array values under `$addToSet` are wrapped in `$each` so every
    /// element is appended individually; `$pullAll` values are coerced to
    /// arrays since the operator requires one.
    pub fn to_final_update_document(&self) -> Document {
        let mut update = Document::new();
        if !self.set.is_empty() {
            update.insert("$set", self.set.clone());
        }
        if !self.add_to_set.is_empty() {
            let mut add = Document::new();
            for (key, value) in &self.add_to_set {
                match value {
                    Bson::Array(values) => add.insert(key, doc! { "$each": values.clone() }),
                    other => add.insert(key, other.clone()),
                };
            }
            update.insert("$addToSet", add);
        }
        if !self.pull_all.is_empty() {
            let mut pull = Document::new();
            for (key, value) in &self.pull_all {
                match value {
                    Bson::Array(_) => pull.insert(key, value.clone()),
                    other => pull.insert(key, Bson::Array(vec![other.clone()])),
                };
            }
            update.insert("$pullAll", pull);
        }
        update
    }
}

/// Copy accepted scalar string fields from an update payload into `$set`.
/// Absent and null fields are skipped, not unset.
pub fn filter_string_params(params: &Document, set: &mut Document, accepted: &[&str]) {
    for key in accepted {
        if let Some(Bson::String(value)) = params.get(key) {
            set.insert(*key, value.clone());
        }
    }
}

/// Copy accepted whole-list fields into `$set` (replace semantics).
pub fn filter_string_list_params(params: &Document, set: &mut Document, accepted: &[&str]) {
    for key in accepted {
        if let Some(Bson::Array(values)) = params.get(key) {
            set.insert(*key, values.clone());
        }
    }
}

/// Copy accepted object or object-list fields into `$set`.
pub fn filter_object_params(params: &Document, set: &mut Document, accepted: &[&str]) {
    for key in accepted {
        match params.get(key) {
            Some(Bson::Document(value)) => {
                set.insert(*key, value.clone());
            }
            Some(Bson::Array(values)) => {
                set.insert(*key, values.clone());
            }
            _ => {}
        }
    }
}

/// Copy accepted free-form map fields into `$set`.
pub fn filter_map_params(params: &Document, set: &mut Document, accepted: &[&str]) {
    for key in accepted {
        if let Some(Bson::Document(value)) = params.get(key) {
            set.insert(*key, value.clone());
        }
    }
}
