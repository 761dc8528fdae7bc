//! Generic query and options types
//!
//! A [`Query`] is an ordered map from registry field names to values.
//! String values carry the comparison grammar
//! (`<key><op><value>` with op one of `<`, `<=`, `>`, `>=`, `==`, `!=`,
//! `~`, `!~`; comma-separated values are OR, semicolon-separated are AND);
//! arrays are OR lists. The storage layer translates a `Query` into the
//! store's native filter — see `db::mongodb::query_utils`.

use serde_json::Value;
use std::collections::HashMap;

/// Ordered field-name → value query.
///
/// Order is preserved so translated filters are deterministic, which keeps
/// logged filters diffable and the query planner's cache warm.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    entries: Vec<(String, Value)>,
}

impl Query {
    pub fn new() -> Self {
        Query::default()
    }

    /// Chainable append; replaces any previous value for the key.
    pub fn append(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.put(key, value);
        self
    }

    /// Insert or replace a key in place.
    pub fn put(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        let key = key.into();
        let value = value.into();
        if let Some(entry) = self.entries.iter_mut().find(|(k, _)| *k == key) {
            entry.1 = value;
        } else {
            self.entries.push((key, value));
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        let index = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(index).1)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.iter().any(|(k, _)| k == key)
    }

    /// Value coerced to an integer, accepting both numbers and numeric
    /// strings (query values routinely arrive as strings).
    pub fn get_i64(&self, key: &str) -> Option<i64> {
        match self.get(key)? {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.parse().ok(),
            _ => None,
        }
    }

    /// Value rendered as the string the comparison grammar parses.
    pub fn get_string(&self, key: &str) -> Option<String> {
        self.get(key).map(value_to_string)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Render a query value the way the comparison grammar expects it.
pub(crate) fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(value_to_string)
            .collect::<Vec<_>>()
            .join(","),
        other => other.to_string(),
    }
}

/// Projection, pagination and per-call update configuration.
#[derive(Debug, Clone, Default)]
pub struct QueryOptions {
    /// Fields to project in; wins over `exclude` when both are set.
    pub include: Vec<String>,
    /// Fields to project out.
    pub exclude: Vec<String>,
    pub sort: Vec<SortParam>,
    pub limit: Option<i64>,
    pub skip: Option<u64>,
    /// Suppress the conditional total-count query on bounded reads.
    pub skip_count: bool,
    /// Per-field action for multi-valued update fields; absent means ADD.
    pub actions: HashMap<String, UpdateAction>,
}

impl QueryOptions {
    pub fn new() -> Self {
        QueryOptions::default()
    }

    pub fn with_include(mut self, fields: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.include = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_exclude(mut self, fields: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.exclude = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_sort(mut self, field: impl Into<String>, ascending: bool) -> Self {
        self.sort.push(SortParam {
            field: field.into(),
            ascending,
        });
        self
    }

    pub fn with_limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_skip(mut self, skip: u64) -> Self {
        self.skip = Some(skip);
        self
    }

    pub fn with_skip_count(mut self) -> Self {
        self.skip_count = true;
        self
    }

    pub fn with_action(mut self, field: impl Into<String>, action: UpdateAction) -> Self {
        self.actions.insert(field.into(), action);
        self
    }

    /// Action configured for a multi-valued field, defaulting to ADD.
    pub fn action_for(&self, field: &str) -> UpdateAction {
        self.actions.get(field).copied().unwrap_or_default()
    }
}

/// Sort specification.
#[derive(Debug, Clone)]
pub struct SortParam {
    pub field: String,
    pub ascending: bool,
}

/// How an update call treats a multi-valued field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UpdateAction {
    /// Replace the whole list.
    Set,
    /// Append elements not already present.
    #[default]
    Add,
    /// Remove matching elements.
    Remove,
}

impl UpdateAction {
    /// Parse a directive string; unknown values fall back to ADD.
    pub fn parse(value: &str) -> Self {
        match value.to_ascii_uppercase().as_str() {
            "SET" => UpdateAction::Set,
            "REMOVE" => UpdateAction::Remove,
            _ => UpdateAction::Add,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn append_preserves_order_and_replaces() {
        let mut query = Query::new()
            .append("studyUid", 42)
            .append("status.name", "READY")
            .append("id", "case-1");
        query.put("status.name", "DONE");

        let keys: Vec<_> = query.keys().collect();
        assert_eq!(keys, vec!["studyUid", "status.name", "id"]);
        assert_eq!(query.get_string("status.name").unwrap(), "DONE");
    }

    #[test]
    fn numeric_coercion_accepts_strings() {
        let query = Query::new().append("uid", "17").append("release", 3);
        assert_eq!(query.get_i64("uid"), Some(17));
        assert_eq!(query.get_i64("release"), Some(3));
        assert_eq!(query.get_i64("missing"), None);
    }

    #[test]
    fn arrays_render_as_or_lists() {
        let query = Query::new().append("flags", json!(["urgent", "review"]));
        assert_eq!(query.get_string("flags").unwrap(), "urgent,review");
    }

    #[test]
    fn unknown_action_directives_fall_back_to_add() {
        assert_eq!(UpdateAction::parse("SET"), UpdateAction::Set);
        assert_eq!(UpdateAction::parse("remove"), UpdateAction::Remove);
        assert_eq!(UpdateAction::parse("MERGE"), UpdateAction::Add);
        assert_eq!(UpdateAction::parse(""), UpdateAction::Add);
    }
}
