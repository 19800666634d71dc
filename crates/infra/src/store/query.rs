use chrono::{DateTime, Utc};
use serde_json::Value;

use super::{StoreResult, check_identifier};

/// Predicate over a top-level document field (camelCase JSON key).
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// Text form of the field equals `value` (`data->>'field' = value`).
    Eq { field: &'static str, value: String },
    /// Timestamp field is `>= at`.
    OnOrAfter { field: &'static str, at: DateTime<Utc> },
    /// Timestamp field is `< at`.
    Before { field: &'static str, at: DateTime<Utc> },
}

impl Filter {
    pub fn eq(field: &'static str, value: impl ToString) -> Self {
        Filter::Eq {
            field,
            value: value.to_string(),
        }
    }

    pub fn on_or_after(field: &'static str, at: DateTime<Utc>) -> Self {
        Filter::OnOrAfter { field, at }
    }

    pub fn before(field: &'static str, at: DateTime<Utc>) -> Self {
        Filter::Before { field, at }
    }

    pub fn field(&self) -> &'static str {
        match self {
            Filter::Eq { field, .. } | Filter::OnOrAfter { field, .. } | Filter::Before { field, .. } => field,
        }
    }

    pub(crate) fn validate(&self) -> StoreResult<()> {
        check_identifier(self.field())
    }

    /// Evaluate against a document the way Postgres evaluates `data->>'field'`.
    pub(crate) fn matches(&self, doc: &Value) -> bool {
        let Some(text) = doc.get(self.field()).and_then(field_text) else {
            return false;
        };
        match self {
            Filter::Eq { value, .. } => text == *value,
            Filter::OnOrAfter { at, .. } => parse_timestamp(&text).is_some_and(|t| t >= *at),
            Filter::Before { at, .. } => parse_timestamp(&text).is_some_and(|t| t < *at),
        }
    }
}

/// `->>` semantics: strings unquoted, null absent, everything else as JSON text.
pub(crate) fn field_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text).ok().map(|t| t.with_timezone(&Utc))
}

/// Filters plus a window, in insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub filters: Vec<Filter>,
    pub limit: Option<u64>,
    pub offset: u64,
}

impl Query {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn filtered(filters: Vec<Filter>) -> Self {
        Self {
            filters,
            ..Self::default()
        }
    }

    pub fn window(mut self, offset: u64, limit: u64) -> Self {
        self.offset = offset;
        self.limit = Some(limit);
        self
    }

    pub(crate) fn validate(&self) -> StoreResult<()> {
        self.filters.iter().try_for_each(Filter::validate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use serde_json::json;

    #[test]
    fn eq_uses_text_form() {
        let doc = json!({"status": "ACTIVE", "count": 3, "active": true, "gone": null});
        assert!(Filter::eq("status", "ACTIVE").matches(&doc));
        assert!(Filter::eq("count", 3).matches(&doc));
        assert!(Filter::eq("active", true).matches(&doc));
        assert!(!Filter::eq("gone", "null").matches(&doc));
        assert!(!Filter::eq("missing", "x").matches(&doc));
    }

    #[test]
    fn time_range_is_half_open() {
        let t = Utc::now();
        let doc = json!({"performedAt": t});
        assert!(Filter::on_or_after("performedAt", t).matches(&doc));
        assert!(!Filter::before("performedAt", t).matches(&doc));
        assert!(Filter::before("performedAt", t + Duration::seconds(1)).matches(&doc));
    }

    #[test]
    fn rejects_unsafe_fields() {
        let q = Query::filtered(vec![Filter::eq("sku') OR 1=1 --", "x")]);
        assert!(q.validate().is_err());
    }
}
