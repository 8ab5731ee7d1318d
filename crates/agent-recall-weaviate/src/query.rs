//! Weaviate GraphQL query construction.
//!
//! Stateless per-collection builder. Output is byte-deterministic: two
//! invocations with equal inputs produce identical strings, which keeps the
//! queries cacheable and snapshot-testable. User text is escaped before it
//! reaches the wire, so free-text can never break out of its string literal.

use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Scalar value carried by a where-filter leaf.
///
/// Rendered in native representation, matching how the backing store expects
/// unquoted filter scalars (`value:user`, `value:3`, `value:true`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    Bool(bool),
    Int(i64),
    Number(f64),
    Text(String),
}

impl fmt::Display for FilterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterValue::Bool(v) => write!(f, "{}", v),
            FilterValue::Int(v) => write!(f, "{}", v),
            FilterValue::Number(v) => write!(f, "{}", v),
            FilterValue::Text(v) => write!(f, "{}", v),
        }
    }
}

/// Recursive where-filter.
///
/// Leaf nodes carry `operator` + `path` + `value`; interior nodes carry a
/// logical operator (`And` / `Or`) plus `operands`. Serialization emits the
/// present fields in a stable order and elides empty branches.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WhereFilter {
    pub operator: String,
    pub path: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<FilterValue>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub operands: Vec<WhereFilter>,
}

impl WhereFilter {
    /// A leaf filter: operator, property path, and scalar value.
    pub fn leaf(
        operator: impl Into<String>,
        path: impl IntoIterator<Item = impl Into<String>>,
        value: FilterValue,
    ) -> Self {
        Self {
            operator: operator.into(),
            path: path.into_iter().map(Into::into).collect(),
            value: Some(value),
            operands: Vec::new(),
        }
    }

    /// An `And` node over child filters.
    pub fn and(operands: Vec<WhereFilter>) -> Self {
        Self {
            operator: "And".to_string(),
            operands,
            ..Self::default()
        }
    }

    /// An `Or` node over child filters.
    pub fn or(operands: Vec<WhereFilter>) -> Self {
        Self {
            operator: "Or".to_string(),
            operands,
            ..Self::default()
        }
    }

    /// Render as a GraphQL where clause.
    ///
    /// Path segments are identifiers, not values, and are emitted unquoted.
    pub fn to_graphql(&self) -> String {
        let mut parts: Vec<String> = Vec::new();

        if !self.operator.is_empty() {
            parts.push(format!("operator:{}", self.operator));
        }
        if !self.path.is_empty() {
            parts.push(format!("path:[{}]", self.path.join(",")));
        }
        if let Some(value) = &self.value {
            parts.push(format!("value:{}", value));
        }
        if !self.operands.is_empty() {
            let operands: Vec<String> = self.operands.iter().map(WhereFilter::to_graphql).collect();
            parts.push(format!("operands:[{}]", operands.join(",")));
        }

        format!("{{{}}}", parts.join(","))
    }
}

/// Builds GraphQL queries for one collection.
#[derive(Debug, Clone)]
pub struct QueryBuilder {
    class_name: String,
    limit: usize,
}

impl QueryBuilder {
    pub fn new(class_name: impl Into<String>, limit: usize) -> Self {
        Self {
            class_name: class_name.into(),
            limit,
        }
    }

    /// Hybrid dense-vector + BM25 keyword query.
    ///
    /// `alpha` mixes the two: 0 is pure keyword, 1 pure vector.
    pub fn hybrid_query(&self, query_text: &str, vector: &[f32], alpha: f64) -> String {
        format!(
            "{{ Get {{ {}(hybrid:{{query:\"{}\",vector:[{}],alpha:{:.2}}},limit:{}){{_additional{{id,score,vector}}{}}}}}}}",
            self.class_name,
            escape_graphql(query_text),
            format_vector(vector),
            alpha,
            self.limit,
            self.field_list()
        )
    }

    /// Pure vector query. A certainty threshold is serialized only when
    /// positive; zero or negative means the clause is omitted entirely.
    pub fn near_vector_query(&self, vector: &[f32], certainty: f64) -> String {
        let certainty_clause = if certainty > 0.0 {
            format!(",certainty:{:.4}", certainty)
        } else {
            String::new()
        };

        format!(
            "{{ Get {{ {}(nearVector:{{vector:[{}]}}{},limit:{}){{_additional{{id,score,vector}}{}}}}}}}",
            self.class_name,
            format_vector(vector),
            certainty_clause,
            self.limit,
            self.field_list()
        )
    }

    /// Vector query constrained by a where-filter.
    pub fn near_vector_with_where(&self, vector: &[f32], filter: &WhereFilter) -> String {
        format!(
            "{{ Get {{ {}(nearVector:{{vector:[{}]}},where:{},limit:{}){{_additional{{id,score}}{}}}}}}}",
            self.class_name,
            format_vector(vector),
            filter.to_graphql(),
            self.limit,
            self.field_list()
        )
    }

    /// Conversation retrieval: nearVector with an optional lower bound on the
    /// `timestamp` property and a fixed `message,speaker,timestamp`
    /// projection.
    pub fn conversation_query(&self, vector: &[f32], since: Option<DateTime<Utc>>) -> String {
        let time_filter = match since {
            Some(since) => format!(
                ",where:{{operator:GreaterThanEqual,path:[\"timestamp\"],valueDate:\"{}\"}}",
                format_rfc3339(since)
            ),
            None => String::new(),
        };

        format!(
            "{{ Get {{ {}(nearVector:{{vector:[{}]}}{},limit:{}){{_additional{{id,score}}message,speaker,timestamp}}}}}}",
            self.class_name,
            format_vector(vector),
            time_filter,
            self.limit
        )
    }

    /// Batch-delete mutation projecting only the ids of deleted objects.
    pub fn batch_delete_query(&self, filter: &WhereFilter) -> String {
        format!(
            "mutation{{BatchDelete{{objects(class:\"{}\",where:{}){{id}}}}}}",
            self.class_name,
            filter.to_graphql()
        )
    }

    fn field_list(&self) -> &'static str {
        if self.class_name == "Conversation" {
            "message,speaker,timestamp"
        } else {
            "title,content"
        }
    }
}

/// RFC 3339 in UTC with a `Z` suffix, the form the backing store stores.
pub(crate) fn format_rfc3339(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Fixed-point six-fractional-digit formatting, comma separated, no trailing
/// comma. An empty vector renders as an empty element list.
fn format_vector(vector: &[f32]) -> String {
    let formatted: Vec<String> = vector.iter().map(|v| format!("{:.6}", v)).collect();
    formatted.join(",")
}

/// Escape text for embedding in a GraphQL string literal.
fn escape_graphql(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
        .replace('\r', "\\r")
        .replace('\t', "\\t")
}
