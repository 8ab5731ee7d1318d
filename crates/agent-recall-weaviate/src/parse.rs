//! Decoding of Weaviate responses into typed search results.
//!
//! Every step through the nested JSON re-narrows the value it holds: a
//! missing key or a wrong-typed node yields a structured parse error naming
//! the failing path segment, never a panic.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{Map, Value};

use agent_recall_core::{Metadata, RecallError, RecallResult, SearchResult, Source};

/// GraphQL response envelope.
#[derive(Debug, Deserialize)]
pub(crate) struct GraphQlResponse {
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(default)]
    pub errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GraphQlError {
    #[serde(default)]
    pub message: String,
}

/// Decode the envelope and surface the first GraphQL error if any.
pub(crate) fn decode_envelope(body: &[u8]) -> RecallResult<Value> {
    let response: GraphQlResponse = serde_json::from_slice(body)
        .map_err(|e| RecallError::parse("response", e.to_string()))?;

    if let Some(first) = response.errors.first() {
        return Err(classify_backend_error(&first.message));
    }

    response
        .data
        .ok_or_else(|| RecallError::parse("data", "missing data object"))
}

/// Sort a backend error message into the taxonomy.
///
/// Weaviate reports unknown collections and mismatched query vectors as
/// GraphQL errors; everything else stays a plain backend error.
pub(crate) fn classify_backend_error(message: &str) -> RecallError {
    let lowered = message.to_ascii_lowercase();
    if lowered.contains("could not find class") || lowered.contains("no such class") {
        RecallError::IndexNotFound(message.to_string())
    } else if lowered.contains("vector lengths don't match") || lowered.contains("dimension") {
        RecallError::VectorDimensionMismatch(message.to_string())
    } else {
        RecallError::Backend(message.to_string())
    }
}

/// Walk `data` down a fixed key path, re-narrowing to an object at each step.
pub(crate) fn navigate<'a>(data: &'a Value, path: &[&str]) -> RecallResult<&'a Value> {
    let mut current = data;
    for key in path {
        let object = current
            .as_object()
            .ok_or_else(|| RecallError::parse(*key, "expected an object on the result path"))?;
        current = object
            .get(*key)
            .ok_or_else(|| RecallError::parse(*key, "key not found"))?;
    }
    Ok(current)
}

/// Parse the record array at `path` into results tagged with `source`.
///
/// Conversation records additionally get their `timestamp` property parsed as
/// RFC 3339; a record whose timestamp is absent or unparseable is retained
/// with no timestamp and is exempt from decay downstream.
pub(crate) fn parse_search_results(
    data: &Value,
    path: &[&str],
    source: Source,
    include_meta: bool,
) -> RecallResult<Vec<SearchResult>> {
    let node = navigate(data, path)?;
    let records = node
        .as_array()
        .ok_or_else(|| RecallError::parse(path.join("."), "expected an array of records"))?;

    let mut results = Vec::with_capacity(records.len());
    for record in records {
        let object = record
            .as_object()
            .ok_or_else(|| RecallError::parse(path.join("."), "record is not an object"))?;

        let mut result = extract_record(object, include_meta)?;
        result.source = source;
        if source == Source::Conversation {
            result.timestamp = parse_timestamp(object);
        }
        results.push(result);
    }

    Ok(results)
}

/// Number of objects removed by a batch-delete mutation.
pub(crate) fn parse_deleted_count(data: &Value) -> RecallResult<usize> {
    let objects = navigate(data, &["BatchDelete", "objects"])?;
    let deleted = objects
        .as_array()
        .ok_or_else(|| RecallError::parse("BatchDelete.objects", "expected an array"))?;
    Ok(deleted.len())
}

fn extract_record(object: &Map<String, Value>, include_meta: bool) -> RecallResult<SearchResult> {
    let additional = object
        .get("_additional")
        .and_then(Value::as_object)
        .ok_or_else(|| RecallError::parse("_additional", "missing or not an object"))?;

    let id = additional
        .get("id")
        .and_then(Value::as_str)
        .ok_or_else(|| RecallError::parse("_additional.id", "missing or not a string"))?
        .to_string();

    let score = parse_score(additional.get("score"))?;

    let text = ["message", "content", "title"]
        .iter()
        .find_map(|key| object.get(*key).and_then(Value::as_str))
        .ok_or_else(|| RecallError::parse("record", "no message, content, or title property"))?
        .to_string();

    let mut metadata = Metadata::new();
    if include_meta {
        for (key, value) in object {
            if !matches!(key.as_str(), "_additional" | "message" | "content" | "title") {
                metadata.insert(key.clone(), value.clone());
            }
        }
    }

    Ok(SearchResult {
        doc_id: id.clone(),
        id,
        score,
        text,
        metadata,
        source: Source::Static,
        timestamp: None,
    })
}

/// Hybrid responses carry `score` as a JSON string, vector responses as a
/// number; accept both.
fn parse_score(value: Option<&Value>) -> RecallResult<f64> {
    match value {
        Some(Value::Number(n)) => n
            .as_f64()
            .ok_or_else(|| RecallError::parse("_additional.score", "not representable as f64")),
        Some(Value::String(s)) => s
            .parse::<f64>()
            .map_err(|_| RecallError::parse("_additional.score", "not a numeric string")),
        _ => Err(RecallError::parse(
            "_additional.score",
            "missing or wrong type",
        )),
    }
}

fn parse_timestamp(object: &Map<String, Value>) -> Option<DateTime<Utc>> {
    object
        .get("timestamp")
        .and_then(Value::as_str)
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|t| t.with_timezone(&Utc))
}
