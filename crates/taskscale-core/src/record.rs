//! Task record normalization
//!
//! Task records arrive as loose JSON. Any field may live at the top level or
//! inside the `data_task` detail object; the detail object wins when both
//! carry a value. Every field has exactly one accessor below, and nothing else
//! in the crate reads raw records.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::classify::{classify, normalize_market, Classification};
use crate::error::{EngineError, Result};

/// Keys under which the nested detail object may appear, in lookup order.
const DETAIL_KEYS: &[&str] = &["data_task", "dataTask"];

const MARKETS_KEYS: &[&str] = &["markets"];
const HOURS_KEYS: &[&str] = &["timeInHours", "hours"];
const USER_KEYS: &[&str] = &["userUID", "userId"];
const PRODUCTS_KEYS: &[&str] = &["products"];
const REPORTER_ID_KEYS: &[&str] = &["reporters", "reporterUID", "reporterId"];
const REPORTER_NAME_KEYS: &[&str] = &["reporterName"];
const AI_USAGE_KEYS: &[&str] = &["aiUsage"];
const EXTERNAL_ASSET_KEYS: &[&str] = &["useExternalAsset", "isExternalAsset"];
const ID_KEYS: &[&str] = &["id", "taskId"];
const NAME_KEYS: &[&str] = &["taskName", "name"];
const MONTH_KEYS: &[&str] = &["monthId"];
const CREATED_AT_KEYS: &[&str] = &["createdAt"];

const AI_HOURS_KEYS: &[&str] = &["aiHours", "hours"];
const AI_MODELS_KEYS: &[&str] = &["aiModels", "models"];

/// Raw task record as received from the caller.
pub type TaskRecord = Value;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiUsage {
    pub hours: f64,
    pub models: Vec<String>,
}

/// Canonical projection of a task record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedTask {
    pub id: Option<String>,
    pub name: Option<String>,
    /// Uppercased, trimmed, de-duplicated; empty codes dropped.
    pub markets: Vec<String>,
    pub hours: f64,
    pub user_id: Option<String>,
    /// Lower-cased and trimmed.
    pub products: Option<String>,
    pub classification: Classification,
    pub reporter_id: Option<String>,
    pub reporter_name: Option<String>,
    pub ai_usage: Vec<AiUsage>,
    pub use_external_asset: bool,
    /// Calendar month as `YYYY-MM`.
    pub month: Option<String>,
}

impl NormalizedTask {
    /// Distinct AI models used on this task, in first-seen order.
    pub fn ai_models(&self) -> Vec<String> {
        let mut models: Vec<String> = Vec::new();
        for usage in &self.ai_usage {
            for model in &usage.models {
                if !models.contains(model) {
                    models.push(model.clone());
                }
            }
        }
        models
    }

    /// AI hours attributed to `model`.
    pub fn ai_hours_for(&self, model: &str) -> f64 {
        self.ai_usage
            .iter()
            .filter(|u| u.models.iter().any(|m| m == model))
            .map(|u| u.hours)
            .sum()
    }

    pub fn total_ai_hours(&self) -> f64 {
        self.ai_usage.iter().map(|u| u.hours).sum()
    }

    pub fn uses_ai(&self) -> bool {
        self.ai_usage
            .iter()
            .any(|u| u.hours > 0.0 || !u.models.is_empty())
    }
}

/// Normalize a single task record. Never fails and never mutates the input.
pub fn normalize(raw: &TaskRecord) -> NormalizedTask {
    let products = products(raw);
    let classification = classify(products.as_deref().unwrap_or(""));

    NormalizedTask {
        id: task_id(raw),
        name: task_name(raw),
        markets: markets(raw),
        hours: hours(raw),
        user_id: user_id(raw),
        products,
        classification,
        reporter_id: reporter_id(raw),
        reporter_name: reporter_name(raw),
        ai_usage: ai_usage(raw),
        use_external_asset: use_external_asset(raw),
        month: month(raw),
    }
}

/// Normalize a whole task list. The list itself must be a JSON array.
pub fn normalize_all(tasks: &Value) -> Result<Vec<NormalizedTask>> {
    match tasks {
        Value::Array(items) => Ok(items.iter().map(normalize).collect()),
        other => Err(EngineError::TasksNotArray(json_type_name(other))),
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// =============================================================================
// Field accessors
// =============================================================================

fn detail(raw: &Value) -> Option<&Map<String, Value>> {
    DETAIL_KEYS
        .iter()
        .find_map(|key| raw.get(*key).and_then(Value::as_object))
}

/// First non-null value for any of `keys`, detail object first.
fn lookup<'a>(raw: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    let from_detail = detail(raw).and_then(|d| first_present(d, keys));
    from_detail.or_else(|| raw.as_object().and_then(|top| first_present(top, keys)))
}

fn first_present<'a>(object: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|key| object.get(*key))
        .find(|value| !value.is_null())
}

fn string_field(raw: &Value, keys: &[&str]) -> Option<String> {
    lookup(raw, keys).and_then(value_to_string)
}

fn value_to_string(value: &Value) -> Option<String> {
    let s = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        // Some records store a single reporter as a one-element array
        Value::Array(items) => return items.iter().find_map(value_to_string),
        _ => return None,
    };
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}

fn number(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    if n.is_finite() {
        Some(n.max(0.0))
    } else {
        None
    }
}

pub fn markets(raw: &Value) -> Vec<String> {
    let Some(Value::Array(items)) = lookup(raw, MARKETS_KEYS) else {
        return Vec::new();
    };

    let mut markets: Vec<String> = Vec::with_capacity(items.len());
    for item in items {
        let Some(code) = item.as_str() else {
            continue;
        };
        let code = normalize_market(code);
        if !code.is_empty() && !markets.contains(&code) {
            markets.push(code);
        }
    }
    markets
}

pub fn hours(raw: &Value) -> f64 {
    lookup(raw, HOURS_KEYS).and_then(number).unwrap_or(0.0)
}

pub fn user_id(raw: &Value) -> Option<String> {
    string_field(raw, USER_KEYS)
}

pub fn products(raw: &Value) -> Option<String> {
    lookup(raw, PRODUCTS_KEYS)
        .and_then(Value::as_str)
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
}

pub fn reporter_id(raw: &Value) -> Option<String> {
    string_field(raw, REPORTER_ID_KEYS)
}

pub fn reporter_name(raw: &Value) -> Option<String> {
    string_field(raw, REPORTER_NAME_KEYS)
}

pub fn ai_usage(raw: &Value) -> Vec<AiUsage> {
    let Some(Value::Array(entries)) = lookup(raw, AI_USAGE_KEYS) else {
        return Vec::new();
    };

    entries
        .iter()
        .filter_map(Value::as_object)
        .map(|entry| {
            let hours = first_present(entry, AI_HOURS_KEYS)
                .and_then(number)
                .unwrap_or(0.0);
            let mut models: Vec<String> = Vec::new();
            if let Some(Value::Array(names)) = first_present(entry, AI_MODELS_KEYS) {
                for name in names.iter().filter_map(Value::as_str) {
                    let name = name.trim();
                    if !name.is_empty() && !models.iter().any(|m| m == name) {
                        models.push(name.to_string());
                    }
                }
            }
            AiUsage { hours, models }
        })
        .collect()
}

pub fn use_external_asset(raw: &Value) -> bool {
    match lookup(raw, EXTERNAL_ASSET_KEYS) {
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => matches!(s.trim().to_lowercase().as_str(), "true" | "yes" | "1"),
        Some(Value::Number(n)) => n.as_f64().is_some_and(|n| n != 0.0),
        _ => false,
    }
}

pub fn task_id(raw: &Value) -> Option<String> {
    string_field(raw, ID_KEYS)
}

pub fn task_name(raw: &Value) -> Option<String> {
    string_field(raw, NAME_KEYS)
}

/// Calendar month of the task: `monthId` when it is a `YYYY-MM` string,
/// otherwise the month of `createdAt`.
pub fn month(raw: &Value) -> Option<String> {
    if let Some(id) = lookup(raw, MONTH_KEYS).and_then(Value::as_str) {
        if let Some(month) = parse_month_id(id) {
            return Some(month);
        }
    }

    let created = lookup(raw, CREATED_AT_KEYS)?;
    let parsed = match created {
        Value::String(s) => parse_date_string(s),
        Value::Number(n) => n
            .as_i64()
            .and_then(DateTime::<Utc>::from_timestamp_millis)
            .map(|dt| dt.date_naive()),
        _ => None,
    };

    if parsed.is_none() {
        tracing::warn!(created_at = %created, "unparseable createdAt, month left empty");
    }
    parsed.map(|date| date.format("%Y-%m").to_string())
}

fn parse_month_id(id: &str) -> Option<String> {
    let id = id.trim();
    let date = NaiveDate::parse_from_str(&format!("{}-01", id), "%Y-%m-%d").ok()?;
    Some(date.format("%Y-%m").to_string())
}

fn parse_date_string(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc).date_naive());
    }
    s.get(..10)
        .and_then(|prefix| NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok())
}
