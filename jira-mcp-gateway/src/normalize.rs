//! Parameter normalization
//!
//! Tool arguments arrive loosely typed: comma-separated strings, native lists,
//! JSON-encoded strings. The types here accept every accepted spelling at the
//! deserialization boundary and turn it into one canonical form.

use crate::error::{JiraMcpError, JiraMcpResult};
use chrono::NaiveDate;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Split a comma-separated string, trimming entries and dropping empty ones.
///
/// `None` stays `None` (selection unset); `""` is an explicit empty list.
pub fn parse_comma_list(value: Option<&str>) -> Option<Vec<String>> {
    value.map(|raw| {
        raw.split(',')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(str::to_string)
            .collect()
    })
}

/// Parse a field selection; `*all` selects every field
pub fn parse_field_selection(value: Option<&str>) -> Option<Vec<String>> {
    match value.map(str::trim) {
        Some("*all") => Some(vec!["*all".to_string()]),
        _ => parse_comma_list(value),
    }
}

/// Fail unless `value` is present and non-blank
pub fn require_non_blank<'a>(parameter: &str, value: Option<&'a str>) -> JiraMcpResult<&'a str> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(JiraMcpError::invalid_param(
            parameter,
            format!("{} is required and cannot be empty", parameter),
        )),
    }
}

/// Accept only `YYYY-MM-DD` dates
pub fn validate_date(parameter: &str, value: &str) -> JiraMcpResult<()> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map(|_| ())
        .map_err(|_| {
            JiraMcpError::invalid_param(
                parameter,
                format!("'{}' is not a valid date, expected YYYY-MM-DD", value),
            )
        })
}

/// A list given either as a comma-separated string or a native list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum StringOrList {
    List(Vec<String>),
    String(String),
}

impl StringOrList {
    /// Canonical list; `None` when nothing remains after trimming
    pub fn into_list(self) -> Option<Vec<String>> {
        let items: Vec<String> = match self {
            StringOrList::String(raw) => parse_comma_list(Some(&raw)).unwrap_or_default(),
            StringOrList::List(items) => items
                .into_iter()
                .map(|item| item.trim().to_string())
                .filter(|item| !item.is_empty())
                .collect(),
        };
        Some(items).filter(|items| !items.is_empty())
    }
}

/// A list given either natively or as a JSON-encoded array string
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum ListOrJson {
    List(Vec<Value>),
    Json(String),
}

impl ListOrJson {
    /// Raw JSON items, decoding the string form if needed
    pub fn into_values(self, parameter: &str) -> JiraMcpResult<Vec<Value>> {
        match self {
            ListOrJson::List(items) => Ok(items),
            ListOrJson::Json(raw) => match serde_json::from_str::<Value>(&raw) {
                Ok(Value::Array(items)) => Ok(items),
                _ => Err(JiraMcpError::invalid_param(
                    parameter,
                    format!("{} must be a list or a valid JSON array string", parameter),
                )),
            },
        }
    }

    /// Decode every item into `T`; the first malformed item fails the whole list
    pub fn into_list<T: DeserializeOwned>(self, parameter: &str) -> JiraMcpResult<Vec<T>> {
        self.into_values(parameter)?
            .into_iter()
            .enumerate()
            .map(|(index, item)| {
                serde_json::from_value(item).map_err(|e| {
                    JiraMcpError::invalid_param(parameter, format!("item {}: {}", index, e))
                })
            })
            .collect()
    }
}

/// A JSON object given either natively or as a JSON-encoded string
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum ObjectOrJson {
    Object(Map<String, Value>),
    Json(String),
}

impl ObjectOrJson {
    pub fn into_object(self, parameter: &str) -> JiraMcpResult<Map<String, Value>> {
        match self {
            ObjectOrJson::Object(object) => Ok(object),
            ObjectOrJson::Json(raw) if raw.trim().is_empty() => Ok(Map::new()),
            ObjectOrJson::Json(raw) => match serde_json::from_str::<Value>(&raw) {
                Ok(Value::Object(object)) => Ok(object),
                _ => Err(JiraMcpError::invalid_param(
                    parameter,
                    format!("{} must be an object or a valid JSON object string", parameter),
                )),
            },
        }
    }
}

/// Allow-list of project keys, compared case-insensitively
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectsFilter {
    keys: Vec<String>,
}

impl ProjectsFilter {
    pub fn parse(raw: Option<&str>) -> Self {
        let keys = parse_comma_list(raw)
            .unwrap_or_default()
            .into_iter()
            .map(|key| key.to_uppercase())
            .collect();
        Self { keys }
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    /// An empty filter allows every project
    pub fn allows(&self, project_key: &str) -> bool {
        self.is_empty() || self.keys.contains(&project_key.trim().to_uppercase())
    }

    /// Restrict a JQL query to the filtered projects.
    ///
    /// Queries that already mention a project clause are left untouched.
    pub fn scope_jql(&self, jql: &str) -> String {
        if self.is_empty() {
            return jql.to_string();
        }

        let clause = match self.keys.as_slice() {
            [single] => format!("project = \"{}\"", single),
            keys => format!(
                "project IN ({})",
                keys.iter()
                    .map(|k| format!("\"{}\"", k))
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
        };

        let trimmed = jql.trim();
        let lower = trimmed.to_ascii_lowercase();
        if lower.contains("project =") || lower.contains("project in") {
            return trimmed.to_string();
        }

        // ORDER BY has to stay outside the parenthesised condition
        let (condition, order_by) = match lower.find("order by") {
            Some(index) => (trimmed[..index].trim(), Some(trimmed[index..].trim())),
            None => (trimmed, None),
        };
        let scoped = if condition.is_empty() {
            clause
        } else {
            format!("({}) AND {}", condition, clause)
        };

        match order_by {
            Some(order_by) => format!("{} {}", scoped, order_by),
            None => scoped,
        }
    }
}
