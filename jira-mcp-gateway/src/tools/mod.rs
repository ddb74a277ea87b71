//! Tools module for the Jira MCP gateway
//!
//! One async handler per tool. Every handler takes the resolved
//! [`RequestContext`](crate::context::RequestContext) and its typed params,
//! validates and normalizes them, delegates to exactly one fetcher
//! operation and shapes the simplified JSON result.

pub mod agile;
pub mod attachments;
pub mod issues;
pub mod links;
pub mod projects;
pub mod search;
pub mod transitions;
pub mod users;
pub mod worklogs;

pub use agile::*;
pub use attachments::*;
pub use issues::*;
pub use links::*;
pub use projects::*;
pub use search::*;
pub use transitions::*;
pub use users::*;
pub use worklogs::*;

use crate::error::JiraMcpResult;
use serde::Serialize;
use serde_json::{Map, Value};

/// Serialize a model into its simplified JSON form
pub(crate) fn to_json<T: Serialize>(value: &T) -> JiraMcpResult<Value> {
    Ok(serde_json::to_value(value)?)
}

/// `{"message": ..., "<entity>": ...}` envelope for mutating tools
pub(crate) fn with_message<T: Serialize>(
    message: impl Into<String>,
    entity: &str,
    value: &T,
) -> JiraMcpResult<Value> {
    let mut body = Map::new();
    body.insert("message".to_string(), Value::String(message.into()));
    body.insert(entity.to_string(), to_json(value)?);
    Ok(Value::Object(body))
}

/// Treat blank optional strings as absent
pub(crate) fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
