//! Error types and handling for the Jira MCP gateway
//!
//! Every failure raised by the fetcher or by parameter normalization is
//! classified into a small closed taxonomy. Classified errors can be rendered
//! as a uniform JSON envelope (`{"success": false, "error": ...}`) for tools
//! that report soft failures; everything else surfaces as a [`ToolCallError`]
//! naming the failing tool.

use serde_json::{Map, Value};
use thiserror::Error;

/// Custom error types for the Jira MCP gateway
#[derive(Debug, Error)]
pub enum JiraMcpError {
    /// Configuration errors (-32001)
    #[error("Configuration Error: {message}")]
    Configuration { message: String },

    /// Authentication failures (-32002)
    #[error("Authentication/Permission Error: {message}")]
    Authentication { message: String },

    /// Upstream HTTP / transport failures (-32003)
    #[error("Network or API Error: {message}")]
    Upstream { message: String },

    /// Permission denied errors (-32004)
    #[error("Authentication/Permission Error: {message}")]
    Permission { message: String },

    /// Resource not found errors (-32005)
    #[error("{} '{key}' not found", capitalize(.resource))]
    NotFound { resource: String, key: String },

    /// Invalid parameter errors (-32006)
    #[error("Invalid parameter '{parameter}': {message}")]
    InvalidParameter { parameter: String, message: String },

    /// Unclassified errors, never rendered as a soft envelope
    #[error("Unexpected error: {message}")]
    Internal { message: String },
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

impl JiraMcpError {
    /// Get the MCP JSON-RPC error code for this error
    pub fn error_code(&self) -> i32 {
        match self {
            JiraMcpError::Configuration { .. } => -32001,
            JiraMcpError::Authentication { .. } => -32002,
            JiraMcpError::Upstream { .. } => -32003,
            JiraMcpError::Permission { .. } => -32004,
            JiraMcpError::NotFound { .. } => -32005,
            JiraMcpError::InvalidParameter { .. } => -32006,
            JiraMcpError::Internal { .. } => -32603,
        }
    }

    /// Get the error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            JiraMcpError::Configuration { .. } => "configuration",
            JiraMcpError::Authentication { .. } => "authentication",
            JiraMcpError::Upstream { .. } => "upstream",
            JiraMcpError::Permission { .. } => "permission",
            JiraMcpError::NotFound { .. } => "not_found",
            JiraMcpError::InvalidParameter { .. } => "invalid_parameter",
            JiraMcpError::Internal { .. } => "internal",
        }
    }

    /// Get additional error data for MCP error responses
    pub fn error_data(&self) -> Value {
        let mut data = Map::new();
        data.insert(
            "category".to_string(),
            Value::String(self.category().to_string()),
        );

        match self {
            JiraMcpError::NotFound { resource, key } => {
                data.insert("resource".to_string(), Value::String(resource.clone()));
                data.insert("key".to_string(), Value::String(key.clone()));
            }
            JiraMcpError::InvalidParameter { parameter, .. } => {
                data.insert("parameter".to_string(), Value::String(parameter.clone()));
            }
            _ => {}
        }

        Value::Object(data)
    }

    /// Whether the error belongs to the classified taxonomy
    pub fn is_classified(&self) -> bool {
        !matches!(self, JiraMcpError::Internal { .. })
    }

    /// Render a classified error as a soft-failure envelope.
    ///
    /// Unclassified errors are handed back unchanged so the caller can
    /// propagate them as a tool-call failure.
    pub fn into_envelope(self, context: Map<String, Value>) -> Result<ErrorEnvelope, Self> {
        if self.is_classified() {
            Ok(ErrorEnvelope::new(self.to_string(), context))
        } else {
            Err(self)
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        JiraMcpError::Configuration {
            message: message.into(),
        }
    }

    /// Create an authentication error
    pub fn auth(message: impl Into<String>) -> Self {
        JiraMcpError::Authentication {
            message: message.into(),
        }
    }

    /// Create an upstream (HTTP / transport) error
    pub fn upstream(message: impl Into<String>) -> Self {
        JiraMcpError::Upstream {
            message: message.into(),
        }
    }

    /// Create a permission error
    pub fn permission(message: impl Into<String>) -> Self {
        JiraMcpError::Permission {
            message: message.into(),
        }
    }

    /// Create a not found error
    pub fn not_found(resource: impl Into<String>, key: impl Into<String>) -> Self {
        JiraMcpError::NotFound {
            resource: resource.into(),
            key: key.into(),
        }
    }

    /// Create an invalid parameter error
    pub fn invalid_param(parameter: impl Into<String>, message: impl Into<String>) -> Self {
        JiraMcpError::InvalidParameter {
            parameter: parameter.into(),
            message: message.into(),
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        JiraMcpError::Internal {
            message: message.into(),
        }
    }
}

/// Uniform soft-failure body: `{"success": false, "error": "...", <context>}`
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorEnvelope {
    pub success: bool,
    pub error: String,
    pub context: Map<String, Value>,
}

impl ErrorEnvelope {
    pub fn new(error: impl Into<String>, context: Map<String, Value>) -> Self {
        Self {
            success: false,
            error: error.into(),
            context,
        }
    }

    pub fn into_value(self) -> Value {
        let mut object = Map::new();
        object.insert("success".to_string(), Value::Bool(self.success));
        object.insert("error".to_string(), Value::String(self.error));
        object.extend(self.context);
        Value::Object(object)
    }
}

/// Hard failure of a single tool call, surfaced to the protocol layer
#[derive(Debug, Error)]
#[error("Error calling tool '{tool}': {source}")]
pub struct ToolCallError {
    pub tool: String,
    #[source]
    pub source: JiraMcpError,
}

impl ToolCallError {
    pub fn new(tool: impl Into<String>, source: JiraMcpError) -> Self {
        Self {
            tool: tool.into(),
            source,
        }
    }

    pub fn error_code(&self) -> i32 {
        self.source.error_code()
    }
}

/// Convert from gouqi errors to JiraMcpError
impl From<gouqi::Error> for JiraMcpError {
    fn from(err: gouqi::Error) -> Self {
        match err {
            gouqi::Error::Http(_) => JiraMcpError::upstream(format!("HTTP error: {}", err)),
            gouqi::Error::IO(_) => JiraMcpError::upstream(format!("IO error: {}", err)),
            gouqi::Error::Serde(_) => {
                JiraMcpError::internal(format!("Serialization error: {}", err))
            }
            gouqi::Error::Unauthorized => JiraMcpError::auth("Jira authentication failed"),
            gouqi::Error::NotFound => JiraMcpError::not_found("resource", "unknown"),
            gouqi::Error::Fault { .. } => {
                let message = err.to_string();
                if message.contains("403") || message.contains("Forbidden") {
                    JiraMcpError::permission(message)
                } else {
                    JiraMcpError::upstream(message)
                }
            }
            _ => JiraMcpError::upstream(format!("Jira client error: {}", err)),
        }
    }
}

/// Convert from serde_json errors
impl From<serde_json::Error> for JiraMcpError {
    fn from(err: serde_json::Error) -> Self {
        JiraMcpError::internal(format!("JSON error: {}", err))
    }
}

/// Convert from TOML parsing errors
impl From<toml::de::Error> for JiraMcpError {
    fn from(err: toml::de::Error) -> Self {
        JiraMcpError::config(format!("TOML parsing error: {}", err))
    }
}

/// Convert from generic anyhow errors
impl From<anyhow::Error> for JiraMcpError {
    fn from(err: anyhow::Error) -> Self {
        // Try to determine the category based on the error message
        let message = err.to_string();
        let lower_message = message.to_lowercase();

        if lower_message.contains("authentication") || lower_message.contains("unauthorized") {
            JiraMcpError::auth(message)
        } else if lower_message.contains("permission")
            || lower_message.contains("forbidden")
            || lower_message.contains("403")
        {
            JiraMcpError::permission(message)
        } else if lower_message.contains("network")
            || lower_message.contains("connection")
            || lower_message.contains("timeout")
        {
            JiraMcpError::upstream(message)
        } else if lower_message.contains("config") {
            JiraMcpError::config(message)
        } else {
            JiraMcpError::internal(message)
        }
    }
}

/// Result type alias for Jira MCP operations
pub type JiraMcpResult<T> = Result<T, JiraMcpError>;
