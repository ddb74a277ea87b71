//! Configuration management for the Jira MCP gateway
//!
//! Handles loading configuration from environment variables, TOML files,
//! and provides sensible defaults for all settings.

use crate::error::{JiraMcpError, JiraMcpResult};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use tracing::{debug, info, warn};

const CONFIG_FILE_CANDIDATES: [&str; 2] =
    ["config/jira-mcp-config.toml", "jira-mcp-config.toml"];

/// Main configuration structure for the Jira MCP gateway
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JiraConfig {
    /// Jira instance URL (required)
    pub jira_url: String,

    /// Authentication configuration
    pub auth: AuthConfig,

    /// Reject every mutating tool when set
    pub read_only: bool,

    /// Comma-separated project keys visible through this server
    pub projects_filter: Option<String>,

    /// HTTP request timeout in seconds (default: 30)
    pub request_timeout_seconds: u64,
}

/// Authentication configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum AuthConfig {
    /// Personal Access Token (Server/Data Center)
    PersonalAccessToken(String),

    /// Basic authentication (username + password or API token)
    Basic { username: String, password: String },

    /// Bearer token
    Bearer(String),

    /// Atlassian OAuth 2.0 (3LO)
    OAuth(OAuthConfig),

    /// Anonymous access (limited functionality)
    Anonymous,
}

/// OAuth 2.0 settings shared by the server and every user-scoped client
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OAuthConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    pub scope: String,
    pub cloud_id: Option<String>,
    /// Present only when the server itself holds a token; absent in
    /// multi-user mode where each request brings its own
    pub access_token: Option<String>,
}

impl Default for JiraConfig {
    fn default() -> Self {
        Self {
            jira_url: String::new(),
            auth: AuthConfig::Anonymous,
            read_only: false,
            projects_filter: None,
            request_timeout_seconds: 30,
        }
    }
}

impl JiraConfig {
    /// Load configuration from environment variables, TOML file, and defaults
    /// Priority: env vars > TOML file > defaults
    pub fn load() -> Result<Self> {
        let config = Self::load_unvalidated()?;
        config.validate()?;
        Ok(config)
    }

    /// Like [`JiraConfig::load`], but a missing Jira URL is not an error.
    ///
    /// The server still starts without a global configuration; every tool
    /// call then reports a configuration error unless the request brings
    /// its own credentials.
    pub fn load_optional() -> Result<Option<Self>> {
        let config = Self::load_unvalidated()?;
        if config.jira_url.trim().is_empty() {
            warn!("No Jira URL configured; tools will fail until one is provided");
            return Ok(None);
        }
        config.validate()?;
        Ok(Some(config))
    }

    fn load_unvalidated() -> Result<Self> {
        let mut config = Self::default();

        let mut loaded = false;
        for candidate in CONFIG_FILE_CANDIDATES {
            if let Ok(file_config) = Self::load_from_file(candidate) {
                info!("Loaded configuration from {}", candidate);
                config = file_config;
                loaded = true;
                break;
            }
        }
        if !loaded {
            debug!("No TOML configuration file found, using defaults and environment variables");
        }

        // Override with environment variables
        config.load_from_env()?;

        Ok(config)
    }

    /// Load configuration from a TOML file
    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;

        Ok(config)
    }

    /// Load configuration from environment variables
    fn load_from_env(&mut self) -> Result<()> {
        if let Ok(url) = env::var("JIRA_URL") {
            self.jira_url = url;
            debug!("Loaded JIRA_URL from environment");
        }

        if let Ok(auth_type) = env::var("JIRA_AUTH_TYPE") {
            match auth_type.to_lowercase().as_str() {
                "pat" | "personal_access_token" => {
                    if let Ok(token) = env::var("JIRA_TOKEN") {
                        self.auth = AuthConfig::PersonalAccessToken(token);
                        debug!("Configured Personal Access Token authentication from environment");
                    }
                }
                "basic" => {
                    let username = env::var("JIRA_USERNAME")
                        .context("JIRA_USERNAME required for basic authentication")?;
                    let password = env::var("JIRA_PASSWORD")
                        .context("JIRA_PASSWORD required for basic authentication")?;
                    self.auth = AuthConfig::Basic { username, password };
                    debug!("Configured basic authentication from environment");
                }
                "bearer" => {
                    if let Ok(token) = env::var("JIRA_TOKEN") {
                        self.auth = AuthConfig::Bearer(token);
                        debug!("Configured bearer token authentication from environment");
                    }
                }
                "oauth" => {
                    self.auth = AuthConfig::OAuth(OAuthConfig {
                        client_id: env::var("ATLASSIAN_OAUTH_CLIENT_ID").unwrap_or_default(),
                        client_secret: env::var("ATLASSIAN_OAUTH_CLIENT_SECRET")
                            .unwrap_or_default(),
                        redirect_uri: env::var("ATLASSIAN_OAUTH_REDIRECT_URI").unwrap_or_default(),
                        scope: env::var("ATLASSIAN_OAUTH_SCOPE").unwrap_or_default(),
                        cloud_id: env::var("ATLASSIAN_OAUTH_CLOUD_ID").ok(),
                        access_token: env::var("ATLASSIAN_OAUTH_ACCESS_TOKEN").ok(),
                    });
                    debug!("Configured OAuth authentication from environment");
                }
                "anonymous" => {
                    self.auth = AuthConfig::Anonymous;
                    debug!("Configured anonymous authentication from environment");
                }
                _ => {
                    warn!("Unknown JIRA_AUTH_TYPE: {}, using default", auth_type);
                }
            }
        }

        if let Ok(read_only) = env::var("READ_ONLY_MODE") {
            self.read_only = parse_bool_flag(&read_only);
            debug!("Set read-only mode to {} from environment", self.read_only);
        }

        if let Ok(filter) = env::var("JIRA_PROJECTS_FILTER") {
            self.projects_filter = Some(filter).filter(|f| !f.trim().is_empty());
            debug!("Loaded JIRA_PROJECTS_FILTER from environment");
        }

        if let Ok(timeout) = env::var("JIRA_REQUEST_TIMEOUT") {
            if let Ok(timeout_seconds) = timeout.parse::<u64>() {
                self.request_timeout_seconds = timeout_seconds;
                debug!(
                    "Set request timeout to {} seconds from environment",
                    timeout_seconds
                );
            }
        }

        Ok(())
    }

    /// Validate the configuration
    fn validate(&self) -> Result<()> {
        if self.jira_url.is_empty() {
            return Err(anyhow::anyhow!(
                "JIRA URL is required. Set JIRA_URL environment variable or configure in TOML file."
            ));
        }

        if !self.jira_url.starts_with("http://") && !self.jira_url.starts_with("https://") {
            return Err(anyhow::anyhow!(
                "JIRA URL must start with http:// or https://. Got: {}",
                self.jira_url
            ));
        }

        match &self.auth {
            AuthConfig::PersonalAccessToken(token) => {
                if token.is_empty() {
                    return Err(anyhow::anyhow!("Personal access token cannot be empty"));
                }
            }
            AuthConfig::Basic { username, password } => {
                if username.is_empty() || password.is_empty() {
                    return Err(anyhow::anyhow!(
                        "Username and password cannot be empty for basic auth"
                    ));
                }
            }
            AuthConfig::Bearer(token) => {
                if token.is_empty() {
                    return Err(anyhow::anyhow!("Bearer token cannot be empty"));
                }
            }
            AuthConfig::OAuth(oauth) => {
                if oauth.client_id.is_empty() || oauth.client_secret.is_empty() {
                    return Err(anyhow::anyhow!(
                        "OAuth client id and client secret cannot be empty"
                    ));
                }
                if oauth.access_token.is_none() {
                    info!("OAuth configured without a server token - running in multi-user mode");
                }
            }
            AuthConfig::Anonymous => {
                info!("Using anonymous authentication - functionality may be limited");
            }
        }

        if self.request_timeout_seconds == 0 {
            return Err(anyhow::anyhow!("request_timeout_seconds must be greater than 0"));
        }

        info!("Configuration validation successful");
        Ok(())
    }

    /// Whether this configuration can build a client without per-request credentials
    pub fn can_build_client(&self) -> bool {
        match &self.auth {
            AuthConfig::PersonalAccessToken(token) | AuthConfig::Bearer(token) => {
                !token.is_empty()
            }
            AuthConfig::Basic { username, password } => {
                !username.is_empty() && !password.is_empty()
            }
            AuthConfig::OAuth(oauth) => {
                oauth.cloud_id.is_some()
                    && oauth.access_token.as_deref().is_some_and(|t| !t.is_empty())
            }
            AuthConfig::Anonymous => true,
        }
    }

    /// Atlassian Cloud instances use account ids and support bulk changelogs
    pub fn is_cloud(&self) -> bool {
        matches!(self.auth, AuthConfig::OAuth(_))
            || self.jira_url.contains(".atlassian.net")
            || self.jira_url.contains(".jira.com")
            || self.jira_url.contains(".jira-dev.com")
    }

    /// Base URL REST calls go to; OAuth traffic is routed through the Atlassian gateway
    pub fn api_base_url(&self) -> String {
        match &self.auth {
            AuthConfig::OAuth(OAuthConfig {
                cloud_id: Some(cloud_id),
                ..
            }) => format!("https://api.atlassian.com/ex/jira/{}", cloud_id),
            _ => self.jira_url.trim_end_matches('/').to_string(),
        }
    }

    /// Derive a user-scoped configuration from this (global) one.
    ///
    /// The URL, read-only flag, projects filter and timeout are inherited;
    /// only the credentials change.
    pub fn with_user_credentials(&self, auth_type: &str, token: &str) -> JiraMcpResult<Self> {
        let auth = match auth_type.to_lowercase().as_str() {
            "oauth" => match &self.auth {
                AuthConfig::OAuth(base) if base.cloud_id.is_some() => {
                    AuthConfig::OAuth(OAuthConfig {
                        access_token: Some(token.to_string()),
                        ..base.clone()
                    })
                }
                _ => {
                    return Err(JiraMcpError::config(
                        "OAuth user token supplied but the server has no OAuth configuration with a cloud id",
                    ))
                }
            },
            "pat" => AuthConfig::PersonalAccessToken(token.to_string()),
            other => {
                return Err(JiraMcpError::auth(format!(
                    "Unsupported user auth type '{}'",
                    other
                )))
            }
        };

        Ok(Self {
            auth,
            ..self.clone()
        })
    }

    /// Get the gouqi Credentials from AuthConfig
    pub fn to_gouqi_credentials(&self) -> gouqi::Credentials {
        match &self.auth {
            AuthConfig::PersonalAccessToken(token) => gouqi::Credentials::Bearer(token.clone()),
            AuthConfig::Basic { username, password } => {
                gouqi::Credentials::Basic(username.clone(), password.clone())
            }
            AuthConfig::Bearer(token) => gouqi::Credentials::Bearer(token.clone()),
            AuthConfig::OAuth(oauth) => match &oauth.access_token {
                Some(token) => gouqi::Credentials::Bearer(token.clone()),
                None => gouqi::Credentials::Anonymous,
            },
            AuthConfig::Anonymous => gouqi::Credentials::Anonymous,
        }
    }
}

fn parse_bool_flag(value: &str) -> bool {
    matches!(
        value.trim().to_lowercase().as_str(),
        "true" | "1" | "yes" | "y" | "on"
    )
}
