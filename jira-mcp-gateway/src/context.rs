//! Per-call request context resolution
//!
//! Every tool call resolves a [`RequestContext`] from the request-local
//! [`RequestState`]: a fetcher already attached by an upstream auth layer,
//! a user-scoped fetcher derived from a user token, or the process-wide
//! fetcher built lazily from the global configuration.

use crate::config::JiraConfig;
use crate::error::{JiraMcpError, JiraMcpResult};
use crate::fetcher::{FetcherFactory, JiraFetcher};
use std::fmt;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, info, instrument, warn};

/// Request-local authentication state written by an upstream auth layer.
///
/// The fetcher slot can be filled at most once; a session keeps its
/// user-scoped fetcher until the state is dropped.
#[derive(Default)]
pub struct RequestState {
    jira_fetcher: OnceCell<Arc<dyn JiraFetcher>>,
    pub user_auth_type: Option<String>,
    pub user_token: Option<String>,
    pub user_email: Option<String>,
}

impl RequestState {
    pub fn new() -> Self {
        Self::default()
    }

    /// State carrying a pre-built fetcher
    pub fn with_fetcher(fetcher: Arc<dyn JiraFetcher>) -> Self {
        Self {
            jira_fetcher: OnceCell::new_with(Some(fetcher)),
            ..Self::default()
        }
    }

    /// State carrying a user's credentials
    pub fn with_user_token(auth_type: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            user_auth_type: Some(auth_type.into()),
            user_token: Some(token.into()),
            ..Self::default()
        }
    }

    pub fn email(mut self, email: impl Into<String>) -> Self {
        self.user_email = Some(email.into());
        self
    }

    /// Fetcher attached to this request, if any
    pub fn fetcher(&self) -> Option<Arc<dyn JiraFetcher>> {
        self.jira_fetcher.get().cloned()
    }

    fn user_auth(&self) -> Option<UserAuth> {
        match (&self.user_auth_type, &self.user_token) {
            (Some(auth_type), Some(token)) if !token.is_empty() => Some(UserAuth {
                auth_type: auth_type.clone(),
                token: token.clone(),
                email: self.user_email.clone(),
            }),
            _ => None,
        }
    }
}

impl fmt::Debug for RequestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestState")
            .field("has_fetcher", &self.jira_fetcher.initialized())
            .field("user_auth_type", &self.user_auth_type)
            .field("user_email", &self.user_email)
            .finish_non_exhaustive()
    }
}

/// User credentials carried by a request
#[derive(Clone, PartialEq, Eq)]
pub struct UserAuth {
    pub auth_type: String,
    pub token: String,
    pub email: Option<String>,
}

impl fmt::Debug for UserAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserAuth")
            .field("auth_type", &self.auth_type)
            .field("token", &"<redacted>")
            .field("email", &self.email)
            .finish()
    }
}

/// Everything a tool handler needs for one call
#[derive(Clone)]
pub struct RequestContext {
    pub fetcher: Arc<dyn JiraFetcher>,
    pub read_only: bool,
    pub user_auth: Option<UserAuth>,
}

impl RequestContext {
    /// Reject a mutating operation in read-only mode
    pub fn ensure_writable(&self, operation: &str) -> JiraMcpResult<()> {
        if self.read_only {
            warn!("Rejected '{}' in read-only mode", operation);
            return Err(JiraMcpError::permission(format!(
                "Cannot {} in read-only mode",
                operation
            )));
        }
        Ok(())
    }
}

impl fmt::Debug for RequestContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestContext")
            .field("jira_url", &self.fetcher.config().jira_url)
            .field("read_only", &self.read_only)
            .field("user_auth", &self.user_auth)
            .finish()
    }
}

/// Resolves the fetcher for each call
pub struct ContextResolver {
    global_config: Option<Arc<JiraConfig>>,
    read_only: bool,
    factory: Arc<dyn FetcherFactory>,
    global_fetcher: OnceCell<Arc<dyn JiraFetcher>>,
}

impl ContextResolver {
    pub fn new(global_config: Option<JiraConfig>, factory: Arc<dyn FetcherFactory>) -> Self {
        let read_only = global_config.as_ref().is_some_and(|c| c.read_only);
        Self {
            global_config: global_config.map(Arc::new),
            read_only,
            factory,
            global_fetcher: OnceCell::new(),
        }
    }

    /// Force read-only mode regardless of the fetcher configuration
    pub fn read_only(mut self, read_only: bool) -> Self {
        self.read_only = self.read_only || read_only;
        self
    }

    pub fn global_config(&self) -> Option<&JiraConfig> {
        self.global_config.as_deref()
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// Pick the fetcher for this call
    #[instrument(skip_all)]
    pub async fn resolve(&self, request: &RequestState) -> JiraMcpResult<RequestContext> {
        let user_auth = request.user_auth();

        let fetcher = if let Some(fetcher) = request.fetcher() {
            debug!("Using fetcher attached to the request");
            fetcher
        } else if let Some(auth) = &user_auth {
            self.user_fetcher(request, auth).await?
        } else {
            self.global_fetcher().await?
        };

        let read_only = self.read_only || fetcher.config().read_only;
        Ok(RequestContext {
            fetcher,
            read_only,
            user_auth,
        })
    }

    async fn user_fetcher(
        &self,
        request: &RequestState,
        auth: &UserAuth,
    ) -> JiraMcpResult<Arc<dyn JiraFetcher>> {
        let fetcher = request
            .jira_fetcher
            .get_or_try_init(|| async {
                let global = self.global_config.as_ref().ok_or_else(|| {
                    JiraMcpError::config("Jira global configuration (URL, auth) is not available")
                })?;

                info!(
                    "Building user-scoped Jira fetcher (auth type: {}, email: {})",
                    auth.auth_type,
                    auth.email.as_deref().unwrap_or("unknown")
                );
                let user_config = global.with_user_credentials(&auth.auth_type, &auth.token)?;
                let fetcher = self.factory.create(Arc::new(user_config)).await?;

                let account_id = fetcher.current_user_account_id().await.map_err(|e| {
                    JiraMcpError::auth(format!("Invalid user Jira token or configuration: {}", e))
                })?;
                debug!("Validated user token for account {}", account_id);

                Ok::<_, JiraMcpError>(fetcher)
            })
            .await?;

        Ok(fetcher.clone())
    }

    async fn global_fetcher(&self) -> JiraMcpResult<Arc<dyn JiraFetcher>> {
        let fetcher = self
            .global_fetcher
            .get_or_try_init(|| async {
                let config = self
                    .global_config
                    .as_ref()
                    .filter(|config| config.can_build_client())
                    .ok_or_else(|| {
                        JiraMcpError::config(
                            "Jira client (fetcher) not available. Ensure server is configured correctly.",
                        )
                    })?;

                info!("Building global Jira fetcher for {}", config.jira_url);
                self.factory.create(config.clone()).await
            })
            .await?;

        Ok(fetcher.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_auth_requires_a_token() {
        assert!(RequestState::new().user_auth().is_none());
        assert!(RequestState::with_user_token("pat", "").user_auth().is_none());

        let auth = RequestState::with_user_token("pat", "secret")
            .email("user@example.com")
            .user_auth()
            .expect("token present");
        assert_eq!(auth.auth_type, "pat");
        assert_eq!(auth.email.as_deref(), Some("user@example.com"));
    }

    #[test]
    fn test_debug_output_redacts_token() {
        let state = RequestState::with_user_token("oauth", "secret");
        let auth = state.user_auth().expect("token present");

        assert!(!format!("{:?}", auth).contains("secret"));
        assert!(!format!("{:?}", state).contains("secret"));
    }
}
