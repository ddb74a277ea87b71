//! Jira MCP Gateway Library
//!
//! Exposes a Jira instance through the Model Context Protocol. Every tool call
//! resolves a Jira client for the request (a client attached by an upstream
//! auth layer, a user-scoped client built from a user token, or the global
//! client built from configuration), normalizes the loosely-typed arguments,
//! delegates to exactly one Jira operation and returns a simplified JSON view.
//!
//! ## Features
//!
//! - **Per-request authentication**: user tokens get their own client
//! - **Lenient arguments**: lists accepted as arrays, comma strings or JSON strings
//! - **Read-only mode**: mutating tools are rejected before reaching Jira
//! - **Projects filter**: searches and project listings scoped to an allow-list
//! - **Error Handling**: MCP-compliant error codes and soft-failure envelopes

use crate::config::JiraConfig;
use crate::context::{ContextResolver, RequestState};
use crate::dispatch::JiraToolDispatcher;
use crate::error::JiraMcpResult;
use crate::jira_client::GouqiFetcherFactory;
use crate::tools::*;

use pulseengine_mcp_macros::{mcp_server, mcp_tools};
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{info, instrument, warn};

pub mod config;
pub mod context;
pub mod dispatch;
pub mod error;
pub mod fetcher;
pub mod jira_client;
pub mod models;
pub mod normalize;
pub mod tools;

#[doc(hidden)]
pub mod test_support;

/// Jira MCP Gateway server
///
/// Uses the #[mcp_server] macro for the MCP infrastructure; each `jira_*`
/// method below is one tool.
#[mcp_server(
    name = "Jira MCP Gateway",
    version = "0.1.0",
    description = "Jira issue tracker tools: issues, search, projects, agile boards and sprints",
    auth = "disabled"
)]
#[derive(Clone)]
pub struct JiraMcpServer {
    dispatcher: Arc<JiraToolDispatcher>,

    /// Request-local auth state of the stdio session
    session: Arc<RequestState>,
}

impl Default for JiraMcpServer {
    fn default() -> Self {
        let config = JiraConfig::load_optional().unwrap_or_else(|e| {
            warn!("Ignoring invalid Jira configuration: {}", e);
            None
        });
        Self::with_config(config)
    }
}

impl JiraMcpServer {
    /// Create the server from the file and environment configuration.
    ///
    /// A missing Jira URL is not an error: the server starts and every tool
    /// reports a configuration error until one is provided.
    #[instrument]
    pub fn new() -> JiraMcpResult<Self> {
        info!("Initializing Jira MCP Gateway");
        let config = JiraConfig::load_optional()?;
        if let Some(config) = &config {
            info!(
                "Configuration loaded for {} (read-only: {})",
                config.jira_url, config.read_only
            );
        }
        Ok(Self::with_config(config))
    }

    /// Create the server with a given configuration and the REST client
    pub fn with_config(config: Option<JiraConfig>) -> Self {
        let resolver = ContextResolver::new(config, Arc::new(GouqiFetcherFactory));
        Self::with_dispatcher(JiraToolDispatcher::new(resolver))
    }

    /// Create the server around a prepared dispatcher (for testing)
    pub fn with_dispatcher(dispatcher: JiraToolDispatcher) -> Self {
        Self {
            dispatcher: Arc::new(dispatcher),
            session: Arc::new(RequestState::new()),
        }
    }

    /// Use `session` as the request-local auth state of every call
    pub fn with_session(mut self, session: RequestState) -> Self {
        self.session = Arc::new(session);
        self
    }

    pub fn dispatcher(&self) -> &JiraToolDispatcher {
        &self.dispatcher
    }
}

/// All public methods in this impl block become MCP tools automatically
#[mcp_tools]
impl JiraMcpServer {
    /// Retrieve profile information for a Jira user.
    ///
    /// Failures are returned as `{"success": false, "error": ..., "user_identifier": ...}`.
    ///
    /// # Examples
    /// - `{"user_identifier": "jdoe@example.com"}`
    #[instrument(skip(self))]
    pub async fn jira_get_user_profile(&self, params: GetUserProfileParams) -> anyhow::Result<Value> {
        let context = tools::users::user_context(&params.user_identifier);
        Ok(self
            .dispatcher
            .invoke_soft("get_user_profile", &self.session, params, context, get_user_profile)
            .await?)
    }

    /// Get details of a Jira issue including its comments.
    ///
    /// # Examples
    /// - `{"issue_key": "PROJ-123"}`
    /// - `{"issue_key": "PROJ-123", "fields": "summary,status", "comment_limit": 5}`
    #[instrument(skip(self))]
    pub async fn jira_get_issue(&self, params: GetIssueParams) -> anyhow::Result<Value> {
        Ok(self
            .dispatcher
            .invoke("get_issue", &self.session, params, get_issue)
            .await?)
    }

    /// Search Jira issues using JQL.
    ///
    /// # Examples
    /// - `{"jql": "project = PROJ AND status = \"In Progress\"", "limit": 20}`
    #[instrument(skip(self))]
    pub async fn jira_search(&self, params: SearchParams) -> anyhow::Result<Value> {
        Ok(self.dispatcher.invoke("search", &self.session, params, search).await?)
    }

    /// Search Jira fields by keyword; useful to find custom field ids.
    #[instrument(skip(self))]
    pub async fn jira_search_fields(&self, params: SearchFieldsParams) -> anyhow::Result<Value> {
        Ok(self
            .dispatcher
            .invoke("search_fields", &self.session, params, search_fields)
            .await?)
    }

    /// Get all issues of a project.
    #[instrument(skip(self))]
    pub async fn jira_get_project_issues(
        &self,
        params: GetProjectIssuesParams,
    ) -> anyhow::Result<Value> {
        Ok(self
            .dispatcher
            .invoke("get_project_issues", &self.session, params, get_project_issues)
            .await?)
    }

    /// Get the status transitions available for an issue.
    #[instrument(skip(self))]
    pub async fn jira_get_transitions(&self, params: GetTransitionsParams) -> anyhow::Result<Value> {
        Ok(self
            .dispatcher
            .invoke("get_transitions", &self.session, params, get_transitions)
            .await?)
    }

    /// Get the worklog entries of an issue.
    #[instrument(skip(self))]
    pub async fn jira_get_worklog(&self, params: GetWorklogParams) -> anyhow::Result<Value> {
        Ok(self
            .dispatcher
            .invoke("get_worklog", &self.session, params, get_worklog)
            .await?)
    }

    /// Download all attachments of an issue into a local directory.
    ///
    /// # Examples
    /// - `{"issue_key": "PROJ-123", "target_dir": "/tmp/attachments"}`
    #[instrument(skip(self))]
    pub async fn jira_download_attachments(
        &self,
        params: DownloadAttachmentsParams,
    ) -> anyhow::Result<Value> {
        Ok(self
            .dispatcher
            .invoke("download_attachments", &self.session, params, download_attachments)
            .await?)
    }

    /// Get agile boards filtered by name, project or type.
    #[instrument(skip(self))]
    pub async fn jira_get_agile_boards(&self, params: GetAgileBoardsParams) -> anyhow::Result<Value> {
        Ok(self
            .dispatcher
            .invoke("get_agile_boards", &self.session, params, get_agile_boards)
            .await?)
    }

    /// Get the issues of an agile board matching a JQL query.
    #[instrument(skip(self))]
    pub async fn jira_get_board_issues(&self, params: GetBoardIssuesParams) -> anyhow::Result<Value> {
        Ok(self
            .dispatcher
            .invoke("get_board_issues", &self.session, params, get_board_issues)
            .await?)
    }

    /// Get the sprints of an agile board, optionally by state.
    #[instrument(skip(self))]
    pub async fn jira_get_sprints_from_board(
        &self,
        params: GetSprintsFromBoardParams,
    ) -> anyhow::Result<Value> {
        Ok(self
            .dispatcher
            .invoke("get_sprints_from_board", &self.session, params, get_sprints_from_board)
            .await?)
    }

    /// Get the issues of a sprint.
    #[instrument(skip(self))]
    pub async fn jira_get_sprint_issues(&self, params: GetSprintIssuesParams) -> anyhow::Result<Value> {
        Ok(self
            .dispatcher
            .invoke("get_sprint_issues", &self.session, params, get_sprint_issues)
            .await?)
    }

    /// Get the issue link types available in this Jira instance.
    #[instrument(skip(self))]
    pub async fn jira_get_link_types(&self, params: GetLinkTypesParams) -> anyhow::Result<Value> {
        Ok(self
            .dispatcher
            .invoke("get_link_types", &self.session, params, get_link_types)
            .await?)
    }

    /// Get all accessible projects, restricted to the configured projects filter.
    ///
    /// Failures are returned as `{"success": false, "error": ...}`.
    #[instrument(skip(self))]
    pub async fn jira_get_all_projects(&self, params: GetAllProjectsParams) -> anyhow::Result<Value> {
        Ok(self
            .dispatcher
            .invoke_soft("get_all_projects", &self.session, params, Map::new(), get_all_projects)
            .await?)
    }

    /// Get the fix versions of a project.
    #[instrument(skip(self))]
    pub async fn jira_get_project_versions(
        &self,
        params: GetProjectVersionsParams,
    ) -> anyhow::Result<Value> {
        Ok(self
            .dispatcher
            .invoke("get_project_versions", &self.session, params, get_project_versions)
            .await?)
    }

    /// Get changelogs for several issues at once (Jira Cloud only).
    ///
    /// # Examples
    /// - `{"issue_ids_or_keys": ["PROJ-1", "PROJ-2"], "fields": ["status"]}`
    #[instrument(skip(self))]
    pub async fn jira_batch_get_changelogs(
        &self,
        params: BatchGetChangelogsParams,
    ) -> anyhow::Result<Value> {
        Ok(self
            .dispatcher
            .invoke("batch_get_changelogs", &self.session, params, batch_get_changelogs)
            .await?)
    }

    /// Create a new issue.
    ///
    /// # Examples
    /// - `{"project_key": "PROJ", "summary": "Fix login", "issue_type": "Bug", "components": "Frontend,API"}`
    #[instrument(skip(self))]
    pub async fn jira_create_issue(&self, params: CreateIssueParams) -> anyhow::Result<Value> {
        Ok(self
            .dispatcher
            .invoke("create_issue", &self.session, params, create_issue)
            .await?)
    }

    /// Create several issues at once, or only validate them.
    #[instrument(skip(self))]
    pub async fn jira_batch_create_issues(
        &self,
        params: BatchCreateIssuesParams,
    ) -> anyhow::Result<Value> {
        Ok(self
            .dispatcher
            .invoke("batch_create_issues", &self.session, params, batch_create_issues)
            .await?)
    }

    /// Update fields of an existing issue.
    #[instrument(skip(self))]
    pub async fn jira_update_issue(&self, params: UpdateIssueParams) -> anyhow::Result<Value> {
        Ok(self
            .dispatcher
            .invoke("update_issue", &self.session, params, update_issue)
            .await?)
    }

    /// Delete an issue.
    #[instrument(skip(self))]
    pub async fn jira_delete_issue(&self, params: DeleteIssueParams) -> anyhow::Result<Value> {
        Ok(self
            .dispatcher
            .invoke("delete_issue", &self.session, params, delete_issue)
            .await?)
    }

    /// Add a comment to an issue.
    #[instrument(skip(self, params), fields(issue_key = %params.issue_key))]
    pub async fn jira_add_comment(&self, params: AddCommentParams) -> anyhow::Result<Value> {
        Ok(self
            .dispatcher
            .invoke("add_comment", &self.session, params, add_comment)
            .await?)
    }

    /// Log work on an issue.
    ///
    /// # Examples
    /// - `{"issue_key": "PROJ-123", "time_spent": "1h 30m", "comment": "Code review"}`
    #[instrument(skip(self))]
    pub async fn jira_add_worklog(&self, params: AddWorklogParams) -> anyhow::Result<Value> {
        Ok(self
            .dispatcher
            .invoke("add_worklog", &self.session, params, add_worklog)
            .await?)
    }

    /// Link an issue to an epic.
    #[instrument(skip(self))]
    pub async fn jira_link_to_epic(&self, params: LinkToEpicParams) -> anyhow::Result<Value> {
        Ok(self
            .dispatcher
            .invoke("link_to_epic", &self.session, params, link_to_epic)
            .await?)
    }

    /// Create a typed link between two issues.
    ///
    /// # Examples
    /// - `{"link_type": "Blocks", "inward_issue_key": "PROJ-1", "outward_issue_key": "PROJ-2"}`
    #[instrument(skip(self))]
    pub async fn jira_create_issue_link(&self, params: CreateIssueLinkParams) -> anyhow::Result<Value> {
        Ok(self
            .dispatcher
            .invoke("create_issue_link", &self.session, params, create_issue_link)
            .await?)
    }

    /// Remove a link between two issues.
    #[instrument(skip(self))]
    pub async fn jira_remove_issue_link(&self, params: RemoveIssueLinkParams) -> anyhow::Result<Value> {
        Ok(self
            .dispatcher
            .invoke("remove_issue_link", &self.session, params, remove_issue_link)
            .await?)
    }

    /// Move an issue through one of its workflow transitions.
    #[instrument(skip(self))]
    pub async fn jira_transition_issue(&self, params: TransitionIssueParams) -> anyhow::Result<Value> {
        Ok(self
            .dispatcher
            .invoke("transition_issue", &self.session, params, transition_issue)
            .await?)
    }

    /// Create a sprint on a board.
    #[instrument(skip(self))]
    pub async fn jira_create_sprint(&self, params: CreateSprintParams) -> anyhow::Result<Value> {
        Ok(self
            .dispatcher
            .invoke("create_sprint", &self.session, params, create_sprint)
            .await?)
    }

    /// Update the name, state, dates or goal of a sprint.
    #[instrument(skip(self))]
    pub async fn jira_update_sprint(&self, params: UpdateSprintParams) -> anyhow::Result<Value> {
        Ok(self
            .dispatcher
            .invoke("update_sprint", &self.session, params, update_sprint)
            .await?)
    }

    /// Create a fix version in a project.
    #[instrument(skip(self))]
    pub async fn jira_create_version(&self, params: CreateVersionParams) -> anyhow::Result<Value> {
        Ok(self
            .dispatcher
            .invoke("create_version", &self.session, params, create_version)
            .await?)
    }

    /// Create several fix versions; each item succeeds or fails on its own.
    ///
    /// # Examples
    /// - `{"project_key": "PROJ", "versions": [{"name": "v1.0", "releaseDate": "2025-06-30"}]}`
    #[instrument(skip(self))]
    pub async fn jira_batch_create_versions(
        &self,
        params: BatchCreateVersionsParams,
    ) -> anyhow::Result<Value> {
        Ok(self
            .dispatcher
            .invoke("batch_create_versions", &self.session, params, batch_create_versions)
            .await?)
    }
}
