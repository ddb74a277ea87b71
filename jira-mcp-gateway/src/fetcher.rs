//! Fetcher contract
//!
//! [`JiraFetcher`] is the seam between tool handlers and the REST client:
//! one method per simplified Jira operation, taking named request structs.
//! The gouqi-backed [`crate::jira_client::JiraClient`] implements it for
//! production; `test_support::InMemoryFetcher` implements it for tests.

use crate::config::JiraConfig;
use crate::error::JiraMcpResult;
use crate::models::{
    AttachmentDownloadReport, JiraBoard, JiraChangelog, JiraComment, JiraField, JiraIssue,
    JiraIssueLinkType, JiraProject, JiraSearchResult, JiraSprint, JiraTransition, JiraUser,
    JiraVersion, JiraWorklog, LinkOperationResult,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;

/// Page size used when a tool call does not specify `limit`
pub const DEFAULT_LIMIT: u32 = 10;
/// Page offset used when a tool call does not specify `start_at`
pub const DEFAULT_START: u32 = 0;
/// Number of most recent comments embedded in a fetched issue
pub const DEFAULT_COMMENT_LIMIT: usize = 10;

/// Arguments of [`JiraFetcher::get_issue`]
#[derive(Debug, Clone, PartialEq)]
pub struct GetIssueRequest {
    pub issue_key: String,
    pub fields: Option<Vec<String>>,
    pub expand: Option<String>,
    pub comment_limit: usize,
    pub properties: Option<Vec<String>>,
    pub update_history: bool,
}

impl GetIssueRequest {
    pub fn new(issue_key: impl Into<String>) -> Self {
        Self {
            issue_key: issue_key.into(),
            fields: None,
            expand: None,
            comment_limit: DEFAULT_COMMENT_LIMIT,
            properties: None,
            update_history: true,
        }
    }
}

/// Arguments of [`JiraFetcher::search_issues`]
#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    pub jql: String,
    pub fields: Option<Vec<String>>,
    pub limit: u32,
    pub start: u32,
    /// Overrides the configured projects filter for this search
    pub projects_filter: Option<String>,
    pub expand: Option<String>,
}

/// Arguments of [`JiraFetcher::create_issue`]; also the shape of one
/// `batch_create_issues` item
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CreateIssueRequest {
    pub project_key: String,
    pub summary: String,
    pub issue_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub components: Option<Vec<String>>,
    /// Extra fields (priority, labels, custom fields) set verbatim on the issue
    #[serde(flatten)]
    pub additional_fields: Map<String, Value>,
}

/// Arguments of [`JiraFetcher::update_issue`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateIssueRequest {
    pub issue_key: String,
    pub fields: Map<String, Value>,
    pub additional_fields: Map<String, Value>,
}

/// Arguments of [`JiraFetcher::transition_issue`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransitionRequest {
    pub issue_key: String,
    pub transition_id: String,
    pub fields: Option<Map<String, Value>>,
    pub comment: Option<String>,
}

/// Arguments of [`JiraFetcher::add_worklog`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorklogRequest {
    pub issue_key: String,
    pub time_spent: String,
    pub comment: Option<String>,
    pub started: Option<String>,
    pub original_estimate: Option<String>,
    pub remaining_estimate: Option<String>,
}

/// Arguments of [`JiraFetcher::get_all_agile_boards`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoardQuery {
    pub board_name: Option<String>,
    pub project_key: Option<String>,
    pub board_type: Option<String>,
    pub start: u32,
    pub limit: u32,
}

/// Arguments of [`JiraFetcher::get_board_issues`] and
/// [`JiraFetcher::get_sprint_issues`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScopedIssuesQuery {
    /// Board or sprint id
    pub scope_id: String,
    pub jql: Option<String>,
    pub fields: Option<Vec<String>>,
    pub start: u32,
    pub limit: u32,
    pub expand: Option<String>,
}

/// Arguments of [`JiraFetcher::create_sprint`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CreateSprintRequest {
    pub board_id: String,
    pub sprint_name: String,
    pub start_date: String,
    pub end_date: String,
    pub goal: Option<String>,
}

/// Arguments of [`JiraFetcher::update_sprint`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateSprintRequest {
    pub sprint_id: String,
    pub sprint_name: Option<String>,
    pub state: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub goal: Option<String>,
}

/// Arguments of [`JiraFetcher::create_issue_link`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IssueLinkRequest {
    pub link_type: String,
    pub inward_issue_key: String,
    pub outward_issue_key: String,
    pub comment: Option<String>,
    pub comment_visibility: Option<Map<String, Value>>,
}

/// Arguments of [`JiraFetcher::create_project_version`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CreateVersionRequest {
    pub project_key: String,
    pub name: String,
    pub start_date: Option<String>,
    pub release_date: Option<String>,
    pub description: Option<String>,
}

/// Authenticated access to one Jira instance
#[async_trait]
pub trait JiraFetcher: Send + Sync {
    /// Configuration this fetcher was built from
    fn config(&self) -> &JiraConfig;

    /// Account id (Cloud) or username (Server) of the authenticated user
    async fn current_user_account_id(&self) -> JiraMcpResult<String>;

    async fn get_issue(&self, request: GetIssueRequest) -> JiraMcpResult<JiraIssue>;

    async fn search_issues(&self, request: SearchRequest) -> JiraMcpResult<JiraSearchResult>;

    async fn search_fields(
        &self,
        keyword: &str,
        limit: u32,
        refresh: bool,
    ) -> JiraMcpResult<Vec<JiraField>>;

    async fn get_project_issues(
        &self,
        project_key: &str,
        start: u32,
        limit: u32,
    ) -> JiraMcpResult<JiraSearchResult>;

    async fn get_all_projects(&self, include_archived: bool) -> JiraMcpResult<Vec<JiraProject>>;

    async fn get_project_versions(&self, project_key: &str) -> JiraMcpResult<Vec<JiraVersion>>;

    async fn create_project_version(
        &self,
        request: CreateVersionRequest,
    ) -> JiraMcpResult<JiraVersion>;

    async fn get_user_profile_by_identifier(&self, identifier: &str) -> JiraMcpResult<JiraUser>;

    async fn get_transitions(&self, issue_key: &str) -> JiraMcpResult<Vec<JiraTransition>>;

    async fn transition_issue(&self, request: TransitionRequest) -> JiraMcpResult<JiraIssue>;

    async fn get_worklogs(&self, issue_key: &str) -> JiraMcpResult<Vec<JiraWorklog>>;

    async fn add_worklog(&self, request: WorklogRequest) -> JiraMcpResult<JiraWorklog>;

    async fn download_issue_attachments(
        &self,
        issue_key: &str,
        target_dir: &str,
    ) -> JiraMcpResult<AttachmentDownloadReport>;

    async fn get_all_agile_boards(&self, query: BoardQuery) -> JiraMcpResult<Vec<JiraBoard>>;

    async fn get_board_issues(&self, query: ScopedIssuesQuery) -> JiraMcpResult<JiraSearchResult>;

    async fn get_all_sprints_from_board(
        &self,
        board_id: &str,
        state: Option<&str>,
        start: u32,
        limit: u32,
    ) -> JiraMcpResult<Vec<JiraSprint>>;

    async fn get_sprint_issues(&self, query: ScopedIssuesQuery)
        -> JiraMcpResult<JiraSearchResult>;

    async fn create_sprint(&self, request: CreateSprintRequest) -> JiraMcpResult<JiraSprint>;

    async fn update_sprint(&self, request: UpdateSprintRequest) -> JiraMcpResult<JiraSprint>;

    async fn get_issue_link_types(&self) -> JiraMcpResult<Vec<JiraIssueLinkType>>;

    async fn create_issue_link(
        &self,
        request: IssueLinkRequest,
    ) -> JiraMcpResult<LinkOperationResult>;

    async fn remove_issue_link(&self, link_id: &str) -> JiraMcpResult<LinkOperationResult>;

    async fn link_issue_to_epic(&self, issue_key: &str, epic_key: &str)
        -> JiraMcpResult<JiraIssue>;

    async fn create_issue(&self, request: CreateIssueRequest) -> JiraMcpResult<JiraIssue>;

    /// Create several issues; with `validate_only` nothing is written
    async fn batch_create_issues(
        &self,
        issues: Vec<CreateIssueRequest>,
        validate_only: bool,
    ) -> JiraMcpResult<Vec<JiraIssue>>;

    /// Bulk changelog fetch, Jira Cloud only
    async fn batch_get_changelogs(
        &self,
        issue_ids_or_keys: Vec<String>,
        fields: Option<Vec<String>>,
        limit: Option<u32>,
    ) -> JiraMcpResult<Vec<JiraChangelog>>;

    async fn update_issue(&self, request: UpdateIssueRequest) -> JiraMcpResult<JiraIssue>;

    async fn delete_issue(&self, issue_key: &str) -> JiraMcpResult<()>;

    async fn add_comment(&self, issue_key: &str, comment: &str) -> JiraMcpResult<JiraComment>;
}

/// Builds fetchers from a configuration (global or user-scoped)
#[async_trait]
pub trait FetcherFactory: Send + Sync {
    async fn create(&self, config: Arc<JiraConfig>) -> JiraMcpResult<Arc<dyn JiraFetcher>>;
}
