//! In-memory Jira fetcher for tests
//!
//! [`InMemoryFetcher`] satisfies the [`JiraFetcher`] contract without any
//! network access. It records every delegate call so tests can assert the
//! exact normalized arguments, and it can be told to fail specific methods.

use crate::config::JiraConfig;
use crate::error::{JiraMcpError, JiraMcpResult};
use crate::fetcher::{
    BoardQuery, CreateIssueRequest, CreateSprintRequest, CreateVersionRequest, FetcherFactory,
    GetIssueRequest, IssueLinkRequest, JiraFetcher, ScopedIssuesQuery, SearchRequest,
    TransitionRequest, UpdateIssueRequest, UpdateSprintRequest, WorklogRequest,
};
use crate::models::{
    AttachmentDownloadReport, JiraBoard, JiraChangeHistory, JiraChangeItem, JiraChangelog,
    JiraComment, JiraField, JiraIssue, JiraIssueLinkType, JiraProject, JiraSearchResult,
    JiraSprint, JiraTransition, JiraUser, JiraVersion, JiraWorklog, LinkOperationResult,
};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

/// Identifier for which [`InMemoryFetcher::get_user_profile_by_identifier`] reports not found
pub const UNKNOWN_USER: &str = "nonexistent@example.com";

/// One recorded delegate call
#[derive(Debug, Clone, PartialEq)]
pub enum FetcherCall {
    CurrentUser,
    GetIssue(GetIssueRequest),
    SearchIssues(SearchRequest),
    SearchFields {
        keyword: String,
        limit: u32,
        refresh: bool,
    },
    GetProjectIssues {
        project_key: String,
        start: u32,
        limit: u32,
    },
    GetAllProjects {
        include_archived: bool,
    },
    GetProjectVersions(String),
    CreateProjectVersion(CreateVersionRequest),
    GetUserProfile(String),
    GetTransitions(String),
    TransitionIssue(TransitionRequest),
    GetWorklogs(String),
    AddWorklog(WorklogRequest),
    DownloadAttachments {
        issue_key: String,
        target_dir: String,
    },
    GetAgileBoards(BoardQuery),
    GetBoardIssues(ScopedIssuesQuery),
    GetSprintsFromBoard {
        board_id: String,
        state: Option<String>,
        start: u32,
        limit: u32,
    },
    GetSprintIssues(ScopedIssuesQuery),
    CreateSprint(CreateSprintRequest),
    UpdateSprint(UpdateSprintRequest),
    GetIssueLinkTypes,
    CreateIssueLink(IssueLinkRequest),
    RemoveIssueLink(String),
    LinkToEpic {
        issue_key: String,
        epic_key: String,
    },
    CreateIssue(CreateIssueRequest),
    BatchCreateIssues {
        issues: Vec<CreateIssueRequest>,
        validate_only: bool,
    },
    BatchGetChangelogs {
        issue_ids_or_keys: Vec<String>,
        fields: Option<Vec<String>>,
        limit: Option<u32>,
    },
    UpdateIssue(UpdateIssueRequest),
    DeleteIssue(String),
    AddComment {
        issue_key: String,
        comment: String,
    },
}

type FailureFn = Box<dyn Fn() -> JiraMcpError + Send + Sync>;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Fetcher double backed by canned data
pub struct InMemoryFetcher {
    config: JiraConfig,
    calls: Mutex<Vec<FetcherCall>>,
    projects: Mutex<Vec<JiraProject>>,
    failures: Mutex<HashMap<&'static str, FailureFn>>,
    failing_versions: Mutex<HashSet<String>>,
}

impl Default for InMemoryFetcher {
    fn default() -> Self {
        Self::new(JiraConfig {
            jira_url: "https://test.atlassian.net".to_string(),
            ..Default::default()
        })
    }
}

impl InMemoryFetcher {
    pub fn new(config: JiraConfig) -> Self {
        Self {
            config,
            calls: Mutex::new(Vec::new()),
            projects: Mutex::new(Vec::new()),
            failures: Mutex::new(HashMap::new()),
            failing_versions: Mutex::new(HashSet::new()),
        }
    }

    /// Configured projects filter seen by tools through [`JiraFetcher::config`]
    pub fn with_projects_filter(mut self, filter: Option<&str>) -> Self {
        self.config.projects_filter = filter.map(str::to_string);
        self
    }

    pub fn with_read_only(mut self, read_only: bool) -> Self {
        self.config.read_only = read_only;
        self
    }

    /// Projects returned by `get_all_projects`, given as `(key, name)` pairs
    pub fn with_projects(self, projects: &[(&str, &str)]) -> Self {
        *lock(&self.projects) = projects
            .iter()
            .enumerate()
            .map(|(index, (key, name))| JiraProject {
                id: format!("{}", 10000 + index),
                key: key.to_string(),
                name: name.to_string(),
                ..Default::default()
            })
            .collect();
        self
    }

    /// Make every call of `method` fail with the error built by `error`
    pub fn fail_on<F>(self, method: &'static str, error: F) -> Self
    where
        F: Fn() -> JiraMcpError + Send + Sync + 'static,
    {
        lock(&self.failures).insert(method, Box::new(error));
        self
    }

    /// Make `create_project_version` fail for the named version
    pub fn fail_version(self, name: &str) -> Self {
        lock(&self.failing_versions).insert(name.to_string());
        self
    }

    pub fn calls(&self) -> Vec<FetcherCall> {
        lock(&self.calls).clone()
    }

    pub fn call_count(&self) -> usize {
        lock(&self.calls).len()
    }

    fn record(&self, method: &'static str, call: FetcherCall) -> JiraMcpResult<()> {
        lock(&self.calls).push(call);
        match lock(&self.failures).get(method) {
            Some(error) => Err(error()),
            None => Ok(()),
        }
    }

    fn issue(&self, key: &str, summary: &str) -> JiraIssue {
        JiraIssue {
            id: "10001".to_string(),
            key: key.to_string(),
            summary: summary.to_string(),
            url: Some(format!("{}/browse/{}", self.config.jira_url, key)),
            status: Some("Open".to_string()),
            issue_type: Some("Task".to_string()),
            project_key: key.split('-').next().map(str::to_string),
            ..Default::default()
        }
    }

    fn page(&self, start: u32, limit: u32) -> JiraSearchResult {
        JiraSearchResult {
            total: 1,
            start_at: u64::from(start),
            max_results: u64::from(limit),
            issues: vec![self.issue("PROJ-123", "Found Issue")],
        }
    }
}

#[async_trait]
impl JiraFetcher for InMemoryFetcher {
    fn config(&self) -> &JiraConfig {
        &self.config
    }

    async fn current_user_account_id(&self) -> JiraMcpResult<String> {
        self.record("current_user_account_id", FetcherCall::CurrentUser)?;
        Ok("test-account-id".to_string())
    }

    async fn get_issue(&self, request: GetIssueRequest) -> JiraMcpResult<JiraIssue> {
        let key = request.issue_key.clone();
        self.record("get_issue", FetcherCall::GetIssue(request))?;
        Ok(self.issue(&key, "Test Issue Summary"))
    }

    async fn search_issues(&self, request: SearchRequest) -> JiraMcpResult<JiraSearchResult> {
        let (start, limit) = (request.start, request.limit);
        self.record("search_issues", FetcherCall::SearchIssues(request))?;
        Ok(self.page(start, limit))
    }

    async fn search_fields(
        &self,
        keyword: &str,
        limit: u32,
        refresh: bool,
    ) -> JiraMcpResult<Vec<JiraField>> {
        self.record(
            "search_fields",
            FetcherCall::SearchFields {
                keyword: keyword.to_string(),
                limit,
                refresh,
            },
        )?;
        Ok(vec![JiraField {
            id: "customfield_10010".to_string(),
            name: "Story Points".to_string(),
            custom: true,
            schema_type: Some("number".to_string()),
        }])
    }

    async fn get_project_issues(
        &self,
        project_key: &str,
        start: u32,
        limit: u32,
    ) -> JiraMcpResult<JiraSearchResult> {
        self.record(
            "get_project_issues",
            FetcherCall::GetProjectIssues {
                project_key: project_key.to_string(),
                start,
                limit,
            },
        )?;
        Ok(self.page(start, limit))
    }

    async fn get_all_projects(&self, include_archived: bool) -> JiraMcpResult<Vec<JiraProject>> {
        self.record(
            "get_all_projects",
            FetcherCall::GetAllProjects { include_archived },
        )?;
        Ok(lock(&self.projects).clone())
    }

    async fn get_project_versions(&self, project_key: &str) -> JiraMcpResult<Vec<JiraVersion>> {
        self.record(
            "get_project_versions",
            FetcherCall::GetProjectVersions(project_key.to_string()),
        )?;
        Ok(vec![
            JiraVersion {
                id: "100".to_string(),
                name: "v1.0".to_string(),
                description: Some("First release".to_string()),
                released: true,
                ..Default::default()
            },
            JiraVersion {
                id: "101".to_string(),
                name: "v2.0".to_string(),
                ..Default::default()
            },
        ])
    }

    async fn create_project_version(
        &self,
        request: CreateVersionRequest,
    ) -> JiraMcpResult<JiraVersion> {
        let failing = lock(&self.failing_versions).contains(&request.name);
        self.record(
            "create_project_version",
            FetcherCall::CreateProjectVersion(request.clone()),
        )?;
        if failing {
            return Err(JiraMcpError::upstream("Simulated failure"));
        }
        Ok(JiraVersion {
            id: format!("{}-id", request.name),
            name: request.name,
            description: request.description,
            start_date: request.start_date,
            release_date: request.release_date,
            ..Default::default()
        })
    }

    async fn get_user_profile_by_identifier(&self, identifier: &str) -> JiraMcpResult<JiraUser> {
        self.record(
            "get_user_profile_by_identifier",
            FetcherCall::GetUserProfile(identifier.to_string()),
        )?;
        if identifier == UNKNOWN_USER {
            return Err(JiraMcpError::not_found("user", identifier));
        }
        Ok(JiraUser {
            display_name: format!("Test User ({})", identifier),
            name: identifier.to_string(),
            email: Some(identifier.to_string()),
            account_id: Some("test-account-id".to_string()),
            avatar_url: Some(format!("{}/avatar/{}", self.config.jira_url, identifier)),
            active: true,
            time_zone: None,
        })
    }

    async fn get_transitions(&self, issue_key: &str) -> JiraMcpResult<Vec<JiraTransition>> {
        self.record(
            "get_transitions",
            FetcherCall::GetTransitions(issue_key.to_string()),
        )?;
        Ok(vec![
            JiraTransition {
                id: "11".to_string(),
                name: "Start Progress".to_string(),
                to_status: Some("In Progress".to_string()),
            },
            JiraTransition {
                id: "31".to_string(),
                name: "Done".to_string(),
                to_status: Some("Done".to_string()),
            },
        ])
    }

    async fn transition_issue(&self, request: TransitionRequest) -> JiraMcpResult<JiraIssue> {
        let key = request.issue_key.clone();
        self.record("transition_issue", FetcherCall::TransitionIssue(request))?;
        Ok(JiraIssue {
            status: Some("In Progress".to_string()),
            ..self.issue(&key, "Test Issue Summary")
        })
    }

    async fn get_worklogs(&self, issue_key: &str) -> JiraMcpResult<Vec<JiraWorklog>> {
        self.record("get_worklogs", FetcherCall::GetWorklogs(issue_key.to_string()))?;
        Ok(vec![JiraWorklog {
            id: "1000".to_string(),
            author: Some("Test User".to_string()),
            time_spent: Some("1h".to_string()),
            time_spent_seconds: 3600,
            ..Default::default()
        }])
    }

    async fn add_worklog(&self, request: WorklogRequest) -> JiraMcpResult<JiraWorklog> {
        let (time_spent, comment) = (request.time_spent.clone(), request.comment.clone());
        self.record("add_worklog", FetcherCall::AddWorklog(request))?;
        Ok(JiraWorklog {
            id: "1001".to_string(),
            time_spent: Some(time_spent),
            comment,
            ..Default::default()
        })
    }

    async fn download_issue_attachments(
        &self,
        issue_key: &str,
        target_dir: &str,
    ) -> JiraMcpResult<AttachmentDownloadReport> {
        self.record(
            "download_issue_attachments",
            FetcherCall::DownloadAttachments {
                issue_key: issue_key.to_string(),
                target_dir: target_dir.to_string(),
            },
        )?;
        Ok(AttachmentDownloadReport {
            success: true,
            issue_key: issue_key.to_string(),
            ..Default::default()
        })
    }

    async fn get_all_agile_boards(&self, query: BoardQuery) -> JiraMcpResult<Vec<JiraBoard>> {
        let project_key = query.project_key.clone();
        self.record("get_all_agile_boards", FetcherCall::GetAgileBoards(query))?;
        Ok(vec![JiraBoard {
            id: 1000,
            name: "Team board".to_string(),
            board_type: Some("scrum".to_string()),
            project_key,
        }])
    }

    async fn get_board_issues(&self, query: ScopedIssuesQuery) -> JiraMcpResult<JiraSearchResult> {
        let (start, limit) = (query.start, query.limit);
        self.record("get_board_issues", FetcherCall::GetBoardIssues(query))?;
        Ok(self.page(start, limit))
    }

    async fn get_all_sprints_from_board(
        &self,
        board_id: &str,
        state: Option<&str>,
        start: u32,
        limit: u32,
    ) -> JiraMcpResult<Vec<JiraSprint>> {
        self.record(
            "get_all_sprints_from_board",
            FetcherCall::GetSprintsFromBoard {
                board_id: board_id.to_string(),
                state: state.map(str::to_string),
                start,
                limit,
            },
        )?;
        Ok(vec![JiraSprint {
            id: 10,
            name: "Sprint 1".to_string(),
            state: Some(state.unwrap_or("active").to_string()),
            board_id: board_id.parse().ok(),
            ..Default::default()
        }])
    }

    async fn get_sprint_issues(
        &self,
        query: ScopedIssuesQuery,
    ) -> JiraMcpResult<JiraSearchResult> {
        let (start, limit) = (query.start, query.limit);
        self.record("get_sprint_issues", FetcherCall::GetSprintIssues(query))?;
        Ok(self.page(start, limit))
    }

    async fn create_sprint(&self, request: CreateSprintRequest) -> JiraMcpResult<JiraSprint> {
        self.record("create_sprint", FetcherCall::CreateSprint(request.clone()))?;
        Ok(JiraSprint {
            id: 11,
            name: request.sprint_name,
            state: Some("future".to_string()),
            start_date: Some(request.start_date),
            end_date: Some(request.end_date),
            goal: request.goal,
            board_id: request.board_id.parse().ok(),
            ..Default::default()
        })
    }

    async fn update_sprint(&self, request: UpdateSprintRequest) -> JiraMcpResult<JiraSprint> {
        self.record("update_sprint", FetcherCall::UpdateSprint(request.clone()))?;
        Ok(JiraSprint {
            id: request.sprint_id.parse().unwrap_or_default(),
            name: request.sprint_name.unwrap_or_else(|| "Sprint 1".to_string()),
            state: request.state,
            goal: request.goal,
            ..Default::default()
        })
    }

    async fn get_issue_link_types(&self) -> JiraMcpResult<Vec<JiraIssueLinkType>> {
        self.record("get_issue_link_types", FetcherCall::GetIssueLinkTypes)?;
        Ok(vec![JiraIssueLinkType {
            id: "10000".to_string(),
            name: "Blocks".to_string(),
            inward: "is blocked by".to_string(),
            outward: "blocks".to_string(),
        }])
    }

    async fn create_issue_link(
        &self,
        request: IssueLinkRequest,
    ) -> JiraMcpResult<LinkOperationResult> {
        self.record(
            "create_issue_link",
            FetcherCall::CreateIssueLink(request.clone()),
        )?;
        Ok(LinkOperationResult {
            success: true,
            message: format!(
                "Link created between {} and {}",
                request.inward_issue_key, request.outward_issue_key
            ),
            link_type: Some(request.link_type),
            inward_issue: Some(request.inward_issue_key),
            outward_issue: Some(request.outward_issue_key),
            ..Default::default()
        })
    }

    async fn remove_issue_link(&self, link_id: &str) -> JiraMcpResult<LinkOperationResult> {
        self.record(
            "remove_issue_link",
            FetcherCall::RemoveIssueLink(link_id.to_string()),
        )?;
        Ok(LinkOperationResult {
            success: true,
            message: format!("Link with ID {} has been removed", link_id),
            link_id: Some(link_id.to_string()),
            ..Default::default()
        })
    }

    async fn link_issue_to_epic(
        &self,
        issue_key: &str,
        epic_key: &str,
    ) -> JiraMcpResult<JiraIssue> {
        self.record(
            "link_issue_to_epic",
            FetcherCall::LinkToEpic {
                issue_key: issue_key.to_string(),
                epic_key: epic_key.to_string(),
            },
        )?;
        Ok(JiraIssue {
            parent_key: Some(epic_key.to_string()),
            ..self.issue(issue_key, "Test Issue Summary")
        })
    }

    async fn create_issue(&self, request: CreateIssueRequest) -> JiraMcpResult<JiraIssue> {
        self.record("create_issue", FetcherCall::CreateIssue(request.clone()))?;
        Ok(JiraIssue {
            description: request.description,
            issue_type: Some(request.issue_type),
            components: request.components.unwrap_or_default(),
            extra_fields: request.additional_fields,
            ..self.issue("TEST-456", &request.summary)
        })
    }

    async fn batch_create_issues(
        &self,
        issues: Vec<CreateIssueRequest>,
        validate_only: bool,
    ) -> JiraMcpResult<Vec<JiraIssue>> {
        self.record(
            "batch_create_issues",
            FetcherCall::BatchCreateIssues {
                issues: issues.clone(),
                validate_only,
            },
        )?;
        Ok(issues
            .iter()
            .enumerate()
            .map(|(index, request)| {
                let key = if validate_only {
                    String::new()
                } else {
                    format!("{}-{}", request.project_key, index + 1)
                };
                JiraIssue {
                    issue_type: Some(request.issue_type.clone()),
                    ..self.issue(&key, &request.summary)
                }
            })
            .collect())
    }

    async fn batch_get_changelogs(
        &self,
        issue_ids_or_keys: Vec<String>,
        fields: Option<Vec<String>>,
        limit: Option<u32>,
    ) -> JiraMcpResult<Vec<JiraChangelog>> {
        self.record(
            "batch_get_changelogs",
            FetcherCall::BatchGetChangelogs {
                issue_ids_or_keys: issue_ids_or_keys.clone(),
                fields,
                limit,
            },
        )?;
        Ok(issue_ids_or_keys
            .into_iter()
            .map(|issue_id| JiraChangelog {
                issue_id,
                histories: vec![JiraChangeHistory {
                    id: "1".to_string(),
                    author: Some("Test User".to_string()),
                    created: Some("2025-01-01T10:00:00.000+0000".to_string()),
                    items: vec![JiraChangeItem {
                        field: "status".to_string(),
                        from_string: Some("Open".to_string()),
                        to_string: Some("In Progress".to_string()),
                    }],
                }],
            })
            .collect())
    }

    async fn update_issue(&self, request: UpdateIssueRequest) -> JiraMcpResult<JiraIssue> {
        let key = request.issue_key.clone();
        let summary = request
            .fields
            .get("summary")
            .and_then(|v| v.as_str())
            .unwrap_or("Test Issue Summary")
            .to_string();
        self.record("update_issue", FetcherCall::UpdateIssue(request))?;
        Ok(self.issue(&key, &summary))
    }

    async fn delete_issue(&self, issue_key: &str) -> JiraMcpResult<()> {
        self.record("delete_issue", FetcherCall::DeleteIssue(issue_key.to_string()))
    }

    async fn add_comment(&self, issue_key: &str, comment: &str) -> JiraMcpResult<JiraComment> {
        self.record(
            "add_comment",
            FetcherCall::AddComment {
                issue_key: issue_key.to_string(),
                comment: comment.to_string(),
            },
        )?;
        Ok(JiraComment {
            id: "20000".to_string(),
            body: comment.to_string(),
            author: Some("Test User".to_string()),
            ..Default::default()
        })
    }
}

/// Factory building [`InMemoryFetcher`]s and counting how often it is asked to
pub struct InMemoryFetcherFactory {
    builds: AtomicUsize,
    build_delay: Duration,
    reject_tokens: bool,
    configs: Mutex<Vec<JiraConfig>>,
}

impl Default for InMemoryFetcherFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryFetcherFactory {
    pub fn new() -> Self {
        Self {
            builds: AtomicUsize::new(0),
            build_delay: Duration::ZERO,
            reject_tokens: false,
            configs: Mutex::new(Vec::new()),
        }
    }

    /// Slow down construction so concurrent first use overlaps
    pub fn with_build_delay(mut self, delay: Duration) -> Self {
        self.build_delay = delay;
        self
    }

    /// Built fetchers fail to identify the current user
    pub fn rejecting_tokens(mut self) -> Self {
        self.reject_tokens = true;
        self
    }

    pub fn builds(&self) -> usize {
        self.builds.load(Ordering::SeqCst)
    }

    /// Configurations fetchers were built from, in build order
    pub fn configs(&self) -> Vec<JiraConfig> {
        lock(&self.configs).clone()
    }
}

#[async_trait]
impl FetcherFactory for InMemoryFetcherFactory {
    async fn create(&self, config: Arc<JiraConfig>) -> JiraMcpResult<Arc<dyn JiraFetcher>> {
        self.builds.fetch_add(1, Ordering::SeqCst);
        if !self.build_delay.is_zero() {
            tokio::time::sleep(self.build_delay).await;
        }
        lock(&self.configs).push(config.as_ref().clone());

        let mut fetcher = InMemoryFetcher::new(config.as_ref().clone());
        if self.reject_tokens {
            fetcher = fetcher.fail_on("current_user_account_id", || {
                JiraMcpError::auth("401 Unauthorized")
            });
        }
        Ok(Arc::new(fetcher))
    }
}
