//! Jira client wrapper around gouqi
//!
//! Implements [`JiraFetcher`] on top of gouqi's raw REST calls (`api` and
//! `agile` endpoints). Every call is bounded by the configured request
//! timeout and its payload is parsed into the crate's models.

use crate::config::JiraConfig;
use crate::error::{JiraMcpError, JiraMcpResult};
use crate::fetcher::{
    BoardQuery, CreateIssueRequest, CreateSprintRequest, CreateVersionRequest, FetcherFactory,
    GetIssueRequest, IssueLinkRequest, JiraFetcher, ScopedIssuesQuery, SearchRequest,
    TransitionRequest, UpdateIssueRequest, UpdateSprintRequest, WorklogRequest,
};
use crate::models::{
    AttachmentDownloadReport, DownloadedAttachment, FailedAttachment, JiraBoard,
    JiraChangeHistory, JiraChangelog, JiraComment, JiraField, JiraIssue, JiraIssueLinkType,
    JiraProject, JiraSearchResult, JiraSprint, JiraTransition, JiraUser, JiraVersion,
    JiraWorklog, LinkOperationResult,
};
use crate::normalize::ProjectsFilter;
use async_trait::async_trait;
use gouqi::r#async::Jira;
use serde_json::{json, Map, Value};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, error, info, instrument, warn};

/// Page size used by bulk changelog requests
const CHANGELOG_PAGE_SIZE: u32 = 1000;

/// gouqi-backed Jira fetcher
#[derive(Debug, Clone)]
pub struct JiraClient {
    client: Arc<Jira>,
    config: Arc<JiraConfig>,
}

/// Build `path?k=v&...`, skipping absent values
fn with_query(path: &str, params: &[(&str, Option<String>)]) -> String {
    let query: Vec<String> = params
        .iter()
        .filter_map(|(name, value)| {
            value
                .as_ref()
                .map(|v| format!("{}={}", name, urlencoding::encode(v)))
        })
        .collect();

    if query.is_empty() {
        path.to_string()
    } else {
        format!("{}?{}", path, query.join("&"))
    }
}

/// Map a gouqi error, turning 404 responses into a not-found error
fn not_found_or(err: gouqi::Error, resource: &str, key: &str) -> JiraMcpError {
    let message = err.to_string();
    if matches!(err, gouqi::Error::NotFound)
        || message.contains("404")
        || message.contains("Not Found")
    {
        JiraMcpError::not_found(resource, key)
    } else {
        JiraMcpError::from(err)
    }
}

fn values_at<'a>(payload: &'a Value, key: &str) -> &'a [Value] {
    payload
        .get(key)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default()
}

impl JiraClient {
    /// Create a new Jira client with the given configuration
    #[instrument(skip_all)]
    pub fn new(config: Arc<JiraConfig>) -> JiraMcpResult<Self> {
        let base_url = config.api_base_url();
        info!("Initializing Jira client for URL: {}", base_url);

        let client = Jira::new(&base_url, config.to_gouqi_credentials())?;

        Ok(Self {
            client: Arc::new(client),
            config,
        })
    }

    /// Browse URL prefix for issue links
    pub fn base_url(&self) -> &str {
        self.config.jira_url.trim_end_matches('/')
    }

    async fn bounded<T, F>(&self, what: &str, fut: F) -> JiraMcpResult<Result<T, gouqi::Error>>
    where
        F: Future<Output = Result<T, gouqi::Error>>,
    {
        timeout(
            Duration::from_secs(self.config.request_timeout_seconds),
            fut,
        )
        .await
        .map_err(|_| JiraMcpError::upstream(format!("Timeout {}", what)))
    }

    async fn get_json(&self, api: &str, endpoint: &str) -> JiraMcpResult<Value> {
        debug!("GET {} {}", api, endpoint);
        Ok(self
            .bounded(endpoint, self.client.get::<Value>(api, endpoint))
            .await??)
    }

    async fn post_json(&self, api: &str, endpoint: &str, body: Value) -> JiraMcpResult<Value> {
        debug!("POST {} {}", api, endpoint);
        Ok(self
            .bounded(endpoint, self.client.post::<Value, _>(api, endpoint, body))
            .await??)
    }

    /// POST to an endpoint answering `204 No Content`
    async fn post_empty(&self, api: &str, endpoint: &str, body: Value) -> JiraMcpResult<()> {
        debug!("POST {} {}", api, endpoint);
        Ok(self
            .bounded(endpoint, self.client.post::<(), _>(api, endpoint, body))
            .await??)
    }

    async fn put_empty(&self, api: &str, endpoint: &str, body: Value) -> JiraMcpResult<()> {
        debug!("PUT {} {}", api, endpoint);
        Ok(self
            .bounded(endpoint, self.client.put::<(), _>(api, endpoint, body))
            .await??)
    }

    async fn delete_empty(&self, api: &str, endpoint: &str) -> JiraMcpResult<()> {
        debug!("DELETE {} {}", api, endpoint);
        Ok(self
            .bounded(endpoint, self.client.delete::<()>(api, endpoint))
            .await??)
    }

    /// Reference a user the way the deployment expects (account id or name)
    fn user_reference(&self, user: &str) -> Value {
        if self.config.is_cloud() {
            json!({ "accountId": user })
        } else {
            json!({ "name": user })
        }
    }

    fn issue_fields(&self, request: &CreateIssueRequest) -> Map<String, Value> {
        let mut fields = Map::new();
        fields.insert("project".into(), json!({ "key": request.project_key }));
        fields.insert("summary".into(), json!(request.summary));
        fields.insert("issuetype".into(), json!({ "name": request.issue_type }));

        if let Some(description) = &request.description {
            fields.insert("description".into(), json!(description));
        }
        if let Some(assignee) = &request.assignee {
            fields.insert("assignee".into(), self.user_reference(assignee));
        }
        if let Some(components) = &request.components {
            let components: Vec<Value> = components
                .iter()
                .map(|name| json!({ "name": name }))
                .collect();
            fields.insert("components".into(), Value::Array(components));
        }
        for (name, value) in &request.additional_fields {
            fields.insert(name.clone(), value.clone());
        }
        fields
    }

    async fn scoped_issues(
        &self,
        api_path: String,
        query: ScopedIssuesQuery,
    ) -> JiraMcpResult<JiraSearchResult> {
        let endpoint = with_query(
            &api_path,
            &[
                ("jql", query.jql.filter(|j| !j.trim().is_empty())),
                ("fields", query.fields.map(|f| f.join(","))),
                ("startAt", Some(query.start.to_string())),
                ("maxResults", Some(query.limit.to_string())),
                ("expand", query.expand),
            ],
        );
        let payload = self.get_json("agile", &endpoint).await?;
        Ok(JiraSearchResult::from_api_response(
            &payload,
            self.base_url(),
        ))
    }

    async fn download_attachment(&self, attachment_id: &str) -> JiraMcpResult<Vec<u8>> {
        // The async client's download future is not Send; use the blocking client
        let base_url = self.config.api_base_url();
        let credentials = self.config.to_gouqi_credentials();
        let id = attachment_id.to_string();

        let content = tokio::task::spawn_blocking(move || {
            let sync_client = gouqi::Jira::new(&base_url, credentials)?;
            sync_client.attachments().download(&id)
        })
        .await
        .map_err(|e| JiraMcpError::internal(format!("Task join error: {}", e)))??;

        Ok(content)
    }
}

#[async_trait]
impl JiraFetcher for JiraClient {
    fn config(&self) -> &JiraConfig {
        &self.config
    }

    #[instrument(skip(self))]
    async fn current_user_account_id(&self) -> JiraMcpResult<String> {
        let myself = self.get_json("api", "/myself").await?;
        myself
            .get("accountId")
            .or_else(|| myself.get("name"))
            .or_else(|| myself.get("key"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| JiraMcpError::auth("Could not determine the current user's account id"))
    }

    #[instrument(skip(self))]
    async fn get_issue(&self, request: GetIssueRequest) -> JiraMcpResult<JiraIssue> {
        let mut fields = request.fields.clone();
        // Comments are only embedded when the comment field is selected
        if let Some(fields) = fields.as_mut() {
            if request.comment_limit > 0
                && !fields.iter().any(|f| f == "comment" || f == "*all")
            {
                fields.push("comment".to_string());
            }
        }

        let endpoint = with_query(
            &format!("/issue/{}", request.issue_key),
            &[
                ("fields", fields.map(|f| f.join(","))),
                ("expand", request.expand.clone()),
                ("properties", request.properties.map(|p| p.join(","))),
                ("updateHistory", Some(request.update_history.to_string())),
            ],
        );

        let payload = self
            .bounded(&endpoint, self.client.get::<Value>("api", &endpoint))
            .await?
            .map_err(|e| not_found_or(e, "issue", &request.issue_key))?;

        Ok(JiraIssue::from_api_response(
            &payload,
            self.base_url(),
            request.comment_limit,
        ))
    }

    #[instrument(skip(self))]
    async fn search_issues(&self, request: SearchRequest) -> JiraMcpResult<JiraSearchResult> {
        let filter = ProjectsFilter::parse(
            request
                .projects_filter
                .as_deref()
                .or(self.config.projects_filter.as_deref()),
        );
        let jql = filter.scope_jql(&request.jql);
        debug!(
            "Searching issues with JQL: '{}', start: {}, limit: {}",
            jql, request.start, request.limit
        );

        let mut body = json!({
            "jql": jql,
            "startAt": request.start,
            "maxResults": request.limit,
        });
        if let Some(fields) = request.fields {
            body["fields"] = json!(fields);
        }
        if let Some(expand) = request.expand {
            body["expand"] = json!(expand.split(',').map(str::trim).collect::<Vec<_>>());
        }

        let payload = self.post_json("api", "/search", body).await?;
        let result = JiraSearchResult::from_api_response(&payload, self.base_url());

        info!(
            "Found {} issues (showing {}-{} of {})",
            result.issues.len(),
            result.start_at,
            result.start_at + result.issues.len() as u64,
            result.total
        );
        Ok(result)
    }

    #[instrument(skip(self))]
    async fn search_fields(
        &self,
        keyword: &str,
        limit: u32,
        refresh: bool,
    ) -> JiraMcpResult<Vec<JiraField>> {
        if refresh {
            debug!("Field definitions are always fetched fresh");
        }
        let payload = self.get_json("api", "/field").await?;
        let keyword = keyword.trim().to_lowercase();

        Ok(payload
            .as_array()
            .map(Vec::as_slice)
            .unwrap_or_default()
            .iter()
            .map(JiraField::from_api_response)
            .filter(|field| {
                keyword.is_empty()
                    || field.name.to_lowercase().contains(&keyword)
                    || field.id.to_lowercase().contains(&keyword)
            })
            .take(limit as usize)
            .collect())
    }

    #[instrument(skip(self))]
    async fn get_project_issues(
        &self,
        project_key: &str,
        start: u32,
        limit: u32,
    ) -> JiraMcpResult<JiraSearchResult> {
        self.search_issues(SearchRequest {
            jql: format!("project = \"{}\" ORDER BY created DESC", project_key),
            fields: None,
            limit,
            start,
            projects_filter: None,
            expand: None,
        })
        .await
    }

    #[instrument(skip(self))]
    async fn get_all_projects(&self, include_archived: bool) -> JiraMcpResult<Vec<JiraProject>> {
        let endpoint = with_query(
            "/project",
            &[("includeArchived", Some(include_archived.to_string()))],
        );
        let payload = self.get_json("api", &endpoint).await?;
        Ok(payload
            .as_array()
            .map(Vec::as_slice)
            .unwrap_or_default()
            .iter()
            .map(JiraProject::from_api_response)
            .collect())
    }

    #[instrument(skip(self))]
    async fn get_project_versions(&self, project_key: &str) -> JiraMcpResult<Vec<JiraVersion>> {
        let endpoint = format!("/project/{}/versions", project_key);
        let payload = self
            .bounded(&endpoint, self.client.get::<Value>("api", &endpoint))
            .await?
            .map_err(|e| not_found_or(e, "project", project_key))?;

        Ok(payload
            .as_array()
            .map(Vec::as_slice)
            .unwrap_or_default()
            .iter()
            .map(JiraVersion::from_api_response)
            .collect())
    }

    #[instrument(skip(self))]
    async fn create_project_version(
        &self,
        request: CreateVersionRequest,
    ) -> JiraMcpResult<JiraVersion> {
        let mut body = json!({
            "project": request.project_key,
            "name": request.name,
        });
        if let Some(start_date) = request.start_date {
            body["startDate"] = json!(start_date);
        }
        if let Some(release_date) = request.release_date {
            body["releaseDate"] = json!(release_date);
        }
        if let Some(description) = request.description {
            body["description"] = json!(description);
        }

        let payload = self.post_json("api", "/version", body).await?;
        let version = JiraVersion::from_api_response(&payload);
        info!(
            "Created version '{}' in project {}",
            version.name, request.project_key
        );
        Ok(version)
    }

    #[instrument(skip(self))]
    async fn get_user_profile_by_identifier(&self, identifier: &str) -> JiraMcpResult<JiraUser> {
        let identifier = identifier.trim();
        let looks_like_account_id = identifier.contains(':')
            || (identifier.len() >= 24 && identifier.chars().all(|c| c.is_ascii_alphanumeric()));

        let payload = if self.config.is_cloud() && looks_like_account_id {
            let endpoint = with_query("/user", &[("accountId", Some(identifier.to_string()))]);
            self.bounded(&endpoint, self.client.get::<Value>("api", &endpoint))
                .await?
                .map_err(|e| not_found_or(e, "user", identifier))?
        } else {
            let parameter = if self.config.is_cloud() {
                "query"
            } else {
                "username"
            };
            let endpoint =
                with_query("/user/search", &[(parameter, Some(identifier.to_string()))]);
            let matches = self.get_json("api", &endpoint).await?;
            matches
                .as_array()
                .and_then(|users| users.first().cloned())
                .ok_or_else(|| JiraMcpError::not_found("user", identifier))?
        };

        Ok(JiraUser::from_api_response(&payload))
    }

    #[instrument(skip(self))]
    async fn get_transitions(&self, issue_key: &str) -> JiraMcpResult<Vec<JiraTransition>> {
        let endpoint = format!("/issue/{}/transitions", issue_key);
        let payload = self
            .bounded(&endpoint, self.client.get::<Value>("api", &endpoint))
            .await?
            .map_err(|e| not_found_or(e, "issue", issue_key))?;

        Ok(values_at(&payload, "transitions")
            .iter()
            .map(JiraTransition::from_api_response)
            .collect())
    }

    #[instrument(skip(self))]
    async fn transition_issue(&self, request: TransitionRequest) -> JiraMcpResult<JiraIssue> {
        let mut body = json!({ "transition": { "id": request.transition_id } });
        if let Some(fields) = request.fields.filter(|f| !f.is_empty()) {
            body["fields"] = Value::Object(fields);
        }
        if let Some(comment) = request.comment.filter(|c| !c.trim().is_empty()) {
            body["update"] = json!({ "comment": [{ "add": { "body": comment } }] });
        }

        self.post_empty(
            "api",
            &format!("/issue/{}/transitions", request.issue_key),
            body,
        )
        .await?;
        info!(
            "Transitioned issue {} with transition {}",
            request.issue_key, request.transition_id
        );

        self.get_issue(GetIssueRequest::new(request.issue_key)).await
    }

    #[instrument(skip(self))]
    async fn get_worklogs(&self, issue_key: &str) -> JiraMcpResult<Vec<JiraWorklog>> {
        let endpoint = format!("/issue/{}/worklog", issue_key);
        let payload = self
            .bounded(&endpoint, self.client.get::<Value>("api", &endpoint))
            .await?
            .map_err(|e| not_found_or(e, "issue", issue_key))?;

        Ok(values_at(&payload, "worklogs")
            .iter()
            .map(JiraWorklog::from_api_response)
            .collect())
    }

    #[instrument(skip(self))]
    async fn add_worklog(&self, request: WorklogRequest) -> JiraMcpResult<JiraWorklog> {
        if let Some(original) = &request.original_estimate {
            self.put_empty(
                "api",
                &format!("/issue/{}", request.issue_key),
                json!({ "fields": { "timetracking": { "originalEstimate": original } } }),
            )
            .await?;
            debug!("Updated original estimate of {}", request.issue_key);
        }

        let endpoint = match &request.remaining_estimate {
            Some(remaining) => with_query(
                &format!("/issue/{}/worklog", request.issue_key),
                &[
                    ("adjustEstimate", Some("new".to_string())),
                    ("newEstimate", Some(remaining.clone())),
                ],
            ),
            None => format!("/issue/{}/worklog", request.issue_key),
        };

        let mut body = json!({ "timeSpent": request.time_spent });
        if let Some(comment) = request.comment {
            body["comment"] = json!(comment);
        }
        if let Some(started) = request.started {
            body["started"] = json!(started);
        }

        let payload = self.post_json("api", &endpoint, body).await?;
        Ok(JiraWorklog::from_api_response(&payload))
    }

    #[instrument(skip(self))]
    async fn download_issue_attachments(
        &self,
        issue_key: &str,
        target_dir: &str,
    ) -> JiraMcpResult<AttachmentDownloadReport> {
        let endpoint = with_query(
            &format!("/issue/{}", issue_key),
            &[("fields", Some("attachment".to_string()))],
        );
        let issue = self
            .bounded(&endpoint, self.client.get::<Value>("api", &endpoint))
            .await?
            .map_err(|e| not_found_or(e, "issue", issue_key))?;

        let attachments = issue
            .pointer("/fields/attachment")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        let target = PathBuf::from(target_dir);
        tokio::fs::create_dir_all(&target).await.map_err(|e| {
            JiraMcpError::invalid_param(
                "target_dir",
                format!("Cannot create directory {}: {}", target.display(), e),
            )
        })?;

        let mut report = AttachmentDownloadReport {
            success: true,
            issue_key: issue_key.to_string(),
            total: attachments.len(),
            ..Default::default()
        };

        for attachment in &attachments {
            let id = attachment
                .get("id")
                .and_then(Value::as_str)
                .unwrap_or_default();
            let filename = attachment
                .get("filename")
                .and_then(Value::as_str)
                .map(|name| {
                    Path::new(name)
                        .file_name()
                        .map(|n| n.to_string_lossy().to_string())
                        .unwrap_or_else(|| format!("attachment-{}", id))
                })
                .unwrap_or_else(|| format!("attachment-{}", id));

            let path = target.join(&filename);
            let outcome = match self.download_attachment(id).await {
                Ok(bytes) => tokio::fs::write(&path, &bytes)
                    .await
                    .map(|_| bytes.len() as u64)
                    .map_err(|e| e.to_string()),
                Err(e) => Err(e.to_string()),
            };

            match outcome {
                Ok(size) => {
                    debug!("Saved attachment {} ({} bytes)", path.display(), size);
                    report.downloaded.push(DownloadedAttachment {
                        filename,
                        path: path.display().to_string(),
                        size,
                    });
                }
                Err(error) => {
                    warn!("Failed to download attachment {}: {}", filename, error);
                    report.failed.push(FailedAttachment { filename, error });
                }
            }
        }

        report.success = report.failed.is_empty();
        Ok(report)
    }

    #[instrument(skip(self))]
    async fn get_all_agile_boards(&self, query: BoardQuery) -> JiraMcpResult<Vec<JiraBoard>> {
        let endpoint = with_query(
            "/board",
            &[
                ("name", query.board_name),
                ("projectKeyOrId", query.project_key),
                ("type", query.board_type),
                ("startAt", Some(query.start.to_string())),
                ("maxResults", Some(query.limit.to_string())),
            ],
        );
        let payload = self.get_json("agile", &endpoint).await?;
        Ok(values_at(&payload, "values")
            .iter()
            .map(JiraBoard::from_api_response)
            .collect())
    }

    #[instrument(skip(self))]
    async fn get_board_issues(&self, query: ScopedIssuesQuery) -> JiraMcpResult<JiraSearchResult> {
        let path = format!("/board/{}/issue", query.scope_id);
        self.scoped_issues(path, query).await
    }

    #[instrument(skip(self))]
    async fn get_all_sprints_from_board(
        &self,
        board_id: &str,
        state: Option<&str>,
        start: u32,
        limit: u32,
    ) -> JiraMcpResult<Vec<JiraSprint>> {
        let endpoint = with_query(
            &format!("/board/{}/sprint", board_id),
            &[
                ("state", state.map(str::to_string)),
                ("startAt", Some(start.to_string())),
                ("maxResults", Some(limit.to_string())),
            ],
        );
        let payload = self
            .bounded(&endpoint, self.client.get::<Value>("agile", &endpoint))
            .await?
            .map_err(|e| not_found_or(e, "board", board_id))?;

        Ok(values_at(&payload, "values")
            .iter()
            .map(JiraSprint::from_api_response)
            .collect())
    }

    #[instrument(skip(self))]
    async fn get_sprint_issues(
        &self,
        query: ScopedIssuesQuery,
    ) -> JiraMcpResult<JiraSearchResult> {
        let path = format!("/sprint/{}/issue", query.scope_id);
        self.scoped_issues(path, query).await
    }

    #[instrument(skip(self))]
    async fn create_sprint(&self, request: CreateSprintRequest) -> JiraMcpResult<JiraSprint> {
        let board_id: u64 = request.board_id.trim().parse().map_err(|_| {
            JiraMcpError::invalid_param("board_id", "board_id must be a numeric board id")
        })?;

        let mut body = json!({
            "name": request.sprint_name,
            "originBoardId": board_id,
            "startDate": request.start_date,
            "endDate": request.end_date,
        });
        if let Some(goal) = request.goal {
            body["goal"] = json!(goal);
        }

        let payload = self.post_json("agile", "/sprint", body).await?;
        Ok(JiraSprint::from_api_response(&payload))
    }

    #[instrument(skip(self))]
    async fn update_sprint(&self, request: UpdateSprintRequest) -> JiraMcpResult<JiraSprint> {
        let mut body = Map::new();
        let updates = [
            ("name", request.sprint_name),
            ("state", request.state),
            ("startDate", request.start_date),
            ("endDate", request.end_date),
            ("goal", request.goal),
        ];
        for (name, value) in updates {
            if let Some(value) = value {
                body.insert(name.to_string(), json!(value));
            }
        }

        // Partial update: POST only touches the supplied fields
        let endpoint = format!("/sprint/{}", request.sprint_id);
        let payload = self
            .bounded(
                &endpoint,
                self.client
                    .post::<Value, _>("agile", &endpoint, Value::Object(body)),
            )
            .await?
            .map_err(|e| not_found_or(e, "sprint", &request.sprint_id))?;

        Ok(JiraSprint::from_api_response(&payload))
    }

    #[instrument(skip(self))]
    async fn get_issue_link_types(&self) -> JiraMcpResult<Vec<JiraIssueLinkType>> {
        let payload = self.get_json("api", "/issueLinkType").await?;
        Ok(values_at(&payload, "issueLinkTypes")
            .iter()
            .map(JiraIssueLinkType::from_api_response)
            .collect())
    }

    #[instrument(skip(self))]
    async fn create_issue_link(
        &self,
        request: IssueLinkRequest,
    ) -> JiraMcpResult<LinkOperationResult> {
        let mut body = json!({
            "type": { "name": request.link_type },
            "inwardIssue": { "key": request.inward_issue_key },
            "outwardIssue": { "key": request.outward_issue_key },
        });
        if let Some(comment) = request.comment.filter(|c| !c.trim().is_empty()) {
            body["comment"] = json!({ "body": comment });
            if let Some(visibility) = request.comment_visibility {
                body["comment"]["visibility"] = Value::Object(visibility);
            }
        }

        self.post_empty("api", "/issueLink", body).await?;
        info!(
            "Linked {} -> {} ({})",
            request.inward_issue_key, request.outward_issue_key, request.link_type
        );

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

    #[instrument(skip(self))]
    async fn remove_issue_link(&self, link_id: &str) -> JiraMcpResult<LinkOperationResult> {
        let endpoint = format!("/issueLink/{}", link_id);
        self.bounded(&endpoint, self.client.delete::<()>("api", &endpoint))
            .await?
            .map_err(|e| not_found_or(e, "issue link", link_id))?;

        Ok(LinkOperationResult {
            success: true,
            message: format!("Link with ID {} has been removed", link_id),
            link_id: Some(link_id.to_string()),
            ..Default::default()
        })
    }

    #[instrument(skip(self))]
    async fn link_issue_to_epic(
        &self,
        issue_key: &str,
        epic_key: &str,
    ) -> JiraMcpResult<JiraIssue> {
        if self.config.is_cloud() {
            self.put_empty(
                "api",
                &format!("/issue/{}", issue_key),
                json!({ "fields": { "parent": { "key": epic_key } } }),
            )
            .await?;
        } else {
            self.post_empty(
                "agile",
                &format!("/epic/{}/issue", epic_key),
                json!({ "issues": [issue_key] }),
            )
            .await?;
        }
        info!("Linked issue {} to epic {}", issue_key, epic_key);

        self.get_issue(GetIssueRequest::new(issue_key)).await
    }

    #[instrument(skip(self))]
    async fn create_issue(&self, request: CreateIssueRequest) -> JiraMcpResult<JiraIssue> {
        let body = json!({ "fields": self.issue_fields(&request) });
        let created = self.post_json("api", "/issue", body).await.map_err(|e| {
            let message = e.to_string();
            if message.contains("project is required") || message.contains("project does not exist")
            {
                JiraMcpError::invalid_param(
                    "project_key",
                    format!("Invalid project: {}", request.project_key),
                )
            } else if message.contains("valid issue type") {
                JiraMcpError::invalid_param(
                    "issue_type",
                    format!("Invalid issue type: {}", request.issue_type),
                )
            } else {
                e
            }
        })?;

        let key = created
            .get("key")
            .and_then(Value::as_str)
            .ok_or_else(|| JiraMcpError::internal("No issue key in response"))?;
        info!("Successfully created issue: {}", key);

        self.get_issue(GetIssueRequest::new(key)).await
    }

    #[instrument(skip(self, issues))]
    async fn batch_create_issues(
        &self,
        issues: Vec<CreateIssueRequest>,
        validate_only: bool,
    ) -> JiraMcpResult<Vec<JiraIssue>> {
        for (index, issue) in issues.iter().enumerate() {
            for (name, value) in [
                ("project_key", &issue.project_key),
                ("summary", &issue.summary),
                ("issue_type", &issue.issue_type),
            ] {
                if value.trim().is_empty() {
                    return Err(JiraMcpError::invalid_param(
                        "issues",
                        format!("Item {}: {} is required", index, name),
                    ));
                }
            }
        }

        if validate_only {
            info!("Validated {} issues without creating them", issues.len());
            return Ok(issues
                .into_iter()
                .map(|issue| JiraIssue {
                    summary: issue.summary,
                    project_key: Some(issue.project_key),
                    issue_type: Some(issue.issue_type),
                    description: issue.description,
                    ..Default::default()
                })
                .collect());
        }

        let updates: Vec<Value> = issues
            .iter()
            .map(|issue| json!({ "fields": self.issue_fields(issue) }))
            .collect();
        let payload = self
            .post_json("api", "/issue/bulk", json!({ "issueUpdates": updates }))
            .await?;

        for failure in values_at(&payload, "errors") {
            error!("Bulk issue creation error: {}", failure);
        }

        let created: Vec<JiraIssue> = values_at(&payload, "issues")
            .iter()
            .zip(issues)
            .map(|(created, request)| {
                let key = created
                    .get("key")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                JiraIssue {
                    id: created
                        .get("id")
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .to_string(),
                    url: Some(format!("{}/browse/{}", self.base_url(), key)),
                    key,
                    summary: request.summary,
                    project_key: Some(request.project_key),
                    issue_type: Some(request.issue_type),
                    description: request.description,
                    ..Default::default()
                }
            })
            .collect();

        info!("Created {} issues in bulk", created.len());
        Ok(created)
    }

    #[instrument(skip(self))]
    async fn batch_get_changelogs(
        &self,
        issue_ids_or_keys: Vec<String>,
        fields: Option<Vec<String>>,
        limit: Option<u32>,
    ) -> JiraMcpResult<Vec<JiraChangelog>> {
        if !self.config.is_cloud() {
            return Err(JiraMcpError::config(
                "Batch get issue changelogs is only available on Jira Cloud",
            ));
        }

        let mut changelogs: Vec<JiraChangelog> = Vec::new();
        let mut next_page_token: Option<String> = None;
        let mut fetched: u32 = 0;

        loop {
            let mut body = json!({
                "issueIdsOrKeys": issue_ids_or_keys,
                "maxResults": limit.map_or(CHANGELOG_PAGE_SIZE, |l| l.min(CHANGELOG_PAGE_SIZE)),
            });
            if let Some(fields) = &fields {
                body["fieldIds"] = json!(fields);
            }
            if let Some(token) = &next_page_token {
                body["nextPageToken"] = json!(token);
            }

            let payload = self.post_json("api", "/changelog/bulkfetch", body).await?;

            for entry in values_at(&payload, "issueChangeLogs") {
                let issue_id = entry
                    .get("issueId")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                let histories: Vec<JiraChangeHistory> = values_at(entry, "changeHistories")
                    .iter()
                    .map(JiraChangeHistory::from_api_response)
                    .collect();
                fetched += histories.len() as u32;

                match changelogs.iter_mut().find(|c| c.issue_id == issue_id) {
                    Some(existing) => existing.histories.extend(histories),
                    None => changelogs.push(JiraChangelog {
                        issue_id,
                        histories,
                    }),
                }
            }

            next_page_token = payload
                .get("nextPageToken")
                .and_then(Value::as_str)
                .map(str::to_string);

            let limit_reached = limit.is_some_and(|l| fetched >= l);
            if next_page_token.is_none() || limit_reached {
                break;
            }
        }

        Ok(changelogs)
    }

    #[instrument(skip(self))]
    async fn update_issue(&self, request: UpdateIssueRequest) -> JiraMcpResult<JiraIssue> {
        let mut fields = request.fields;
        if let Some(Value::String(assignee)) = fields.get("assignee").cloned() {
            fields.insert("assignee".into(), self.user_reference(&assignee));
        }
        for (name, value) in request.additional_fields {
            fields.insert(name, value);
        }

        let endpoint = format!("/issue/{}", request.issue_key);
        self.bounded(
            &endpoint,
            self.client
                .put::<(), _>("api", &endpoint, json!({ "fields": fields })),
        )
        .await?
        .map_err(|e| not_found_or(e, "issue", &request.issue_key))?;
        info!("Updated issue {}", request.issue_key);

        self.get_issue(GetIssueRequest::new(request.issue_key)).await
    }

    #[instrument(skip(self))]
    async fn delete_issue(&self, issue_key: &str) -> JiraMcpResult<()> {
        let endpoint = format!("/issue/{}", issue_key);
        self.bounded(&endpoint, self.client.delete::<()>("api", &endpoint))
            .await?
            .map_err(|e| not_found_or(e, "issue", issue_key))?;
        info!("Deleted issue {}", issue_key);
        Ok(())
    }

    #[instrument(skip(self, comment))]
    async fn add_comment(&self, issue_key: &str, comment: &str) -> JiraMcpResult<JiraComment> {
        let endpoint = format!("/issue/{}/comment", issue_key);
        let payload = self
            .bounded(
                &endpoint,
                self.client
                    .post::<Value, _>("api", &endpoint, json!({ "body": comment })),
            )
            .await?
            .map_err(|e| match not_found_or(e, "issue", issue_key) {
                JiraMcpError::Permission { .. } => JiraMcpError::permission(format!(
                    "Permission denied adding comment to issue {}",
                    issue_key
                )),
                other => other,
            })?;

        info!("Successfully added comment to issue {}", issue_key);
        Ok(JiraComment::from_api_response(&payload))
    }
}

/// Builds [`JiraClient`]s
#[derive(Debug, Default, Clone, Copy)]
pub struct GouqiFetcherFactory;

#[async_trait]
impl FetcherFactory for GouqiFetcherFactory {
    async fn create(&self, config: Arc<JiraConfig>) -> JiraMcpResult<Arc<dyn JiraFetcher>> {
        Ok(Arc::new(JiraClient::new(config)?))
    }
}
