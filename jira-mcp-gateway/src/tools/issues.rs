//! Issue tools: read, create, batch create, update, delete, comment, changelogs

use crate::context::RequestContext;
use crate::error::{JiraMcpError, JiraMcpResult};
use crate::fetcher::{CreateIssueRequest, GetIssueRequest, UpdateIssueRequest, DEFAULT_COMMENT_LIMIT};
use crate::normalize::{
    parse_comma_list, parse_field_selection, require_non_blank, ListOrJson, ObjectOrJson,
    StringOrList,
};
use crate::tools::{non_blank, to_json, with_message};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::{info, instrument};

/// Parameters for the get_issue tool
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct GetIssueParams {
    /// The Jira issue key (e.g., "PROJ-123")
    pub issue_key: String,

    /// Comma-separated fields to return, or "*all"
    pub fields: Option<String>,

    /// Comma-separated expansions (e.g., "renderedFields,changelog")
    pub expand: Option<String>,

    /// Maximum number of comments to include (default: 10)
    pub comment_limit: Option<usize>,

    /// Comma-separated issue properties to return
    pub properties: Option<String>,

    /// Record the view in the user's issue history (default: true)
    pub update_history: Option<bool>,
}

#[instrument(skip(ctx))]
pub async fn get_issue(ctx: RequestContext, params: GetIssueParams) -> JiraMcpResult<Value> {
    let issue_key = require_non_blank("issue_key", Some(params.issue_key.as_str()))?;

    let request = GetIssueRequest {
        issue_key: issue_key.to_string(),
        fields: parse_field_selection(params.fields.as_deref()),
        expand: non_blank(params.expand),
        comment_limit: params.comment_limit.unwrap_or(DEFAULT_COMMENT_LIMIT),
        properties: parse_comma_list(params.properties.as_deref()),
        update_history: params.update_history.unwrap_or(true),
    };

    let issue = ctx.fetcher.get_issue(request).await?;
    to_json(&issue)
}

/// Parameters for the create_issue tool
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct CreateIssueParams {
    /// Key of the project the issue is created in (e.g., "PROJ")
    pub project_key: String,

    /// Issue summary
    pub summary: String,

    /// Issue type name (e.g., "Task", "Bug", "Story")
    pub issue_type: String,

    /// Assignee (account id on Cloud, username on Server)
    pub assignee: Option<String>,

    /// Issue description
    pub description: Option<String>,

    /// Component names, as a list or a comma-separated string
    pub components: Option<StringOrList>,

    /// Extra fields set verbatim, e.g. {"priority": {"name": "High"}}
    pub additional_fields: Option<ObjectOrJson>,
}

#[instrument(skip(ctx))]
pub async fn create_issue(ctx: RequestContext, params: CreateIssueParams) -> JiraMcpResult<Value> {
    ctx.ensure_writable("create issue")?;
    let project_key = require_non_blank("project_key", Some(params.project_key.as_str()))?;
    let summary = require_non_blank("summary", Some(params.summary.as_str()))?;
    let issue_type = require_non_blank("issue_type", Some(params.issue_type.as_str()))?;

    let request = CreateIssueRequest {
        project_key: project_key.to_string(),
        summary: summary.to_string(),
        issue_type: issue_type.to_string(),
        description: params.description,
        assignee: non_blank(params.assignee),
        components: params.components.and_then(StringOrList::into_list),
        additional_fields: params
            .additional_fields
            .map(|fields| fields.into_object("additional_fields"))
            .transpose()?
            .unwrap_or_default(),
    };

    let issue = ctx.fetcher.create_issue(request).await?;
    info!("Created issue {}", issue.key);
    with_message("Issue created successfully", "issue", &issue)
}

/// Parameters for the batch_create_issues tool
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct BatchCreateIssuesParams {
    /// Issue specs (project_key, summary, issue_type, description, assignee,
    /// components), as a list or a JSON array string
    pub issues: ListOrJson,

    /// Only validate the issues without creating them (default: false)
    pub validate_only: Option<bool>,
}

/// One issue spec of a batch; accepts the same shapes as create_issue
#[derive(Debug, Clone, Deserialize)]
struct BatchIssueItem {
    #[serde(default)]
    project_key: String,
    #[serde(default)]
    summary: String,
    #[serde(default)]
    issue_type: String,
    description: Option<String>,
    assignee: Option<String>,
    components: Option<StringOrList>,
    #[serde(flatten)]
    additional_fields: Map<String, Value>,
}

impl BatchIssueItem {
    fn into_request(self, index: usize) -> JiraMcpResult<CreateIssueRequest> {
        for (name, value) in [
            ("project_key", &self.project_key),
            ("summary", &self.summary),
            ("issue_type", &self.issue_type),
        ] {
            if value.trim().is_empty() {
                return Err(JiraMcpError::invalid_param(
                    "issues",
                    format!("Item {}: {} is required and cannot be empty", index, name),
                ));
            }
        }

        Ok(CreateIssueRequest {
            project_key: self.project_key.trim().to_string(),
            summary: self.summary.trim().to_string(),
            issue_type: self.issue_type.trim().to_string(),
            description: self.description,
            assignee: non_blank(self.assignee),
            components: self.components.and_then(StringOrList::into_list),
            additional_fields: self.additional_fields,
        })
    }
}

#[instrument(skip(ctx))]
pub async fn batch_create_issues(
    ctx: RequestContext,
    params: BatchCreateIssuesParams,
) -> JiraMcpResult<Value> {
    ctx.ensure_writable("batch create issues")?;
    let validate_only = params.validate_only.unwrap_or(false);

    let issues = params
        .issues
        .into_list::<BatchIssueItem>("issues")?
        .into_iter()
        .enumerate()
        .map(|(index, item)| item.into_request(index))
        .collect::<JiraMcpResult<Vec<_>>>()?;

    let count = issues.len();
    let created = ctx.fetcher.batch_create_issues(issues, validate_only).await?;
    let message = if validate_only {
        "Issues validated successfully"
    } else {
        "Issues created successfully"
    };
    info!("{} ({} issues)", message, count);

    Ok(json!({
        "message": message,
        "issues": to_json(&created)?,
    }))
}

/// Parameters for the batch_get_changelogs tool
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct BatchGetChangelogsParams {
    /// Issue ids or keys, as a list or a JSON array string
    pub issue_ids_or_keys: ListOrJson,

    /// Field ids to restrict the changelog to, as a list or a JSON array string
    pub fields: Option<ListOrJson>,

    /// Maximum number of histories to return; -1 or absent returns all
    pub limit: Option<i64>,
}

#[instrument(skip(ctx))]
pub async fn batch_get_changelogs(
    ctx: RequestContext,
    params: BatchGetChangelogsParams,
) -> JiraMcpResult<Value> {
    let issue_ids_or_keys: Vec<String> = params.issue_ids_or_keys.into_list("issue_ids_or_keys")?;
    if issue_ids_or_keys.is_empty() {
        return Err(JiraMcpError::invalid_param(
            "issue_ids_or_keys",
            "issue_ids_or_keys is required and cannot be empty",
        ));
    }
    let fields: Option<Vec<String>> = params
        .fields
        .map(|fields| fields.into_list("fields"))
        .transpose()?
        .filter(|fields: &Vec<String>| !fields.is_empty());
    let limit = params
        .limit
        .filter(|limit| *limit > 0)
        .map(|limit| u32::try_from(limit).unwrap_or(u32::MAX));

    let changelogs = ctx
        .fetcher
        .batch_get_changelogs(issue_ids_or_keys, fields, limit)
        .await?;
    to_json(&changelogs)
}

/// Parameters for the update_issue tool
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct UpdateIssueParams {
    /// The Jira issue key (e.g., "PROJ-123")
    pub issue_key: String,

    /// Fields to update, e.g. {"summary": "New title", "assignee": "jdoe"}
    pub fields: ObjectOrJson,

    /// Extra fields set verbatim (custom fields, etc.)
    pub additional_fields: Option<ObjectOrJson>,
}

#[instrument(skip(ctx))]
pub async fn update_issue(ctx: RequestContext, params: UpdateIssueParams) -> JiraMcpResult<Value> {
    ctx.ensure_writable("update issue")?;
    let issue_key = require_non_blank("issue_key", Some(params.issue_key.as_str()))?.to_string();

    let fields = params.fields.into_object("fields")?;
    let additional_fields = params
        .additional_fields
        .map(|fields| fields.into_object("additional_fields"))
        .transpose()?
        .unwrap_or_default();
    if fields.is_empty() && additional_fields.is_empty() {
        return Err(JiraMcpError::invalid_param(
            "fields",
            "At least one field must be provided",
        ));
    }

    let issue = ctx
        .fetcher
        .update_issue(UpdateIssueRequest {
            issue_key,
            fields,
            additional_fields,
        })
        .await?;
    with_message("Issue updated successfully", "issue", &issue)
}

/// Parameters for the delete_issue tool
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct DeleteIssueParams {
    /// The Jira issue key (e.g., "PROJ-123")
    pub issue_key: String,
}

#[instrument(skip(ctx))]
pub async fn delete_issue(ctx: RequestContext, params: DeleteIssueParams) -> JiraMcpResult<Value> {
    ctx.ensure_writable("delete issue")?;
    let issue_key = require_non_blank("issue_key", Some(params.issue_key.as_str()))?;

    ctx.fetcher.delete_issue(issue_key).await?;
    Ok(json!({
        "message": format!("Issue {} has been deleted successfully.", issue_key),
    }))
}

/// Parameters for the add_comment tool
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct AddCommentParams {
    /// The Jira issue key (e.g., "PROJ-123")
    pub issue_key: String,

    /// Comment text (Markdown or Jira wiki markup)
    pub comment: String,
}

#[instrument(skip(ctx, params), fields(issue_key = %params.issue_key))]
pub async fn add_comment(ctx: RequestContext, params: AddCommentParams) -> JiraMcpResult<Value> {
    ctx.ensure_writable("add comment")?;
    let issue_key = require_non_blank("issue_key", Some(params.issue_key.as_str()))?;
    let comment = require_non_blank("comment", Some(params.comment.as_str()))?;

    let comment = ctx.fetcher.add_comment(issue_key, comment).await?;
    with_message("Comment added successfully", "comment", &comment)
}
