//! Search tools: JQL search, field search, project issues

use crate::context::RequestContext;
use crate::error::JiraMcpResult;
use crate::fetcher::{SearchRequest, DEFAULT_LIMIT, DEFAULT_START};
use crate::normalize::{parse_field_selection, require_non_blank};
use crate::tools::{non_blank, to_json};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, instrument};

/// Parameters for the search tool
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct SearchParams {
    /// JQL query (e.g., "project = PROJ AND status = Open")
    pub jql: String,

    /// Comma-separated fields to return, or "*all"
    pub fields: Option<String>,

    /// Maximum results to return (default: 10)
    pub limit: Option<u32>,

    /// Starting offset for pagination (default: 0)
    pub start_at: Option<u32>,

    /// Comma-separated project keys overriding the configured projects filter
    pub projects_filter: Option<String>,

    /// Comma-separated expansions
    pub expand: Option<String>,
}

#[instrument(skip(ctx))]
pub async fn search(ctx: RequestContext, params: SearchParams) -> JiraMcpResult<Value> {
    let jql = require_non_blank("jql", Some(params.jql.as_str()))?.to_string();

    let request = SearchRequest {
        jql,
        fields: parse_field_selection(params.fields.as_deref()),
        limit: params.limit.unwrap_or(DEFAULT_LIMIT),
        start: params.start_at.unwrap_or(DEFAULT_START),
        projects_filter: non_blank(params.projects_filter),
        expand: non_blank(params.expand),
    };

    let page = ctx.fetcher.search_issues(request).await?;
    debug!("Search returned {} of {} issues", page.issues.len(), page.total);
    to_json(&page)
}

/// Parameters for the search_fields tool
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct SearchFieldsParams {
    /// Keyword matched against field names and ids; empty lists all fields
    pub keyword: Option<String>,

    /// Maximum number of fields to return (default: 10)
    pub limit: Option<u32>,

    /// Force a fresh fetch of field definitions
    pub refresh: Option<bool>,
}

#[instrument(skip(ctx))]
pub async fn search_fields(ctx: RequestContext, params: SearchFieldsParams) -> JiraMcpResult<Value> {
    let keyword = params.keyword.unwrap_or_default();
    let fields = ctx
        .fetcher
        .search_fields(
            keyword.trim(),
            params.limit.unwrap_or(DEFAULT_LIMIT),
            params.refresh.unwrap_or(false),
        )
        .await?;
    to_json(&fields)
}

/// Parameters for the get_project_issues tool
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct GetProjectIssuesParams {
    /// The project key (e.g., "PROJ")
    pub project_key: String,

    /// Maximum results to return (default: 10)
    pub limit: Option<u32>,

    /// Starting offset for pagination (default: 0)
    pub start_at: Option<u32>,
}

#[instrument(skip(ctx))]
pub async fn get_project_issues(
    ctx: RequestContext,
    params: GetProjectIssuesParams,
) -> JiraMcpResult<Value> {
    let project_key = require_non_blank("project_key", Some(params.project_key.as_str()))?;

    let page = ctx
        .fetcher
        .get_project_issues(
            project_key,
            params.start_at.unwrap_or(DEFAULT_START),
            params.limit.unwrap_or(DEFAULT_LIMIT),
        )
        .await?;
    to_json(&page)
}
