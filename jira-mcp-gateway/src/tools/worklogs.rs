//! Worklog tools

use crate::context::RequestContext;
use crate::error::JiraMcpResult;
use crate::fetcher::WorklogRequest;
use crate::normalize::require_non_blank;
use crate::tools::{non_blank, to_json, with_message};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::instrument;

/// Parameters for the get_worklog tool
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct GetWorklogParams {
    /// The Jira issue key (e.g., "PROJ-123")
    pub issue_key: String,
}

#[instrument(skip(ctx))]
pub async fn get_worklog(ctx: RequestContext, params: GetWorklogParams) -> JiraMcpResult<Value> {
    let issue_key = require_non_blank("issue_key", Some(params.issue_key.as_str()))?;
    let worklogs = ctx.fetcher.get_worklogs(issue_key).await?;
    Ok(json!({ "worklogs": to_json(&worklogs)? }))
}

/// Parameters for the add_worklog tool
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct AddWorklogParams {
    /// The Jira issue key (e.g., "PROJ-123")
    pub issue_key: String,

    /// Time spent in Jira duration format (e.g., "1h 30m", "1d")
    pub time_spent: String,

    /// Worklog comment
    pub comment: Option<String>,

    /// Start time (e.g., "2025-01-01T09:00:00.000+0000")
    pub started: Option<String>,

    /// New original estimate for the issue
    pub original_estimate: Option<String>,

    /// New remaining estimate for the issue
    pub remaining_estimate: Option<String>,
}

#[instrument(skip(ctx))]
pub async fn add_worklog(ctx: RequestContext, params: AddWorklogParams) -> JiraMcpResult<Value> {
    ctx.ensure_writable("add worklog")?;
    let issue_key = require_non_blank("issue_key", Some(params.issue_key.as_str()))?.to_string();
    let time_spent = require_non_blank("time_spent", Some(params.time_spent.as_str()))?.to_string();

    let worklog = ctx
        .fetcher
        .add_worklog(WorklogRequest {
            issue_key,
            time_spent,
            comment: non_blank(params.comment),
            started: non_blank(params.started),
            original_estimate: non_blank(params.original_estimate),
            remaining_estimate: non_blank(params.remaining_estimate),
        })
        .await?;
    with_message("Worklog added successfully", "worklog", &worklog)
}
