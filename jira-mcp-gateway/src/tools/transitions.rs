//! Issue transition tools
//!
//! Jira doesn't allow direct status updates; an issue moves between states
//! through the transitions its workflow offers.

use crate::context::RequestContext;
use crate::error::JiraMcpResult;
use crate::fetcher::TransitionRequest;
use crate::normalize::{require_non_blank, ObjectOrJson};
use crate::tools::{non_blank, to_json, with_message};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, instrument};

/// Parameters for the get_transitions tool
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct GetTransitionsParams {
    /// The Jira issue key (e.g., "PROJ-123")
    pub issue_key: String,
}

#[instrument(skip(ctx))]
pub async fn get_transitions(ctx: RequestContext, params: GetTransitionsParams) -> JiraMcpResult<Value> {
    let issue_key = require_non_blank("issue_key", Some(params.issue_key.as_str()))?;
    let transitions = ctx.fetcher.get_transitions(issue_key).await?;
    to_json(&transitions)
}

/// Parameters for the transition_issue tool
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct TransitionIssueParams {
    /// The Jira issue key (e.g., "PROJ-123")
    pub issue_key: String,

    /// Transition id, as listed by get_transitions
    pub transition_id: String,

    /// Fields required by the transition screen (e.g., {"resolution": {"name": "Fixed"}})
    pub fields: Option<ObjectOrJson>,

    /// Comment added while transitioning
    pub comment: Option<String>,
}

#[instrument(skip(ctx))]
pub async fn transition_issue(
    ctx: RequestContext,
    params: TransitionIssueParams,
) -> JiraMcpResult<Value> {
    ctx.ensure_writable("transition issue")?;
    let issue_key = require_non_blank("issue_key", Some(params.issue_key.as_str()))?.to_string();
    let transition_id =
        require_non_blank("transition_id", Some(params.transition_id.as_str()))?.to_string();

    let fields = params
        .fields
        .map(|fields| fields.into_object("fields"))
        .transpose()?;

    let issue = ctx
        .fetcher
        .transition_issue(TransitionRequest {
            issue_key: issue_key.clone(),
            transition_id,
            fields,
            comment: non_blank(params.comment),
        })
        .await?;

    info!("Issue {} transitioned", issue_key);
    with_message(
        format!("Issue {} transitioned successfully", issue_key),
        "issue",
        &issue,
    )
}
