//! Issue link and epic link tools

use crate::context::RequestContext;
use crate::error::JiraMcpResult;
use crate::fetcher::IssueLinkRequest;
use crate::normalize::{require_non_blank, ObjectOrJson};
use crate::tools::{non_blank, to_json, with_message};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, instrument};

/// Parameters for the get_link_types tool
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct GetLinkTypesParams {}

#[instrument(skip(ctx))]
pub async fn get_link_types(ctx: RequestContext, _params: GetLinkTypesParams) -> JiraMcpResult<Value> {
    let link_types = ctx.fetcher.get_issue_link_types().await?;
    to_json(&link_types)
}

/// Parameters for the link_to_epic tool
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct LinkToEpicParams {
    /// Key of the issue to attach to the epic (e.g., "PROJ-123")
    pub issue_key: String,

    /// Key of the epic (e.g., "PROJ-100")
    pub epic_key: String,
}

#[instrument(skip(ctx))]
pub async fn link_to_epic(ctx: RequestContext, params: LinkToEpicParams) -> JiraMcpResult<Value> {
    ctx.ensure_writable("link issue to epic")?;
    let issue_key = require_non_blank("issue_key", Some(params.issue_key.as_str()))?;
    let epic_key = require_non_blank("epic_key", Some(params.epic_key.as_str()))?;

    let issue = ctx.fetcher.link_issue_to_epic(issue_key, epic_key).await?;
    info!("Linked {} to epic {}", issue_key, epic_key);
    with_message(
        format!("Issue {} has been linked to epic {}.", issue_key, epic_key),
        "issue",
        &issue,
    )
}

/// Parameters for the create_issue_link tool
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct CreateIssueLinkParams {
    /// Link type name (e.g., "Blocks", "Duplicate", "Relates")
    pub link_type: String,

    /// Key of the inward issue (e.g., "PROJ-1" in "PROJ-1 is blocked by PROJ-2")
    pub inward_issue_key: String,

    /// Key of the outward issue
    pub outward_issue_key: String,

    /// Comment added to the link
    pub comment: Option<String>,

    /// Comment visibility, e.g. {"type": "group", "value": "jira-users"}
    pub comment_visibility: Option<ObjectOrJson>,
}

#[instrument(skip(ctx))]
pub async fn create_issue_link(
    ctx: RequestContext,
    params: CreateIssueLinkParams,
) -> JiraMcpResult<Value> {
    ctx.ensure_writable("create issue link")?;
    let link_type = require_non_blank("link_type", Some(params.link_type.as_str()))?.to_string();
    let inward_issue_key =
        require_non_blank("inward_issue_key", Some(params.inward_issue_key.as_str()))?.to_string();
    let outward_issue_key =
        require_non_blank("outward_issue_key", Some(params.outward_issue_key.as_str()))?
            .to_string();

    let comment_visibility = params
        .comment_visibility
        .map(|visibility| visibility.into_object("comment_visibility"))
        .transpose()?;

    let result = ctx
        .fetcher
        .create_issue_link(IssueLinkRequest {
            link_type,
            inward_issue_key,
            outward_issue_key,
            comment: non_blank(params.comment),
            comment_visibility,
        })
        .await?;
    to_json(&result)
}

/// Parameters for the remove_issue_link tool
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct RemoveIssueLinkParams {
    /// Id of the link to remove
    pub link_id: String,
}

#[instrument(skip(ctx))]
pub async fn remove_issue_link(
    ctx: RequestContext,
    params: RemoveIssueLinkParams,
) -> JiraMcpResult<Value> {
    ctx.ensure_writable("remove issue link")?;
    let link_id = require_non_blank("link_id", Some(params.link_id.as_str()))?;

    let result = ctx.fetcher.remove_issue_link(link_id).await?;
    to_json(&result)
}
