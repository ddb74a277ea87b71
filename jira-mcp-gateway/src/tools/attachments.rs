//! Attachment download tool

use crate::context::RequestContext;
use crate::error::JiraMcpResult;
use crate::normalize::require_non_blank;
use crate::tools::to_json;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, instrument};

/// Parameters for the download_attachments tool
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct DownloadAttachmentsParams {
    /// The Jira issue key (e.g., "PROJ-123")
    pub issue_key: String,

    /// Directory the attachments are written to; created if missing
    pub target_dir: String,
}

#[instrument(skip(ctx))]
pub async fn download_attachments(
    ctx: RequestContext,
    params: DownloadAttachmentsParams,
) -> JiraMcpResult<Value> {
    let issue_key = require_non_blank("issue_key", Some(params.issue_key.as_str()))?;
    let target_dir = require_non_blank("target_dir", Some(params.target_dir.as_str()))?;

    let report = ctx
        .fetcher
        .download_issue_attachments(issue_key, target_dir)
        .await?;
    info!(
        "Downloaded {} of {} attachments of {}",
        report.downloaded.len(),
        report.total,
        issue_key
    );
    to_json(&report)
}
