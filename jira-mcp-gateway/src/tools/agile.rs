//! Agile tools: boards, sprints and their issues

use crate::context::RequestContext;
use crate::error::{JiraMcpError, JiraMcpResult};
use crate::fetcher::{
    BoardQuery, CreateSprintRequest, ScopedIssuesQuery, UpdateSprintRequest, DEFAULT_LIMIT,
    DEFAULT_START,
};
use crate::normalize::{parse_field_selection, require_non_blank};
use crate::tools::{non_blank, to_json, with_message};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, instrument};

const SPRINT_STATES: [&str; 3] = ["future", "active", "closed"];

fn check_sprint_state(state: Option<String>) -> JiraMcpResult<Option<String>> {
    match non_blank(state) {
        Some(state) => {
            let state = state.to_lowercase();
            if SPRINT_STATES.contains(&state.as_str()) {
                Ok(Some(state))
            } else {
                Err(JiraMcpError::invalid_param(
                    "state",
                    format!("state must be one of: {}", SPRINT_STATES.join(", ")),
                ))
            }
        }
        None => Ok(None),
    }
}

/// Parameters for the get_agile_boards tool
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct GetAgileBoardsParams {
    /// Board name, matched as a substring
    pub board_name: Option<String>,

    /// Only boards of this project (e.g., "PROJ")
    pub project_key: Option<String>,

    /// Board type: "scrum" or "kanban"
    pub board_type: Option<String>,

    /// Starting offset for pagination (default: 0)
    pub start_at: Option<u32>,

    /// Maximum results to return (default: 10)
    pub limit: Option<u32>,
}

#[instrument(skip(ctx))]
pub async fn get_agile_boards(ctx: RequestContext, params: GetAgileBoardsParams) -> JiraMcpResult<Value> {
    let boards = ctx
        .fetcher
        .get_all_agile_boards(BoardQuery {
            board_name: non_blank(params.board_name),
            project_key: non_blank(params.project_key),
            board_type: non_blank(params.board_type),
            start: params.start_at.unwrap_or(DEFAULT_START),
            limit: params.limit.unwrap_or(DEFAULT_LIMIT),
        })
        .await?;
    to_json(&boards)
}

/// Parameters for the get_board_issues tool
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct GetBoardIssuesParams {
    /// Board id (e.g., "1001")
    pub board_id: String,

    /// JQL applied on top of the board filter
    pub jql: String,

    /// Comma-separated fields to return, or "*all"
    pub fields: Option<String>,

    /// Starting offset for pagination (default: 0)
    pub start_at: Option<u32>,

    /// Maximum results to return (default: 10)
    pub limit: Option<u32>,

    /// Comma-separated expansions
    pub expand: Option<String>,
}

#[instrument(skip(ctx))]
pub async fn get_board_issues(ctx: RequestContext, params: GetBoardIssuesParams) -> JiraMcpResult<Value> {
    let board_id = require_non_blank("board_id", Some(params.board_id.as_str()))?.to_string();
    let jql = require_non_blank("jql", Some(params.jql.as_str()))?.to_string();

    let page = ctx
        .fetcher
        .get_board_issues(ScopedIssuesQuery {
            scope_id: board_id,
            jql: Some(jql),
            fields: parse_field_selection(params.fields.as_deref()),
            start: params.start_at.unwrap_or(DEFAULT_START),
            limit: params.limit.unwrap_or(DEFAULT_LIMIT),
            expand: non_blank(params.expand),
        })
        .await?;
    to_json(&page)
}

/// Parameters for the get_sprints_from_board tool
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct GetSprintsFromBoardParams {
    /// Board id (e.g., "1001")
    pub board_id: String,

    /// Sprint state filter: "future", "active" or "closed"
    pub state: Option<String>,

    /// Starting offset for pagination (default: 0)
    pub start_at: Option<u32>,

    /// Maximum results to return (default: 10)
    pub limit: Option<u32>,
}

#[instrument(skip(ctx))]
pub async fn get_sprints_from_board(
    ctx: RequestContext,
    params: GetSprintsFromBoardParams,
) -> JiraMcpResult<Value> {
    let board_id = require_non_blank("board_id", Some(params.board_id.as_str()))?;
    let state = check_sprint_state(params.state)?;

    let sprints = ctx
        .fetcher
        .get_all_sprints_from_board(
            board_id,
            state.as_deref(),
            params.start_at.unwrap_or(DEFAULT_START),
            params.limit.unwrap_or(DEFAULT_LIMIT),
        )
        .await?;
    to_json(&sprints)
}

/// Parameters for the get_sprint_issues tool
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct GetSprintIssuesParams {
    /// Sprint id (e.g., "10001")
    pub sprint_id: String,

    /// Comma-separated fields to return, or "*all"
    pub fields: Option<String>,

    /// Starting offset for pagination (default: 0)
    pub start_at: Option<u32>,

    /// Maximum results to return (default: 10)
    pub limit: Option<u32>,
}

#[instrument(skip(ctx))]
pub async fn get_sprint_issues(
    ctx: RequestContext,
    params: GetSprintIssuesParams,
) -> JiraMcpResult<Value> {
    let sprint_id = require_non_blank("sprint_id", Some(params.sprint_id.as_str()))?.to_string();

    let page = ctx
        .fetcher
        .get_sprint_issues(ScopedIssuesQuery {
            scope_id: sprint_id,
            jql: None,
            fields: parse_field_selection(params.fields.as_deref()),
            start: params.start_at.unwrap_or(DEFAULT_START),
            limit: params.limit.unwrap_or(DEFAULT_LIMIT),
            expand: None,
        })
        .await?;
    to_json(&page)
}

/// Parameters for the create_sprint tool
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct CreateSprintParams {
    /// Board id the sprint belongs to
    pub board_id: String,

    /// Sprint name
    pub sprint_name: String,

    /// Start date/time (ISO 8601)
    pub start_date: String,

    /// End date/time (ISO 8601)
    pub end_date: String,

    /// Sprint goal
    pub goal: Option<String>,
}

#[instrument(skip(ctx))]
pub async fn create_sprint(ctx: RequestContext, params: CreateSprintParams) -> JiraMcpResult<Value> {
    ctx.ensure_writable("create sprint")?;
    let board_id = require_non_blank("board_id", Some(params.board_id.as_str()))?.to_string();
    let sprint_name = require_non_blank("sprint_name", Some(params.sprint_name.as_str()))?.to_string();
    let start_date = require_non_blank("start_date", Some(params.start_date.as_str()))?.to_string();
    let end_date = require_non_blank("end_date", Some(params.end_date.as_str()))?.to_string();

    let sprint = ctx
        .fetcher
        .create_sprint(CreateSprintRequest {
            board_id,
            sprint_name,
            start_date,
            end_date,
            goal: non_blank(params.goal),
        })
        .await?;
    info!("Created sprint {} ({})", sprint.name, sprint.id);
    with_message("Sprint created successfully", "sprint", &sprint)
}

/// Parameters for the update_sprint tool
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct UpdateSprintParams {
    /// Sprint id
    pub sprint_id: String,

    /// New sprint name
    pub sprint_name: Option<String>,

    /// New state: "future", "active" or "closed"
    pub state: Option<String>,

    /// New start date/time (ISO 8601)
    pub start_date: Option<String>,

    /// New end date/time (ISO 8601)
    pub end_date: Option<String>,

    /// New sprint goal
    pub goal: Option<String>,
}

#[instrument(skip(ctx))]
pub async fn update_sprint(ctx: RequestContext, params: UpdateSprintParams) -> JiraMcpResult<Value> {
    ctx.ensure_writable("update sprint")?;
    let sprint_id = require_non_blank("sprint_id", Some(params.sprint_id.as_str()))?.to_string();
    let state = check_sprint_state(params.state)?;

    let sprint = ctx
        .fetcher
        .update_sprint(UpdateSprintRequest {
            sprint_id,
            sprint_name: non_blank(params.sprint_name),
            state,
            start_date: non_blank(params.start_date),
            end_date: non_blank(params.end_date),
            goal: non_blank(params.goal),
        })
        .await?;
    with_message("Sprint updated successfully", "sprint", &sprint)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sprint_state() {
        assert_eq!(check_sprint_state(None).unwrap(), None);
        assert_eq!(check_sprint_state(Some("  ".into())).unwrap(), None);
        assert_eq!(
            check_sprint_state(Some("Active".into())).unwrap(),
            Some("active".to_string())
        );
        assert!(check_sprint_state(Some("done".into())).is_err());
    }
}
