//! Name-based tool dispatch
//!
//! [`JiraToolDispatcher`] resolves the request context for a call, runs the
//! matching handler from [`crate::tools`] and turns failures into
//! [`ToolCallError`]s naming the tool. The two soft-failure tools
//! (`get_all_projects`, `get_user_profile`) also report context resolution
//! failures as error envelopes.

use crate::context::{ContextResolver, RequestContext, RequestState};
use crate::error::{JiraMcpError, JiraMcpResult, ToolCallError};
use crate::tools::{self, users::user_context};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::future::Future;
use tracing::{debug, error, instrument, warn};

/// Prefix carried by tool names on the MCP surface
pub const TOOL_PREFIX: &str = "jira_";

/// Catalog entry for one tool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ToolInfo {
    pub name: &'static str,
    pub mutating: bool,
    pub description: &'static str,
}

const fn read(name: &'static str, description: &'static str) -> ToolInfo {
    ToolInfo {
        name,
        mutating: false,
        description,
    }
}

const fn write(name: &'static str, description: &'static str) -> ToolInfo {
    ToolInfo {
        name,
        mutating: true,
        description,
    }
}

const TOOL_CATALOG: &[ToolInfo] = &[
    read("get_user_profile", "Retrieve profile information for a Jira user"),
    read("get_issue", "Get details of a Jira issue including its comments"),
    read("search", "Search Jira issues using JQL"),
    read("search_fields", "Search Jira fields by keyword"),
    read("get_project_issues", "Get all issues of a project"),
    read("get_transitions", "Get the available status transitions of an issue"),
    read("get_worklog", "Get the worklog entries of an issue"),
    read("download_attachments", "Download the attachments of an issue"),
    read("get_agile_boards", "Get agile boards by name, project or type"),
    read("get_board_issues", "Get the issues of an agile board"),
    read("get_sprints_from_board", "Get the sprints of an agile board"),
    read("get_sprint_issues", "Get the issues of a sprint"),
    read("get_link_types", "Get the available issue link types"),
    read("get_all_projects", "Get all accessible projects"),
    read("get_project_versions", "Get the fix versions of a project"),
    read("batch_get_changelogs", "Get changelogs for several issues (Cloud only)"),
    write("create_issue", "Create a new issue"),
    write("batch_create_issues", "Create several issues at once"),
    write("update_issue", "Update an existing issue"),
    write("delete_issue", "Delete an issue"),
    write("add_comment", "Add a comment to an issue"),
    write("add_worklog", "Add a worklog entry to an issue"),
    write("link_to_epic", "Link an issue to an epic"),
    write("create_issue_link", "Create a link between two issues"),
    write("remove_issue_link", "Remove a link between two issues"),
    write("transition_issue", "Move an issue to a new status"),
    write("create_sprint", "Create a sprint on a board"),
    write("update_sprint", "Update a sprint"),
    write("create_version", "Create a fix version in a project"),
    write("batch_create_versions", "Create several fix versions in a project"),
];

/// Every tool this gateway serves, without the `jira_` prefix
pub fn tool_catalog() -> &'static [ToolInfo] {
    TOOL_CATALOG
}

/// Tools visible to a caller; mutating tools are hidden in read-only mode
pub fn available_tools(read_only: bool) -> Vec<&'static ToolInfo> {
    TOOL_CATALOG
        .iter()
        .filter(|tool| !(read_only && tool.mutating))
        .collect()
}

fn parse_arguments<P: DeserializeOwned>(tool: &str, arguments: Value) -> Result<P, ToolCallError> {
    serde_json::from_value(arguments).map_err(|e| {
        warn!("Invalid arguments for '{}': {}", tool, e);
        ToolCallError::new(tool, JiraMcpError::invalid_param("arguments", e.to_string()))
    })
}

/// Runs tool handlers against a resolved request context
pub struct JiraToolDispatcher {
    resolver: ContextResolver,
}

impl JiraToolDispatcher {
    pub fn new(resolver: ContextResolver) -> Self {
        Self { resolver }
    }

    pub fn resolver(&self) -> &ContextResolver {
        &self.resolver
    }

    /// Tools visible under the resolver's read-only setting
    pub fn available_tools(&self) -> Vec<&'static ToolInfo> {
        available_tools(self.resolver.is_read_only())
    }

    /// Resolve the context and run `handler`; any failure names the tool
    pub async fn invoke<P, F, Fut>(
        &self,
        tool: &str,
        request: &RequestState,
        params: P,
        handler: F,
    ) -> Result<Value, ToolCallError>
    where
        F: FnOnce(RequestContext, P) -> Fut,
        Fut: Future<Output = JiraMcpResult<Value>>,
    {
        let ctx = self.resolver.resolve(request).await.map_err(|e| {
            error!("{} failed: {}", tool, e);
            ToolCallError::new(tool, e)
        })?;

        handler(ctx, params).await.map_err(|e| {
            error!("{} failed: {}", tool, e);
            ToolCallError::new(tool, e)
        })
    }

    /// Like [`invoke`](Self::invoke), but a classified resolution failure is
    /// returned as an error envelope carrying `context`
    pub async fn invoke_soft<P, F, Fut>(
        &self,
        tool: &str,
        request: &RequestState,
        params: P,
        context: Map<String, Value>,
        handler: F,
    ) -> Result<Value, ToolCallError>
    where
        F: FnOnce(RequestContext, P) -> Fut,
        Fut: Future<Output = JiraMcpResult<Value>>,
    {
        let ctx = match self.resolver.resolve(request).await {
            Ok(ctx) => ctx,
            Err(e) => {
                warn!("{} could not resolve a Jira client: {}", tool, e);
                return e
                    .into_envelope(context)
                    .map(|envelope| envelope.into_value())
                    .map_err(|e| ToolCallError::new(tool, e));
            }
        };

        handler(ctx, params).await.map_err(|e| {
            error!("{} failed: {}", tool, e);
            ToolCallError::new(tool, e)
        })
    }

    /// Dispatch a call by tool name, with or without the `jira_` prefix
    #[instrument(skip(self, arguments, request))]
    pub async fn call_tool(
        &self,
        name: &str,
        arguments: Value,
        request: &RequestState,
    ) -> Result<Value, ToolCallError> {
        let tool = name.strip_prefix(TOOL_PREFIX).unwrap_or(name);
        let arguments = if arguments.is_null() { json!({}) } else { arguments };
        debug!("Dispatching tool '{}'", tool);

        match tool {
            "get_user_profile" => {
                let params: tools::GetUserProfileParams = parse_arguments(tool, arguments)?;
                let context = user_context(&params.user_identifier);
                self.invoke_soft(tool, request, params, context, tools::get_user_profile)
                    .await
            }
            "get_all_projects" => {
                let params = parse_arguments(tool, arguments)?;
                self.invoke_soft(tool, request, params, Map::new(), tools::get_all_projects)
                    .await
            }
            "get_issue" => {
                let params = parse_arguments(tool, arguments)?;
                self.invoke(tool, request, params, tools::get_issue).await
            }
            "search" => {
                let params = parse_arguments(tool, arguments)?;
                self.invoke(tool, request, params, tools::search).await
            }
            "search_fields" => {
                let params = parse_arguments(tool, arguments)?;
                self.invoke(tool, request, params, tools::search_fields).await
            }
            "get_project_issues" => {
                let params = parse_arguments(tool, arguments)?;
                self.invoke(tool, request, params, tools::get_project_issues).await
            }
            "get_transitions" => {
                let params = parse_arguments(tool, arguments)?;
                self.invoke(tool, request, params, tools::get_transitions).await
            }
            "get_worklog" => {
                let params = parse_arguments(tool, arguments)?;
                self.invoke(tool, request, params, tools::get_worklog).await
            }
            "download_attachments" => {
                let params = parse_arguments(tool, arguments)?;
                self.invoke(tool, request, params, tools::download_attachments).await
            }
            "get_agile_boards" => {
                let params = parse_arguments(tool, arguments)?;
                self.invoke(tool, request, params, tools::get_agile_boards).await
            }
            "get_board_issues" => {
                let params = parse_arguments(tool, arguments)?;
                self.invoke(tool, request, params, tools::get_board_issues).await
            }
            "get_sprints_from_board" => {
                let params = parse_arguments(tool, arguments)?;
                self.invoke(tool, request, params, tools::get_sprints_from_board).await
            }
            "get_sprint_issues" => {
                let params = parse_arguments(tool, arguments)?;
                self.invoke(tool, request, params, tools::get_sprint_issues).await
            }
            "get_link_types" => {
                let params = parse_arguments(tool, arguments)?;
                self.invoke(tool, request, params, tools::get_link_types).await
            }
            "get_project_versions" => {
                let params = parse_arguments(tool, arguments)?;
                self.invoke(tool, request, params, tools::get_project_versions).await
            }
            "batch_get_changelogs" => {
                let params = parse_arguments(tool, arguments)?;
                self.invoke(tool, request, params, tools::batch_get_changelogs).await
            }
            "create_issue" => {
                let params = parse_arguments(tool, arguments)?;
                self.invoke(tool, request, params, tools::create_issue).await
            }
            "batch_create_issues" => {
                let params = parse_arguments(tool, arguments)?;
                self.invoke(tool, request, params, tools::batch_create_issues).await
            }
            "update_issue" => {
                let params = parse_arguments(tool, arguments)?;
                self.invoke(tool, request, params, tools::update_issue).await
            }
            "delete_issue" => {
                let params = parse_arguments(tool, arguments)?;
                self.invoke(tool, request, params, tools::delete_issue).await
            }
            "add_comment" => {
                let params = parse_arguments(tool, arguments)?;
                self.invoke(tool, request, params, tools::add_comment).await
            }
            "add_worklog" => {
                let params = parse_arguments(tool, arguments)?;
                self.invoke(tool, request, params, tools::add_worklog).await
            }
            "link_to_epic" => {
                let params = parse_arguments(tool, arguments)?;
                self.invoke(tool, request, params, tools::link_to_epic).await
            }
            "create_issue_link" => {
                let params = parse_arguments(tool, arguments)?;
                self.invoke(tool, request, params, tools::create_issue_link).await
            }
            "remove_issue_link" => {
                let params = parse_arguments(tool, arguments)?;
                self.invoke(tool, request, params, tools::remove_issue_link).await
            }
            "transition_issue" => {
                let params = parse_arguments(tool, arguments)?;
                self.invoke(tool, request, params, tools::transition_issue).await
            }
            "create_sprint" => {
                let params = parse_arguments(tool, arguments)?;
                self.invoke(tool, request, params, tools::create_sprint).await
            }
            "update_sprint" => {
                let params = parse_arguments(tool, arguments)?;
                self.invoke(tool, request, params, tools::update_sprint).await
            }
            "create_version" => {
                let params = parse_arguments(tool, arguments)?;
                self.invoke(tool, request, params, tools::create_version).await
            }
            "batch_create_versions" => {
                let params = parse_arguments(tool, arguments)?;
                self.invoke(tool, request, params, tools::batch_create_versions).await
            }
            unknown => {
                warn!("Unknown tool '{}'", unknown);
                Err(ToolCallError::new(
                    name,
                    JiraMcpError::invalid_param("name", format!("Unknown tool '{}'", name)),
                ))
            }
        }
    }
}
