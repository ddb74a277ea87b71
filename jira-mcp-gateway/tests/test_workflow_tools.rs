/// Integration tests for search, agile, link, transition, worklog and attachment tools
mod common;

use assert_matches::assert_matches;
use common::dispatcher_with;
use jira_mcp_gateway::error::JiraMcpError;
use jira_mcp_gateway::fetcher::{
    BoardQuery, CreateSprintRequest, IssueLinkRequest, ScopedIssuesQuery, SearchRequest,
    TransitionRequest, WorklogRequest,
};
use jira_mcp_gateway::test_support::{FetcherCall, InMemoryFetcher};
use serde_json::{json, Map};
use std::sync::Arc;

#[tokio::test]
async fn test_search_defaults_and_page_shape() {
    let fetcher = Arc::new(InMemoryFetcher::default());
    let (dispatcher, request) = dispatcher_with(fetcher.clone());

    let result = dispatcher
        .call_tool("search", json!({"jql": "project = PROJ"}), &request)
        .await
        .expect("search failed");

    assert_eq!(result["total"], 1);
    assert_eq!(result["start_at"], 0);
    assert_eq!(result["max_results"], 10);
    assert_eq!(result["issues"][0]["key"], "PROJ-123");
    assert_eq!(
        fetcher.calls(),
        vec![FetcherCall::SearchIssues(SearchRequest {
            jql: "project = PROJ".to_string(),
            fields: None,
            limit: 10,
            start: 0,
            projects_filter: None,
            expand: None,
        })]
    );
}

#[tokio::test]
async fn test_search_passes_overrides() {
    let fetcher = Arc::new(InMemoryFetcher::default());
    let (dispatcher, request) = dispatcher_with(fetcher.clone());

    dispatcher
        .call_tool(
            "search",
            json!({
                "jql": "status = Open",
                "fields": "*all",
                "limit": 25,
                "start_at": 50,
                "projects_filter": "PROJ1,PROJ2",
                "expand": "changelog"
            }),
            &request,
        )
        .await
        .expect("search failed");

    assert_eq!(
        fetcher.calls(),
        vec![FetcherCall::SearchIssues(SearchRequest {
            jql: "status = Open".to_string(),
            fields: Some(vec!["*all".to_string()]),
            limit: 25,
            start: 50,
            projects_filter: Some("PROJ1,PROJ2".to_string()),
            expand: Some("changelog".to_string()),
        })]
    );
}

#[tokio::test]
async fn test_search_fields_and_project_issues() {
    let fetcher = Arc::new(InMemoryFetcher::default());
    let (dispatcher, request) = dispatcher_with(fetcher.clone());

    let fields = dispatcher
        .call_tool("search_fields", json!({"keyword": " story "}), &request)
        .await
        .expect("search_fields failed");
    assert_eq!(fields[0]["id"], "customfield_10010");

    let page = dispatcher
        .call_tool("get_project_issues", json!({"project_key": "PROJ", "limit": 5}), &request)
        .await
        .expect("get_project_issues failed");
    assert_eq!(page["max_results"], 5);

    assert_eq!(
        fetcher.calls(),
        vec![
            FetcherCall::SearchFields {
                keyword: "story".to_string(),
                limit: 10,
                refresh: false,
            },
            FetcherCall::GetProjectIssues {
                project_key: "PROJ".to_string(),
                start: 0,
                limit: 5,
            },
        ]
    );
}

#[tokio::test]
async fn test_agile_boards_and_board_issues() {
    let fetcher = Arc::new(InMemoryFetcher::default());
    let (dispatcher, request) = dispatcher_with(fetcher.clone());

    let boards = dispatcher
        .call_tool(
            "get_agile_boards",
            json!({"project_key": "PROJ", "board_type": "scrum", "board_name": ""}),
            &request,
        )
        .await
        .expect("get_agile_boards failed");
    assert_eq!(boards[0]["id"], 1000);
    assert_eq!(boards[0]["type"], "scrum");

    let page = dispatcher
        .call_tool(
            "get_board_issues",
            json!({"board_id": "1000", "jql": "assignee = currentUser()", "fields": "summary"}),
            &request,
        )
        .await
        .expect("get_board_issues failed");
    assert_eq!(page["issues"][0]["key"], "PROJ-123");

    let err = dispatcher
        .call_tool("get_board_issues", json!({"board_id": "1000", "jql": " "}), &request)
        .await
        .unwrap_err();
    assert_matches!(err.source, JiraMcpError::InvalidParameter { .. });

    assert_eq!(
        fetcher.calls(),
        vec![
            FetcherCall::GetAgileBoards(BoardQuery {
                board_name: None,
                project_key: Some("PROJ".to_string()),
                board_type: Some("scrum".to_string()),
                start: 0,
                limit: 10,
            }),
            FetcherCall::GetBoardIssues(ScopedIssuesQuery {
                scope_id: "1000".to_string(),
                jql: Some("assignee = currentUser()".to_string()),
                fields: Some(vec!["summary".to_string()]),
                start: 0,
                limit: 10,
                expand: None,
            }),
        ]
    );
}

#[tokio::test]
async fn test_sprint_lifecycle() {
    let fetcher = Arc::new(InMemoryFetcher::default());
    let (dispatcher, request) = dispatcher_with(fetcher.clone());

    let sprints = dispatcher
        .call_tool(
            "get_sprints_from_board",
            json!({"board_id": "1000", "state": "Active"}),
            &request,
        )
        .await
        .expect("get_sprints_from_board failed");
    assert_eq!(sprints[0]["state"], "active");

    let created = dispatcher
        .call_tool(
            "create_sprint",
            json!({
                "board_id": "1000",
                "sprint_name": "Sprint 2",
                "start_date": "2025-01-06T09:00:00.000Z",
                "end_date": "2025-01-20T17:00:00.000Z",
                "goal": "Ship it"
            }),
            &request,
        )
        .await
        .expect("create_sprint failed");
    assert_eq!(created["message"], "Sprint created successfully");
    assert_eq!(created["sprint"]["name"], "Sprint 2");

    let updated = dispatcher
        .call_tool("update_sprint", json!({"sprint_id": "11", "state": "closed"}), &request)
        .await
        .expect("update_sprint failed");
    assert_eq!(updated["message"], "Sprint updated successfully");
    assert_eq!(updated["sprint"]["state"], "closed");

    let issues = dispatcher
        .call_tool("get_sprint_issues", json!({"sprint_id": "11"}), &request)
        .await
        .expect("get_sprint_issues failed");
    assert_eq!(issues["total"], 1);

    let err = dispatcher
        .call_tool("update_sprint", json!({"sprint_id": "11", "state": "done"}), &request)
        .await
        .unwrap_err();
    assert_matches!(err.source, JiraMcpError::InvalidParameter { ref parameter, .. } if parameter == "state");

    let calls = fetcher.calls();
    assert_eq!(calls.len(), 4);
    assert_eq!(
        calls[1],
        FetcherCall::CreateSprint(CreateSprintRequest {
            board_id: "1000".to_string(),
            sprint_name: "Sprint 2".to_string(),
            start_date: "2025-01-06T09:00:00.000Z".to_string(),
            end_date: "2025-01-20T17:00:00.000Z".to_string(),
            goal: Some("Ship it".to_string()),
        })
    );
}

#[tokio::test]
async fn test_issue_links_and_epics() {
    let fetcher = Arc::new(InMemoryFetcher::default());
    let (dispatcher, request) = dispatcher_with(fetcher.clone());

    let link = dispatcher
        .call_tool(
            "create_issue_link",
            json!({
                "link_type": "Blocks",
                "inward_issue_key": "PROJ-1",
                "outward_issue_key": "PROJ-2",
                "comment": "Blocked until the API lands",
                "comment_visibility": "{\"type\": \"group\", \"value\": \"jira-users\"}"
            }),
            &request,
        )
        .await
        .expect("create_issue_link failed");
    assert_eq!(link["success"], true);

    let removed = dispatcher
        .call_tool("remove_issue_link", json!({"link_id": "10001"}), &request)
        .await
        .expect("remove_issue_link failed");
    assert_eq!(removed["link_id"], "10001");

    let epic = dispatcher
        .call_tool(
            "link_to_epic",
            json!({"issue_key": "PROJ-1", "epic_key": "PROJ-100"}),
            &request,
        )
        .await
        .expect("link_to_epic failed");
    assert_eq!(
        epic["message"],
        "Issue PROJ-1 has been linked to epic PROJ-100."
    );
    assert_eq!(epic["issue"]["parent_key"], "PROJ-100");

    let mut visibility = Map::new();
    visibility.insert("type".to_string(), json!("group"));
    visibility.insert("value".to_string(), json!("jira-users"));
    assert_eq!(
        fetcher.calls()[0],
        FetcherCall::CreateIssueLink(IssueLinkRequest {
            link_type: "Blocks".to_string(),
            inward_issue_key: "PROJ-1".to_string(),
            outward_issue_key: "PROJ-2".to_string(),
            comment: Some("Blocked until the API lands".to_string()),
            comment_visibility: Some(visibility),
        })
    );
}

#[tokio::test]
async fn test_transitions() {
    let fetcher = Arc::new(InMemoryFetcher::default());
    let (dispatcher, request) = dispatcher_with(fetcher.clone());

    let transitions = dispatcher
        .call_tool("get_transitions", json!({"issue_key": "PROJ-1"}), &request)
        .await
        .expect("get_transitions failed");
    assert_eq!(transitions[0]["id"], "11");

    let result = dispatcher
        .call_tool(
            "transition_issue",
            json!({
                "issue_key": "PROJ-1",
                "transition_id": "11",
                "fields": {"resolution": {"name": "Fixed"}},
                "comment": "  "
            }),
            &request,
        )
        .await
        .expect("transition_issue failed");
    assert_eq!(result["message"], "Issue PROJ-1 transitioned successfully");
    assert_eq!(result["issue"]["status"], "In Progress");

    let mut fields = Map::new();
    fields.insert("resolution".to_string(), json!({"name": "Fixed"}));
    assert_eq!(
        fetcher.calls()[1],
        FetcherCall::TransitionIssue(TransitionRequest {
            issue_key: "PROJ-1".to_string(),
            transition_id: "11".to_string(),
            fields: Some(fields),
            comment: None,
        })
    );
}

#[tokio::test]
async fn test_worklogs() {
    let fetcher = Arc::new(InMemoryFetcher::default());
    let (dispatcher, request) = dispatcher_with(fetcher.clone());

    let worklogs = dispatcher
        .call_tool("get_worklog", json!({"issue_key": "PROJ-1"}), &request)
        .await
        .expect("get_worklog failed");
    assert_eq!(worklogs["worklogs"][0]["time_spent"], "1h");

    let added = dispatcher
        .call_tool(
            "add_worklog",
            json!({"issue_key": "PROJ-1", "time_spent": "1h 30m", "comment": "Code review"}),
            &request,
        )
        .await
        .expect("add_worklog failed");
    assert_eq!(added["message"], "Worklog added successfully");
    assert_eq!(added["worklog"]["time_spent"], "1h 30m");

    assert_eq!(
        fetcher.calls()[1],
        FetcherCall::AddWorklog(WorklogRequest {
            issue_key: "PROJ-1".to_string(),
            time_spent: "1h 30m".to_string(),
            comment: Some("Code review".to_string()),
            started: None,
            original_estimate: None,
            remaining_estimate: None,
        })
    );
}

#[tokio::test]
async fn test_download_attachments() {
    let fetcher = Arc::new(InMemoryFetcher::default());
    let (dispatcher, request) = dispatcher_with(fetcher.clone());
    let target = tempfile::tempdir().expect("Failed to create temp dir");
    let target_dir = target.path().to_string_lossy().to_string();

    let report = dispatcher
        .call_tool(
            "download_attachments",
            json!({"issue_key": "PROJ-1", "target_dir": target_dir}),
            &request,
        )
        .await
        .expect("download_attachments failed");
    assert_eq!(report["success"], true);
    assert_eq!(report["issue_key"], "PROJ-1");

    assert_eq!(
        fetcher.calls(),
        vec![FetcherCall::DownloadAttachments {
            issue_key: "PROJ-1".to_string(),
            target_dir,
        }]
    );

    let err = dispatcher
        .call_tool(
            "download_attachments",
            json!({"issue_key": "PROJ-1", "target_dir": ""}),
            &request,
        )
        .await
        .unwrap_err();
    assert_matches!(err.source, JiraMcpError::InvalidParameter { .. });
}
