/// Integration tests for project, version and user profile tools
mod common;

use assert_matches::assert_matches;
use common::dispatcher_with;
use jira_mcp_gateway::error::JiraMcpError;
use jira_mcp_gateway::fetcher::CreateVersionRequest;
use jira_mcp_gateway::test_support::{FetcherCall, InMemoryFetcher, UNKNOWN_USER};
use serde_json::{json, Value};
use std::sync::Arc;

fn project_keys(result: &Value) -> Vec<&str> {
    result
        .as_array()
        .expect("projects is not an array")
        .iter()
        .filter_map(|project| project["key"].as_str())
        .collect()
}

#[tokio::test]
async fn test_get_all_projects_applies_projects_filter() {
    let fetcher = Arc::new(
        InMemoryFetcher::default()
            .with_projects_filter(Some(" proj1 , PROJ2 "))
            .with_projects(&[("PROJ1", "Project 1"), ("proj2", "Project 2"), ("OTHER", "Other")]),
    );
    let (dispatcher, request) = dispatcher_with(fetcher.clone());

    let result = dispatcher
        .call_tool("get_all_projects", json!({}), &request)
        .await
        .expect("get_all_projects failed");

    assert_eq!(project_keys(&result), vec!["PROJ1", "PROJ2"]);
    assert_eq!(
        fetcher.calls(),
        vec![FetcherCall::GetAllProjects {
            include_archived: false
        }]
    );
}

#[tokio::test]
async fn test_get_all_projects_without_filter() {
    let fetcher = Arc::new(
        InMemoryFetcher::default().with_projects(&[("proj1", "Project 1"), ("OTHER", "Other")]),
    );
    let (dispatcher, request) = dispatcher_with(fetcher.clone());

    let result = dispatcher
        .call_tool("get_all_projects", json!({"include_archived": true}), &request)
        .await
        .expect("get_all_projects failed");

    assert_eq!(project_keys(&result), vec!["PROJ1", "OTHER"]);
    assert_eq!(
        fetcher.calls(),
        vec![FetcherCall::GetAllProjects {
            include_archived: true
        }]
    );
}

#[tokio::test]
async fn test_get_all_projects_soft_failures() {
    let cases: Vec<(fn() -> JiraMcpError, &str)> = vec![
        (|| JiraMcpError::auth("401 Unauthorized"), "Authentication/Permission Error"),
        (|| JiraMcpError::permission("403 Forbidden"), "Authentication/Permission Error"),
        (|| JiraMcpError::config("bad url"), "Configuration Error"),
        (|| JiraMcpError::upstream("HTTP 500"), "API Error"),
        (|| JiraMcpError::not_found("project", "GONE"), "not found"),
    ];

    for (make_error, expected) in cases {
        let fetcher =
            Arc::new(InMemoryFetcher::default().fail_on("get_all_projects", make_error));
        let (dispatcher, request) = dispatcher_with(fetcher);

        let result = dispatcher
            .call_tool("get_all_projects", json!({}), &request)
            .await
            .expect("soft failures are not tool errors");
        assert_eq!(result["success"], false);
        let error = result["error"].as_str().expect("error is not a string");
        assert!(error.contains(expected), "{} does not contain {}", error, expected);
    }
}

#[tokio::test]
async fn test_get_all_projects_auth_failure_envelope() {
    let fetcher = Arc::new(
        InMemoryFetcher::default()
            .fail_on("get_all_projects", || JiraMcpError::auth("401 Unauthorized")),
    );
    let (dispatcher, request) = dispatcher_with(fetcher);

    let result = dispatcher
        .call_tool("get_all_projects", json!({}), &request)
        .await
        .expect("soft failures are not tool errors");
    assert_eq!(
        result,
        json!({
            "success": false,
            "error": "Authentication/Permission Error: 401 Unauthorized"
        })
    );
}

#[tokio::test]
async fn test_get_all_projects_unexpected_error_is_a_tool_error() {
    let fetcher = Arc::new(
        InMemoryFetcher::default().fail_on("get_all_projects", || JiraMcpError::internal("boom")),
    );
    let (dispatcher, request) = dispatcher_with(fetcher);

    let err = dispatcher
        .call_tool("get_all_projects", json!({}), &request)
        .await
        .unwrap_err();
    assert_eq!(err.tool, "get_all_projects");
    assert_matches!(err.source, JiraMcpError::Internal { .. });
}

#[tokio::test]
async fn test_project_versions() {
    let fetcher = Arc::new(InMemoryFetcher::default());
    let (dispatcher, request) = dispatcher_with(fetcher.clone());

    let result = dispatcher
        .call_tool("get_project_versions", json!({"project_key": "TEST"}), &request)
        .await
        .expect("get_project_versions failed");
    assert_eq!(result[0]["name"], "v1.0");
    assert_eq!(result[1]["name"], "v2.0");

    let created = dispatcher
        .call_tool(
            "create_version",
            json!({"project_key": "TEST", "name": "v3.0", "release_date": "2025-06-30"}),
            &request,
        )
        .await
        .expect("create_version failed");
    assert_eq!(created["message"], "Version created successfully");
    assert_eq!(created["version"]["name"], "v3.0");

    let err = dispatcher
        .call_tool(
            "create_version",
            json!({"project_key": "TEST", "name": "v4.0", "start_date": "30/06/2025"}),
            &request,
        )
        .await
        .unwrap_err();
    assert_matches!(err.source, JiraMcpError::InvalidParameter { .. });
    assert_eq!(fetcher.call_count(), 2);
}

#[tokio::test]
async fn test_batch_create_versions_isolates_failures() {
    let fetcher = Arc::new(InMemoryFetcher::default().fail_version("v2.0"));
    let (dispatcher, request) = dispatcher_with(fetcher.clone());

    let result = dispatcher
        .call_tool(
            "batch_create_versions",
            json!({
                "project_key": "TEST",
                "versions": [
                    {"name": "v1.0", "startDate": "2025-01-01", "releaseDate": "2025-02-01"},
                    {"description": "no name"},
                    {"name": "v2.0"},
                    {"name": "v3.0", "description": "Third"}
                ]
            }),
            &request,
        )
        .await
        .expect("batch_create_versions failed");

    let items = result.as_array().expect("result is not a list");
    assert_eq!(items.len(), 4);

    assert_eq!(items[0]["success"], true);
    assert_eq!(items[0]["version"]["name"], "v1.0");
    assert_eq!(items[0]["version"]["release_date"], "2025-02-01");

    assert_eq!(items[1]["success"], false);
    assert_eq!(items[1]["error"], "Item 1: Missing name");

    assert_eq!(items[2]["success"], false);
    assert!(items[2]["error"]
        .as_str()
        .unwrap()
        .contains("Simulated failure"));

    assert_eq!(items[3]["success"], true);
    assert_eq!(items[3]["version"]["name"], "v3.0");

    assert_eq!(
        fetcher.calls()[0],
        FetcherCall::CreateProjectVersion(CreateVersionRequest {
            project_key: "TEST".to_string(),
            name: "v1.0".to_string(),
            start_date: Some("2025-01-01".to_string()),
            release_date: Some("2025-02-01".to_string()),
            description: None,
        })
    );
    assert_eq!(fetcher.call_count(), 3);
}

#[tokio::test]
async fn test_batch_create_versions_edge_inputs() {
    let fetcher = Arc::new(InMemoryFetcher::default());
    let (dispatcher, request) = dispatcher_with(fetcher.clone());

    let empty = dispatcher
        .call_tool(
            "batch_create_versions",
            json!({"project_key": "TEST", "versions": "[]"}),
            &request,
        )
        .await
        .expect("batch_create_versions failed");
    assert_eq!(empty, json!([]));

    let err = dispatcher
        .call_tool(
            "batch_create_versions",
            json!({"project_key": "TEST", "versions": "{oops"}),
            &request,
        )
        .await
        .unwrap_err();
    assert!(err.to_string().contains("Error calling tool 'batch_create_versions'"));
    assert_eq!(fetcher.call_count(), 0);
}

#[tokio::test]
async fn test_get_user_profile() {
    let fetcher = Arc::new(InMemoryFetcher::default());
    let (dispatcher, request) = dispatcher_with(fetcher);

    let result = dispatcher
        .call_tool(
            "get_user_profile",
            json!({"user_identifier": "test.user@example.com"}),
            &request,
        )
        .await
        .expect("get_user_profile failed");

    assert_eq!(result["success"], true);
    assert_eq!(
        result["user"]["display_name"],
        "Test User (test.user@example.com)"
    );
    assert_eq!(result["user"]["email"], "test.user@example.com");
    assert_eq!(
        result["user"]["avatar_url"],
        "https://test.atlassian.net/avatar/test.user@example.com"
    );
}

#[tokio::test]
async fn test_get_user_profile_not_found() {
    let fetcher = Arc::new(InMemoryFetcher::default());
    let (dispatcher, request) = dispatcher_with(fetcher);

    let result = dispatcher
        .call_tool("get_user_profile", json!({"user_identifier": UNKNOWN_USER}), &request)
        .await
        .expect("not found is a soft failure");

    assert_eq!(result["success"], false);
    assert!(result["error"].as_str().unwrap().contains("not found"));
    assert_eq!(result["user_identifier"], UNKNOWN_USER);
}

#[tokio::test]
async fn test_get_user_profile_unexpected_error_is_a_tool_error() {
    let fetcher = Arc::new(
        InMemoryFetcher::default()
            .fail_on("get_user_profile_by_identifier", || JiraMcpError::internal("boom")),
    );
    let (dispatcher, request) = dispatcher_with(fetcher);

    let err = dispatcher
        .call_tool("get_user_profile", json!({"user_identifier": "someone"}), &request)
        .await
        .unwrap_err();
    assert_eq!(err.tool, "get_user_profile");
    assert_matches!(err.source, JiraMcpError::Internal { .. });
    assert!(err.to_string().contains("Unexpected error: boom"));
}
