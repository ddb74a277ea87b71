/// Integration tests for the issue tools
mod common;

use assert_matches::assert_matches;
use common::dispatcher_with;
use jira_mcp_gateway::error::JiraMcpError;
use jira_mcp_gateway::fetcher::{CreateIssueRequest, GetIssueRequest};
use jira_mcp_gateway::test_support::{FetcherCall, InMemoryFetcher};
use serde_json::{json, Map};
use std::sync::Arc;

#[tokio::test]
async fn test_get_issue_applies_defaults() {
    let fetcher = Arc::new(InMemoryFetcher::default());
    let (dispatcher, request) = dispatcher_with(fetcher.clone());

    let result = dispatcher
        .call_tool(
            "get_issue",
            json!({"issue_key": "TEST-123", "fields": "summary,description,status"}),
            &request,
        )
        .await
        .expect("get_issue failed");

    assert_eq!(result["key"], "TEST-123");
    assert_eq!(result["summary"], "Test Issue Summary");
    assert_eq!(
        fetcher.calls(),
        vec![FetcherCall::GetIssue(GetIssueRequest {
            issue_key: "TEST-123".to_string(),
            fields: Some(vec![
                "summary".to_string(),
                "description".to_string(),
                "status".to_string(),
            ]),
            expand: None,
            comment_limit: 10,
            properties: None,
            update_history: true,
        })]
    );
}

#[tokio::test]
async fn test_blank_issue_key_never_reaches_jira() {
    let fetcher = Arc::new(InMemoryFetcher::default());
    let (dispatcher, request) = dispatcher_with(fetcher.clone());

    for tool in ["get_issue", "delete_issue", "get_transitions", "get_worklog"] {
        let err = dispatcher
            .call_tool(tool, json!({"issue_key": "   "}), &request)
            .await
            .unwrap_err();
        assert_eq!(err.tool, tool);
        assert_matches!(err.source, JiraMcpError::InvalidParameter { ref parameter, .. } if parameter == "issue_key");
    }
    assert_eq!(fetcher.call_count(), 0);
}

#[tokio::test]
async fn test_blank_project_key_never_reaches_jira() {
    let fetcher = Arc::new(InMemoryFetcher::default());
    let (dispatcher, request) = dispatcher_with(fetcher.clone());

    let calls = [
        (
            "create_issue",
            json!({"project_key": "  ", "summary": "New Issue", "issue_type": "Task"}),
        ),
        ("get_project_versions", json!({"project_key": "  "})),
        ("get_project_issues", json!({"project_key": ""})),
        ("create_version", json!({"project_key": "  ", "name": "v1.0"})),
        (
            "batch_create_versions",
            json!({"project_key": " ", "versions": [{"name": "v1.0"}]}),
        ),
    ];

    for (tool, arguments) in calls {
        let err = dispatcher
            .call_tool(tool, arguments, &request)
            .await
            .unwrap_err();
        assert_eq!(err.tool, tool);
        assert_matches!(
            err.source,
            JiraMcpError::InvalidParameter { ref parameter, .. } if parameter == "project_key",
            "{} accepted a blank project key",
            tool
        );
    }

    let err = dispatcher
        .call_tool(
            "batch_create_issues",
            json!({"issues": [
                {"project_key": "TEST", "summary": "Issue 1", "issue_type": "Task"},
                {"project_key": "  ", "summary": "Issue 2", "issue_type": "Task"}
            ]}),
            &request,
        )
        .await
        .unwrap_err();
    assert_matches!(err.source, JiraMcpError::InvalidParameter { ref message, .. } if message == "Item 1: project_key is required and cannot be empty");

    assert_eq!(fetcher.call_count(), 0);
}

#[tokio::test]
async fn test_create_issue_splits_components() {
    let fetcher = Arc::new(InMemoryFetcher::default());
    let (dispatcher, request) = dispatcher_with(fetcher.clone());

    let result = dispatcher
        .call_tool(
            "jira_create_issue",
            json!({
                "project_key": "TEST",
                "summary": "New Issue",
                "issue_type": "Task",
                "description": "This is a new task",
                "components": "Frontend, API",
                "additional_fields": {"customfield_10010": 1}
            }),
            &request,
        )
        .await
        .expect("create_issue failed");

    assert_eq!(result["message"], "Issue created successfully");
    assert_eq!(result["issue"]["key"], "TEST-456");
    assert_eq!(result["issue"]["components"], json!(["Frontend", "API"]));
    assert_eq!(result["issue"]["customfield_10010"], 1);

    let mut additional_fields = Map::new();
    additional_fields.insert("customfield_10010".to_string(), json!(1));
    assert_eq!(
        fetcher.calls(),
        vec![FetcherCall::CreateIssue(CreateIssueRequest {
            project_key: "TEST".to_string(),
            summary: "New Issue".to_string(),
            issue_type: "Task".to_string(),
            description: Some("This is a new task".to_string()),
            assignee: None,
            components: Some(vec!["Frontend".to_string(), "API".to_string()]),
            additional_fields,
        })]
    );
}

#[tokio::test]
async fn test_additional_fields_as_json_string() {
    let fetcher = Arc::new(InMemoryFetcher::default());
    let (dispatcher, request) = dispatcher_with(fetcher.clone());

    let result = dispatcher
        .call_tool(
            "create_issue",
            json!({
                "project_key": "TEST",
                "summary": "New Issue",
                "issue_type": "Bug",
                "additional_fields": "{\"priority\": {\"name\": \"High\"}}"
            }),
            &request,
        )
        .await
        .expect("create_issue failed");
    assert_eq!(result["issue"]["priority"], json!({"name": "High"}));

    let err = dispatcher
        .call_tool(
            "create_issue",
            json!({
                "project_key": "TEST",
                "summary": "New Issue",
                "issue_type": "Bug",
                "additional_fields": "{not json"
            }),
            &request,
        )
        .await
        .unwrap_err();
    assert_matches!(err.source, JiraMcpError::InvalidParameter { .. });
    assert_eq!(fetcher.call_count(), 1);
}

#[test]
fn test_batch_create_issues_list_and_json_string_match() {
    let issues = json!([
        {"project_key": "TEST", "summary": "Issue 1", "issue_type": "Task"},
        {"project_key": "TEST", "summary": "Issue 2", "issue_type": "Bug", "components": ["API"]}
    ]);

    let run = |arguments| {
        tokio_test::block_on(async {
            let fetcher = Arc::new(InMemoryFetcher::default());
            let (dispatcher, request) = dispatcher_with(fetcher.clone());
            let result = dispatcher
                .call_tool("batch_create_issues", arguments, &request)
                .await
                .expect("batch_create_issues failed");
            (result, fetcher.calls())
        })
    };

    let (from_list, list_calls) = run(json!({"issues": issues.clone()}));
    let (from_string, string_calls) = run(json!({"issues": issues.to_string()}));

    assert_eq!(from_list, from_string);
    assert_eq!(list_calls, string_calls);
    assert_eq!(from_list["message"], "Issues created successfully");
    assert_eq!(from_list["issues"][0]["key"], "TEST-1");
    assert_eq!(from_list["issues"][1]["key"], "TEST-2");
}

#[tokio::test]
async fn test_batch_create_issues_accepts_comma_separated_components() {
    let fetcher = Arc::new(InMemoryFetcher::default());
    let (dispatcher, request) = dispatcher_with(fetcher.clone());

    dispatcher
        .call_tool(
            "batch_create_issues",
            json!({"issues": [{
                "project_key": "TEST",
                "summary": "Issue 1",
                "issue_type": "Task",
                "components": "Frontend, API",
                "priority": {"name": "High"}
            }]}),
            &request,
        )
        .await
        .expect("batch_create_issues failed");

    let mut additional_fields = Map::new();
    additional_fields.insert("priority".to_string(), json!({"name": "High"}));
    assert_eq!(
        fetcher.calls(),
        vec![FetcherCall::BatchCreateIssues {
            issues: vec![CreateIssueRequest {
                project_key: "TEST".to_string(),
                summary: "Issue 1".to_string(),
                issue_type: "Task".to_string(),
                components: Some(vec!["Frontend".to_string(), "API".to_string()]),
                additional_fields,
                ..Default::default()
            }],
            validate_only: false,
        }]
    );
}

#[tokio::test]
async fn test_batch_create_issues_validate_only() {
    let fetcher = Arc::new(InMemoryFetcher::default());
    let (dispatcher, request) = dispatcher_with(fetcher.clone());

    let result = dispatcher
        .call_tool(
            "batch_create_issues",
            json!({
                "issues": [{"project_key": "TEST", "summary": "Issue 1", "issue_type": "Task"}],
                "validate_only": true
            }),
            &request,
        )
        .await
        .expect("batch_create_issues failed");

    assert_eq!(result["message"], "Issues validated successfully");
    assert_matches!(
        fetcher.calls().as_slice(),
        [FetcherCall::BatchCreateIssues { validate_only: true, .. }]
    );
}

#[tokio::test]
async fn test_batch_create_issues_invalid_json() {
    let fetcher = Arc::new(InMemoryFetcher::default());
    let (dispatcher, request) = dispatcher_with(fetcher.clone());

    let err = dispatcher
        .call_tool("batch_create_issues", json!({"issues": "not a json"}), &request)
        .await
        .unwrap_err();

    assert!(err
        .to_string()
        .starts_with("Error calling tool 'batch_create_issues'"));
    assert_matches!(err.source, JiraMcpError::InvalidParameter { .. });
    assert_eq!(fetcher.call_count(), 0);
}

#[tokio::test]
async fn test_batch_get_changelogs() {
    let fetcher = Arc::new(InMemoryFetcher::default());
    let (dispatcher, request) = dispatcher_with(fetcher.clone());

    let result = dispatcher
        .call_tool(
            "batch_get_changelogs",
            json!({"issue_ids_or_keys": "[\"PROJ-1\", \"PROJ-2\"]", "fields": ["status"], "limit": -1}),
            &request,
        )
        .await
        .expect("batch_get_changelogs failed");

    assert_eq!(result.as_array().map(Vec::len), Some(2));
    assert_eq!(result[0]["issue_id"], "PROJ-1");
    assert_eq!(
        fetcher.calls(),
        vec![FetcherCall::BatchGetChangelogs {
            issue_ids_or_keys: vec!["PROJ-1".to_string(), "PROJ-2".to_string()],
            fields: Some(vec!["status".to_string()]),
            limit: None,
        }]
    );
}

#[tokio::test]
async fn test_update_delete_and_comment() {
    let fetcher = Arc::new(InMemoryFetcher::default());
    let (dispatcher, request) = dispatcher_with(fetcher.clone());

    let updated = dispatcher
        .call_tool(
            "update_issue",
            json!({"issue_key": "TEST-1", "fields": "{\"summary\": \"Renamed\"}"}),
            &request,
        )
        .await
        .expect("update_issue failed");
    assert_eq!(updated["message"], "Issue updated successfully");
    assert_eq!(updated["issue"]["summary"], "Renamed");

    let deleted = dispatcher
        .call_tool("delete_issue", json!({"issue_key": "TEST-1"}), &request)
        .await
        .expect("delete_issue failed");
    assert_eq!(
        deleted,
        json!({"message": "Issue TEST-1 has been deleted successfully."})
    );

    let commented = dispatcher
        .call_tool(
            "add_comment",
            json!({"issue_key": "TEST-1", "comment": "Looks good"}),
            &request,
        )
        .await
        .expect("add_comment failed");
    assert_eq!(commented["message"], "Comment added successfully");
    assert_eq!(commented["comment"]["body"], "Looks good");

    let err = dispatcher
        .call_tool("update_issue", json!({"issue_key": "TEST-1", "fields": {}}), &request)
        .await
        .unwrap_err();
    assert_matches!(err.source, JiraMcpError::InvalidParameter { .. });
    assert_eq!(fetcher.call_count(), 3);
}

#[tokio::test]
async fn test_fetcher_errors_name_the_tool() {
    let fetcher = Arc::new(
        InMemoryFetcher::default().fail_on("get_issue", || JiraMcpError::not_found("issue", "TEST-9")),
    );
    let (dispatcher, request) = dispatcher_with(fetcher);

    let err = dispatcher
        .call_tool("get_issue", json!({"issue_key": "TEST-9"}), &request)
        .await
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "Error calling tool 'get_issue': Issue 'TEST-9' not found"
    );
    assert_eq!(err.error_code(), err.source.error_code());
}

#[tokio::test]
async fn test_unknown_and_malformed_calls() {
    let fetcher = Arc::new(InMemoryFetcher::default());
    let (dispatcher, request) = dispatcher_with(fetcher.clone());

    let err = dispatcher
        .call_tool("jira_no_such_tool", json!({}), &request)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("Unknown tool"));

    let err = dispatcher
        .call_tool("get_issue", json!({"issue_key": 42}), &request)
        .await
        .unwrap_err();
    assert_matches!(err.source, JiraMcpError::InvalidParameter { .. });

    let err = dispatcher
        .call_tool("get_issue", json!({"issue_key": "TEST-1", "bogus": true}), &request)
        .await
        .unwrap_err();
    assert_matches!(err.source, JiraMcpError::InvalidParameter { .. });

    let result = dispatcher
        .call_tool("jira_get_link_types", serde_json::Value::Null, &request)
        .await
        .expect("get_link_types failed");
    assert_eq!(result[0]["name"], "Blocks");
    assert_eq!(fetcher.call_count(), 1);
}
