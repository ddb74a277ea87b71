/// Smoke tests for the STDIO server binary without a Jira instance
mod common;

use common::McpTestClient;
use serde_json::json;

#[test]
fn test_unconfigured_server_lists_tools() {
    let mut client = McpTestClient::unconfigured().expect("Failed to create test client");

    let response = client.list_tools().expect("Failed to list tools");
    assert!(response.get("error").is_none(), "tools/list failed: {}", response);

    let tools = response["result"]["tools"]
        .as_array()
        .expect("Tools is not an array");
    let names: Vec<&str> = tools
        .iter()
        .filter_map(|tool| tool["name"].as_str())
        .collect();

    for expected in ["jira_get_issue", "jira_search", "jira_batch_create_versions"] {
        assert!(names.contains(&expected), "{} missing from {:?}", expected, names);
    }
}

#[test]
fn test_unconfigured_server_reports_configuration_error() {
    let mut client = McpTestClient::unconfigured().expect("Failed to create test client");

    let response = client
        .call_tool("jira_get_all_projects", json!({}))
        .expect("Failed to call jira_get_all_projects");

    let text = McpTestClient::extract_tool_text(&response).expect("Failed to extract tool result");
    let result: serde_json::Value = serde_json::from_str(&text).expect("Result is not JSON");
    assert_eq!(result["success"], false);
    assert!(
        result["error"]
            .as_str()
            .unwrap_or_default()
            .contains("Configuration Error"),
        "unexpected result: {}",
        text
    );
}
