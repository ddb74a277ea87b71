//! Jira domain models
//!
//! Each model is parsed from the Jira REST payload with `from_api_response`
//! and serializes to its simplified, consumer-facing projection: only the
//! fields meaningful to a language model, with absent values omitted.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Read a string at `pointer` (RFC 6901) from a JSON value
fn str_at(value: &Value, pointer: &str) -> Option<String> {
    value.pointer(pointer).and_then(|v| match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

fn bool_at(value: &Value, pointer: &str) -> bool {
    value
        .pointer(pointer)
        .and_then(Value::as_bool)
        .unwrap_or(false)
}

fn u64_at(value: &Value, pointer: &str) -> Option<u64> {
    value.pointer(pointer).and_then(|v| match v {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    })
}

fn names_at(value: &Value, pointer: &str) -> Vec<String> {
    value
        .pointer(pointer)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| match item {
                    Value::String(s) => Some(s.clone()),
                    other => str_at(other, "/name"),
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Flatten rich text into plain text.
///
/// Jira Cloud returns descriptions and comments as Atlassian Document Format
/// trees; Server returns plain strings.
pub fn text_content(value: &Value) -> Option<String> {
    fn collect(node: &Value, out: &mut String) {
        if let Some(text) = node.get("text").and_then(Value::as_str) {
            out.push_str(text);
        }
        if node.get("type").and_then(Value::as_str) == Some("hardBreak") {
            out.push('\n');
        }
        if let Some(children) = node.get("content").and_then(Value::as_array) {
            for child in children {
                collect(child, out);
            }
            if matches!(
                node.get("type").and_then(Value::as_str),
                Some("paragraph") | Some("heading") | Some("listItem") | Some("codeBlock")
            ) {
                out.push('\n');
            }
        }
    }

    match value {
        Value::String(s) => Some(s.clone()),
        Value::Object(_) => {
            let mut out = String::new();
            collect(value, &mut out);
            let trimmed = out.trim_end().to_string();
            Some(trimmed).filter(|s| !s.is_empty())
        }
        _ => None,
    }
}

/// A Jira user
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JiraUser {
    pub display_name: String,
    /// Username on Server/Data Center, display name on Cloud
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    pub active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<String>,
}

impl JiraUser {
    pub fn from_api_response(value: &Value) -> Self {
        let display_name = str_at(value, "/displayName").unwrap_or_else(|| "Unassigned".into());
        Self {
            name: str_at(value, "/name").unwrap_or_else(|| display_name.clone()),
            display_name,
            email: str_at(value, "/emailAddress"),
            account_id: str_at(value, "/accountId"),
            avatar_url: str_at(value, "/avatarUrls/48x48"),
            active: value
                .get("active")
                .and_then(Value::as_bool)
                .unwrap_or(true),
            time_zone: str_at(value, "/timeZone"),
        }
    }
}

/// An issue comment
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JiraComment {
    pub id: String,
    pub body: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated: Option<String>,
}

impl JiraComment {
    pub fn from_api_response(value: &Value) -> Self {
        Self {
            id: str_at(value, "/id").unwrap_or_default(),
            body: value.get("body").and_then(text_content).unwrap_or_default(),
            author: str_at(value, "/author/displayName"),
            created: str_at(value, "/created"),
            updated: str_at(value, "/updated"),
        }
    }
}

/// A Jira issue
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JiraIssue {
    pub id: String,
    pub key: String,
    pub summary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issue_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignee: Option<JiraUser>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reporter: Option<JiraUser>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub labels: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub components: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub fix_versions: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub comments: Vec<JiraComment>,
    /// Requested fields without a dedicated attribute (custom fields, etc.)
    #[serde(flatten)]
    pub extra_fields: Map<String, Value>,
}

/// Issue fields that are mapped onto dedicated attributes
const KNOWN_ISSUE_FIELDS: &[&str] = &[
    "summary",
    "description",
    "status",
    "issuetype",
    "priority",
    "assignee",
    "reporter",
    "project",
    "parent",
    "created",
    "updated",
    "labels",
    "components",
    "fixVersions",
    "comment",
];

impl JiraIssue {
    /// Parse an issue payload; `comment_limit` caps the embedded comments
    pub fn from_api_response(value: &Value, base_url: &str, comment_limit: usize) -> Self {
        let fields = value.get("fields").cloned().unwrap_or(Value::Null);
        let key = str_at(value, "/key").unwrap_or_default();

        let comments = fields
            .pointer("/comment/comments")
            .and_then(Value::as_array)
            .map(|items| {
                let skip = items.len().saturating_sub(comment_limit);
                items
                    .iter()
                    .skip(skip)
                    .map(JiraComment::from_api_response)
                    .collect()
            })
            .unwrap_or_default();

        let extra_fields = fields
            .as_object()
            .map(|object| {
                object
                    .iter()
                    .filter(|(name, v)| !KNOWN_ISSUE_FIELDS.contains(&name.as_str()) && !v.is_null())
                    .map(|(name, v)| (name.clone(), v.clone()))
                    .collect()
            })
            .unwrap_or_default();

        Self {
            id: str_at(value, "/id").unwrap_or_default(),
            url: (!key.is_empty() && !base_url.is_empty())
                .then(|| format!("{}/browse/{}", base_url.trim_end_matches('/'), key)),
            key,
            summary: str_at(&fields, "/summary").unwrap_or_default(),
            description: fields.get("description").and_then(text_content),
            status: str_at(&fields, "/status/name"),
            issue_type: str_at(&fields, "/issuetype/name"),
            priority: str_at(&fields, "/priority/name"),
            assignee: fields
                .get("assignee")
                .filter(|v| v.is_object())
                .map(JiraUser::from_api_response),
            reporter: fields
                .get("reporter")
                .filter(|v| v.is_object())
                .map(JiraUser::from_api_response),
            project_key: str_at(&fields, "/project/key"),
            parent_key: str_at(&fields, "/parent/key"),
            created: str_at(&fields, "/created"),
            updated: str_at(&fields, "/updated"),
            labels: names_at(&fields, "/labels"),
            components: names_at(&fields, "/components"),
            fix_versions: names_at(&fields, "/fixVersions"),
            comments,
            extra_fields,
        }
    }
}

/// One page of search results
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JiraSearchResult {
    pub total: u64,
    pub start_at: u64,
    pub max_results: u64,
    pub issues: Vec<JiraIssue>,
}

impl JiraSearchResult {
    pub fn from_api_response(value: &Value, base_url: &str) -> Self {
        let issues: Vec<JiraIssue> = value
            .get("issues")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .map(|issue| JiraIssue::from_api_response(issue, base_url, 0))
                    .collect()
            })
            .unwrap_or_default();

        Self {
            total: u64_at(value, "/total").unwrap_or(issues.len() as u64),
            start_at: u64_at(value, "/startAt").unwrap_or(0),
            max_results: u64_at(value, "/maxResults").unwrap_or(issues.len() as u64),
            issues,
        }
    }
}

/// A Jira project
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JiraProject {
    pub id: String,
    pub key: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lead: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub archived: bool,
}

impl JiraProject {
    pub fn from_api_response(value: &Value) -> Self {
        Self {
            id: str_at(value, "/id").unwrap_or_default(),
            key: str_at(value, "/key").unwrap_or_default(),
            name: str_at(value, "/name").unwrap_or_default(),
            description: str_at(value, "/description").filter(|d| !d.is_empty()),
            lead: str_at(value, "/lead/displayName"),
            project_type: str_at(value, "/projectTypeKey"),
            category: str_at(value, "/projectCategory/name"),
            archived: bool_at(value, "/archived"),
        }
    }
}

/// A fix version of a project
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JiraVersion {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub release_date: Option<String>,
    pub released: bool,
    pub archived: bool,
}

impl JiraVersion {
    pub fn from_api_response(value: &Value) -> Self {
        Self {
            id: str_at(value, "/id").unwrap_or_default(),
            name: str_at(value, "/name").unwrap_or_default(),
            description: str_at(value, "/description"),
            start_date: str_at(value, "/startDate"),
            release_date: str_at(value, "/releaseDate"),
            released: bool_at(value, "/released"),
            archived: bool_at(value, "/archived"),
        }
    }
}

/// A workflow transition available on an issue
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JiraTransition {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to_status: Option<String>,
}

impl JiraTransition {
    pub fn from_api_response(value: &Value) -> Self {
        Self {
            id: str_at(value, "/id").unwrap_or_default(),
            name: str_at(value, "/name").unwrap_or_default(),
            to_status: str_at(value, "/to/name"),
        }
    }
}

/// A worklog entry
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JiraWorklog {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_spent: Option<String>,
    pub time_spent_seconds: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated: Option<String>,
}

impl JiraWorklog {
    pub fn from_api_response(value: &Value) -> Self {
        Self {
            id: str_at(value, "/id").unwrap_or_default(),
            author: str_at(value, "/author/displayName"),
            comment: value.get("comment").and_then(text_content),
            started: str_at(value, "/started"),
            time_spent: str_at(value, "/timeSpent"),
            time_spent_seconds: u64_at(value, "/timeSpentSeconds").unwrap_or(0),
            created: str_at(value, "/created"),
            updated: str_at(value, "/updated"),
        }
    }
}

/// An agile board
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JiraBoard {
    pub id: u64,
    pub name: String,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub board_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_key: Option<String>,
}

impl JiraBoard {
    pub fn from_api_response(value: &Value) -> Self {
        Self {
            id: u64_at(value, "/id").unwrap_or(0),
            name: str_at(value, "/name").unwrap_or_default(),
            board_type: str_at(value, "/type"),
            project_key: str_at(value, "/location/projectKey"),
        }
    }
}

/// A sprint on an agile board
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JiraSprint {
    pub id: u64,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub complete_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub goal: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub board_id: Option<u64>,
}

impl JiraSprint {
    pub fn from_api_response(value: &Value) -> Self {
        Self {
            id: u64_at(value, "/id").unwrap_or(0),
            name: str_at(value, "/name").unwrap_or_default(),
            state: str_at(value, "/state"),
            start_date: str_at(value, "/startDate"),
            end_date: str_at(value, "/endDate"),
            complete_date: str_at(value, "/completeDate"),
            goal: str_at(value, "/goal").filter(|g| !g.is_empty()),
            board_id: u64_at(value, "/originBoardId"),
        }
    }
}

/// A type of link between issues
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JiraIssueLinkType {
    pub id: String,
    pub name: String,
    pub inward: String,
    pub outward: String,
}

impl JiraIssueLinkType {
    pub fn from_api_response(value: &Value) -> Self {
        Self {
            id: str_at(value, "/id").unwrap_or_default(),
            name: str_at(value, "/name").unwrap_or_default(),
            inward: str_at(value, "/inward").unwrap_or_default(),
            outward: str_at(value, "/outward").unwrap_or_default(),
        }
    }
}

/// A field definition (system or custom)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JiraField {
    pub id: String,
    pub name: String,
    pub custom: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema_type: Option<String>,
}

impl JiraField {
    pub fn from_api_response(value: &Value) -> Self {
        Self {
            id: str_at(value, "/id").unwrap_or_default(),
            name: str_at(value, "/name").unwrap_or_default(),
            custom: bool_at(value, "/custom"),
            schema_type: str_at(value, "/schema/type"),
        }
    }
}

/// A single field change inside a changelog history entry
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JiraChangeItem {
    pub field: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from_string: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to_string: Option<String>,
}

/// One changelog history entry
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JiraChangeHistory {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created: Option<String>,
    pub items: Vec<JiraChangeItem>,
}

impl JiraChangeHistory {
    pub fn from_api_response(value: &Value) -> Self {
        Self {
            id: str_at(value, "/id").unwrap_or_default(),
            author: str_at(value, "/author/displayName"),
            created: str_at(value, "/created"),
            items: value
                .get("items")
                .and_then(Value::as_array)
                .map(|items| {
                    items
                        .iter()
                        .map(|item| JiraChangeItem {
                            field: str_at(item, "/field").unwrap_or_default(),
                            from_string: str_at(item, "/fromString"),
                            to_string: str_at(item, "/toString"),
                        })
                        .collect()
                })
                .unwrap_or_default(),
        }
    }
}

/// Changelog of one issue
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JiraChangelog {
    pub issue_id: String,
    pub histories: Vec<JiraChangeHistory>,
}

/// Outcome of creating or removing an issue link
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LinkOperationResult {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inward_issue: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outward_issue: Option<String>,
}

/// One attachment written to disk
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DownloadedAttachment {
    pub filename: String,
    pub path: String,
    pub size: u64,
}

/// One attachment that could not be downloaded
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FailedAttachment {
    pub filename: String,
    pub error: String,
}

/// Summary of downloading every attachment of an issue
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AttachmentDownloadReport {
    pub success: bool,
    pub issue_key: String,
    pub total: usize,
    pub downloaded: Vec<DownloadedAttachment>,
    pub failed: Vec<FailedAttachment>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_issue_from_api_response() {
        let payload = json!({
            "id": "10001",
            "key": "TEST-123",
            "fields": {
                "summary": "Test Issue Summary",
                "description": "Plain description",
                "status": {"name": "In Progress"},
                "issuetype": {"name": "Bug"},
                "priority": {"name": "High"},
                "assignee": {"displayName": "Jane Doe", "emailAddress": "jane@example.com", "accountId": "abc"},
                "project": {"key": "TEST", "name": "Test"},
                "labels": ["backend"],
                "components": [{"name": "API"}],
                "customfield_10010": 5,
                "comment": {"comments": [
                    {"id": "1", "body": "first"},
                    {"id": "2", "body": "second"},
                    {"id": "3", "body": "third"}
                ]}
            }
        });

        let issue = JiraIssue::from_api_response(&payload, "https://test.atlassian.net/", 2);
        assert_eq!(issue.key, "TEST-123");
        assert_eq!(issue.summary, "Test Issue Summary");
        assert_eq!(issue.status.as_deref(), Some("In Progress"));
        assert_eq!(issue.components, vec!["API"]);
        assert_eq!(
            issue.url.as_deref(),
            Some("https://test.atlassian.net/browse/TEST-123")
        );
        // Only the most recent comments are kept
        assert_eq!(issue.comments.len(), 2);
        assert_eq!(issue.comments[0].body, "second");

        let simplified = serde_json::to_value(&issue).unwrap();
        assert_eq!(simplified["key"], "TEST-123");
        assert_eq!(simplified["assignee"]["display_name"], "Jane Doe");
        assert_eq!(simplified["customfield_10010"], 5);
        assert!(simplified.get("parent_key").is_none());
    }

    #[test]
    fn test_adf_description_is_flattened() {
        let adf = json!({
            "type": "doc",
            "content": [
                {"type": "paragraph", "content": [{"type": "text", "text": "Hello"}]},
                {"type": "paragraph", "content": [{"type": "text", "text": "World"}]}
            ]
        });
        assert_eq!(text_content(&adf).as_deref(), Some("Hello\nWorld"));
        assert_eq!(text_content(&Value::Null), None);
    }

    #[test]
    fn test_search_result_pagination() {
        let payload = json!({
            "startAt": 0,
            "maxResults": 10,
            "total": 1,
            "issues": [{"id": "1", "key": "PROJ-123", "fields": {"summary": "x"}}]
        });
        let page = JiraSearchResult::from_api_response(&payload, "");
        assert_eq!(page.total, 1);
        assert_eq!(page.max_results, 10);
        assert_eq!(page.issues[0].key, "PROJ-123");
        assert!(page.issues[0].url.is_none());
    }

    #[test]
    fn test_version_and_project_projection() {
        let version = JiraVersion::from_api_response(&json!({
            "id": "101",
            "name": "v2.0",
            "startDate": "2025-01-01",
            "releaseDate": "2025-02-01",
            "released": false
        }));
        let simplified = serde_json::to_value(&version).unwrap();
        assert_eq!(simplified["start_date"], "2025-01-01");
        assert!(simplified.get("description").is_none());

        let project = JiraProject::from_api_response(&json!({
            "id": "10000",
            "key": "PROJ1",
            "name": "Project One",
            "lead": {"displayName": "User One"},
            "projectTypeKey": "software"
        }));
        assert_eq!(project.lead.as_deref(), Some("User One"));
        assert!(!project.archived);
    }

    #[test]
    fn test_user_defaults() {
        let user = JiraUser::from_api_response(&json!({
            "displayName": "Test User",
            "emailAddress": "test.profile@example.com",
            "avatarUrls": {"48x48": "https://avatar"}
        }));
        assert_eq!(user.name, "Test User");
        assert!(user.active);
        assert_eq!(user.avatar_url.as_deref(), Some("https://avatar"));
    }
}
