//! Project tools: project listing, versions, version creation

use crate::context::RequestContext;
use crate::error::{ErrorEnvelope, JiraMcpResult};
use crate::fetcher::CreateVersionRequest;
use crate::models::JiraProject;
use crate::normalize::{require_non_blank, validate_date, ListOrJson, ProjectsFilter};
use crate::tools::{non_blank, to_json, with_message};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::{debug, instrument, warn};

/// Parameters for the get_all_projects tool
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct GetAllProjectsParams {
    /// Include archived projects (default: false)
    pub include_archived: Option<bool>,
}

/// Keep the projects allowed by `filter`, keys rendered uppercase
pub fn filter_projects(projects: Vec<JiraProject>, filter: &ProjectsFilter) -> Vec<JiraProject> {
    projects
        .into_iter()
        .filter(|project| filter.allows(&project.key))
        .map(|project| JiraProject {
            key: project.key.to_uppercase(),
            ..project
        })
        .collect()
}

/// List projects; failures are reported as an error envelope
#[instrument(skip(ctx))]
pub async fn get_all_projects(
    ctx: RequestContext,
    params: GetAllProjectsParams,
) -> JiraMcpResult<Value> {
    let include_archived = params.include_archived.unwrap_or(false);

    match ctx.fetcher.get_all_projects(include_archived).await {
        Ok(projects) => {
            let filter = ProjectsFilter::parse(ctx.fetcher.config().projects_filter.as_deref());
            let fetched = projects.len();
            let projects = filter_projects(projects, &filter);
            debug!("Returning {} of {} projects", projects.len(), fetched);
            to_json(&projects)
        }
        Err(e) => {
            warn!("get_all_projects failed: {}", e);
            e.into_envelope(Map::new()).map(ErrorEnvelope::into_value)
        }
    }
}

/// Parameters for the get_project_versions tool
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct GetProjectVersionsParams {
    /// The project key (e.g., "PROJ")
    pub project_key: String,
}

#[instrument(skip(ctx))]
pub async fn get_project_versions(
    ctx: RequestContext,
    params: GetProjectVersionsParams,
) -> JiraMcpResult<Value> {
    let project_key = require_non_blank("project_key", Some(params.project_key.as_str()))?;
    let versions = ctx.fetcher.get_project_versions(project_key).await?;
    to_json(&versions)
}

/// Parameters for the create_version tool
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct CreateVersionParams {
    /// The project key (e.g., "PROJ")
    pub project_key: String,

    /// Version name (e.g., "v1.2.0")
    pub name: String,

    /// Start date (YYYY-MM-DD)
    pub start_date: Option<String>,

    /// Release date (YYYY-MM-DD)
    pub release_date: Option<String>,

    /// Version description
    pub description: Option<String>,
}

fn version_request(
    project_key: &str,
    name: &str,
    start_date: Option<String>,
    release_date: Option<String>,
    description: Option<String>,
) -> JiraMcpResult<CreateVersionRequest> {
    let start_date = non_blank(start_date);
    let release_date = non_blank(release_date);
    if let Some(date) = &start_date {
        validate_date("start_date", date)?;
    }
    if let Some(date) = &release_date {
        validate_date("release_date", date)?;
    }

    Ok(CreateVersionRequest {
        project_key: project_key.to_string(),
        name: name.trim().to_string(),
        start_date,
        release_date,
        description: non_blank(description),
    })
}

#[instrument(skip(ctx))]
pub async fn create_version(ctx: RequestContext, params: CreateVersionParams) -> JiraMcpResult<Value> {
    ctx.ensure_writable("create version")?;
    let project_key = require_non_blank("project_key", Some(params.project_key.as_str()))?;
    let name = require_non_blank("name", Some(params.name.as_str()))?;

    let request = version_request(
        project_key,
        name,
        params.start_date,
        params.release_date,
        params.description,
    )?;
    let version = ctx.fetcher.create_project_version(request).await?;
    with_message("Version created successfully", "version", &version)
}

/// Parameters for the batch_create_versions tool
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct BatchCreateVersionsParams {
    /// The project key (e.g., "PROJ")
    pub project_key: String,

    /// Version specs ({"name", "startDate", "releaseDate", "description"}),
    /// as a list or a JSON array string
    pub versions: ListOrJson,
}

/// One `batch_create_versions` item as supplied by the caller
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VersionSpec {
    #[serde(default)]
    name: Option<String>,
    #[serde(default, alias = "start_date")]
    start_date: Option<String>,
    #[serde(default, alias = "release_date")]
    release_date: Option<String>,
    #[serde(default)]
    description: Option<String>,
}

/// Create several versions; each item succeeds or fails on its own
#[instrument(skip(ctx))]
pub async fn batch_create_versions(
    ctx: RequestContext,
    params: BatchCreateVersionsParams,
) -> JiraMcpResult<Value> {
    ctx.ensure_writable("batch create versions")?;
    let project_key = require_non_blank("project_key", Some(params.project_key.as_str()))?;
    let items = params.versions.into_values("versions")?;

    let mut results = Vec::with_capacity(items.len());
    for (index, item) in items.into_iter().enumerate() {
        let spec: VersionSpec = match serde_json::from_value(item.clone()) {
            Ok(spec) => spec,
            Err(e) => {
                results.push(json!({
                    "success": false,
                    "error": format!("Item {}: {}", index, e),
                    "input": item,
                }));
                continue;
            }
        };

        let Some(name) = non_blank(spec.name) else {
            results.push(json!({
                "success": false,
                "error": format!("Item {}: Missing name", index),
                "input": item,
            }));
            continue;
        };

        let outcome = match version_request(
            project_key,
            &name,
            spec.start_date,
            spec.release_date,
            spec.description,
        ) {
            Ok(request) => ctx.fetcher.create_project_version(request).await,
            Err(e) => Err(e),
        };

        match outcome {
            Ok(version) => results.push(json!({
                "success": true,
                "version": to_json(&version)?,
            })),
            Err(e) => {
                warn!("Version '{}' could not be created: {}", name, e);
                results.push(json!({
                    "success": false,
                    "error": e.to_string(),
                    "input": item,
                }));
            }
        }
    }

    Ok(Value::Array(results))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn project(key: &str) -> JiraProject {
        JiraProject {
            key: key.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_filter_projects_case_insensitive() {
        let filter = ProjectsFilter::parse(Some(" PROJ1 , proj2 "));
        let keys: Vec<String> = filter_projects(
            vec![project("proj1"), project("PROJ2"), project("other")],
            &filter,
        )
        .into_iter()
        .map(|p| p.key)
        .collect();
        assert_eq!(keys, vec!["PROJ1", "PROJ2"]);
    }

    #[test]
    fn test_no_filter_still_uppercases() {
        let keys: Vec<String> =
            filter_projects(vec![project("proj1"), project("Other")], &ProjectsFilter::default())
                .into_iter()
                .map(|p| p.key)
                .collect();
        assert_eq!(keys, vec!["PROJ1", "OTHER"]);
    }

    #[test]
    fn test_version_request_validates_dates() {
        assert!(version_request("TEST", "v1", Some("2025-13-01".into()), None, None).is_err());
        let request =
            version_request("TEST", " v1 ", Some("2025-01-01".into()), Some(" ".into()), None)
                .unwrap();
        assert_eq!(request.name, "v1");
        assert_eq!(request.release_date, None);
    }
}
