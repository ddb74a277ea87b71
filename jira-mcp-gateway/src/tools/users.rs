//! User profile tool

use crate::context::RequestContext;
use crate::error::{ErrorEnvelope, JiraMcpResult};
use crate::normalize::require_non_blank;
use crate::tools::to_json;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::{instrument, warn};

/// Parameters for the get_user_profile tool
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct GetUserProfileParams {
    /// Email, username, account id or key of the user
    pub user_identifier: String,
}

/// Context attached to every soft failure of get_user_profile
pub(crate) fn user_context(identifier: &str) -> Map<String, Value> {
    let mut context = Map::new();
    context.insert(
        "user_identifier".to_string(),
        Value::String(identifier.to_string()),
    );
    context
}

/// Look up a user; classified failures are reported as an error envelope
#[instrument(skip(ctx))]
pub async fn get_user_profile(
    ctx: RequestContext,
    params: GetUserProfileParams,
) -> JiraMcpResult<Value> {
    let lookup = match require_non_blank("user_identifier", Some(params.user_identifier.as_str())) {
        Ok(identifier) => ctx.fetcher.get_user_profile_by_identifier(identifier).await,
        Err(e) => Err(e),
    };

    match lookup {
        Ok(user) => Ok(json!({
            "success": true,
            "user": to_json(&user)?,
        })),
        Err(e) => {
            warn!("get_user_profile failed for '{}': {}", params.user_identifier, e);
            e.into_envelope(user_context(&params.user_identifier))
                .map(ErrorEnvelope::into_value)
        }
    }
}
