//! IAM token endpoint, so API-key authentication can be exercised end to end.

use std::collections::HashMap;

use axum::{extract::State, http::StatusCode, Form, Json};
use serde_json::{json, Value};

use super::{ApiError, SharedState};

const APIKEY_GRANT: &str = "urn:ibm:params:oauth:grant-type:apikey";
const TOKEN_LIFETIME_SECS: i64 = 3600;

/// POST /identity/token
///
/// Any non-empty API key is accepted. The issued token is the server's
/// required token when one is configured.
pub async fn issue_iam_token(
    State(state): State<SharedState>,
    Form(form): Form<HashMap<String, String>>,
) -> Result<Json<Value>, ApiError> {
    if form.get("grant_type").map(String::as_str) != Some(APIKEY_GRANT) {
        return Err(ApiError::bad_request("unsupported grant_type"));
    }
    if form.get("apikey").map_or(true, |k| k.is_empty()) {
        return Err(ApiError::new(
            StatusCode::BAD_REQUEST,
            "BXNIM0415E",
            "Provided API key could not be found",
        ));
    }

    let access_token = state
        .read()
        .await
        .required_token
        .clone()
        .unwrap_or_else(|| "mock-iam-token".to_string());
    let now = chrono::Utc::now().timestamp();
    Ok(Json(json!({
        "access_token": access_token,
        "refresh_token": "not_supported",
        "token_type": "Bearer",
        "expires_in": TOKEN_LIFETIME_SECS,
        "expiration": now + TOKEN_LIFETIME_SECS,
    })))
}
