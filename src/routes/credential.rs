use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use garde::Validate;

use crate::app_state::AppState;
use crate::models::video::CredentialUpdate;
use crate::routes::error::ApiError;

/// PUT /api/v1/credential — swap the API key used by in-flight and future jobs.
pub async fn rotate_credential(
    State(state): State<AppState>,
    Json(update): Json<CredentialUpdate>,
) -> Result<StatusCode, ApiError> {
    update.validate()?;
    let api_key = update.api_key.trim();
    if api_key.is_empty() {
        return Err(ApiError::BadRequest("api_key must not be blank".to_string()));
    }
    state.credential.rotate(api_key);
    Ok(StatusCode::NO_CONTENT)
}
