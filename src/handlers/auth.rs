use crate::handlers::common::{success_response, validate_input};
use crate::{errors::ApiError, AppState};
use axum::{
    extract::{Json, State},
    routing::post,
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

/// Creates the router for token issuance.
///
/// Identity verification (phone number + one-time code) happens in an
/// external collaborator; this endpoint is the pass-through that exchanges a
/// verified identity for a bearer token.
pub fn auth_routes() -> Router<Arc<AppState>> {
    Router::new().route("/token", post(issue_token))
}

#[derive(Debug, Deserialize, Validate)]
struct TokenRequest {
    #[validate(length(min = 1))]
    identity: String,
}

#[derive(Debug, Serialize)]
struct TokenResponse {
    token: String,
    token_type: &'static str,
}

async fn issue_token(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<TokenRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    validate_input(&payload)?;
    let token = state
        .auth
        .issue_token(&payload.identity)
        .map_err(ApiError::ServiceError)?;
    Ok(success_response(TokenResponse {
        token,
        token_type: "Bearer",
    }))
}
