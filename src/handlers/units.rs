use crate::handlers::common::{
    created_response, map_service_error, no_content_response, success_response, validate_input,
};
use crate::{
    auth::AuthenticatedUser,
    errors::ApiError,
    services::units::{CreateUnitInput, UpdateUnitInput},
    AppState,
};
use axum::{
    extract::{Json, Path, State},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use std::sync::Arc;
use validator::Validate;

/// Creates the router for unit endpoints
pub fn units_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", post(create_unit).get(list_units))
        .route("/batch", post(create_units_batch))
        .route(
            "/:name",
            get(get_unit).put(update_unit).delete(delete_unit),
        )
}

#[derive(Debug, Deserialize, Validate)]
struct CreateUnitRequest {
    #[validate(length(min = 1))]
    name: String,
    #[validate(length(min = 1))]
    abbreviation: String,
}

impl From<CreateUnitRequest> for CreateUnitInput {
    fn from(req: CreateUnitRequest) -> Self {
        CreateUnitInput {
            name: req.name,
            abbreviation: req.abbreviation,
        }
    }
}

async fn create_unit(
    State(state): State<Arc<AppState>>,
    _user: AuthenticatedUser,
    Json(payload): Json<CreateUnitRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    validate_input(&payload)?;
    let unit = state
        .services
        .units
        .create_unit(payload.into())
        .await
        .map_err(map_service_error)?;
    Ok(created_response(unit))
}

async fn create_units_batch(
    State(state): State<Arc<AppState>>,
    _user: AuthenticatedUser,
    Json(payload): Json<Vec<CreateUnitRequest>>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    for entry in &payload {
        validate_input(entry)?;
    }
    let outcome = state
        .services
        .units
        .create_units_batch(payload.into_iter().map(Into::into).collect())
        .await
        .map_err(map_service_error)?;
    Ok(success_response(outcome))
}

async fn list_units(
    State(state): State<Arc<AppState>>,
    _user: AuthenticatedUser,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let units = state
        .services
        .units
        .list_units()
        .await
        .map_err(map_service_error)?;
    Ok(success_response(units))
}

async fn get_unit(
    State(state): State<Arc<AppState>>,
    _user: AuthenticatedUser,
    Path(name): Path<String>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let unit = state
        .services
        .units
        .get_unit(&name)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(unit))
}

async fn update_unit(
    State(state): State<Arc<AppState>>,
    _user: AuthenticatedUser,
    Path(name): Path<String>,
    Json(payload): Json<UpdateUnitInput>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let unit = state
        .services
        .units
        .update_unit(&name, payload)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(unit))
}

async fn delete_unit(
    State(state): State<Arc<AppState>>,
    _user: AuthenticatedUser,
    Path(name): Path<String>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    state
        .services
        .units
        .delete_unit(&name)
        .await
        .map_err(map_service_error)?;
    Ok(no_content_response())
}
