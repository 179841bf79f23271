use crate::handlers::common::{
    created_response, map_service_error, no_content_response, success_response,
};
use crate::{
    auth::AuthenticatedUser,
    errors::ApiError,
    services::categories::{CreateCategoryInput, UpdateCategoryInput},
    AppState,
};
use axum::{
    extract::{Json, Path, State},
    routing::{get, post},
    Router,
};
use std::sync::Arc;

/// Creates the router for category endpoints
pub fn categories_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", post(create_category).get(list_categories))
        .route(
            "/:name",
            get(get_category)
                .put(update_category)
                .delete(delete_category),
        )
}

async fn create_category(
    State(state): State<Arc<AppState>>,
    _user: AuthenticatedUser,
    Json(payload): Json<CreateCategoryInput>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let category = state
        .services
        .categories
        .create_category(payload)
        .await
        .map_err(map_service_error)?;
    Ok(created_response(category))
}

async fn list_categories(
    State(state): State<Arc<AppState>>,
    _user: AuthenticatedUser,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let categories = state
        .services
        .categories
        .list_categories()
        .await
        .map_err(map_service_error)?;
    Ok(success_response(categories))
}

async fn get_category(
    State(state): State<Arc<AppState>>,
    _user: AuthenticatedUser,
    Path(name): Path<String>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let category = state
        .services
        .categories
        .get_category(&name)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(category))
}

async fn update_category(
    State(state): State<Arc<AppState>>,
    _user: AuthenticatedUser,
    Path(name): Path<String>,
    Json(payload): Json<UpdateCategoryInput>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let category = state
        .services
        .categories
        .update_category(&name, payload)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(category))
}

async fn delete_category(
    State(state): State<Arc<AppState>>,
    _user: AuthenticatedUser,
    Path(name): Path<String>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    state
        .services
        .categories
        .delete_category(&name)
        .await
        .map_err(map_service_error)?;
    Ok(no_content_response())
}
