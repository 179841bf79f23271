use crate::handlers::common::{
    created_response, map_service_error, no_content_response, success_response,
};
use crate::{
    auth::AuthenticatedUser,
    errors::ApiError,
    services::ingredients::{CreateIngredientInput, UpdateIngredientInput},
    AppState,
};
use axum::{
    extract::{Json, Path, Query, State},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use std::sync::Arc;

/// Creates the router for ingredient endpoints
pub fn ingredients_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", post(create_ingredient).get(list_ingredients))
        .route("/batch", post(create_ingredients_batch))
        .route(
            "/:name",
            get(get_ingredient)
                .put(update_ingredient)
                .delete(delete_ingredient),
        )
}

#[derive(Debug, Deserialize)]
struct ListIngredientsQuery {
    q: Option<String>,
    category: Option<String>,
}

async fn create_ingredient(
    State(state): State<Arc<AppState>>,
    _user: AuthenticatedUser,
    Json(payload): Json<CreateIngredientInput>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let ingredient = state
        .services
        .ingredients
        .create_ingredient(payload)
        .await
        .map_err(map_service_error)?;
    Ok(created_response(ingredient))
}

async fn create_ingredients_batch(
    State(state): State<Arc<AppState>>,
    _user: AuthenticatedUser,
    Json(payload): Json<Vec<CreateIngredientInput>>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let outcome = state
        .services
        .ingredients
        .create_ingredients_batch(payload)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(outcome))
}

async fn list_ingredients(
    State(state): State<Arc<AppState>>,
    _user: AuthenticatedUser,
    Query(query): Query<ListIngredientsQuery>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let ingredients = state
        .services
        .ingredients
        .list_ingredients(query.q.as_deref(), query.category.as_deref())
        .await
        .map_err(map_service_error)?;
    Ok(success_response(ingredients))
}

async fn get_ingredient(
    State(state): State<Arc<AppState>>,
    _user: AuthenticatedUser,
    Path(name): Path<String>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let ingredient = state
        .services
        .ingredients
        .get_ingredient(&name)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(ingredient))
}

async fn update_ingredient(
    State(state): State<Arc<AppState>>,
    _user: AuthenticatedUser,
    Path(name): Path<String>,
    Json(payload): Json<UpdateIngredientInput>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let ingredient = state
        .services
        .ingredients
        .update_ingredient(&name, payload)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(ingredient))
}

async fn delete_ingredient(
    State(state): State<Arc<AppState>>,
    _user: AuthenticatedUser,
    Path(name): Path<String>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    state
        .services
        .ingredients
        .delete_ingredient(&name)
        .await
        .map_err(map_service_error)?;
    Ok(no_content_response())
}
