use crate::handlers::common::{
    created_response, map_service_error, no_content_response, success_response,
};
use crate::{
    auth::AuthenticatedUser,
    errors::ApiError,
    services::{
        modifiers::{CreateModifierInput, UpdateModifierInput},
        recipes::{CreateRecipeInput, UpdateRecipeInput},
    },
    AppState,
};
use axum::{
    extract::{Json, Path, Query, State},
    routing::{delete, get, post, put},
    Router,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::sync::Arc;

/// Creates the router for recipe (product) endpoints, including the
/// modifiers offered per product.
pub fn recipes_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", post(create_recipe).get(list_recipes))
        .route(
            "/:name",
            get(get_recipe).put(update_recipe).delete(delete_recipe),
        )
        .route("/:name/price", put(set_recipe_price))
        .route(
            "/:name/modifiers",
            get(list_product_modifiers).post(attach_modifier),
        )
        .route("/:name/modifiers/:modifier", delete(detach_modifier))
}

/// Creates the router for the standalone modifier catalog
pub fn modifiers_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", post(create_modifier).get(list_modifiers))
        .route("/:name", put(update_modifier))
        .route("/:name/deactivate", post(deactivate_modifier))
}

async fn create_recipe(
    State(state): State<Arc<AppState>>,
    _user: AuthenticatedUser,
    Json(payload): Json<CreateRecipeInput>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let recipe = state
        .services
        .recipes
        .create_recipe(payload)
        .await
        .map_err(map_service_error)?;
    Ok(created_response(recipe))
}

async fn list_recipes(
    State(state): State<Arc<AppState>>,
    _user: AuthenticatedUser,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let recipes = state
        .services
        .recipes
        .list_recipes()
        .await
        .map_err(map_service_error)?;
    Ok(success_response(recipes))
}

async fn get_recipe(
    State(state): State<Arc<AppState>>,
    _user: AuthenticatedUser,
    Path(name): Path<String>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let recipe = state
        .services
        .recipes
        .get_recipe(&name)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(recipe))
}

async fn update_recipe(
    State(state): State<Arc<AppState>>,
    _user: AuthenticatedUser,
    Path(name): Path<String>,
    Json(payload): Json<UpdateRecipeInput>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let recipe = state
        .services
        .recipes
        .update_recipe(&name, payload)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(recipe))
}

#[derive(Debug, Deserialize)]
struct SetPriceRequest {
    price: Decimal,
}

async fn set_recipe_price(
    State(state): State<Arc<AppState>>,
    _user: AuthenticatedUser,
    Path(name): Path<String>,
    Json(payload): Json<SetPriceRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let recipe = state
        .services
        .recipes
        .set_recipe_price(&name, payload.price)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(recipe))
}

async fn delete_recipe(
    State(state): State<Arc<AppState>>,
    _user: AuthenticatedUser,
    Path(name): Path<String>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    state
        .services
        .recipes
        .delete_recipe(&name)
        .await
        .map_err(map_service_error)?;
    Ok(no_content_response())
}

// ---- modifiers ----

#[derive(Debug, Deserialize)]
struct ListModifiersQuery {
    #[serde(default)]
    active_only: bool,
}

async fn create_modifier(
    State(state): State<Arc<AppState>>,
    _user: AuthenticatedUser,
    Json(payload): Json<CreateModifierInput>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let modifier = state
        .services
        .modifiers
        .create_modifier(payload)
        .await
        .map_err(map_service_error)?;
    Ok(created_response(modifier))
}

async fn list_modifiers(
    State(state): State<Arc<AppState>>,
    _user: AuthenticatedUser,
    Query(query): Query<ListModifiersQuery>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let modifiers = state
        .services
        .modifiers
        .list_modifiers(query.active_only)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(modifiers))
}

async fn update_modifier(
    State(state): State<Arc<AppState>>,
    _user: AuthenticatedUser,
    Path(name): Path<String>,
    Json(payload): Json<UpdateModifierInput>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let modifier = state
        .services
        .modifiers
        .update_modifier(&name, payload)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(modifier))
}

async fn deactivate_modifier(
    State(state): State<Arc<AppState>>,
    _user: AuthenticatedUser,
    Path(name): Path<String>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let modifier = state
        .services
        .modifiers
        .deactivate_modifier(&name)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(modifier))
}

#[derive(Debug, Deserialize)]
struct AttachModifierRequest {
    modifier_name: String,
}

async fn attach_modifier(
    State(state): State<Arc<AppState>>,
    _user: AuthenticatedUser,
    Path(name): Path<String>,
    Json(payload): Json<AttachModifierRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    state
        .services
        .modifiers
        .attach_modifier(&name, &payload.modifier_name)
        .await
        .map_err(map_service_error)?;
    Ok(no_content_response())
}

async fn detach_modifier(
    State(state): State<Arc<AppState>>,
    _user: AuthenticatedUser,
    Path((name, modifier)): Path<(String, String)>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    state
        .services
        .modifiers
        .detach_modifier(&name, &modifier)
        .await
        .map_err(map_service_error)?;
    Ok(no_content_response())
}

async fn list_product_modifiers(
    State(state): State<Arc<AppState>>,
    _user: AuthenticatedUser,
    Path(name): Path<String>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let modifiers = state
        .services
        .modifiers
        .list_modifiers_for_product(&name)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(modifiers))
}
