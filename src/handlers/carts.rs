use crate::handlers::common::{
    map_service_error, no_content_response, success_response, validate_input,
};
use crate::{
    auth::AuthenticatedUser,
    errors::ApiError,
    services::commerce::{AddToCartInput, UpdateCartItemInput},
    AppState,
};
use axum::{
    extract::{Json, Path, State},
    routing::{get, post, put},
    Router,
};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

/// Creates the router for the per-session cart
pub fn carts_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(get_cart).delete(clear_cart))
        .route("/summary", get(cart_summary))
        .route("/items", post(add_item))
        .route("/items/:item_id", put(update_item).delete(remove_item))
}

/// Get the authenticated owner's cart, priced against the live catalog.
/// Never fails on an empty or cleared cart, so the periodic cart poll is
/// safe across a concurrent checkout.
async fn get_cart(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let cart = state
        .services
        .cart
        .get_cart(&user.identity)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(cart))
}

async fn cart_summary(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let summary = state
        .services
        .cart
        .cart_summary(&user.identity)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(summary))
}

#[derive(Debug, Deserialize, Validate)]
struct AddItemRequest {
    product_id: Uuid,
    #[validate(range(min = 1))]
    quantity: i32,
    #[serde(default)]
    modifier_ids: Vec<Uuid>,
}

async fn add_item(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    Json(payload): Json<AddItemRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    validate_input(&payload)?;
    let cart = state
        .services
        .cart
        .add_item(
            &user.identity,
            AddToCartInput {
                product_id: payload.product_id,
                quantity: payload.quantity,
                modifier_ids: payload.modifier_ids,
            },
        )
        .await
        .map_err(map_service_error)?;
    Ok(success_response(cart))
}

async fn update_item(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    Path(item_id): Path<Uuid>,
    Json(payload): Json<UpdateCartItemInput>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let cart = state
        .services
        .cart
        .update_item(&user.identity, item_id, payload)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(cart))
}

async fn remove_item(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    Path(item_id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let cart = state
        .services
        .cart
        .remove_item(&user.identity, item_id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(cart))
}

async fn clear_cart(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    state
        .services
        .cart
        .clear_cart(&user.identity)
        .await
        .map_err(map_service_error)?;
    Ok(no_content_response())
}
