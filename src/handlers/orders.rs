use crate::handlers::common::{map_service_error, success_response};
use crate::{
    auth::AuthenticatedUser, entities::order::OrderStatus, errors::ApiError, AppState,
};
use axum::{
    extract::{Json, Path, State},
    routing::{get, put},
    Router,
};
use serde::Deserialize;
use std::sync::Arc;

/// Creates the router for order history
pub fn orders_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_orders))
        .route("/:number", get(get_order))
        .route("/:number/status", put(update_status))
}

/// Lists the authenticated owner's order history, newest first.
async fn list_orders(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let orders = state
        .services
        .orders
        .list_orders(Some(&user.identity))
        .await
        .map_err(map_service_error)?;
    Ok(success_response(orders))
}

async fn get_order(
    State(state): State<Arc<AppState>>,
    _user: AuthenticatedUser,
    Path(number): Path<String>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let order = state
        .services
        .orders
        .get_order(&number)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(order))
}

#[derive(Debug, Deserialize)]
struct UpdateStatusRequest {
    status: OrderStatus,
}

async fn update_status(
    State(state): State<Arc<AppState>>,
    _user: AuthenticatedUser,
    Path(number): Path<String>,
    Json(payload): Json<UpdateStatusRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let order = state
        .services
        .orders
        .update_status(&number, payload.status)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(order))
}
