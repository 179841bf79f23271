use crate::handlers::common::{created_response, map_service_error, success_response};
use crate::{
    auth::AuthenticatedUser,
    errors::ApiError,
    services::procurement::{CreatePurchaseOrderInput, ListPurchaseOrdersFilter},
    AppState,
};
use axum::{
    extract::{Json, Path, Query, State},
    routing::{get, post},
    Router,
};
use std::sync::Arc;

/// Creates the router for purchase-order endpoints
pub fn purchase_orders_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", post(create_purchase_order).get(list_purchase_orders))
        .route("/:code", get(get_purchase_order))
        .route("/:code/receive", post(receive_purchase_order))
}

async fn create_purchase_order(
    State(state): State<Arc<AppState>>,
    _user: AuthenticatedUser,
    Json(payload): Json<CreatePurchaseOrderInput>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let po = state
        .services
        .procurement
        .create_purchase_order(payload)
        .await
        .map_err(map_service_error)?;
    Ok(created_response(po))
}

async fn list_purchase_orders(
    State(state): State<Arc<AppState>>,
    _user: AuthenticatedUser,
    Query(filter): Query<ListPurchaseOrdersFilter>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let orders = state
        .services
        .procurement
        .list_purchase_orders(filter)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(orders))
}

async fn get_purchase_order(
    State(state): State<Arc<AppState>>,
    _user: AuthenticatedUser,
    Path(code): Path<String>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let po = state
        .services
        .procurement
        .get_purchase_order(&code)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(po))
}

/// Applies the purchase order to the store's inventory ledger.
async fn receive_purchase_order(
    State(state): State<Arc<AppState>>,
    _user: AuthenticatedUser,
    Path(code): Path<String>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let receipt = state
        .services
        .procurement
        .receive_purchase_order(&code)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(receipt))
}
