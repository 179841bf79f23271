use crate::handlers::common::{
    created_response, map_service_error, no_content_response, success_response,
};
use crate::{
    auth::AuthenticatedUser,
    errors::ApiError,
    services::inventory::{CreateInventoryInput, GroupBy, SortBy},
    AppState,
};
use axum::{
    extract::{Json, Path, Query, State},
    routing::{get, post, put},
    Router,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

/// Creates the router for inventory endpoints
pub fn inventory_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", post(create_inventory).get(list_inventory))
        .route("/:id", get(get_record).delete(delete_record))
        .route("/:id/actual-qty", put(adjust_actual_qty))
}

#[derive(Debug, Deserialize)]
struct ListInventoryQuery {
    store_id: String,
    #[serde(default)]
    group_by: GroupBy,
    #[serde(default)]
    sort_by: SortBy,
}

async fn create_inventory(
    State(state): State<Arc<AppState>>,
    _user: AuthenticatedUser,
    Json(payload): Json<CreateInventoryInput>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let record = state
        .services
        .inventory
        .create_inventory(payload)
        .await
        .map_err(map_service_error)?;
    Ok(created_response(record))
}

async fn list_inventory(
    State(state): State<Arc<AppState>>,
    _user: AuthenticatedUser,
    Query(query): Query<ListInventoryQuery>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let groups = state
        .services
        .inventory
        .list_inventory(&query.store_id, query.group_by, query.sort_by)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(groups))
}

async fn get_record(
    State(state): State<Arc<AppState>>,
    _user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let record = state
        .services
        .inventory
        .get_record(id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(record))
}

#[derive(Debug, Deserialize)]
struct AdjustQtyRequest {
    actual_qty: Decimal,
}

async fn adjust_actual_qty(
    State(state): State<Arc<AppState>>,
    _user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<AdjustQtyRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let record = state
        .services
        .inventory
        .adjust_actual_qty(id, payload.actual_qty)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(record))
}

async fn delete_record(
    State(state): State<Arc<AppState>>,
    _user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    state
        .services
        .inventory
        .delete_record(id)
        .await
        .map_err(map_service_error)?;
    Ok(no_content_response())
}
