use crate::handlers::common::{created_response, map_service_error};
use crate::{
    auth::AuthenticatedUser, errors::ApiError, services::commerce::CheckoutInput, AppState,
};
use axum::{
    extract::{Json, State},
    routing::post,
    Router,
};
use std::sync::Arc;

/// Creates the router for the single checkout action
pub fn checkout_routes() -> Router<Arc<AppState>> {
    Router::new().route("/", post(checkout))
}

/// Atomically turns the owner's cart into an order.
async fn checkout(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    Json(payload): Json<CheckoutInput>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let order = state
        .services
        .checkout
        .checkout(&user.identity, payload)
        .await
        .map_err(map_service_error)?;
    Ok(created_response(order))
}
