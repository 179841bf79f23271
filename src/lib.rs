//! Sweetshop API Library
//!
//! Domain backend for a dessert-shop point of sale: reference data (units,
//! categories, ingredients), recipes with independent sale prices, per-store
//! inventory with derived restock flags, purchase orders, and the
//! cart → checkout → order pipeline.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod auth;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod migrator;
pub mod openapi;
pub mod services;

use axum::{response::Json, routing::get, Router};
use chrono::Utc;
use sea_orm::DatabaseConnection;
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Shared application state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: config::AppConfig,
    pub event_sender: events::EventSender,
    pub auth: auth::AuthService,
    pub services: handlers::AppServices,
}

/// Assembles the full application router.
pub fn app_router(state: Arc<AppState>) -> Router {
    let api = Router::new()
        .nest("/units", handlers::units::units_routes())
        .nest("/categories", handlers::categories::categories_routes())
        .nest("/ingredients", handlers::ingredients::ingredients_routes())
        .nest("/recipes", handlers::recipes::recipes_routes())
        .nest("/modifiers", handlers::recipes::modifiers_routes())
        .nest("/inventory", handlers::inventory::inventory_routes())
        .nest(
            "/purchase-orders",
            handlers::purchase_orders::purchase_orders_routes(),
        )
        .nest("/cart", handlers::carts::carts_routes())
        .nest("/checkout", handlers::checkout::checkout_routes())
        .nest("/orders", handlers::orders::orders_routes());

    Router::new()
        .route("/health", get(health_check))
        .route("/api-docs/openapi.json", get(openapi_json))
        .nest("/auth", handlers::auth::auth_routes())
        .nest("/api/v1", api)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    use utoipa::OpenApi;
    Json(openapi::ApiDoc::openapi())
}
