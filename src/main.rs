use std::{sync::Arc, time::Duration};

use anyhow::Context;
use tracing::info;

use sweetshop_api as api;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg = api::config::load_config().context("failed to load configuration")?;
    api::config::init_tracing(&cfg.log_level);

    let pool = api::db::establish_connection_from_app_config(&cfg).await?;
    if cfg.auto_migrate {
        api::db::run_migrations(&pool).await?;
    }
    let db = Arc::new(pool);

    let (event_sender, event_rx) = api::events::event_channel(1024);
    tokio::spawn(api::events::process_events(event_rx));

    let auth = api::auth::AuthService::new(
        cfg.jwt_secret.clone(),
        Duration::from_secs(cfg.jwt_expiration),
    );
    let services = api::handlers::AppServices::new(db.clone(), Arc::new(event_sender.clone()));

    let state = Arc::new(api::AppState {
        db,
        config: cfg.clone(),
        event_sender,
        auth,
        services,
    });
    let app = api::app_router(state);

    let addr = cfg.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!("Sweetshop API listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("Shutdown signal received");
}
