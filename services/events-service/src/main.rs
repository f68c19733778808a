mod app;
mod auth;
mod config;
mod db;
mod filter;
mod handlers;
mod models;
mod service;
mod state;
mod timestamp;

use std::process::ExitCode;

use omnisent_common::{bind_listener, init_tracing, shutdown_signal};

use crate::config::ServiceConfig;
use crate::state::AppState;

const SERVICE_NAME: &str = "events-service";

#[tokio::main]
async fn main() -> ExitCode {
    let _guards = init_tracing(SERVICE_NAME);

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, "{SERVICE_NAME} stopped");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), String> {
    let config = ServiceConfig::from_env()?;
    let pool = db::create_pool(&config.database_url, config.pool_max_size)
        .map_err(|err| format!("create pool failed: {err}"))?;

    if config.auto_create_schema {
        let client = pool
            .get()
            .await
            .map_err(|err| format!("connect db failed: {err}"))?;
        db::ensure_schema(&**client)
            .await
            .map_err(|err| format!("ensure schema failed: {err}"))?;
    }

    let auth = auth::build_authenticator(&config.auth);
    tracing::info!(
        port = config.port,
        pool_max_size = config.pool_max_size,
        auth_mode = %auth.mode(),
        "starting"
    );

    let state = AppState::new(pool.clone(), auth);
    let app = app::build_router(state);
    let listener = bind_listener(config.port)
        .await
        .map_err(|err| format!("bind listener failed: {err}"))?;

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|err| format!("serve failed: {err}"));

    // Release pooled connections once in-flight requests have drained.
    pool.close();
    tracing::info!("database pool closed");
    served
}
