use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::auth::authenticate;
use crate::handlers::{healthz, history, latest_sensor_state, readyz, upload_batch};
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    let api = Router::new()
        .route("/events/batch", post(upload_batch))
        .route("/sensors/latest", get(latest_sensor_state))
        .route("/events", get(history))
        .route_layer(middleware::from_fn_with_state(state.clone(), authenticate));

    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .merge(api)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
