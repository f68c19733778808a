use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    http::StatusCode,
    response::IntoResponse,
    Json,
};

use crate::models::{DetectionEventPayload, HistoryParams, LatestParams};
use crate::service::{self, ServiceError};
use crate::state::AppState;

pub async fn healthz() -> StatusCode {
    StatusCode::OK
}

pub async fn readyz(State(state): State<AppState>) -> StatusCode {
    match service::ready(&state).await {
        Ok(()) => StatusCode::OK,
        Err(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
}

pub async fn upload_batch(
    State(state): State<AppState>,
    payload: Result<Json<Vec<DetectionEventPayload>>, JsonRejection>,
) -> impl IntoResponse {
    let events = match payload {
        Ok(Json(events)) => events,
        Err(rejection) => {
            let err = ServiceError::new(rejection.status(), "invalid_payload", rejection.body_text());
            return (err.status, Json(err.body)).into_response();
        }
    };

    match service::ingest_batch(&state, events).await {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(err) => (err.status, Json(err.body)).into_response(),
    }
}

pub async fn latest_sensor_state(
    State(state): State<AppState>,
    params: Result<Query<LatestParams>, QueryRejection>,
) -> impl IntoResponse {
    let params = match params {
        Ok(Query(params)) => params,
        Err(rejection) => return query_rejected(rejection).into_response(),
    };

    match service::latest_per_sensor(&state, params).await {
        Ok(sensors) => (StatusCode::OK, Json(sensors)).into_response(),
        Err(err) => (err.status, Json(err.body)).into_response(),
    }
}

pub async fn history(
    State(state): State<AppState>,
    params: Result<Query<HistoryParams>, QueryRejection>,
) -> impl IntoResponse {
    let params = match params {
        Ok(Query(params)) => params,
        Err(rejection) => return query_rejected(rejection).into_response(),
    };

    match service::history(&state, params).await {
        Ok(events) => (StatusCode::OK, Json(events)).into_response(),
        Err(err) => (err.status, Json(err.body)).into_response(),
    }
}

fn query_rejected(rejection: QueryRejection) -> impl IntoResponse {
    let err = ServiceError::bad_request("invalid_query", rejection.body_text());
    (err.status, Json(err.body))
}
