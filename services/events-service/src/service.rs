use axum::http::StatusCode;
use deadpool_postgres::{Object, PoolError};

use crate::db;
use crate::filter::EventFilter;
use crate::models::{
    BatchResponse, DetectionEvent, DetectionEventPayload, ErrorResponse, HistoryEvent,
    HistoryParams, LatestParams, SensorLatest,
};
use crate::state::AppState;
use crate::timestamp;

pub const DEFAULT_LATEST_LIMIT: u64 = 100;

pub struct ServiceError {
    pub status: StatusCode,
    pub body: ErrorResponse,
}

impl ServiceError {
    pub fn new(status: StatusCode, code: &'static str, message: String) -> Self {
        Self {
            status,
            body: ErrorResponse { code, message },
        }
    }

    pub fn bad_request(code: &'static str, message: String) -> Self {
        Self::new(StatusCode::BAD_REQUEST, code, message)
    }

    pub fn unprocessable(code: &'static str, message: String) -> Self {
        Self::new(StatusCode::UNPROCESSABLE_ENTITY, code, message)
    }

    fn database(context: &'static str, err: tokio_postgres::Error) -> Self {
        tracing::error!(error = %err, "{context} failed");
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "db_error",
            "database error".to_string(),
        )
    }
}

async fn checkout(state: &AppState) -> Result<Object, ServiceError> {
    state.pool.get().await.map_err(|err: PoolError| {
        tracing::error!(error = %err, "pool checkout failed");
        ServiceError::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "db_error",
            "database unavailable".to_string(),
        )
    })
}

pub async fn ingest_batch(
    state: &AppState,
    payloads: Vec<DetectionEventPayload>,
) -> Result<BatchResponse, ServiceError> {
    if payloads.is_empty() {
        return Ok(BatchResponse::Empty { saved: 0 });
    }

    // Whole batch is rejected on the first bad event; nothing reaches storage.
    for (index, payload) in payloads.iter().enumerate() {
        payload.validate().map_err(|reason| {
            ServiceError::unprocessable("invalid_payload", format!("event {index}: {reason}"))
        })?;
    }

    let events: Vec<DetectionEvent> = payloads.into_iter().map(DetectionEvent::from).collect();
    let submitted = events.len() as u64;

    let client = checkout(state).await?;
    let inserted = db::insert_events(&**client, &events)
        .await
        .map_err(|err| ServiceError::database("insert events", err))?;

    tracing::info!(
        submitted,
        inserted,
        duplicates = submitted - inserted.min(submitted),
        "batch ingested"
    );
    Ok(BatchResponse::Processed {
        status: "ok",
        processed: submitted,
    })
}

pub async fn latest_per_sensor(
    state: &AppState,
    params: LatestParams,
) -> Result<Vec<SensorLatest>, ServiceError> {
    let limit = to_sql_bigint(params.limit.unwrap_or(DEFAULT_LATEST_LIMIT));
    let offset = to_sql_bigint(params.offset.unwrap_or(0));

    let client = checkout(state).await?;
    let events = db::fetch_latest_per_sensor(&**client, limit, offset)
        .await
        .map_err(|err| ServiceError::database("latest per sensor", err))?;

    tracing::debug!(limit, offset, sensors = events.len(), "latest per sensor");
    Ok(events.into_iter().map(SensorLatest::from).collect())
}

pub async fn history(
    state: &AppState,
    params: HistoryParams,
) -> Result<Vec<HistoryEvent>, ServiceError> {
    let filter = history_filter(&params)?;

    let client = checkout(state).await?;
    let events = db::fetch_history(&**client, &filter)
        .await
        .map_err(|err| ServiceError::database("history", err))?;

    tracing::debug!(
        sensor_id = params.sensor_id.as_deref().unwrap_or("*"),
        predicates = filter.predicates().len(),
        rows = events.len(),
        "history"
    );
    Ok(events.into_iter().map(HistoryEvent::from).collect())
}

pub async fn ready(state: &AppState) -> Result<(), ServiceError> {
    let client = checkout(state).await?;
    db::ping(&**client)
        .await
        .map_err(|err| ServiceError::database("readiness ping", err))
}

pub fn history_filter(params: &HistoryParams) -> Result<EventFilter, ServiceError> {
    let start = timestamp::parse_naive(&params.start_iso).map_err(|reason| {
        ServiceError::unprocessable("invalid_timestamp", format!("start_iso: {reason}"))
    })?;
    let end = timestamp::parse_naive(&params.end_iso).map_err(|reason| {
        ServiceError::unprocessable("invalid_timestamp", format!("end_iso: {reason}"))
    })?;

    Ok(EventFilter::time_range(start, end).sensor(params.sensor_id.as_deref()))
}

// Postgres LIMIT/OFFSET are bigint; larger requests saturate.
fn to_sql_bigint(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::FilterValue;

    fn params(start: &str, end: &str, sensor: Option<&str>) -> HistoryParams {
        HistoryParams {
            start_iso: start.to_string(),
            end_iso: end.to_string(),
            sensor_id: sensor.map(str::to_string),
        }
    }

    #[test]
    fn history_filter_strips_offsets() {
        let filter = history_filter(&params(
            "2024-01-01T00:00:00+02:00",
            "2024-01-02T00:00:00Z",
            Some("s1"),
        ))
        .ok()
        .unwrap();
        let predicates = filter.predicates();
        assert_eq!(predicates.len(), 3);
        match &predicates[0].value {
            FilterValue::Timestamp(start) => {
                assert_eq!(timestamp::format_iso(start), "2024-01-01T00:00:00")
            }
            other => panic!("unexpected predicate value {other:?}"),
        }
    }

    #[test]
    fn equal_bounds_are_not_an_error() {
        let filter = history_filter(&params(
            "2024-01-01T00:00:00Z",
            "2024-01-01T00:00:00Z",
            None,
        ));
        assert!(filter.is_ok());
    }

    #[test]
    fn malformed_bounds_are_rejected() {
        let err = history_filter(&params("soon", "2024-01-01T00:00:00Z", None))
            .err()
            .unwrap();
        assert_eq!(err.status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(err.body.code, "invalid_timestamp");
    }

    #[test]
    fn oversized_limits_saturate() {
        assert_eq!(to_sql_bigint(100), 100);
        assert_eq!(to_sql_bigint(u64::MAX), i64::MAX);
    }
}
