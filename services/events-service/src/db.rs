use deadpool_postgres::{
    CreatePoolError, ManagerConfig, Pool, PoolConfig, RecyclingMethod, Runtime,
};
use tokio_postgres::{Error, GenericClient, NoTls, Row};

use crate::filter::EventFilter;
use crate::models::DetectionEvent;

const SQL_CREATE_TABLE: &str = "CREATE TABLE IF NOT EXISTS detection_events (\
message_id TEXT PRIMARY KEY, \
sensor_id TEXT NOT NULL, \
latitude DOUBLE PRECISION NOT NULL, \
longitude DOUBLE PRECISION NOT NULL, \
classification INTEGER NOT NULL, \
prediction INTEGER NOT NULL, \
amplitude DOUBLE PRECISION NOT NULL, \
timestamp TIMESTAMP NOT NULL)";
const SQL_CREATE_SENSOR_INDEX: &str = "CREATE INDEX IF NOT EXISTS idx_detection_events_sensor_ts \
ON detection_events (sensor_id, timestamp DESC)";
const SQL_CREATE_TIME_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_detection_events_ts ON detection_events (timestamp)";

// One statement per batch: arrays keep the parameter count fixed at eight.
const SQL_INSERT_EVENTS: &str = "INSERT INTO detection_events \
(message_id, sensor_id, latitude, longitude, classification, prediction, amplitude, timestamp) \
SELECT * FROM UNNEST($1::text[], $2::text[], $3::float8[], $4::float8[], $5::int4[], $6::int4[], $7::float8[], $8::timestamp[]) \
ON CONFLICT (message_id) DO NOTHING";
const SQL_LATEST_PER_SENSOR: &str = "SELECT DISTINCT ON (sensor_id) \
message_id, sensor_id, latitude, longitude, classification, prediction, amplitude, timestamp \
FROM detection_events \
ORDER BY sensor_id, timestamp DESC, message_id DESC \
LIMIT $1 OFFSET $2";
const SQL_PING: &str = "SELECT 1";

pub fn history_sql(filter: &EventFilter) -> String {
    format!(
        "SELECT message_id, sensor_id, latitude, longitude, classification, prediction, amplitude, timestamp \
FROM detection_events {} ORDER BY timestamp ASC, message_id ASC",
        filter.where_clause()
    )
}

/// Builds the pool without connecting; connections open on first checkout.
pub fn create_pool(database_url: &str, max_size: usize) -> Result<Pool, CreatePoolError> {
    let mut config = deadpool_postgres::Config::new();
    config.url = Some(database_url.to_string());
    config.manager = Some(ManagerConfig {
        recycling_method: RecyclingMethod::Fast,
    });
    config.pool = Some(PoolConfig::new(max_size));
    config.create_pool(Some(Runtime::Tokio1), NoTls)
}

pub async fn ensure_schema(db: &impl GenericClient) -> Result<(), Error> {
    db.execute(SQL_CREATE_TABLE, &[]).await?;
    db.execute(SQL_CREATE_SENSOR_INDEX, &[]).await?;
    db.execute(SQL_CREATE_TIME_INDEX, &[]).await?;
    Ok(())
}

/// Inserts the batch, skipping message ids already stored. Returns rows written.
pub async fn insert_events(db: &impl GenericClient, events: &[DetectionEvent]) -> Result<u64, Error> {
    if events.is_empty() {
        return Ok(0);
    }

    let mut message_ids = Vec::with_capacity(events.len());
    let mut sensor_ids = Vec::with_capacity(events.len());
    let mut latitudes = Vec::with_capacity(events.len());
    let mut longitudes = Vec::with_capacity(events.len());
    let mut classifications = Vec::with_capacity(events.len());
    let mut predictions = Vec::with_capacity(events.len());
    let mut amplitudes = Vec::with_capacity(events.len());
    let mut timestamps = Vec::with_capacity(events.len());
    for event in events {
        message_ids.push(event.message_id.as_str());
        sensor_ids.push(event.sensor_id.as_str());
        latitudes.push(event.latitude);
        longitudes.push(event.longitude);
        classifications.push(event.classification);
        predictions.push(event.prediction);
        amplitudes.push(event.amplitude);
        timestamps.push(event.timestamp);
    }

    db.execute(
        SQL_INSERT_EVENTS,
        &[
            &message_ids,
            &sensor_ids,
            &latitudes,
            &longitudes,
            &classifications,
            &predictions,
            &amplitudes,
            &timestamps,
        ],
    )
    .await
}

pub async fn fetch_latest_per_sensor(
    db: &impl GenericClient,
    limit: i64,
    offset: i64,
) -> Result<Vec<DetectionEvent>, Error> {
    let rows = db.query(SQL_LATEST_PER_SENSOR, &[&limit, &offset]).await?;
    Ok(rows.iter().map(event_from_row).collect())
}

pub async fn fetch_history(
    db: &impl GenericClient,
    filter: &EventFilter,
) -> Result<Vec<DetectionEvent>, Error> {
    let sql = history_sql(filter);
    let rows = db.query(sql.as_str(), &filter.params()).await?;
    Ok(rows.iter().map(event_from_row).collect())
}

pub async fn ping(db: &impl GenericClient) -> Result<(), Error> {
    db.query_one(SQL_PING, &[]).await?;
    Ok(())
}

fn event_from_row(row: &Row) -> DetectionEvent {
    DetectionEvent {
        message_id: row.get("message_id"),
        sensor_id: row.get("sensor_id"),
        latitude: row.get("latitude"),
        longitude: row.get("longitude"),
        classification: row.get("classification"),
        prediction: row.get("prediction"),
        amplitude: row.get("amplitude"),
        timestamp: row.get("timestamp"),
    }
}

// Advisory lock key serializing tests that share the live test database.
#[cfg(test)]
pub(crate) const TEST_LOCK_KEY: i64 = 0x0e7e_57;
