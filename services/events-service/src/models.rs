use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::timestamp;

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct Position {
    pub lat: f64,
    pub lng: f64,
}

/// One detection as posted by a sensor gateway. Unknown fields are ignored.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionEventPayload {
    pub sensor_id: String,
    pub message_id: String,
    pub position: Position,
    pub classification: i32,
    pub prediction: i32,
    pub amplitude: f64,
    #[serde(deserialize_with = "timestamp::deserialize")]
    pub timestamp: NaiveDateTime,
}

impl DetectionEventPayload {
    pub fn validate(&self) -> Result<(), String> {
        if self.sensor_id.is_empty() {
            return Err("sensorId must not be empty".to_string());
        }
        if self.message_id.is_empty() {
            return Err("messageId must not be empty".to_string());
        }
        if !self.position.lat.is_finite() || !self.position.lng.is_finite() {
            return Err("position must contain finite lat and lng".to_string());
        }
        Ok(())
    }
}

/// Row shape of `detection_events`.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectionEvent {
    pub message_id: String,
    pub sensor_id: String,
    pub latitude: f64,
    pub longitude: f64,
    pub classification: i32,
    pub prediction: i32,
    pub amplitude: f64,
    pub timestamp: NaiveDateTime,
}

impl From<DetectionEventPayload> for DetectionEvent {
    fn from(payload: DetectionEventPayload) -> Self {
        Self {
            message_id: payload.message_id,
            sensor_id: payload.sensor_id,
            latitude: payload.position.lat,
            longitude: payload.position.lng,
            classification: payload.classification,
            prediction: payload.prediction,
            amplitude: payload.amplitude,
            timestamp: payload.timestamp,
        }
    }
}

impl DetectionEvent {
    pub fn position(&self) -> Position {
        Position {
            lat: self.latitude,
            lng: self.longitude,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum BatchResponse {
    Empty { saved: u64 },
    Processed { status: &'static str, processed: u64 },
}

#[derive(Debug, Deserialize)]
pub struct LatestParams {
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SensorLatest {
    pub sensor_id: String,
    pub latest_event: LatestEvent,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LatestEvent {
    pub message_id: String,
    #[serde(serialize_with = "timestamp::serialize")]
    pub timestamp: NaiveDateTime,
    pub classification: i32,
    pub position: Position,
}

impl From<DetectionEvent> for SensorLatest {
    fn from(event: DetectionEvent) -> Self {
        let position = event.position();
        Self {
            sensor_id: event.sensor_id,
            latest_event: LatestEvent {
                message_id: event.message_id,
                timestamp: event.timestamp,
                classification: event.classification,
                position,
            },
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct HistoryParams {
    pub start_iso: String,
    pub end_iso: String,
    pub sensor_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEvent {
    pub sensor_id: String,
    pub message_id: String,
    pub position: Position,
    pub classification: i32,
    pub prediction: i32,
    pub amplitude: f64,
    #[serde(serialize_with = "timestamp::serialize")]
    pub timestamp: NaiveDateTime,
}

impl From<DetectionEvent> for HistoryEvent {
    fn from(event: DetectionEvent) -> Self {
        let position = event.position();
        Self {
            sensor_id: event.sensor_id,
            message_id: event.message_id,
            position,
            classification: event.classification,
            prediction: event.prediction,
            amplitude: event.amplitude,
            timestamp: event.timestamp,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: &'static str,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_payload() -> serde_json::Value {
        json!({
            "messageId": "m1",
            "sensorId": "s1",
            "position": { "lat": 1, "lng": 2 },
            "classification": 0,
            "prediction": 1,
            "amplitude": 0.5,
            "timestamp": "2024-01-01T00:00:00Z",
            "firmware": "ignored"
        })
    }

    #[test]
    fn payload_maps_to_row() {
        let payload: DetectionEventPayload = serde_json::from_value(sample_payload()).unwrap();
        payload.validate().unwrap();
        let event = DetectionEvent::from(payload);
        assert_eq!(event.latitude, 1.0);
        assert_eq!(event.longitude, 2.0);
        assert_eq!(timestamp::format_iso(&event.timestamp), "2024-01-01T00:00:00");
    }

    #[test]
    fn payload_requires_numeric_position() {
        let mut value = sample_payload();
        value["position"] = json!({ "lat": "north", "lng": 2 });
        assert!(serde_json::from_value::<DetectionEventPayload>(value).is_err());

        let mut value = sample_payload();
        value["position"] = json!({ "lat": 1 });
        assert!(serde_json::from_value::<DetectionEventPayload>(value).is_err());
    }

    #[test]
    fn payload_rejects_fractional_codes() {
        let mut value = sample_payload();
        value["classification"] = json!(1.5);
        assert!(serde_json::from_value::<DetectionEventPayload>(value).is_err());
    }

    #[test]
    fn empty_identifiers_fail_validation() {
        let mut value = sample_payload();
        value["sensorId"] = json!("");
        let payload: DetectionEventPayload = serde_json::from_value(value).unwrap();
        assert!(payload.validate().is_err());

        let mut value = sample_payload();
        value["messageId"] = json!("");
        let payload: DetectionEventPayload = serde_json::from_value(value).unwrap();
        assert!(payload.validate().is_err());
    }

    #[test]
    fn whitespace_identifiers_are_kept_verbatim() {
        let mut value = sample_payload();
        value["sensorId"] = json!("  ");
        value["messageId"] = json!(" m1 ");
        let payload: DetectionEventPayload = serde_json::from_value(value).unwrap();
        payload.validate().unwrap();
        let event = DetectionEvent::from(payload);
        assert_eq!(event.sensor_id, "  ");
        assert_eq!(event.message_id, " m1 ");
    }

    #[test]
    fn batch_response_shapes() {
        let empty = serde_json::to_value(BatchResponse::Empty { saved: 0 }).unwrap();
        assert_eq!(empty, json!({ "saved": 0 }));
        let processed = serde_json::to_value(BatchResponse::Processed {
            status: "ok",
            processed: 3,
        })
        .unwrap();
        assert_eq!(processed, json!({ "status": "ok", "processed": 3 }));
    }

    #[test]
    fn latest_and_history_wire_names() {
        let payload: DetectionEventPayload = serde_json::from_value(sample_payload()).unwrap();
        let event = DetectionEvent::from(payload);

        let latest = serde_json::to_value(SensorLatest::from(event.clone())).unwrap();
        assert_eq!(
            latest,
            json!({
                "sensorId": "s1",
                "latestEvent": {
                    "messageId": "m1",
                    "timestamp": "2024-01-01T00:00:00",
                    "classification": 0,
                    "position": { "lat": 1.0, "lng": 2.0 }
                }
            })
        );

        let history = serde_json::to_value(HistoryEvent::from(event)).unwrap();
        assert_eq!(history["prediction"], json!(1));
        assert_eq!(history["amplitude"], json!(0.5));
        assert_eq!(history["timestamp"], json!("2024-01-01T00:00:00"));
    }
}
