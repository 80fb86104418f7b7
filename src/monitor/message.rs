use serde::{Deserialize, Serialize};

use super::detector::{detect, AlertEvent};
use super::history::{LoadHistory, LoadSample};

/// How far back the points series reaches. Display truncates; the event
/// list is always derived from the full history.
pub const DISPLAY_WINDOW_MS: i64 = 10 * 60 * 1000;

/// Wire payload pushed to every subscriber.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payload {
    pub points: Vec<LoadSample>,
    pub events: Vec<AlertEvent>,
}

pub fn assemble(history: &LoadHistory, sample_rate: f64, now_ms: i64) -> Payload {
    Payload {
        points: history.since(now_ms - DISPLAY_WINDOW_MS).to_vec(),
        events: detect(history.all(), sample_rate),
    }
}

#[cfg(test)]
mod tests {
    use super::{assemble, Payload, DISPLAY_WINDOW_MS};
    use crate::monitor::history::{LoadHistory, LoadSample};

    const RATE: f64 = 0.1;

    #[test]
    fn points_cover_display_window_only() {
        let mut history = LoadHistory::new();
        for index in 0..120 {
            history.push(LoadSample {
                timestamp: index * 10_000,
                load: 0.25,
            });
        }

        let now_ms = 119 * 10_000;
        let payload = assemble(&history, RATE, now_ms);

        // Inclusive cutoff: the sample at exactly now - 10 minutes stays.
        assert_eq!(payload.points.len(), 61);
        assert_eq!(payload.points[0].timestamp, now_ms - DISPLAY_WINDOW_MS);
        assert_eq!(payload.points.last().unwrap().timestamp, now_ms);
    }

    #[test]
    fn events_come_from_full_history() {
        let mut history = LoadHistory::new();
        // Breach old enough to have left the display window entirely.
        for index in 0..200 {
            history.push(LoadSample {
                timestamp: index * 10_000,
                load: if index < 20 { 0.9 } else { 0.1 },
            });
        }

        let now_ms = 199 * 10_000;
        let payload = assemble(&history, RATE, now_ms);

        assert_eq!(payload.events.len(), 2);
        assert!(payload.events[0].timestamp < now_ms - DISPLAY_WINDOW_MS);
        assert!(payload.points.iter().all(|point| point.load < 0.5));
    }

    #[test]
    fn payload_round_trips_through_json() {
        let mut history = LoadHistory::new();
        for index in 0..30 {
            history.push(LoadSample {
                timestamp: index * 10_000,
                load: if index < 15 { 0.93 } else { 0.07 },
            });
        }

        let payload = assemble(&history, RATE, 29 * 10_000);
        assert!(!payload.events.is_empty());

        let json = serde_json::to_string(&payload).expect("serialize");
        let decoded: Payload = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(decoded, payload);
    }

    #[test]
    fn payload_uses_reference_wire_shape() {
        let mut history = LoadHistory::new();
        for index in 0..12 {
            history.push(LoadSample {
                timestamp: index * 10_000,
                load: 0.75,
            });
        }

        let json = serde_json::to_string(&assemble(&history, RATE, 110_000)).expect("serialize");
        let value: serde_json::Value = serde_json::from_str(&json).expect("parse");

        let point = &value["points"][0];
        assert_eq!(point["timestamp"], 0);
        assert_eq!(point["load"], 0.75);

        let event = &value["events"][0];
        assert_eq!(event["type"], "alert");
        assert_eq!(event["timestamp"], 110_000);
        assert!(event["message"]
            .as_str()
            .unwrap()
            .starts_with("CPU Load above 50%"));
    }
}
