use serde::{Deserialize, Serialize};

use super::history::LoadSample;

/// Averaging window over which sustained load is judged.
pub const WINDOW_MS: i64 = 2 * 60 * 1000;

/// Guard band around the threshold; exact-threshold averages never flip
/// the state machine in either direction.
const EPSILON: f64 = 0.0001;

const THRESHOLD: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertKind {
    Alert,
    Normal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertEvent {
    pub timestamp: i64,
    pub load: f64,
    #[serde(rename = "type")]
    pub kind: AlertKind,
    pub message: String,
}

/// Replays the full history through a sliding-window hysteresis state
/// machine and returns every alert/recovery transition, oldest first.
///
/// Pure function of its inputs: no state survives between calls, so the
/// event list is always rederivable from the sample log alone. The output
/// strictly alternates alert, normal, alert, ... starting with alert.
///
/// `sample_rate` must be positive; config validation rejects anything else
/// before a detector ever sees it.
pub fn detect(samples: &[LoadSample], sample_rate: f64) -> Vec<AlertEvent> {
    let period_ms = 1000.0 / sample_rate;
    let window_len = (WINDOW_MS as f64 / period_ms).floor() as usize;

    let mut events = Vec::new();

    if window_len == 0 || samples.len() < window_len {
        return events;
    }

    let mut alerting = false;

    // Windows starting at every index; the incomplete tail produces nothing.
    for window in samples.windows(window_len) {
        let avg = mean(window);
        let dev = stdev(window, avg);

        let first = &window[0];
        let last = &window[window_len - 1];

        if alerting {
            if avg < THRESHOLD - EPSILON {
                events.push(AlertEvent {
                    timestamp: last.timestamp,
                    load: last.load,
                    kind: AlertKind::Normal,
                    message: format!(
                        "CPU Load below 50% on average for the past {} minutes (mean = {}%, stdev = {}%).",
                        window_minutes(first, last),
                        (avg * 100.0).floor() as i64,
                        (dev * 100.0).round() as i64
                    ),
                });

                alerting = false;
            }
        } else if avg > THRESHOLD + EPSILON {
            events.push(AlertEvent {
                timestamp: last.timestamp,
                load: last.load,
                kind: AlertKind::Alert,
                message: format!(
                    "CPU Load above 50% on average for the past {} minutes (mean = {}%, stdev = {}%).",
                    window_minutes(first, last),
                    (avg * 100.0).ceil() as i64,
                    (dev * 100.0).round() as i64
                ),
            });

            alerting = true;
        }
    }

    events
}

fn mean(samples: &[LoadSample]) -> f64 {
    samples.iter().map(|sample| sample.load).sum::<f64>() / samples.len() as f64
}

/// Population standard deviation around a precomputed mean.
fn stdev(samples: &[LoadSample], mean: f64) -> f64 {
    (samples
        .iter()
        .map(|sample| (sample.load - mean).powi(2))
        .sum::<f64>()
        / samples.len() as f64)
        .sqrt()
}

fn window_minutes(first: &LoadSample, last: &LoadSample) -> i64 {
    ((last.timestamp - first.timestamp) as f64 / 60_000.0).round() as i64
}
