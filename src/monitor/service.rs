use chrono::Utc;

use crate::app_context::AppContext;

use super::message::assemble;
use super::sampler::{CounterSource, Sampler};

/// One broadcast tick: sample, append, assemble, publish.
///
/// A failed counter read skips the tick; the next tick simply measures a
/// longer interval, so there is nothing to retry. Publishing with no
/// subscribers is not an error.
pub async fn record_tick<S: CounterSource>(context: &AppContext, sampler: &mut Sampler<S>) {
    let now_ms = Utc::now().timestamp_millis();

    let sample = match sampler.sample(now_ms) {
        Ok(sample) => sample,
        Err(error) => {
            log::warn!("cpu_sample_failed error={}", error);
            return;
        }
    };

    let (payload, history_len) = {
        let mut history = context.history.lock().await;
        history.push(sample);
        (
            assemble(&history, context.config.sample_rate, now_ms),
            history.len(),
        )
    };

    let message = match serde_json::to_string(&payload) {
        Ok(message) => message,
        Err(error) => {
            log::error!("payload_serialization_failed error={}", error);
            return;
        }
    };

    tracing::info!(
        target: "monitor",
        load = sample.load,
        history_len,
        points = payload.points.len(),
        events = payload.events.len(),
        subscribers = context.updates.receiver_count(),
        "sample_tick"
    );

    // Err means no live subscribers right now.
    let _ = context.updates.send(message);
}

#[cfg(test)]
mod tests {
    use crate::app_context::AppContext;
    use crate::config::Config;
    use crate::monitor::sampler::{Sampler, ScriptedSource};

    use super::record_tick;

    fn test_context() -> AppContext {
        AppContext::new(Config {
            listen_addr: "127.0.0.1:0".to_string(),
            sample_rate: 0.1,
            assets_dir: "client".to_string(),
            retention_secs: None,
        })
    }

    #[tokio::test]
    async fn tick_appends_and_broadcasts() {
        let context = test_context();
        let mut subscriber = context.updates.subscribe();

        let source = ScriptedSource::new(vec![(1000, 500), (2000, 1250)]);
        let mut sampler = Sampler::new(source).expect("initial snapshot");

        record_tick(&context, &mut sampler).await;

        assert_eq!(context.history.lock().await.len(), 1);

        let message = subscriber.try_recv().expect("payload broadcast");
        let value: serde_json::Value = serde_json::from_str(&message).expect("valid json");
        assert_eq!(value["points"].as_array().unwrap().len(), 1);
        assert_eq!(value["points"][0]["load"], 0.25);
        assert_eq!(value["events"].as_array().unwrap().len(), 0);
    }

    #[tokio::test]
    async fn failed_sample_skips_tick() {
        let context = test_context();
        let mut subscriber = context.updates.subscribe();

        let source = ScriptedSource::new(vec![(1000, 500)]);
        let mut sampler = Sampler::new(source).expect("initial snapshot");

        record_tick(&context, &mut sampler).await;

        assert_eq!(context.history.lock().await.len(), 0);
        assert!(subscriber.try_recv().is_err());
    }
}
