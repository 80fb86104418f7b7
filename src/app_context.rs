use std::sync::Arc;

use tokio::sync::{broadcast, Mutex};

use crate::config::Config;
use crate::monitor::LoadHistory;

/// Payloads queued per subscriber before a laggard starts losing ticks.
const UPDATE_CHANNEL_CAPACITY: usize = 16;

/// Shared state handed to the tick job and every connection handler.
#[derive(Clone)]
pub struct AppContext {
    pub config: Config,
    pub history: Arc<Mutex<LoadHistory>>,
    pub updates: broadcast::Sender<String>,
}

impl AppContext {
    pub fn new(config: Config) -> Self {
        let history = match config.retention_ms() {
            Some(retention_ms) => LoadHistory::with_retention_ms(retention_ms),
            None => LoadHistory::new(),
        };

        let (updates, _) = broadcast::channel(UPDATE_CHANNEL_CAPACITY);

        Self {
            config,
            history: Arc::new(Mutex::new(history)),
            updates,
        }
    }
}
