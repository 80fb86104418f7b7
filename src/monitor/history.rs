use serde::{Deserialize, Serialize};

/// One utilization measurement. Immutable once appended to history.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LoadSample {
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
    /// Fraction of non-idle CPU time over the sampling interval, in [0, 1].
    pub load: f64,
}

/// Append-only, chronologically ordered sample log.
///
/// Timestamps are kept non-decreasing; a sample carrying an earlier wall
/// clock than its predecessor (clock stepped backwards between ticks) is
/// clamped up to the predecessor's timestamp.
#[derive(Debug)]
pub struct LoadHistory {
    samples: Vec<LoadSample>,
    retention_ms: Option<i64>,
}

impl LoadHistory {
    pub fn new() -> Self {
        Self {
            samples: Vec::new(),
            retention_ms: None,
        }
    }

    /// Bounded variant: samples older than the newest timestamp minus
    /// `retention_ms` are evicted on push. Retention must exceed every
    /// window any consumer reads, which config validation enforces.
    pub fn with_retention_ms(retention_ms: i64) -> Self {
        Self {
            samples: Vec::new(),
            retention_ms: Some(retention_ms),
        }
    }

    pub fn push(&mut self, mut sample: LoadSample) {
        if let Some(last) = self.samples.last() {
            if sample.timestamp < last.timestamp {
                log::warn!(
                    "history_timestamp_clamped sample={} previous={}",
                    sample.timestamp,
                    last.timestamp
                );
                sample.timestamp = last.timestamp;
            }
        }

        self.samples.push(sample);

        if let Some(retention_ms) = self.retention_ms {
            let cutoff = sample.timestamp - retention_ms;
            let keep_from = self
                .samples
                .partition_point(|sample| sample.timestamp < cutoff);
            if keep_from > 0 {
                self.samples.drain(..keep_from);
            }
        }
    }

    /// Samples with `timestamp >= threshold_ms`, oldest first.
    pub fn since(&self, threshold_ms: i64) -> &[LoadSample] {
        let start = self
            .samples
            .partition_point(|sample| sample.timestamp < threshold_ms);
        &self.samples[start..]
    }

    pub fn all(&self) -> &[LoadSample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}
