use std::fs;

use thiserror::Error;

use super::history::LoadSample;

const PROC_STAT_PATH: &str = "/proc/stat";

/// Cumulative CPU time accounting summed across all cores since boot,
/// in jiffies. `total` is the sum of every column of the aggregate
/// `cpu` line; `idle` is the idle column alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CounterSnapshot {
    pub(crate) total: u64,
    pub(crate) idle: u64,
}

#[derive(Debug, Error)]
pub enum SampleError {
    #[error("failed to read {PROC_STAT_PATH}: {0}")]
    Read(#[from] std::io::Error),
    #[error("unexpected {PROC_STAT_PATH} contents: {0}")]
    Parse(String),
}

pub trait CounterSource {
    fn read(&mut self) -> Result<CounterSnapshot, SampleError>;
}

/// Reads the aggregate `cpu ` line of /proc/stat.
pub struct ProcStatSource;

impl ProcStatSource {
    pub fn new() -> Self {
        Self
    }

    fn parse(content: &str) -> Result<CounterSnapshot, SampleError> {
        let line = content
            .lines()
            .find(|line| line.starts_with("cpu "))
            .ok_or_else(|| SampleError::Parse("missing aggregate cpu line".to_string()))?;

        let mut total: u64 = 0;
        let mut idle: Option<u64> = None;

        for (index, field) in line.split_whitespace().skip(1).enumerate() {
            let value: u64 = field.parse().map_err(|_| {
                SampleError::Parse(format!("non-numeric cpu field: {:?}", field))
            })?;

            total = total.saturating_add(value);
            if index == 3 {
                idle = Some(value);
            }
        }

        match idle {
            Some(idle) => Ok(CounterSnapshot { total, idle }),
            None => Err(SampleError::Parse(
                "aggregate cpu line has fewer than 4 fields".to_string(),
            )),
        }
    }
}

impl CounterSource for ProcStatSource {
    fn read(&mut self) -> Result<CounterSnapshot, SampleError> {
        let content = fs::read_to_string(PROC_STAT_PATH)?;
        Self::parse(&content)
    }
}

/// Converts successive counter snapshots into utilization samples.
///
/// The previous snapshot is the only persistent sampler state; it is seeded
/// by one read at construction, before any sample is produced, and every
/// `sample` call measures the interval since the call before it. Callers
/// must drive `sample` from a single ticker task.
pub struct Sampler<S: CounterSource> {
    source: S,
    last: CounterSnapshot,
}

impl<S: CounterSource> Sampler<S> {
    pub fn new(mut source: S) -> Result<Self, SampleError> {
        let last = source.read()?;
        Ok(Self { source, last })
    }

    pub fn sample(&mut self, now_ms: i64) -> Result<LoadSample, SampleError> {
        let current = self.source.read()?;

        if current.total < self.last.total || current.idle < self.last.idle {
            log::warn!(
                "cpu_counters_went_backwards total={} previous_total={} idle={} previous_idle={}",
                current.total,
                self.last.total,
                current.idle,
                self.last.idle
            );
        }

        // Counter resets collapse to a zero delta and report an idle interval.
        let delta_total = current.total.saturating_sub(self.last.total);
        let delta_idle = current.idle.saturating_sub(self.last.idle);

        self.last = current;

        let load = if delta_total == 0 {
            0.0
        } else {
            1.0 - (delta_idle as f64 / delta_total as f64)
        };

        Ok(LoadSample {
            timestamp: now_ms,
            load,
        })
    }
}

#[cfg(test)]
pub(crate) struct ScriptedSource {
    snapshots: Vec<CounterSnapshot>,
}

#[cfg(test)]
impl ScriptedSource {
    pub(crate) fn new(snapshots: Vec<(u64, u64)>) -> Self {
        Self {
            snapshots: snapshots
                .into_iter()
                .map(|(total, idle)| CounterSnapshot { total, idle })
                .collect(),
        }
    }
}

#[cfg(test)]
impl CounterSource for ScriptedSource {
    fn read(&mut self) -> Result<CounterSnapshot, SampleError> {
        if self.snapshots.is_empty() {
            return Err(SampleError::Parse("scripted snapshots exhausted".to_string()));
        }

        Ok(self.snapshots.remove(0))
    }
}

#[cfg(test)]
mod tests {
    use super::{CounterSnapshot, ProcStatSource, Sampler, ScriptedSource};

    #[test]
    fn parses_aggregate_cpu_line() {
        let content = "cpu  100 20 30 400 50 0 6 0 0 0\n\
                       cpu0 50 10 15 200 25 0 3 0 0 0\n\
                       intr 12345\n";

        let snapshot = ProcStatSource::parse(content).expect("should parse");
        assert_eq!(
            snapshot,
            CounterSnapshot {
                total: 606,
                idle: 400
            }
        );
    }

    #[test]
    fn rejects_stat_without_cpu_line() {
        let result = ProcStatSource::parse("intr 12345\nctxt 6789\n");
        assert!(result.is_err());
    }

    #[test]
    fn rejects_truncated_cpu_line() {
        let result = ProcStatSource::parse("cpu  100 20 30\n");
        assert!(result.is_err());
    }

    #[test]
    fn computes_load_from_counter_deltas() {
        let source = ScriptedSource::new(vec![(1000, 800), (2000, 1050)]);
        let mut sampler = Sampler::new(source).expect("initial snapshot");

        // 1000 jiffies elapsed, 250 of them idle.
        let sample = sampler.sample(42).expect("sample");
        assert_eq!(sample.timestamp, 42);
        assert!((sample.load - 0.75).abs() < f64::EPSILON);
    }

    #[test]
    fn degenerate_interval_reports_zero_load() {
        let source = ScriptedSource::new(vec![(1000, 800), (1000, 800)]);
        let mut sampler = Sampler::new(source).expect("initial snapshot");

        let sample = sampler.sample(0).expect("sample");
        assert_eq!(sample.load, 0.0);
    }

    #[test]
    fn counter_reset_reports_zero_load() {
        let source = ScriptedSource::new(vec![(5000, 4000), (100, 80), (1100, 880)]);
        let mut sampler = Sampler::new(source).expect("initial snapshot");

        let reset = sampler.sample(0).expect("sample across reset");
        assert_eq!(reset.load, 0.0);

        // The reset read becomes the new baseline.
        let next = sampler.sample(1).expect("sample after reset");
        assert!((next.load - 0.2).abs() < f64::EPSILON);
    }

    #[test]
    fn source_failure_propagates() {
        let source = ScriptedSource::new(vec![(1000, 800)]);
        let mut sampler = Sampler::new(source).expect("initial snapshot");

        assert!(sampler.sample(0).is_err());
    }
}
