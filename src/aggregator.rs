//! Per-channel sliding-window aggregation of transaction records.
//!
//! Windows are range-based on elapsed seconds, not row-count-based: a
//! snapshot at `as_of` covers every record with `event_time` in
//! `[as_of - window, as_of]`, both ends inclusive. Aggregates (count,
//! success count) are maintained incrementally so metric retrieval is O(1)
//! amortized; eviction happens from the front of the time-ordered buffer.

use chrono::{DateTime, Duration, Utc};
use std::collections::{HashMap, VecDeque};

use crate::error::OutOfOrderError;
use crate::types::transaction::TransactionRecord;

/// Rolling metrics for one channel at one evaluation instant.
///
/// Rates are floating-point percentages at full precision; rounding is a
/// presentation concern, never done here.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ChannelMetrics {
    pub channel: String,
    pub as_of: DateTime<Utc>,
    /// Count of records inside the trailing window
    pub transactions_per_minute: u64,
    /// 100 * successes / count; 0.0 for an empty window
    pub success_rate: f64,
    /// 100 - success_rate; 0.0 for an empty window
    pub error_rate: f64,
}

#[derive(Debug, Clone, Copy)]
struct WindowEntry {
    event_time: DateTime<Utc>,
    successful: bool,
}

/// Trailing window state for a single channel.
///
/// Created on first record seen for the channel, mutated on every insertion,
/// never destroyed.
#[derive(Debug, Default)]
pub struct ChannelWindow {
    /// Time-ordered buffer, oldest at the front
    entries: VecDeque<WindowEntry>,
    success_count: u64,
    /// Newest event time ever observed for this channel (high-water mark)
    newest_event: Option<DateTime<Utc>>,
}

impl ChannelWindow {
    fn insert(&mut self, entry: WindowEntry) {
        // Common case: in-order append. Out-of-order entries within the
        // tolerance are placed by a bounded scan from the back.
        let mut idx = self.entries.len();
        while idx > 0 && self.entries[idx - 1].event_time > entry.event_time {
            idx -= 1;
        }
        self.entries.insert(idx, entry);

        if entry.successful {
            self.success_count += 1;
        }
        self.newest_event = Some(match self.newest_event {
            Some(t) => t.max(entry.event_time),
            None => entry.event_time,
        });
    }

    /// Remove entries strictly older than `horizon`, keeping running sums
    /// consistent.
    fn evict_older_than(&mut self, horizon: DateTime<Utc>) {
        while let Some(front) = self.entries.front() {
            if front.event_time >= horizon {
                break;
            }
            if front.successful {
                self.success_count -= 1;
            }
            self.entries.pop_front();
        }
    }

    fn metrics(&self, channel: &str, as_of: DateTime<Utc>) -> ChannelMetrics {
        // Fast path: every buffered entry is at or before as_of, so the
        // running sums are exact. A snapshot taken behind the newest event
        // falls back to a scan bounded by the window length.
        let (count, successes) = if self.newest_event.map_or(true, |t| t <= as_of) {
            (self.entries.len() as u64, self.success_count)
        } else {
            let mut count = 0u64;
            let mut successes = 0u64;
            for entry in &self.entries {
                if entry.event_time > as_of {
                    break;
                }
                count += 1;
                if entry.successful {
                    successes += 1;
                }
            }
            (count, successes)
        };

        let (success_rate, error_rate) = if count == 0 {
            (0.0, 0.0)
        } else {
            let success_rate = 100.0 * successes as f64 / count as f64;
            (success_rate, 100.0 - success_rate)
        };

        ChannelMetrics {
            channel: channel.to_string(),
            as_of,
            transactions_per_minute: count,
            success_rate,
            error_rate,
        }
    }

    /// Number of records currently buffered.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Owned table of per-channel window state.
///
/// Within one channel, insertions and snapshot reads must be serialized by
/// the caller (single writer or one lock per shard); operations on distinct
/// channels are independent.
#[derive(Debug)]
pub struct WindowAggregator {
    window: Duration,
    channels: HashMap<String, ChannelWindow>,
}

impl WindowAggregator {
    pub fn new(window_size_seconds: u64) -> Self {
        Self {
            window: Duration::seconds(window_size_seconds.max(1) as i64),
            channels: HashMap::new(),
        }
    }

    /// Add a record to its channel's window.
    ///
    /// Records may arrive slightly out of order; one older than the
    /// channel's newest event by more than the window size is rejected with
    /// [`OutOfOrderError`] so it cannot corrupt the running aggregates.
    pub fn insert(&mut self, record: &TransactionRecord) -> Result<(), OutOfOrderError> {
        let state = self.channels.entry(record.channel.clone()).or_default();

        if let Some(newest) = state.newest_event {
            if record.event_time < newest - self.window {
                return Err(OutOfOrderError {
                    channel: record.channel.clone(),
                    event_time: record.event_time,
                    lag_seconds: (newest - record.event_time).num_seconds(),
                    window_seconds: self.window.num_seconds(),
                });
            }
        }

        state.insert(WindowEntry {
            event_time: record.event_time,
            successful: record.is_successful(),
        });
        let newest = state.newest_event.expect("window has at least one entry");
        state.evict_older_than(newest - self.window);
        Ok(())
    }

    /// Insert an ordered batch. Behavior is identical to repeated single
    /// insertions; rejected records are returned with their errors so the
    /// caller can count them.
    pub fn insert_batch(&mut self, records: &[TransactionRecord]) -> Vec<OutOfOrderError> {
        records
            .iter()
            .filter_map(|record| self.insert(record).err())
            .collect()
    }

    /// Current rolling metrics for one channel over `[as_of - window, as_of]`.
    ///
    /// Returns `None` for a channel that has never seen a record. Advances
    /// eviction to `as_of`, so `as_of` should not move backwards across
    /// calls for the same channel.
    pub fn snapshot(&mut self, channel: &str, as_of: DateTime<Utc>) -> Option<ChannelMetrics> {
        let window = self.window;
        let state = self.channels.get_mut(channel)?;
        state.evict_older_than(as_of - window);
        Some(state.metrics(channel, as_of))
    }

    /// Point-in-time metrics for every known channel, sorted by channel id.
    ///
    /// The returned values are owned copies; the evaluation pass never
    /// aliases live window state.
    pub fn snapshot_all(&mut self, as_of: DateTime<Utc>) -> Vec<ChannelMetrics> {
        let window = self.window;
        let mut snapshots: Vec<ChannelMetrics> = self
            .channels
            .iter_mut()
            .map(|(channel, state)| {
                state.evict_older_than(as_of - window);
                state.metrics(channel, as_of)
            })
            .collect();
        snapshots.sort_by(|a, b| a.channel.cmp(&b.channel));
        snapshots
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    pub fn window_seconds(&self) -> i64 {
        self.window.num_seconds()
    }
}
