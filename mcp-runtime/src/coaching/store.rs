use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde_json::Value;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use super::analyzer::PatternLabel;

/// Interval after which every tracked signature is forgotten.
pub const ATTEMPT_RESET_INTERVAL: Duration = Duration::from_secs(10 * 60);

/// Accumulated history of failed calls for one signature.
#[derive(Clone, Debug, PartialEq)]
pub struct AttemptRecord {
    pub count: u32,
    pub last_input: Option<Value>,
    pub error_messages: Vec<String>,
    pub patterns: BTreeSet<PatternLabel>,
    pub first_attempt: DateTime<Utc>,
    pub last_attempt: DateTime<Utc>,
}

impl AttemptRecord {
    fn new(now: DateTime<Utc>) -> Self {
        Self {
            count: 0,
            last_input: None,
            error_messages: Vec::new(),
            patterns: BTreeSet::new(),
            first_attempt: now,
            last_attempt: now,
        }
    }
}

/// Signature → attempt history. Cheap to clone; clones share state.
///
/// Entries never expire individually; the whole map is dropped by
/// [`AttemptStore::clear`], driven from [`spawn_reset_task`].
#[derive(Clone, Debug, Default)]
pub struct AttemptStore {
    records: Arc<Mutex<HashMap<String, AttemptRecord>>>,
}

impl AttemptStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, signature: &str) -> Option<AttemptRecord> {
        let map = self.records.lock().unwrap_or_else(|e| e.into_inner());
        map.get(signature).cloned()
    }

    /// Read-modify-write under the store lock. A missing record is created
    /// with `count == 0`; the updater is expected to bump it.
    pub fn upsert<R>(
        &self,
        signature: &str,
        update: impl FnOnce(&mut AttemptRecord, DateTime<Utc>) -> R,
    ) -> R {
        let now = Utc::now();
        let mut map = self.records.lock().unwrap_or_else(|e| e.into_inner());
        let record = map
            .entry(signature.to_string())
            .or_insert_with(|| AttemptRecord::new(now));
        update(record, now)
    }

    /// Drops every record. Returns how many were dropped.
    pub fn clear(&self) -> usize {
        let mut map = self.records.lock().unwrap_or_else(|e| e.into_inner());
        let dropped = map.len();
        map.clear();
        dropped
    }

    pub fn len(&self) -> usize {
        self.records.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Background task clearing an [`AttemptStore`] on a fixed period.
/// Aborted when dropped.
#[derive(Debug)]
pub struct AttemptResetTask {
    handle: JoinHandle<()>,
}

impl Drop for AttemptResetTask {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Starts the reset loop. The first reset happens one full `period` after
/// the call, not immediately.
pub fn spawn_reset_task(store: AttemptStore, period: Duration) -> AttemptResetTask {
    let handle = tokio::spawn(async move {
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let dropped = store.clear();
            tracing::debug!(dropped, "attempt store reset");
        }
    });
    AttemptResetTask { handle }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn upsert_creates_then_updates_the_same_record() {
        let store = AttemptStore::new();
        assert!(store.get("sig").is_none());

        store.upsert("sig", |record, _| {
            record.count += 1;
            record.last_input = Some(json!({}));
        });
        let count = store.upsert("sig", |record, _| {
            record.count += 1;
            record.count
        });

        assert_eq!(count, 2);
        let record = store.get("sig").unwrap();
        assert_eq!(record.count, 2);
        assert!(record.first_attempt <= record.last_attempt);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn clear_drops_every_record() {
        let store = AttemptStore::new();
        for sig in ["a", "b", "c"] {
            store.upsert(sig, |record, _| record.count += 1);
        }
        assert_eq!(store.clear(), 3);
        assert!(store.is_empty());
        assert!(store.get("a").is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_upserts_do_not_lose_updates() {
        let store = AttemptStore::new();
        let mut handles = Vec::new();
        for i in 0..32 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.upsert("shared", |record, _| {
                    record.count += 1;
                    record.error_messages.push(format!("attempt {i}"));
                });
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        let record = store.get("shared").unwrap();
        assert_eq!(record.count, 32);
        assert_eq!(record.error_messages.len(), 32);
    }

    #[tokio::test(start_paused = true)]
    async fn reset_task_clears_after_each_period() {
        let store = AttemptStore::new();
        let _task = spawn_reset_task(store.clone(), ATTEMPT_RESET_INTERVAL);
        store.upsert("sig", |record, _| record.count += 1);

        tokio::time::sleep(ATTEMPT_RESET_INTERVAL - Duration::from_secs(1)).await;
        assert_eq!(store.len(), 1, "no reset before the period elapses");

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(store.is_empty());

        store.upsert("sig", |record, _| record.count += 1);
        tokio::time::sleep(ATTEMPT_RESET_INTERVAL).await;
        assert!(store.is_empty(), "reset keeps firing every period");
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_the_task_stops_resets() {
        let store = AttemptStore::new();
        let task = spawn_reset_task(store.clone(), Duration::from_secs(60));
        drop(task);
        store.upsert("sig", |record, _| record.count += 1);
        tokio::time::sleep(Duration::from_secs(120)).await;
        assert_eq!(store.len(), 1);
    }
}
