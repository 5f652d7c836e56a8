//! Typed access to the timer's persisted entities.
//!
//! Key names and default values live here and nowhere else. Reads validate
//! what they find: a value that is present but out of range is logged and
//! replaced by its default instead of failing the caller.

use crate::error::StoreError;
use crate::pomodoro::pomodoro::{Durations, MAX_POMODORO_COUNTER, PhaseState, Stage};
use crate::store::kv::KeyValueStore;
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::{info, warn};

pub const TIME_KEY: &str = "time";
pub const POMODORO_KEY: &str = "pomodoro";
pub const SHORT_BREAK_KEY: &str = "shortBreak";
pub const LONG_BREAK_KEY: &str = "longBreak";
pub const COUNTER_KEY: &str = "pomodoroCounter";
pub const STAGE_KEY: &str = "stage";

fn duration_key(stage: Stage) -> &'static str {
    match stage {
        Stage::Pomodoro => POMODORO_KEY,
        Stage::ShortBreak => SHORT_BREAK_KEY,
        Stage::LongBreak => LONG_BREAK_KEY,
    }
}

#[derive(Clone)]
pub struct TimerRepository {
    store: Arc<dyn KeyValueStore>,
}

impl TimerRepository {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Writes the default of every key that is absent. Existing values are
    /// left alone, so running this on every start is safe.
    ///
    /// Returns the keys that were written.
    pub async fn initialize(&self, now: i64) -> Result<Vec<&'static str>, StoreError> {
        let defaults = Durations::default();
        let wanted: [(&'static str, Value); 6] = [
            (TIME_KEY, json!(now)),
            (POMODORO_KEY, json!(defaults.pomodoro)),
            (SHORT_BREAK_KEY, json!(defaults.short_break)),
            (LONG_BREAK_KEY, json!(defaults.long_break)),
            (COUNTER_KEY, json!(0)),
            (STAGE_KEY, json!(Stage::Pomodoro.as_str())),
        ];

        let mut missing = Vec::new();
        for (key, value) in wanted {
            if self.store.get(key).await?.is_none() {
                missing.push((key, value));
            }
        }

        if !missing.is_empty() {
            self.store.set_many(&missing).await?;
            info!(keys = ?missing.iter().map(|(k, _)| *k).collect::<Vec<_>>(), "initialized missing settings");
        }
        Ok(missing.into_iter().map(|(key, _)| key).collect())
    }

    pub async fn stage(&self) -> Result<Stage, StoreError> {
        let raw = self.store.get(STAGE_KEY).await?;
        Ok(match raw.as_ref().and_then(Value::as_str).and_then(Stage::parse) {
            Some(stage) => stage,
            None => {
                warn!(key = STAGE_KEY, value = ?raw, "invalid stage in store, using pomodoro");
                Stage::Pomodoro
            }
        })
    }

    pub async fn phase_state(&self) -> Result<PhaseState, StoreError> {
        let stage = self.stage().await?;
        let raw = self.store.get(COUNTER_KEY).await?;
        let pomodoro_counter = match raw
            .as_ref()
            .and_then(Value::as_u64)
            .filter(|c| *c <= u64::from(MAX_POMODORO_COUNTER))
        {
            Some(counter) => counter as u8,
            None => {
                warn!(key = COUNTER_KEY, value = ?raw, "invalid pomodoro counter in store, using 0");
                0
            }
        };
        Ok(PhaseState {
            stage,
            pomodoro_counter,
        })
    }

    /// Persists a phase together with the timestamp it started at.
    pub async fn put_phase_state(&self, phase: PhaseState, started_at: i64) -> Result<(), StoreError> {
        self.store
            .set_many(&[
                (STAGE_KEY, json!(phase.stage.as_str())),
                (COUNTER_KEY, json!(phase.pomodoro_counter)),
                (TIME_KEY, json!(started_at)),
            ])
            .await
    }

    pub async fn duration_for(&self, stage: Stage) -> Result<i64, StoreError> {
        let key = duration_key(stage);
        let raw = self.store.get(key).await?;
        Ok(valid_duration(key, raw, Durations::default().for_stage(stage)))
    }

    pub async fn durations(&self) -> Result<Durations, StoreError> {
        Ok(Durations {
            pomodoro: self.duration_for(Stage::Pomodoro).await?,
            short_break: self.duration_for(Stage::ShortBreak).await?,
            long_break: self.duration_for(Stage::LongBreak).await?,
        })
    }

    pub async fn put_durations(&self, durations: Durations) -> Result<(), StoreError> {
        self.store
            .set_many(&[
                (POMODORO_KEY, json!(durations.pomodoro)),
                (SHORT_BREAK_KEY, json!(durations.short_break)),
                (LONG_BREAK_KEY, json!(durations.long_break)),
            ])
            .await
    }

    /// `None` when the timestamp is absent or not an integer.
    pub async fn last_notified(&self) -> Result<Option<i64>, StoreError> {
        let raw = self.store.get(TIME_KEY).await?;
        let parsed = raw.as_ref().and_then(Value::as_i64);
        if parsed.is_none() {
            warn!(key = TIME_KEY, value = ?raw, "invalid last-notified timestamp in store");
        }
        Ok(parsed)
    }

    pub async fn put_last_notified(&self, at: i64) -> Result<(), StoreError> {
        self.store.set(TIME_KEY, json!(at)).await
    }

    /// Restores default durations and the first phase of a cycle in one write.
    pub async fn reset(&self, now: i64) -> Result<(), StoreError> {
        let defaults = Durations::default();
        let phase = PhaseState::default();
        self.store
            .set_many(&[
                (POMODORO_KEY, json!(defaults.pomodoro)),
                (SHORT_BREAK_KEY, json!(defaults.short_break)),
                (LONG_BREAK_KEY, json!(defaults.long_break)),
                (STAGE_KEY, json!(phase.stage.as_str())),
                (COUNTER_KEY, json!(phase.pomodoro_counter)),
                (TIME_KEY, json!(now)),
            ])
            .await
    }
}

fn valid_duration(key: &str, raw: Option<Value>, default: i64) -> i64 {
    match raw.as_ref().and_then(Value::as_i64).filter(|secs| *secs > 0) {
        Some(secs) => secs,
        None => {
            warn!(key, value = ?raw, default, "invalid duration in store, using default");
            default
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::kv::MemoryStore;

    fn repo() -> (Arc<MemoryStore>, TimerRepository) {
        let store = Arc::new(MemoryStore::default());
        (store.clone(), TimerRepository::new(store))
    }

    #[tokio::test]
    async fn test_initialize_writes_all_defaults() {
        let (store, repo) = repo();
        let written = repo.initialize(1_000).await.unwrap();
        assert_eq!(written.len(), 6);

        let values = store.snapshot();
        assert_eq!(values[TIME_KEY], json!(1_000));
        assert_eq!(values[POMODORO_KEY], json!(1500));
        assert_eq!(values[SHORT_BREAK_KEY], json!(300));
        assert_eq!(values[LONG_BREAK_KEY], json!(600));
        assert_eq!(values[COUNTER_KEY], json!(0));
        assert_eq!(values[STAGE_KEY], json!("pomodoro"));
    }

    #[tokio::test]
    async fn test_initialize_is_idempotent() {
        let (store, repo) = repo();
        repo.initialize(1_000).await.unwrap();
        let first = store.snapshot();
        let writes = store.writes();

        let written = repo.initialize(9_999).await.unwrap();
        assert!(written.is_empty());
        assert_eq!(store.snapshot(), first);
        assert_eq!(store.writes(), writes);
    }

    #[tokio::test]
    async fn test_initialize_keeps_existing_values() {
        let (store, repo) = repo();
        store.set(STAGE_KEY, json!("longBreak")).await.unwrap();
        store.set(POMODORO_KEY, json!(3000)).await.unwrap();

        let written = repo.initialize(5).await.unwrap();
        assert_eq!(written.len(), 4);
        assert_eq!(repo.stage().await.unwrap(), Stage::LongBreak);
        assert_eq!(repo.duration_for(Stage::Pomodoro).await.unwrap(), 3000);
    }

    #[tokio::test]
    async fn test_corrupt_values_fall_back_to_defaults() {
        let (store, repo) = repo();
        store.set(STAGE_KEY, json!("lunch")).await.unwrap();
        store.set(COUNTER_KEY, json!(7)).await.unwrap();
        store.set(SHORT_BREAK_KEY, json!(-20)).await.unwrap();
        store.set(LONG_BREAK_KEY, json!("ten")).await.unwrap();

        assert_eq!(repo.phase_state().await.unwrap(), PhaseState::default());
        let durations = repo.durations().await.unwrap();
        assert_eq!(durations.short_break, 300);
        assert_eq!(durations.long_break, 600);
    }

    #[tokio::test]
    async fn test_put_phase_state_writes_pair_and_timestamp_at_once() {
        let (store, repo) = repo();
        let phase = PhaseState {
            stage: Stage::ShortBreak,
            pomodoro_counter: 2,
        };
        repo.put_phase_state(phase, 42).await.unwrap();

        assert_eq!(store.writes(), 1);
        assert_eq!(repo.phase_state().await.unwrap(), phase);
        assert_eq!(repo.last_notified().await.unwrap(), Some(42));
    }

    #[tokio::test]
    async fn test_reset_restores_everything() {
        let (_store, repo) = repo();
        repo.put_durations(Durations {
            pomodoro: 60,
            short_break: 60,
            long_break: 60,
        })
        .await
        .unwrap();
        repo.put_phase_state(
            PhaseState {
                stage: Stage::LongBreak,
                pomodoro_counter: 0,
            },
            10,
        )
        .await
        .unwrap();

        repo.reset(500).await.unwrap();
        assert_eq!(repo.durations().await.unwrap(), Durations::default());
        assert_eq!(repo.phase_state().await.unwrap(), PhaseState::default());
        assert_eq!(repo.last_notified().await.unwrap(), Some(500));
    }

    #[tokio::test]
    async fn test_store_failure_propagates() {
        let (store, repo) = repo();
        store.set_unavailable(true);
        assert!(repo.phase_state().await.is_err());
        assert!(repo.initialize(1).await.is_err());
    }
}
