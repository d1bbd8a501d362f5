use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use rasc_distributions::{fit_best, Distribution};

use crate::drift::{DriftStatus, DriftWindow};
use crate::error::DriftError;
use crate::sample_history::SampleHistory;

/// Identifies one action's duration history: the device it belongs to and
/// the action performed on it (e.g. `("front_door", "open")`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ActionKey {
    pub entity_id: String,
    pub action: String,
}

impl ActionKey {
    pub fn new(entity_id: impl Into<String>, action: impl Into<String>) -> Self {
        Self { entity_id: entity_id.into(), action: action.into() }
    }

    fn display(&self) -> String {
        format!("{}.{}", self.entity_id, self.action)
    }
}

struct Shard {
    history: SampleHistory,
    drift: DriftWindow,
    last_fit: Option<Distribution>,
}

impl Shard {
    fn new() -> Self {
        Self { history: SampleHistory::new(), drift: DriftWindow::new(), last_fit: None }
    }
}

/// Outcome of recording one new observed duration: the latest drift verdict
/// and, when enough samples exist, a fresh distribution fit.
#[derive(Debug, Clone)]
pub struct Observation {
    pub drift_status: DriftStatus,
    pub distribution: Option<Distribution>,
}

/// Thread-safe store of per-action sample histories and drift windows.
///
/// Single-writer-per-shard discipline: each `(entity_id, action)` pair owns
/// an independent `RwLock`, so concurrent updates to different actions never
/// contend. The outer `Mutex` is taken only to insert a shard the first time
/// an action is observed.
pub struct HistoryStore {
    shards: Mutex<HashMap<ActionKey, Arc<RwLock<Shard>>>>,
    min_samples_to_fit: usize,
}

impl HistoryStore {
    pub fn new() -> Self {
        Self::with_min_samples(5)
    }

    pub fn with_min_samples(min_samples_to_fit: usize) -> Self {
        Self { shards: Mutex::new(HashMap::new()), min_samples_to_fit }
    }

    fn shard_for(&self, key: &ActionKey) -> Arc<RwLock<Shard>> {
        let mut shards = self.shards.lock().expect("history store mutex poisoned");
        shards.entry(key.clone()).or_insert_with(|| Arc::new(RwLock::new(Shard::new()))).clone()
    }

    /// Records a newly observed duration for `key`, returning the drift
    /// verdict and (once enough samples have accumulated) a fresh fit.
    pub fn observe(&self, key: &ActionKey, duration_secs: f64) -> Result<Observation, DriftError> {
        let shard = self.shard_for(key);
        let mut guard = shard.write().expect("shard lock poisoned");
        guard.history.push(&key.display(), duration_secs)?;

        if guard.history.len() < self.min_samples_to_fit {
            return Ok(Observation { drift_status: DriftStatus::Training, distribution: None });
        }

        let sample = guard.history.as_slice().to_vec();
        let fit = match fit_best(&sample) {
            Ok(result) => result.distribution,
            Err(err) => {
                tracing::warn!(action = %key.display(), error = %err, "estimation failed, keeping previous fit");
                return Ok(Observation {
                    drift_status: DriftStatus::Training,
                    distribution: guard.last_fit,
                });
            }
        };

        let (mean, variance) = fit.mean_variance();
        let drift_status = guard.drift.observe(mean, variance);
        guard.last_fit = Some(fit);

        Ok(Observation { drift_status, distribution: Some(fit) })
    }

    pub fn current_fit(&self, key: &ActionKey) -> Option<Distribution> {
        let shard = self.shard_for(key);
        let guard = shard.read().expect("shard lock poisoned");
        guard.last_fit
    }

    pub fn sample_count(&self, key: &ActionKey) -> usize {
        let shard = self.shard_for(key);
        let guard = shard.read().expect("shard lock poisoned");
        guard.history.len()
    }
}

impl Default for HistoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reports_training_below_min_samples() {
        let store = HistoryStore::with_min_samples(5);
        let key = ActionKey::new("front_door", "open");
        for i in 0..3 {
            let obs = store.observe(&key, 10.0 + i as f64).unwrap();
            assert_eq!(obs.drift_status, DriftStatus::Training);
            assert!(obs.distribution.is_none());
        }
    }

    #[test]
    fn fits_once_min_samples_reached() {
        let store = HistoryStore::with_min_samples(5);
        let key = ActionKey::new("front_door", "open");
        let mut last = None;
        for i in 0..10 {
            last = Some(store.observe(&key, 10.0 + (i % 3) as f64).unwrap());
        }
        assert!(last.unwrap().distribution.is_some());
    }

    #[test]
    fn separate_actions_do_not_share_history() {
        let store = HistoryStore::with_min_samples(2);
        let a = ActionKey::new("front_door", "open");
        let b = ActionKey::new("front_door", "close");
        store.observe(&a, 5.0).unwrap();
        store.observe(&a, 6.0).unwrap();
        assert_eq!(store.sample_count(&a), 2);
        assert_eq!(store.sample_count(&b), 0);
    }

    #[test]
    fn rejects_out_of_bounds_duration() {
        let store = HistoryStore::new();
        let key = ActionKey::new("thermostat", "set_temp");
        assert!(store.observe(&key, -5.0).is_err());
    }
}
