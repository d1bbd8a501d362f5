//! Per-action sample history and drift monitoring.
//!
//! Each `(entity_id, action)` pair accumulates observed inter-event
//! durations in a [`sample_history::SampleHistory`]; once enough samples
//! exist, [`store::HistoryStore::observe`] refits the duration distribution
//! and runs the result through a [`drift::DriftWindow`] to decide whether
//! the action's behavior is still stable.

mod drift;
mod error;
mod sample_history;
mod store;

pub use drift::{DriftStatus, DriftWindow, RELATIVE_THRESHOLD, WINDOW_CAPACITY};
pub use error::DriftError;
pub use sample_history::{SampleHistory, MAX_DURATION_SECS};
pub use store::{ActionKey, HistoryStore, Observation};
