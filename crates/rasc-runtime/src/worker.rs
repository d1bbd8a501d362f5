use std::sync::Arc;
use std::time::Duration;

use rasc_distributions::Distribution;
use rasc_scheduler::{fallback_schedule, synthesize, SynthesisConfig};
use tokio::sync::Semaphore;

/// Soft deadline for schedule synthesis; past this, the caller gets the
/// uniform fallback instead of waiting on the V-optimal DP to finish.
pub const MAX_SCHEDULE_TIME: Duration = Duration::from_millis(500);

/// Bounded pool that offloads CPU-heavy schedule synthesis onto blocking
/// threads so it never stalls the async reactor driving probe I/O.
pub struct ScheduleWorkerPool {
    semaphore: Arc<Semaphore>,
}

impl ScheduleWorkerPool {
    pub fn new(max_concurrency: usize) -> Self {
        Self { semaphore: Arc::new(Semaphore::new(max_concurrency.max(1))) }
    }

    /// Synthesizes a schedule for `dist`, falling back to uniform polling
    /// if synthesis errors, panics, or exceeds [`MAX_SCHEDULE_TIME`].
    pub async fn synthesize(&self, dist: Distribution, config: SynthesisConfig) -> Vec<f64> {
        let permit = self
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .expect("worker pool semaphore should never be closed");

        let handle = tokio::task::spawn_blocking(move || {
            let _permit = permit;
            synthesize(&dist, &config)
        });

        match tokio::time::timeout(MAX_SCHEDULE_TIME, handle).await {
            Ok(Ok(Ok(schedule))) => schedule,
            Ok(Ok(Err(err))) => {
                tracing::warn!(error = %err, "synthesis failed, falling back to uniform polling");
                fallback_schedule(&dist, &config)
            }
            Ok(Err(join_err)) => {
                tracing::error!(error = %join_err, "synthesis task panicked, falling back to uniform polling");
                fallback_schedule(&dist, &config)
            }
            Err(_elapsed) => {
                tracing::warn!(budget_ms = MAX_SCHEDULE_TIME.as_millis(), "synthesis exceeded time budget, falling back to uniform polling");
                fallback_schedule(&dist, &config)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rasc_scheduler::validate_slo;

    #[tokio::test]
    async fn successful_synthesis_returns_a_valid_schedule() {
        let pool = ScheduleWorkerPool::new(2);
        let dist = Distribution::Normal { mean: 10.0, std_dev: 2.0 };
        let config = SynthesisConfig { worst_case_delta: 2.0, slo: 0.9, ..Default::default() };
        let schedule = pool.synthesize(dist, config).await;
        assert!(!schedule.is_empty());
        assert!(validate_slo(&dist, &schedule, config.worst_case_delta, config.slo));
    }

    #[tokio::test]
    async fn concurrent_requests_are_all_served() {
        let pool = Arc::new(ScheduleWorkerPool::new(2));
        let dist = Distribution::Uniform { low: 0.0, high: 20.0 };
        let config = SynthesisConfig { worst_case_delta: 2.0, slo: 0.9, ..Default::default() };

        let mut handles = Vec::new();
        for _ in 0..5 {
            let pool = pool.clone();
            handles.push(tokio::spawn(async move { pool.synthesize(dist, config).await }));
        }
        for h in handles {
            assert!(!h.await.unwrap().is_empty());
        }
    }
}
