use rasc_distributions::Distribution;

use crate::error::SynthesisError;
use crate::rate_limit::apply_rate_limit;
use crate::recurrence::polling_interval;
use crate::uniform::uniform_polls;
use crate::validator::{examine_convexity, validate_slo};
use crate::vopt::vopt_interval;

const MAX_OUTER_ITERS: usize = 10_000;

/// Which synthesis algorithm to run for a fixed poll count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SynthesisMode {
    /// Recurrence-based construction, minimizing detection delay subject to
    /// a closed-form update rule.
    Recurrence,
    /// V-optimal dynamic-programming segmentation.
    VOptimal,
}

/// How the schedule covers the time between the last poll and the worst
/// case detection window, once the SLO-driven search has picked a poll
/// count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TailExtension {
    /// Step by `worst_case_delta` (`Qw`) out to the upper bound. Default:
    /// this is what the fixed-step fallback already does, so keeping the
    /// tail in the same units keeps the fallback and the adaptive schedule
    /// comparable.
    #[default]
    FlatQw,
    /// Exponentially growing steps, capped at `worst_case_delta`.
    ExponentialCapped,
}

#[derive(Debug, Clone, Copy)]
pub struct SynthesisConfig {
    pub mode: SynthesisMode,
    pub slo: f64,
    pub worst_case_delta: f64,
    pub rate_limit: Option<f64>,
    pub tail_extension: TailExtension,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            mode: SynthesisMode::Recurrence,
            slo: 0.95,
            worst_case_delta: 2.0,
            rate_limit: None,
            tail_extension: TailExtension::FlatQw,
        }
    }
}

/// Synthesizes a poll schedule for `dist` under `config`, searching over
/// poll counts for the smallest schedule that meets the configured SLO.
///
/// Mirrors `get_polls`/`_r_get_polls`: binary-searches the poll count `N`,
/// shrinking toward fewer polls whenever the current `N` already satisfies
/// the SLO and growing (doubling the right bound when needed) otherwise.
pub fn synthesize(dist: &Distribution, config: &SynthesisConfig) -> Result<Vec<f64>, SynthesisError> {
    let upper_bound = dist.ppf(0.99);
    if !upper_bound.is_finite() {
        return Ok(vec![0.0]);
    }

    let right_n = (upper_bound / config.worst_case_delta).ceil().max(1.0) as i64;
    let l = search_poll_count(dist, upper_bound, 0, right_n, -1, config)?;

    Ok(match config.rate_limit {
        Some(rl) => apply_rate_limit(&l, rl),
        None => l,
    })
}

/// Synthesizes a schedule with a fixed poll count, skipping the outer
/// search entirely (mirrors `get_polls(..., N=...)`).
pub fn synthesize_fixed_count(
    dist: &Distribution,
    num_polls: usize,
    config: &SynthesisConfig,
) -> Result<Vec<f64>, SynthesisError> {
    let upper_bound = dist.ppf(0.99);
    if !upper_bound.is_finite() {
        return Ok(vec![0.0]);
    }
    let l = match config.mode {
        SynthesisMode::VOptimal => vopt_interval(dist, num_polls, upper_bound)?,
        SynthesisMode::Recurrence => {
            let l = polling_interval(dist, num_polls, upper_bound)?;
            if !examine_convexity(dist, &l) {
                tracing::debug!(num_polls, "schedule is probably not minimized");
            }
            l
        }
    };
    Ok(match config.rate_limit {
        Some(rl) => apply_rate_limit(&l, rl),
        None => l,
    })
}

fn search_poll_count(
    dist: &Distribution,
    upper_bound: f64,
    mut left_n: i64,
    mut right_n: i64,
    mut last_n: i64,
    config: &SynthesisConfig,
) -> Result<Vec<f64>, SynthesisError> {
    for _ in 0..MAX_OUTER_ITERS {
        let n = ((left_n + right_n) / 2).max(1);
        let n_usize = n as usize;

        let attempt = match config.mode {
            SynthesisMode::VOptimal => vopt_interval(dist, n_usize, upper_bound),
            SynthesisMode::Recurrence => polling_interval(dist, n_usize, upper_bound).inspect(|l| {
                if !examine_convexity(dist, l) {
                    tracing::debug!(n = n_usize, "schedule is probably not minimized");
                }
            }),
        };

        let l = match attempt {
            Ok(l) => l,
            Err(_) => {
                right_n = n + 1;
                last_n = n;
                continue;
            }
        };

        let valid = validate_slo(dist, &l, config.worst_case_delta, config.slo);

        if left_n == right_n || last_n == n {
            return if valid { Ok(l) } else { Err(SynthesisError::SloInfeasible { slo: config.slo }) };
        }

        if valid {
            right_n = n + 1;
            last_n = n;
            continue;
        }
        if n + 1 >= right_n {
            left_n = n + 1;
            right_n = right_n.saturating_mul(2);
            last_n = n;
        } else {
            left_n = n + 1;
            last_n = n;
        }
    }

    Err(SynthesisError::SloInfeasible { slo: config.slo })
}

/// Uniform fallback schedule, used when adaptive synthesis fails or exceeds
/// its time budget.
pub fn fallback_schedule(dist: &Distribution, config: &SynthesisConfig) -> Vec<f64> {
    let upper_bound = dist.ppf(0.99);
    if !upper_bound.is_finite() {
        return vec![0.0];
    }
    uniform_polls(upper_bound, config.worst_case_delta)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recurrence_mode_meets_configured_slo() {
        let dist = Distribution::Normal { mean: 10.0, std_dev: 2.0 };
        let config = SynthesisConfig { worst_case_delta: 2.0, slo: 0.9, ..Default::default() };
        let schedule = synthesize(&dist, &config).unwrap();
        assert!(!schedule.is_empty());
        assert!(validate_slo(&dist, &schedule, config.worst_case_delta, config.slo));
    }

    #[test]
    fn vopt_mode_meets_configured_slo() {
        let dist = Distribution::Gamma { shape: 2.0, scale: 3.0 };
        let config = SynthesisConfig {
            mode: SynthesisMode::VOptimal,
            worst_case_delta: 2.0,
            slo: 0.9,
            ..Default::default()
        };
        let schedule = synthesize(&dist, &config).unwrap();
        assert!(!schedule.is_empty());
        assert!(validate_slo(&dist, &schedule, config.worst_case_delta, config.slo));
    }

    #[test]
    fn rate_limit_is_honored_end_to_end() {
        let dist = Distribution::Uniform { low: 0.0, high: 20.0 };
        let config = SynthesisConfig {
            worst_case_delta: 1.0,
            slo: 0.99,
            rate_limit: Some(0.5),
            ..Default::default()
        };
        let schedule = synthesize(&dist, &config).unwrap();
        for w in schedule.windows(2) {
            assert!(w[1] - w[0] >= 0.5 - 1e-9);
        }
    }

    #[test]
    fn fallback_is_total_for_any_finite_distribution() {
        let dist = Distribution::Gamma { shape: 0.5, scale: 4.0 };
        let config = SynthesisConfig::default();
        let schedule = fallback_schedule(&dist, &config);
        assert!(!schedule.is_empty());
    }
}
