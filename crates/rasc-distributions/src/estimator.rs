use crate::distribution::Distribution;
use crate::error::EstimationError;
use crate::fit::fit_all;
use crate::ks::ks_test;

/// Result of a distribution fit: the selected family plus the KS score it
/// won with, so callers can log or threshold on fit quality.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitResult {
    pub distribution: Distribution,
    pub ks_statistic: f64,
    pub p_value: f64,
}

/// Fits every candidate family to `data` and selects the one with the
/// highest KS p-value, following `get_best_distribution`'s
/// `max(dist_results, key=lambda item: item[1])` selection rule.
///
/// Ties are broken by the candidate list's fixed enumeration order
/// (uniform, normal, gamma, generalized-logistic), matching the original's
/// `max` over a list built in that order, since Rust's `Iterator::max_by`
/// prefers the *last* maximal element, not the first.
pub fn fit_best(data: &[f64]) -> Result<FitResult, EstimationError> {
    if data.is_empty() {
        return Err(EstimationError::EmptySample);
    }
    for (index, &value) in data.iter().enumerate() {
        if !value.is_finite() {
            return Err(EstimationError::NonFiniteSample { index, value });
        }
    }

    let mut distinct = data.to_vec();
    distinct.sort_by(|a, b| a.partial_cmp(b).unwrap());
    distinct.dedup();
    if distinct.len() == 1 {
        let v = distinct[0];
        tracing::debug!(value = v, "degenerate sample, skipping fit");
        let distribution = Distribution::Uniform { low: 0.0, high: v.max(f64::EPSILON) };
        let (ks_statistic, p_value) = ks_test(data, &distribution);
        return Ok(FitResult { distribution, ks_statistic, p_value });
    }

    let candidates = fit_all(data);
    let mut best: Option<FitResult> = None;
    for candidate in candidates {
        let (ks_statistic, p_value) = ks_test(data, &candidate);
        if !p_value.is_finite() {
            continue;
        }
        let replace = match &best {
            None => true,
            Some(current) => p_value > current.p_value,
        };
        if replace {
            best = Some(FitResult { distribution: candidate, ks_statistic, p_value });
        }
    }

    let best = best.ok_or(EstimationError::NoFiniteFit)?;
    tracing::debug!(
        family = best.distribution.family_name(),
        p_value = best.p_value,
        "selected best fitting distribution"
    );
    Ok(best)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn degenerate_sample_yields_uniform_zero_to_value() {
        let data = vec![42.0; 10];
        let result = fit_best(&data).unwrap();
        assert_eq!(result.distribution, Distribution::Uniform { low: 0.0, high: 42.0 });
    }

    #[test]
    fn empty_sample_is_an_error() {
        let err = fit_best(&[]).unwrap_err();
        assert!(matches!(err, EstimationError::EmptySample));
    }

    #[test]
    fn non_finite_sample_is_an_error() {
        let data = vec![1.0, 2.0, f64::NAN];
        let err = fit_best(&data).unwrap_err();
        assert!(matches!(err, EstimationError::NonFiniteSample { index: 2, .. }));
    }

    #[test]
    fn uniform_samples_select_uniform_family() {
        // evenly spaced samples should score best against the uniform candidate.
        let data: Vec<f64> = (1..=500).map(|i| i as f64 / 501.0 * 100.0).collect();
        let result = fit_best(&data).unwrap();
        assert_eq!(result.distribution.family_name(), "uniform");
    }
}
