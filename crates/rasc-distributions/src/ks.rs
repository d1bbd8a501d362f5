use crate::distribution::Distribution;

/// One-sample Kolmogorov-Smirnov test of `data` against `dist`, the same
/// check `get_best_distribution` runs per candidate via `scipy.stats.kstest`.
///
/// Returns `(statistic, p_value)`. The p-value comes from the asymptotic
/// Kolmogorov distribution, which is accurate for the sample sizes this
/// estimator is built for (tens to low thousands of observed durations).
pub fn ks_test(data: &[f64], dist: &Distribution) -> (f64, f64) {
    let n = data.len();
    let mut sorted: Vec<f64> = data.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());

    let mut d_stat = 0.0_f64;
    for (i, &x) in sorted.iter().enumerate() {
        let f = dist.cdf(x);
        let d_plus = (i as f64 + 1.0) / n as f64 - f;
        let d_minus = f - i as f64 / n as f64;
        d_stat = d_stat.max(d_plus.max(d_minus));
    }

    let p = ks_p_value(d_stat, n);
    (d_stat, p)
}

/// Asymptotic p-value via the Kolmogorov distribution's survival function.
fn ks_p_value(d: f64, n: usize) -> f64 {
    if n == 0 {
        return 1.0;
    }
    let sqrt_n = (n as f64).sqrt();
    // Small-sample correction from Stephens (1970): effective sample size.
    let lambda = (sqrt_n + 0.12 + 0.11 / sqrt_n) * d;
    if lambda < 0.2 {
        return 1.0;
    }
    let mut sum = 0.0;
    for k in 1..101 {
        let term = if k % 2 == 1 { 1.0 } else { -1.0 };
        sum += term * (-2.0 * (k as f64).powi(2) * lambda * lambda).exp();
    }
    (2.0 * sum).clamp(0.0, 1.0)
}
