use rasc_distributions::Distribution;

use crate::error::SynthesisError;

/// Grid resolution factor: `grid_points = GRID_POINTS_PER_UNIT * upper_bound`,
/// matching `N = int(100 * upper_bound)` in the source algorithm.
const GRID_POINTS_PER_UNIT: usize = 100;

/// V-optimal segmentation of `[0, upper_bound]` into `num_polls` polls that
/// minimize the expected detection delay, via dynamic programming over a
/// discretized grid.
///
/// Cost of ending a segment `[x_i, x_j]` is `x_j*(F(x_j)-F(x_i)) -
/// (M(x_j)-M(x_i))`, where `F` is the (grid-conditioned) CDF and `M` is the
/// cumulative first moment; this is the closed form for
/// `E[x_j - X ; X in (x_i, x_j]]`, the expected wait until the poll at `x_j`
/// detects an event that happened in that segment.
pub fn vopt_interval(
    dist: &Distribution,
    num_polls: usize,
    upper_bound: f64,
) -> Result<Vec<f64>, SynthesisError> {
    if num_polls == 0 {
        return Ok(Vec::new());
    }
    if !upper_bound.is_finite() || upper_bound <= 0.0 {
        return Err(SynthesisError::NonFiniteUpperBound);
    }

    let grid_points = (GRID_POINTS_PER_UNIT as f64 * upper_bound).max(num_polls as f64 + 1.0) as usize;
    let n = grid_points.max(2);

    let x: Vec<f64> = (0..n).map(|i| upper_bound * i as f64 / (n as f64 - 1.0)).collect();
    let f_raw: Vec<f64> = x.iter().map(|&xi| dist.pdf(xi)).collect();

    let mass = trapz(&f_raw, &x);
    if mass <= 0.0 {
        return Err(SynthesisError::DpFailed { num_polls, grid_points: n });
    }
    let f: Vec<f64> = f_raw.iter().map(|v| v / mass).collect();

    let mut cdf = cumtrapz(&f, &x);
    let last = *cdf.last().unwrap();
    if last > 0.0 {
        for v in cdf.iter_mut() {
            *v /= last;
        }
    }

    let tf: Vec<f64> = x.iter().zip(f.iter()).map(|(xi, fi)| xi * fi).collect();
    let moment = cumtrapz(&tf, &x);

    let inf = f64::INFINITY;
    let mut dp = vec![vec![inf; n]; num_polls + 1];
    let mut prv = vec![vec![-1_i64; n]; num_polls + 1];
    dp[0][0] = 0.0;

    for m in 1..=num_polls {
        for j in m..n {
            let fj = cdf[j];
            let mj = moment[j];
            let xj = x[j];
            let mut best_cost = inf;
            let mut best_i = -1_i64;
            for i in (m - 1)..j {
                if !dp[m - 1][i].is_finite() {
                    continue;
                }
                let seg_prob = fj - cdf[i];
                let seg_m1 = mj - moment[i];
                let c_ij = xj * seg_prob - seg_m1;
                let cand = dp[m - 1][i] + c_ij;
                if cand < best_cost {
                    best_cost = cand;
                    best_i = i as i64;
                }
            }
            dp[m][j] = best_cost;
            prv[m][j] = best_i;
        }
    }

    if !dp[num_polls][n - 1].is_finite() {
        return Err(SynthesisError::DpFailed { num_polls, grid_points: n });
    }

    let mut cuts = vec![n - 1];
    let mut m = num_polls;
    let mut j = n - 1;
    while m > 0 {
        let i = prv[m][j];
        if i < 0 {
            return Err(SynthesisError::DpFailed { num_polls, grid_points: n });
        }
        j = i as usize;
        cuts.push(j);
        m -= 1;
    }
    cuts.reverse();

    let polls: Vec<f64> = cuts[1..].iter().map(|&idx| x[idx]).collect();
    Ok(polls)
}

/// Trapezoidal integral of `y` over `x`.
fn trapz(y: &[f64], x: &[f64]) -> f64 {
    y.windows(2)
        .zip(x.windows(2))
        .map(|(yw, xw)| 0.5 * (yw[0] + yw[1]) * (xw[1] - xw[0]))
        .sum()
}

/// Cumulative trapezoidal integral with the convention `out[0] = 0`.
fn cumtrapz(y: &[f64], x: &[f64]) -> Vec<f64> {
    let mut out = vec![0.0; y.len()];
    let mut acc = 0.0;
    for i in 1..y.len() {
        acc += 0.5 * (y[i] + y[i - 1]) * (x[i] - x[i - 1]);
        out[i] = acc;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn produces_requested_number_of_polls_ending_at_upper_bound() {
        let dist = Distribution::Uniform { low: 0.0, high: 10.0 };
        let polls = vopt_interval(&dist, 4, 10.0).unwrap();
        assert_eq!(polls.len(), 4);
        assert!((polls[polls.len() - 1] - 10.0).abs() < 1e-6);
        for w in polls.windows(2) {
            assert!(w[1] >= w[0]);
        }
    }

    #[test]
    fn zero_polls_is_empty() {
        let dist = Distribution::Uniform { low: 0.0, high: 10.0 };
        assert!(vopt_interval(&dist, 0, 10.0).unwrap().is_empty());
    }

    #[test]
    fn rejects_non_finite_upper_bound() {
        let dist = Distribution::Uniform { low: 0.0, high: 10.0 };
        assert!(vopt_interval(&dist, 3, f64::NAN).is_err());
    }
}
