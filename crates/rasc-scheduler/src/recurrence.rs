use rasc_distributions::Distribution;

use crate::error::SynthesisError;

const MAX_BISECTION_ITERS: usize = 200;
const ISCLOSE_RTOL: f64 = 1e-5;
const ISCLOSE_ATOL: f64 = 1e-8;

fn is_close(a: f64, b: f64) -> bool {
    (a - b).abs() <= ISCLOSE_ATOL + ISCLOSE_RTOL * b.abs()
}

/// Synthesizes `num_polls` poll times in `[0, upper_bound]` via the
/// recurrence `L_n = L_{n-1} + (F(L_{n-1}) - F(L_{n-2})) / f(L_{n-1})`,
/// binary-searching the seed `L1` until the recurrence lands the last poll
/// exactly on `upper_bound`.
///
/// Mirrors `_get_polling_interval`/`_get_polling_interval_r`: each L1 guess
/// either overshoots (the recurrence exceeds `upper_bound` before consuming
/// all `num_polls` steps) or undershoots (it reaches the last poll below
/// `upper_bound`), and the search narrows toward the guess that lands on it.
pub fn polling_interval(
    dist: &Distribution,
    num_polls: usize,
    upper_bound: f64,
) -> Result<Vec<f64>, SynthesisError> {
    if num_polls == 0 {
        return Ok(Vec::new());
    }
    let mut left = 0.0;
    let mut right = upper_bound;

    for _ in 0..MAX_BISECTION_ITERS {
        if left == right {
            return Err(SynthesisError::NoFeasibleL1 { left, right, num_polls });
        }
        let mut l = vec![0.0_f64; num_polls + 1];
        l[1] = (left + right) / 2.0;

        let mut overshoot_at: Option<usize> = None;
        let mut reached = 1usize;
        for n in 2..=num_polls {
            let pdf_prev = dist.pdf(l[n - 1]);
            let cdf_prev = dist.cdf(l[n - 1]);
            if pdf_prev == 0.0 && cdf_prev == 0.0 {
                break;
            }
            l[n] = (dist.cdf(l[n - 1]) - dist.cdf(l[n - 2])) / pdf_prev + l[n - 1];
            reached = n;
            if l[n] > upper_bound {
                overshoot_at = Some(n);
                break;
            }
        }

        if reached == num_polls && is_close(l[num_polls], upper_bound) {
            l[num_polls] = upper_bound;
            return Ok(l[1..].to_vec());
        }

        if overshoot_at.is_some() {
            right = l[1];
        } else {
            left = l[1];
        }
    }

    Err(SynthesisError::NoFeasibleL1 { left, right, num_polls })
}
