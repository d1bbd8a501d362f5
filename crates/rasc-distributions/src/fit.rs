use crate::distribution::Distribution;

/// Fits each of the four candidate families to `data` by maximum likelihood
/// (or, for uniform, the exact MLE of `(min, max)`), mirroring
/// `get_best_distribution`'s `dist.fit(data)` call per family.
pub fn fit_all(data: &[f64]) -> Vec<Distribution> {
    vec![
        fit_uniform(data),
        fit_normal(data),
        fit_gamma(data),
        fit_genlogistic(data),
    ]
}

fn fit_uniform(data: &[f64]) -> Distribution {
    let low = data.iter().cloned().fold(f64::INFINITY, f64::min);
    let high = data.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    Distribution::Uniform { low, high }
}

fn fit_normal(data: &[f64]) -> Distribution {
    let n = data.len() as f64;
    let mean = data.iter().sum::<f64>() / n;
    let var = data.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;
    Distribution::Normal { mean, std_dev: var.sqrt().max(1e-9) }
}

/// Method-of-moments-seeded Minka fixed-point iteration for the gamma shape
/// parameter, standard practice when avoiding a full Newton solve on the
/// digamma equation.
fn fit_gamma(data: &[f64]) -> Distribution {
    let n = data.len() as f64;
    let mean = data.iter().sum::<f64>() / n;
    let mean = mean.max(1e-9);
    let log_mean = mean.ln();
    let mean_log = data.iter().map(|x| x.max(1e-12).ln()).sum::<f64>() / n;
    let s = (log_mean - mean_log).max(1e-9);

    // Thomas Wang's closed-form seed for the Minka fixed point.
    let mut shape = ((3.0 - s + ((s - 3.0).powi(2) + 24.0 * s).sqrt()) / (12.0 * s)).max(1e-6);

    for _ in 0..50 {
        let f = shape.ln() - digamma(shape) - s;
        let fprime = 1.0 / shape - trigamma(shape);
        if fprime.abs() < 1e-12 {
            break;
        }
        let next = shape - f / fprime;
        if !next.is_finite() || next <= 0.0 {
            break;
        }
        let converged = (next - shape).abs() < 1e-10;
        shape = next;
        if converged {
            break;
        }
    }

    let scale = mean / shape;
    Distribution::Gamma { shape: shape.max(1e-6), scale: scale.max(1e-9) }
}

/// Digamma function via the asymptotic series after shifting `x` up by the
/// recurrence `psi(x) = psi(x+1) - 1/x`.
fn digamma(mut x: f64) -> f64 {
    let mut result = 0.0;
    while x < 6.0 {
        result -= 1.0 / x;
        x += 1.0;
    }
    let inv = 1.0 / x;
    let inv2 = inv * inv;
    result + x.ln() - 0.5 * inv
        - inv2 * (1.0 / 12.0 - inv2 * (1.0 / 120.0 - inv2 / 252.0))
}

/// Trigamma function (derivative of digamma), same shift-then-asymptotic
/// approach as `digamma`.
fn trigamma(mut x: f64) -> f64 {
    let mut result = 0.0;
    while x < 6.0 {
        result += 1.0 / (x * x);
        x += 1.0;
    }
    let inv = 1.0 / x;
    let inv2 = inv * inv;
    result + inv + inv2 / 2.0 + inv2 * inv * (1.0 / 6.0 - inv2 * (1.0 / 30.0 - inv2 / 42.0))
}

/// Method-of-moments seed refined by a few gradient-ascent steps on the
/// log-likelihood; generalized logistic has no closed-form MLE
/// (`scipy.stats.genlogistic.fit` solves it numerically too).
fn fit_genlogistic(data: &[f64]) -> Distribution {
    let n = data.len() as f64;
    let mean = data.iter().sum::<f64>() / n;
    let var = (data.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n).max(1e-9);

    let mut shape = 1.0_f64;
    let mut scale = (var * 3.0 / (std::f64::consts::PI * std::f64::consts::PI)).sqrt().max(1e-6);
    let mut loc = mean - scale * digamma(shape);

    for _ in 0..25 {
        let (grad_loc, grad_scale, grad_shape) = genlogistic_gradient(data, loc, scale, shape);
        let step = 1.0 / n.max(1.0);
        let next_loc = loc + step * grad_loc * scale;
        let next_scale = (scale + step * grad_scale * scale).max(1e-6);
        let next_shape = (shape + step * grad_shape).max(1e-6);
        if !next_loc.is_finite() || !next_scale.is_finite() || !next_shape.is_finite() {
            break;
        }
        loc = next_loc;
        scale = next_scale;
        shape = next_shape;
    }

    Distribution::GeneralizedLogistic { loc, scale, shape }
}

fn genlogistic_gradient(data: &[f64], loc: f64, scale: f64, shape: f64) -> (f64, f64, f64) {
    let n = data.len() as f64;
    let mut d_loc = 0.0;
    let mut d_scale = 0.0;
    let mut d_shape = 0.0;
    for &x in data {
        let z = (x - loc) / scale;
        let e = (-z).exp();
        let s = 1.0 / (1.0 + e);
        d_loc += ((shape + 1.0) * s - 1.0) / scale;
        d_scale += (z * ((shape + 1.0) * s - 1.0) + 1.0) / scale;
        d_shape += -(1.0 + e).ln() + 1.0 / shape;
    }
    (d_loc / n, d_scale / n, d_shape / n)
}
