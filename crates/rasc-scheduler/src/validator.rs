use rasc_distributions::Distribution;

/// Central-difference step used to numerically differentiate the pdf for
/// the convexity check; the source relies on `numdifftools.Derivative` for
/// the same purpose, which this crate has no equivalent dependency for.
const DERIVATIVE_STEP: f64 = 1e-5;

fn pdf_derivative(dist: &Distribution, x: f64) -> f64 {
    let h = DERIVATIVE_STEP.max(x.abs() * DERIVATIVE_STEP);
    (dist.pdf(x + h) - dist.pdf(x - h)) / (2.0 * h)
}

/// Checks that a schedule meets the SLO: the probability that a poll
/// detects an event within `within` seconds of it happening is at least
/// `slo`, subtracting `dist.cdf(0)` from the target the way `_examine_delta`
/// does (mass already at the origin is not something any poll has to
/// "catch").
pub fn validate_slo(dist: &Distribution, schedule: &[f64], within: f64, slo: f64) -> bool {
    if schedule.is_empty() {
        return slo <= dist.cdf(0.0);
    }
    let mut l = Vec::with_capacity(schedule.len() + 1);
    l.push(0.0);
    l.extend_from_slice(schedule);

    let mut prob = 0.0;
    for i in 1..l.len() {
        let window_start = (l[i - 1]).max(l[i] - within);
        prob += dist.cdf(l[i]) - dist.cdf(window_start);
    }
    prob >= slo - dist.cdf(0.0)
}

/// Soft convexity check on the schedule: true when each poll interval is
/// consistent with the pdf not turning upward mid-interval (the condition
/// `2*f(L_i) - (L_{i+1}-L_i)*f'(L_i) > 0`). A `false` result is a warning,
/// not a hard failure: the schedule may still meet its SLO.
pub fn examine_convexity(dist: &Distribution, schedule: &[f64]) -> bool {
    for i in 0..schedule.len() {
        if i == schedule.len() - 1 {
            return true;
        }
        let li = schedule[i];
        let val = 2.0 * dist.pdf(li) - (schedule[i + 1] - li) * pdf_derivative(dist, li);
        if val <= 0.0 {
            return false;
        }
    }
    true
}

/// Expected delay between an event and the poll that detects it, summing
/// `L_i * (F(L_i) - F(L_{i-1}))` over the schedule and subtracting the
/// conditional expectation of the event time itself.
pub fn expected_delay(dist: &Distribution, schedule: &[f64]) -> f64 {
    if schedule.is_empty() {
        return 0.0;
    }
    let mut l = Vec::with_capacity(schedule.len() + 1);
    l.push(0.0);
    l.extend_from_slice(schedule);

    let mut q = 0.0;
    for i in 1..l.len() {
        q += l[i] * (dist.cdf(l[i]) - dist.cdf(l[i - 1]));
    }
    let last = *l.last().unwrap();
    q - dist.expect(|x| x, 0.0, last)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_coverage_schedule_meets_any_slo() {
        let dist = Distribution::Uniform { low: 0.0, high: 10.0 };
        // polling every 1.0 with a 1.0 detection window covers everything.
        let schedule: Vec<f64> = (1..=10).map(|i| i as f64).collect();
        assert!(validate_slo(&dist, &schedule, 1.0, 0.99));
    }

    #[test]
    fn sparse_schedule_fails_a_tight_slo() {
        let dist = Distribution::Uniform { low: 0.0, high: 100.0 };
        let schedule = vec![100.0];
        assert!(!validate_slo(&dist, &schedule, 1.0, 0.99));
    }

    #[test]
    fn expected_delay_is_nonnegative_for_a_monotone_schedule() {
        let dist = Distribution::Normal { mean: 5.0, std_dev: 1.0 };
        let schedule = vec![3.0, 5.0, 7.0, 9.0];
        assert!(expected_delay(&dist, &schedule) >= -1e-6);
    }

    #[test]
    fn convexity_holds_for_a_well_spread_uniform_schedule() {
        let dist = Distribution::Uniform { low: 0.0, high: 10.0 };
        let schedule = vec![2.0, 4.0, 6.0, 8.0, 10.0];
        assert!(examine_convexity(&dist, &schedule));
    }
}
