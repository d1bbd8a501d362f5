/// Enforces a minimum gap between consecutive polls by pushing any poll
/// that falls too close to its predecessor forward by exactly
/// `rate_limit`, cascading the push through the remaining schedule.
///
/// Mirrors `_apply_rate_limit`: this can move the final poll past the
/// original upper bound when the schedule is denser than the rate limit
/// allows; callers that need a hard ceiling re-validate afterward.
pub fn apply_rate_limit(schedule: &[f64], rate_limit: f64) -> Vec<f64> {
    if schedule.is_empty() {
        return Vec::new();
    }
    let mut out = vec![schedule[0]];
    for &t in &schedule[1..] {
        let prev = *out.last().unwrap();
        if t - prev < rate_limit {
            out.push(prev + rate_limit);
        } else {
            out.push(t);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leaves_well_spaced_schedule_untouched() {
        let schedule = vec![1.0, 3.0, 6.0, 10.0];
        assert_eq!(apply_rate_limit(&schedule, 1.0), schedule);
    }

    #[test]
    fn pushes_crowded_polls_apart() {
        let schedule = vec![1.0, 1.1, 1.2, 5.0];
        let out = apply_rate_limit(&schedule, 1.0);
        for w in out.windows(2) {
            assert!(w[1] - w[0] >= 1.0 - 1e-9);
        }
    }

    #[test]
    fn empty_schedule_stays_empty() {
        assert!(apply_rate_limit(&[], 1.0).is_empty());
    }
}
