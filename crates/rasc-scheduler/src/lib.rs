//! Poll-schedule synthesis and validation.
//!
//! Given a fitted [`rasc_distributions::Distribution`] over inter-event
//! durations, [`synth::synthesize`] searches for the smallest poll schedule
//! that meets a configured detection-probability SLO, using either a
//! recurrence-based construction or a V-optimal dynamic-programming
//! segmentation. [`validator`] re-checks any schedule against the SLO,
//! convexity, and expected-delay criteria independently of how it was
//! produced.

mod error;
mod rate_limit;
mod recurrence;
mod synth;
mod uniform;
mod validator;
mod vopt;

pub use error::{SynthesisError, ValidationError};
pub use rate_limit::apply_rate_limit;
pub use recurrence::polling_interval;
pub use synth::{
    fallback_schedule, synthesize, synthesize_fixed_count, SynthesisConfig, SynthesisMode,
    TailExtension,
};
pub use uniform::{uniform_polls, uniform_polls_n};
pub use validator::{examine_convexity, expected_delay, validate_slo};
pub use vopt::vopt_interval;

/// Validates a previously synthesized schedule: non-empty and strictly
/// increasing, the two structural invariants every synthesis path must
/// uphold regardless of algorithm.
pub fn validate_structure(schedule: &[f64]) -> Result<(), ValidationError> {
    if schedule.is_empty() {
        return Err(ValidationError::EmptySchedule);
    }
    for (i, w) in schedule.windows(2).enumerate() {
        if w[1] <= w[0] {
            return Err(ValidationError::NotIncreasing { index: i + 1, prev: w[0], next: w[1] });
        }
    }
    Ok(())
}
