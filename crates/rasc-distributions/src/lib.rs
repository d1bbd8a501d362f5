//! Distribution estimation for inter-event durations.
//!
//! Given a growing sample of observed durations between device state
//! changes, [`fit_best`] selects the continuous distribution (uniform,
//! normal, gamma, or generalized logistic) that best explains the sample
//! under a Kolmogorov-Smirnov goodness-of-fit test, and [`Distribution`]
//! exposes the pdf/cdf/ppf/moment/sampling operations the scheduler needs
//! to turn that fit into a poll schedule.
//!
//! ```
//! use rasc_distributions::fit_best;
//!
//! let samples = vec![2.1, 2.4, 1.9, 2.3, 2.0, 2.2, 2.5, 1.8];
//! let fit = fit_best(&samples).unwrap();
//! let p99 = fit.distribution.ppf(0.99);
//! assert!(p99 > 0.0);
//! ```

mod distribution;
mod error;
mod estimator;
mod fit;
mod ks;
mod special;

pub use distribution::Distribution;
pub use error::EstimationError;
pub use estimator::{fit_best, FitResult};
pub use ks::ks_test;
