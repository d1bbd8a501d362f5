use thiserror::Error;

/// Failure modes for distribution estimation.
///
/// Each variant corresponds to one failure kind a caller can react to
/// distinctly: an empty sample is a caller bug, a degenerate fit is a
/// numerical edge case with a well-defined fallback, and `NoFiniteFit` means
/// every candidate family failed its likelihood fit on the given data.
#[derive(Debug, Error)]
pub enum EstimationError {
    #[error("cannot fit a distribution to an empty sample")]
    EmptySample,

    #[error("sample contains a non-finite value at index {index}: {value}")]
    NonFiniteSample { index: usize, value: f64 },

    #[error("no candidate family produced a finite log-likelihood for this sample")]
    NoFiniteFit,

    #[error("Kolmogorov-Smirnov evaluation failed for family {family}: {reason}")]
    KsTestFailed { family: &'static str, reason: String },

    #[error("quantile {p} is outside the valid (0, 1) range")]
    InvalidQuantile { p: f64 },
}
