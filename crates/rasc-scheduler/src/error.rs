use thiserror::Error;

#[derive(Debug, Error)]
pub enum SynthesisError {
    #[error("no feasible L1 found in [{left}, {right}] for {num_polls} polls")]
    NoFeasibleL1 { left: f64, right: f64, num_polls: usize },

    #[error("could not meet SLO {slo} within the poll-count search bound")]
    SloInfeasible { slo: f64 },

    #[error("upper bound is not finite (ppf(0.99) returned NaN or infinite)")]
    NonFiniteUpperBound,

    #[error("V-optimal DP failed to reach a valid segmentation with {num_polls} polls over {grid_points} grid points")]
    DpFailed { num_polls: usize, grid_points: usize },
}

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("schedule is empty")]
    EmptySchedule,

    #[error("schedule is not strictly increasing at index {index}: {prev} -> {next}")]
    NotIncreasing { index: usize, prev: f64, next: f64 },
}
