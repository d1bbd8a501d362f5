use thiserror::Error;

#[derive(Debug, Error)]
pub enum DriftError {
    #[error("sample duration {value}s for action {action_key:?} is outside the valid (0, 3600) range")]
    DurationOutOfBounds { action_key: String, value: f64 },
}
