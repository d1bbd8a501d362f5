use thiserror::Error;

#[derive(Debug, Error)]
pub enum WireError {
    #[error("frame length {0} exceeds the maximum allowed frame size")]
    FrameTooLarge(u32),

    #[error("i/o error on device connection: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to decode frame payload as JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("legacy pickle-text frame was malformed: {0}")]
    MalformedPickleText(String),

    #[error("connection closed before a complete frame was received")]
    ConnectionClosed,
}

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("wire error: {0}")]
    Wire(#[from] WireError),

    #[error("probe to {entity_id} timed out after {elapsed_ms}ms")]
    Timeout { entity_id: String, elapsed_ms: u64 },

    #[error("device {entity_id} returned an error response: {message}")]
    DeviceError { entity_id: String, message: String },

    #[error("no device registered with entity id {0}")]
    UnknownDevice(String),

    #[error("device {entity_id} rejected command {command}: unsupported for device kind")]
    UnsupportedCommand { entity_id: String, command: String },

    #[error("device at {addr} reported an unrecognized sysinfo type {device_type:?}")]
    DeviceTypeUnknown { addr: std::net::SocketAddr, device_type: String },

    #[error("no device answered get_sysinfo on any port in {host}:{start_port}-{end_port}")]
    NoDeviceFoundInRange { host: String, start_port: u16, end_port: u16 },
}

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error(transparent)]
    Probe(#[from] ProbeError),

    #[error(transparent)]
    Drift(#[from] rasc_history::DriftError),

    #[error(transparent)]
    Synthesis(#[from] rasc_scheduler::SynthesisError),

    #[error("schedule synthesis exceeded its time budget, falling back to uniform polling")]
    SynthesisTimedOut,

    #[error("action {action_id} is already in a terminal state and cannot transition to {attempted}")]
    InvalidTransition { action_id: String, attempted: &'static str },
}
