//! Probe-and-detect runtime.
//!
//! Owns the TCP connections to devices ([`pool`], [`registry`]), the
//! length-prefixed wire codec they speak ([`wire`]), the declarative
//! command/state shapes per device kind ([`device`]), the per-action
//! lifecycle state machine ([`fsm`]) and event bus ([`events`]) a probe
//! session drives as it follows a synthesized poll schedule ([`probe`]),
//! and the bounded worker pool that keeps CPU-heavy schedule synthesis off
//! the async reactor ([`worker`]).

mod device;
mod error;
mod events;
mod fsm;
mod legacy_pickle;
mod pool;
mod probe;
mod registry;
mod wire;
mod worker;

pub use device::{
    build_command_request, build_state_request, build_sysinfo_request, classify_sysinfo, is_terminal_state,
    CommandArgs, DeviceKind,
};
pub use error::{ProbeError, RuntimeError, WireError};
pub use events::{event_channel, ActionEvent, EventReceiver, EventSender, TOPIC};
pub use fsm::{ActionFsm, ActionState};
pub use pool::DeviceConnection;
pub use probe::{ProbeSession, DEFAULT_FAILURE_TIMEOUT, MAX_TAIL_POLLS, RPC_TIMEOUT};
pub use registry::{DeviceHandle, DeviceRegistry};
pub use wire::{read_frame, write_frame, WireMode, MAX_FRAME_SIZE};
pub use worker::{ScheduleWorkerPool, MAX_SCHEDULE_TIME};
