use std::time::Duration;

use chrono::Utc;
use rasc_scheduler::TailExtension;
use tokio::sync::watch;
use tokio::time::Instant;

use crate::device::{build_command_request, build_state_request, is_terminal_state, CommandArgs, DeviceKind};
use crate::error::{ProbeError, RuntimeError};
use crate::events::{ActionEvent, EventSender};
use crate::fsm::{ActionFsm, ActionState};
use crate::pool::DeviceConnection;

/// Per-RPC timeout for a single request/response exchange with a device.
pub const RPC_TIMEOUT: Duration = Duration::from_secs(5);

/// Upper bound on how long a probe session will keep polling before giving
/// up and reporting `FAIL`, independent of the synthesized schedule's own
/// horizon.
pub const DEFAULT_FAILURE_TIMEOUT: Duration = Duration::from_secs(1000);

/// How many polls beyond the synthesized schedule's own length a tail
/// extension is allowed to add before the session gives up.
pub const MAX_TAIL_POLLS: usize = 100;

/// Drives one dispatched action from `ACK` through to a terminal event:
/// issues the command, then follows the synthesized poll schedule, checking
/// device state at each poll until it observes completion, the schedule is
/// exhausted, or the failure timeout elapses.
pub struct ProbeSession {
    action_id: String,
    entity_id: String,
    kind: DeviceKind,
    fsm: ActionFsm,
    events: EventSender,
    failure_timeout: Duration,
    rpc_timeout: Duration,
    tail_extension: TailExtension,
    worst_case_delta: f64,
}

impl ProbeSession {
    pub fn new(
        action_id: impl Into<String>,
        entity_id: impl Into<String>,
        kind: DeviceKind,
        events: EventSender,
    ) -> Self {
        let action_id = action_id.into();
        let fsm = ActionFsm::new(action_id.clone(), Utc::now());
        Self {
            action_id,
            entity_id: entity_id.into(),
            kind,
            fsm,
            events,
            failure_timeout: DEFAULT_FAILURE_TIMEOUT,
            rpc_timeout: RPC_TIMEOUT,
            tail_extension: TailExtension::FlatQw,
            worst_case_delta: 2.0,
        }
    }

    pub fn with_failure_timeout(mut self, timeout: Duration) -> Self {
        self.failure_timeout = timeout;
        self
    }

    pub fn with_rpc_timeout(mut self, timeout: Duration) -> Self {
        self.rpc_timeout = timeout;
        self
    }

    /// Sets how the schedule is extended (and the `Qw` step used for it)
    /// once the synthesized schedule itself is exhausted without a terminal
    /// state being observed.
    pub fn with_tail_extension(mut self, tail_extension: TailExtension, worst_case_delta: f64) -> Self {
        self.tail_extension = tail_extension;
        self.worst_case_delta = worst_case_delta;
        self
    }

    /// Runs the session to completion: issues `command`, then polls
    /// `schedule` (seconds since the command was issued) until the device
    /// reports a terminal state or the session fails.
    ///
    /// `cancel` lets a caller withdraw the action mid-flight: once it fires,
    /// the session stops issuing wire requests and sending events, and
    /// returns `Cancelled` without sending `FAIL`.
    pub async fn run(
        mut self,
        conn: &mut DeviceConnection,
        command: CommandArgs,
        schedule: Vec<f64>,
        mut cancel: watch::Receiver<bool>,
    ) -> Result<ActionState, RuntimeError> {
        self.events.send(ActionEvent::Ack {
            action_id: self.action_id.clone(),
            entity_id: self.entity_id.clone(),
            at: Utc::now(),
        });

        if *cancel.borrow() {
            self.fsm.cancel(Utc::now())?;
            return Ok(ActionState::Cancelled);
        }

        let command_req = build_command_request(self.kind, &command);
        conn.request(&command_req, self.rpc_timeout).await?;
        self.fsm.start(Utc::now())?;
        self.events.send(ActionEvent::Start {
            action_id: self.action_id.clone(),
            entity_id: self.entity_id.clone(),
            at: Utc::now(),
        });

        let started = Instant::now();

        // Beyond the synthesized schedule's own horizon, extend with a
        // uniform `Qw` tail (or an exponentially growing one capped at
        // `Qw`) rather than failing the instant the schedule runs dry, up
        // to a hard cap of `schedule.len() + MAX_TAIL_POLLS` polls total.
        let max_polls = schedule.len() + MAX_TAIL_POLLS;
        let mut tail_offset = schedule.last().copied().unwrap_or(0.0);
        let mut tail_step = (self.worst_case_delta / 8.0).max(1e-3);

        for poll_index in 0..max_polls {
            let poll_offset_secs = if poll_index < schedule.len() {
                schedule[poll_index]
            } else {
                match self.tail_extension {
                    TailExtension::FlatQw => {
                        tail_offset += self.worst_case_delta;
                        tail_offset
                    }
                    TailExtension::ExponentialCapped => {
                        tail_step = (tail_step * 2.0).min(self.worst_case_delta);
                        tail_offset += tail_step;
                        tail_offset
                    }
                }
            };

            if *cancel.borrow() {
                self.fsm.cancel(Utc::now())?;
                return Ok(ActionState::Cancelled);
            }
            if started.elapsed() >= self.failure_timeout {
                break;
            }

            self.fsm.schedule(Utc::now())?;
            let next_poll_at = Utc::now()
                + chrono::Duration::milliseconds((poll_offset_secs * 1000.0) as i64 - started.elapsed().as_millis() as i64);
            self.events.send(ActionEvent::Scheduled {
                action_id: self.action_id.clone(),
                entity_id: self.entity_id.clone(),
                at: Utc::now(),
                next_poll_at,
            });

            let deadline = started + Duration::from_secs_f64(poll_offset_secs.max(0.0));
            tokio::select! {
                _ = tokio::time::sleep_until(deadline) => {}
                _ = cancel.changed() => {
                    if *cancel.borrow() {
                        self.fsm.cancel(Utc::now())?;
                        return Ok(ActionState::Cancelled);
                    }
                }
            }

            let state_req = build_state_request(self.kind);
            let response = match conn.request(&state_req, self.rpc_timeout).await {
                Ok(v) => v,
                Err(ProbeError::Timeout { .. }) => continue,
                Err(err) => return Err(err.into()),
            };
            let state = response
                .get(self.kind.service_tag())
                .and_then(|v| v.get(self.kind.get_state_method()))
                .cloned()
                .unwrap_or_default();

            if is_terminal_state(&state) {
                self.fsm.complete(Utc::now())?;
                self.events.send(ActionEvent::Complete {
                    action_id: self.action_id.clone(),
                    entity_id: self.entity_id.clone(),
                    at: Utc::now(),
                });
                return Ok(ActionState::Complete);
            }
        }

        self.fsm.fail(Utc::now())?;
        self.events.send(ActionEvent::Fail {
            action_id: self.action_id.clone(),
            entity_id: self.entity_id.clone(),
            at: Utc::now(),
            reason: "schedule exhausted without confirming completion".to_string(),
        });
        Ok(ActionState::Failed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::event_channel;
    use crate::wire::{read_frame, write_frame, WireMode};
    use serde_json::json;
    use tokio::net::TcpListener;

    async fn spawn_mock_door(terminal_after_polls: usize) -> std::net::SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut poll_count = 0usize;
            loop {
                let req = match read_frame(&mut socket, WireMode::Json).await {
                    Ok(r) => r,
                    Err(_) => break,
                };
                let resp = if req.get("pi.virtual.door").and_then(|d| d.get("transition_door_state")).is_some() {
                    json!({"pi.virtual.door": {"transition_door_state": "ok"}})
                } else {
                    poll_count += 1;
                    let opening = poll_count < terminal_after_polls;
                    json!({"pi.virtual.door": {"get_door_state": {"opening": opening, "closed": !opening}}})
                };
                if write_frame(&mut socket, WireMode::Json, &resp).await.is_err() {
                    break;
                }
            }
        });
        addr
    }

    #[tokio::test]
    async fn completes_when_device_reaches_terminal_state() {
        let addr = spawn_mock_door(2).await;
        let mut conn = DeviceConnection::new("front_door", addr, WireMode::Json);
        let (tx, _rx) = event_channel(true);
        let (_cancel_tx, cancel_rx) = watch::channel(false);

        let session = ProbeSession::new("a1", "front_door", DeviceKind::Door, tx);
        let result = session
            .run(&mut conn, CommandArgs::on(), vec![0.01, 0.02, 0.03], cancel_rx)
            .await
            .unwrap();
        assert_eq!(result, ActionState::Complete);
    }

    #[tokio::test]
    async fn fails_when_schedule_is_exhausted_without_completion() {
        let addr = spawn_mock_door(1000).await;
        let mut conn = DeviceConnection::new("front_door", addr, WireMode::Json);
        let (tx, _rx) = event_channel(true);
        let (_cancel_tx, cancel_rx) = watch::channel(false);

        // A short failure timeout means the tail extension only gets to add
        // a poll or two before the session gives up, keeping the test fast.
        let session = ProbeSession::new("a1", "front_door", DeviceKind::Door, tx)
            .with_failure_timeout(Duration::from_millis(60))
            .with_tail_extension(TailExtension::FlatQw, 0.01);
        let result = session
            .run(&mut conn, CommandArgs::on(), vec![0.01, 0.02], cancel_rx)
            .await
            .unwrap();
        assert_eq!(result, ActionState::Failed);
    }

    #[tokio::test]
    async fn tail_extension_keeps_polling_past_the_synthesized_schedule() {
        // Schedule has a single poll that never sees a terminal state, but
        // the device completes on its third overall poll, which only the
        // tail extension reaches.
        let addr = spawn_mock_door(3).await;
        let mut conn = DeviceConnection::new("front_door", addr, WireMode::Json);
        let (tx, _rx) = event_channel(true);
        let (_cancel_tx, cancel_rx) = watch::channel(false);

        let session = ProbeSession::new("a1", "front_door", DeviceKind::Door, tx)
            .with_tail_extension(TailExtension::FlatQw, 0.01);
        let result = session
            .run(&mut conn, CommandArgs::on(), vec![0.01], cancel_rx)
            .await
            .unwrap();
        assert_eq!(result, ActionState::Complete);
    }

    #[tokio::test]
    async fn cancellation_before_start_skips_the_wire_entirely() {
        let addr = spawn_mock_door(2).await;
        let mut conn = DeviceConnection::new("front_door", addr, WireMode::Json);
        let (tx, _rx) = event_channel(true);
        let (cancel_tx, cancel_rx) = watch::channel(true);
        let _ = cancel_tx;

        let session = ProbeSession::new("a1", "front_door", DeviceKind::Door, tx);
        let result = session
            .run(&mut conn, CommandArgs::on(), vec![0.01], cancel_rx)
            .await
            .unwrap();
        assert_eq!(result, ActionState::Cancelled);
    }
}
