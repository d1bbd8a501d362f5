use chrono::{DateTime, Utc};

use crate::error::RuntimeError;

/// The lifecycle states of one dispatched action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionState {
    Pending,
    Running,
    /// Repeatable/idempotent: an action under poll-driven detection can be
    /// re-scheduled any number of times while `Running`.
    Scheduled,
    Complete,
    Failed,
    /// The action was withdrawn before reaching a natural terminal state;
    /// no further wire messages or events are sent for it.
    Cancelled,
}

impl ActionState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ActionState::Complete | ActionState::Failed | ActionState::Cancelled)
    }
}

/// Per-action finite-state machine: `Pending -> Running -> (Scheduled)* ->
/// Complete | Failed`.
///
/// Enforces the two invariants every dispatched action must satisfy:
/// transition timestamps never go backwards, and a `Failed` verdict
/// requires at least one prior `Running` transition (an action cannot fail
/// before it started).
#[derive(Debug, Clone)]
pub struct ActionFsm {
    action_id: String,
    state: ActionState,
    last_transition_at: DateTime<Utc>,
    start_count: u32,
}

impl ActionFsm {
    pub fn new(action_id: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            action_id: action_id.into(),
            state: ActionState::Pending,
            last_transition_at: created_at,
            start_count: 0,
        }
    }

    pub fn action_id(&self) -> &str {
        &self.action_id
    }

    pub fn state(&self) -> ActionState {
        self.state
    }

    fn advance(&mut self, next: ActionState, at: DateTime<Utc>, attempted: &'static str) -> Result<(), RuntimeError> {
        if self.state.is_terminal() || at < self.last_transition_at {
            return Err(RuntimeError::InvalidTransition {
                action_id: self.action_id.clone(),
                attempted,
            });
        }
        self.state = next;
        self.last_transition_at = at;
        Ok(())
    }

    /// `START`: the action has begun executing on the device.
    pub fn start(&mut self, at: DateTime<Utc>) -> Result<(), RuntimeError> {
        self.advance(ActionState::Running, at, "START")?;
        self.start_count += 1;
        Ok(())
    }

    /// `SCHEDULED`: a poll has been scheduled to detect completion. Valid
    /// from `Running` or from `Scheduled` itself (re-scheduling).
    pub fn schedule(&mut self, at: DateTime<Utc>) -> Result<(), RuntimeError> {
        if !matches!(self.state, ActionState::Running | ActionState::Scheduled) {
            return Err(RuntimeError::InvalidTransition {
                action_id: self.action_id.clone(),
                attempted: "SCHEDULED",
            });
        }
        self.advance(ActionState::Scheduled, at, "SCHEDULED")
    }

    /// `COMPLETE`: a poll observed the device in its target terminal state.
    pub fn complete(&mut self, at: DateTime<Utc>) -> Result<(), RuntimeError> {
        self.advance(ActionState::Complete, at, "COMPLETE")
    }

    /// `FAIL`: the action could not be confirmed complete. Requires at
    /// least one prior `START`.
    pub fn fail(&mut self, at: DateTime<Utc>) -> Result<(), RuntimeError> {
        if self.start_count == 0 {
            return Err(RuntimeError::InvalidTransition {
                action_id: self.action_id.clone(),
                attempted: "FAIL",
            });
        }
        self.advance(ActionState::Failed, at, "FAIL")
    }

    /// `CANCEL`: withdraws the action. Valid from any non-terminal state;
    /// the caller is responsible for dropping any pending poll timer and
    /// sending no further wire messages or events once this returns `Ok`.
    pub fn cancel(&mut self, at: DateTime<Utc>) -> Result<(), RuntimeError> {
        self.advance(ActionState::Cancelled, at, "CANCEL")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(offset_secs: i64) -> DateTime<Utc> {
        use chrono::TimeZone;
        Utc.timestamp_opt(offset_secs, 0).unwrap()
    }

    #[test]
    fn happy_path_reaches_complete() {
        let mut fsm = ActionFsm::new("a1", t(0));
        fsm.start(t(1)).unwrap();
        fsm.schedule(t(2)).unwrap();
        fsm.complete(t(3)).unwrap();
        assert_eq!(fsm.state(), ActionState::Complete);
    }

    #[test]
    fn scheduled_is_repeatable() {
        let mut fsm = ActionFsm::new("a1", t(0));
        fsm.start(t(1)).unwrap();
        fsm.schedule(t(2)).unwrap();
        fsm.schedule(t(3)).unwrap();
        fsm.schedule(t(4)).unwrap();
        assert_eq!(fsm.state(), ActionState::Scheduled);
    }

    #[test]
    fn fail_without_prior_start_is_rejected() {
        let mut fsm = ActionFsm::new("a1", t(0));
        assert!(fsm.fail(t(1)).is_err());
    }

    #[test]
    fn fail_after_start_succeeds() {
        let mut fsm = ActionFsm::new("a1", t(0));
        fsm.start(t(1)).unwrap();
        fsm.fail(t(2)).unwrap();
        assert_eq!(fsm.state(), ActionState::Failed);
    }

    #[test]
    fn terminal_states_reject_further_transitions() {
        let mut fsm = ActionFsm::new("a1", t(0));
        fsm.start(t(1)).unwrap();
        fsm.complete(t(2)).unwrap();
        assert!(fsm.schedule(t(3)).is_err());
        assert!(fsm.start(t(3)).is_err());
        assert!(fsm.fail(t(3)).is_err());
    }

    #[test]
    fn timestamps_must_be_monotone() {
        let mut fsm = ActionFsm::new("a1", t(5));
        assert!(fsm.start(t(1)).is_err());
    }

    #[test]
    fn cancel_is_valid_from_any_non_terminal_state() {
        let mut fsm = ActionFsm::new("a1", t(0));
        fsm.start(t(1)).unwrap();
        fsm.schedule(t(2)).unwrap();
        fsm.cancel(t(3)).unwrap();
        assert_eq!(fsm.state(), ActionState::Cancelled);
        assert!(fsm.cancel(t(4)).is_err());
    }

    #[test]
    fn every_action_ends_in_exactly_one_terminal_state() {
        let outcomes = [ActionState::Complete, ActionState::Failed, ActionState::Cancelled];
        for outcome in outcomes {
            assert!(outcome.is_terminal());
        }
        assert!(!ActionState::Pending.is_terminal());
        assert!(!ActionState::Running.is_terminal());
        assert!(!ActionState::Scheduled.is_terminal());
    }
}
