use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::mpsc;

/// Pub/sub topic external consumers subscribe an [`EventReceiver`] under.
pub const TOPIC: &str = "rasc_response";

/// One lifecycle event for a dispatched action, corresponding 1:1 with an
/// [`crate::fsm::ActionFsm`] transition.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ActionEvent {
    /// The probe runtime accepted the action and will execute it.
    Ack { action_id: String, entity_id: String, at: DateTime<Utc> },
    /// The device confirmed the action began executing.
    Start { action_id: String, entity_id: String, at: DateTime<Utc> },
    /// A poll has been scheduled to check for completion.
    Scheduled { action_id: String, entity_id: String, at: DateTime<Utc>, next_poll_at: DateTime<Utc> },
    /// A poll observed the device in its target terminal state.
    Complete { action_id: String, entity_id: String, at: DateTime<Utc> },
    /// The action could not be confirmed complete before its deadline.
    Fail { action_id: String, entity_id: String, at: DateTime<Utc>, reason: String },
}

/// Sending half of the action-event bus. Cloned into every probe session so
/// concurrent actions can publish independently.
///
/// Mirrors the teacher's diagnostics `EventSender`: wrapping the channel in
/// an `enabled` flag lets callers that don't care about the event stream
/// skip allocating one without every call site needing an `Option` check.
#[derive(Clone)]
pub struct EventSender {
    inner: Option<mpsc::UnboundedSender<ActionEvent>>,
}

impl EventSender {
    pub fn send(&self, event: ActionEvent) {
        if let Some(tx) = &self.inner {
            if tx.send(event).is_err() {
                tracing::debug!("event receiver dropped, discarding event");
            }
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.inner.is_some()
    }
}

/// Receiving half of the action-event bus.
pub struct EventReceiver {
    inner: Option<mpsc::UnboundedReceiver<ActionEvent>>,
}

impl EventReceiver {
    pub async fn recv(&mut self) -> Option<ActionEvent> {
        match &mut self.inner {
            Some(rx) => rx.recv().await,
            None => None,
        }
    }

    /// Drains every event currently buffered without waiting for more.
    pub fn drain(&mut self) -> Vec<ActionEvent> {
        let mut out = Vec::new();
        if let Some(rx) = &mut self.inner {
            while let Ok(event) = rx.try_recv() {
                out.push(event);
            }
        }
        out
    }
}

/// Creates a connected `(sender, receiver)` pair. When `enabled` is false
/// both halves are no-ops, so dispatch code can unconditionally call
/// [`EventSender::send`] without a feature check.
pub fn event_channel(enabled: bool) -> (EventSender, EventReceiver) {
    if enabled {
        let (tx, rx) = mpsc::unbounded_channel();
        (EventSender { inner: Some(tx) }, EventReceiver { inner: Some(rx) })
    } else {
        (EventSender { inner: None }, EventReceiver { inner: None })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000, 0).unwrap()
    }

    #[tokio::test]
    async fn disabled_channel_drops_events_silently() {
        let (tx, mut rx) = event_channel(false);
        tx.send(ActionEvent::Ack { action_id: "a1".into(), entity_id: "d1".into(), at: now() });
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn enabled_channel_delivers_events_in_order() {
        let (tx, mut rx) = event_channel(true);
        tx.send(ActionEvent::Ack { action_id: "a1".into(), entity_id: "d1".into(), at: now() });
        tx.send(ActionEvent::Start { action_id: "a1".into(), entity_id: "d1".into(), at: now() });

        let first = rx.recv().await.unwrap();
        assert!(matches!(first, ActionEvent::Ack { .. }));
        let second = rx.recv().await.unwrap();
        assert!(matches!(second, ActionEvent::Start { .. }));
    }

    #[test]
    fn drain_collects_all_buffered_events_without_blocking() {
        let (tx, mut rx) = event_channel(true);
        for _ in 0..3 {
            tx.send(ActionEvent::Complete { action_id: "a1".into(), entity_id: "d1".into(), at: now() });
        }
        assert_eq!(rx.drain().len(), 3);
    }
}
