use nextion_message::{Event, EventCode};
use tokio::sync::broadcast;
use tracing::warn;

/// A stream of device events, optionally restricted to one event name.
///
/// Ends (`recv` returns `None`) once the session's link is gone.
pub struct EventSubscription {
    rx: broadcast::Receiver<Event>,
    filter: Option<EventCode>,
}

impl EventSubscription {
    pub(crate) fn new(rx: broadcast::Receiver<Event>, filter: Option<EventCode>) -> Self {
        Self { rx, filter }
    }

    /// A subscription that has already ended.
    pub(crate) fn closed(filter: Option<EventCode>) -> Self {
        let (_tx, rx) = broadcast::channel(1);
        Self { rx, filter }
    }

    /// Wait for the next matching event.
    ///
    /// A subscriber that falls more than the configured capacity behind
    /// skips the oldest events and logs how many were lost.
    pub async fn recv(&mut self) -> Option<Event> {
        loop {
            match self.rx.recv().await {
                Ok(event) if self.accepts(&event) => return Some(event),
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, filter = ?self.filter, "event subscriber lagged");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// The event name this subscription is restricted to, if any.
    pub fn filter(&self) -> Option<EventCode> {
        self.filter
    }

    fn accepts(&self, event: &Event) -> bool {
        self.filter.is_none_or(|code| event.code() == code)
    }
}
