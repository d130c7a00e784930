//! Matching of Response frames to the single in-flight request.
//!
//! The wire protocol carries no correlation id, so a Response can only be
//! attributed by position: it belongs to the one request whose command has
//! been handed to the link and which has not yet settled. Each request gets a
//! local, monotonically increasing id so that a timed-out request can be
//! retired without touching its successor.
//!
//! A Response that arrives while no written request is waiting is discarded.
//! A late Response that arrives after a *later* command was written cannot be
//! told apart from that command's own Response.

use std::time::Instant;

use nextion_message::Response;
use tokio::sync::oneshot;
use tracing::debug;

use crate::error::{Result, SessionError};

/// Identifier of a request within one session.
pub type RequestId = u64;

/// Settles a request.
pub type Reply = oneshot::Receiver<Result<Response>>;

struct PendingRequest {
    id: RequestId,
    command: String,
    written: bool,
    started: Instant,
    reply: oneshot::Sender<Result<Response>>,
}

/// Holds at most one pending request.
#[derive(Default)]
pub struct Correlator {
    next_id: RequestId,
    active: Option<PendingRequest>,
}

impl Correlator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a request before its command is written.
    ///
    /// A request still registered at this point was abandoned by its caller
    /// and is dropped.
    pub fn begin(&mut self, command: &str) -> (RequestId, Reply) {
        if let Some(abandoned) = self.active.take() {
            debug!(
                id = abandoned.id,
                command = %abandoned.command,
                "dropping abandoned request"
            );
        }

        self.next_id += 1;
        let id = self.next_id;
        let (reply, rx) = oneshot::channel();
        self.active = Some(PendingRequest {
            id,
            command: command.to_string(),
            written: false,
            started: Instant::now(),
            reply,
        });
        (id, rx)
    }

    /// The command bytes of `id` have been handed to the link.
    pub fn mark_written(&mut self, id: RequestId) {
        if let Some(pending) = self.active.as_mut().filter(|p| p.id == id) {
            pending.written = true;
        }
    }

    /// Deliver a Response to the active request.
    ///
    /// Returns the id it was delivered to, or `None` if it matched nothing.
    pub fn resolve(&mut self, response: Response) -> Option<RequestId> {
        if !self.active.as_ref().is_some_and(|p| p.written) {
            return None;
        }
        let pending = self.active.take()?;
        debug!(
            id = pending.id,
            command = %pending.command,
            %response,
            elapsed = ?pending.started.elapsed(),
            "response matched"
        );
        // The caller may have given up; the Response is consumed either way.
        let _ = pending.reply.send(Ok(response));
        Some(pending.id)
    }

    /// Retire `id` after a timeout or write failure. Returns false if it had already settled.
    pub fn cancel(&mut self, id: RequestId) -> bool {
        if self.active.as_ref().is_some_and(|p| p.id == id) {
            self.active = None;
            true
        } else {
            false
        }
    }

    /// Fail the active request, if any, with a link error.
    pub fn fail_all(&mut self, reason: &str) {
        if let Some(pending) = self.active.take() {
            debug!(id = pending.id, command = %pending.command, reason, "failing pending request");
            let _ = pending.reply.send(Err(SessionError::Link {
                reason: reason.to_string(),
            }));
        }
    }

    /// Id of the active request, if any.
    pub fn active(&self) -> Option<RequestId> {
        self.active.as_ref().map(|p| p.id)
    }
}

#[cfg(test)]
mod tests {
    use nextion_message::ResponseCode;

    use super::*;

    fn success() -> Response {
        Response::new(ResponseCode::Success)
    }

    #[test]
    fn response_resolves_written_request() {
        let mut correlator = Correlator::new();
        let (id, mut rx) = correlator.begin("sleep=0");
        correlator.mark_written(id);

        assert_eq!(correlator.resolve(success()), Some(id));
        assert_eq!(rx.try_recv().unwrap().unwrap(), success());
        assert_eq!(correlator.active(), None);
    }

    #[test]
    fn response_before_command_is_written_is_unmatched() {
        let mut correlator = Correlator::new();
        let (id, mut rx) = correlator.begin("page 1");

        assert_eq!(correlator.resolve(success()), None);
        assert_eq!(correlator.active(), Some(id));
        assert!(rx.try_recv().is_err());

        correlator.mark_written(id);
        assert_eq!(correlator.resolve(success()), Some(id));
    }

    #[test]
    fn response_with_no_request_is_unmatched() {
        let mut correlator = Correlator::new();
        assert_eq!(correlator.resolve(success()), None);
    }

    #[test]
    fn cancelled_request_does_not_absorb_late_response() {
        let mut correlator = Correlator::new();
        let (first, _rx) = correlator.begin("a=1");
        correlator.mark_written(first);
        assert!(correlator.cancel(first));

        assert_eq!(correlator.resolve(success()), None);

        let (second, _rx) = correlator.begin("b=2");
        assert!(second > first);
        assert!(!correlator.cancel(first), "stale id must not cancel successor");
        assert_eq!(correlator.active(), Some(second));
    }

    #[test]
    fn mark_written_ignores_stale_id() {
        let mut correlator = Correlator::new();
        let (first, _rx) = correlator.begin("a=1");
        let (second, _rx2) = correlator.begin("b=2");

        correlator.mark_written(first);
        assert_eq!(correlator.resolve(success()), None);
        correlator.mark_written(second);
        assert_eq!(correlator.resolve(success()), Some(second));
    }

    #[test]
    fn fail_all_reports_link_error() {
        let mut correlator = Correlator::new();
        let (id, mut rx) = correlator.begin("get n0.val");
        correlator.mark_written(id);

        correlator.fail_all("link closed");
        match rx.try_recv().unwrap() {
            Err(SessionError::Link { reason }) => assert_eq!(reason, "link closed"),
            other => panic!("unexpected result: {other:?}"),
        }
        assert_eq!(correlator.active(), None);
    }

    #[test]
    fn abandoned_request_is_replaced() {
        let mut correlator = Correlator::new();
        let (_first, mut rx) = correlator.begin("a=1");
        let (second, _rx) = correlator.begin("b=2");

        assert_eq!(correlator.active(), Some(second));
        assert!(rx.try_recv().is_err());
    }
}
