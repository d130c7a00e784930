use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use nextion_frame::{DelimiterCodec, Frame};
use nextion_message::{
    decode_frame, Command, Event, EventCode, Message, Response, Value, SYSTEM_VARIABLES,
};
use nextion_transport::{Endpoint, Link};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};
use tokio_util::codec::{FramedRead, FramedWrite};
use tracing::{debug, info, trace, warn};

use crate::config::SessionConfig;
use crate::correlator::{Correlator, RequestId, Reply};
use crate::error::{Result, SessionError};
use crate::events::EventSubscription;
use crate::state::{ConnectionState, SessionNotice};

type LinkWriter = FramedWrite<Box<dyn AsyncWrite + Send + Unpin>, DelimiterCodec>;

/// State shared between the session handle and its reader task.
struct Shared {
    correlator: Mutex<Correlator>,
    state: watch::Sender<ConnectionState>,
    /// Taken on disconnect, which ends every subscription.
    events: Mutex<Option<broadcast::Sender<Event>>>,
    notices: broadcast::Sender<SessionNotice>,
}

impl Shared {
    fn lock_correlator(&self) -> MutexGuard<'_, Correlator> {
        self.correlator.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_events(&self) -> MutexGuard<'_, Option<broadcast::Sender<Event>>> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Register a request unless the link is already gone.
    ///
    /// The state is read under the correlator lock so a concurrent
    /// `fail_link` either sees this request or this call sees `Disconnected`.
    fn begin(&self, command: &Command) -> Result<(RequestId, Reply)> {
        let mut correlator = self.lock_correlator();
        match self.state() {
            ConnectionState::Disconnected => Err(SessionError::NotReady {
                state: ConnectionState::Disconnected,
            }),
            _ => Ok(correlator.begin(command.as_str())),
        }
    }

    fn dispatch(&self, frame: &Frame) {
        trace!(?frame, "frame received");
        match decode_frame(frame) {
            Ok(Message::Response(response)) => {
                if self.lock_correlator().resolve(response).is_none() {
                    warn!(%response, "discarding unmatched response");
                    let _ = self.notices.send(SessionNotice::UnmatchedResponse(response));
                }
            }
            Ok(Message::Event(event)) => {
                debug!(event = event.name(), "event received");
                if let Some(events) = self.lock_events().as_ref() {
                    // No subscribers is not an error.
                    let _ = events.send(event);
                }
            }
            Err(err) => {
                warn!(error = %err, ?frame, "undecodable frame");
                self.report(err.to_string());
            }
        }
    }

    fn report(&self, message: String) {
        let _ = self.notices.send(SessionNotice::Error { message });
    }

    /// Move to `Disconnected`, fail the pending request and end subscriptions.
    fn fail_link(&self, reason: &str) {
        let previous = self.state.send_replace(ConnectionState::Disconnected);
        self.lock_correlator().fail_all(reason);
        self.lock_events().take();

        if previous != ConnectionState::Disconnected {
            info!(reason, from = %previous, "session disconnected");
            let _ = self.notices.send(SessionNotice::Disconnected {
                reason: reason.to_string(),
            });
        }
    }
}

/// A connection to one Nextion device.
///
/// A session owns its link. Inbound bytes are framed and decoded by a
/// background task: Response frames settle the in-flight request, Event
/// frames go to every [`EventSubscription`]. Outbound commands share a
/// single FIFO write path, so at most one request is outstanding and no
/// two commands interleave on the wire.
///
/// Sessions are not reused: once `Disconnected`, create a new one.
pub struct Session {
    shared: Arc<Shared>,
    writer: tokio::sync::Mutex<LinkWriter>,
    reader: JoinHandle<()>,
    config: SessionConfig,
}

impl Session {
    /// Take ownership of `link` and start reading from it, without binding.
    ///
    /// The session starts in `Binding`; call [`bind`](Self::bind) before
    /// issuing requests. Must be called from within a Tokio runtime.
    pub fn new<L: Link>(link: L, config: SessionConfig) -> Self {
        let (read_half, write_half) = tokio::io::split(link);

        let (state, _) = watch::channel(ConnectionState::Binding);
        let (events, _) = broadcast::channel(config.event_capacity.max(1));
        let (notices, _) = broadcast::channel(config.notice_capacity.max(1));
        let shared = Arc::new(Shared {
            correlator: Mutex::new(Correlator::new()),
            state,
            events: Mutex::new(Some(events)),
            notices,
        });

        let frames = FramedRead::new(read_half, DelimiterCodec::with_config(&config.frame));
        let reader = tokio::spawn(read_loop(frames, Arc::clone(&shared)));

        let write_half: Box<dyn AsyncWrite + Send + Unpin> = Box::new(write_half);
        let writer = FramedWrite::new(write_half, DelimiterCodec::with_config(&config.frame));

        Self {
            shared,
            writer: tokio::sync::Mutex::new(writer),
            reader,
            config,
        }
    }

    /// Create a session over `link` and bind it.
    pub async fn connect<L: Link>(link: L, config: SessionConfig) -> Result<Self> {
        let session = Self::new(link, config);
        session.bind().await?;
        Ok(session)
    }

    /// Connect to `endpoint` and bind.
    pub async fn open(endpoint: &Endpoint, config: SessionConfig) -> Result<Self> {
        let link = endpoint.connect().await?;
        Self::connect(link, config).await
    }

    /// Configure the device and move to `Ready`.
    ///
    /// Each configuration command goes through the request path and must be
    /// answered with `success`. If the configured return mode does not
    /// acknowledge successes, the commands are only sent. On failure the
    /// session is disconnected and the error names the failing command;
    /// binding is never retried.
    pub async fn bind(&self) -> Result<()> {
        let state = self.state();
        if state != ConnectionState::Binding {
            return Err(SessionError::NotReady { state });
        }

        let mut writer = self.writer.lock().await;
        let acknowledged = self.config.expects_success_replies();

        for command in self.config.bind_commands() {
            let failure = if acknowledged {
                match self
                    .exchange(&mut writer, &command, self.config.bind_timeout)
                    .await
                {
                    Ok(response) if response.is_success() => continue,
                    Ok(response) => format!("device answered {response}"),
                    Err(err) => err.to_string(),
                }
            } else {
                match self.write(&mut writer, &command).await {
                    Ok(()) => continue,
                    Err(err) => err.to_string(),
                }
            };

            warn!(%command, reason = %failure, "device configuration failed");
            self.reader.abort();
            self.shared
                .fail_link(&format!("configuration failed at '{command}': {failure}"));
            return Err(SessionError::Configuration {
                command: command.to_string(),
                reason: failure,
            });
        }

        let promoted = self.shared.state.send_if_modified(|state| {
            if *state == ConnectionState::Binding {
                *state = ConnectionState::Ready;
                true
            } else {
                false
            }
        });
        if !promoted {
            return Err(SessionError::NotReady {
                state: self.state(),
            });
        }

        info!(return_mode = ?self.config.return_mode, "session ready");
        let _ = self.shared.notices.send(SessionNotice::Ready);
        Ok(())
    }

    /// Write a command without waiting for a Response.
    ///
    /// Returns once the bytes are flushed to the link. Allowed while binding.
    pub async fn send(&self, command: impl Into<Command>) -> Result<()> {
        let command = command.into();
        self.ensure_open()?;
        let mut writer = self.writer.lock().await;
        self.ensure_open()?;
        self.write(&mut writer, &command).await
    }

    /// Send a command and wait for its Response, using the configured timeout.
    pub async fn request(&self, command: impl Into<Command>) -> Result<Response> {
        self.request_timeout(command, self.config.request_timeout)
            .await
    }

    /// Send a command and wait up to `timeout` for its Response.
    ///
    /// Error Responses (anything but `success`) are returned as `Ok`; they
    /// are the device's answer. A timeout leaves the session usable.
    pub async fn request_timeout(
        &self,
        command: impl Into<Command>,
        timeout: Duration,
    ) -> Result<Response> {
        let command = command.into();
        self.ensure_ready()?;
        let mut writer = self.writer.lock().await;
        self.ensure_ready()?;
        self.exchange(&mut writer, &command, timeout).await
    }

    /// Run commands one after another, each settling before the next is written.
    ///
    /// A command that times out does not stop the batch. The outer error is
    /// returned only if the session is not `Ready` when the batch starts.
    pub async fn request_all<I, C>(&self, commands: I) -> Result<Vec<Result<Response>>>
    where
        I: IntoIterator<Item = C>,
        C: Into<Command>,
    {
        self.request_all_timeout(commands, self.config.request_timeout)
            .await
    }

    /// [`request_all`](Self::request_all) with an explicit per-command timeout.
    pub async fn request_all_timeout<I, C>(
        &self,
        commands: I,
        timeout: Duration,
    ) -> Result<Vec<Result<Response>>>
    where
        I: IntoIterator<Item = C>,
        C: Into<Command>,
    {
        let commands: Vec<Command> = commands.into_iter().map(Into::into).collect();
        self.ensure_ready()?;
        // Held for the whole batch so no other caller's command slips in between.
        let mut writer = self.writer.lock().await;
        self.ensure_ready()?;

        let mut results = Vec::with_capacity(commands.len());
        for command in &commands {
            results.push(self.exchange(&mut writer, command, timeout).await);
        }
        Ok(results)
    }

    /// Assign `value` to a device variable or component attribute.
    pub async fn set_value(&self, name: &str, value: impl std::fmt::Display) -> Result<Response> {
        self.request(Command::assign(name, value)).await
    }

    /// Set one of the system-wide variables `sys0`..`sys2`.
    pub async fn set_system_variable(&self, name: &str, value: u32) -> Result<Response> {
        if !SYSTEM_VARIABLES.contains(&name) {
            return Err(SessionError::InvalidArgument(format!(
                "'{name}' is not one of {}",
                SYSTEM_VARIABLES.join(", ")
            )));
        }
        self.set_value(name, value).await
    }

    /// Set the range of the device's `rand` variable.
    pub async fn set_random_range(&self, min: u32, max: u32) -> Result<Response> {
        if max < min {
            return Err(SessionError::InvalidArgument(format!(
                "random range max {max} is below min {min}"
            )));
        }
        self.request(Command::random_range(min, max)).await
    }

    /// Put the device to sleep (`sleep=1`).
    pub async fn sleep(&self) -> Result<Response> {
        self.request(Command::sleep(true)).await
    }

    /// Wake the device (`sleep=0`).
    pub async fn wake(&self) -> Result<Response> {
        self.request(Command::sleep(false)).await
    }

    /// Read a device variable with `get`.
    ///
    /// Resolves with the first `stringData` or `numericData` event that
    /// arrives once the query holds the write path. That event
    /// is still delivered to subscribers. A `success` Response is skipped;
    /// any other Response fails with [`SessionError::Rejected`].
    pub async fn get_value(&self, name: &str) -> Result<Value> {
        let command = Command::get(name);
        let window = self.config.request_timeout;
        self.ensure_ready()?;
        let mut writer = self.writer.lock().await;
        self.ensure_ready()?;

        let deadline = Instant::now() + window;
        let (id, mut reply) = self.shared.begin(&command)?;
        // Data sent while this query waited for the write path is not its answer.
        let mut values = self.subscribe();
        self.transmit(&mut writer, &command, id, deadline, window).await?;

        let mut acknowledged = false;
        let waited = time::timeout_at(deadline, async {
            loop {
                tokio::select! {
                    settled = &mut reply, if !acknowledged => match settled {
                        Ok(Ok(response)) if response.is_success() => acknowledged = true,
                        Ok(Ok(response)) => {
                            return Err(SessionError::Rejected {
                                command: command.to_string(),
                                code: response.code,
                            })
                        }
                        Ok(Err(err)) => return Err(err),
                        Err(_) => return Err(request_dropped()),
                    },
                    event = values.recv() => match event {
                        Some(event) => {
                            if let Some(value) = event.value() {
                                return Ok(value);
                            }
                        }
                        None => {
                            return Err(SessionError::Link {
                                reason: "link closed".to_string(),
                            })
                        }
                    },
                }
            }
        })
        .await;

        self.shared.lock_correlator().cancel(id);
        match waited {
            Ok(result) => result,
            Err(_) => {
                warn!(id, %command, timeout = ?window, "value query timed out");
                Err(SessionError::Timeout {
                    command: command.to_string(),
                    timeout: window,
                })
            }
        }
    }

    /// Receive every event.
    pub fn subscribe(&self) -> EventSubscription {
        self.subscription(None)
    }

    /// Receive events of one kind only.
    pub fn subscribe_to(&self, code: EventCode) -> EventSubscription {
        self.subscription(Some(code))
    }

    /// Receive lifecycle notices published from now on.
    pub fn notices(&self) -> broadcast::Receiver<SessionNotice> {
        self.shared.notices.subscribe()
    }

    pub fn state(&self) -> ConnectionState {
        self.shared.state()
    }

    /// Observe state transitions.
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.shared.state.subscribe()
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Shut down the write half, stop reading and move to `Disconnected`.
    ///
    /// Waits for any command in progress to finish first.
    pub async fn close(&self) -> Result<()> {
        let mut writer = self.writer.lock().await;
        let closed = if self.state() == ConnectionState::Disconnected {
            Ok(())
        } else {
            SinkExt::<&str>::close(&mut *writer)
                .await
                .map_err(SessionError::from)
        };
        self.reader.abort();
        self.shared.fail_link("closed by host");
        closed
    }

    fn subscription(&self, filter: Option<EventCode>) -> EventSubscription {
        match self.shared.lock_events().as_ref() {
            Some(events) => EventSubscription::new(events.subscribe(), filter),
            None => EventSubscription::closed(filter),
        }
    }

    fn ensure_ready(&self) -> Result<()> {
        match self.state() {
            ConnectionState::Ready => Ok(()),
            state => Err(SessionError::NotReady { state }),
        }
    }

    fn ensure_open(&self) -> Result<()> {
        match self.state() {
            ConnectionState::Disconnected => Err(SessionError::NotReady {
                state: ConnectionState::Disconnected,
            }),
            _ => Ok(()),
        }
    }

    /// One request on the held write path: register, write, wait.
    ///
    /// `window` covers the write as well as the wait for the Response.
    async fn exchange(
        &self,
        writer: &mut LinkWriter,
        command: &Command,
        window: Duration,
    ) -> Result<Response> {
        let deadline = Instant::now() + window;
        let (id, mut reply) = self.shared.begin(command)?;
        self.transmit(writer, command, id, deadline, window).await?;

        match time::timeout_at(deadline, &mut reply).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(request_dropped()),
            Err(_) => {
                if !self.shared.lock_correlator().cancel(id) {
                    // Settled between the deadline and the cancel.
                    if let Ok(result) = reply.try_recv() {
                        return result;
                    }
                }
                warn!(id, %command, timeout = ?window, "request timed out");
                Err(SessionError::Timeout {
                    command: command.to_string(),
                    timeout: window,
                })
            }
        }
    }

    /// Write the command of request `id` before `deadline`.
    ///
    /// A write still blocked at the deadline may have left part of the frame
    /// on the wire, so the link is failed and the request times out.
    async fn transmit(
        &self,
        writer: &mut LinkWriter,
        command: &Command,
        id: RequestId,
        deadline: Instant,
        window: Duration,
    ) -> Result<()> {
        match time::timeout_at(deadline, self.write_request(writer, command, id)).await {
            Ok(written) => written,
            Err(_) => {
                self.shared.lock_correlator().cancel(id);
                warn!(id, %command, timeout = ?window, "request write stalled");
                let reason = format!("write of '{command}' stalled past {window:?}");
                self.shared.report(reason.clone());
                self.shared.fail_link(&reason);
                Err(SessionError::Timeout {
                    command: command.to_string(),
                    timeout: window,
                })
            }
        }
    }

    /// Write the command of request `id`, marking it written before the flush.
    async fn write_request(
        &self,
        writer: &mut LinkWriter,
        command: &Command,
        id: RequestId,
    ) -> Result<()> {
        if let Err(err) = writer.feed(command.as_str()).await {
            self.shared.lock_correlator().cancel(id);
            return Err(self.write_failed(err));
        }
        self.shared.lock_correlator().mark_written(id);
        SinkExt::<&str>::flush(writer)
            .await
            .map_err(|err| self.write_failed(err))?;
        debug!(id, %command, "request written");
        Ok(())
    }

    async fn write(&self, writer: &mut LinkWriter, command: &Command) -> Result<()> {
        writer
            .send(command.as_str())
            .await
            .map_err(|err| self.write_failed(err))?;
        debug!(%command, "command sent");
        Ok(())
    }

    fn write_failed(&self, err: nextion_frame::FrameError) -> SessionError {
        let reason = format!("write failed: {err}");
        self.shared.report(reason.clone());
        self.shared.fail_link(&reason);
        SessionError::Link { reason }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.reader.abort();
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("state", &self.state())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

fn request_dropped() -> SessionError {
    SessionError::Link {
        reason: "request dropped by session".to_string(),
    }
}

async fn read_loop<R>(mut frames: FramedRead<R, DelimiterCodec>, shared: Arc<Shared>)
where
    R: AsyncRead + Unpin,
{
    let reason = loop {
        match frames.next().await {
            Some(Ok(frame)) => shared.dispatch(&frame),
            Some(Err(err)) => {
                let reason = format!("read failed: {err}");
                shared.report(reason.clone());
                break reason;
            }
            None => break "link closed".to_string(),
        }
    };
    shared.fail_link(&reason);
}
