use std::time::Duration;

use nextion_frame::FrameConfig;
use nextion_message::{Command, ReturnMode};

/// Default time to wait for a Response.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_millis(1000);

/// Configuration for a [`Session`](crate::Session).
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Response window for requests that don't specify one. Default: 1 s.
    pub request_timeout: Duration,
    /// Response window for each configuration command during binding. Default: 1 s.
    pub bind_timeout: Duration,
    /// Result reporting mode set during binding. Default: `Always`.
    pub return_mode: ReturnMode,
    /// Send `sleep=0` during binding. Default: true.
    pub disable_sleep: bool,
    /// Events buffered per subscriber before the slowest one starts losing them.
    pub event_capacity: usize,
    /// Notices buffered per receiver.
    pub notice_capacity: usize,
    /// Inbound frame limits.
    pub frame: FrameConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            bind_timeout: DEFAULT_REQUEST_TIMEOUT,
            return_mode: ReturnMode::Always,
            disable_sleep: true,
            event_capacity: 64,
            notice_capacity: 16,
            frame: FrameConfig::default(),
        }
    }
}

impl SessionConfig {
    /// Commands issued during binding, in order.
    ///
    /// The return mode goes first so the commands after it are acknowledged.
    pub fn bind_commands(&self) -> Vec<Command> {
        let mut commands = vec![Command::return_mode(self.return_mode)];
        if self.disable_sleep {
            commands.push(Command::sleep(false));
        }
        commands
    }

    /// Whether the device will acknowledge successful commands under `return_mode`.
    pub fn expects_success_replies(&self) -> bool {
        matches!(self.return_mode, ReturnMode::Always | ReturnMode::OnSuccess)
    }
}
