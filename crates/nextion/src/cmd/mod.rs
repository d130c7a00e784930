use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Subcommand};
use nextion_message::EventCode;
use nextion_session::SessionConfig;
use nextion_transport::Endpoint;

use crate::exit::{CliError, CliResult, INTERNAL, USAGE};
use crate::output::OutputFormat;

pub mod decode;
pub mod encode;
pub mod listen;
pub mod request;
pub mod send;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Write commands to the device without waiting for replies.
    Send(SendArgs),
    /// Bind, run commands one at a time and print each reply.
    Request(RequestArgs),
    /// Bind and print device events until interrupted.
    Listen(ListenArgs),
    /// Decode a captured byte stream offline.
    Decode(DecodeArgs),
    /// Write delimiter-terminated commands to stdout.
    Encode(EncodeArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Send(args) => block_on(send::run(args)),
        Command::Request(args) => block_on(request::run(args, format)),
        Command::Listen(args) => block_on(listen::run(args, format)),
        Command::Decode(args) => decode::run(args, format),
        Command::Encode(args) => encode::run(args),
        Command::Version(args) => version::run(args),
    }
}

fn block_on<F>(future: F) -> CliResult<i32>
where
    F: Future<Output = CliResult<i32>>,
{
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|err| CliError::new(INTERNAL, format!("runtime setup failed: {err}")))?;
    runtime.block_on(future)
}

/// Where the device is and how long to wait for it.
#[derive(Args, Debug)]
pub struct LinkArgs {
    /// Serial bridge endpoint: tcp://HOST:PORT or unix:PATH.
    #[arg(long, env = "NEXTION_LINK", value_name = "ENDPOINT")]
    pub link: Endpoint,
    /// Response timeout per command (e.g. 1s, 500ms).
    #[arg(
        long,
        env = "NEXTION_TIMEOUT",
        default_value = "1s",
        value_parser = parse_duration
    )]
    pub timeout: Duration,
}

impl LinkArgs {
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            request_timeout: self.timeout,
            bind_timeout: self.timeout,
            ..SessionConfig::default()
        }
    }
}

#[derive(Args, Debug)]
pub struct SendArgs {
    /// Commands to write, in order.
    #[arg(required = true, value_name = "COMMAND")]
    pub commands: Vec<String>,
    #[command(flatten)]
    pub link: LinkArgs,
}

#[derive(Args, Debug)]
pub struct RequestArgs {
    /// Commands to run, in order.
    #[arg(required = true, value_name = "COMMAND")]
    pub commands: Vec<String>,
    #[command(flatten)]
    pub link: LinkArgs,
}

#[derive(Args, Debug)]
pub struct ListenArgs {
    #[command(flatten)]
    pub link: LinkArgs,
    /// Only print events with this name (e.g. touchEvent, pageId).
    #[arg(long, value_name = "NAME")]
    pub event: Option<EventCode>,
    /// Exit after printing N events.
    #[arg(long)]
    pub count: Option<usize>,
}

#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// Capture file; reads stdin when absent or `-`.
    #[arg(value_name = "FILE")]
    pub input: Option<PathBuf>,
    /// Drop frames longer than this many bytes.
    #[arg(long, value_name = "BYTES")]
    pub max_frame_size: Option<usize>,
}

#[derive(Args, Debug)]
pub struct EncodeArgs {
    /// Commands to encode, in order.
    #[arg(required = true, value_name = "COMMAND")]
    pub commands: Vec<String>,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

pub fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, unit) = if let Some(num) = input.strip_suffix("ms") {
        (num, "ms")
    } else if let Some(num) = input.strip_suffix('s') {
        (num, "s")
    } else {
        (input, "s")
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    match unit {
        "ms" => Ok(Duration::from_millis(value)),
        _ => Ok(Duration::from_secs(value)),
    }
}
