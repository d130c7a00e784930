use std::io::IsTerminal;

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use nextion_frame::Frame;
use nextion_message::{Event, Message, MessageError, Response, Value};
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

/// One printed line: a decoded message, a request result or a decode failure.
#[derive(Serialize, Debug, Default)]
pub struct Record<'a> {
    kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    command: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    event: Option<&'a Event>,
    #[serde(skip_serializing_if = "Option::is_none")]
    value: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    frame: Option<String>,
}

impl<'a> Record<'a> {
    pub fn message(message: &'a Message) -> Self {
        match message {
            Message::Response(response) => Self::response(response),
            Message::Event(event) => Self::event(event),
        }
    }

    pub fn response(response: &Response) -> Self {
        Self {
            kind: "response",
            code: Some(hex_code(response.code.as_byte())),
            name: Some(response.name()),
            ..Self::default()
        }
    }

    pub fn event(event: &'a Event) -> Self {
        Self {
            kind: "event",
            code: Some(hex_code(event.code().as_byte())),
            name: Some(event.name()),
            event: Some(event),
            ..Self::default()
        }
    }

    pub fn value(value: Value) -> Self {
        Self {
            kind: "value",
            value: Some(value),
            ..Self::default()
        }
    }

    pub fn decode_failure(err: &MessageError, frame: &Frame) -> Self {
        Self {
            kind: "error",
            code: frame.code().map(hex_code),
            error: Some(err.to_string()),
            frame: Some(hex_bytes(frame.as_bytes())),
            ..Self::default()
        }
    }

    pub fn failure(error: impl ToString) -> Self {
        Self {
            kind: "error",
            error: Some(error.to_string()),
            ..Self::default()
        }
    }

    pub fn for_command(mut self, command: &'a str) -> Self {
        self.command = Some(command);
        self
    }

    fn detail(&self) -> String {
        if let Some(error) = &self.error {
            return error.clone();
        }
        if let Some(value) = &self.value {
            return value.to_string();
        }
        self.event.map(event_detail).unwrap_or_default()
    }
}

pub fn print_record(record: &Record<'_>, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string(record).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut header = vec!["KIND", "CODE", "NAME", "DETAIL"];
            let mut row = vec![
                record.kind.to_string(),
                record.code.clone().unwrap_or_default(),
                record.name.unwrap_or("-").to_string(),
                record.detail(),
            ];
            if let Some(command) = record.command {
                header.insert(0, "COMMAND");
                row.insert(0, command.to_string());
            }
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(header)
                .add_row(row);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            let mut line = String::new();
            if let Some(command) = record.command {
                line.push_str(&format!("{command} -> "));
            }
            line.push_str(record.kind);
            if let Some(name) = record.name {
                line.push_str(&format!(" {name}"));
            }
            if let Some(code) = &record.code {
                line.push_str(&format!(" ({code})"));
            }
            let detail = record.detail();
            if !detail.is_empty() {
                line.push_str(&format!(" {detail}"));
            }
            println!("{line}");
        }
    }
}

fn event_detail(event: &Event) -> String {
    match event {
        Event::TouchEvent(touch) => format!(
            "page={} button={} {}",
            touch.page_id,
            touch.button_id,
            press(touch.release_event)
        ),
        Event::PageId { page_id } => format!("page={page_id}"),
        Event::TouchCoordinate(coordinate) | Event::TouchCoordinateOnWake(coordinate) => format!(
            "x={} y={} {}",
            coordinate.x(),
            coordinate.y(),
            press(coordinate.release_event)
        ),
        Event::StringData { value } => format!("{value:?}"),
        Event::NumericData { value } => value.to_string(),
        Event::AutoSleep
        | Event::AutoWake
        | Event::Startup
        | Event::CardUpgrade
        | Event::TransmitFinished
        | Event::TransmitReady => String::new(),
    }
}

fn press(release: bool) -> &'static str {
    if release {
        "release"
    } else {
        "press"
    }
}

fn hex_code(byte: u8) -> String {
    format!("0x{byte:02x}")
}

fn hex_bytes(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect::<Vec<_>>()
        .join(" ")
}
