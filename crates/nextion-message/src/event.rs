use serde::Serialize;

use crate::code::EventCode;

/// A component press or release.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TouchEvent {
    pub page_id: u8,
    pub button_id: u8,
    pub release_event: bool,
}

/// A raw touch position, sent when touch coordinate reporting is enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Coordinate {
    pub x_high: u8,
    pub x_low: u8,
    pub y_high: u8,
    pub y_low: u8,
    pub release_event: bool,
}

impl Coordinate {
    pub fn x(&self) -> u16 {
        u16::from_be_bytes([self.x_high, self.x_low])
    }

    pub fn y(&self) -> u16 {
        u16::from_be_bytes([self.y_high, self.y_low])
    }
}

/// A decoded device event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Event {
    TouchEvent(TouchEvent),
    PageId { page_id: u8 },
    TouchCoordinate(Coordinate),
    TouchCoordinateOnWake(Coordinate),
    StringData { value: String },
    NumericData { value: i16 },
    AutoSleep,
    AutoWake,
    Startup,
    CardUpgrade,
    TransmitFinished,
    TransmitReady,
}

impl Event {
    pub fn code(&self) -> EventCode {
        match self {
            Event::TouchEvent(_) => EventCode::TouchEvent,
            Event::PageId { .. } => EventCode::PageId,
            Event::TouchCoordinate(_) => EventCode::TouchCoordinate,
            Event::TouchCoordinateOnWake(_) => EventCode::TouchCoordinateOnWake,
            Event::StringData { .. } => EventCode::StringData,
            Event::NumericData { .. } => EventCode::NumericData,
            Event::AutoSleep => EventCode::AutoSleep,
            Event::AutoWake => EventCode::AutoWake,
            Event::Startup => EventCode::Startup,
            Event::CardUpgrade => EventCode::CardUpgrade,
            Event::TransmitFinished => EventCode::TransmitFinished,
            Event::TransmitReady => EventCode::TransmitReady,
        }
    }

    pub fn name(&self) -> &'static str {
        self.code().name()
    }

    /// The carried value for `stringData` and `numericData` replies.
    pub fn value(&self) -> Option<Value> {
        match self {
            Event::StringData { value } => Some(Value::Text(value.clone())),
            Event::NumericData { value } => Some(Value::Number(*value)),
            _ => None,
        }
    }
}

/// A variable value read back with `get`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Text(String),
    Number(i16),
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Text(text) => f.write_str(text),
            Value::Number(number) => write!(f, "{number}"),
        }
    }
}
