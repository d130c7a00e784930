use bytes::Bytes;
use nextion_frame::Frame;
use serde::Serialize;

use crate::code::{Code, EventCode, ResponseCode};
use crate::error::{MessageError, Result};
use crate::event::{Coordinate, Event, TouchEvent};

/// Result of a host command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Response {
    pub code: ResponseCode,
}

impl Response {
    pub fn new(code: ResponseCode) -> Self {
        Self { code }
    }

    pub fn name(&self) -> &'static str {
        self.code.name()
    }

    pub fn is_success(&self) -> bool {
        self.code.is_success()
    }
}

impl std::fmt::Display for Response {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (0x{:02x})", self.code, self.code.as_byte())
    }
}

/// A decoded inbound frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    Response(Response),
    Event(Event),
}

impl Message {
    pub fn code(&self) -> Code {
        match self {
            Message::Response(response) => Code::Response(response.code),
            Message::Event(event) => Code::Event(event.code()),
        }
    }

    pub fn name(&self) -> &'static str {
        self.code().name()
    }
}

/// Decode a delimiter-stripped frame.
///
/// Responses carry nothing beyond their code byte. Event payloads are read
/// according to the event's layout; bytes past the layout are ignored.
pub fn decode(frame: &[u8]) -> Result<Message> {
    let (&byte, payload) = frame.split_first().ok_or(MessageError::Empty)?;

    match Code::classify(byte) {
        Some(Code::Response(code)) => Ok(Message::Response(Response::new(code))),
        Some(Code::Event(code)) => decode_event(code, payload).map(Message::Event),
        None => Err(MessageError::UnknownCode {
            code: byte,
            frame: Bytes::copy_from_slice(frame),
        }),
    }
}

/// Decode a [`Frame`] produced by the framer.
pub fn decode_frame(frame: &Frame) -> Result<Message> {
    decode(frame.as_bytes())
}

fn decode_event(code: EventCode, payload: &[u8]) -> Result<Event> {
    let event = match code {
        EventCode::TouchEvent => {
            let [page_id, button_id, release] = take::<3>(code, payload)?;
            Event::TouchEvent(TouchEvent {
                page_id,
                button_id,
                release_event: release != 0,
            })
        }
        EventCode::PageId => {
            let [page_id] = take::<1>(code, payload)?;
            Event::PageId { page_id }
        }
        EventCode::TouchCoordinate => Event::TouchCoordinate(coordinate(code, payload)?),
        EventCode::TouchCoordinateOnWake => {
            Event::TouchCoordinateOnWake(coordinate(code, payload)?)
        }
        EventCode::StringData => Event::StringData {
            value: String::from_utf8_lossy(payload).into_owned(),
        },
        EventCode::NumericData => Event::NumericData {
            value: i16::from_le_bytes(take::<2>(code, payload)?),
        },
        EventCode::AutoSleep => Event::AutoSleep,
        EventCode::AutoWake => Event::AutoWake,
        EventCode::Startup => Event::Startup,
        EventCode::CardUpgrade => Event::CardUpgrade,
        EventCode::TransmitFinished => Event::TransmitFinished,
        EventCode::TransmitReady => Event::TransmitReady,
    };
    Ok(event)
}

fn coordinate(code: EventCode, payload: &[u8]) -> Result<Coordinate> {
    let [x_high, x_low, y_high, y_low, release] = take::<5>(code, payload)?;
    Ok(Coordinate {
        x_high,
        x_low,
        y_high,
        y_low,
        release_event: release != 0,
    })
}

fn take<const N: usize>(event: EventCode, payload: &[u8]) -> Result<[u8; N]> {
    payload
        .get(..N)
        .and_then(|bytes| bytes.try_into().ok())
        .ok_or(MessageError::Truncated {
            event,
            expected: N,
            actual: payload.len(),
        })
}
