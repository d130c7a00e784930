//! Typed messages of the Nextion serial protocol.
//!
//! Every inbound frame starts with a single code byte. The code space is
//! split into two disjoint families:
//! - [`ResponseCode`]: the result of a host command; no payload
//! - [`EventCode`]: an unsolicited device notification with a typed payload
//!
//! [`decode`] turns a delimiter-stripped frame into a [`Message`]. It is
//! stateless: a bad frame never affects the next one.

pub mod code;
pub mod command;
pub mod decode;
pub mod error;
pub mod event;

pub use code::{Code, EventCode, ResponseCode};
pub use command::{Command, ReturnMode, SYSTEM_VARIABLES};
pub use decode::{decode, decode_frame, Message, Response};
pub use error::{MessageError, Result};
pub use event::{Coordinate, Event, TouchEvent, Value};
