//! Host-side driver for Nextion HMI display controllers.
//!
//! A Nextion device speaks a line-less serial protocol: ASCII commands go
//! out terminated by `0xFF 0xFF 0xFF`, and coded frames come back with the
//! same terminator. Some frames answer a command, others report touches,
//! page changes and power events on their own.
//!
//! # Crate Structure
//!
//! - [`transport`]: duplex byte link and socket endpoints for serial bridges
//! - [`frame`]: delimiter framing, blocking reader/writer, async codec
//! - [`message`]: code tables, payload decoding and command builders
//! - [`session`]: request/response correlation and event routing (behind `session` feature)

/// Re-export transport types.
pub mod transport {
    pub use nextion_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use nextion_frame::*;
}

/// Re-export message types.
pub mod message {
    pub use nextion_message::*;
}

/// Re-export session types (requires `session` feature).
#[cfg(feature = "session")]
pub mod session {
    pub use nextion_session::*;
}
