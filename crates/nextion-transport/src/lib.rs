//! Duplex byte-link abstraction for Nextion HMI controllers.
//!
//! This is the lowest layer of the driver. Everything above it consumes an
//! ordered inbound byte stream and a single ordered outbound write path; the
//! choice of physical port, bridge and baud rate is made by the caller.
//!
//! Any `AsyncRead + AsyncWrite` value is a [`Link`]. For devices exposed
//! through a serial bridge (ser2net, socat, a UART-to-TCP module) the
//! [`LinkStream`] type connects to a TCP or Unix socket [`Endpoint`].

pub mod endpoint;
pub mod error;
pub mod traits;

pub use endpoint::Endpoint;
pub use error::{Result, TransportError};
pub use traits::{Link, LinkStream};

/// Factory default baud rate of Nextion devices.
///
/// Not used by the driver itself; exported for port-setup collaborators.
pub const DEFAULT_BAUD_RATE: u32 = 9600;
