//! Request/response correlation and event routing for Nextion HMI controllers.
//!
//! This is the layer applications talk to. A [`Session`] owns one link,
//! configures the device, serializes outbound commands, matches each
//! Response frame to the single in-flight request, and fans Event frames
//! out to subscribers.
//!
//! ```text
//!  Disconnected ──link──▶ Binding ──config ok──▶ Ready
//!        ▲                   │                     │
//!        └───── I/O error / close / config failure ┘
//! ```

pub mod config;
pub mod correlator;
pub mod error;
pub mod events;
pub mod session;
pub mod state;

pub use config::SessionConfig;
pub use error::{Result, SessionError};
pub use events::EventSubscription;
pub use session::Session;
pub use state::{ConnectionState, SessionNotice};
