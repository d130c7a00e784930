use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use tracing::debug;

use crate::error::{Result, TransportError};
use crate::traits::LinkStream;

/// Address of a serial bridge exposing the device's UART as a byte stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    /// `tcp://HOST:PORT` (ser2net, UART-to-Ethernet/Wi-Fi modules).
    Tcp(String),
    /// `unix:PATH` (socat `UNIX-LISTEN` bridges).
    Unix(PathBuf),
}

impl Endpoint {
    /// Connect to the endpoint.
    pub async fn connect(&self) -> Result<LinkStream> {
        match self {
            Endpoint::Tcp(addr) => {
                let stream = tokio::net::TcpStream::connect(addr.as_str())
                    .await
                    .map_err(|source| TransportError::Connect {
                        endpoint: self.to_string(),
                        source,
                    })?;
                // Commands are tiny; don't let Nagle hold them back.
                stream.set_nodelay(true)?;
                debug!(%addr, "connected to tcp link");
                Ok(LinkStream::from_tcp(stream))
            }
            #[cfg(unix)]
            Endpoint::Unix(path) => {
                let stream = tokio::net::UnixStream::connect(path)
                    .await
                    .map_err(|source| TransportError::Connect {
                        endpoint: self.to_string(),
                        source,
                    })?;
                debug!(?path, "connected to unix link");
                Ok(LinkStream::from_unix(stream))
            }
            #[cfg(not(unix))]
            Endpoint::Unix(_) => Err(TransportError::Connect {
                endpoint: self.to_string(),
                source: std::io::Error::new(
                    std::io::ErrorKind::Unsupported,
                    "unix socket links require a unix platform",
                ),
            }),
        }
    }
}

impl FromStr for Endpoint {
    type Err = TransportError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if let Some(addr) = s.strip_prefix("tcp://") {
            if addr.is_empty() || !addr.contains(':') {
                return Err(TransportError::InvalidEndpoint(s.to_string()));
            }
            return Ok(Endpoint::Tcp(addr.to_string()));
        }
        if let Some(path) = s.strip_prefix("unix://").or_else(|| s.strip_prefix("unix:")) {
            if path.is_empty() {
                return Err(TransportError::InvalidEndpoint(s.to_string()));
            }
            return Ok(Endpoint::Unix(PathBuf::from(path)));
        }
        Err(TransportError::InvalidEndpoint(s.to_string()))
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::Tcp(addr) => write!(f, "tcp://{addr}"),
            Endpoint::Unix(path) => write!(f, "unix:{}", path.display()),
        }
    }
}
