//! Transport abstraction for MQTT connections.
//!
//! The session engine treats the byte channel as opaque: it hands encoded
//! packets to a [`Transport`] and reads raw chunks back. A [`Connector`]
//! produces a fresh transport for every connection attempt, which is what the
//! reconnect loop leans on.

use async_trait::async_trait;
use std::io;
use tokio::io::{AsyncRead, AsyncWrite};

pub mod tcp;

#[cfg(feature = "tls")]
pub mod tls;

/// Error type for transport operations
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[cfg(feature = "tls")]
    #[error("TLS error: {0}")]
    Tls(String),

    #[error("Transport not supported: {0}")]
    NotSupported(String),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),
}

/// A duplex byte channel. All transports are ordinary async streams; the
/// engine never inspects anything below the byte level.
#[async_trait]
pub trait Transport: AsyncRead + AsyncWrite + Send + Unpin {
    /// Gracefully close the connection.
    async fn close(&mut self) -> Result<(), TransportError>;
}

/// Boxed transport for dynamic dispatch
pub type BoxedTransport = Box<dyn Transport>;

/// Produces a fresh [`Transport`] per connection attempt.
#[async_trait]
pub trait Connector: Send {
    async fn connect(&self) -> Result<BoxedTransport, TransportError>;
}

// Re-export transport types
pub use tcp::TcpConnector;

#[cfg(feature = "tls")]
pub use tls::TlsConnector;
