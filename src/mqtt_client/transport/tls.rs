// SPDX-License-Identifier: MPL-2.0

//! TLS transport implementation backed by tokio-native-tls.

use super::{BoxedTransport, Connector, Transport, TransportError};
use async_trait::async_trait;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::TcpStream;
use tokio_native_tls::TlsStream;

/// TLS transport: a TCP connection wrapped with TLS, hostname-verified
/// against the configured peer.
pub struct TlsTransport {
    stream: TlsStream<TcpStream>,
}

#[async_trait]
impl Transport for TlsTransport {
    async fn close(&mut self) -> Result<(), TransportError> {
        use tokio::io::AsyncWriteExt;
        self.stream.shutdown().await.map_err(TransportError::Io)
    }
}

impl AsyncRead for TlsTransport {
    fn poll_read(
        mut self: Pin<&mut Self>,
        ctx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        Pin::new(&mut self.stream).poll_read(ctx, buf)
    }
}

impl AsyncWrite for TlsTransport {
    fn poll_write(
        mut self: Pin<&mut Self>,
        ctx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<std::io::Result<usize>> {
        Pin::new(&mut self.stream).poll_write(ctx, buf)
    }

    fn poll_flush(mut self: Pin<&mut Self>, ctx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        Pin::new(&mut self.stream).poll_flush(ctx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, ctx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        Pin::new(&mut self.stream).poll_shutdown(ctx)
    }
}

/// Connector establishing TLS connections using the system trust roots.
pub struct TlsConnector {
    host: String,
    port: u16,
}

impl TlsConnector {
    pub fn new(host: &str, port: u16) -> Self {
        Self {
            host: host.to_string(),
            port,
        }
    }
}

#[async_trait]
impl Connector for TlsConnector {
    async fn connect(&self) -> Result<BoxedTransport, TransportError> {
        let connector = native_tls::TlsConnector::new()
            .map_err(|e| TransportError::Tls(format!("failed to build TLS connector: {}", e)))?;
        let connector = tokio_native_tls::TlsConnector::from(connector);

        let addr = format!("{}:{}", self.host, self.port);
        let tcp_stream = TcpStream::connect(&addr).await.map_err(|e| {
            TransportError::ConnectionFailed(format!("TCP connection failed: {}", e))
        })?;
        tcp_stream.set_nodelay(true).map_err(TransportError::Io)?;

        let tls_stream = connector
            .connect(&self.host, tcp_stream)
            .await
            .map_err(|e| TransportError::Tls(format!("TLS handshake failed: {}", e)))?;

        Ok(Box::new(TlsTransport { stream: tls_stream }))
    }
}
