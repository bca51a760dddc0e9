use super::serialization::{FRAME_PREFIX, LENGTH_FIELD_LEN};
use async_trait::async_trait;
use std::io;
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::debug;

#[cfg(test)]
use mockall::automock;

/// Largest response body the transport agrees to buffer.
pub const MAX_RESPONSE_LEN: u64 = 128 * 1024 * 1024;

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(#[source] io::Error),
    #[error("Timed out during {stage} after {timeout:?}")]
    Timeout {
        stage: &'static str,
        timeout: Duration,
    },
    #[error("I/O error during {stage}: {source}")]
    Io {
        stage: &'static str,
        #[source]
        source: io::Error,
    },
    #[error("Declared response length {declared} exceeds limit of {limit} bytes")]
    ResponseTooLarge { declared: u64, limit: u64 },
}

/// One request/response exchange with the trap server.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait TrapTransport: Send + Sync {
    /// Sends `payload` and returns the raw framed response.
    ///
    /// If the response does not open with the protocol prefix, only the bytes
    /// read so far are returned and the caller decides what that means.
    async fn exchange(&self, payload: &[u8]) -> Result<Vec<u8>, TransportError>;

    fn endpoint(&self) -> String;
}

/// Plain TCP transport: a fresh connection per exchange, closed afterwards.
#[derive(Debug, Clone)]
pub struct TcpTransport {
    server: String,
    port: u16,
    timeout: Duration,
}

impl TcpTransport {
    pub fn new(server: impl Into<String>, port: u16, timeout: Duration) -> Self {
        Self {
            server: server.into(),
            port,
            timeout,
        }
    }

    async fn with_timeout<T, F>(&self, stage: &'static str, fut: F) -> Result<T, TransportError>
    where
        F: std::future::Future<Output = io::Result<T>>,
    {
        timeout(self.timeout, fut)
            .await
            .map_err(|_| TransportError::Timeout {
                stage,
                timeout: self.timeout,
            })?
            .map_err(|source| TransportError::Io { stage, source })
    }

    /// Reads up to the 5 prefix bytes. A peer that closes early after sending
    /// bytes that cannot start a frame gets those bytes back as its response;
    /// closing on an empty or still-plausible prefix is an I/O error.
    async fn read_prefix(&self, stream: &mut TcpStream) -> Result<Vec<u8>, TransportError> {
        let mut prefix = [0u8; FRAME_PREFIX.len()];
        let mut filled = 0;

        while filled < prefix.len() {
            let read = self
                .with_timeout("read header", stream.read(&mut prefix[filled..]))
                .await?;
            if read == 0 {
                if filled > 0 && !FRAME_PREFIX.starts_with(&prefix[..filled]) {
                    break;
                }
                return Err(TransportError::Io {
                    stage: "read header",
                    source: io::Error::from(io::ErrorKind::UnexpectedEof),
                });
            }
            filled += read;
        }

        Ok(prefix[..filled].to_vec())
    }

    async fn converse(
        &self,
        stream: &mut TcpStream,
        payload: &[u8],
    ) -> Result<Vec<u8>, TransportError> {
        self.with_timeout("write", stream.write_all(payload)).await?;
        self.with_timeout("flush", stream.flush()).await?;

        let prefix = self.read_prefix(stream).await?;
        if prefix != FRAME_PREFIX {
            return Ok(prefix);
        }

        let mut length_field = [0u8; LENGTH_FIELD_LEN];
        self.with_timeout("read length", stream.read_exact(&mut length_field))
            .await?;
        let declared = u32::from_le_bytes([
            length_field[0],
            length_field[1],
            length_field[2],
            length_field[3],
        ]) as u64;
        if declared > MAX_RESPONSE_LEN {
            return Err(TransportError::ResponseTooLarge {
                declared,
                limit: MAX_RESPONSE_LEN,
            });
        }

        let mut body = vec![0u8; declared as usize];
        self.with_timeout("read body", stream.read_exact(&mut body))
            .await?;

        let mut response = prefix;
        response.reserve(length_field.len() + body.len());
        response.extend_from_slice(&length_field);
        response.extend_from_slice(&body);
        Ok(response)
    }
}

#[async_trait]
impl TrapTransport for TcpTransport {
    async fn exchange(&self, payload: &[u8]) -> Result<Vec<u8>, TransportError> {
        let mut stream = timeout(
            self.timeout,
            TcpStream::connect((self.server.as_str(), self.port)),
        )
        .await
        .map_err(|_| TransportError::Timeout {
            stage: "connect",
            timeout: self.timeout,
        })?
        .map_err(TransportError::ConnectionFailed)?;

        let result = self.converse(&mut stream, payload).await;

        if let Err(e) = stream.shutdown().await {
            debug!("Shutdown of connection to {} failed: {}", self.endpoint(), e);
        }

        result
    }

    fn endpoint(&self) -> String {
        format!("{}:{}", self.server, self.port)
    }
}
