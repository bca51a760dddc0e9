use super::client::{TcpTransport, TrapTransport, TransportError};
use super::response::{FailureCountInterpreter, ResponseDecoder, ResponseInterpreter};
use super::serialization::{BatchSerializer, SerializationError, frame};
use super::stats::SendStats;
use crate::buffer::{Batch, DataStore};
use crate::domain::data_point::DataPointError;
use crate::domain::{DataPoint, ResultCode, SendResult};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, error, info, warn};

pub const DEFAULT_SERVER: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 10051;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Error, Debug)]
pub enum SenderError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(#[from] DataPointError),
    #[error("Serialization failed: {0}")]
    SerializationFailed(#[from] SerializationError),
    #[error("Invalid response pattern: {0}")]
    InvalidPattern(#[from] regex::Error),
}

#[derive(Debug, Clone)]
pub struct SenderConfig {
    pub server: String,
    pub port: u16,
    /// Applied to connect, write and each read.
    pub timeout: Duration,
    /// Log the offending batch whenever the server reports failures.
    pub verbose: bool,
}

impl Default for SenderConfig {
    fn default() -> Self {
        Self {
            server: DEFAULT_SERVER.to_string(),
            port: DEFAULT_PORT,
            timeout: DEFAULT_TIMEOUT,
            verbose: false,
        }
    }
}

/// Client for the trap protocol.
///
/// Holds the pending data points and sends them in one or more batches, one
/// connection per batch. Results are reported per batch and the store is
/// never cleared implicitly.
pub struct TrapSender<T: TrapTransport = TcpTransport> {
    config: SenderConfig,
    transport: T,
    store: DataStore,
    serializer: BatchSerializer,
    decoder: ResponseDecoder,
    stats: Arc<SendStats>,
}

impl TrapSender<TcpTransport> {
    pub fn new(config: SenderConfig) -> Result<Self, SenderError> {
        let transport = TcpTransport::new(config.server.clone(), config.port, config.timeout);
        Self::with_transport(config, transport)
    }
}

impl<T: TrapTransport> TrapSender<T> {
    pub fn with_transport(config: SenderConfig, transport: T) -> Result<Self, SenderError> {
        Ok(Self {
            config,
            transport,
            store: DataStore::new(),
            serializer: BatchSerializer::new(),
            decoder: ResponseDecoder::new(FailureCountInterpreter::new()?),
            stats: Arc::new(SendStats::new()),
        })
    }

    /// Replaces the default `info` parsing.
    pub fn with_interpreter(mut self, interpreter: impl ResponseInterpreter + 'static) -> Self {
        self.decoder = ResponseDecoder::new(interpreter);
        self
    }

    pub fn config(&self) -> &SenderConfig {
        &self.config
    }

    pub fn stats(&self) -> Arc<SendStats> {
        Arc::clone(&self.stats)
    }

    pub fn add_data(
        &mut self,
        host: impl Into<String>,
        key: impl Into<String>,
        value: impl Into<String>,
        clock: Option<i64>,
    ) -> Result<(), SenderError> {
        let point = DataPoint::new(host, key, value, clock)?;
        self.store.push(point);
        Ok(())
    }

    /// Appends an already built point after validating it.
    pub fn add_point(&mut self, point: DataPoint) -> Result<(), SenderError> {
        point.validate()?;
        self.store.push(point);
        Ok(())
    }

    pub fn clear_data(&mut self) {
        self.store.clear();
    }

    /// Copy of the stored points; changing it does not affect the sender.
    pub fn get_data(&self) -> Vec<DataPoint> {
        self.store.snapshot()
    }

    pub fn remove_data_point(&mut self, point: &DataPoint) -> bool {
        self.store.remove_first(point)
    }

    pub fn data_len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// Sends the stored points in consecutive chunks of at most
    /// `max_per_connection` (all at once when `None` or zero).
    ///
    /// Every chunk is attempted even if an earlier one failed, and one result
    /// is returned per chunk in order. An empty store sends nothing.
    pub async fn send_data(
        &self,
        packet_clock: Option<i64>,
        max_per_connection: Option<usize>,
    ) -> Result<Vec<SendResult>, SenderError> {
        let mut results = Vec::new();

        for (index, chunk) in self.store.chunks(max_per_connection).enumerate() {
            let batch = Batch::new(chunk.to_vec(), packet_clock);
            debug!(
                "Sending chunk {} ({} points) as batch {}",
                index + 1,
                batch.size(),
                batch.id()
            );
            results.push(self.send_batch(&batch).await?);
        }

        Ok(results)
    }

    /// Sends one point right away, bypassing the store.
    pub async fn send_single(
        &self,
        host: impl Into<String>,
        key: impl Into<String>,
        value: impl Into<String>,
        clock: Option<i64>,
    ) -> Result<SendResult, SenderError> {
        let point = DataPoint::new(host, key, value, clock)?;
        self.send_point(point).await
    }

    /// Sends each stored point on its own connection so that a rejected point
    /// can be told apart from the accepted ones.
    pub async fn send_data_one_by_one(&self) -> Result<Vec<(SendResult, DataPoint)>, SenderError> {
        let mut results = Vec::with_capacity(self.store.len());
        for point in &self.store {
            let result = self.send_point(point.clone()).await?;
            results.push((result, point.clone()));
        }
        Ok(results)
    }

    async fn send_point(&self, point: DataPoint) -> Result<SendResult, SenderError> {
        self.send_batch(&Batch::single(point)).await
    }

    /// Encodes, transmits and classifies one batch.
    pub async fn send_batch(&self, batch: &Batch) -> Result<SendResult, SenderError> {
        let json = self.serializer.encode_json(batch)?;
        let payload = frame(json.as_bytes());
        let start = Instant::now();

        let result = match self.transport.exchange(&payload).await {
            Ok(raw) => self.decoder.decode(&raw, &json),
            Err(TransportError::ResponseTooLarge { declared, limit }) => SendResult::from_error(
                ResultCode::InvalidResponse,
                format!(
                    "Invalid response from server. Declared length {declared} exceeds {limit} bytes\n---\n{json}\n---"
                ),
            ),
            Err(e) => SendResult::from_error(
                ResultCode::ConnectionError,
                format!("Error talking to server {}: {}", self.transport.endpoint(), e),
            ),
        };

        let latency = start.elapsed();
        self.stats
            .record(result.code, batch.size(), payload.len(), latency);
        self.report(batch, &json, &result, latency);

        Ok(result)
    }

    fn report(&self, batch: &Batch, json: &str, result: &SendResult, latency: Duration) {
        match result.code {
            ResultCode::Ok => info!(
                "Sent batch {} ({} points, {}) in {:?}",
                batch.id(),
                batch.size(),
                result.message,
                latency
            ),
            ResultCode::SendFailed => {
                warn!(
                    "Server reported {} failed point(s) in batch {}: {}",
                    result.failed_count().unwrap_or_default(),
                    batch.id(),
                    result.message
                );
                if self.config.verbose {
                    error!("Failures reported by server when sending:\n{}", json);
                }
            }
            ResultCode::ParseError => error!(
                "Unable to parse server response for batch {}: {}",
                batch.id(),
                result.message
            ),
            ResultCode::InvalidResponse | ResultCode::ConnectionError => {
                error!("Batch {} not delivered: {}", batch.id(), result.message);
            }
        }
    }
}

impl<T: TrapTransport> fmt::Display for TrapSender<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for point in &self.store {
            writeln!(f, "{point}")?;
        }
        write!(f, "Count: {}", self.store.len())
    }
}
