pub mod client;
pub mod response;
pub mod serialization;
pub mod stats;
pub mod transmission;

pub use client::{MAX_RESPONSE_LEN, TcpTransport, TrapTransport, TransportError};
pub use response::{FailureCountInterpreter, ResponseDecoder, ResponseInterpreter};
pub use serialization::{BatchSerializer, FRAME_PREFIX, HEADER_LEN, SerializationError, frame};
pub use stats::{SendStats, SendStatsSnapshot};
pub use transmission::{
    DEFAULT_PORT, DEFAULT_SERVER, DEFAULT_TIMEOUT, SenderConfig, SenderError, TrapSender,
};

#[cfg(test)]
pub use client::MockTrapTransport;
