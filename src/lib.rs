//! Trap-protocol metric forwarder.
//!
//! Frames metric samples in the `ZBXD` wire protocol, sends them to a
//! monitoring server over short-lived TCP connections and classifies the
//! acknowledgement of every batch.

pub mod app;
pub mod buffer;
pub mod collector;
pub mod discovery;
pub mod domain;
pub mod reliability;
pub mod sender;

pub use buffer::{Batch, DataStore};
pub use discovery::{DiscoveryDocument, DiscoveryEntry, DiscoveryError};
pub use domain::{DataPoint, ForwarderError, ResultCode, SendResult, ServerMessage};
pub use sender::{SenderConfig, SenderError, TcpTransport, TrapSender, TrapTransport};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
