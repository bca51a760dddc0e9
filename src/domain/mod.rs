//! Domain layer for trap-forwarder.
//!
//! Contains the canonical types shared across all modules:
//! - `DataPoint`: a single (host, key, value, clock) sample
//! - `ResultCode` / `SendResult`: the outcome of one round trip
//! - `ForwarderError`: Top-level error type

pub mod data_point;
pub mod error;
pub mod result;

pub use data_point::DataPoint;
pub use error::ForwarderError;
pub use result::{InfoSummary, ResultCode, SendResult, ServerMessage, ServerResponse};
