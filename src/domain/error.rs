use thiserror::Error;

/// Top-level error type for the forwarder pipeline.
#[derive(Error, Debug)]
pub enum ForwarderError {
    #[error("Configuration error: {0}")]
    Config(#[from] crate::app::ConfigError),

    #[error("Logging error: {0}")]
    Logging(#[from] crate::app::InitializationError),

    #[error("Input error: {0}")]
    Input(#[from] crate::collector::InputError),

    #[error("Sender error: {0}")]
    Sender(#[from] crate::sender::SenderError),

    #[error("Ledger error: {0}")]
    Ledger(#[from] crate::reliability::LedgerError),
}
