pub mod ledger;

pub use ledger::{LedgerError, SentLedger};
