pub mod batch;
pub mod store;

pub use batch::Batch;
pub use store::{DataStore, chunk_size};
