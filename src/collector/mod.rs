pub mod input;

pub use input::{InputError, InputParser};
