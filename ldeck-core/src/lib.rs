pub mod error;
pub mod types;
pub mod config;
pub mod envelope;
pub mod retry;

pub use error::{Error, Result};
pub use types::*;
pub use envelope::Envelope;
