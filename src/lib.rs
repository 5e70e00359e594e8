pub mod cli;
pub mod config;
pub mod error;
pub mod record;
pub mod store;
pub mod transfer;

pub use error::{ErrorKind, PorterError, Result};
