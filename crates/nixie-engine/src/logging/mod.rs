//! One-shot logger setup for hosts that do not bring their own.

mod init;

pub use init::{LoggingConfig, init_logging};
