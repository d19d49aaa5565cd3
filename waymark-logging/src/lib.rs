//! Structured logging initialisation for waymark
//!
//! Installs a global `tracing` subscriber built from
//! [`LoggingConfig`](waymark_config::LoggingConfig). Initialisation is
//! idempotent: the first call wins and later calls are ignored.

pub mod init;

pub use init::{build_env_filter, init_logging_from_config};
