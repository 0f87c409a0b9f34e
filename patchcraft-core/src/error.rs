//! Patchcraft error helpers
//!
//! Re-exports patchcraft-error and provides core-specific conveniences.

pub use patchcraft_error::{Error, ErrorKind, ErrorStatus, Result};

/// Create a ConfigInvalid error naming the offending key
pub fn config_invalid(key: &'static str, reason: impl Into<String>) -> Error {
    let reason = reason.into();
    Error::config_invalid(format!("{}: {}", key, reason))
        .with_operation("config::validate")
        .with_context("key", key)
}

/// Create a GenerationFailed error
pub fn generation_failed(reason: impl Into<String>) -> Error {
    Error::generation_failed(reason)
}

/// Create a ChannelClosed error for a peer that hung up before replying
pub fn channel_closed(peer: impl Into<String>) -> Error {
    Error::channel_closed(peer)
}
