//! # patchcraft-error
//!
//! Unified error handling for patchcraft.
//!
//! ## Design Philosophy
//!
//! - **ErrorKind**: Know what error occurred (e.g., GenerationFailed, ChannelClosed)
//! - **ErrorStatus**: Derived from the kind; says whether running again could help
//! - **Error Context**: Assist in locating the cause with rich context
//! - **Error Source**: Wrap underlying errors without leaking raw types
//!
//! ## Usage
//!
//! ```rust
//! use patchcraft_error::{Error, ErrorKind};
//!
//! fn example() -> Result<(), Error> {
//!     Err(Error::new(ErrorKind::GenerationFailed, "model returned an empty completion")
//!         .with_operation("provider::complete")
//!         .with_context("model", "gpt-3.5-turbo"))
//! }
//! ```
//!
//! ## Principles
//!
//! - All functions return `Result<T, patchcraft_error::Error>`
//! - External errors are wrapped with `set_source(err)`
//! - Same error handled once, subsequent ops only append context
//! - Nothing is retried; the status is informational

mod error;
mod kind;
mod status;

pub use error::Error;
pub use kind::ErrorKind;
pub use status::ErrorStatus;

/// Result type alias using patchcraft Error
pub type Result<T> = std::result::Result<T, Error>;
