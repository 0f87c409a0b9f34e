//! The patchcraft error value

use crate::{ErrorKind, ErrorStatus};
use std::fmt;

/// Every fallible patchcraft operation fails with this type.
///
/// An error carries its [`ErrorKind`], a message, the operation that raised
/// it, optional `key: value` context and an optional underlying source. The
/// [`ErrorStatus`] is derived from the kind and only shows up in output.
///
/// ```rust
/// use patchcraft_error::{Error, ErrorKind};
///
/// let err = Error::new(ErrorKind::GenerationFailed, "model returned empty completion")
///     .with_operation("provider::complete")
///     .with_context("model", "gpt-3.5-turbo");
///
/// assert_eq!(err.kind(), ErrorKind::GenerationFailed);
/// assert!(err.is_generation_error());
/// ```
pub struct Error {
    kind: ErrorKind,
    message: String,
    operation: &'static str,
    context: Vec<(&'static str, String)>,
    source: Option<anyhow::Error>,
}

impl Error {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            operation: "",
            context: Vec::new(),
            source: None,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Whether the same call could succeed later. Informational only.
    pub fn status(&self) -> ErrorStatus {
        ErrorStatus::of(self.kind)
    }

    pub fn operation(&self) -> &'static str {
        self.operation
    }

    pub fn context(&self) -> &[(&'static str, String)] {
        &self.context
    }

    pub fn source_ref(&self) -> Option<&anyhow::Error> {
        self.source.as_ref()
    }

    /// Whether this is a generation failure (the run cannot proceed)
    pub fn is_generation_error(&self) -> bool {
        self.kind.is_generation()
    }

    /// Name the operation that failed.
    ///
    /// An operation set earlier is kept in context under `called`, so the
    /// innermost step stays visible as the error travels outward.
    pub fn with_operation(mut self, operation: &'static str) -> Self {
        if !self.operation.is_empty() {
            self.context.push(("called", self.operation.to_string()));
        }
        self.operation = operation;
        self
    }

    pub fn with_context(mut self, key: &'static str, value: impl Into<String>) -> Self {
        self.context.push((key, value.into()));
        self
    }

    /// Attach the underlying error. Set at most once.
    pub fn set_source(mut self, source: impl Into<anyhow::Error>) -> Self {
        debug_assert!(self.source.is_none(), "source error already set");
        self.source = Some(source.into());
        self
    }

    fn write_context(&self, f: &mut fmt::Formatter<'_>, separator: &str) -> fmt::Result {
        for (i, (key, value)) in self.context.iter().enumerate() {
            if i > 0 {
                f.write_str(separator)?;
            }
            write!(f, "{}: {}", key, value)?;
        }
        Ok(())
    }
}

/// One line, for logs and the CLI:
/// `Kind (status) at op, context { k: v } => message`
impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}) at {}", self.kind, self.status(), self.operation)?;
        if !self.context.is_empty() {
            f.write_str(", context { ")?;
            self.write_context(f, ", ")?;
            f.write_str(" }")?;
        }
        if !self.message.is_empty() {
            write!(f, " => {}", self.message)?;
        }
        Ok(())
    }
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} ({}) at {}", self.kind, self.status(), self.operation)?;
        if !self.message.is_empty() {
            writeln!(f, "\n    Message: {}", self.message)?;
        }
        if !self.context.is_empty() {
            f.write_str("\n    Context:\n        ")?;
            self.write_context(f, "\n        ")?;
            writeln!(f)?;
        }
        if let Some(source) = &self.source {
            writeln!(f, "\n    Source: {:?}", source)?;
        }
        Ok(())
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.as_ref().map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

/// A peer hanging up mid-exchange is a closed channel, not a generic I/O
/// failure; the dispatch loop reports the two differently.
impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        use std::io::ErrorKind as Io;

        let kind = match err.kind() {
            Io::NotFound => ErrorKind::FileNotFound,
            Io::PermissionDenied => ErrorKind::PermissionDenied,
            Io::BrokenPipe | Io::ConnectionReset | Io::ConnectionAborted | Io::UnexpectedEof => {
                ErrorKind::ChannelClosed
            }
            _ => ErrorKind::IoFailed,
        };
        Error::new(kind, err.to_string()).with_operation("io").set_source(err)
    }
}

impl Error {
    pub fn config_invalid(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ConfigInvalid, message)
    }

    pub fn generation_failed(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::GenerationFailed, message)
    }

    /// The environment refused `command`; `reason` is its reply verbatim
    pub fn dispatch_rejected(command: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::new(ErrorKind::DispatchRejected, reason).with_context("command", command)
    }

    pub fn channel_closed(peer: impl Into<String>) -> Self {
        let peer = peer.into();
        Self::new(ErrorKind::ChannelClosed, format!("channel to '{}' closed", peer))
            .with_context("peer", peer)
    }
}
