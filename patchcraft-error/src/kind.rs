//! Error kinds for patchcraft operations

use std::fmt;

/// The kind of error that occurred.
///
/// This enum categorizes errors to help users write clear error handling logic.
/// Users can match on ErrorKind to decide how to handle specific error cases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ErrorKind {
    // =========================================================================
    // Configuration
    // =========================================================================
    /// Invalid configuration or parameters
    ConfigInvalid,

    // =========================================================================
    // Generation errors (fatal for a run)
    // =========================================================================
    /// The model call failed or returned nothing usable
    GenerationFailed,

    /// Rate limit exceeded
    RateLimited,

    /// The provider rejected the credentials
    AuthenticationFailed,

    // =========================================================================
    // Dispatch errors
    // =========================================================================
    /// The patching environment rejected a command
    DispatchRejected,

    /// The patching environment closed the channel
    ChannelClosed,

    // =========================================================================
    // IO errors
    // =========================================================================
    /// File not found
    FileNotFound,

    /// Permission denied
    PermissionDenied,

    /// IO operation failed
    IoFailed,

    /// Network error
    NetworkFailed,
}

impl ErrorKind {
    /// Returns the error kind as a static string
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::ConfigInvalid => "ConfigInvalid",

            ErrorKind::GenerationFailed => "GenerationFailed",
            ErrorKind::RateLimited => "RateLimited",
            ErrorKind::AuthenticationFailed => "AuthenticationFailed",

            ErrorKind::DispatchRejected => "DispatchRejected",
            ErrorKind::ChannelClosed => "ChannelClosed",

            ErrorKind::FileNotFound => "FileNotFound",
            ErrorKind::PermissionDenied => "PermissionDenied",
            ErrorKind::IoFailed => "IoFailed",
            ErrorKind::NetworkFailed => "NetworkFailed",
        }
    }

    /// Whether this kind means the model call produced nothing usable
    pub fn is_generation(&self) -> bool {
        matches!(
            self,
            ErrorKind::GenerationFailed
                | ErrorKind::RateLimited
                | ErrorKind::AuthenticationFailed
                | ErrorKind::NetworkFailed
        )
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
