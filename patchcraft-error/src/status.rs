//! Whether a failed call could succeed if made again

use crate::ErrorKind;
use std::fmt;

/// Shown next to the kind in error output. Nothing in patchcraft retries, so
/// this only tells the operator whether running again is worth a try.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorStatus {
    /// Will fail again with the same input
    Permanent,
    /// Rate limits, flaky network
    Temporary,
}

impl ErrorStatus {
    pub fn of(kind: ErrorKind) -> Self {
        match kind {
            ErrorKind::NetworkFailed | ErrorKind::RateLimited => ErrorStatus::Temporary,
            _ => ErrorStatus::Permanent,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorStatus::Permanent => "permanent",
            ErrorStatus::Temporary => "temporary",
        }
    }
}

impl fmt::Display for ErrorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
