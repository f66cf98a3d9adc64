//! Error types shared by the sources, the poll tasks and the renderer.
//!
//! Source errors are transient: a poll task turns them into a degraded
//! fragment and tries again on its next tick. Render errors are fatal.

use std::fmt::{self, Display};
use std::io;

/// Failure to produce a reading from a metrics or process source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceError {
    /// The provider could not produce a reading at all.
    Unavailable(String),
    /// Access to a single entry was refused.
    PermissionDenied(String),
}

/// The terminal surface could not be painted.
#[derive(Debug)]
pub struct RenderError(pub io::Error);

// === impl SourceError ===

impl SourceError {
    pub fn unavailable(what: impl Display, err: impl Display) -> Self {
        Self::Unavailable(format!("{}: {}", what, err))
    }

    /// Maps an I/O error on `what`, keeping permission failures distinct.
    pub fn from_io(what: impl Display, err: &io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::PermissionDenied => Self::PermissionDenied(format!("{}: {}", what, err)),
            _ => Self::unavailable(what, err),
        }
    }
}

impl Display for SourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unavailable(reason) => write!(f, "source unavailable: {}", reason),
            Self::PermissionDenied(reason) => write!(f, "permission denied: {}", reason),
        }
    }
}

impl std::error::Error for SourceError {}

// === impl RenderError ===

impl Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to paint terminal: {}", self.0)
    }
}

impl std::error::Error for RenderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.0)
    }
}

impl From<io::Error> for RenderError {
    fn from(io: io::Error) -> Self {
        Self(io)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_io_keeps_permission_denied() {
        let err = io::Error::new(io::ErrorKind::PermissionDenied, "nope");
        let mapped = SourceError::from_io("/proc/1/comm", &err);
        assert!(matches!(mapped, SourceError::PermissionDenied(_)));

        let err = io::Error::new(io::ErrorKind::NotFound, "gone");
        let mapped = SourceError::from_io("/proc/1/comm", &err);
        assert!(matches!(mapped, SourceError::Unavailable(_)));
        assert!(mapped.to_string().contains("/proc/1/comm"));
    }
}
