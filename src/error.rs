// Error types shared by the display controller and the event pipeline

use thiserror::Error;

/// Failure reported by a native backend call, carrying the backend's message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct NativeError(pub String);

impl NativeError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Result type returned by backend calls.
pub type NativeResult<T> = std::result::Result<T, NativeError>;

/// Errors surfaced by `Context` operations.
#[derive(Debug, Error)]
pub enum Error {
    /// The caller asked for something contradictory. Raised before any
    /// state is touched and never retried.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A native call failed. Any partially built display state has been
    /// rolled back by the time this is returned.
    #[error("platform error: {0}")]
    Platform(#[from] NativeError),

    #[error("video system not initialized")]
    NotInitialized,

    #[error("no display mode has been set")]
    NoWindow,
}

impl Error {
    pub(crate) fn config(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::config("Cannot set negative sized display mode");
        assert_eq!(
            err.to_string(),
            "configuration error: Cannot set negative sized display mode"
        );

        let err: Error = NativeError::new("No available video device").into();
        assert_eq!(err.to_string(), "platform error: No available video device");

        assert_eq!(Error::NotInitialized.to_string(), "video system not initialized");
        assert_eq!(Error::NoWindow.to_string(), "no display mode has been set");
    }

    #[test]
    fn test_native_error_converts_with_question_mark() {
        fn fails() -> NativeResult<()> {
            Err(NativeError::new("boom"))
        }
        fn wrapper() -> Result<()> {
            fails()?;
            Ok(())
        }
        assert!(matches!(wrapper(), Err(Error::Platform(NativeError(msg))) if msg == "boom"));
    }
}
