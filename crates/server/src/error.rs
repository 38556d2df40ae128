//! Errors surfaced by the stdio host.

/// Failures while dispatching a host event.
#[derive(Debug, thiserror::Error)]
pub enum HostError {
    /// The line was not a recognizable event.
    #[error("INVALID_INPUT: {0}")]
    InvalidEvent(String),

    /// Reading events or writing replies failed.
    #[error("IO_ERROR: {0}")]
    Io(#[from] std::io::Error),

    /// The worker rejected or failed the event.
    #[error(transparent)]
    Worker(#[from] skycache_core::Error),
}

impl From<serde_json::Error> for HostError {
    fn from(err: serde_json::Error) -> Self {
        HostError::InvalidEvent(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_event_code() {
        let err: HostError = serde_json::from_str::<serde_json::Value>("{").unwrap_err().into();
        assert!(err.to_string().starts_with("INVALID_INPUT"));
    }

    #[test]
    fn test_worker_error_transparent() {
        let err = HostError::from(skycache_core::Error::InvalidState("nope".into()));
        assert_eq!(err.to_string(), skycache_core::Error::InvalidState("nope".into()).to_string());
    }
}
