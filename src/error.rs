/// Domain-specific error types for the marketplace library.
#[derive(Debug, thiserror::Error)]
pub enum MarketError {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Protocol violation: {0}")]
    Protocol(String),

    #[error("Pending queue is exhausted")]
    QueueExhausted,

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Convenience type alias.
pub type MarketResult<T> = Result<T, MarketError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_queue_exhausted_display() {
        let err = MarketError::QueueExhausted;
        assert_eq!(err.to_string(), "Pending queue is exhausted");
    }

    #[test]
    fn test_io_error_converts() {
        fn fails() -> MarketResult<()> {
            Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "gone"))?;
            Ok(())
        }
        assert!(matches!(fails(), Err(MarketError::Io(_))));
    }
}
