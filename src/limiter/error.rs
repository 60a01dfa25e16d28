//! Error types.
//!
//! `Limiter::allow` never fails. The only errors this crate produces happen
//! while a limiter is being built.

use thiserror::Error;

/// Errors raised while constructing a [`Limiter`](crate::Limiter).
#[derive(Debug, Error)]
pub enum LimiterError {
    /// The configuration violates a construction-time contract.
    #[error("invalid limiter configuration: {0}")]
    InvalidConfig(&'static str),

    /// The operating system refused to start the background sweeper.
    #[error("failed to spawn sweeper thread: {0}")]
    SweeperSpawn(#[from] std::io::Error),
}

/// Result alias used by fallible constructors.
pub type Result<T> = std::result::Result<T, LimiterError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        let err = LimiterError::InvalidConfig("rate must be greater than 0");
        assert_eq!(
            err.to_string(),
            "invalid limiter configuration: rate must be greater than 0"
        );

        let io = std::io::Error::new(std::io::ErrorKind::Other, "no threads");
        let err: LimiterError = io.into();
        assert!(matches!(err, LimiterError::SweeperSpawn(_)));
        assert!(err.to_string().contains("no threads"));
    }
}
