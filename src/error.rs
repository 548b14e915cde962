//! Error types for the wallet firewall
//!
//! Library internals return these and propagate with `?`. The public decode
//! entry points never surface them: every `Err` is folded into a
//! conservative verdict before it reaches signing code.

use thiserror::Error;

/// Result type alias using our custom Error
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the wallet firewall
#[derive(Error, Debug)]
pub enum Error {
    // Input errors
    #[error("Invalid encoding: {0}")]
    InvalidEncoding(String),

    #[error("Payload too large: {size} bytes exceeds limit of {limit} bytes")]
    PayloadTooLarge { size: usize, limit: usize },

    #[error("Malformed transaction: {0}")]
    MalformedTransaction(String),

    #[error("Malformed instruction: {0}")]
    MalformedInstruction(String),

    #[error("Unresolved account at index {0} (lives in an address lookup table)")]
    UnresolvedAccount(u8),

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Check if this error came from attacker-controlled input
    ///
    /// These are expected on the hot path and are logged at debug level
    /// only; everything else indicates a local problem.
    pub fn is_malformed_input(&self) -> bool {
        matches!(
            self,
            Error::InvalidEncoding(_)
                | Error::PayloadTooLarge { .. }
                | Error::MalformedTransaction(_)
                | Error::MalformedInstruction(_)
                | Error::UnresolvedAccount(_)
        )
    }
}

impl From<base64::DecodeError> for Error {
    fn from(e: base64::DecodeError) -> Self {
        Error::InvalidEncoding(e.to_string())
    }
}

impl From<hex::FromHexError> for Error {
    fn from(e: hex::FromHexError) -> Self {
        Error::InvalidEncoding(e.to_string())
    }
}

impl From<bincode::Error> for Error {
    fn from(e: bincode::Error) -> Self {
        Error::MalformedTransaction(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_input_classification() {
        assert!(Error::InvalidEncoding("bad".to_string()).is_malformed_input());
        assert!(Error::PayloadTooLarge { size: 2000, limit: 1232 }.is_malformed_input());
        assert!(Error::UnresolvedAccount(9).is_malformed_input());
        assert!(!Error::Config("missing".to_string()).is_malformed_input());
    }

    #[test]
    fn test_conversions_map_to_input_errors() {
        let err: Error = hex::decode("zz").unwrap_err().into();
        assert!(matches!(err, Error::InvalidEncoding(_)));

        let err: Error = base64::Engine::decode(
            &base64::engine::general_purpose::STANDARD,
            "!!",
        )
        .unwrap_err()
        .into();
        assert!(matches!(err, Error::InvalidEncoding(_)));

        let err: Error = bincode::deserialize::<u64>(&[1, 2]).unwrap_err().into();
        assert!(matches!(err, Error::MalformedTransaction(_)));
        assert!(err.is_malformed_input());
    }

    #[test]
    fn test_error_messages() {
        let err = Error::PayloadTooLarge { size: 2000, limit: 1232 };
        assert_eq!(
            err.to_string(),
            "Payload too large: 2000 bytes exceeds limit of 1232 bytes"
        );
    }
}
