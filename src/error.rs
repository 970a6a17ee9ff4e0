//! Error types for mtls-pki

use std::io;

use thiserror::Error;

/// Result type alias for mtls-pki
pub type Result<T> = std::result::Result<T, Error>;

/// mtls-pki errors
///
/// The first four kinds only occur during the issuance / bootstrap pass and
/// are fatal to it. `Handshake` is fatal to a single connection. `Timeout`
/// is the only kind a caller may retry.
#[derive(Error, Debug)]
pub enum Error {
    /// Key pair generation failed (entropy or algorithm failure)
    #[error("Key generation error: {0}")]
    KeyGeneration(String),

    /// Certificate template rejected or signing failed
    #[error("Signing error: {0}")]
    Signing(String),

    /// PEM serialization or parsing failed
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// No usable trust anchor
    #[error("Trust store error: {0}")]
    TrustStore(String),

    /// Peer certificate missing, expired, wrong usage or not chained to the trust anchor
    #[error("Handshake error: {0}")]
    Handshake(String),

    /// Client request exceeded its deadline
    #[error("Request timed out: {0}")]
    Timeout(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Transport error (non-TLS network or HTTP failure)
    #[error("Transport error: {0}")]
    Transport(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl Error {
    /// Whether repeating the operation may succeed. Only timeouts qualify;
    /// everything else means the trust domain or the peer is unusable.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }

    /// Stable short name of the error kind, used as a structured log field.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::KeyGeneration(_) => "key_generation",
            Self::Signing(_) => "signing",
            Self::Encoding(_) => "encoding",
            Self::TrustStore(_) => "trust_store",
            Self::Handshake(_) => "handshake",
            Self::Timeout(_) => "timeout",
            Self::Config(_) => "config",
            Self::Transport(_) => "transport",
            Self::Io(_) => "io",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_timeouts_are_retryable() {
        assert!(Error::Timeout("deadline".into()).is_retryable());
        assert!(!Error::Handshake("bad cert".into()).is_retryable());
        assert!(!Error::TrustStore("empty".into()).is_retryable());
        assert!(!Error::KeyGeneration("rng".into()).is_retryable());
    }

    #[test]
    fn kinds_are_distinct() {
        let kinds = [
            Error::KeyGeneration(String::new()).kind(),
            Error::Signing(String::new()).kind(),
            Error::Encoding(String::new()).kind(),
            Error::TrustStore(String::new()).kind(),
            Error::Handshake(String::new()).kind(),
            Error::Timeout(String::new()).kind(),
        ];
        let unique: std::collections::HashSet<_> = kinds.iter().collect();
        assert_eq!(unique.len(), kinds.len());
    }

    #[test]
    fn io_error_converts() {
        let err: Error = io::Error::new(io::ErrorKind::NotFound, "missing").into();
        assert_eq!(err.kind(), "io");
        assert!(err.to_string().contains("missing"));
    }
}
