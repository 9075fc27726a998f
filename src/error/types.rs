//! Error types
//!
//! Defines domain-specific error types for each module of the collector.

use std::fmt;
use std::io;

use crate::client::Identity;

/// Signature service errors
#[derive(Debug)]
pub enum AuthError {
    KeyGeneration(String),
    InvalidKey(String),
    MalformedKey(String),
    MalformedSignature { expected: usize, actual: usize },
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthError::KeyGeneration(e) => write!(f, "Key generation failed: {}", e),
            AuthError::InvalidKey(e) => write!(f, "Invalid private key: {}", e),
            AuthError::MalformedKey(e) => write!(f, "Malformed public key: {}", e),
            AuthError::MalformedSignature { expected, actual } => write!(
                f,
                "Malformed signature: expected {} bytes, got {}",
                expected, actual
            ),
        }
    }
}

impl std::error::Error for AuthError {}

/// Connection registry errors
#[derive(Debug)]
pub enum RegistryError {
    UnknownIdentity(Identity),
    IdentitiesExhausted,
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistryError::UnknownIdentity(id) => write!(f, "Unknown identity: {}", id),
            RegistryError::IdentitiesExhausted => write!(f, "No identities left to assign"),
        }
    }
}

impl std::error::Error for RegistryError {}

/// Wire protocol errors
#[derive(Debug)]
pub enum ProtocolError {
    KeyTooLong(usize),
    EmptyKey,
    ConnectionClosed,
    UnexpectedResponse(i32),
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtocolError::KeyTooLong(limit) => {
                write!(f, "Public key exceeds {} bytes", limit)
            }
            ProtocolError::EmptyKey => write!(f, "No public key received"),
            ProtocolError::ConnectionClosed => write!(f, "Connection closed by peer"),
            ProtocolError::UnexpectedResponse(code) => {
                write!(f, "Unexpected response code: {}", code)
            }
        }
    }
}

impl std::error::Error for ProtocolError {}

/// General collector error that encompasses all error types
#[derive(Debug)]
pub enum CollectorError {
    Auth(AuthError),
    Registry(RegistryError),
    Protocol(ProtocolError),
    Config(config::ConfigError),
    IoError(io::Error),
}

impl CollectorError {
    /// True when the peer simply went away; these end a session without being a fault.
    pub fn is_disconnect(&self) -> bool {
        match self {
            CollectorError::Protocol(ProtocolError::ConnectionClosed) => true,
            CollectorError::IoError(e) => matches!(
                e.kind(),
                io::ErrorKind::UnexpectedEof
                    | io::ErrorKind::ConnectionReset
                    | io::ErrorKind::ConnectionAborted
                    | io::ErrorKind::BrokenPipe
            ),
            _ => false,
        }
    }
}

impl fmt::Display for CollectorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CollectorError::Auth(e) => write!(f, "Authentication error: {}", e),
            CollectorError::Registry(e) => write!(f, "Registry error: {}", e),
            CollectorError::Protocol(e) => write!(f, "Protocol error: {}", e),
            CollectorError::Config(e) => write!(f, "Configuration error: {}", e),
            CollectorError::IoError(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for CollectorError {}

impl From<AuthError> for CollectorError {
    fn from(error: AuthError) -> Self {
        CollectorError::Auth(error)
    }
}

impl From<RegistryError> for CollectorError {
    fn from(error: RegistryError) -> Self {
        CollectorError::Registry(error)
    }
}

impl From<ProtocolError> for CollectorError {
    fn from(error: ProtocolError) -> Self {
        CollectorError::Protocol(error)
    }
}

impl From<config::ConfigError> for CollectorError {
    fn from(error: config::ConfigError) -> Self {
        CollectorError::Config(error)
    }
}

impl From<io::Error> for CollectorError {
    fn from(error: io::Error) -> Self {
        CollectorError::IoError(error)
    }
}
