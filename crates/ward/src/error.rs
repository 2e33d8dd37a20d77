//! Error types shared by the safety primitives.

use thiserror::Error;

use crate::signal::{Signal, SignalKind};

/// Errors surfaced by Ward operations.
#[derive(Debug, Error)]
pub enum Error {
    /// The operation was interrupted by a delivered signal.
    #[error("interrupted by {0}")]
    Interrupted(SignalKind),
    /// Input rejected before anything was sent.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),
    /// Failure reported by the RPC transport.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
    /// Configuration could not be loaded.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
}

impl Signal for Error {
    fn signal_kind(&self) -> Option<SignalKind> {
        match self {
            Error::Interrupted(kind) => Some(*kind),
            _ => None,
        }
    }
}

/// Result alias for Ward operations.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Rejected user input. Always names the offending value and the accepted
/// vocabulary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A permission outside the restricting set.
    #[error("only {allowed:?} permissions are supported, got '{permission}' instead")]
    UnsupportedPermission {
        /// The rejected permission.
        permission: String,
        /// The restricting set, in the order it was configured.
        allowed: Vec<String>,
    },
    /// An action other than `allow` or `deny`.
    #[error("action must be either 'allow' or 'deny', got '{action}' instead")]
    UnknownAction {
        /// The rejected action.
        action: String,
    },
    /// An entry without any permissions.
    #[error("an ACL entry needs at least one permission")]
    EmptyPermissions,
}

/// Opaque error from the transport, propagated unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct TransportError {
    /// Transport-specific error code, if any.
    pub code: Option<String>,
    /// Human readable description.
    pub message: String,
}

/// Code the in-tree transports use for a missing remote object.
pub const NOT_FOUND_CODE: &str = "not_found";

impl TransportError {
    /// Create an error without a code.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            code: None,
            message: message.into(),
        }
    }

    /// Create an error carrying a transport code.
    pub fn with_code(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: Some(code.into()),
            message: message.into(),
        }
    }

    /// Create a "resource not found" error.
    pub fn not_found(id: &str) -> Self {
        Self::with_code(NOT_FOUND_CODE, format!("resource '{id}' does not exist"))
    }

    /// Returns true if the remote object did not exist.
    pub fn is_not_found(&self) -> bool {
        self.code.as_deref() == Some(NOT_FOUND_CODE)
    }
}

/// Errors loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Reading the config file failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// The config document was malformed.
    #[error("invalid config: {0}")]
    Parse(#[from] serde_json::Error),
}
