//! Unified error types for the braze kernel.
//!
//! Invalid inbound envelopes are not errors: they are filtered silently by
//! the listener pipeline. Everything here is surfaced to a caller.

use thiserror::Error;

// =============================================================================
// Kernel Errors
// =============================================================================

/// Errors surfaced by kernel operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// An outbound envelope is missing required routing fields.
    #[error("envelope schema violation: {reason}")]
    SchemaViolation {
        /// Which field is missing or empty.
        reason: String,
    },

    /// The dispatch target is not registered.
    #[error("integration '{id}' not found")]
    IntegrationNotFound {
        /// The service ID the envelope was addressed to.
        id: String,
    },

    /// A filter pattern failed to compile.
    #[error("invalid pattern '{pattern}': {reason}")]
    InvalidPattern {
        /// The source pattern string.
        pattern: String,
        /// Reason for failure.
        reason: String,
    },

    /// A middleware step failed; the chain is abandoned.
    #[error(transparent)]
    Middleware(#[from] MiddlewareError),

    /// The target integration rejected the delivery.
    #[error(transparent)]
    Delivery(#[from] IntegrationError),
}

impl Error {
    /// Creates a schema violation for a missing envelope field.
    pub(crate) fn missing_field(field: &str) -> Self {
        Self::SchemaViolation {
            reason: format!("missing '{field}'"),
        }
    }
}

/// Result type for kernel operations.
pub type Result<T> = std::result::Result<T, Error>;

// =============================================================================
// Middleware Errors
// =============================================================================

/// Failure raised by a middleware step.
///
/// The chain propagates the first step failure as its single terminal
/// outcome; later steps never run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("middleware '{middleware}' failed: {reason}")]
pub struct MiddlewareError {
    /// Registered step name (`{service}.incoming` / `{service}.outgoing`).
    pub middleware: String,
    /// Human-readable failure reason.
    pub reason: String,
}

impl MiddlewareError {
    /// Creates a failure for the given step name.
    pub fn new(middleware: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            middleware: middleware.into(),
            reason: reason.into(),
        }
    }

    /// Creates a failure whose step name is filled in by the chain.
    pub fn step(reason: impl Into<String>) -> Self {
        Self::new("", reason)
    }

    /// Fills in the registered step name if the middleware left it blank.
    pub(crate) fn with_step_name(mut self, name: &str) -> Self {
        if self.middleware.is_empty() {
            self.middleware = name.to_string();
        }
        self
    }
}

// =============================================================================
// Integration Errors
// =============================================================================

/// Errors reported by an integration's delivery function.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IntegrationError {
    /// The integration has no live connection to its platform.
    #[error("integration is not connected")]
    NotConnected,

    /// Delivery to the platform failed.
    #[error("failed to deliver envelope: {0}")]
    SendFailed(String),

    /// The platform rejected the request.
    #[error("platform error: {0}")]
    Platform(String),
}

/// Result type for integration delivery.
pub type IntegrationResult<T> = std::result::Result<T, IntegrationError>;

// =============================================================================
// Transport Errors
// =============================================================================

/// Errors from the webhook HTTP transport.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Binding the listen address failed.
    #[error("failed to bind {addr}: {reason}")]
    Bind {
        /// The address that could not be bound.
        addr: String,
        /// Reason for failure.
        reason: String,
    },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(String),
}

impl From<std::io::Error> for TransportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

/// Result type for transport operations.
pub type TransportResult<T> = std::result::Result<T, TransportError>;
