//! Error types for beanvalidator
//!
//! This module defines all error types used throughout the library. Field
//! validation failures, fatal configuration problems, and errors raised by
//! the constraint engine are kept apart so callers can tell them apart by kind.

use std::fmt;

use indexmap::IndexSet;
use thiserror::Error;

use crate::validators::messages::FacesMessage;

/// Result type alias using beanvalidator Error
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for beanvalidator operations
#[derive(Error, Debug)]
pub enum Error {
    /// One or more constraint violations on a field (user-facing)
    #[error("validation failed: {0}")]
    Validator(#[from] ValidatorException),

    /// Fatal configuration error (engine construction, unknown group, bad parameter)
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Expression parsing or evaluation error
    #[error("expression error: {0}")]
    Expression(String),

    /// Error raised by the constraint engine
    #[error("engine error: {0}")]
    Engine(#[from] EngineError),

    /// Saved component state could not be restored
    #[error("state error: {0}")]
    State(String),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Check if this error is a field validation failure
    pub fn is_validation_failure(&self) -> bool {
        matches!(self, Error::Validator(_))
    }

    /// Check if this error is a fatal configuration error
    pub fn is_configuration(&self) -> bool {
        match self {
            Error::Configuration(_) => true,
            Error::Engine(e) => e.is_construction(),
            _ => false,
        }
    }
}

/// Raised by a validator when the value of a component is invalid
///
/// Always carries at least one message. The first message is the primary
/// one; the full list preserves violation order without duplicates.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatorException {
    messages: Vec<FacesMessage>,
}

impl ValidatorException {
    /// Create an exception carrying a single message
    pub fn new(message: FacesMessage) -> Self {
        Self {
            messages: vec![message],
        }
    }

    /// Create an exception from a primary message and any further ones
    ///
    /// Messages equal to one already present are dropped, keeping the first
    /// occurrence.
    pub fn with_messages(first: FacesMessage, rest: impl IntoIterator<Item = FacesMessage>) -> Self {
        let messages: IndexSet<FacesMessage> = std::iter::once(first).chain(rest).collect();
        Self {
            messages: messages.into_iter().collect(),
        }
    }

    /// Get the primary message
    pub fn message(&self) -> &FacesMessage {
        &self.messages[0]
    }

    /// Get all messages
    pub fn messages(&self) -> &[FacesMessage] {
        &self.messages
    }

    /// Consume the exception and return its messages
    pub fn into_messages(self) -> Vec<FacesMessage> {
        self.messages
    }
}

impl fmt::Display for ValidatorException {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let details: Vec<_> = self.messages.iter().map(|m| m.detail.as_str()).collect();
        write!(f, "{}", details.join("; "))
    }
}

impl std::error::Error for ValidatorException {}

/// Errors raised by a constraint engine
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    /// The property cannot be addressed on the concrete runtime type
    #[error("property '{property}' is not addressable on '{class}'")]
    PropertyNotAddressable {
        /// Runtime class name of the base object
        class: String,
        /// Property that was requested
        property: String,
    },

    /// The engine (or its factory) could not be built
    #[error("could not build validator factory: {0}")]
    Construction(String),
}

impl EngineError {
    /// Check if this is a recoverable "could not evaluate" error
    pub fn is_not_addressable(&self) -> bool {
        matches!(self, EngineError::PropertyNotAddressable { .. })
    }

    /// Check if this is a construction failure
    pub fn is_construction(&self) -> bool {
        matches!(self, EngineError::Construction(_))
    }
}
