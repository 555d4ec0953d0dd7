//! Error types for Sieve.

use crate::record::RecordId;
use alloc::string::String;
use thiserror::Error;

/// Result type alias for Sieve operations.
pub type Result<T> = core::result::Result<T, Error>;

/// Error types for store and filtered-view operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// The type name does not resolve to a registered model.
    #[error("No model was found for '{name}'")]
    UnknownType { name: String },
    /// The type name passed to a store method is malformed.
    #[error("Invalid type name: {reason}")]
    InvalidTypeName { reason: String },
    /// A caller tried to mutate a derived, read-only view.
    #[error("The result of a client-side filter (on {model}) is immutable.")]
    ImmutableView { model: String },
    /// The fetch collaborator failed.
    #[error("Fetch for {model} failed: {message}")]
    Fetch { model: String, message: String },
    /// The view was destroyed before a pending operation settled.
    #[error("The filtered view on {model} was destroyed")]
    ViewDestroyed { model: String },
    /// No record exists with the given identity.
    #[error("Record not found: {id}")]
    RecordNotFound { id: RecordId },
    /// A pushed document could not be applied.
    #[error("Invalid document: {message}")]
    InvalidDocument { message: String },
}

impl Error {
    /// Creates an unknown type error.
    pub fn unknown_type(name: impl Into<String>) -> Self {
        Error::UnknownType { name: name.into() }
    }

    /// Creates an invalid type name error.
    pub fn invalid_type_name(reason: impl Into<String>) -> Self {
        Error::InvalidTypeName {
            reason: reason.into(),
        }
    }

    /// Creates an immutable view error.
    pub fn immutable_view(model: impl Into<String>) -> Self {
        Error::ImmutableView {
            model: model.into(),
        }
    }

    /// Creates a fetch error.
    pub fn fetch(model: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Fetch {
            model: model.into(),
            message: message.into(),
        }
    }

    /// Creates a view destroyed error.
    pub fn view_destroyed(model: impl Into<String>) -> Self {
        Error::ViewDestroyed {
            model: model.into(),
        }
    }

    /// Creates a record not found error.
    pub fn record_not_found(id: RecordId) -> Self {
        Error::RecordNotFound { id }
    }

    /// Creates an invalid document error.
    pub fn invalid_document(message: impl Into<String>) -> Self {
        Error::InvalidDocument {
            message: message.into(),
        }
    }
}
