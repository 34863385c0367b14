//! Core error types for indexed-repeat.

use crate::identity::Identity;

/// Core result type
pub type CoreResult<T> = Result<T, CoreError>;

/// Core error type
///
/// Every variant is a local invariant violation. None of them is retried or
/// recovered from silently; they surface to the caller of the operation that
/// detected them.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoreError {
    /// Two live items claim the same identity
    #[error("Key `{identity}` is already taken.")]
    DuplicateIdentity {
        /// The colliding identity
        identity: Identity,
    },

    /// Removal of an identity the table does not hold
    #[error("No entry for key `{identity}` present.")]
    UnknownIdentity {
        /// The missing identity
        identity: Identity,
    },

    /// The item source has a shape no accessor understands
    #[error("Unsupported item source ({kind}): expected a sequence or a list with a `length` property or method")]
    UnsupportedInputKind {
        /// Description of the rejected input
        kind: String,
    },

    /// No identity selector was configured
    #[error("An indexed repeat must specify an identity selector (field name or function)")]
    MissingIdentitySelector,

    /// A field selector found nothing usable as an identity
    #[error("Field `{field}` does not yield an identity")]
    UnresolvableIdentity {
        /// The projected field name
        field: String,
    },

    /// A tracked node is not attached ahead of the cursor
    #[error("Node for key `{identity}` is not attached to the synchronized range")]
    DetachedNode {
        /// Identity whose node could not be reached
        identity: Identity,
    },

    /// Configuration validation error
    #[error("Invalid option {field}: {reason}")]
    InvalidOption {
        /// Option name
        field: String,
        /// Why it was rejected
        reason: String,
    },

    /// Internal error (broken bookkeeping)
    #[error("Internal error: {message}")]
    Internal {
        /// Error message
        message: String,
    },
}

impl CoreError {
    /// Shorthand for a duplicate identity error
    #[must_use]
    pub fn duplicate(identity: &Identity) -> Self {
        Self::DuplicateIdentity {
            identity: identity.clone(),
        }
    }

    /// Shorthand for an unknown identity error
    #[must_use]
    pub fn unknown(identity: &Identity) -> Self {
        Self::UnknownIdentity {
            identity: identity.clone(),
        }
    }

    /// Shorthand for an internal error
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidOption {
            field: "options".to_string(),
            reason: err.to_string(),
        }
    }
}
