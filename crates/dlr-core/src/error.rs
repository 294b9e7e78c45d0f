//! # Error Types
//!
//! The registry's error taxonomy. Every failure a caller can observe is one
//! of four kinds, and every failure is detected before any state is touched.
//!
//! - `NotAuthorized`: the caller lacks the owner or authority role.
//! - `AlreadyExists`: a license id was already used at issuance.
//! - `NotFound`: an operation references an unknown license id.
//! - `InvalidArgument`: a required field or identity is malformed; carries
//!   the specific [`ValidationError`].

use thiserror::Error;

use crate::identity::{Address, LicenseId, Role};

/// Top-level error type for registry operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// Caller lacks the role the operation requires.
    #[error("not authorized: {caller} does not hold the {required} role")]
    NotAuthorized {
        /// The rejected caller.
        caller: Address,
        /// The role the operation requires.
        required: Role,
    },

    /// License id has been used before.
    #[error("license id already exists: {0}")]
    AlreadyExists(LicenseId),

    /// License id is unknown.
    #[error("license does not exist: {0}")]
    NotFound(LicenseId),

    /// Malformed or empty input.
    #[error("invalid argument: {0}")]
    InvalidArgument(#[from] ValidationError),
}

impl RegistryError {
    /// The coarse error kind, for reporting across process boundaries.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotAuthorized { .. } => ErrorKind::NotAuthorized,
            Self::AlreadyExists(_) => ErrorKind::AlreadyExists,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::InvalidArgument(_) => ErrorKind::InvalidArgument,
        }
    }
}

/// Coarse classification of a [`RegistryError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotAuthorized,
    AlreadyExists,
    NotFound,
    InvalidArgument,
}

impl ErrorKind {
    /// Return the string representation of this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotAuthorized => "not_authorized",
            Self::AlreadyExists => "already_exists",
            Self::NotFound => "not_found",
            Self::InvalidArgument => "invalid_argument",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Boundary validation failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A required text field was empty or whitespace-only.
    #[error("{field} must not be empty")]
    EmptyField {
        /// Name of the offending field.
        field: &'static str,
    },

    /// A text field exceeded its length limit.
    #[error("{field} must not exceed {max} characters")]
    FieldTooLong {
        /// Name of the offending field.
        field: &'static str,
        /// Maximum permitted length in characters.
        max: usize,
    },

    /// An address did not match `0x` followed by 40 hex digits.
    #[error("malformed address {0:?}: expected 0x followed by 40 hex digits")]
    MalformedAddress(String),

    /// The zero address was supplied where a real identity is required.
    #[error("{field} must not be the zero address")]
    ZeroAddress {
        /// Name of the offending field.
        field: &'static str,
    },

    /// A record mutation attempted to alter a field fixed at issuance.
    #[error("{field} is immutable once issued")]
    ImmutableField {
        /// Name of the offending field.
        field: &'static str,
    },

    /// The active transition policy rejected a status change.
    #[error("status transition {from} -> {to} is not permitted")]
    StatusTransition {
        /// Status before the change.
        from: String,
        /// Requested status.
        to: String,
    },

    /// An epoch value outside the representable range.
    #[error("invalid unix timestamp: {0}")]
    InvalidTimestamp(i64),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_error_converts_into_invalid_argument() {
        let err: RegistryError = ValidationError::EmptyField { field: "name" }.into();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert_eq!(err.to_string(), "invalid argument: name must not be empty");
    }

    #[test]
    fn not_authorized_names_caller_and_role() {
        let caller = Address::parse("0x00000000000000000000000000000000000000aa").unwrap();
        let err = RegistryError::NotAuthorized {
            caller,
            required: Role::Authority,
        };
        let msg = err.to_string();
        assert!(msg.contains("0x00000000000000000000000000000000000000aa"));
        assert!(msg.contains("authority"));
        assert_eq!(err.kind().as_str(), "not_authorized");
    }

    #[test]
    fn not_found_display() {
        let err = RegistryError::NotFound(LicenseId::new("DL999").unwrap());
        assert_eq!(err.to_string(), "license does not exist: DL999");
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }
}
