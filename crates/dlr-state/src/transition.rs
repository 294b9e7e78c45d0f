//! # Status Transition Policy
//!
//! The seam between "which status changes are allowed" and the code that
//! performs them. The registry ships with [`PermissiveTransitions`]: an
//! authorized caller may assign any status from any status.

use thiserror::Error;

use dlr_core::ValidationError;

use crate::license::LicenseStatus;

/// A status change the active policy refused.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("status transition {from} -> {to} rejected by {policy} policy")]
pub struct TransitionError {
    /// Status before the change.
    pub from: LicenseStatus,
    /// Requested status.
    pub to: LicenseStatus,
    /// Name of the policy that refused it.
    pub policy: &'static str,
}

impl From<TransitionError> for ValidationError {
    fn from(e: TransitionError) -> Self {
        ValidationError::StatusTransition {
            from: e.from.to_string(),
            to: e.to.to_string(),
        }
    }
}

/// Decides which status changes are permitted.
pub trait TransitionPolicy: Send + Sync {
    /// Short name used in errors and logs.
    fn name(&self) -> &'static str;

    /// Whether `from -> to` is allowed.
    fn permits(&self, from: LicenseStatus, to: LicenseStatus) -> bool;

    /// `Ok(())` if permitted, otherwise a [`TransitionError`].
    fn check(&self, from: LicenseStatus, to: LicenseStatus) -> Result<(), TransitionError> {
        if self.permits(from, to) {
            Ok(())
        } else {
            Err(TransitionError {
                from,
                to,
                policy: self.name(),
            })
        }
    }
}

/// Accepts every transition, including out of `Revoked`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PermissiveTransitions;

impl TransitionPolicy for PermissiveTransitions {
    fn name(&self) -> &'static str {
        "permissive"
    }

    fn permits(&self, _from: LicenseStatus, _to: LicenseStatus) -> bool {
        true
    }
}
