//! # dlr-state: License Record and Status Machine
//!
//! Defines the license record held by the registry and the rules governing
//! its status field.
//!
//! ## Status Model
//!
//! ```text
//! Active ◀──▶ Suspended
//!   │  ▲         │
//!   │  └─renew───┤
//!   ▼            ▼
//! Revoked     Expired
//! ```
//!
//! Issuance always yields `Active`. Renewal forces `Active` from any state.
//! Revocation forces `Revoked`. An authorized update may assign any status;
//! that permissiveness is isolated behind [`LicenseRecord::set_status`] and
//! the [`TransitionPolicy`] trait so a stricter table can be swapped in.
//!
//! `Expired` exists both as a stored status (set only by explicit update)
//! and as a derived fact: [`LicenseRecord::effective_status`] reports
//! `Expired` for an `Active` record whose expiry date has passed.

pub mod license;
pub mod transition;

pub use license::{LicenseRecord, LicenseStatus};
pub use transition::{PermissiveTransitions, TransitionError, TransitionPolicy};
