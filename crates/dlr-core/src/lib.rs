//! # dlr-core: Foundational Types for the License Registry
//!
//! This crate is the leaf of the workspace dependency graph. It defines the
//! domain primitives every other crate builds on.
//!
//! ## Key Design Principles
//!
//! 1. **Validated newtypes for identifiers.** `Address`, `LicenseId` and
//!    `DocumentHash` can only be built through validating constructors, and
//!    their `Deserialize` impls route through the same constructors. Malformed
//!    input is rejected at the boundary, not at point of use.
//!
//! 2. **UTC epoch-second timestamps.** [`Timestamp`] serializes as a bare
//!    integer of Unix seconds, matching the wire format external indexers
//!    consume.
//!
//! 3. **Injectable time.** Commit times come from a [`Clock`], so the registry
//!    is deterministic under test and replay.
//!
//! 4. **One error taxonomy.** [`RegistryError`] has exactly four kinds:
//!    not-authorized, already-exists, not-found, invalid-argument.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `dlr-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod clock;
pub mod error;
pub mod identity;
pub mod temporal;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{ErrorKind, RegistryError, ValidationError};
pub use identity::{required_text, Address, DocumentHash, LicenseId, Role};
pub use temporal::Timestamp;
