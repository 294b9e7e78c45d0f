//! # dlr-registry: Access-Controlled License Registry
//!
//! The registry tracks issuance, modification, renewal and revocation of
//! license records, keyed by license id, with a secondary index by holder
//! and an append-only, hash-chained event log.
//!
//! ## Components
//!
//! - **Authority** (`authority.rs`): the owner and the set of identities
//!   allowed to mutate records.
//! - **Access** (`access.rs`): stateless owner / active-authority checks.
//! - **Store** (`store.rs`): records, insertion order, and the holder index.
//! - **Events** (`events.rs`): the ordered, digest-chained event feed.
//! - **Registry** (`registry.rs`): the lifecycle operations, run under a
//!   single write lock so each one is applied whole or not at all.
//! - **Command** (`command.rs`): typed operation arguments for callers that
//!   submit operations as data.
//! - **Mirror** (`mirror.rs`): a reference event subscriber that tolerates
//!   duplicate delivery.
//! - **Config** (`config.rs`): deployment configuration (the owner identity).
//!
//! ## Flow
//!
//! Every mutation: access check → validation → store mutation → event append.
//! Reads bypass authorization and return owned snapshots.

pub mod access;
pub mod authority;
pub mod command;
pub mod config;
pub mod events;
pub mod mirror;
pub mod registry;
pub mod store;

pub use access::AccessControlGate;
pub use authority::{AddOutcome, AuthorityEntry, AuthorityRegistry};
pub use command::{Command, CommandOutcome, IssueLicense, UpdateLicense};
pub use config::{ConfigError, RegistryConfig, OWNER_ENV};
pub use events::{
    chain_digest, verify_records, ChainError, EventKind, EventLog, EventRecord, LicenseEvent,
    GENESIS_DIGEST,
};
pub use mirror::{Applied, LicenseMirror, MirrorError, MirroredLicense};
pub use registry::LicenseRegistry;
pub use store::LicenseStore;
