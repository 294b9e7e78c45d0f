//! # Event Log
//!
//! Append-only, strictly ordered feed of every state-changing operation,
//! consumed by external indexers. Failed operations never produce an entry.
//!
//! ## Chain
//!
//! Each [`EventRecord`] carries a 1-based `seq` and a SHA-256 `digest` over
//! the previous record's digest, its own `seq`, and a fixed binary encoding
//! of the event. The first record chains from [`GENESIS_DIGEST`]. A
//! subscriber can re-derive the chain with [`chain_digest`] to detect
//! reordering, gaps, or tampering.
//!
//! The binary encoding is length-prefixed and independent of serde, so
//! digest computation cannot fail.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

use dlr_core::{Address, LicenseId, Timestamp};
use dlr_state::LicenseStatus;

/// Digest every chain starts from.
pub const GENESIS_DIGEST: &str =
    "0000000000000000000000000000000000000000000000000000000000000000";

// ---------------------------------------------------------------------------
// LicenseEvent
// ---------------------------------------------------------------------------

/// A domain event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum LicenseEvent {
    /// The owner granted authority status.
    AuthorityAdded { authority: Address, at: Timestamp },
    /// A license was issued. `issue_date` is the license's own issue date.
    LicenseIssued {
        license_id: LicenseId,
        holder: Address,
        issue_date: Timestamp,
    },
    /// A license was updated or renewed.
    LicenseUpdated {
        license_id: LicenseId,
        expiry_date: Timestamp,
        status: LicenseStatus,
    },
    /// A license was revoked at commit time `at`.
    LicenseRevoked { license_id: LicenseId, at: Timestamp },
}

impl LicenseEvent {
    /// The event's kind.
    pub fn kind(&self) -> EventKind {
        match self {
            Self::AuthorityAdded { .. } => EventKind::AuthorityAdded,
            Self::LicenseIssued { .. } => EventKind::LicenseIssued,
            Self::LicenseUpdated { .. } => EventKind::LicenseUpdated,
            Self::LicenseRevoked { .. } => EventKind::LicenseRevoked,
        }
    }

    /// The license the event concerns, if any.
    pub fn license_id(&self) -> Option<&LicenseId> {
        match self {
            Self::AuthorityAdded { .. } => None,
            Self::LicenseIssued { license_id, .. }
            | Self::LicenseUpdated { license_id, .. }
            | Self::LicenseRevoked { license_id, .. } => Some(license_id),
        }
    }

    fn encode_into(&self, hasher: &mut Sha256) {
        hasher.update(self.kind().as_str().as_bytes());
        match self {
            Self::AuthorityAdded { authority, at } => {
                hasher.update(authority.as_bytes());
                hasher.update(at.epoch_secs().to_be_bytes());
            }
            Self::LicenseIssued {
                license_id,
                holder,
                issue_date,
            } => {
                encode_str(hasher, license_id.as_str());
                hasher.update(holder.as_bytes());
                hasher.update(issue_date.epoch_secs().to_be_bytes());
            }
            Self::LicenseUpdated {
                license_id,
                expiry_date,
                status,
            } => {
                encode_str(hasher, license_id.as_str());
                hasher.update(expiry_date.epoch_secs().to_be_bytes());
                hasher.update([status.code()]);
            }
            Self::LicenseRevoked { license_id, at } => {
                encode_str(hasher, license_id.as_str());
                hasher.update(at.epoch_secs().to_be_bytes());
            }
        }
    }
}

fn encode_str(hasher: &mut Sha256, s: &str) {
    hasher.update((s.len() as u64).to_be_bytes());
    hasher.update(s.as_bytes());
}

/// Discriminant of [`LicenseEvent`], for filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    AuthorityAdded,
    LicenseIssued,
    LicenseUpdated,
    LicenseRevoked,
}

impl EventKind {
    /// Return the string representation of this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AuthorityAdded => "AuthorityAdded",
            Self::LicenseIssued => "LicenseIssued",
            Self::LicenseUpdated => "LicenseUpdated",
            Self::LicenseRevoked => "LicenseRevoked",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// EventRecord
// ---------------------------------------------------------------------------

/// An event with its position and chain digest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    /// 1-based position in the log.
    pub seq: u64,
    /// Hex SHA-256 chaining this record to its predecessor.
    pub digest: String,
    pub event: LicenseEvent,
}

/// Compute the digest of the record at `seq` that follows `prev_digest`.
pub fn chain_digest(prev_digest: &str, seq: u64, event: &LicenseEvent) -> String {
    let mut hasher = Sha256::new();
    hasher.update(prev_digest.as_bytes());
    hasher.update(seq.to_be_bytes());
    event.encode_into(&mut hasher);
    to_hex(&hasher.finalize())
}

fn to_hex(bytes: &[u8]) -> String {
    use std::fmt::Write;
    bytes.iter().fold(String::with_capacity(bytes.len() * 2), |mut s, b| {
        let _ = write!(s, "{b:02x}");
        s
    })
}

/// A break in the digest chain.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChainError {
    /// `seq` is not one more than its predecessor's.
    #[error("event sequence break: expected {expected}, found {found}")]
    SequenceBreak { expected: u64, found: u64 },

    /// The stored digest does not match the recomputed one.
    #[error("event {seq} digest mismatch")]
    DigestMismatch { seq: u64 },
}

// ---------------------------------------------------------------------------
// EventLog
// ---------------------------------------------------------------------------

/// The append-only event log. Entries are never trimmed.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    records: Vec<EventRecord>,
}

impl EventLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an event and return the sealed record.
    pub fn append(&mut self, event: LicenseEvent) -> &EventRecord {
        let seq = self.last_seq() + 1;
        let digest = chain_digest(self.head_digest(), seq, &event);
        self.records.push(EventRecord { seq, digest, event });
        &self.records[self.records.len() - 1]
    }

    /// All records, oldest first.
    pub fn records(&self) -> &[EventRecord] {
        &self.records
    }

    /// Records with `seq > cursor`. A cursor of 0 returns everything.
    pub fn since(&self, cursor: u64) -> &[EventRecord] {
        let start = usize::try_from(cursor)
            .unwrap_or(usize::MAX)
            .min(self.records.len());
        &self.records[start..]
    }

    /// Records of one kind, oldest first.
    pub fn by_kind(&self, kind: EventKind) -> Vec<&EventRecord> {
        self.records
            .iter()
            .filter(|r| r.event.kind() == kind)
            .collect()
    }

    /// Records concerning one license, oldest first.
    pub fn for_license(&self, id: &LicenseId) -> Vec<&EventRecord> {
        self.records
            .iter()
            .filter(|r| r.event.license_id() == Some(id))
            .collect()
    }

    /// Sequence number of the newest record, or 0 when empty.
    pub fn last_seq(&self) -> u64 {
        self.records.last().map_or(0, |r| r.seq)
    }

    /// Digest of the newest record, or [`GENESIS_DIGEST`] when empty.
    pub fn head_digest(&self) -> &str {
        self.records
            .last()
            .map_or(GENESIS_DIGEST, |r| r.digest.as_str())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Re-derive every digest from genesis.
    pub fn verify_chain(&self) -> Result<(), ChainError> {
        verify_records(&self.records)
    }
}

/// Verify a contiguous run of records that starts at seq 1.
pub fn verify_records(records: &[EventRecord]) -> Result<(), ChainError> {
    let mut prev = GENESIS_DIGEST;
    for (i, record) in records.iter().enumerate() {
        let expected = i as u64 + 1;
        if record.seq != expected {
            return Err(ChainError::SequenceBreak {
                expected,
                found: record.seq,
            });
        }
        if chain_digest(prev, record.seq, &record.event) != record.digest {
            return Err(ChainError::DigestMismatch { seq: record.seq });
        }
        prev = record.digest.as_str();
    }
    Ok(())
}
