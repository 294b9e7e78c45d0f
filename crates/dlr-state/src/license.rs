//! # License Record
//!
//! The registry's core entity and its status enum.
//!
//! Fields fixed at issuance (`license_id`, `issue_date`, `authority_id`,
//! `sequence`) are plain public fields like the rest; the store rejects any
//! mutation that alters them.

use serde::{Deserialize, Serialize};

use dlr_core::{Address, DocumentHash, LicenseId, Timestamp};

use crate::transition::{TransitionError, TransitionPolicy};

// ─── License Status ──────────────────────────────────────────────────

/// The stored status of a license.
///
/// The discriminants are the wire codes external indexers and UIs use.
/// Serializes as the name; deserializes from either the name or the code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", try_from = "StatusRepr")]
#[repr(u8)]
pub enum LicenseStatus {
    /// License is valid.
    Active = 0,
    /// License is temporarily not valid.
    Suspended = 1,
    /// License has been withdrawn.
    Revoked = 2,
    /// License has been marked expired by an authority.
    Expired = 3,
}

impl LicenseStatus {
    /// All statuses in wire-code order.
    pub const ALL: [LicenseStatus; 4] = [
        Self::Active,
        Self::Suspended,
        Self::Revoked,
        Self::Expired,
    ];

    /// The numeric wire code.
    pub fn code(&self) -> u8 {
        *self as u8
    }

    /// Look up a status by wire code.
    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.get(code as usize).copied()
    }

    /// Whether the license is currently valid for use.
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Active)
    }

    /// Return the string representation of this status.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "ACTIVE",
            Self::Suspended => "SUSPENDED",
            Self::Revoked => "REVOKED",
            Self::Expired => "EXPIRED",
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StatusRepr {
    Code(u8),
    Name(String),
}

impl TryFrom<StatusRepr> for LicenseStatus {
    type Error = String;

    fn try_from(repr: StatusRepr) -> Result<Self, Self::Error> {
        match repr {
            StatusRepr::Code(code) => {
                Self::from_code(code).ok_or_else(|| format!("unknown status code {code}"))
            }
            StatusRepr::Name(name) => Self::ALL
                .into_iter()
                .find(|s| s.as_str() == name)
                .ok_or_else(|| format!("unknown status {name:?}")),
        }
    }
}

impl std::fmt::Display for LicenseStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── License Record ──────────────────────────────────────────────────

/// A license as held by the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LicenseRecord {
    /// Unique, never-reused identifier.
    pub license_id: LicenseId,
    /// Current legal holder; keys the holder index.
    pub holder: Address,
    /// External civil identifier of the holder.
    pub holder_id: String,
    /// Holder's name.
    pub name: String,
    /// Holder's date of birth, as supplied.
    pub dob: String,
    /// License class (e.g. `B2`).
    pub license_type: String,
    /// Set once at issuance.
    pub issue_date: Timestamp,
    /// Changed by update and renew.
    pub expiry_date: Timestamp,
    /// Stored status. Change it through [`LicenseRecord::set_status`].
    pub status: LicenseStatus,
    /// Pointer to an externally stored document, if any.
    pub document_hash: Option<DocumentHash>,
    /// Issuing organizational unit. Set once at issuance.
    pub authority_id: String,
    /// Insertion order, assigned by the store. Starts at 1.
    pub sequence: u64,
}

impl LicenseRecord {
    /// Change the stored status, subject to `policy`.
    ///
    /// Every status change in the registry goes through here.
    pub fn set_status(
        &mut self,
        to: LicenseStatus,
        policy: &dyn TransitionPolicy,
    ) -> Result<(), TransitionError> {
        policy.check(self.status, to)?;
        self.status = to;
        Ok(())
    }

    /// Whether `now` is strictly past the expiry date.
    pub fn is_past_expiry(&self, now: Timestamp) -> bool {
        now > self.expiry_date
    }

    /// The status a reader should display at `now`.
    ///
    /// An `Active` record past its expiry date reads as `Expired`. All other
    /// stored statuses are reported as-is. The stored status is not changed.
    pub fn effective_status(&self, now: Timestamp) -> LicenseStatus {
        match self.status {
            LicenseStatus::Active if self.is_past_expiry(now) => LicenseStatus::Expired,
            other => other,
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────
