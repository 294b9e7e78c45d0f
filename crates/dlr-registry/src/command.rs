//! # Commands
//!
//! Typed arguments for every mutating operation, plus a tagged [`Command`]
//! enum for callers that submit operations as data (scripts, queues, an
//! API layer).
//!
//! Identities, license ids and document hashes are validated newtypes, so
//! malformed values are rejected when a command is deserialized, as are
//! unknown keys. `status` accepts either the name (`"SUSPENDED"`) or the
//! numeric wire code (`1`). Free-text fields are checked by
//! [`IssueLicense::validate`] and [`UpdateLicense::validate`], which the
//! registry runs after the access and existence checks and before touching
//! the store.

use serde::{Deserialize, Serialize};

use dlr_core::identity::MAX_TEXT_LEN;
use dlr_core::{required_text, Address, DocumentHash, LicenseId, Timestamp, ValidationError};
use dlr_state::LicenseStatus;

/// Arguments to issue a new license.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IssueLicense {
    pub license_id: LicenseId,
    pub holder: Address,
    pub holder_id: String,
    pub name: String,
    pub dob: String,
    pub license_type: String,
    pub issue_date: Timestamp,
    pub expiry_date: Timestamp,
    #[serde(default)]
    pub document_hash: Option<DocumentHash>,
    pub authority_id: String,
}

impl IssueLicense {
    /// Check required fields and return the arguments with text trimmed.
    pub fn validate(self) -> Result<Self, ValidationError> {
        Ok(Self {
            holder: self.holder.require_nonzero("holder")?,
            holder_id: required_text("holder_id", self.holder_id, MAX_TEXT_LEN)?,
            name: required_text("name", self.name, MAX_TEXT_LEN)?,
            dob: required_text("dob", self.dob, MAX_TEXT_LEN)?,
            license_type: required_text("license_type", self.license_type, MAX_TEXT_LEN)?,
            authority_id: required_text("authority_id", self.authority_id, MAX_TEXT_LEN)?,
            ..self
        })
    }
}

/// Arguments to overwrite the mutable fields of a license.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateLicense {
    pub license_id: LicenseId,
    pub holder: Address,
    pub name: String,
    pub dob: String,
    pub license_type: String,
    pub expiry_date: Timestamp,
    pub status: LicenseStatus,
    #[serde(default)]
    pub document_hash: Option<DocumentHash>,
}

impl UpdateLicense {
    /// Check required fields and return the arguments with text trimmed.
    pub fn validate(self) -> Result<Self, ValidationError> {
        Ok(Self {
            holder: self.holder.require_nonzero("holder")?,
            name: required_text("name", self.name, MAX_TEXT_LEN)?,
            dob: required_text("dob", self.dob, MAX_TEXT_LEN)?,
            license_type: required_text("license_type", self.license_type, MAX_TEXT_LEN)?,
            ..self
        })
    }
}

/// A mutating registry operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case", deny_unknown_fields)]
pub enum Command {
    AddAuthority {
        authority: Address,
    },
    Issue(IssueLicense),
    Update(UpdateLicense),
    Renew {
        license_id: LicenseId,
        expiry_date: Timestamp,
    },
    Revoke {
        license_id: LicenseId,
    },
}

impl Command {
    /// Short operation name for logs and reports.
    pub fn name(&self) -> &'static str {
        match self {
            Self::AddAuthority { .. } => "add_authority",
            Self::Issue(_) => "issue",
            Self::Update(_) => "update",
            Self::Renew { .. } => "renew",
            Self::Revoke { .. } => "revoke",
        }
    }
}

/// What a successful [`Command`] did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CommandOutcome {
    /// `newly_added` is false when the identity was already active.
    AuthorityAdded { authority: Address, newly_added: bool },
    Issued { license_id: LicenseId },
    Updated { license_id: LicenseId },
    Renewed { license_id: LicenseId },
    Revoked { license_id: LicenseId },
}
