//! # Identity Newtypes
//!
//! Domain-primitive newtypes for the identifiers the registry handles.
//! Each identifier is a distinct type; a [`LicenseId`] cannot be passed
//! where an [`Address`] is expected.
//!
//! ## Validation
//!
//! All constructors validate, and every `Deserialize` impl goes through the
//! same constructor (`#[serde(try_from = "String")]`), so an invalid value
//! cannot be smuggled in through JSON or YAML.
//!
//! - [`Address`]: `0x` + 40 hex digits, case-insensitive, rendered lowercase.
//!   The zero address is well-formed; callers that need a real identity
//!   check [`Address::is_zero`].
//! - [`LicenseId`]: non-empty after trimming, at most 128 characters.
//! - [`DocumentHash`]: opaque, non-empty, at most 512 characters. No
//!   reachability or format check is made.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Maximum length of a license identifier.
pub const MAX_LICENSE_ID_LEN: usize = 128;

/// Maximum length of a descriptive text field.
pub const MAX_TEXT_LEN: usize = 256;

/// Maximum length of a document hash.
pub const MAX_DOCUMENT_HASH_LEN: usize = 512;

// ---------------------------------------------------------------------------
// Address
// ---------------------------------------------------------------------------

/// A 20-byte account identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address([u8; 20]);

impl Address {
    /// The all-zero address. Never a valid holder or authority.
    pub const ZERO: Address = Address([0u8; 20]);

    /// Parse an address from its `0x`-prefixed hex form.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::MalformedAddress`] if the prefix is
    /// missing, the length is not 40 hex digits, or a non-hex character
    /// is present.
    pub fn parse(s: &str) -> Result<Self, ValidationError> {
        let malformed = || ValidationError::MalformedAddress(s.to_string());
        let hex = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .ok_or_else(malformed)?;
        if hex.len() != 40 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(malformed());
        }
        let mut bytes = [0u8; 20];
        for (i, byte) in bytes.iter_mut().enumerate() {
            *byte = u8::from_str_radix(&hex[i * 2..i * 2 + 2], 16).map_err(|_| malformed())?;
        }
        Ok(Self(bytes))
    }

    /// Build an address from raw bytes.
    pub fn from_bytes(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    /// Access the raw bytes.
    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Whether this is the zero address.
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 20]
    }

    /// Reject the zero address, naming the field in the error.
    pub fn require_nonzero(self, field: &'static str) -> Result<Self, ValidationError> {
        if self.is_zero() {
            return Err(ValidationError::ZeroAddress { field });
        }
        Ok(self)
    }
}

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("0x")?;
        for b in &self.0 {
            write!(f, "{b:02x}")?;
        }
        Ok(())
    }
}

impl std::str::FromStr for Address {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Address {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Address> for String {
    fn from(value: Address) -> Self {
        value.to_string()
    }
}

// ---------------------------------------------------------------------------
// LicenseId
// ---------------------------------------------------------------------------

/// Globally unique license identifier (e.g. `DL123`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LicenseId(String);

impl LicenseId {
    /// Create a validated license id. Surrounding whitespace is trimmed.
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        required_text("license_id", value, MAX_LICENSE_ID_LEN).map(Self)
    }

    /// Access the id string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for LicenseId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for LicenseId {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<LicenseId> for String {
    fn from(value: LicenseId) -> Self {
        value.0
    }
}

impl PartialEq<&str> for LicenseId {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

// ---------------------------------------------------------------------------
// DocumentHash
// ---------------------------------------------------------------------------

/// Opaque pointer to an externally stored document (e.g. `ipfs://Qm...`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DocumentHash(String);

impl DocumentHash {
    /// Create a document hash. Only emptiness and length are checked.
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        required_text("document_hash", value, MAX_DOCUMENT_HASH_LEN).map(Self)
    }

    /// Access the hash string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for DocumentHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for DocumentHash {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<DocumentHash> for String {
    fn from(value: DocumentHash) -> Self {
        value.0
    }
}

// ---------------------------------------------------------------------------
// Roles
// ---------------------------------------------------------------------------

/// The two privileged roles in the registry.
///
/// `Owner` grows the authority set; `Authority` mutates license records.
/// The roles are independent: the owner is not an authority unless added.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Owner,
    Authority,
}

impl Role {
    /// Return the string representation of this role.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Owner => "owner",
            Self::Authority => "authority",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Text fields
// ---------------------------------------------------------------------------

/// Validate a required text field: trimmed, non-empty, at most `max` chars.
pub fn required_text(
    field: &'static str,
    value: impl Into<String>,
    max: usize,
) -> Result<String, ValidationError> {
    let value = value.into();
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyField { field });
    }
    if trimmed.chars().count() > max {
        return Err(ValidationError::FieldTooLong { field, max });
    }
    Ok(trimmed.to_string())
}
