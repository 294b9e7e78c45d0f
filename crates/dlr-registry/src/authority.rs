//! # Authority Registry
//!
//! Tracks the single owner and the identities allowed to issue and modify
//! licenses. Entries are never removed. There is currently no deactivation
//! path, so in practice every entry is active.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use dlr_core::{Address, Timestamp, ValidationError};

/// One identity in the authority set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorityEntry {
    /// The authorized identity.
    pub authority: Address,
    /// Whether the identity may currently mutate records.
    pub active: bool,
    /// Commit time of the add.
    pub added_at: Timestamp,
    /// The owner that added it.
    pub added_by: Address,
}

/// Result of [`AuthorityRegistry::add`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    /// A new active entry was recorded.
    Added,
    /// The identity was already active; nothing changed.
    AlreadyActive,
}

/// The owner plus the authority set, in the order identities were added.
#[derive(Debug, Clone)]
pub struct AuthorityRegistry {
    owner: Address,
    entries: Vec<AuthorityEntry>,
    by_address: HashMap<Address, usize>,
}

impl AuthorityRegistry {
    /// Create an empty authority set owned by `owner`.
    pub fn new(owner: Address) -> Self {
        Self {
            owner,
            entries: Vec::new(),
            by_address: HashMap::new(),
        }
    }

    /// The owning identity.
    pub fn owner(&self) -> Address {
        self.owner
    }

    /// Whether `identity` is an active authority. False for unknown identities.
    pub fn is_authority(&self, identity: &Address) -> bool {
        self.entry(identity).is_some_and(|e| e.active)
    }

    /// Look up the entry for `identity`.
    pub fn entry(&self, identity: &Address) -> Option<&AuthorityEntry> {
        self.by_address.get(identity).map(|&i| &self.entries[i])
    }

    /// All entries, in the order they were first added.
    pub fn entries(&self) -> &[AuthorityEntry] {
        &self.entries
    }

    /// Record `identity` as an active authority.
    ///
    /// The caller is responsible for the owner check. Re-adding an active
    /// identity is a no-op. Re-adding an inactive one reactivates it in place.
    pub fn add(
        &mut self,
        identity: Address,
        added_by: Address,
        at: Timestamp,
    ) -> Result<AddOutcome, ValidationError> {
        let identity = identity.require_nonzero("authority")?;
        if let Some(&i) = self.by_address.get(&identity) {
            let entry = &mut self.entries[i];
            if entry.active {
                return Ok(AddOutcome::AlreadyActive);
            }
            entry.active = true;
            entry.added_at = at;
            entry.added_by = added_by;
            return Ok(AddOutcome::Added);
        }
        self.by_address.insert(identity, self.entries.len());
        self.entries.push(AuthorityEntry {
            authority: identity,
            active: true,
            added_at: at,
            added_by,
        });
        Ok(AddOutcome::Added)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(last: u8) -> Address {
        let mut b = [0u8; 20];
        b[19] = last;
        Address::from_bytes(b)
    }

    fn at(secs: i64) -> Timestamp {
        Timestamp::from_epoch_secs(secs).unwrap()
    }

    #[test]
    fn new_registry_has_owner_and_no_authorities() {
        let reg = AuthorityRegistry::new(addr(1));
        assert_eq!(reg.owner(), addr(1));
        assert!(reg.entries().is_empty());
        assert!(!reg.is_authority(&addr(1)));
    }

    #[test]
    fn add_records_entry_with_metadata() {
        let mut reg = AuthorityRegistry::new(addr(1));
        assert_eq!(reg.add(addr(2), addr(1), at(100)), Ok(AddOutcome::Added));
        let entry = reg.entry(&addr(2)).unwrap();
        assert!(entry.active);
        assert_eq!(entry.added_at, at(100));
        assert_eq!(entry.added_by, addr(1));
        assert!(reg.is_authority(&addr(2)));
    }

    #[test]
    fn re_add_is_idempotent() {
        let mut reg = AuthorityRegistry::new(addr(1));
        reg.add(addr(2), addr(1), at(100)).unwrap();
        assert_eq!(
            reg.add(addr(2), addr(1), at(200)),
            Ok(AddOutcome::AlreadyActive)
        );
        assert_eq!(reg.entries().len(), 1);
        assert_eq!(reg.entry(&addr(2)).unwrap().added_at, at(100));
    }

    #[test]
    fn inactive_entry_is_reactivated_in_place() {
        let mut reg = AuthorityRegistry::new(addr(1));
        reg.add(addr(2), addr(1), at(100)).unwrap();
        reg.entries[0].active = false;
        assert!(!reg.is_authority(&addr(2)));
        assert_eq!(reg.add(addr(2), addr(1), at(300)), Ok(AddOutcome::Added));
        assert_eq!(reg.entries().len(), 1);
        assert!(reg.is_authority(&addr(2)));
        assert_eq!(reg.entry(&addr(2)).unwrap().added_at, at(300));
    }

    #[test]
    fn zero_address_rejected() {
        let mut reg = AuthorityRegistry::new(addr(1));
        assert_eq!(
            reg.add(Address::ZERO, addr(1), at(100)),
            Err(ValidationError::ZeroAddress { field: "authority" })
        );
        assert!(reg.entries().is_empty());
    }

    #[test]
    fn entries_keep_insertion_order() {
        let mut reg = AuthorityRegistry::new(addr(1));
        for i in [9u8, 3, 7] {
            reg.add(addr(i), addr(1), at(i64::from(i))).unwrap();
        }
        let order: Vec<Address> = reg.entries().iter().map(|e| e.authority).collect();
        assert_eq!(order, vec![addr(9), addr(3), addr(7)]);
    }
}
