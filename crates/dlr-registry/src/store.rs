//! # License Store
//!
//! The primary keyed collection of license records, the insertion order,
//! and the secondary index from holder to license ids.
//!
//! ## Invariants
//!
//! - A license id is inserted at most once. Records are never removed, so
//!   an id is never reused.
//! - Every record's id appears in exactly one holder list: the list of its
//!   current `holder`. Lists never hold duplicates and empty lists are
//!   dropped.
//! - `sequence` is 1-based and equals the record's position in the
//!   insertion order.
//!
//! [`LicenseStore::mutate`] works on a copy of the record and commits the
//! copy together with any index move only after the mutator succeeds, so a
//! failed mutation leaves the store untouched.

use std::collections::HashMap;

use dlr_core::{Address, LicenseId, RegistryError, ValidationError};
use dlr_state::LicenseRecord;

/// Records, insertion order, and the holder index.
#[derive(Debug, Clone, Default)]
pub struct LicenseStore {
    records: HashMap<LicenseId, LicenseRecord>,
    order: Vec<LicenseId>,
    holders: HashMap<Address, Vec<LicenseId>>,
}

impl LicenseStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a new record, assigning its sequence number.
    ///
    /// Any `sequence` on the incoming record is overwritten. Returns the
    /// assigned sequence.
    pub fn insert(&mut self, mut record: LicenseRecord) -> Result<u64, RegistryError> {
        if self.records.contains_key(&record.license_id) {
            return Err(RegistryError::AlreadyExists(record.license_id));
        }
        let sequence = self.order.len() as u64 + 1;
        record.sequence = sequence;
        let id = record.license_id.clone();
        self.order.push(id.clone());
        self.holders.entry(record.holder).or_default().push(id.clone());
        self.records.insert(id, record);
        Ok(sequence)
    }

    /// Look up a record by id.
    pub fn get(&self, id: &LicenseId) -> Result<&LicenseRecord, RegistryError> {
        self.records
            .get(id)
            .ok_or_else(|| RegistryError::NotFound(id.clone()))
    }

    /// Look up a record by its 1-based sequence number.
    pub fn get_by_sequence(&self, sequence: u64) -> Option<&LicenseRecord> {
        let index = usize::try_from(sequence.checked_sub(1)?).ok()?;
        self.order.get(index).and_then(|id| self.records.get(id))
    }

    /// Whether `id` has ever been issued.
    pub fn contains(&self, id: &LicenseId) -> bool {
        self.records.contains_key(id)
    }

    /// Apply `mutator` to the record for `id` as one atomic step.
    ///
    /// The mutator sees a working copy. If it returns `Err`, or if it
    /// changed `license_id`, `issue_date`, `authority_id` or `sequence`,
    /// nothing is committed. Otherwise the copy replaces the stored record
    /// and, if `holder` changed, the id moves from the old holder's list to
    /// the tail of the new holder's list.
    pub fn mutate<R>(
        &mut self,
        id: &LicenseId,
        mutator: impl FnOnce(&mut LicenseRecord) -> Result<R, RegistryError>,
    ) -> Result<R, RegistryError> {
        let current = self.get(id)?;
        let mut working = current.clone();
        let out = mutator(&mut working)?;
        check_immutable(current, &working)?;
        let old_holder = current.holder;

        if working.holder != old_holder {
            self.detach(id, &old_holder);
            self.holders
                .entry(working.holder)
                .or_default()
                .push(id.clone());
        }
        self.records.insert(id.clone(), working);
        Ok(out)
    }

    /// All records in increasing sequence order.
    pub fn all(&self) -> Vec<&LicenseRecord> {
        self.order
            .iter()
            .filter_map(|id| self.records.get(id))
            .collect()
    }

    /// Records currently attributed to `holder`, in order of attribution.
    pub fn by_holder(&self, holder: &Address) -> Vec<&LicenseRecord> {
        self.ids_by_holder(holder)
            .iter()
            .filter_map(|id| self.records.get(id))
            .collect()
    }

    /// License ids currently attributed to `holder`, in order of attribution.
    pub fn ids_by_holder(&self, holder: &Address) -> &[LicenseId] {
        self.holders.get(holder).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Number of records ever inserted. Revocation does not reduce it.
    pub fn count(&self) -> u64 {
        self.order.len() as u64
    }

    fn detach(&mut self, id: &LicenseId, holder: &Address) {
        if let Some(ids) = self.holders.get_mut(holder) {
            ids.retain(|existing| existing != id);
            if ids.is_empty() {
                self.holders.remove(holder);
            }
        }
    }
}

fn check_immutable(before: &LicenseRecord, after: &LicenseRecord) -> Result<(), ValidationError> {
    let field = if before.license_id != after.license_id {
        "license_id"
    } else if before.issue_date != after.issue_date {
        "issue_date"
    } else if before.authority_id != after.authority_id {
        "authority_id"
    } else if before.sequence != after.sequence {
        "sequence"
    } else {
        return Ok(());
    };
    Err(ValidationError::ImmutableField { field })
}

#[cfg(test)]
mod tests {
    use super::*;
    use dlr_core::{DocumentHash, Timestamp};
    use dlr_state::LicenseStatus;
    use proptest::prelude::*;

    fn addr(last: u8) -> Address {
        let mut b = [0u8; 20];
        b[19] = last;
        Address::from_bytes(b)
    }

    fn id(s: &str) -> LicenseId {
        LicenseId::new(s).unwrap()
    }

    fn record(license_id: &str, holder: Address) -> LicenseRecord {
        LicenseRecord {
            license_id: id(license_id),
            holder,
            holder_id: "HolderId123".into(),
            name: "John Doe".into(),
            dob: "01/01/1990".into(),
            license_type: "B2".into(),
            issue_date: Timestamp::from_epoch_secs(1_697_059_200).unwrap(),
            expiry_date: Timestamp::from_epoch_secs(1_750_137_600).unwrap(),
            status: LicenseStatus::Active,
            document_hash: Some(DocumentHash::new("ipfs://QmHash123").unwrap()),
            authority_id: "SGTVT".into(),
            sequence: 0,
        }
    }

    /// Every record is in exactly its holder's list, once, and nothing else is indexed.
    fn assert_index_consistent(store: &LicenseStore) {
        let mut seen = 0usize;
        for (holder, ids) in &store.holders {
            assert!(!ids.is_empty(), "empty list kept for {holder}");
            for lid in ids {
                let rec = store.records.get(lid).expect("indexed id has a record");
                assert_eq!(&rec.holder, holder, "{lid} indexed under wrong holder");
                seen += 1;
            }
            let mut dedup = ids.clone();
            dedup.sort();
            dedup.dedup();
            assert_eq!(dedup.len(), ids.len(), "duplicate ids for {holder}");
        }
        assert_eq!(seen, store.records.len());
        for (i, lid) in store.order.iter().enumerate() {
            assert_eq!(store.records[lid].sequence, i as u64 + 1);
        }
    }

    #[test]
    fn insert_assigns_sequence_and_indexes_holder() {
        let mut store = LicenseStore::new();
        assert_eq!(store.insert(record("DL123", addr(1))).unwrap(), 1);
        assert_eq!(store.insert(record("DL124", addr(2))).unwrap(), 2);
        assert_eq!(store.count(), 2);
        assert_eq!(store.get(&id("DL124")).unwrap().sequence, 2);
        assert_eq!(store.ids_by_holder(&addr(1)), &[id("DL123")]);
        assert_index_consistent(&store);
    }

    #[test]
    fn insert_rejects_duplicate_id() {
        let mut store = LicenseStore::new();
        store.insert(record("DL123", addr(1))).unwrap();
        let err = store.insert(record("DL123", addr(2))).unwrap_err();
        assert_eq!(err, RegistryError::AlreadyExists(id("DL123")));
        assert_eq!(store.count(), 1);
        assert!(store.by_holder(&addr(2)).is_empty());
    }

    #[test]
    fn get_missing_is_not_found() {
        let store = LicenseStore::new();
        assert_eq!(
            store.get(&id("DL999")).unwrap_err(),
            RegistryError::NotFound(id("DL999"))
        );
    }

    #[test]
    fn get_by_sequence_is_one_based() {
        let mut store = LicenseStore::new();
        store.insert(record("DL123", addr(1))).unwrap();
        store.insert(record("DL124", addr(1))).unwrap();
        assert!(store.get_by_sequence(0).is_none());
        assert_eq!(store.get_by_sequence(1).unwrap().license_id, "DL123");
        assert_eq!(store.get_by_sequence(2).unwrap().license_id, "DL124");
        assert!(store.get_by_sequence(3).is_none());
    }

    #[test]
    fn all_is_in_insertion_order() {
        let mut store = LicenseStore::new();
        for lid in ["DL200", "DL100", "DL150"] {
            store.insert(record(lid, addr(1))).unwrap();
        }
        let ids: Vec<&str> = store.all().iter().map(|r| r.license_id.as_str()).collect();
        assert_eq!(ids, vec!["DL200", "DL100", "DL150"]);
    }

    #[test]
    fn mutate_moves_holder_to_tail_of_new_list() {
        let mut store = LicenseStore::new();
        store.insert(record("A", addr(1))).unwrap();
        store.insert(record("B", addr(1))).unwrap();
        store.insert(record("C", addr(1))).unwrap();
        store.insert(record("X", addr(2))).unwrap();

        store
            .mutate(&id("B"), |r| {
                r.holder = addr(2);
                Ok(())
            })
            .unwrap();

        assert_eq!(store.ids_by_holder(&addr(1)), &[id("A"), id("C")]);
        assert_eq!(store.ids_by_holder(&addr(2)), &[id("X"), id("B")]);
        assert_index_consistent(&store);
    }

    #[test]
    fn mutate_last_license_drops_holder_entry() {
        let mut store = LicenseStore::new();
        store.insert(record("DL123", addr(1))).unwrap();
        store
            .mutate(&id("DL123"), |r| {
                r.holder = addr(2);
                Ok(())
            })
            .unwrap();
        assert!(store.by_holder(&addr(1)).is_empty());
        assert!(!store.holders.contains_key(&addr(1)));
        assert_eq!(store.by_holder(&addr(2)).len(), 1);
    }

    #[test]
    fn mutate_same_holder_keeps_position() {
        let mut store = LicenseStore::new();
        store.insert(record("A", addr(1))).unwrap();
        store.insert(record("B", addr(1))).unwrap();
        store
            .mutate(&id("A"), |r| {
                r.name = "Jane Doe".into();
                Ok(())
            })
            .unwrap();
        assert_eq!(store.ids_by_holder(&addr(1)), &[id("A"), id("B")]);
        assert_eq!(store.get(&id("A")).unwrap().name, "Jane Doe");
    }

    #[test]
    fn mutate_missing_is_not_found_and_mutator_not_called() {
        let mut store = LicenseStore::new();
        let err = store
            .mutate(&id("DL999"), |_| -> Result<(), RegistryError> {
                panic!("mutator must not run")
            })
            .unwrap_err();
        assert_eq!(err, RegistryError::NotFound(id("DL999")));
    }

    #[test]
    fn failed_mutator_leaves_store_unchanged() {
        let mut store = LicenseStore::new();
        store.insert(record("DL123", addr(1))).unwrap();
        let before = store.get(&id("DL123")).unwrap().clone();

        let err = store
            .mutate(&id("DL123"), |r| -> Result<(), RegistryError> {
                r.holder = addr(2);
                r.name = "changed".into();
                Err(ValidationError::EmptyField { field: "dob" }.into())
            })
            .unwrap_err();

        assert_eq!(err.kind(), dlr_core::ErrorKind::InvalidArgument);
        assert_eq!(store.get(&id("DL123")).unwrap(), &before);
        assert_eq!(store.ids_by_holder(&addr(1)), &[id("DL123")]);
        assert!(store.by_holder(&addr(2)).is_empty());
    }

    #[test]
    fn mutate_rejects_changes_to_fixed_fields() {
        let mut store = LicenseStore::new();
        store.insert(record("DL123", addr(1))).unwrap();

        let err = store
            .mutate(&id("DL123"), |r| {
                r.holder = addr(2);
                r.authority_id = "OTHER".into();
                Ok(())
            })
            .unwrap_err();
        assert_eq!(
            err,
            RegistryError::InvalidArgument(ValidationError::ImmutableField {
                field: "authority_id"
            })
        );

        let err = store
            .mutate(&id("DL123"), |r| {
                r.issue_date = Timestamp::from_epoch_secs(1).unwrap();
                Ok(())
            })
            .unwrap_err();
        assert!(matches!(
            err,
            RegistryError::InvalidArgument(ValidationError::ImmutableField { field: "issue_date" })
        ));

        assert_eq!(store.get(&id("DL123")).unwrap().holder, addr(1));
        assert_index_consistent(&store);
    }

    #[derive(Debug, Clone)]
    enum Op {
        Insert(u8, u8),
        Move(u8, u8),
        FailingMove(u8, u8),
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        prop_oneof![
            (0u8..12, 1u8..5).prop_map(|(l, h)| Op::Insert(l, h)),
            (0u8..12, 1u8..5).prop_map(|(l, h)| Op::Move(l, h)),
            (0u8..12, 1u8..5).prop_map(|(l, h)| Op::FailingMove(l, h)),
        ]
    }

    proptest! {
        #[test]
        fn holder_index_stays_consistent(ops in proptest::collection::vec(op_strategy(), 0..64)) {
            let mut store = LicenseStore::new();
            let mut issued = 0u64;
            for op in ops {
                match op {
                    Op::Insert(l, h) => {
                        let lid = format!("L{l}");
                        let existed = store.contains(&id(&lid));
                        let res = store.insert(record(&lid, addr(h)));
                        prop_assert_eq!(res.is_err(), existed);
                        if !existed {
                            issued += 1;
                        }
                    }
                    Op::Move(l, h) => {
                        let _ = store.mutate(&id(&format!("L{l}")), |r| {
                            r.holder = addr(h);
                            Ok(())
                        });
                    }
                    Op::FailingMove(l, h) => {
                        let _ = store.mutate(&id(&format!("L{l}")), |r| -> Result<(), RegistryError> {
                            r.holder = addr(h);
                            Err(ValidationError::EmptyField { field: "name" }.into())
                        });
                    }
                }
                assert_index_consistent(&store);
            }
            prop_assert_eq!(store.count(), issued);
        }
    }
}
