//! # License Registry
//!
//! The lifecycle operations over one shared state: the authority set, the
//! license store with its holder index, and the event log.
//!
//! ## Concurrency
//!
//! All state sits behind a single `parking_lot::RwLock`. A mutation takes
//! the write lock for its whole run (access check, validation, store
//! mutation, event append), so mutations are serialized and a failed one
//! leaves nothing behind. Reads take the read lock and return owned clones.
//! Nothing here is async, so the lock is never held across an await point.

use std::sync::Arc;

use parking_lot::RwLock;

use dlr_core::{Address, Clock, LicenseId, RegistryError, SystemClock, Timestamp};
use dlr_state::{LicenseRecord, LicenseStatus, PermissiveTransitions, TransitionPolicy};

use crate::access::AccessControlGate;
use crate::authority::{AddOutcome, AuthorityEntry, AuthorityRegistry};
use crate::command::{Command, CommandOutcome, IssueLicense, UpdateLicense};
use crate::config::RegistryConfig;
use crate::events::{ChainError, EventKind, EventLog, EventRecord, LicenseEvent};
use crate::store::LicenseStore;

#[derive(Debug)]
struct RegistryState {
    authorities: AuthorityRegistry,
    store: LicenseStore,
    events: EventLog,
}

/// An access-controlled license registry.
pub struct LicenseRegistry {
    state: RwLock<RegistryState>,
    clock: Arc<dyn Clock>,
    policy: Arc<dyn TransitionPolicy>,
}

impl std::fmt::Debug for LicenseRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.read();
        f.debug_struct("LicenseRegistry")
            .field("owner", &state.authorities.owner())
            .field("licenses", &state.store.count())
            .field("events", &state.events.last_seq())
            .field("policy", &self.policy.name())
            .finish_non_exhaustive()
    }
}

impl LicenseRegistry {
    /// Create a registry owned by `owner`, stamped by the system clock.
    pub fn new(owner: Address) -> Result<Self, RegistryError> {
        Self::with_clock(owner, Arc::new(SystemClock))
    }

    /// Create a registry whose commit times come from `clock`.
    pub fn with_clock(owner: Address, clock: Arc<dyn Clock>) -> Result<Self, RegistryError> {
        let owner = owner.require_nonzero("owner")?;
        tracing::info!(%owner, "license registry created");
        Ok(Self {
            state: RwLock::new(RegistryState {
                authorities: AuthorityRegistry::new(owner),
                store: LicenseStore::new(),
                events: EventLog::new(),
            }),
            clock,
            policy: Arc::new(PermissiveTransitions),
        })
    }

    /// Create a registry from deployment configuration.
    pub fn from_config(config: &RegistryConfig) -> Result<Self, RegistryError> {
        Self::new(config.owner)
    }

    /// Replace the status transition policy.
    pub fn with_policy(mut self, policy: Arc<dyn TransitionPolicy>) -> Self {
        self.policy = policy;
        self
    }

    // ── Mutations ────────────────────────────────────────────────────

    /// Grant authority status to `authority`. Owner only.
    ///
    /// Returns `false` if `authority` was already active, in which case no
    /// event is appended.
    pub fn add_authority(&self, caller: &Address, authority: Address) -> Result<bool, RegistryError> {
        let mut state = self.state.write();
        let now = self.clock.now();
        let result = state.add_authority(caller, authority, now);
        log_rejection("add_authority", caller, &result);
        result
    }

    /// Issue a new license. Active authorities only.
    pub fn issue_license(
        &self,
        caller: &Address,
        license: IssueLicense,
    ) -> Result<LicenseId, RegistryError> {
        let mut state = self.state.write();
        let result = state.issue(caller, license);
        log_rejection("issue_license", caller, &result);
        result
    }

    /// Overwrite the mutable fields of a license. Active authorities only.
    pub fn update_license(
        &self,
        caller: &Address,
        update: UpdateLicense,
    ) -> Result<(), RegistryError> {
        let mut state = self.state.write();
        let result = state.update(caller, update, self.policy.as_ref());
        log_rejection("update_license", caller, &result);
        result
    }

    /// Set a new expiry date and reactivate the license, whatever its
    /// previous status. Active authorities only.
    pub fn renew_license(
        &self,
        caller: &Address,
        license_id: &LicenseId,
        expiry_date: Timestamp,
    ) -> Result<(), RegistryError> {
        let mut state = self.state.write();
        let result = state.renew(caller, license_id, expiry_date, self.policy.as_ref());
        log_rejection("renew_license", caller, &result);
        result
    }

    /// Mark a license revoked. The expiry date is left as it was.
    /// Active authorities only.
    pub fn revoke_license(
        &self,
        caller: &Address,
        license_id: &LicenseId,
    ) -> Result<(), RegistryError> {
        let mut state = self.state.write();
        let now = self.clock.now();
        let result = state.revoke(caller, license_id, now, self.policy.as_ref());
        log_rejection("revoke_license", caller, &result);
        result
    }

    /// Run a [`Command`] submitted as data.
    pub fn execute(&self, caller: &Address, command: Command) -> Result<CommandOutcome, RegistryError> {
        match command {
            Command::AddAuthority { authority } => {
                let newly_added = self.add_authority(caller, authority)?;
                Ok(CommandOutcome::AuthorityAdded {
                    authority,
                    newly_added,
                })
            }
            Command::Issue(license) => {
                let license_id = self.issue_license(caller, license)?;
                Ok(CommandOutcome::Issued { license_id })
            }
            Command::Update(update) => {
                let license_id = update.license_id.clone();
                self.update_license(caller, update)?;
                Ok(CommandOutcome::Updated { license_id })
            }
            Command::Renew {
                license_id,
                expiry_date,
            } => {
                self.renew_license(caller, &license_id, expiry_date)?;
                Ok(CommandOutcome::Renewed { license_id })
            }
            Command::Revoke { license_id } => {
                self.revoke_license(caller, &license_id)?;
                Ok(CommandOutcome::Revoked { license_id })
            }
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    /// The record for `license_id`, revoked or not.
    pub fn get_license(&self, license_id: &LicenseId) -> Result<LicenseRecord, RegistryError> {
        self.state.read().store.get(license_id).cloned()
    }

    /// The record with 1-based insertion number `sequence`.
    pub fn get_license_by_sequence(&self, sequence: u64) -> Option<LicenseRecord> {
        self.state.read().store.get_by_sequence(sequence).cloned()
    }

    /// Number of licenses ever issued, revoked ones included.
    pub fn license_count(&self) -> u64 {
        self.state.read().store.count()
    }

    /// Every record in issuance order.
    pub fn all_licenses(&self) -> Vec<LicenseRecord> {
        self.state
            .read()
            .store
            .all()
            .into_iter()
            .cloned()
            .collect()
    }

    /// Records currently attributed to `holder`, in order of attribution.
    pub fn licenses_by_holder(&self, holder: &Address) -> Vec<LicenseRecord> {
        self.state
            .read()
            .store
            .by_holder(holder)
            .into_iter()
            .cloned()
            .collect()
    }

    pub fn is_authority(&self, identity: &Address) -> bool {
        self.state.read().authorities.is_authority(identity)
    }

    pub fn owner(&self) -> Address {
        self.state.read().authorities.owner()
    }

    /// Every authority entry in the order first added.
    pub fn authorities(&self) -> Vec<AuthorityEntry> {
        self.state.read().authorities.entries().to_vec()
    }

    /// The full event feed.
    pub fn events(&self) -> Vec<EventRecord> {
        self.state.read().events.records().to_vec()
    }

    /// Events with `seq > cursor`.
    pub fn events_since(&self, cursor: u64) -> Vec<EventRecord> {
        self.state.read().events.since(cursor).to_vec()
    }

    /// Events of one kind, in order.
    pub fn events_of_kind(&self, kind: EventKind) -> Vec<EventRecord> {
        self.state
            .read()
            .events
            .by_kind(kind)
            .into_iter()
            .cloned()
            .collect()
    }

    /// Re-derive every event digest.
    pub fn verify_event_chain(&self) -> Result<(), ChainError> {
        self.state.read().events.verify_chain()
    }
}

impl RegistryState {
    fn add_authority(
        &mut self,
        caller: &Address,
        authority: Address,
        now: Timestamp,
    ) -> Result<bool, RegistryError> {
        AccessControlGate::new(&self.authorities).require_owner(caller)?;
        match self.authorities.add(authority, *caller, now)? {
            AddOutcome::Added => {
                let record = self.events.append(LicenseEvent::AuthorityAdded { authority, at: now });
                tracing::info!(seq = record.seq, %authority, "authority added");
                Ok(true)
            }
            AddOutcome::AlreadyActive => {
                tracing::debug!(%authority, "authority already active");
                Ok(false)
            }
        }
    }

    fn issue(&mut self, caller: &Address, license: IssueLicense) -> Result<LicenseId, RegistryError> {
        AccessControlGate::new(&self.authorities).require_active_authority(caller)?;
        let license = license.validate()?;
        let license_id = license.license_id.clone();
        let holder = license.holder;
        let issue_date = license.issue_date;

        let sequence = self.store.insert(LicenseRecord {
            license_id: license.license_id,
            holder: license.holder,
            holder_id: license.holder_id,
            name: license.name,
            dob: license.dob,
            license_type: license.license_type,
            issue_date: license.issue_date,
            expiry_date: license.expiry_date,
            status: LicenseStatus::Active,
            document_hash: license.document_hash,
            authority_id: license.authority_id,
            sequence: 0,
        })?;

        let record = self.events.append(LicenseEvent::LicenseIssued {
            license_id: license_id.clone(),
            holder,
            issue_date,
        });
        tracing::info!(
            seq = record.seq,
            license_id = %license_id,
            %holder,
            sequence,
            "license issued"
        );
        Ok(license_id)
    }

    fn update(
        &mut self,
        caller: &Address,
        update: UpdateLicense,
        policy: &dyn TransitionPolicy,
    ) -> Result<(), RegistryError> {
        AccessControlGate::new(&self.authorities).require_active_authority(caller)?;
        self.store.get(&update.license_id)?;
        let update = update.validate()?;
        let license_id = update.license_id;

        let (expiry_date, status) = self.store.mutate(&license_id, |record| {
            record.set_status(update.status, policy).map_err(dlr_core::ValidationError::from)?;
            record.holder = update.holder;
            record.name = update.name;
            record.dob = update.dob;
            record.license_type = update.license_type;
            record.expiry_date = update.expiry_date;
            record.document_hash = update.document_hash;
            Ok((record.expiry_date, record.status))
        })?;

        let record = self.events.append(LicenseEvent::LicenseUpdated {
            license_id: license_id.clone(),
            expiry_date,
            status,
        });
        tracing::info!(
            seq = record.seq,
            license_id = %license_id,
            %status,
            "license updated"
        );
        Ok(())
    }

    fn renew(
        &mut self,
        caller: &Address,
        license_id: &LicenseId,
        expiry_date: Timestamp,
        policy: &dyn TransitionPolicy,
    ) -> Result<(), RegistryError> {
        AccessControlGate::new(&self.authorities).require_active_authority(caller)?;
        self.store.mutate(license_id, |record| {
            record
                .set_status(LicenseStatus::Active, policy)
                .map_err(dlr_core::ValidationError::from)?;
            record.expiry_date = expiry_date;
            Ok(())
        })?;

        let record = self.events.append(LicenseEvent::LicenseUpdated {
            license_id: license_id.clone(),
            expiry_date,
            status: LicenseStatus::Active,
        });
        tracing::info!(
            seq = record.seq,
            license_id = %license_id,
            expiry = %expiry_date,
            "license renewed"
        );
        Ok(())
    }

    fn revoke(
        &mut self,
        caller: &Address,
        license_id: &LicenseId,
        now: Timestamp,
        policy: &dyn TransitionPolicy,
    ) -> Result<(), RegistryError> {
        AccessControlGate::new(&self.authorities).require_active_authority(caller)?;
        self.store.mutate(license_id, |record| {
            record
                .set_status(LicenseStatus::Revoked, policy)
                .map_err(dlr_core::ValidationError::from)?;
            Ok(())
        })?;

        let record = self.events.append(LicenseEvent::LicenseRevoked {
            license_id: license_id.clone(),
            at: now,
        });
        tracing::info!(seq = record.seq, license_id = %license_id, "license revoked");
        Ok(())
    }
}

fn log_rejection<T>(operation: &'static str, caller: &Address, result: &Result<T, RegistryError>) {
    if let Err(e) = result {
        tracing::warn!(
            operation,
            %caller,
            kind = %e.kind(),
            error = %e,
            "registry operation rejected"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dlr_core::{DocumentHash, ManualClock, ValidationError};

    const OWNER: &str = "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266";
    const AUTHORITY: &str = "0x70997970c51812dc3a010c7d01b50e0d17dc79c8";
    const HOLDER: &str = "0x3c44cdddb6a900fa2b585dd299e03d12fa4293bc";

    fn addr(s: &str) -> Address {
        Address::parse(s).unwrap()
    }

    fn ts(secs: i64) -> Timestamp {
        Timestamp::from_epoch_secs(secs).unwrap()
    }

    fn registry() -> LicenseRegistry {
        let clock = Arc::new(ManualClock::new(ts(1_700_000_000)));
        let reg = LicenseRegistry::with_clock(addr(OWNER), clock).unwrap();
        reg.add_authority(&addr(OWNER), addr(AUTHORITY)).unwrap();
        reg
    }

    fn issue(id: &str) -> IssueLicense {
        IssueLicense {
            license_id: LicenseId::new(id).unwrap(),
            holder: addr(HOLDER),
            holder_id: "HolderId123".into(),
            name: "John Doe".into(),
            dob: "01/01/1990".into(),
            license_type: "B2".into(),
            issue_date: ts(1_697_059_200),
            expiry_date: ts(1_750_137_600),
            document_hash: Some(DocumentHash::new("ipfs://QmHash123").unwrap()),
            authority_id: "SGTVT".into(),
        }
    }

    #[test]
    fn zero_owner_is_rejected() {
        let err = LicenseRegistry::new(Address::ZERO).unwrap_err();
        assert_eq!(
            err,
            RegistryError::InvalidArgument(ValidationError::ZeroAddress { field: "owner" })
        );
    }

    #[test]
    fn readd_active_authority_emits_nothing() {
        let reg = registry();
        assert_eq!(reg.events().len(), 1);
        assert!(!reg.add_authority(&addr(OWNER), addr(AUTHORITY)).unwrap());
        assert_eq!(reg.events().len(), 1);
        assert_eq!(reg.authorities().len(), 1);
    }

    #[test]
    fn validation_runs_after_access_check() {
        let reg = registry();
        let mut bad = issue("DL123");
        bad.name.clear();
        let err = reg.issue_license(&addr(HOLDER), bad).unwrap_err();
        assert!(matches!(err, RegistryError::NotAuthorized { .. }));
    }

    #[test]
    fn update_preserves_holder_id_and_issue_fields() {
        let reg = registry();
        let id = reg.issue_license(&addr(AUTHORITY), issue("DL123")).unwrap();
        reg.update_license(
            &addr(AUTHORITY),
            UpdateLicense {
                license_id: id.clone(),
                holder: addr(HOLDER),
                name: "John Q. Doe".into(),
                dob: "01/01/1990".into(),
                license_type: "C".into(),
                expiry_date: ts(1_781_673_600),
                status: LicenseStatus::Active,
                document_hash: None,
            },
        )
        .unwrap();
        let rec = reg.get_license(&id).unwrap();
        assert_eq!(rec.holder_id, "HolderId123");
        assert_eq!(rec.authority_id, "SGTVT");
        assert_eq!(rec.issue_date, ts(1_697_059_200));
        assert_eq!(rec.license_type, "C");
        assert_eq!(rec.document_hash, None);
    }

    struct RevokedIsFinal;

    impl TransitionPolicy for RevokedIsFinal {
        fn name(&self) -> &'static str {
            "revoked-is-final"
        }

        fn permits(&self, from: LicenseStatus, to: LicenseStatus) -> bool {
            from != LicenseStatus::Revoked || to == LicenseStatus::Revoked
        }
    }

    #[test]
    fn custom_policy_blocks_renewal_of_revoked_license() {
        let reg = registry().with_policy(Arc::new(RevokedIsFinal));
        let id = reg.issue_license(&addr(AUTHORITY), issue("DL123")).unwrap();
        reg.revoke_license(&addr(AUTHORITY), &id).unwrap();
        let events_before = reg.events().len();

        let err = reg
            .renew_license(&addr(AUTHORITY), &id, ts(1_781_673_600))
            .unwrap_err();
        assert!(matches!(
            err,
            RegistryError::InvalidArgument(ValidationError::StatusTransition { .. })
        ));
        let rec = reg.get_license(&id).unwrap();
        assert_eq!(rec.status, LicenseStatus::Revoked);
        assert_eq!(rec.expiry_date, ts(1_750_137_600));
        assert_eq!(reg.events().len(), events_before);
    }

    #[test]
    fn execute_dispatches_commands() {
        let reg = registry();
        let out = reg
            .execute(&addr(AUTHORITY), Command::Issue(issue("DL123")))
            .unwrap();
        assert_eq!(
            out,
            CommandOutcome::Issued {
                license_id: LicenseId::new("DL123").unwrap()
            }
        );
        let out = reg
            .execute(
                &addr(AUTHORITY),
                Command::Revoke {
                    license_id: LicenseId::new("DL123").unwrap(),
                },
            )
            .unwrap();
        assert!(matches!(out, CommandOutcome::Revoked { .. }));
        assert!(reg.verify_event_chain().is_ok());
    }

    #[test]
    fn lookup_by_sequence_is_one_based() {
        let reg = registry();
        reg.issue_license(&addr(AUTHORITY), issue("DL123")).unwrap();
        reg.issue_license(&addr(AUTHORITY), issue("DL124")).unwrap();
        assert!(reg.get_license_by_sequence(0).is_none());
        assert_eq!(reg.get_license_by_sequence(2).unwrap().license_id, "DL124");
        assert!(reg.get_license_by_sequence(3).is_none());
    }

    #[test]
    fn registry_is_shareable_across_threads() {
        let reg = Arc::new(registry());
        let handles: Vec<_> = (0..4)
            .map(|t| {
                let reg = Arc::clone(&reg);
                std::thread::spawn(move || {
                    for i in 0..25 {
                        let id = format!("DL-{t}-{i}");
                        reg.issue_license(&addr(AUTHORITY), issue(&id)).unwrap();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(reg.license_count(), 100);
        assert_eq!(reg.licenses_by_holder(&addr(HOLDER)).len(), 100);
        assert!(reg.verify_event_chain().is_ok());
    }
}
