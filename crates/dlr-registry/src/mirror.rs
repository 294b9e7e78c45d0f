//! # Event Mirror
//!
//! A read-side projection built only from the event feed, the way an
//! off-line index or persistence layer would consume it.
//!
//! Delivery is assumed at-least-once. A record whose `seq` is at or below
//! the last applied one is acknowledged as a duplicate and changes nothing.
//! A record that skips ahead is refused, so the mirror never silently misses
//! an event. Each applied record's digest is re-derived from the previous
//! one, so a tampered or reordered feed is detected at the point it diverges.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use dlr_core::{Address, LicenseId, Timestamp};
use dlr_state::LicenseStatus;

use crate::events::{chain_digest, EventRecord, LicenseEvent, GENESIS_DIGEST};

/// What the mirror knows about one license.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MirroredLicense {
    pub license_id: LicenseId,
    /// Holder at issuance. Holder changes are not carried by the feed.
    pub holder: Address,
    pub issue_date: Timestamp,
    /// `None` until the first update or renewal.
    pub expiry_date: Option<Timestamp>,
    pub status: LicenseStatus,
    pub revoked_at: Option<Timestamp>,
}

/// Result of offering one record to the mirror.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    Applied,
    /// Already seen; ignored.
    Duplicate,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MirrorError {
    #[error("event feed gap: expected seq {expected}, got {got}")]
    Gap { expected: u64, got: u64 },

    #[error("event {seq} refers to unknown license {license_id}")]
    UnknownLicense { seq: u64, license_id: LicenseId },

    #[error("event {seq} digest does not extend the mirrored chain")]
    DigestMismatch { seq: u64 },
}

/// Projection of the registry rebuilt from [`EventRecord`]s.
#[derive(Debug, Clone)]
pub struct LicenseMirror {
    last_applied: u64,
    last_digest: String,
    licenses: BTreeMap<LicenseId, MirroredLicense>,
    authorities: BTreeMap<Address, Timestamp>,
}

impl Default for LicenseMirror {
    fn default() -> Self {
        Self::new()
    }
}

impl LicenseMirror {
    pub fn new() -> Self {
        Self {
            last_applied: 0,
            last_digest: GENESIS_DIGEST.to_string(),
            licenses: BTreeMap::new(),
            authorities: BTreeMap::new(),
        }
    }

    /// Highest `seq` applied so far. Pass it to `LicenseRegistry::events_since`
    /// to resume.
    pub fn cursor(&self) -> u64 {
        self.last_applied
    }

    pub fn license(&self, id: &LicenseId) -> Option<&MirroredLicense> {
        self.licenses.get(id)
    }

    pub fn licenses(&self) -> impl Iterator<Item = &MirroredLicense> {
        self.licenses.values()
    }

    /// When `authority` was added, if it has been.
    pub fn authority_added_at(&self, authority: &Address) -> Option<Timestamp> {
        self.authorities.get(authority).copied()
    }

    pub fn authority_count(&self) -> usize {
        self.authorities.len()
    }

    /// Apply one record.
    ///
    /// On error the mirror is unchanged.
    pub fn apply(&mut self, record: &EventRecord) -> Result<Applied, MirrorError> {
        if record.seq <= self.last_applied {
            return Ok(Applied::Duplicate);
        }
        let expected = self.last_applied + 1;
        if record.seq != expected {
            return Err(MirrorError::Gap {
                expected,
                got: record.seq,
            });
        }
        if chain_digest(&self.last_digest, record.seq, &record.event) != record.digest {
            return Err(MirrorError::DigestMismatch { seq: record.seq });
        }

        match &record.event {
            LicenseEvent::AuthorityAdded { authority, at } => {
                self.authorities.insert(*authority, *at);
            }
            LicenseEvent::LicenseIssued {
                license_id,
                holder,
                issue_date,
            } => {
                self.licenses.insert(
                    license_id.clone(),
                    MirroredLicense {
                        license_id: license_id.clone(),
                        holder: *holder,
                        issue_date: *issue_date,
                        expiry_date: None,
                        status: LicenseStatus::Active,
                        revoked_at: None,
                    },
                );
            }
            LicenseEvent::LicenseUpdated {
                license_id,
                expiry_date,
                status,
            } => {
                let entry = self.known(record.seq, license_id)?;
                entry.expiry_date = Some(*expiry_date);
                entry.status = *status;
                if *status != LicenseStatus::Revoked {
                    entry.revoked_at = None;
                }
            }
            LicenseEvent::LicenseRevoked { license_id, at } => {
                let entry = self.known(record.seq, license_id)?;
                entry.status = LicenseStatus::Revoked;
                entry.revoked_at = Some(*at);
            }
        }

        self.last_applied = record.seq;
        self.last_digest.clone_from(&record.digest);
        Ok(Applied::Applied)
    }

    /// Apply records in order, stopping at the first error. Returns how many
    /// were newly applied.
    pub fn apply_all<'a>(
        &mut self,
        records: impl IntoIterator<Item = &'a EventRecord>,
    ) -> Result<usize, MirrorError> {
        let mut applied = 0;
        for record in records {
            if self.apply(record)? == Applied::Applied {
                applied += 1;
            }
        }
        Ok(applied)
    }

    fn known(&mut self, seq: u64, id: &LicenseId) -> Result<&mut MirroredLicense, MirrorError> {
        self.licenses
            .get_mut(id)
            .ok_or_else(|| MirrorError::UnknownLicense {
                seq,
                license_id: id.clone(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventLog;

    fn addr(last: u8) -> Address {
        let mut b = [0u8; 20];
        b[19] = last;
        Address::from_bytes(b)
    }

    fn ts(secs: i64) -> Timestamp {
        Timestamp::from_epoch_secs(secs).unwrap()
    }

    fn id(s: &str) -> LicenseId {
        LicenseId::new(s).unwrap()
    }

    fn sample_log() -> EventLog {
        let mut log = EventLog::new();
        log.append(LicenseEvent::AuthorityAdded {
            authority: addr(2),
            at: ts(100),
        });
        log.append(LicenseEvent::LicenseIssued {
            license_id: id("DL123"),
            holder: addr(3),
            issue_date: ts(1_697_059_200),
        });
        log.append(LicenseEvent::LicenseUpdated {
            license_id: id("DL123"),
            expiry_date: ts(1_781_673_600),
            status: LicenseStatus::Suspended,
        });
        log.append(LicenseEvent::LicenseRevoked {
            license_id: id("DL123"),
            at: ts(200),
        });
        log
    }

    #[test]
    fn replays_full_feed() {
        let log = sample_log();
        let mut mirror = LicenseMirror::new();
        assert_eq!(mirror.apply_all(log.records()).unwrap(), 4);
        assert_eq!(mirror.cursor(), 4);
        assert_eq!(mirror.authority_added_at(&addr(2)), Some(ts(100)));

        let lic = mirror.license(&id("DL123")).unwrap();
        assert_eq!(lic.status, LicenseStatus::Revoked);
        assert_eq!(lic.expiry_date, Some(ts(1_781_673_600)));
        assert_eq!(lic.revoked_at, Some(ts(200)));
    }

    #[test]
    fn duplicate_delivery_is_idempotent() {
        let log = sample_log();
        let mut once = LicenseMirror::new();
        once.apply_all(log.records()).unwrap();

        let mut twice = LicenseMirror::new();
        for record in log.records() {
            assert_eq!(twice.apply(record).unwrap(), Applied::Applied);
            assert_eq!(twice.apply(record).unwrap(), Applied::Duplicate);
        }
        assert_eq!(twice.apply_all(log.records()).unwrap(), 0);
        assert_eq!(
            once.licenses().collect::<Vec<_>>(),
            twice.licenses().collect::<Vec<_>>()
        );
        assert_eq!(once.cursor(), twice.cursor());
    }

    #[test]
    fn gap_is_rejected() {
        let log = sample_log();
        let mut mirror = LicenseMirror::new();
        mirror.apply(&log.records()[0]).unwrap();
        assert_eq!(
            mirror.apply(&log.records()[2]),
            Err(MirrorError::Gap {
                expected: 2,
                got: 3
            })
        );
        assert_eq!(mirror.cursor(), 1);
    }

    #[test]
    fn tampered_record_is_rejected() {
        let log = sample_log();
        let mut records = log.records().to_vec();
        if let LicenseEvent::LicenseIssued { holder, .. } = &mut records[1].event {
            *holder = addr(9);
        }
        let mut mirror = LicenseMirror::new();
        mirror.apply(&records[0]).unwrap();
        assert_eq!(
            mirror.apply(&records[1]),
            Err(MirrorError::DigestMismatch { seq: 2 })
        );
        assert!(mirror.license(&id("DL123")).is_none());
    }

    #[test]
    fn resumes_from_cursor() {
        let log = sample_log();
        let mut mirror = LicenseMirror::new();
        mirror.apply_all(&log.records()[..2]).unwrap();
        let cursor = mirror.cursor();
        let applied = mirror.apply_all(log.since(cursor)).unwrap();
        assert_eq!(applied, 2);
        assert_eq!(mirror.cursor(), log.last_seq());
    }
}
