//! LMDB implementation of the engine-side storage traits.
//!
//! One [`LmdbStore`] handle implements every trait the engine needs. Key
//! layouts put big-endian integer components last, so lexicographic byte
//! order matches numeric order and newest-first reads become reverse range
//! scans.
//!
//! A decision commit touches up to four tables. All of its writes go
//! through a single write transaction; returning early drops the
//! transaction and LMDB rolls the whole decision back.

use std::ops::Bound;
use std::sync::Arc;

use heed::types::Bytes;
use heed::{Database, Env, RoRange, RoRevRange, RoTxn, RwTxn};

use gatecheck_store::{
    DecisionCommit, DecisionStore, DeviceFingerprint, DeviceObservation, DeviceStore,
    HistoryFilter, QrScanLog, QrScanStore, StoreError, TrustStore, TrustWrite, UserTrustProfile,
    VerificationRecord, VerificationStore,
};
use gatecheck_types::{EventId, QrHash, Timestamp, UserId, VerificationId};

use crate::LmdbError;

pub(crate) const VERIFICATION_SEQ_KEY: &[u8] = b"verification_seq";
pub(crate) const SCAN_SEQ_KEY: &[u8] = b"scan_seq";

/// A store handle implementing every engine-side storage trait.
///
/// Cheap to clone the fields of; [`crate::LmdbEnvironment::attempt_store`]
/// hands one out per caller.
pub struct LmdbStore {
    pub(crate) env: Arc<Env>,
    pub(crate) verifications_db: Database<Bytes, Bytes>,
    pub(crate) verifications_by_user_db: Database<Bytes, Bytes>,
    pub(crate) trust_db: Database<Bytes, Bytes>,
    pub(crate) devices_db: Database<Bytes, Bytes>,
    pub(crate) devices_by_user_db: Database<Bytes, Bytes>,
    pub(crate) scans_db: Database<Bytes, Bytes>,
    pub(crate) meta_db: Database<Bytes, Bytes>,
}

/// `user (u64 BE)` — trust profile key and per-user index prefix.
fn user_key(user: UserId) -> [u8; 8] {
    user.as_u64().to_be_bytes()
}

/// `user (u64 BE) ++ verification id (u64 BE)` — per-user record index.
fn user_verification_key(user: UserId, id: VerificationId) -> [u8; 16] {
    let mut key = [0u8; 16];
    key[..8].copy_from_slice(&user.as_u64().to_be_bytes());
    key[8..].copy_from_slice(&id.as_u64().to_be_bytes());
    key
}

/// `device hash ++ NUL ++ user (u64 BE)` — fingerprint rows.
///
/// The NUL separator keeps one hash from matching inside another hash's
/// prefix range; canonical hashes are hex and never contain NUL.
fn device_key(device_hash: &str, user: UserId) -> Vec<u8> {
    let mut key = Vec::with_capacity(device_hash.len() + 1 + 8);
    key.extend_from_slice(device_hash.as_bytes());
    key.push(0);
    key.extend_from_slice(&user.as_u64().to_be_bytes());
    key
}

/// `device hash ++ NUL` — prefix covering every pairing of one device.
fn device_prefix(device_hash: &str) -> Vec<u8> {
    let mut prefix = Vec::with_capacity(device_hash.len() + 1);
    prefix.extend_from_slice(device_hash.as_bytes());
    prefix.push(0);
    prefix
}

/// `user (u64 BE) ++ device hash` — per-user device index.
fn device_user_key(user: UserId, device_hash: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(8 + device_hash.len());
    key.extend_from_slice(&user.as_u64().to_be_bytes());
    key.extend_from_slice(device_hash.as_bytes());
    key
}

/// `QR hash ++ NUL ++ event (u64 BE) ++ seq (u64 BE)` — scan log.
fn scan_key(qr: &QrHash, event: EventId, seq: u64) -> Vec<u8> {
    let mut key = scan_prefix(qr, event);
    key.extend_from_slice(&seq.to_be_bytes());
    key
}

/// `QR hash ++ NUL ++ event (u64 BE)` — prefix of one QR's scans at one event.
fn scan_prefix(qr: &QrHash, event: EventId) -> Vec<u8> {
    let hash = qr.as_str().as_bytes();
    let mut prefix = Vec::with_capacity(hash.len() + 1 + 16);
    prefix.extend_from_slice(hash);
    prefix.push(0);
    prefix.extend_from_slice(&event.as_u64().to_be_bytes());
    prefix
}

/// Exclusive upper bound of the range of keys starting with `prefix`.
///
/// Increments the last non-0xFF byte and truncates after it. `None` for an
/// all-0xFF prefix, which has no finite upper bound.
fn prefix_upper_bound(prefix: &[u8]) -> Option<Vec<u8>> {
    let mut upper = prefix.to_vec();
    while let Some(last) = upper.pop() {
        if last < 0xFF {
            upper.push(last + 1);
            return Some(upper);
        }
    }
    None
}

/// Walk `db` entries whose key starts with `prefix`, in key order.
fn scan_under_prefix<'t>(
    db: &Database<Bytes, Bytes>,
    rtxn: &'t RoTxn,
    prefix: &[u8],
) -> Result<RoRange<'t, Bytes, Bytes>, LmdbError> {
    match prefix_upper_bound(prefix) {
        Some(upper) => {
            let bounds = (Bound::Included(prefix), Bound::Excluded(upper.as_slice()));
            Ok(db.range(rtxn, &bounds)?)
        }
        None => {
            let bounds = (Bound::Included(prefix), Bound::<&[u8]>::Unbounded);
            Ok(db.range(rtxn, &bounds)?)
        }
    }
}

/// Same walk, highest key first.
fn rev_scan_under_prefix<'t>(
    db: &Database<Bytes, Bytes>,
    rtxn: &'t RoTxn,
    prefix: &[u8],
) -> Result<RoRevRange<'t, Bytes, Bytes>, LmdbError> {
    match prefix_upper_bound(prefix) {
        Some(upper) => {
            let bounds = (Bound::Included(prefix), Bound::Excluded(upper.as_slice()));
            Ok(db.rev_range(rtxn, &bounds)?)
        }
        None => {
            let bounds = (Bound::Included(prefix), Bound::<&[u8]>::Unbounded);
            Ok(db.rev_range(rtxn, &bounds)?)
        }
    }
}

/// The entry with the highest key under `prefix`, if any.
fn last_under_prefix(
    db: &Database<Bytes, Bytes>,
    rtxn: &RoTxn,
    prefix: &[u8],
) -> Result<Option<(Vec<u8>, Vec<u8>)>, LmdbError> {
    match rev_scan_under_prefix(db, rtxn, prefix)?.next() {
        Some(result) => {
            let (key, val) = result?;
            Ok(Some((key.to_vec(), val.to_vec())))
        }
        None => Ok(None),
    }
}

/// Decode the big-endian u64 at `at..at + 8` of an index key or value.
fn read_be_u64(bytes: &[u8], at: usize) -> Result<u64, StoreError> {
    let arr: [u8; 8] = bytes
        .get(at..at + 8)
        .and_then(|s| s.try_into().ok())
        .ok_or_else(|| {
            StoreError::Corruption(format!("truncated index entry of {} bytes", bytes.len()))
        })?;
    Ok(u64::from_be_bytes(arr))
}

/// Bump a meta-table sequence inside `wtxn` and return the new value.
/// The first call on a fresh database returns 1.
fn next_sequence(
    meta_db: &Database<Bytes, Bytes>,
    wtxn: &mut RwTxn,
    key: &[u8],
) -> Result<u64, LmdbError> {
    let current = match meta_db.get(wtxn, key)? {
        Some(bytes) if bytes.len() == 8 => {
            let arr: [u8; 8] = bytes.try_into().expect("checked length");
            u64::from_le_bytes(arr)
        }
        Some(_) => {
            return Err(LmdbError::Serialization(
                "sequence counter has unexpected byte length".to_string(),
            ))
        }
        None => 0,
    };
    let next = current + 1;
    meta_db.put(wtxn, key, &next.to_le_bytes())?;
    Ok(next)
}

impl LmdbStore {
    /// Fetch the record an index entry points at. A dangling index entry
    /// means a commit was torn, which single-transaction writes rule out.
    fn load_record(&self, rtxn: &RoTxn, id: u64) -> Result<VerificationRecord, StoreError> {
        let bytes = self
            .verifications_db
            .get(rtxn, &id.to_be_bytes())
            .map_err(LmdbError::from)?
            .ok_or_else(|| {
                StoreError::Corruption(format!("index points at missing verification {id}"))
            })?;
        Ok(bincode::deserialize(bytes).map_err(LmdbError::from)?)
    }

    /// CAS-write a trust profile inside `wtxn`.
    ///
    /// A version mismatch aborts the caller's whole transaction: the
    /// decision was made against trust state that no longer exists.
    fn apply_trust_write(&self, wtxn: &mut RwTxn, write: &TrustWrite) -> Result<(), StoreError> {
        let key = user_key(write.profile.user_id);
        let current = match self.trust_db.get(wtxn, &key).map_err(LmdbError::from)? {
            Some(bytes) => {
                let profile: UserTrustProfile =
                    bincode::deserialize(bytes).map_err(LmdbError::from)?;
                Some(profile.version)
            }
            None => None,
        };
        if current != write.expected_version {
            return Err(StoreError::Conflict(format!(
                "trust profile for {} moved: expected version {:?}, found {:?}",
                write.profile.user_id, write.expected_version, current
            )));
        }
        let bytes = bincode::serialize(&write.profile).map_err(LmdbError::from)?;
        self.trust_db
            .put(wtxn, &key, &bytes)
            .map_err(LmdbError::from)?;
        Ok(())
    }

    /// Fold a device observation into its fingerprint row inside `wtxn`,
    /// keeping the per-user index in step.
    fn absorb_observation(
        &self,
        wtxn: &mut RwTxn,
        obs: &DeviceObservation,
    ) -> Result<(), StoreError> {
        let key = device_key(&obs.device_hash, obs.user_id);
        let row = match self.devices_db.get(wtxn, &key).map_err(LmdbError::from)? {
            Some(bytes) => {
                let mut row: DeviceFingerprint =
                    bincode::deserialize(bytes).map_err(LmdbError::from)?;
                row.absorb(obs);
                row
            }
            None => obs.clone().into_fingerprint(),
        };
        let bytes = bincode::serialize(&row).map_err(LmdbError::from)?;
        self.devices_db
            .put(wtxn, &key, &bytes)
            .map_err(LmdbError::from)?;

        let index_key = device_user_key(obs.user_id, &obs.device_hash);
        self.devices_by_user_db
            .put(wtxn, &index_key, &row.last_seen.as_secs().to_be_bytes())
            .map_err(LmdbError::from)?;
        Ok(())
    }
}

impl VerificationStore for LmdbStore {
    fn get_verification(
        &self,
        id: VerificationId,
    ) -> Result<Option<VerificationRecord>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        match self
            .verifications_db
            .get(&rtxn, &id.as_u64().to_be_bytes())
            .map_err(LmdbError::from)?
        {
            Some(bytes) => Ok(Some(bincode::deserialize(bytes).map_err(LmdbError::from)?)),
            None => Ok(None),
        }
    }

    fn latest_verification(&self, user: UserId) -> Result<Option<VerificationRecord>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let prefix = user_key(user);
        match last_under_prefix(&self.verifications_by_user_db, &rtxn, &prefix)? {
            Some((key, _)) => {
                let id = read_be_u64(&key, prefix.len())?;
                Ok(Some(self.load_record(&rtxn, id)?))
            }
            None => Ok(None),
        }
    }

    fn verification_history(
        &self,
        filter: &HistoryFilter,
        limit: usize,
    ) -> Result<Vec<VerificationRecord>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let mut records = Vec::new();
        match filter.user_id {
            // A user filter narrows the walk to that user's index.
            Some(user) => {
                let prefix = user_key(user);
                for result in
                    rev_scan_under_prefix(&self.verifications_by_user_db, &rtxn, &prefix)?
                {
                    if records.len() == limit {
                        break;
                    }
                    let (key, _) = result.map_err(LmdbError::from)?;
                    let id = read_be_u64(key, prefix.len())?;
                    let record = self.load_record(&rtxn, id)?;
                    if filter.matches(&record) {
                        records.push(record);
                    }
                }
            }
            // Ids come from one sequence, so reverse table order is already
            // newest first.
            None => {
                for result in self
                    .verifications_db
                    .rev_iter(&rtxn)
                    .map_err(LmdbError::from)?
                {
                    if records.len() == limit {
                        break;
                    }
                    let (_, val) = result.map_err(LmdbError::from)?;
                    let record: VerificationRecord =
                        bincode::deserialize(val).map_err(LmdbError::from)?;
                    if filter.matches(&record) {
                        records.push(record);
                    }
                }
            }
        }
        Ok(records)
    }
}

impl TrustStore for LmdbStore {
    fn get_trust_profile(&self, user: UserId) -> Result<Option<UserTrustProfile>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        match self
            .trust_db
            .get(&rtxn, &user_key(user))
            .map_err(LmdbError::from)?
        {
            Some(bytes) => Ok(Some(bincode::deserialize(bytes).map_err(LmdbError::from)?)),
            None => Ok(None),
        }
    }
}

impl DeviceStore for LmdbStore {
    fn get_fingerprint(
        &self,
        device_hash: &str,
        user: UserId,
    ) -> Result<Option<DeviceFingerprint>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let key = device_key(device_hash, user);
        match self.devices_db.get(&rtxn, &key).map_err(LmdbError::from)? {
            Some(bytes) => Ok(Some(bincode::deserialize(bytes).map_err(LmdbError::from)?)),
            None => Ok(None),
        }
    }

    fn users_on_device(&self, device_hash: &str) -> Result<Vec<UserId>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let prefix = device_prefix(device_hash);
        let mut users = Vec::new();
        for result in scan_under_prefix(&self.devices_db, &rtxn, &prefix)? {
            let (key, _) = result.map_err(LmdbError::from)?;
            users.push(UserId::new(read_be_u64(key, prefix.len())?));
        }
        Ok(users)
    }

    fn devices_for_user_since(
        &self,
        user: UserId,
        since: Timestamp,
    ) -> Result<Vec<String>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let prefix = user_key(user);
        let mut devices = Vec::new();
        for result in scan_under_prefix(&self.devices_by_user_db, &rtxn, &prefix)? {
            let (key, val) = result.map_err(LmdbError::from)?;
            if read_be_u64(val, 0)? < since.as_secs() {
                continue;
            }
            let hash = std::str::from_utf8(&key[prefix.len()..]).map_err(|_| {
                StoreError::Corruption("device index key is not valid UTF-8".to_string())
            })?;
            devices.push(hash.to_string());
        }
        Ok(devices)
    }

    fn device_flagged(&self, device_hash: &str) -> Result<bool, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let prefix = device_prefix(device_hash);
        for result in scan_under_prefix(&self.devices_db, &rtxn, &prefix)? {
            let (_, val) = result.map_err(LmdbError::from)?;
            let row: DeviceFingerprint = bincode::deserialize(val).map_err(LmdbError::from)?;
            if row.is_flagged {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn set_device_flagged(
        &self,
        device_hash: &str,
        flagged: bool,
        reason: Option<&str>,
    ) -> Result<u64, StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        let prefix = device_prefix(device_hash);
        let mut rows: Vec<(Vec<u8>, DeviceFingerprint)> = Vec::new();
        for result in scan_under_prefix(&self.devices_db, &wtxn, &prefix)? {
            let (key, val) = result.map_err(LmdbError::from)?;
            let row: DeviceFingerprint = bincode::deserialize(val).map_err(LmdbError::from)?;
            rows.push((key.to_vec(), row));
        }
        let touched = rows.len() as u64;
        for (key, mut row) in rows {
            row.is_flagged = flagged;
            row.flag_reason = if flagged { reason.map(String::from) } else { None };
            let bytes = bincode::serialize(&row).map_err(LmdbError::from)?;
            self.devices_db
                .put(&mut wtxn, &key, &bytes)
                .map_err(LmdbError::from)?;
        }
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(touched)
    }
}

impl QrScanStore for LmdbStore {
    fn latest_scan(&self, qr: &QrHash, event: EventId) -> Result<Option<QrScanLog>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let prefix = scan_prefix(qr, event);
        match last_under_prefix(&self.scans_db, &rtxn, &prefix)? {
            Some((_, val)) => Ok(Some(bincode::deserialize(&val).map_err(LmdbError::from)?)),
            None => Ok(None),
        }
    }
}

impl DecisionStore for LmdbStore {
    fn next_verification_id(&self) -> Result<VerificationId, StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        let id = next_sequence(&self.meta_db, &mut wtxn, VERIFICATION_SEQ_KEY)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(VerificationId::new(id))
    }

    fn commit_decision(&self, commit: &DecisionCommit) -> Result<(), StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;

        // The version check runs first; a conflict must leave no trace.
        self.apply_trust_write(&mut wtxn, &commit.trust)?;

        let record_bytes = bincode::serialize(&commit.record).map_err(LmdbError::from)?;
        self.verifications_db
            .put(
                &mut wtxn,
                &commit.record.id.as_u64().to_be_bytes(),
                &record_bytes,
            )
            .map_err(LmdbError::from)?;
        let index_key = user_verification_key(commit.record.user_id, commit.record.id);
        self.verifications_by_user_db
            .put(&mut wtxn, &index_key, &[])
            .map_err(LmdbError::from)?;

        if let Some(obs) = &commit.device {
            self.absorb_observation(&mut wtxn, obs)?;
        }

        let seq = next_sequence(&self.meta_db, &mut wtxn, SCAN_SEQ_KEY)?;
        let scan_bytes = bincode::serialize(&commit.scan).map_err(LmdbError::from)?;
        let key = scan_key(&commit.scan.qr_code_hash, commit.scan.event_id, seq);
        self.scans_db
            .put(&mut wtxn, &key, &scan_bytes)
            .map_err(LmdbError::from)?;

        wtxn.commit().map_err(LmdbError::from)?;
        Ok(())
    }

    fn commit_support_decision(
        &self,
        record: &VerificationRecord,
        trust: Option<&TrustWrite>,
    ) -> Result<(), StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        let record_key = record.id.as_u64().to_be_bytes();
        if self
            .verifications_db
            .get(&wtxn, &record_key)
            .map_err(LmdbError::from)?
            .is_none()
        {
            return Err(StoreError::NotFound(record.id.to_string()));
        }
        if let Some(write) = trust {
            self.apply_trust_write(&mut wtxn, write)?;
        }
        let bytes = bincode::serialize(record).map_err(LmdbError::from)?;
        self.verifications_db
            .put(&mut wtxn, &record_key, &bytes)
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LmdbEnvironment;
    use gatecheck_store::EvidenceSnapshot;
    use gatecheck_types::{Classification, VerdictAction, MODEL_VERSION};

    fn open_store() -> (tempfile::TempDir, LmdbStore) {
        let dir = tempfile::tempdir().unwrap();
        let env = LmdbEnvironment::open(dir.path(), 16, 1 << 24).unwrap();
        let store = env.attempt_store();
        (dir, store)
    }

    fn record(id: u64, user: u64, event: u64) -> VerificationRecord {
        VerificationRecord {
            id: VerificationId::new(id),
            user_id: UserId::new(user),
            event_id: EventId::new(event),
            classification: Classification::Valid,
            risk_score: 0.0,
            action: VerdictAction::Accept,
            signals: Vec::new(),
            evidence: EvidenceSnapshot::default(),
            rewards_unlocked: true,
            reviews_unlocked: true,
            escrow_released: true,
            model_version: MODEL_VERSION.to_string(),
            created_at: Timestamp::new(1_000 + id),
            support_decision: None,
            support_decision_at: None,
            support_notes: None,
        }
    }

    fn scan(qr: &str, event: u64, user: u64, at: u64) -> QrScanLog {
        QrScanLog {
            qr_code_hash: QrHash::from_scan(qr),
            event_id: EventId::new(event),
            user_id: UserId::new(user),
            device_hash: None,
            scanned_at: Timestamp::new(at),
            is_valid: true,
            rejection_reason: None,
        }
    }

    fn commit_for(record: VerificationRecord, expected_version: Option<u64>) -> DecisionCommit {
        let mut profile = UserTrustProfile::new(record.user_id, record.created_at);
        profile.version = expected_version.map_or(1, |v| v + 1);
        profile.total_verifications = profile.version;
        DecisionCommit {
            scan: scan("ticket", record.event_id.as_u64(), record.user_id.as_u64(), 1_000),
            trust: TrustWrite {
                profile,
                expected_version,
            },
            device: None,
            record,
        }
    }

    #[test]
    fn decision_commit_round_trips_record() {
        let (_dir, store) = open_store();
        store.commit_decision(&commit_for(record(1, 7, 40), None)).unwrap();

        let loaded = store
            .get_verification(VerificationId::new(1))
            .unwrap()
            .unwrap();
        assert_eq!(loaded.user_id, UserId::new(7));
        assert_eq!(loaded.event_id, EventId::new(40));
        assert_eq!(loaded.classification, Classification::Valid);
        assert_eq!(loaded.model_version, MODEL_VERSION);

        let latest = store.latest_verification(UserId::new(7)).unwrap().unwrap();
        assert_eq!(latest.id, VerificationId::new(1));
        assert!(store.latest_verification(UserId::new(8)).unwrap().is_none());
    }

    #[test]
    fn history_walks_newest_first_per_user() {
        let (_dir, store) = open_store();
        store.commit_decision(&commit_for(record(1, 7, 40), None)).unwrap();
        store.commit_decision(&commit_for(record(2, 9, 40), None)).unwrap();
        store.commit_decision(&commit_for(record(3, 7, 41), Some(1))).unwrap();
        store.commit_decision(&commit_for(record(4, 7, 42), Some(2))).unwrap();

        let filter = HistoryFilter {
            user_id: Some(UserId::new(7)),
            ..Default::default()
        };
        let history = store.verification_history(&filter, 10).unwrap();
        let ids: Vec<u64> = history.iter().map(|r| r.id.as_u64()).collect();
        assert_eq!(ids, vec![4, 3, 1]);

        let limited = store.verification_history(&filter, 2).unwrap();
        assert_eq!(limited.len(), 2);
        assert_eq!(limited[0].id, VerificationId::new(4));
    }

    #[test]
    fn unfiltered_history_spans_users_newest_first() {
        let (_dir, store) = open_store();
        store.commit_decision(&commit_for(record(1, 7, 40), None)).unwrap();
        store.commit_decision(&commit_for(record(2, 9, 40), None)).unwrap();

        let history = store
            .verification_history(&HistoryFilter::default(), 10)
            .unwrap();
        let ids: Vec<u64> = history.iter().map(|r| r.id.as_u64()).collect();
        assert_eq!(ids, vec![2, 1]);

        let by_event = HistoryFilter {
            event_id: Some(EventId::new(40)),
            ..Default::default()
        };
        assert_eq!(store.verification_history(&by_event, 10).unwrap().len(), 2);
    }

    #[test]
    fn stale_trust_version_aborts_whole_commit() {
        let (_dir, store) = open_store();
        store.commit_decision(&commit_for(record(1, 7, 40), None)).unwrap();

        // Same expected version again: the profile moved to version 1.
        let stale = commit_for(record(2, 7, 41), None);
        let err = store.commit_decision(&stale).unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));

        // Nothing from the losing commit may be visible.
        assert!(store
            .get_verification(VerificationId::new(2))
            .unwrap()
            .is_none());
        let profile = store.get_trust_profile(UserId::new(7)).unwrap().unwrap();
        assert_eq!(profile.version, 1);
        let qr = QrHash::from_scan("ticket");
        let latest = store.latest_scan(&qr, EventId::new(41)).unwrap();
        assert!(latest.is_none());
    }

    #[test]
    fn device_observations_fold_into_one_row() {
        let (_dir, store) = open_store();
        let mut first = commit_for(record(1, 7, 40), None);
        first.device = Some(DeviceObservation {
            device_hash: "dev-a".to_string(),
            user_id: UserId::new(7),
            device_os: Some("android-14".to_string()),
            app_instance_id: None,
            seen_at: Timestamp::new(1_000),
        });
        store.commit_decision(&first).unwrap();

        let mut second = commit_for(record(2, 7, 41), Some(1));
        second.device = Some(DeviceObservation {
            device_hash: "dev-a".to_string(),
            user_id: UserId::new(7),
            device_os: None,
            app_instance_id: Some("app-1".to_string()),
            seen_at: Timestamp::new(2_000),
        });
        store.commit_decision(&second).unwrap();

        let row = store
            .get_fingerprint("dev-a", UserId::new(7))
            .unwrap()
            .unwrap();
        assert_eq!(row.check_in_count, 2);
        assert_eq!(row.first_seen, Timestamp::new(1_000));
        assert_eq!(row.last_seen, Timestamp::new(2_000));
        assert_eq!(row.device_os.as_deref(), Some("android-14"));
        assert_eq!(row.app_instance_id.as_deref(), Some("app-1"));
    }

    #[test]
    fn device_indexes_answer_sharing_queries() {
        let (_dir, store) = open_store();
        for (id, user, seen_at) in [(1u64, 7u64, 1_000u64), (2, 9, 2_000)] {
            let mut commit = commit_for(record(id, user, 40 + id), None);
            commit.device = Some(DeviceObservation {
                device_hash: "dev-a".to_string(),
                user_id: UserId::new(user),
                device_os: None,
                app_instance_id: None,
                seen_at: Timestamp::new(seen_at),
            });
            store.commit_decision(&commit).unwrap();
        }

        let users = store.users_on_device("dev-a").unwrap();
        assert_eq!(users, vec![UserId::new(7), UserId::new(9)]);
        assert!(store.users_on_device("dev-b").unwrap().is_empty());

        let recent = store
            .devices_for_user_since(UserId::new(9), Timestamp::new(1_500))
            .unwrap();
        assert_eq!(recent, vec!["dev-a".to_string()]);
        let stale = store
            .devices_for_user_since(UserId::new(7), Timestamp::new(1_500))
            .unwrap();
        assert!(stale.is_empty());
    }

    #[test]
    fn flagging_touches_every_pairing_of_the_device() {
        let (_dir, store) = open_store();
        for (id, user) in [(1u64, 7u64), (2, 9)] {
            let mut commit = commit_for(record(id, user, 40 + id), None);
            commit.device = Some(DeviceObservation {
                device_hash: "dev-a".to_string(),
                user_id: UserId::new(user),
                device_os: None,
                app_instance_id: None,
                seen_at: Timestamp::new(1_000),
            });
            store.commit_decision(&commit).unwrap();
        }

        assert!(!store.device_flagged("dev-a").unwrap());
        let touched = store
            .set_device_flagged("dev-a", true, Some("fraud ring"))
            .unwrap();
        assert_eq!(touched, 2);
        assert!(store.device_flagged("dev-a").unwrap());
        let row = store
            .get_fingerprint("dev-a", UserId::new(9))
            .unwrap()
            .unwrap();
        assert_eq!(row.flag_reason.as_deref(), Some("fraud ring"));

        let cleared = store.set_device_flagged("dev-a", false, None).unwrap();
        assert_eq!(cleared, 2);
        assert!(!store.device_flagged("dev-a").unwrap());
        assert_eq!(store.set_device_flagged("dev-x", true, None).unwrap(), 0);
    }

    #[test]
    fn latest_scan_is_scoped_to_qr_and_event() {
        let (_dir, store) = open_store();
        let mut first = commit_for(record(1, 7, 40), None);
        first.scan = scan("ticket-a", 40, 7, 1_000);
        store.commit_decision(&first).unwrap();
        let mut second = commit_for(record(2, 9, 40), None);
        second.scan = scan("ticket-a", 40, 9, 2_000);
        store.commit_decision(&second).unwrap();
        let mut other_event = commit_for(record(3, 7, 41), Some(1));
        other_event.scan = scan("ticket-a", 41, 7, 3_000);
        store.commit_decision(&other_event).unwrap();

        let qr = QrHash::from_scan("ticket-a");
        let latest = store.latest_scan(&qr, EventId::new(40)).unwrap().unwrap();
        assert_eq!(latest.scanned_at, Timestamp::new(2_000));
        assert_eq!(latest.user_id, UserId::new(9));

        let other = QrHash::from_scan("ticket-b");
        assert!(store.latest_scan(&other, EventId::new(40)).unwrap().is_none());
    }

    #[test]
    fn verification_ids_are_monotonic_and_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let env = LmdbEnvironment::open(dir.path(), 16, 1 << 24).unwrap();
            let store = env.attempt_store();
            assert_eq!(store.next_verification_id().unwrap(), VerificationId::new(1));
            assert_eq!(store.next_verification_id().unwrap(), VerificationId::new(2));
        }
        let env = LmdbEnvironment::open(dir.path(), 16, 1 << 24).unwrap();
        let store = env.attempt_store();
        // Ids burned before the reopen stay burned.
        assert_eq!(store.next_verification_id().unwrap(), VerificationId::new(3));
    }

    #[test]
    fn support_patch_overwrites_record_in_place() {
        let (_dir, store) = open_store();
        store.commit_decision(&commit_for(record(1, 7, 40), None)).unwrap();

        let mut patched = record(1, 7, 40);
        patched.support_decision = Some(gatecheck_types::SupportDecision::ConfirmedFraud);
        patched.support_decision_at = Some(Timestamp::new(5_000));
        patched.rewards_unlocked = false;
        store.commit_support_decision(&patched, None).unwrap();

        let loaded = store
            .get_verification(VerificationId::new(1))
            .unwrap()
            .unwrap();
        assert_eq!(
            loaded.support_decision,
            Some(gatecheck_types::SupportDecision::ConfirmedFraud)
        );
        assert!(!loaded.rewards_unlocked);

        let unknown = record(99, 7, 40);
        let err = store.commit_support_decision(&unknown, None).unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[test]
    fn support_patch_applies_versioned_trust_write() {
        let (_dir, store) = open_store();
        store.commit_decision(&commit_for(record(1, 7, 40), None)).unwrap();

        let mut profile = store.get_trust_profile(UserId::new(7)).unwrap().unwrap();
        profile.trust_score = 0.4;
        let expected = Some(profile.version);
        profile.version += 1;
        let write = TrustWrite {
            profile,
            expected_version: expected,
        };
        store
            .commit_support_decision(&record(1, 7, 40), Some(&write))
            .unwrap();
        let reloaded = store.get_trust_profile(UserId::new(7)).unwrap().unwrap();
        assert_eq!(reloaded.trust_score, 0.4);
        assert_eq!(reloaded.version, 2);

        // Replaying the same write must now conflict.
        let err = store
            .commit_support_decision(&record(1, 7, 40), Some(&write))
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[test]
    fn prefix_upper_bound_carries_through_ff_bytes() {
        assert_eq!(prefix_upper_bound(b"ab"), Some(b"ac".to_vec()));
        assert_eq!(prefix_upper_bound(&[0x01, 0xFF]), Some(vec![0x02]));
        assert_eq!(prefix_upper_bound(&[0xFF, 0xFF]), None);
        assert_eq!(prefix_upper_bound(&[]), None);
    }
}
