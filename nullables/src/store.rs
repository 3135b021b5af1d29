//! Nullable stores — thread-safe in-memory storage for testing.

use gatecheck_store::{
    DecisionCommit, DecisionStore, DeviceFingerprint, DeviceStore, Event, EventStore,
    HistoryFilter, HostStore, QrScanLog, QrScanStore, StoreError, TrustStore, TrustWrite,
    UserTrustProfile, VerificationRecord, VerificationStore,
};
use gatecheck_types::{EventId, HostId, QrHash, Timestamp, UserId, VerificationId};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Mutex;

/// A store operation that can be made to fail on demand.
///
/// Injected failures surface as [`StoreError::Timeout`], the shape a real
/// backend failure takes once its deadline passes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Failpoint {
    GetEvent,
    HostRating,
    GetTrustProfile,
    GetVerification,
    LatestVerification,
    VerificationHistory,
    LatestScan,
    GetFingerprint,
    UsersOnDevice,
    DevicesForUser,
    DeviceFlagged,
    NextVerificationId,
    CommitDecision,
    CommitSupportDecision,
}

fn injected(point: Failpoint) -> StoreError {
    StoreError::Timeout(format!("injected failure: {point:?}"))
}

/// An in-memory engine-state store for testing.
/// Thread-safe for use with tokio's multi-threaded runtime.
pub struct NullStore {
    verifications: Mutex<BTreeMap<u64, VerificationRecord>>,
    trust: Mutex<HashMap<u64, UserTrustProfile>>,
    fingerprints: Mutex<HashMap<(String, u64), DeviceFingerprint>>,
    scans: Mutex<Vec<QrScanLog>>,
    next_id: Mutex<u64>,
    failpoints: Mutex<HashSet<Failpoint>>,
}

impl NullStore {
    pub fn new() -> Self {
        Self {
            verifications: Mutex::new(BTreeMap::new()),
            trust: Mutex::new(HashMap::new()),
            fingerprints: Mutex::new(HashMap::new()),
            scans: Mutex::new(Vec::new()),
            next_id: Mutex::new(0),
            failpoints: Mutex::new(HashSet::new()),
        }
    }

    /// Make `point` fail until [`NullStore::clear_failpoints`] is called.
    pub fn fail_on(&self, point: Failpoint) {
        self.failpoints.lock().unwrap().insert(point);
    }

    pub fn clear_failpoints(&self) {
        self.failpoints.lock().unwrap().clear();
    }

    fn check(&self, point: Failpoint) -> Result<(), StoreError> {
        if self.failpoints.lock().unwrap().contains(&point) {
            return Err(injected(point));
        }
        Ok(())
    }

    /// Seed a trust profile directly, bypassing commit versioning.
    pub fn put_trust_profile(&self, profile: UserTrustProfile) {
        self.trust
            .lock()
            .unwrap()
            .insert(profile.user_id.as_u64(), profile);
    }

    /// Seed a fingerprint row directly.
    pub fn put_fingerprint(&self, fingerprint: DeviceFingerprint) {
        let key = (fingerprint.device_hash.clone(), fingerprint.user_id.as_u64());
        self.fingerprints.lock().unwrap().insert(key, fingerprint);
    }

    /// Flag a device pairing, creating the row if needed.
    pub fn flag_device(&self, device_hash: &str, user: UserId, reason: &str) {
        let key = (device_hash.to_string(), user.as_u64());
        let mut fingerprints = self.fingerprints.lock().unwrap();
        let row = fingerprints
            .entry(key)
            .or_insert_with(|| DeviceFingerprint::new(device_hash.to_string(), user, Timestamp::new(0)));
        row.is_flagged = true;
        row.flag_reason = Some(reason.to_string());
    }

    /// Seed a scan log entry directly.
    pub fn push_scan(&self, scan: QrScanLog) {
        self.scans.lock().unwrap().push(scan);
    }

    /// Number of scan log entries, for asserting appends.
    pub fn scan_count(&self) -> usize {
        self.scans.lock().unwrap().len()
    }
}

impl Default for NullStore {
    fn default() -> Self {
        Self::new()
    }
}

impl VerificationStore for NullStore {
    fn get_verification(
        &self,
        id: VerificationId,
    ) -> Result<Option<VerificationRecord>, StoreError> {
        self.check(Failpoint::GetVerification)?;
        Ok(self.verifications.lock().unwrap().get(&id.as_u64()).cloned())
    }

    fn latest_verification(&self, user: UserId) -> Result<Option<VerificationRecord>, StoreError> {
        self.check(Failpoint::LatestVerification)?;
        Ok(self
            .verifications
            .lock()
            .unwrap()
            .values()
            .rev()
            .find(|r| r.user_id == user)
            .cloned())
    }

    fn verification_history(
        &self,
        filter: &HistoryFilter,
        limit: usize,
    ) -> Result<Vec<VerificationRecord>, StoreError> {
        self.check(Failpoint::VerificationHistory)?;
        Ok(self
            .verifications
            .lock()
            .unwrap()
            .values()
            .rev()
            .filter(|r| filter.matches(r))
            .take(limit)
            .cloned()
            .collect())
    }
}

impl TrustStore for NullStore {
    fn get_trust_profile(&self, user: UserId) -> Result<Option<UserTrustProfile>, StoreError> {
        self.check(Failpoint::GetTrustProfile)?;
        Ok(self.trust.lock().unwrap().get(&user.as_u64()).cloned())
    }
}

impl DeviceStore for NullStore {
    fn get_fingerprint(
        &self,
        device_hash: &str,
        user: UserId,
    ) -> Result<Option<DeviceFingerprint>, StoreError> {
        self.check(Failpoint::GetFingerprint)?;
        let key = (device_hash.to_string(), user.as_u64());
        Ok(self.fingerprints.lock().unwrap().get(&key).cloned())
    }

    fn users_on_device(&self, device_hash: &str) -> Result<Vec<UserId>, StoreError> {
        self.check(Failpoint::UsersOnDevice)?;
        let mut users: Vec<UserId> = self
            .fingerprints
            .lock()
            .unwrap()
            .values()
            .filter(|f| f.device_hash == device_hash)
            .map(|f| f.user_id)
            .collect();
        users.sort();
        users.dedup();
        Ok(users)
    }

    fn devices_for_user_since(
        &self,
        user: UserId,
        since: Timestamp,
    ) -> Result<Vec<String>, StoreError> {
        self.check(Failpoint::DevicesForUser)?;
        let mut devices: Vec<String> = self
            .fingerprints
            .lock()
            .unwrap()
            .values()
            .filter(|f| f.user_id == user && f.last_seen >= since)
            .map(|f| f.device_hash.clone())
            .collect();
        devices.sort();
        devices.dedup();
        Ok(devices)
    }

    fn device_flagged(&self, device_hash: &str) -> Result<bool, StoreError> {
        self.check(Failpoint::DeviceFlagged)?;
        Ok(self
            .fingerprints
            .lock()
            .unwrap()
            .values()
            .any(|f| f.device_hash == device_hash && f.is_flagged))
    }

    fn set_device_flagged(
        &self,
        device_hash: &str,
        flagged: bool,
        reason: Option<&str>,
    ) -> Result<u64, StoreError> {
        let mut fingerprints = self.fingerprints.lock().unwrap();
        let mut touched = 0;
        for row in fingerprints
            .values_mut()
            .filter(|f| f.device_hash == device_hash)
        {
            row.is_flagged = flagged;
            row.flag_reason = if flagged { reason.map(String::from) } else { None };
            touched += 1;
        }
        Ok(touched)
    }
}

impl QrScanStore for NullStore {
    fn latest_scan(&self, qr: &QrHash, event: EventId) -> Result<Option<QrScanLog>, StoreError> {
        self.check(Failpoint::LatestScan)?;
        Ok(self
            .scans
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|s| s.qr_code_hash == *qr && s.event_id == event)
            .cloned())
    }
}

impl DecisionStore for NullStore {
    fn next_verification_id(&self) -> Result<VerificationId, StoreError> {
        self.check(Failpoint::NextVerificationId)?;
        let mut next = self.next_id.lock().unwrap();
        *next += 1;
        Ok(VerificationId::new(*next))
    }

    fn commit_decision(&self, commit: &DecisionCommit) -> Result<(), StoreError> {
        self.check(Failpoint::CommitDecision)?;
        self.apply_trust_write(&commit.trust)?;
        if let Some(obs) = &commit.device {
            let key = (obs.device_hash.clone(), obs.user_id.as_u64());
            let mut fingerprints = self.fingerprints.lock().unwrap();
            match fingerprints.get_mut(&key) {
                Some(row) => row.absorb(obs),
                None => {
                    fingerprints.insert(key, obs.clone().into_fingerprint());
                }
            }
        }
        self.scans.lock().unwrap().push(commit.scan.clone());
        self.verifications
            .lock()
            .unwrap()
            .insert(commit.record.id.as_u64(), commit.record.clone());
        Ok(())
    }

    fn commit_support_decision(
        &self,
        record: &VerificationRecord,
        trust: Option<&TrustWrite>,
    ) -> Result<(), StoreError> {
        self.check(Failpoint::CommitSupportDecision)?;
        if !self
            .verifications
            .lock()
            .unwrap()
            .contains_key(&record.id.as_u64())
        {
            return Err(StoreError::NotFound(record.id.to_string()));
        }
        if let Some(write) = trust {
            self.apply_trust_write(write)?;
        }
        self.verifications
            .lock()
            .unwrap()
            .insert(record.id.as_u64(), record.clone());
        Ok(())
    }
}

impl NullStore {
    fn apply_trust_write(&self, write: &TrustWrite) -> Result<(), StoreError> {
        let mut trust = self.trust.lock().unwrap();
        let key = write.profile.user_id.as_u64();
        let current = trust.get(&key).map(|p| p.version);
        if current != write.expected_version {
            return Err(StoreError::Conflict(format!(
                "trust profile for {} moved: expected version {:?}, found {:?}",
                write.profile.user_id, write.expected_version, current
            )));
        }
        trust.insert(key, write.profile.clone());
        Ok(())
    }
}

/// An in-memory platform directory (events, host ratings) for testing.
pub struct NullDirectory {
    events: Mutex<HashMap<u64, Event>>,
    ratings: Mutex<HashMap<u64, f64>>,
    failpoints: Mutex<HashSet<Failpoint>>,
}

impl NullDirectory {
    pub fn new() -> Self {
        Self {
            events: Mutex::new(HashMap::new()),
            ratings: Mutex::new(HashMap::new()),
            failpoints: Mutex::new(HashSet::new()),
        }
    }

    pub fn put_event(&self, event: Event) {
        self.events.lock().unwrap().insert(event.id.as_u64(), event);
    }

    pub fn put_host_rating(&self, host: HostId, rating: f64) {
        self.ratings.lock().unwrap().insert(host.as_u64(), rating);
    }

    /// Make `point` fail until [`NullDirectory::clear_failpoints`] is called.
    pub fn fail_on(&self, point: Failpoint) {
        self.failpoints.lock().unwrap().insert(point);
    }

    pub fn clear_failpoints(&self) {
        self.failpoints.lock().unwrap().clear();
    }

    fn check(&self, point: Failpoint) -> Result<(), StoreError> {
        if self.failpoints.lock().unwrap().contains(&point) {
            return Err(injected(point));
        }
        Ok(())
    }
}

impl Default for NullDirectory {
    fn default() -> Self {
        Self::new()
    }
}

impl EventStore for NullDirectory {
    fn get_event(&self, id: EventId) -> Result<Option<Event>, StoreError> {
        self.check(Failpoint::GetEvent)?;
        Ok(self.events.lock().unwrap().get(&id.as_u64()).cloned())
    }
}

impl HostStore for NullDirectory {
    fn host_rating(&self, host: HostId) -> Result<Option<f64>, StoreError> {
        self.check(Failpoint::HostRating)?;
        Ok(self.ratings.lock().unwrap().get(&host.as_u64()).copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_profile(user: UserId, version: u64) -> UserTrustProfile {
        let mut profile = UserTrustProfile::new(user, Timestamp::new(1_000));
        profile.version = version;
        profile
    }

    #[test]
    fn trust_write_rejects_stale_version() {
        let store = NullStore::new();
        let user = UserId::new(7);
        store.put_trust_profile(test_profile(user, 3));

        let write = TrustWrite {
            profile: test_profile(user, 4),
            expected_version: Some(2),
        };
        let err = store.apply_trust_write(&write).unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[test]
    fn trust_write_rejects_unexpected_existing_profile() {
        let store = NullStore::new();
        let user = UserId::new(7);
        store.put_trust_profile(test_profile(user, 0));

        let write = TrustWrite {
            profile: test_profile(user, 1),
            expected_version: None,
        };
        assert!(store.apply_trust_write(&write).is_err());
    }

    #[test]
    fn trust_write_applies_when_version_matches() {
        let store = NullStore::new();
        let user = UserId::new(7);
        store.put_trust_profile(test_profile(user, 3));

        let mut updated = test_profile(user, 4);
        updated.trust_score = 0.4;
        let write = TrustWrite {
            profile: updated,
            expected_version: Some(3),
        };
        store.apply_trust_write(&write).unwrap();
        let stored = store.get_trust_profile(user).unwrap().unwrap();
        assert_eq!(stored.version, 4);
        assert_eq!(stored.trust_score, 0.4);
    }

    #[test]
    fn failpoint_makes_reads_time_out() {
        let store = NullStore::new();
        store.fail_on(Failpoint::GetTrustProfile);
        let err = store.get_trust_profile(UserId::new(1)).unwrap_err();
        assert!(matches!(err, StoreError::Timeout(_)));

        store.clear_failpoints();
        assert!(store.get_trust_profile(UserId::new(1)).unwrap().is_none());
    }

    #[test]
    fn ids_are_monotonic() {
        let store = NullStore::new();
        let a = store.next_verification_id().unwrap();
        let b = store.next_verification_id().unwrap();
        assert!(b > a);
    }

    #[test]
    fn users_on_device_deduplicates() {
        let store = NullStore::new();
        for user in [1, 1, 2] {
            let fp =
                DeviceFingerprint::new("dev-x".into(), UserId::new(user), Timestamp::new(0));
            store.put_fingerprint(fp);
        }
        assert_eq!(store.users_on_device("dev-x").unwrap().len(), 2);
    }

    #[test]
    fn devices_for_user_respects_cutoff() {
        let store = NullStore::new();
        let user = UserId::new(9);
        for (hash, seen) in [("dev-a", 100), ("dev-b", 500), ("dev-c", 900)] {
            let mut fp = DeviceFingerprint::new(hash.into(), user, Timestamp::new(seen));
            fp.last_seen = Timestamp::new(seen);
            store.put_fingerprint(fp);
        }
        let recent = store
            .devices_for_user_since(user, Timestamp::new(500))
            .unwrap();
        assert_eq!(recent, vec!["dev-b".to_string(), "dev-c".to_string()]);
    }

    #[test]
    fn flagged_device_is_visible_across_users() {
        let store = NullStore::new();
        store.put_fingerprint(DeviceFingerprint::new(
            "dev-y".into(),
            UserId::new(1),
            Timestamp::new(0),
        ));
        store.flag_device("dev-y", UserId::new(2), "chargeback ring");
        assert!(store.device_flagged("dev-y").unwrap());
        assert!(!store.device_flagged("dev-z").unwrap());
    }

    #[test]
    fn operator_flag_and_clear_touch_every_pairing() {
        let store = NullStore::new();
        for user in [1, 2] {
            store.put_fingerprint(DeviceFingerprint::new(
                "dev-q".into(),
                UserId::new(user),
                Timestamp::new(0),
            ));
        }
        let flagged = store
            .set_device_flagged("dev-q", true, Some("stolen handset"))
            .unwrap();
        assert_eq!(flagged, 2);
        assert!(store.device_flagged("dev-q").unwrap());

        let cleared = store.set_device_flagged("dev-q", false, None).unwrap();
        assert_eq!(cleared, 2);
        assert!(!store.device_flagged("dev-q").unwrap());
        assert_eq!(
            store.set_device_flagged("dev-unseen", true, None).unwrap(),
            0
        );
    }

    #[test]
    fn directory_failpoints_cover_event_and_rating() {
        let directory = NullDirectory::new();
        directory.put_host_rating(HostId::new(3), 4.6);
        directory.fail_on(Failpoint::HostRating);
        assert!(directory.host_rating(HostId::new(3)).is_err());
        directory.clear_failpoints();
        assert_eq!(directory.host_rating(HostId::new(3)).unwrap(), Some(4.6));
        assert!(directory.get_event(EventId::new(1)).unwrap().is_none());
    }
}
