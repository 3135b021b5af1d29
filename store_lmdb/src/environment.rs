//! LMDB environment setup.
//!
//! One environment holds every engine table:
//!
//! - `verifications`: verification id (u64 BE) -> bincode `VerificationRecord`
//! - `verifications_by_user`: user (u64 BE) ++ id (u64 BE) -> empty
//! - `trust_profiles`: user (u64 BE) -> bincode `UserTrustProfile`
//! - `devices`: device hash ++ NUL ++ user (u64 BE) -> bincode `DeviceFingerprint`
//! - `devices_by_user`: user (u64 BE) ++ device hash -> last_seen (u64 BE)
//! - `scans`: QR hash ++ NUL ++ event (u64 BE) ++ seq (u64 BE) -> bincode `QrScanLog`
//! - `events`: event (u64 BE) -> bincode `Event` (mirrored from the platform)
//! - `hosts`: host (u64 BE) -> rating (f64 LE) (mirrored from the platform)
//! - `meta`: schema version and sequence counters
//!
//! Key layouts are built in [`crate::store`]; big-endian integer components
//! make byte order match numeric order, so reverse scans walk newest-first.

use std::path::Path;
use std::sync::Arc;

use heed::types::Bytes;
use heed::{Database, Env, EnvOpenOptions};

use crate::directory::LmdbDirectory;
use crate::migration::Migrator;
use crate::store::LmdbStore;
use crate::LmdbError;

/// Wraps the LMDB environment and all database handles.
pub struct LmdbEnvironment {
    pub(crate) env: Arc<Env>,
    pub(crate) verifications_db: Database<Bytes, Bytes>,
    pub(crate) verifications_by_user_db: Database<Bytes, Bytes>,
    pub(crate) trust_db: Database<Bytes, Bytes>,
    pub(crate) devices_db: Database<Bytes, Bytes>,
    pub(crate) devices_by_user_db: Database<Bytes, Bytes>,
    pub(crate) scans_db: Database<Bytes, Bytes>,
    pub(crate) events_db: Database<Bytes, Bytes>,
    pub(crate) hosts_db: Database<Bytes, Bytes>,
    pub(crate) meta_db: Database<Bytes, Bytes>,
}

impl LmdbEnvironment {
    /// Open or create an LMDB environment at the given path.
    ///
    /// Creates every named database on first open and refuses databases
    /// written by a newer schema.
    pub fn open(path: &Path, max_dbs: u32, map_size: usize) -> Result<Self, LmdbError> {
        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(map_size)
                .max_dbs(max_dbs)
                .open(path)?
        };
        let env = Arc::new(env);

        let mut wtxn = env.write_txn()?;
        let verifications_db =
            env.create_database::<Bytes, Bytes>(&mut wtxn, Some("verifications"))?;
        let verifications_by_user_db =
            env.create_database::<Bytes, Bytes>(&mut wtxn, Some("verifications_by_user"))?;
        let trust_db = env.create_database::<Bytes, Bytes>(&mut wtxn, Some("trust_profiles"))?;
        let devices_db = env.create_database::<Bytes, Bytes>(&mut wtxn, Some("devices"))?;
        let devices_by_user_db =
            env.create_database::<Bytes, Bytes>(&mut wtxn, Some("devices_by_user"))?;
        let scans_db = env.create_database::<Bytes, Bytes>(&mut wtxn, Some("scans"))?;
        let events_db = env.create_database::<Bytes, Bytes>(&mut wtxn, Some("events"))?;
        let hosts_db = env.create_database::<Bytes, Bytes>(&mut wtxn, Some("hosts"))?;
        let meta_db = env.create_database::<Bytes, Bytes>(&mut wtxn, Some("meta"))?;
        Migrator::run(&mut wtxn, meta_db)?;
        wtxn.commit()?;

        Ok(Self {
            env,
            verifications_db,
            verifications_by_user_db,
            trust_db,
            devices_db,
            devices_by_user_db,
            scans_db,
            events_db,
            hosts_db,
            meta_db,
        })
    }

    /// A store handle implementing every engine-side storage trait.
    ///
    /// Handles share the environment; opening one per caller is cheap.
    pub fn attempt_store(&self) -> LmdbStore {
        LmdbStore {
            env: Arc::clone(&self.env),
            verifications_db: self.verifications_db,
            verifications_by_user_db: self.verifications_by_user_db,
            trust_db: self.trust_db,
            devices_db: self.devices_db,
            devices_by_user_db: self.devices_by_user_db,
            scans_db: self.scans_db,
            meta_db: self.meta_db,
        }
    }

    /// A directory handle over the mirrored event and host tables.
    pub fn directory_store(&self) -> LmdbDirectory {
        LmdbDirectory {
            env: Arc::clone(&self.env),
            events_db: self.events_db,
            hosts_db: self.hosts_db,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migration::{CURRENT_SCHEMA_VERSION, SCHEMA_VERSION_KEY};

    #[test]
    fn fresh_environment_stamps_current_schema() {
        let dir = tempfile::tempdir().unwrap();
        let env = LmdbEnvironment::open(dir.path(), 10, 1 << 20).unwrap();

        let rtxn = env.env.read_txn().unwrap();
        let stored = env.meta_db.get(&rtxn, SCHEMA_VERSION_KEY).unwrap().unwrap();
        assert_eq!(stored, CURRENT_SCHEMA_VERSION.to_le_bytes());
    }

    #[test]
    fn refuses_database_written_by_newer_code() {
        let dir = tempfile::tempdir().unwrap();
        {
            let env = LmdbEnvironment::open(dir.path(), 10, 1 << 20).unwrap();
            let mut wtxn = env.env.write_txn().unwrap();
            env.meta_db
                .put(&mut wtxn, SCHEMA_VERSION_KEY, &99u32.to_le_bytes())
                .unwrap();
            wtxn.commit().unwrap();
        }
        assert!(LmdbEnvironment::open(dir.path(), 10, 1 << 20).is_err());
    }
}
