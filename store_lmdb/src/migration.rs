//! Database schema migration engine.
//!
//! Tracks a monotonically increasing schema version in the meta table and
//! runs sequential migration functions to bring an older database up to date.

use heed::types::Bytes;
use heed::{Database, RoTxn, RwTxn};

use crate::LmdbError;

/// The schema version that the current code expects.
pub const CURRENT_SCHEMA_VERSION: u32 = 1;

pub(crate) const SCHEMA_VERSION_KEY: &[u8] = b"schema_version";

/// Runs database migrations to bring the schema up to date.
pub struct Migrator;

impl Migrator {
    /// Check the stored schema version and run any needed migrations.
    ///
    /// - Version 0 means a fresh database (no version stored yet).
    /// - If the stored version matches `CURRENT_SCHEMA_VERSION`, this is a no-op.
    /// - If the stored version is *higher* than what this code supports,
    ///   the database was written by newer code and we refuse to open it.
    ///
    /// Runs inside the caller's transaction so a half-applied migration
    /// never becomes visible.
    pub(crate) fn run(wtxn: &mut RwTxn, meta_db: Database<Bytes, Bytes>) -> Result<(), LmdbError> {
        let current = read_schema_version(wtxn, meta_db)?;

        if current == CURRENT_SCHEMA_VERSION {
            tracing::debug!(version = current, "database schema is up to date");
            return Ok(());
        }

        if current > CURRENT_SCHEMA_VERSION {
            return Err(LmdbError::Heed(format!(
                "database schema version {} is newer than supported version {}",
                current, CURRENT_SCHEMA_VERSION
            )));
        }

        for version in current..CURRENT_SCHEMA_VERSION {
            tracing::info!(from = version, to = version + 1, "running migration");
            run_migration(version, version + 1)?;
        }

        meta_db.put(wtxn, SCHEMA_VERSION_KEY, &CURRENT_SCHEMA_VERSION.to_le_bytes())?;
        tracing::info!(version = CURRENT_SCHEMA_VERSION, "migration complete");
        Ok(())
    }
}

fn read_schema_version(
    txn: &RoTxn,
    meta_db: Database<Bytes, Bytes>,
) -> Result<u32, LmdbError> {
    match meta_db.get(txn, SCHEMA_VERSION_KEY)? {
        Some(bytes) if bytes.len() == 4 => {
            let arr: [u8; 4] = bytes.try_into().expect("checked length");
            Ok(u32::from_le_bytes(arr))
        }
        Some(_) => Err(LmdbError::Serialization(
            "schema_version has unexpected byte length".to_string(),
        )),
        None => Ok(0),
    }
}

fn run_migration(from: u32, to: u32) -> Result<(), LmdbError> {
    match (from, to) {
        (0, 1) => {
            // Fresh database, nothing to migrate.
            Ok(())
        }
        _ => Err(LmdbError::Heed(format!(
            "unknown migration: {} -> {}",
            from, to
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_migration_is_error() {
        let result = run_migration(99, 100);
        assert!(result.is_err());
    }

    #[test]
    fn initial_migration_succeeds() {
        let result = run_migration(0, 1);
        assert!(result.is_ok());
    }
}
