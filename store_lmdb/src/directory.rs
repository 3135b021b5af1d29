//! LMDB implementation of the platform directory traits.
//!
//! Events and host ratings are owned by the wider platform; the engine only
//! reads them. The put helpers exist for the sync job that mirrors platform
//! rows into this environment, and for tests.

use std::sync::Arc;

use heed::types::Bytes;
use heed::{Database, Env};

use gatecheck_store::{Event, EventStore, HostStore, StoreError};
use gatecheck_types::{EventId, HostId};

use crate::LmdbError;

/// A read-mostly handle over the mirrored event and host tables.
pub struct LmdbDirectory {
    pub(crate) env: Arc<Env>,
    pub(crate) events_db: Database<Bytes, Bytes>,
    pub(crate) hosts_db: Database<Bytes, Bytes>,
}

impl LmdbDirectory {
    /// Mirror one platform event into the directory.
    pub fn put_event(&self, event: &Event) -> Result<(), StoreError> {
        let bytes = bincode::serialize(event).map_err(LmdbError::from)?;
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        self.events_db
            .put(&mut wtxn, &event.id.as_u64().to_be_bytes(), &bytes)
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(())
    }

    /// Mirror one host's aggregate review rating (0–5 scale).
    pub fn put_host_rating(&self, host: HostId, rating: f64) -> Result<(), StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        self.hosts_db
            .put(&mut wtxn, &host.as_u64().to_be_bytes(), &rating.to_le_bytes())
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(())
    }
}

impl EventStore for LmdbDirectory {
    fn get_event(&self, id: EventId) -> Result<Option<Event>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        match self
            .events_db
            .get(&rtxn, &id.as_u64().to_be_bytes())
            .map_err(LmdbError::from)?
        {
            Some(bytes) => Ok(Some(bincode::deserialize(bytes).map_err(LmdbError::from)?)),
            None => Ok(None),
        }
    }
}

impl HostStore for LmdbDirectory {
    fn host_rating(&self, host: HostId) -> Result<Option<f64>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        match self
            .hosts_db
            .get(&rtxn, &host.as_u64().to_be_bytes())
            .map_err(LmdbError::from)?
        {
            Some(bytes) if bytes.len() == 8 => {
                let arr: [u8; 8] = bytes.try_into().expect("checked length");
                Ok(Some(f64::from_le_bytes(arr)))
            }
            Some(_) => Err(StoreError::Corruption(
                "host rating has unexpected byte length".to_string(),
            )),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LmdbEnvironment;
    use gatecheck_types::{GeoPoint, Timestamp};

    #[test]
    fn event_round_trips_with_optional_fields() {
        let dir = tempfile::tempdir().unwrap();
        let env = LmdbEnvironment::open(dir.path(), 16, 1 << 24).unwrap();
        let directory = env.directory_store();

        let event = Event {
            id: EventId::new(40),
            host_id: HostId::new(3),
            location: Some(GeoPoint::new(40.7128, -74.0060)),
            starts_at: Some(Timestamp::new(10_000)),
            ends_at: None,
        };
        directory.put_event(&event).unwrap();

        let loaded = directory.get_event(EventId::new(40)).unwrap().unwrap();
        assert_eq!(loaded.host_id, HostId::new(3));
        assert_eq!(loaded.starts_at, Some(Timestamp::new(10_000)));
        assert!(loaded.ends_at.is_none());
        assert!(directory.get_event(EventId::new(41)).unwrap().is_none());
    }

    #[test]
    fn host_rating_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let env = LmdbEnvironment::open(dir.path(), 16, 1 << 24).unwrap();
        let directory = env.directory_store();

        assert!(directory.host_rating(HostId::new(3)).unwrap().is_none());
        directory.put_host_rating(HostId::new(3), 4.5).unwrap();
        assert_eq!(directory.host_rating(HostId::new(3)).unwrap(), Some(4.5));

        directory.put_host_rating(HostId::new(3), 2.0).unwrap();
        assert_eq!(directory.host_rating(HostId::new(3)).unwrap(), Some(2.0));
    }
}
