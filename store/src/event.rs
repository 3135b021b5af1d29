//! Event directory storage trait.

use crate::StoreError;
use gatecheck_types::{EventId, GeoPoint, HostId, Timestamp};
use serde::{Deserialize, Serialize};

/// The slice of an event the engine needs: where and when it happens,
/// and who hosts it. Owned by the wider platform; read-only here.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub host_id: HostId,
    pub location: Option<GeoPoint>,
    pub starts_at: Option<Timestamp>,
    pub ends_at: Option<Timestamp>,
}

/// Trait for looking up events.
pub trait EventStore {
    /// Fetch an event. `None` means the event does not exist.
    fn get_event(&self, id: EventId) -> Result<Option<Event>, StoreError>;
}
