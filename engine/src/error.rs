use gatecheck_store::StoreError;
use gatecheck_types::{EventId, SupportDecision, VerificationId};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("event not found: {0}")]
    EventNotFound(EventId),

    #[error("verification not found: {0}")]
    VerificationNotFound(VerificationId),

    #[error("support decision already recorded on {id}: {existing}")]
    SupportDecisionAlreadyRecorded {
        id: VerificationId,
        existing: SupportDecision,
    },

    #[error("store failure: {0}")]
    Store(#[from] StoreError),
}
