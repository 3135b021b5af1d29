//! Host attestation: what the event host says about the attendee.

use gatecheck_types::{EngineParams, Signal, SignalKind};

/// Host-attestation rule. Hosts are not required to attest, so a missing
/// answer abstains; only an explicit denial weighs in. How much it weighs
/// depends on the host's track record: a denial from a highly rated host
/// is a conflict, from anyone else a soft non-confirmation.
pub fn check_host(
    host_confirmed: Option<bool>,
    host_rating: Option<f64>,
    params: &EngineParams,
) -> Option<Signal> {
    match host_confirmed {
        None | Some(true) => None,
        Some(false) => {
            let reliable = host_rating.is_some_and(|r| r > params.reliable_host_rating);
            if reliable {
                Some(Signal::fixed(SignalKind::HostConflict))
            } else {
                Some(Signal::fixed(SignalKind::HostNotConfirmed))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn silence_and_confirmation_abstain() {
        let params = EngineParams::default();
        assert!(check_host(None, Some(4.8), &params).is_none());
        assert!(check_host(Some(true), Some(1.0), &params).is_none());
    }

    #[test]
    fn denial_from_a_top_host_is_a_conflict() {
        let signal = check_host(Some(false), Some(4.5), &EngineParams::default()).unwrap();
        assert_eq!(signal.kind, SignalKind::HostConflict);
        assert_eq!(signal.severity, 0.5);
    }

    #[test]
    fn denial_from_a_middling_host_is_soft() {
        let params = EngineParams::default();
        let signal = check_host(Some(false), Some(3.2), &params).unwrap();
        assert_eq!(signal.kind, SignalKind::HostNotConfirmed);
        assert_eq!(signal.severity, 0.15);

        // Exactly at the reliability line still counts as middling.
        let signal = check_host(Some(false), Some(4.0), &params).unwrap();
        assert_eq!(signal.kind, SignalKind::HostNotConfirmed);
    }

    #[test]
    fn denial_without_a_rating_is_soft() {
        let signal = check_host(Some(false), None, &EngineParams::default()).unwrap();
        assert_eq!(signal.kind, SignalKind::HostNotConfirmed);
    }
}
