//! Device-trust rules: shared devices, device hopping, flagged hardware.

use gatecheck_types::{EngineParams, Signal, SignalKind};

/// Store-derived counts for one attempt's device fingerprint. The caller
/// gathers these in one pass; the rule itself stays pure.
pub struct DeviceCounts {
    /// Distinct users ever seen on this device hash.
    pub users_on_device: usize,
    /// Distinct devices this user appeared on inside the simultaneous-use
    /// window, the attempt's own device included when previously seen.
    pub devices_for_user: usize,
    /// Whether any fingerprint row for this hash carries a fraud flag.
    pub flagged: bool,
}

/// Device-trust rules. An attempt without a device hash skips these
/// entirely; the caller abstains before building counts.
pub fn check_device(counts: &DeviceCounts, params: &EngineParams) -> Vec<Signal> {
    let mut signals = Vec::new();

    if counts.users_on_device > params.max_users_per_device {
        signals.push(Signal::fixed(SignalKind::DeviceSharedMultipleUsers));
    }
    if counts.devices_for_user > params.max_simultaneous_devices {
        signals.push(Signal::fixed(SignalKind::DeviceSimultaneous));
    }
    if counts.flagged {
        signals.push(Signal::fixed(SignalKind::DeviceFlagged));
    }

    signals
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counts(users: usize, devices: usize, flagged: bool) -> DeviceCounts {
        DeviceCounts {
            users_on_device: users,
            devices_for_user: devices,
            flagged,
        }
    }

    #[test]
    fn quiet_device_raises_nothing() {
        assert!(check_device(&counts(1, 1, false), &EngineParams::default()).is_empty());
    }

    #[test]
    fn three_users_is_allowed_four_is_shared() {
        let params = EngineParams::default();
        assert!(check_device(&counts(3, 1, false), &params).is_empty());

        let signals = check_device(&counts(4, 1, false), &params);
        assert_eq!(signals.len(), 1);
        assert_eq!(signals[0].kind, SignalKind::DeviceSharedMultipleUsers);
        assert_eq!(signals[0].severity, 0.4);
    }

    #[test]
    fn device_hopping_fires_above_two_devices() {
        let params = EngineParams::default();
        assert!(check_device(&counts(1, 2, false), &params).is_empty());

        let signals = check_device(&counts(1, 3, false), &params);
        assert_eq!(signals.len(), 1);
        assert_eq!(signals[0].kind, SignalKind::DeviceSimultaneous);
        assert_eq!(signals[0].severity, 0.5);
    }

    #[test]
    fn flagged_device_is_hard_fraud() {
        let signals = check_device(&counts(1, 1, true), &EngineParams::default());
        assert_eq!(signals.len(), 1);
        assert_eq!(signals[0].kind, SignalKind::DeviceFlagged);
        assert!(signals[0].is_hard_fraud());
        assert_eq!(signals[0].severity, 0.6);
    }

    #[test]
    fn all_three_can_fire_together() {
        let signals = check_device(&counts(9, 5, true), &EngineParams::default());
        let kinds: Vec<_> = signals.iter().map(|s| s.kind).collect();
        assert_eq!(
            kinds,
            vec![
                SignalKind::DeviceSharedMultipleUsers,
                SignalKind::DeviceSimultaneous,
                SignalKind::DeviceFlagged,
            ]
        );
    }
}
