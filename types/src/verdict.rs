//! Verdict enums: classification, downstream action, support decisions.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The three-way classification of a check-in attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Classification {
    /// Risk at or below the valid ceiling; attendance accepted.
    Valid,
    /// Elevated risk; attendance restricted until it clears.
    Suspicious,
    /// Hard fraud signal or risk above the suspicious ceiling; escalated.
    Fraudulent,
}

impl Classification {
    /// Whether attendance-gated features (rewards, reviews, escrow) unlock.
    pub fn unlocks_attendance(&self) -> bool {
        matches!(self, Self::Valid)
    }

    /// The downstream action each classification maps to.
    pub fn action(&self) -> VerdictAction {
        match self {
            Self::Valid => VerdictAction::Accept,
            Self::Suspicious => VerdictAction::Restrict,
            Self::Fraudulent => VerdictAction::EscalateToSupport,
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Valid => "Valid",
            Self::Suspicious => "Suspicious",
            Self::Fraudulent => "Fraudulent",
        };
        f.write_str(s)
    }
}

/// What the platform should do with the attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerdictAction {
    Accept,
    Restrict,
    EscalateToSupport,
}

impl fmt::Display for VerdictAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Accept => "accept",
            Self::Restrict => "restrict",
            Self::EscalateToSupport => "escalate_to_support",
        };
        f.write_str(s)
    }
}

/// A support agent's ruling on an escalated or disputed verification.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SupportDecision {
    /// Attendance was genuine; unlock everything and restore trust.
    ConfirmedValid,
    /// Attendance was fraud; lock everything and penalize trust.
    ConfirmedFraud,
    /// Review could not settle it; verdict and trust stay as decided.
    Inconclusive,
}

impl fmt::Display for SupportDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::ConfirmedValid => "confirmed_valid",
            Self::ConfirmedFraud => "confirmed_fraud",
            Self::Inconclusive => "inconclusive",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_valid_unlocks_attendance() {
        assert!(Classification::Valid.unlocks_attendance());
        assert!(!Classification::Suspicious.unlocks_attendance());
        assert!(!Classification::Fraudulent.unlocks_attendance());
    }

    #[test]
    fn classification_maps_to_expected_action() {
        assert_eq!(Classification::Valid.action(), VerdictAction::Accept);
        assert_eq!(Classification::Suspicious.action(), VerdictAction::Restrict);
        assert_eq!(
            Classification::Fraudulent.action(),
            VerdictAction::EscalateToSupport
        );
    }

    #[test]
    fn wire_names_use_snake_case() {
        assert_eq!(
            serde_json::to_string(&VerdictAction::EscalateToSupport).unwrap(),
            "\"escalate_to_support\""
        );
        assert_eq!(
            serde_json::to_string(&SupportDecision::ConfirmedFraud).unwrap(),
            "\"confirmed_fraud\""
        );
        // Classification keeps capitalized names for parity with stored records.
        assert_eq!(
            serde_json::to_string(&Classification::Valid).unwrap(),
            "\"Valid\""
        );
    }
}
