use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};
use thiserror::Error;
use utoipa::ToSchema;

/// Lifecycle of a reward/penalty calculation: calculated -> approved -> paid.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    EnumString,
    Display,
    AsRefStr,
    EnumIter,
    ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum CalculationStatus {
    Calculated,
    Approved,
    Paid,
}

impl CalculationStatus {
    pub fn label(self) -> &'static str {
        match self {
            CalculationStatus::Calculated => "Đã tính",
            CalculationStatus::Approved => "Đã duyệt",
            CalculationStatus::Paid => "Đã chi trả",
        }
    }

    pub fn next(self) -> Option<CalculationStatus> {
        match self {
            CalculationStatus::Calculated => Some(CalculationStatus::Approved),
            CalculationStatus::Approved => Some(CalculationStatus::Paid),
            CalculationStatus::Paid => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PayoutError {
    #[error("Unrecognized calculation status '{0}'")]
    UnknownStatus(String),

    #[error("Calculation cannot move from '{}' to '{}'", .from.label(), .to.label())]
    NotAllowed {
        from: CalculationStatus,
        to: CalculationStatus,
    },
}

/// Only single forward steps are allowed.
pub fn check_payout_transition(
    current: &str,
    to: CalculationStatus,
) -> Result<CalculationStatus, PayoutError> {
    let from: CalculationStatus = current
        .parse()
        .map_err(|_| PayoutError::UnknownStatus(current.to_string()))?;

    if from.next() == Some(to) {
        Ok(from)
    } else {
        Err(PayoutError::NotAllowed { from, to })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn forward_steps_only() {
        assert!(check_payout_transition("calculated", CalculationStatus::Approved).is_ok());
        assert!(check_payout_transition("approved", CalculationStatus::Paid).is_ok());

        assert!(check_payout_transition("calculated", CalculationStatus::Paid).is_err());
        assert!(check_payout_transition("approved", CalculationStatus::Calculated).is_err());
        for to in CalculationStatus::iter() {
            assert!(check_payout_transition("paid", to).is_err());
        }
    }

    #[test]
    fn unknown_status() {
        assert_eq!(
            check_payout_transition("void", CalculationStatus::Paid),
            Err(PayoutError::UnknownStatus("void".into()))
        );
    }
}
