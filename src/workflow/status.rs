use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};
use thiserror::Error;
use utoipa::ToSchema;

use crate::model::kpi_record::KpiRecord;

/// Lifecycle of a KPI record.
///
/// Stored as its snake_case name (`not_started`, `awaiting_approval`, ...).
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
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
pub enum KpiStatus {
    NotStarted,
    InProgress,
    Submitted,
    AwaitingApproval,
    Approved,
    Rejected,
}

impl KpiStatus {
    /// User facing label shown in the dashboard and in error messages
    pub fn label(self) -> &'static str {
        match self {
            KpiStatus::NotStarted => "Chưa bắt đầu",
            KpiStatus::InProgress => "Đang thực hiện",
            KpiStatus::Submitted => "Đã nộp",
            KpiStatus::AwaitingApproval => "Chờ duyệt",
            KpiStatus::Approved => "Đã duyệt",
            KpiStatus::Rejected => "Từ chối",
        }
    }

    /// Destinations reachable from this status in the general table.
    pub fn allowed_targets(self) -> &'static [KpiStatus] {
        use KpiStatus::*;
        match self {
            NotStarted => &[InProgress, AwaitingApproval],
            InProgress => &[Submitted, AwaitingApproval, Rejected],
            Submitted => &[Approved, Rejected],
            AwaitingApproval => &[Approved, Rejected],
            Approved => &[],
            Rejected => &[InProgress],
        }
    }

    pub fn is_terminal(self) -> bool {
        self.allowed_targets().is_empty()
    }

    /// Waiting on an approver's decision
    pub fn is_pending_review(self) -> bool {
        matches!(self, KpiStatus::Submitted | KpiStatus::AwaitingApproval)
    }

    /// Statuses in which the employee may still record an actual value
    pub fn accepts_actual_value(self) -> bool {
        matches!(
            self,
            KpiStatus::NotStarted | KpiStatus::InProgress | KpiStatus::Rejected
        )
    }
}

/// Who is asking for the transition. Admins and managers both act as approvers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ActorRole {
    Employee,
    Approver,
}

/// Optional data accompanying a transition request.
#[derive(Debug, Default, Clone, Copy, Serialize, Deserialize, ToSchema)]
pub struct TransitionExtra {
    #[schema(example = 50.0)]
    pub actual: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TransitionError {
    #[error("Unrecognized current status '{0}'")]
    UnknownCurrentStatus(String),

    #[error("Unrecognized target status '{0}'")]
    UnknownTargetStatus(String),

    #[error("Only the assigned employee can move a KPI to '{}'", .0.label())]
    EmployeeOnly(KpiStatus),

    #[error("Only an approver can move a KPI to '{}'", .0.label())]
    ApproverOnly(KpiStatus),

    #[error(
        "KPI must have actual value > 0 to go from '{}' directly to '{}'",
        KpiStatus::NotStarted.label(),
        KpiStatus::AwaitingApproval.label()
    )]
    MissingActualValue,

    #[error("Cannot transition from '{}' to '{}'", .from.label(), .to.label())]
    NotAllowed { from: KpiStatus, to: KpiStatus },
}

/// An accepted status change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: KpiStatus,
    pub to: KpiStatus,
}

/// Wire shape of a validation outcome: `{ "is_valid": bool, "error"?: string }`
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct TransitionCheck {
    #[schema(example = false)]
    pub is_valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(example = "Cannot transition from 'Chờ duyệt' to 'Đang thực hiện'")]
    pub error: Option<String>,
}

impl From<Result<Transition, TransitionError>> for TransitionCheck {
    fn from(result: Result<Transition, TransitionError>) -> Self {
        match result {
            Ok(_) => TransitionCheck {
                is_valid: true,
                error: None,
            },
            Err(e) => TransitionCheck {
                is_valid: false,
                error: Some(e.to_string()),
            },
        }
    }
}

/// Which roles may move a record *into* `target`.
fn role_permits(target: KpiStatus, actor: ActorRole) -> Result<(), TransitionError> {
    match (target, actor) {
        (KpiStatus::AwaitingApproval, ActorRole::Approver) => {
            Err(TransitionError::EmployeeOnly(target))
        }
        (KpiStatus::Approved | KpiStatus::Rejected, ActorRole::Employee) => {
            Err(TransitionError::ApproverOnly(target))
        }
        _ => Ok(()),
    }
}

/// Decide whether a record in `current` may move to `requested`.
///
/// Both statuses arrive as stored strings so that corrupt rows are reported
/// instead of rejected at deserialization. Checks run in order: recognized
/// statuses, role permission, the direct-submission shortcut, then the table.
pub fn check_transition(
    current: &str,
    requested: &str,
    actor: ActorRole,
    extra: &TransitionExtra,
) -> Result<Transition, TransitionError> {
    let from: KpiStatus = current
        .parse()
        .map_err(|_| TransitionError::UnknownCurrentStatus(current.to_string()))?;
    let to: KpiStatus = requested
        .parse()
        .map_err(|_| TransitionError::UnknownTargetStatus(requested.to_string()))?;

    role_permits(to, actor)?;

    // Direct submission skips in_progress, but only with a reported amount.
    if from == KpiStatus::NotStarted && to == KpiStatus::AwaitingApproval {
        return match extra.actual {
            Some(actual) if actual > 0.0 => Ok(Transition { from, to }),
            _ => Err(TransitionError::MissingActualValue),
        };
    }

    if from.allowed_targets().contains(&to) {
        Ok(Transition { from, to })
    } else {
        Err(TransitionError::NotAllowed { from, to })
    }
}

/// Validate a status change for `record`. Never panics; every failure is
/// reported as `is_valid: false` with a displayable reason.
pub fn validate_transition(
    record: &KpiRecord,
    new_status: &str,
    actor: ActorRole,
    extra: &TransitionExtra,
) -> TransitionCheck {
    check_transition(&record.status, new_status, actor, extra).into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    fn record(status: &str) -> KpiRecord {
        KpiRecord::sample(status)
    }

    fn actual(v: f64) -> TransitionExtra {
        TransitionExtra { actual: Some(v) }
    }

    #[test]
    fn never_panics_for_any_combination() {
        for from in KpiStatus::iter() {
            for to in KpiStatus::iter() {
                for actor in [ActorRole::Employee, ActorRole::Approver] {
                    for extra in [TransitionExtra::default(), actual(0.0), actual(10.0)] {
                        let record = record(from.as_ref());
                        let check = validate_transition(&record, to.as_ref(), actor, &extra);
                        assert_eq!(check.is_valid, check.error.is_none());
                    }
                }
            }
        }
    }

    #[test]
    fn approved_is_terminal() {
        for to in KpiStatus::iter() {
            for actor in [ActorRole::Employee, ActorRole::Approver] {
                let check =
                    validate_transition(&record("approved"), to.as_ref(), actor, &actual(99.0));
                assert!(!check.is_valid, "approved -> {to} should be rejected");
            }
        }
        assert!(KpiStatus::Approved.is_terminal());
    }

    #[test]
    fn shortcut_requires_positive_actual() {
        let check = validate_transition(
            &record("not_started"),
            "awaiting_approval",
            ActorRole::Employee,
            &actual(0.0),
        );
        assert!(!check.is_valid);
        assert!(check.error.unwrap().contains("actual value > 0"));

        let missing = validate_transition(
            &record("not_started"),
            "awaiting_approval",
            ActorRole::Employee,
            &TransitionExtra::default(),
        );
        assert!(!missing.is_valid);

        let nan = check_transition(
            "not_started",
            "awaiting_approval",
            ActorRole::Employee,
            &actual(f64::NAN),
        );
        assert_eq!(nan, Err(TransitionError::MissingActualValue));
    }

    #[test]
    fn shortcut_with_actual_is_valid() {
        let check = validate_transition(
            &record("not_started"),
            "awaiting_approval",
            ActorRole::Employee,
            &actual(50.0),
        );
        assert_eq!(check, TransitionCheck { is_valid: true, error: None });
    }

    #[test]
    fn rejected_loops_back_to_rework() {
        let check = validate_transition(
            &record("rejected"),
            "in_progress",
            ActorRole::Employee,
            &TransitionExtra::default(),
        );
        assert!(check.is_valid);
    }

    #[test]
    fn only_employee_can_request_approval() {
        let approver = ActorRole::Approver;
        let err = check_transition("in_progress", "awaiting_approval", approver, &actual(5.0))
            .unwrap_err();
        assert_eq!(err, TransitionError::EmployeeOnly(KpiStatus::AwaitingApproval));

        // role check runs before the shortcut
        let err = check_transition("not_started", "awaiting_approval", approver, &actual(5.0))
            .unwrap_err();
        assert_eq!(err, TransitionError::EmployeeOnly(KpiStatus::AwaitingApproval));
    }

    #[test]
    fn only_approver_can_decide() {
        let none = TransitionExtra::default();
        for target in ["approved", "rejected"] {
            let err = check_transition("awaiting_approval", target, ActorRole::Employee, &none)
                .unwrap_err();
            assert!(matches!(err, TransitionError::ApproverOnly(_)));

            let ok = check_transition("awaiting_approval", target, ActorRole::Approver, &none);
            assert!(ok.is_ok());
        }
    }

    #[test]
    fn table_disallows_backwards_moves() {
        let none = TransitionExtra::default();
        let err = check_transition("awaiting_approval", "in_progress", ActorRole::Employee, &none)
            .unwrap_err();
        assert_eq!(err.to_string(), "Cannot transition from 'Chờ duyệt' to 'Đang thực hiện'");

        let employee = ActorRole::Employee;
        assert!(check_transition("not_started", "submitted", employee, &actual(3.0)).is_err());
        assert!(check_transition("rejected", "approved", ActorRole::Approver, &none).is_err());
    }

    #[test]
    fn normal_path_is_accepted() {
        let none = TransitionExtra::default();
        let steps = [
            ("not_started", "in_progress", ActorRole::Employee),
            ("in_progress", "submitted", ActorRole::Employee),
            ("submitted", "approved", ActorRole::Approver),
        ];
        for (from, to, actor) in steps {
            let t = check_transition(from, to, actor, &none).unwrap();
            assert_eq!(t.from.as_ref(), from);
            assert_eq!(t.to.as_ref(), to);
        }
    }

    #[test]
    fn unknown_statuses_are_reported() {
        let none = TransitionExtra::default();
        assert_eq!(
            check_transition("archived", "in_progress", ActorRole::Employee, &none),
            Err(TransitionError::UnknownCurrentStatus("archived".into()))
        );
        assert_eq!(
            check_transition("in_progress", "done", ActorRole::Employee, &none),
            Err(TransitionError::UnknownTargetStatus("done".into()))
        );
    }
}
