use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display};
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, AsRefStr, Display)]
#[strum(serialize_all = "snake_case")]
pub enum NotificationKind {
    KpiAssigned,
    KpiSubmitted,
    KpiApproved,
    KpiRejected,
    CalculationApproved,
    CalculationPaid,
}

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct Notification {
    #[schema(example = 1)]
    pub id: u64,
    #[schema(example = 3)]
    pub user_id: u64,
    #[schema(example = "kpi_submitted")]
    pub kind: String,
    #[schema(example = "KPI chờ duyệt")]
    pub title: String,
    pub message: String,
    #[schema(nullable = true)]
    pub kpi_record_id: Option<u64>,
    pub is_read: bool,
    #[schema(example = "2025-10-01T00:00:00Z", format = "date-time", value_type = String)]
    pub created_at: DateTime<Utc>,
}
