use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// One employee's tracked performance against one KPI for one period.
///
/// `status` is kept as stored so unrecognized values surface as validation
/// errors instead of row decoding failures.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct KpiRecord {
    #[schema(example = 10)]
    pub id: u64,
    #[schema(example = 1)]
    pub employee_id: u64,
    #[schema(example = 1)]
    pub kpi_id: u64,
    #[schema(example = "2025-Q3")]
    pub period: String,
    #[schema(example = 100.0)]
    pub target_value: f64,
    #[schema(example = 0.0)]
    pub actual_value: f64,
    #[schema(example = "not_started")]
    pub status: String,
    #[schema(nullable = true)]
    pub note: Option<String>,
    #[schema(example = 2, nullable = true)]
    pub assigned_by: Option<u64>,
    #[schema(format = "date-time", value_type = Option<String>)]
    pub submitted_at: Option<DateTime<Utc>>,
    #[schema(nullable = true)]
    pub approved_by: Option<u64>,
    #[schema(format = "date-time", value_type = Option<String>)]
    pub approved_at: Option<DateTime<Utc>>,
    #[schema(nullable = true)]
    pub rejection_reason: Option<String>,
    pub is_deleted: bool,
    #[schema(format = "date-time", value_type = Option<String>)]
    pub deleted_at: Option<DateTime<Utc>>,
    #[schema(example = "2025-07-01T00:00:00Z", format = "date-time", value_type = String)]
    pub created_at: DateTime<Utc>,
    #[schema(example = "2025-07-01T00:00:00Z", format = "date-time", value_type = String)]
    pub updated_at: DateTime<Utc>,
}

/// Column list shared by every query that decodes a `KpiRecord`.
pub const KPI_RECORD_COLUMNS: &str = "id, employee_id, kpi_id, period, target_value, actual_value, \
     status, note, assigned_by, submitted_at, approved_by, approved_at, rejection_reason, \
     is_deleted, deleted_at, created_at, updated_at";

#[cfg(test)]
impl KpiRecord {
    pub fn sample(status: &str) -> Self {
        let now = Utc::now();
        KpiRecord {
            id: 1,
            employee_id: 1,
            kpi_id: 1,
            period: "2025-Q3".to_string(),
            target_value: 100.0,
            actual_value: 0.0,
            status: status.to_string(),
            note: None,
            assigned_by: None,
            submitted_at: None,
            approved_by: None,
            approved_at: None,
            rejection_reason: None,
            is_deleted: false,
            deleted_at: None,
            created_at: now,
            updated_at: now,
        }
    }
}
