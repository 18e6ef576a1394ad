use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// KPI definition: what is measured, not who is measured.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct Kpi {
    #[schema(example = 1)]
    pub id: u64,

    #[schema(example = "SALES-REV")]
    pub code: String,

    #[schema(example = "Doanh thu bán hàng")]
    pub name: String,

    #[schema(example = "Tổng doanh thu trong kỳ", nullable = true)]
    pub description: Option<String>,

    #[schema(example = "triệu VND")]
    pub unit: String,

    #[schema(example = 2, nullable = true)]
    pub department_id: Option<u64>,

    #[schema(example = 100.0)]
    pub default_target: f64,

    /// Reward program id; the configured default applies when empty
    #[schema(example = "standard", nullable = true)]
    pub reward_program: Option<String>,

    #[serde(skip_serializing)]
    pub is_deleted: bool,
    #[schema(format = "date-time", value_type = Option<String>)]
    pub deleted_at: Option<DateTime<Utc>>,

    #[schema(example = "2025-07-01T00:00:00Z", format = "date-time", value_type = String)]
    pub created_at: DateTime<Utc>,

    #[schema(example = "2025-07-01T00:00:00Z", format = "date-time", value_type = String)]
    pub updated_at: DateTime<Utc>,
}
