use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct RewardPenaltyCalculation {
    #[schema(example = 5)]
    pub id: u64,
    #[schema(example = 10)]
    pub kpi_record_id: u64,
    #[schema(example = 1)]
    pub employee_id: u64,
    #[schema(example = "2025-Q3")]
    pub period: String,
    #[schema(example = "standard")]
    pub program_id: String,
    #[schema(example = 150.0)]
    pub achievement_rate: f64,
    #[schema(example = 2000000.0)]
    pub reward_amount: f64,
    #[schema(example = 0.0)]
    pub penalty_amount: f64,
    #[schema(example = 2000000.0)]
    pub net_amount: f64,
    #[schema(example = "calculated")]
    pub status: String,
    #[schema(nullable = true)]
    pub notes: Option<String>,
    #[schema(nullable = true)]
    pub calculated_by: Option<u64>,
    #[schema(nullable = true)]
    pub approved_by: Option<u64>,
    #[schema(format = "date-time", value_type = Option<String>)]
    pub approved_at: Option<DateTime<Utc>>,
    #[schema(format = "date-time", value_type = Option<String>)]
    pub paid_at: Option<DateTime<Utc>>,
    pub is_deleted: bool,
    #[schema(format = "date-time", value_type = Option<String>)]
    pub deleted_at: Option<DateTime<Utc>>,
    #[schema(example = "2025-10-01T00:00:00Z", format = "date-time", value_type = String)]
    pub created_at: DateTime<Utc>,
}

pub const CALCULATION_COLUMNS: &str = "id, kpi_record_id, employee_id, period, program_id, \
     achievement_rate, reward_amount, penalty_amount, net_amount, status, notes, calculated_by, \
     approved_by, approved_at, paid_at, is_deleted, deleted_at, created_at";
