use serde::Serialize;
use sqlx::MySql;
use sqlx::mysql::MySqlArguments;
use sqlx::query::{QueryAs, QueryScalar};
use utoipa::ToSchema;

use crate::model::calculation::RewardPenaltyCalculation;
use crate::model::employee::Employee;
use crate::model::kpi::Kpi;
use crate::model::kpi_record::KpiRecord;
use crate::model::notification::Notification;

pub const DEFAULT_PER_PAGE: u32 = 10;
pub const MAX_PER_PAGE: u32 = 100;

/// Normalized 1-based paging window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: u32,
    pub per_page: u32,
}

impl Pagination {
    pub fn new(page: Option<u32>, per_page: Option<u32>) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            per_page: per_page.unwrap_or(DEFAULT_PER_PAGE).clamp(1, MAX_PER_PAGE),
        }
    }

    pub fn limit(&self) -> i64 {
        self.per_page as i64
    }

    pub fn offset(&self) -> i64 {
        (self.page as i64 - 1) * self.per_page as i64
    }

    pub fn wrap<T>(self, data: Vec<T>, total: i64) -> Paginated<T> {
        Paginated {
            data,
            page: self.page,
            per_page: self.per_page,
            total,
        }
    }
}

#[derive(Serialize, ToSchema)]
#[aliases(
    EmployeePage = Paginated<Employee>,
    KpiPage = Paginated<Kpi>,
    KpiRecordPage = Paginated<KpiRecord>,
    CalculationPage = Paginated<RewardPenaltyCalculation>,
    NotificationPage = Paginated<Notification>
)]
pub struct Paginated<T> {
    pub data: Vec<T>,
    #[schema(example = 1)]
    pub page: u32,
    #[schema(example = 10)]
    pub per_page: u32,
    #[schema(example = 1)]
    pub total: i64,
}

/// Typed bind values for dynamically built WHERE clauses.
#[derive(Debug, Clone)]
pub enum FilterValue {
    U64(u64),
    Str(String),
    Bool(bool),
}

/// Accumulates `AND` conditions with their bind values, in order.
#[derive(Debug, Default)]
pub struct Filters {
    conditions: Vec<&'static str>,
    pub values: Vec<FilterValue>,
}

impl Filters {
    pub fn push(&mut self, condition: &'static str, value: FilterValue) {
        self.conditions.push(condition);
        self.values.push(value);
    }

    pub fn push_raw(&mut self, condition: &'static str) {
        self.conditions.push(condition);
    }

    pub fn where_sql(&self) -> String {
        if self.conditions.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", self.conditions.join(" AND "))
        }
    }
}

pub fn bind_query_as<'q, O>(
    mut query: QueryAs<'q, MySql, O, MySqlArguments>,
    values: &'q [FilterValue],
) -> QueryAs<'q, MySql, O, MySqlArguments> {
    for v in values {
        query = match v {
            FilterValue::U64(n) => query.bind(*n),
            FilterValue::Str(s) => query.bind(s.as_str()),
            FilterValue::Bool(b) => query.bind(*b),
        };
    }
    query
}

pub fn bind_scalar<'q, O>(
    mut query: QueryScalar<'q, MySql, O, MySqlArguments>,
    values: &'q [FilterValue],
) -> QueryScalar<'q, MySql, O, MySqlArguments> {
    for v in values {
        query = match v {
            FilterValue::U64(n) => query.bind(*n),
            FilterValue::Str(s) => query.bind(s.as_str()),
            FilterValue::Bool(b) => query.bind(*b),
        };
    }
    query
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_and_clamping() {
        assert_eq!(Pagination::new(None, None), Pagination { page: 1, per_page: 10 });
        assert_eq!(Pagination::new(Some(0), Some(0)), Pagination { page: 1, per_page: 1 });
        assert_eq!(Pagination::new(Some(3), Some(500)).per_page, MAX_PER_PAGE);
    }

    #[test]
    fn offset_is_zero_based() {
        let p = Pagination::new(Some(3), Some(20));
        assert_eq!(p.limit(), 20);
        assert_eq!(p.offset(), 40);
        assert_eq!(Pagination::new(Some(1), Some(20)).offset(), 0);
    }

    #[test]
    fn where_clause_joins_conditions() {
        let mut f = Filters::default();
        assert_eq!(f.where_sql(), "");
        f.push_raw("is_deleted = FALSE");
        f.push("employee_id = ?", FilterValue::U64(7));
        f.push("status = ?", FilterValue::Str("approved".into()));
        assert_eq!(f.where_sql(), " WHERE is_deleted = FALSE AND employee_id = ? AND status = ?");
        assert_eq!(f.values.len(), 2);
    }
}
