use std::collections::BTreeMap;

use actix_web::{HttpResponse, Responder, web};
use serde::{Deserialize, Serialize};
use sqlx::MySqlPool;
use strum::IntoEnumIterator;
use utoipa::{IntoParams, ToSchema};

use crate::api::db_error;
use crate::auth::auth::AuthUser;
use crate::utils::pagination::{FilterValue, Filters, bind_query_as};
use crate::workflow::status::KpiStatus;

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct SummaryQuery {
    #[schema(example = "2025-Q3")]
    pub period: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct StatusCount {
    #[schema(example = "awaiting_approval")]
    pub status: String,
    #[schema(example = "Chờ duyệt")]
    pub label: String,
    #[schema(example = 4)]
    pub count: i64,
}

#[derive(Debug, Default, Serialize, ToSchema)]
pub struct PayoutTotals {
    pub reward_amount: f64,
    pub penalty_amount: f64,
    pub net_amount: f64,
    /// Net amount per calculation status
    pub net_by_status: BTreeMap<String, f64>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DashboardSummary {
    pub period: Option<String>,
    pub total_records: i64,
    /// One entry per known status, zero counts included
    pub records_by_status: Vec<StatusCount>,
    pub payouts: PayoutTotals,
}

/// Fill in zero counts and keep lifecycle order; unknown stored statuses go last.
fn status_counts(rows: Vec<(String, i64)>) -> Vec<StatusCount> {
    let mut counts: BTreeMap<String, i64> = rows.into_iter().collect();

    let mut out: Vec<StatusCount> = KpiStatus::iter()
        .map(|s| StatusCount {
            status: s.to_string(),
            label: s.label().to_string(),
            count: counts.remove(s.as_ref()).unwrap_or(0),
        })
        .collect();

    out.extend(counts.into_iter().map(|(status, count)| StatusCount {
        label: status.clone(),
        status,
        count,
    }));
    out
}

#[utoipa::path(
    get,
    path = "/api/dashboard/summary",
    params(SummaryQuery),
    responses((status = 200, body = DashboardSummary)),
    security(("bearer_auth" = [])),
    tag = "Dashboard"
)]
pub async fn summary(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<SummaryQuery>,
) -> actix_web::Result<impl Responder> {
    let scope = auth.visibility_scope()?;

    let mut filters = Filters::default();
    filters.push_raw("is_deleted = FALSE");
    if let Some(employee_id) = scope {
        filters.push("employee_id = ?", FilterValue::U64(employee_id));
    }
    if let Some(period) = &query.period {
        filters.push("period = ?", FilterValue::Str(period.clone()));
    }
    let where_sql = filters.where_sql();

    let status_sql =
        format!("SELECT status, COUNT(*) FROM kpi_records{} GROUP BY status", where_sql);
    let rows = bind_query_as(sqlx::query_as::<_, (String, i64)>(&status_sql), &filters.values)
        .fetch_all(pool.get_ref())
        .await
        .map_err(db_error("Failed to count KPI records by status"))?;

    let total_records: i64 = rows.iter().map(|(_, c)| c).sum();
    let records_by_status = status_counts(rows);

    let payout_sql = format!(
        "SELECT status, SUM(reward_amount), SUM(penalty_amount), SUM(net_amount) \
         FROM reward_penalty_calculations{} GROUP BY status",
        where_sql
    );
    let payout_rows = bind_query_as(
        sqlx::query_as::<_, (String, Option<f64>, Option<f64>, Option<f64>)>(&payout_sql),
        &filters.values,
    )
    .fetch_all(pool.get_ref())
    .await
    .map_err(db_error("Failed to sum calculations"))?;

    let mut payouts = PayoutTotals::default();
    for (status, reward, penalty, net) in payout_rows {
        payouts.reward_amount += reward.unwrap_or(0.0);
        payouts.penalty_amount += penalty.unwrap_or(0.0);
        payouts.net_amount += net.unwrap_or(0.0);
        payouts.net_by_status.insert(status, net.unwrap_or(0.0));
    }

    Ok(HttpResponse::Ok().json(DashboardSummary {
        period: query.period.clone(),
        total_records,
        records_by_status,
        payouts,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_status_is_listed_in_order() {
        let counts = status_counts(vec![("approved".into(), 3), ("not_started".into(), 2)]);
        let statuses: Vec<&str> = counts.iter().map(|c| c.status.as_str()).collect();
        assert_eq!(
            statuses,
            ["not_started", "in_progress", "submitted", "awaiting_approval", "approved", "rejected"]
        );
        assert_eq!(counts[0].count, 2);
        assert_eq!(counts[1].count, 0);
        assert_eq!(counts[4].count, 3);
        assert_eq!(counts[4].label, "Đã duyệt");
    }

    #[test]
    fn unknown_statuses_are_kept() {
        let counts = status_counts(vec![("archived".into(), 1)]);
        assert_eq!(counts.len(), 7);
        assert_eq!(counts[6].status, "archived");
        assert_eq!(counts[6].count, 1);
    }
}
