use actix_web::{HttpResponse, Responder, web};
use serde::{Deserialize, Serialize};
use sqlx::{MySql, MySqlPool};
use tracing::{debug, info};
use utoipa::{IntoParams, ToSchema};

use crate::api::calculation::{StoredCalculation, store_calculation};
use crate::api::{Violation, db_error, message, violation};
use crate::auth::auth::AuthUser;
use crate::model::kpi_record::{KPI_RECORD_COLUMNS, KpiRecord};
use crate::model::notification::NotificationKind;
use crate::utils::kpi_cache::KpiCache;
use crate::utils::notify::{notify_approvers, notify_employee};
use crate::utils::pagination::{
    FilterValue, Filters, KpiRecordPage, Pagination, bind_query_as, bind_scalar,
};
use crate::workflow::period::validate_period;
use crate::workflow::policy::RewardPrograms;
use crate::workflow::status::{
    ActorRole, KpiStatus, TransitionCheck, TransitionExtra, check_transition,
    validate_transition,
};

#[derive(Deserialize, ToSchema)]
pub struct AssignKpi {
    #[schema(example = 1)]
    pub employee_id: u64,
    #[schema(example = 1)]
    pub kpi_id: u64,
    #[schema(example = "2025-Q3")]
    pub period: String,
    /// Defaults to the KPI's default target
    #[schema(example = 100.0)]
    pub target_value: Option<f64>,
    pub note: Option<String>,
}

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct KpiRecordQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    /// Ignored for employees, who only see their own records
    pub employee_id: Option<u64>,
    pub kpi_id: Option<u64>,
    #[schema(example = "2025-Q3")]
    pub period: Option<String>,
    #[schema(example = "awaiting_approval")]
    pub status: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct UpdateActual {
    #[schema(example = 85.5)]
    pub actual_value: f64,
    pub note: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct StatusChange {
    #[schema(example = "awaiting_approval")]
    pub status: String,
    /// Actual value reported together with the change (employees only)
    #[schema(example = 50.0)]
    pub actual: Option<f64>,
    /// Becomes the rejection reason when rejecting
    pub note: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct StatusChangeResult {
    pub record: KpiRecord,
    /// Present when the change approved the record
    pub calculation: Option<StoredCalculation>,
}

fn check_actual(value: f64) -> Result<(), HttpResponse> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(HttpResponse::BadRequest().json(message("Actual value must be a finite number >= 0")))
    }
}

/// Fetch a live record, optionally locking it for the rest of the transaction.
pub(crate) async fn load_record<'e, E>(
    executor: E,
    id: u64,
    for_update: bool,
) -> Result<Option<KpiRecord>, sqlx::Error>
where
    E: sqlx::Executor<'e, Database = MySql>,
{
    let sql = format!(
        "SELECT {} FROM kpi_records WHERE id = ? AND is_deleted = FALSE{}",
        KPI_RECORD_COLUMNS,
        if for_update { " FOR UPDATE" } else { "" }
    );
    sqlx::query_as::<_, KpiRecord>(&sql)
        .bind(id)
        .fetch_optional(executor)
        .await
}

fn not_found() -> HttpResponse {
    HttpResponse::NotFound().json(message("KPI record not found"))
}

/// Assign a KPI to an employee for a period.
#[utoipa::path(
    post,
    path = "/api/kpi-records",
    request_body = AssignKpi,
    responses(
        (status = 201, description = "KPI assigned", body = Object, example = json!({"id": 10})),
        (status = 400, description = "Invalid period, target, KPI or employee"),
        (status = 409, description = "KPI already assigned for this period")
    ),
    security(("bearer_auth" = [])),
    tag = "KPI Record"
)]
pub async fn create_kpi_record(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    cache: web::Data<KpiCache>,
    payload: web::Json<AssignKpi>,
) -> actix_web::Result<impl Responder> {
    auth.require_approver()?;

    let period = payload.period.trim();
    if let Err(e) = validate_period(period) {
        return Ok(HttpResponse::BadRequest().json(message(e.to_string())));
    }

    let kpi = match cache
        .get_or_load(pool.get_ref(), payload.kpi_id)
        .await
        .map_err(db_error("Failed to fetch KPI"))?
    {
        Some(kpi) => kpi,
        None => return Ok(HttpResponse::BadRequest().json(message("Unknown KPI"))),
    };

    let target = payload.target_value.unwrap_or(kpi.default_target);
    if !target.is_finite() || target <= 0.0 {
        return Ok(HttpResponse::BadRequest().json(message("Target value must be greater than 0")));
    }

    let employee_active = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM employees WHERE id = ? AND status = 'active')",
    )
    .bind(payload.employee_id)
    .fetch_one(pool.get_ref())
    .await
    .map_err(db_error("Failed to check employee"))?;
    if !employee_active {
        return Ok(HttpResponse::BadRequest().json(message("Unknown or inactive employee")));
    }

    let mut tx = pool.begin().await.map_err(db_error("Failed to begin transaction"))?;

    let result = sqlx::query(
        r#"
        INSERT INTO kpi_records
        (employee_id, kpi_id, period, target_value, status, note, assigned_by)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(payload.employee_id)
    .bind(kpi.id)
    .bind(period)
    .bind(target)
    .bind(KpiStatus::NotStarted.as_ref())
    .bind(&payload.note)
    .bind(auth.user_id)
    .execute(&mut *tx)
    .await;

    let record_id = match result {
        Ok(r) => r.last_insert_id(),
        Err(e) if violation(&e) == Some(Violation::Duplicate) => {
            return Ok(HttpResponse::Conflict()
                .json(message("KPI already assigned to this employee for the period")));
        }
        Err(e) => return Err(db_error("Failed to assign KPI")(e)),
    };

    notify_employee(
        &mut *tx,
        payload.employee_id,
        NotificationKind::KpiAssigned,
        "KPI mới được giao",
        &format!("{} ({}) for period {}, target {}", kpi.name, kpi.code, period, target),
        Some(record_id),
    )
    .await
    .map_err(db_error("Failed to notify employee"))?;

    tx.commit().await.map_err(db_error("Failed to commit assignment"))?;

    info!(record_id, kpi_id = kpi.id, employee_id = payload.employee_id, period, "KPI assigned");
    Ok(HttpResponse::Created().json(serde_json::json!({ "id": record_id })))
}

#[utoipa::path(
    get,
    path = "/api/kpi-records",
    params(KpiRecordQuery),
    responses(
        (status = 200, body = KpiRecordPage),
        (status = 400, description = "Unknown status filter")
    ),
    security(("bearer_auth" = [])),
    tag = "KPI Record"
)]
pub async fn list_kpi_records(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<KpiRecordQuery>,
) -> actix_web::Result<impl Responder> {
    let scope = auth.visibility_scope()?;
    let paging = Pagination::new(query.page, query.per_page);

    let mut filters = Filters::default();
    filters.push_raw("is_deleted = FALSE");
    if let Some(employee_id) = scope.or(query.employee_id) {
        filters.push("employee_id = ?", FilterValue::U64(employee_id));
    }
    if let Some(kpi_id) = query.kpi_id {
        filters.push("kpi_id = ?", FilterValue::U64(kpi_id));
    }
    if let Some(period) = &query.period {
        filters.push("period = ?", FilterValue::Str(period.clone()));
    }
    if let Some(status) = &query.status {
        let status: KpiStatus = match status.parse() {
            Ok(s) => s,
            Err(_) => {
                return Ok(HttpResponse::BadRequest()
                    .json(message(format!("Unrecognized status '{}'", status))));
            }
        };
        filters.push("status = ?", FilterValue::Str(status.to_string()));
    }
    let where_sql = filters.where_sql();

    let count_sql = format!("SELECT COUNT(*) FROM kpi_records{}", where_sql);
    let total = bind_scalar(sqlx::query_scalar::<_, i64>(&count_sql), &filters.values)
        .fetch_one(pool.get_ref())
        .await
        .map_err(db_error("Failed to count KPI records"))?;

    let data_sql = format!(
        "SELECT {} FROM kpi_records{} ORDER BY period DESC, id DESC LIMIT ? OFFSET ?",
        KPI_RECORD_COLUMNS, where_sql
    );
    let records = bind_query_as(sqlx::query_as::<_, KpiRecord>(&data_sql), &filters.values)
        .bind(paging.limit())
        .bind(paging.offset())
        .fetch_all(pool.get_ref())
        .await
        .map_err(db_error("Failed to fetch KPI records"))?;

    Ok(HttpResponse::Ok().json(paging.wrap(records, total)))
}

#[utoipa::path(
    get,
    path = "/api/kpi-records/{record_id}",
    params(("record_id" = u64, Path, description = "KPI record ID")),
    responses(
        (status = 200, body = KpiRecord),
        (status = 404, description = "KPI record not found")
    ),
    security(("bearer_auth" = [])),
    tag = "KPI Record"
)]
pub async fn get_kpi_record(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    match load_record(pool.get_ref(), path.into_inner(), false)
        .await
        .map_err(db_error("Failed to fetch KPI record"))?
    {
        Some(record) if auth.can_access_employee(record.employee_id) => {
            Ok(HttpResponse::Ok().json(record))
        }
        _ => Ok(not_found()),
    }
}

/// Employee reports progress on their own record.
#[utoipa::path(
    put,
    path = "/api/kpi-records/{record_id}/actual",
    params(("record_id" = u64, Path, description = "KPI record ID")),
    request_body = UpdateActual,
    responses(
        (status = 200, description = "Actual value recorded", body = KpiRecord),
        (status = 400, description = "Invalid value or record no longer editable"),
        (status = 403, description = "Not an employee login"),
        (status = 404, description = "KPI record not found")
    ),
    security(("bearer_auth" = [])),
    tag = "KPI Record"
)]
pub async fn update_actual(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    body: web::Json<UpdateActual>,
) -> actix_web::Result<impl Responder> {
    if auth.actor_role() != ActorRole::Employee {
        return Err(actix_web::error::ErrorForbidden(
            "Only the assigned employee can report actual values",
        ));
    }
    let employee_id = auth.require_employee_profile()?;
    let record_id = path.into_inner();

    if let Err(resp) = check_actual(body.actual_value) {
        return Ok(resp);
    }

    let mut tx = pool.begin().await.map_err(db_error("Failed to begin transaction"))?;

    let record = match load_record(&mut *tx, record_id, true)
        .await
        .map_err(db_error("Failed to fetch KPI record"))?
    {
        Some(r) if r.employee_id == employee_id => r,
        _ => return Ok(not_found()),
    };

    let editable = record
        .status
        .parse::<KpiStatus>()
        .map(KpiStatus::accepts_actual_value)
        .unwrap_or(false);
    if !editable {
        return Ok(HttpResponse::BadRequest().json(message(format!(
            "Actual value cannot be changed while the record is '{}'",
            record.status
        ))));
    }

    sqlx::query("UPDATE kpi_records SET actual_value = ?, note = COALESCE(?, note) WHERE id = ?")
        .bind(body.actual_value)
        .bind(&body.note)
        .bind(record_id)
        .execute(&mut *tx)
        .await
        .map_err(db_error("Failed to update actual value"))?;

    let updated = load_record(&mut *tx, record_id, false)
        .await
        .map_err(db_error("Failed to reload KPI record"))?;

    tx.commit().await.map_err(db_error("Failed to commit actual value"))?;

    debug!(record_id, actual = body.actual_value, "Actual value recorded");
    match updated {
        Some(r) => Ok(HttpResponse::Ok().json(r)),
        None => Ok(not_found()),
    }
}

/// Move a record through its lifecycle.
///
/// Approving computes the reward/penalty calculation in the same transaction.
#[utoipa::path(
    put,
    path = "/api/kpi-records/{record_id}/status",
    params(("record_id" = u64, Path, description = "KPI record ID")),
    request_body = StatusChange,
    responses(
        (status = 200, description = "Status changed", body = StatusChangeResult),
        (status = 400, description = "Transition not allowed"),
        (status = 404, description = "KPI record not found"),
        (status = 422, description = "Calculation could not be computed")
    ),
    security(("bearer_auth" = [])),
    tag = "KPI Record"
)]
pub async fn change_status(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    programs: web::Data<RewardPrograms>,
    path: web::Path<u64>,
    body: web::Json<StatusChange>,
) -> actix_web::Result<impl Responder> {
    let record_id = path.into_inner();
    let actor = auth.actor_role();

    if let Some(actual) = body.actual {
        if actor != ActorRole::Employee {
            return Ok(HttpResponse::BadRequest()
                .json(message("Only the assigned employee can report actual values")));
        }
        if let Err(resp) = check_actual(actual) {
            return Ok(resp);
        }
    }

    let mut tx = pool.begin().await.map_err(db_error("Failed to begin transaction"))?;

    // The row lock serializes concurrent transitions and calculations.
    let record = match load_record(&mut *tx, record_id, true)
        .await
        .map_err(db_error("Failed to fetch KPI record"))?
    {
        Some(r) if auth.can_access_employee(r.employee_id) => r,
        _ => return Ok(not_found()),
    };

    let extra = TransitionExtra { actual: body.actual };
    let transition = match check_transition(&record.status, &body.status, actor, &extra) {
        Ok(t) => t,
        Err(e) => {
            info!(
                record_id,
                from = %record.status,
                to = %body.status,
                reason = %e,
                "Transition rejected"
            );
            return Ok(HttpResponse::BadRequest().json(message(e.to_string())));
        }
    };
    let to = transition.to;

    let note = if to == KpiStatus::Rejected { None } else { body.note.as_deref() };
    let result = sqlx::query(
        r#"
        UPDATE kpi_records
        SET status = ?, actual_value = COALESCE(?, actual_value), note = COALESCE(?, note)
        WHERE id = ? AND status = ?
        "#,
    )
    .bind(to.as_ref())
    .bind(body.actual)
    .bind(note)
    .bind(record_id)
    .bind(&record.status)
    .execute(&mut *tx)
    .await
    .map_err(db_error("Failed to update KPI status"))?;

    if result.rows_affected() == 0 {
        return Ok(HttpResponse::Conflict().json(message("KPI record was modified concurrently")));
    }

    let stamp = match to {
        s if s.is_pending_review() => Some(
            sqlx::query(
                "UPDATE kpi_records SET submitted_at = NOW(), rejection_reason = NULL WHERE id = ?",
            )
            .bind(record_id),
        ),
        KpiStatus::Approved => Some(
            sqlx::query("UPDATE kpi_records SET approved_by = ?, approved_at = NOW() WHERE id = ?")
                .bind(auth.user_id)
                .bind(record_id),
        ),
        KpiStatus::Rejected => Some(
            sqlx::query("UPDATE kpi_records SET rejection_reason = ? WHERE id = ?")
                .bind(body.note.as_deref())
                .bind(record_id),
        ),
        _ => None,
    };
    if let Some(stamp) = stamp {
        stamp
            .execute(&mut *tx)
            .await
            .map_err(db_error("Failed to stamp KPI record"))?;
    }

    let updated = match load_record(&mut *tx, record_id, false)
        .await
        .map_err(db_error("Failed to reload KPI record"))?
    {
        Some(r) => r,
        None => return Ok(not_found()),
    };

    let calculation = if to == KpiStatus::Approved {
        match store_calculation(&mut tx, &programs, &updated, auth.user_id).await {
            Ok(stored) => Some(stored),
            Err(e) => return e.into_response(),
        }
    } else {
        None
    };

    let subject = format!("KPI record #{} ({})", record_id, updated.period);
    let notified = match to {
        s if s.is_pending_review() => notify_approvers(
            &mut *tx,
            NotificationKind::KpiSubmitted,
            "KPI chờ duyệt",
            &format!("{} is now '{}'", subject, s.label()),
            Some(record_id),
        )
        .await
        .map(Some),
        KpiStatus::Approved => notify_employee(
            &mut *tx,
            updated.employee_id,
            NotificationKind::KpiApproved,
            "KPI đã được duyệt",
            &format!("{} was approved", subject),
            Some(record_id),
        )
        .await
        .map(Some),
        KpiStatus::Rejected => notify_employee(
            &mut *tx,
            updated.employee_id,
            NotificationKind::KpiRejected,
            "KPI bị từ chối",
            &format!(
                "{} was rejected: {}",
                subject,
                body.note.as_deref().unwrap_or("no reason given")
            ),
            Some(record_id),
        )
        .await
        .map(Some),
        _ => Ok(None),
    }
    .map_err(db_error("Failed to create notifications"))?;

    tx.commit().await.map_err(db_error("Failed to commit status change"))?;

    info!(
        record_id,
        from = %transition.from,
        to = %to,
        user_id = auth.user_id,
        notified = notified.unwrap_or(0),
        "Transition accepted"
    );

    Ok(HttpResponse::Ok().json(StatusChangeResult {
        record: updated,
        calculation,
    }))
}

/// Dry run of a status change. Always 200; the body says whether it would pass.
#[utoipa::path(
    post,
    path = "/api/kpi-records/{record_id}/validate-transition",
    params(("record_id" = u64, Path, description = "KPI record ID")),
    request_body = StatusChange,
    responses(
        (status = 200, body = TransitionCheck),
        (status = 404, description = "KPI record not found")
    ),
    security(("bearer_auth" = [])),
    tag = "KPI Record"
)]
pub async fn validate_status_change(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    body: web::Json<StatusChange>,
) -> actix_web::Result<impl Responder> {
    let record = match load_record(pool.get_ref(), path.into_inner(), false)
        .await
        .map_err(db_error("Failed to fetch KPI record"))?
    {
        Some(r) if auth.can_access_employee(r.employee_id) => r,
        _ => return Ok(not_found()),
    };

    let extra = TransitionExtra { actual: body.actual };
    let check = validate_transition(&record, &body.status, auth.actor_role(), &extra);
    Ok(HttpResponse::Ok().json(check))
}

/// Recompute the calculation of an approved record, superseding the active one.
#[utoipa::path(
    post,
    path = "/api/kpi-records/{record_id}/calculate",
    params(("record_id" = u64, Path, description = "KPI record ID")),
    responses(
        (status = 201, description = "Calculation stored", body = StoredCalculation),
        (status = 400, description = "Record is not approved"),
        (status = 404, description = "KPI record not found"),
        (status = 422, description = "Calculation could not be computed")
    ),
    security(("bearer_auth" = [])),
    tag = "KPI Record"
)]
pub async fn recalculate(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    programs: web::Data<RewardPrograms>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    auth.require_approver()?;
    let record_id = path.into_inner();

    let mut tx = pool.begin().await.map_err(db_error("Failed to begin transaction"))?;

    let record = match load_record(&mut *tx, record_id, true)
        .await
        .map_err(db_error("Failed to fetch KPI record"))?
    {
        Some(r) => r,
        None => return Ok(not_found()),
    };

    if record.status != KpiStatus::Approved.as_ref() {
        return Ok(HttpResponse::BadRequest()
            .json(message("Only approved KPI records can be calculated")));
    }

    let stored = match store_calculation(&mut tx, &programs, &record, auth.user_id).await {
        Ok(stored) => stored,
        Err(e) => return e.into_response(),
    };

    tx.commit().await.map_err(db_error("Failed to commit calculation"))?;

    info!(record_id, calculation_id = stored.id, superseded = stored.superseded, "Recalculated");
    Ok(HttpResponse::Created().json(stored))
}

/// Soft delete a record together with its active calculation.
#[utoipa::path(
    delete,
    path = "/api/kpi-records/{record_id}",
    params(("record_id" = u64, Path, description = "KPI record ID")),
    responses(
        (status = 200, description = "KPI record deleted"),
        (status = 404, description = "KPI record not found")
    ),
    security(("bearer_auth" = [])),
    tag = "KPI Record"
)]
pub async fn delete_kpi_record(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    auth.require_approver()?;
    let record_id = path.into_inner();

    let mut tx = pool.begin().await.map_err(db_error("Failed to begin transaction"))?;

    let deleted = sqlx::query(
        "UPDATE kpi_records SET is_deleted = TRUE, deleted_at = NOW() \
         WHERE id = ? AND is_deleted = FALSE",
    )
    .bind(record_id)
    .execute(&mut *tx)
    .await
    .map_err(db_error("Failed to delete KPI record"))?;

    if deleted.rows_affected() == 0 {
        return Ok(not_found());
    }

    sqlx::query(
        "UPDATE reward_penalty_calculations SET is_deleted = TRUE, deleted_at = NOW() \
         WHERE kpi_record_id = ? AND is_deleted = FALSE",
    )
    .bind(record_id)
    .execute(&mut *tx)
    .await
    .map_err(db_error("Failed to delete calculations"))?;

    tx.commit().await.map_err(db_error("Failed to commit deletion"))?;

    info!(record_id, user_id = auth.user_id, "KPI record soft-deleted");
    Ok(HttpResponse::Ok().json(message("KPI record deleted")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn actual_values_must_be_finite_and_non_negative() {
        assert!(check_actual(0.0).is_ok());
        assert!(check_actual(120.5).is_ok());
        assert!(check_actual(-1.0).is_err());
        assert!(check_actual(f64::NAN).is_err());
        assert!(check_actual(f64::INFINITY).is_err());
    }
}
