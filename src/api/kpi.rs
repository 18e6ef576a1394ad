use actix_web::{HttpResponse, Responder, web};
use serde::Deserialize;
use sqlx::MySqlPool;
use tracing::info;
use utoipa::{IntoParams, ToSchema};

use crate::api::{Violation, db_error, message, violation};
use crate::auth::auth::AuthUser;
use crate::model::kpi::Kpi;
use crate::utils::kpi_cache::{KPI_COLUMNS, KpiCache};
use crate::utils::pagination::{
    FilterValue, Filters, KpiPage, Pagination, bind_query_as, bind_scalar,
};
use crate::workflow::policy::RewardPrograms;

#[derive(Deserialize, ToSchema)]
pub struct CreateKpi {
    #[schema(example = "SALES-REV")]
    pub code: String,
    #[schema(example = "Doanh thu bán hàng")]
    pub name: String,
    pub description: Option<String>,
    #[schema(example = "triệu VND")]
    pub unit: String,
    pub department_id: Option<u64>,
    #[schema(example = 100.0)]
    pub default_target: f64,
    #[schema(example = "standard")]
    pub reward_program: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct UpdateKpi {
    pub name: Option<String>,
    pub description: Option<String>,
    pub unit: Option<String>,
    pub department_id: Option<u64>,
    pub default_target: Option<f64>,
    pub reward_program: Option<String>,
}

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct KpiQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub department_id: Option<u64>,
    /// Matches code or name
    pub search: Option<String>,
}

fn check_target(target: f64) -> Result<(), HttpResponse> {
    if target.is_finite() && target > 0.0 {
        Ok(())
    } else {
        Err(HttpResponse::BadRequest().json(message("Target value must be greater than 0")))
    }
}

fn check_program(programs: &RewardPrograms, id: Option<&str>) -> Result<(), HttpResponse> {
    programs
        .resolve(id)
        .map(|_| ())
        .map_err(|e| HttpResponse::BadRequest().json(message(e.to_string())))
}

#[utoipa::path(
    post,
    path = "/api/kpis",
    request_body = CreateKpi,
    responses(
        (status = 201, description = "KPI created", body = Object, example = json!({"id": 1})),
        (status = 400, description = "Invalid target, unknown reward program or department"),
        (status = 409, description = "Duplicate code")
    ),
    security(("bearer_auth" = [])),
    tag = "KPI"
)]
pub async fn create_kpi(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    programs: web::Data<RewardPrograms>,
    payload: web::Json<CreateKpi>,
) -> actix_web::Result<impl Responder> {
    auth.require_approver()?;

    if let Err(resp) = check_target(payload.default_target)
        .and_then(|_| check_program(&programs, payload.reward_program.as_deref()))
    {
        return Ok(resp);
    }

    let result = sqlx::query(
        r#"
        INSERT INTO kpis
        (code, name, description, unit, department_id, default_target, reward_program)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(payload.code.trim())
    .bind(payload.name.trim())
    .bind(&payload.description)
    .bind(&payload.unit)
    .bind(payload.department_id)
    .bind(payload.default_target)
    .bind(&payload.reward_program)
    .execute(pool.get_ref())
    .await;

    match result {
        Ok(r) => {
            info!(kpi_id = r.last_insert_id(), code = %payload.code, "KPI created");
            Ok(HttpResponse::Created().json(serde_json::json!({ "id": r.last_insert_id() })))
        }
        Err(e) => match violation(&e) {
            Some(Violation::Duplicate) => {
                Ok(HttpResponse::Conflict().json(message("KPI code already exists")))
            }
            Some(Violation::MissingReference) => {
                Ok(HttpResponse::BadRequest().json(message("Unknown department")))
            }
            None => Err(db_error("Failed to create KPI")(e)),
        },
    }
}

#[utoipa::path(
    get,
    path = "/api/kpis",
    params(KpiQuery),
    responses((status = 200, body = KpiPage)),
    security(("bearer_auth" = [])),
    tag = "KPI"
)]
pub async fn list_kpis(
    _auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<KpiQuery>,
) -> actix_web::Result<impl Responder> {
    let paging = Pagination::new(query.page, query.per_page);

    let mut filters = Filters::default();
    filters.push_raw("is_deleted = FALSE");
    if let Some(department_id) = query.department_id {
        filters.push("department_id = ?", FilterValue::U64(department_id));
    }
    if let Some(search) = query.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        let like = format!("%{}%", search);
        filters.push("CONCAT_WS(' ', code, name) LIKE ?", FilterValue::Str(like));
    }
    let where_sql = filters.where_sql();

    let count_sql = format!("SELECT COUNT(*) FROM kpis{}", where_sql);
    let total = bind_scalar(sqlx::query_scalar::<_, i64>(&count_sql), &filters.values)
        .fetch_one(pool.get_ref())
        .await
        .map_err(db_error("Failed to count KPIs"))?;

    let data_sql = format!(
        "SELECT {} FROM kpis{} ORDER BY code LIMIT ? OFFSET ?",
        KPI_COLUMNS, where_sql
    );
    let kpis = bind_query_as(sqlx::query_as::<_, Kpi>(&data_sql), &filters.values)
        .bind(paging.limit())
        .bind(paging.offset())
        .fetch_all(pool.get_ref())
        .await
        .map_err(db_error("Failed to fetch KPIs"))?;

    Ok(HttpResponse::Ok().json(paging.wrap(kpis, total)))
}

#[utoipa::path(
    get,
    path = "/api/kpis/{kpi_id}",
    params(("kpi_id" = u64, Path, description = "KPI ID")),
    responses(
        (status = 200, body = Kpi),
        (status = 404, description = "KPI not found")
    ),
    security(("bearer_auth" = [])),
    tag = "KPI"
)]
pub async fn get_kpi(
    _auth: AuthUser,
    pool: web::Data<MySqlPool>,
    cache: web::Data<KpiCache>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let kpi_id = path.into_inner();

    match cache
        .get_or_load(pool.get_ref(), kpi_id)
        .await
        .map_err(db_error("Failed to fetch KPI"))?
    {
        Some(kpi) => Ok(HttpResponse::Ok().json(kpi)),
        None => Ok(HttpResponse::NotFound().json(message("KPI not found"))),
    }
}

#[utoipa::path(
    put,
    path = "/api/kpis/{kpi_id}",
    params(("kpi_id" = u64, Path, description = "KPI ID")),
    request_body = UpdateKpi,
    responses(
        (status = 200, description = "KPI updated"),
        (status = 400, description = "Invalid target, unknown reward program or department"),
        (status = 404, description = "KPI not found")
    ),
    security(("bearer_auth" = [])),
    tag = "KPI"
)]
pub async fn update_kpi(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    cache: web::Data<KpiCache>,
    programs: web::Data<RewardPrograms>,
    path: web::Path<u64>,
    body: web::Json<UpdateKpi>,
) -> actix_web::Result<impl Responder> {
    auth.require_approver()?;
    let kpi_id = path.into_inner();

    if let Some(target) = body.default_target {
        if let Err(resp) = check_target(target) {
            return Ok(resp);
        }
    }
    if let Some(program) = body.reward_program.as_deref() {
        if let Err(resp) = check_program(&programs, Some(program)) {
            return Ok(resp);
        }
    }

    if cache
        .get_or_load(pool.get_ref(), kpi_id)
        .await
        .map_err(db_error("Failed to fetch KPI"))?
        .is_none()
    {
        return Ok(HttpResponse::NotFound().json(message("KPI not found")));
    }

    let updated = sqlx::query(
        r#"
        UPDATE kpis
        SET name = COALESCE(?, name),
            description = COALESCE(?, description),
            unit = COALESCE(?, unit),
            department_id = COALESCE(?, department_id),
            default_target = COALESCE(?, default_target),
            reward_program = COALESCE(?, reward_program)
        WHERE id = ? AND is_deleted = FALSE
        "#,
    )
    .bind(&body.name)
    .bind(&body.description)
    .bind(&body.unit)
    .bind(body.department_id)
    .bind(body.default_target)
    .bind(&body.reward_program)
    .bind(kpi_id)
    .execute(pool.get_ref())
    .await;

    match updated {
        Ok(_) => {}
        Err(e) if violation(&e) == Some(Violation::MissingReference) => {
            return Ok(HttpResponse::BadRequest().json(message("Unknown department")));
        }
        Err(e) => return Err(db_error("Failed to update KPI")(e)),
    }

    cache.invalidate(kpi_id).await;

    Ok(HttpResponse::Ok().json(message("KPI updated successfully")))
}

const SOFT_DELETE_KPI: &str =
    "UPDATE kpis SET is_deleted = TRUE, deleted_at = NOW() WHERE id = ? AND is_deleted = FALSE";

/// Soft delete. Existing KPI records keep referencing the definition.
#[utoipa::path(
    delete,
    path = "/api/kpis/{kpi_id}",
    params(("kpi_id" = u64, Path, description = "KPI ID")),
    responses(
        (status = 200, description = "KPI deleted"),
        (status = 404, description = "KPI not found")
    ),
    security(("bearer_auth" = [])),
    tag = "KPI"
)]
pub async fn delete_kpi(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    cache: web::Data<KpiCache>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    auth.require_approver()?;
    let kpi_id = path.into_inner();

    let result = sqlx::query(SOFT_DELETE_KPI)
        .bind(kpi_id)
        .execute(pool.get_ref())
        .await
        .map_err(db_error("Failed to delete KPI"))?;

    cache.invalidate(kpi_id).await;

    if result.rows_affected() == 0 {
        return Ok(HttpResponse::NotFound().json(message("KPI not found")));
    }

    info!(kpi_id, user_id = auth.user_id, "KPI soft-deleted");
    Ok(HttpResponse::Ok().json(message("KPI deleted")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn soft_delete_stamps_deleted_at() {
        assert!(SOFT_DELETE_KPI.contains("is_deleted = TRUE, deleted_at = NOW()"));
        // the stamp must come back on reads
        assert!(KPI_COLUMNS.contains("deleted_at"));
    }
}
