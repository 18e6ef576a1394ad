use crate::api::{Violation, db_error, message, violation};
use crate::auth::auth::AuthUser;
use crate::model::employee::Employee;
use crate::utils::pagination::{
    EmployeePage, FilterValue, Filters, Pagination, bind_query_as, bind_scalar,
};
use actix_web::{HttpResponse, Responder, web};
use serde::Deserialize;
use sqlx::MySqlPool;
use tracing::debug;
use utoipa::{IntoParams, ToSchema};

const EMPLOYEE_COLUMNS: &str =
    "id, employee_code, first_name, last_name, email, department_id, position, status";

#[derive(Deserialize, ToSchema)]
pub struct CreateEmployee {
    #[schema(example = "NV-001")]
    pub employee_code: String,
    #[schema(example = "An")]
    pub first_name: String,
    #[schema(example = "Nguyễn")]
    pub last_name: String,
    #[schema(example = "an.nguyen@company.vn", format = "email")]
    pub email: String,
    #[schema(example = 1)]
    pub department_id: Option<u64>,
    #[schema(example = "Sales Executive")]
    pub position: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct EmployeeQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub department_id: Option<u64>,
    pub status: Option<String>,
    /// Matches name, email or employee code
    pub search: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct UpdateEmployee {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub department_id: Option<u64>,
    pub position: Option<String>,
    #[schema(example = "inactive")]
    pub status: Option<String>,
}

/// Create Employee
#[utoipa::path(
    post,
    path = "/api/employees",
    request_body = CreateEmployee,
    responses(
        (status = 201, description = "Employee created", body = Employee),
        (status = 400, description = "Unknown department"),
        (status = 409, description = "Duplicate code or email")
    ),
    tag = "Employee",
    security(("bearer_auth" = []))
)]
pub async fn create_employee(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateEmployee>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;
    let payload = payload.into_inner();

    let result = sqlx::query(
        r#"
        INSERT INTO employees
        (employee_code, first_name, last_name, email, department_id, position)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&payload.employee_code)
    .bind(&payload.first_name)
    .bind(&payload.last_name)
    .bind(&payload.email)
    .bind(payload.department_id)
    .bind(&payload.position)
    .execute(pool.get_ref())
    .await;

    match result {
        Ok(r) => Ok(HttpResponse::Created().json(Employee {
            id: r.last_insert_id(),
            employee_code: payload.employee_code,
            first_name: payload.first_name,
            last_name: payload.last_name,
            email: payload.email,
            department_id: payload.department_id,
            position: payload.position,
            status: "active".to_string(),
        })),
        Err(e) => match violation(&e) {
            Some(Violation::Duplicate) => Ok(
                HttpResponse::Conflict().json(message("Employee code or email already exists")),
            ),
            Some(Violation::MissingReference) => {
                Ok(HttpResponse::BadRequest().json(message("Unknown department")))
            }
            None => Err(db_error("Failed to create employee")(e)),
        },
    }
}

#[utoipa::path(
    get,
    path = "/api/employees",
    params(EmployeeQuery),
    responses((status = 200, description = "Paginated employee list", body = EmployeePage)),
    tag = "Employee",
    security(("bearer_auth" = []))
)]
pub async fn list_employees(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<EmployeeQuery>,
) -> actix_web::Result<impl Responder> {
    auth.require_approver()?;

    let paging = Pagination::new(query.page, query.per_page);
    let mut filters = Filters::default();

    if let Some(department_id) = query.department_id {
        filters.push("department_id = ?", FilterValue::U64(department_id));
    }
    if let Some(status) = &query.status {
        filters.push("status = ?", FilterValue::Str(status.clone()));
    }
    if let Some(search) = query.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        let like = format!("%{}%", search);
        filters.push(
            "CONCAT_WS(' ', first_name, last_name, email, employee_code) LIKE ?",
            FilterValue::Str(like),
        );
    }

    let where_sql = filters.where_sql();
    let count_sql = format!("SELECT COUNT(*) FROM employees{}", where_sql);
    debug!(sql = %count_sql, "Counting employees");

    let total = bind_scalar(sqlx::query_scalar::<_, i64>(&count_sql), &filters.values)
        .fetch_one(pool.get_ref())
        .await
        .map_err(db_error("Failed to count employees"))?;

    let data_sql = format!(
        "SELECT {} FROM employees{} ORDER BY id DESC LIMIT ? OFFSET ?",
        EMPLOYEE_COLUMNS, where_sql
    );
    let employees = bind_query_as(sqlx::query_as::<_, Employee>(&data_sql), &filters.values)
        .bind(paging.limit())
        .bind(paging.offset())
        .fetch_all(pool.get_ref())
        .await
        .map_err(db_error("Failed to fetch employees"))?;

    Ok(HttpResponse::Ok().json(paging.wrap(employees, total)))
}

#[utoipa::path(
    put,
    path = "/api/employees/{employee_id}",
    params(("employee_id", Path, description = "Employee ID")),
    request_body = UpdateEmployee,
    responses(
        (status = 200, description = "Employee updated"),
        (status = 400, description = "Unknown department"),
        (status = 404, description = "Employee not found"),
        (status = 409, description = "Duplicate email")
    ),
    tag = "Employee",
    security(("bearer_auth" = []))
)]
pub async fn update_employee(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    body: web::Json<UpdateEmployee>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;
    let employee_id = path.into_inner();

    let result = sqlx::query(
        r#"
        UPDATE employees
        SET first_name = COALESCE(?, first_name),
            last_name = COALESCE(?, last_name),
            email = COALESCE(?, email),
            department_id = COALESCE(?, department_id),
            position = COALESCE(?, position),
            status = COALESCE(?, status)
        WHERE id = ?
        "#,
    )
    .bind(&body.first_name)
    .bind(&body.last_name)
    .bind(&body.email)
    .bind(body.department_id)
    .bind(&body.position)
    .bind(&body.status)
    .bind(employee_id)
    .execute(pool.get_ref())
    .await;

    let result = match result {
        Ok(r) => r,
        Err(e) => {
            return match violation(&e) {
                Some(Violation::Duplicate) => {
                    Ok(HttpResponse::Conflict().json(message("Email already exists")))
                }
                Some(Violation::MissingReference) => {
                    Ok(HttpResponse::BadRequest().json(message("Unknown department")))
                }
                None => Err(db_error("Failed to update employee")(e)),
            };
        }
    };

    // MySQL reports 0 affected rows for a no-op update, so re-check existence
    if result.rows_affected() == 0 {
        let exists =
            sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM employees WHERE id = ?)")
                .bind(employee_id)
                .fetch_one(pool.get_ref())
                .await
                .map_err(db_error("Failed to check employee"))?;
        if !exists {
            return Ok(HttpResponse::NotFound().json(message("Employee not found")));
        }
    }

    Ok(HttpResponse::Ok().json(message("Employee updated successfully")))
}

#[utoipa::path(
    get,
    path = "/api/employees/{employee_id}",
    params(("employee_id", Path, description = "Employee ID")),
    responses(
        (status = 200, description = "Employee found", body = Employee),
        (status = 404, description = "Employee not found")
    ),
    tag = "Employee",
    security(("bearer_auth" = []))
)]
pub async fn get_employee(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let employee_id = path.into_inner();
    if !auth.can_access_employee(employee_id) {
        return Err(actix_web::error::ErrorForbidden("Not your employee profile"));
    }

    let sql = format!("SELECT {} FROM employees WHERE id = ?", EMPLOYEE_COLUMNS);
    let employee = sqlx::query_as::<_, Employee>(&sql)
        .bind(employee_id)
        .fetch_optional(pool.get_ref())
        .await
        .map_err(db_error("Failed to fetch employee"))?;

    match employee {
        Some(emp) => Ok(HttpResponse::Ok().json(emp)),
        None => Ok(HttpResponse::NotFound().json(message("Employee not found"))),
    }
}
