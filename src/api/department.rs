use actix_web::{HttpResponse, Responder, web};
use serde::Deserialize;
use sqlx::MySqlPool;
use utoipa::ToSchema;

use crate::api::{Violation, db_error, message, violation};
use crate::auth::auth::AuthUser;
use crate::model::department::Department;

#[derive(Deserialize, ToSchema)]
pub struct CreateDepartment {
    #[schema(example = "Kinh doanh")]
    pub name: String,
}

#[utoipa::path(
    get,
    path = "/api/departments",
    responses((status = 200, body = [Department])),
    security(("bearer_auth" = [])),
    tag = "Department"
)]
pub async fn list_departments(
    _auth: AuthUser,
    pool: web::Data<MySqlPool>,
) -> actix_web::Result<impl Responder> {
    let departments =
        sqlx::query_as::<_, Department>("SELECT id, name FROM departments ORDER BY name")
            .fetch_all(pool.get_ref())
            .await
            .map_err(db_error("Failed to fetch departments"))?;

    Ok(HttpResponse::Ok().json(departments))
}

#[utoipa::path(
    post,
    path = "/api/departments",
    request_body = CreateDepartment,
    responses(
        (status = 201, body = Department),
        (status = 400, description = "Empty name"),
        (status = 409, description = "Department already exists")
    ),
    security(("bearer_auth" = [])),
    tag = "Department"
)]
pub async fn create_department(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateDepartment>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let name = payload.name.trim();
    if name.is_empty() {
        return Ok(HttpResponse::BadRequest().json(message("Department name must not be empty")));
    }

    let result = sqlx::query("INSERT INTO departments (name) VALUES (?)")
        .bind(name)
        .execute(pool.get_ref())
        .await;

    match result {
        Ok(r) => Ok(HttpResponse::Created().json(Department {
            id: r.last_insert_id(),
            name: name.to_string(),
        })),
        Err(e) if violation(&e) == Some(Violation::Duplicate) => {
            Ok(HttpResponse::Conflict().json(message("Department already exists")))
        }
        Err(e) => Err(db_error("Failed to create department")(e)),
    }
}
