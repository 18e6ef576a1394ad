use actix_web::{HttpResponse, Responder, web};
use serde::Deserialize;
use sqlx::MySqlPool;
use utoipa::{IntoParams, ToSchema};

use crate::api::{db_error, message};
use crate::auth::auth::AuthUser;
use crate::model::notification::Notification;
use crate::utils::pagination::{
    FilterValue, Filters, NotificationPage, Pagination, bind_query_as, bind_scalar,
};

const NOTIFICATION_COLUMNS: &str =
    "id, user_id, kind, title, message, kpi_record_id, is_read, created_at";

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct NotificationQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    /// Only unread notifications
    pub unread: Option<bool>,
}

/// Notifications addressed to the caller, newest first.
#[utoipa::path(
    get,
    path = "/api/notifications",
    params(NotificationQuery),
    responses((status = 200, body = NotificationPage)),
    security(("bearer_auth" = [])),
    tag = "Notification"
)]
pub async fn list_notifications(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<NotificationQuery>,
) -> actix_web::Result<impl Responder> {
    let paging = Pagination::new(query.page, query.per_page);

    let mut filters = Filters::default();
    filters.push("user_id = ?", FilterValue::U64(auth.user_id));
    if query.unread.unwrap_or(false) {
        filters.push("is_read = ?", FilterValue::Bool(false));
    }
    let where_sql = filters.where_sql();

    let count_sql = format!("SELECT COUNT(*) FROM notifications{}", where_sql);
    let total = bind_scalar(sqlx::query_scalar::<_, i64>(&count_sql), &filters.values)
        .fetch_one(pool.get_ref())
        .await
        .map_err(db_error("Failed to count notifications"))?;

    let data_sql = format!(
        "SELECT {} FROM notifications{} ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?",
        NOTIFICATION_COLUMNS, where_sql
    );
    let rows = bind_query_as(sqlx::query_as::<_, Notification>(&data_sql), &filters.values)
        .bind(paging.limit())
        .bind(paging.offset())
        .fetch_all(pool.get_ref())
        .await
        .map_err(db_error("Failed to fetch notifications"))?;

    Ok(HttpResponse::Ok().json(paging.wrap(rows, total)))
}

#[utoipa::path(
    put,
    path = "/api/notifications/{notification_id}/read",
    params(("notification_id" = u64, Path, description = "Notification ID")),
    responses(
        (status = 200, description = "Marked as read"),
        (status = 404, description = "Notification not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Notification"
)]
pub async fn mark_read(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let id = path.into_inner();
    let exists = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM notifications WHERE id = ? AND user_id = ?)",
    )
    .bind(id)
    .bind(auth.user_id)
    .fetch_one(pool.get_ref())
    .await
    .map_err(db_error("Failed to check notification"))?;

    if !exists {
        return Ok(HttpResponse::NotFound().json(message("Notification not found")));
    }

    sqlx::query("UPDATE notifications SET is_read = TRUE WHERE id = ? AND user_id = ?")
        .bind(id)
        .bind(auth.user_id)
        .execute(pool.get_ref())
        .await
        .map_err(db_error("Failed to mark notification as read"))?;

    Ok(HttpResponse::Ok().json(message("Notification marked as read")))
}

#[utoipa::path(
    put,
    path = "/api/notifications/read-all",
    responses((
        status = 200,
        description = "Number of notifications marked",
        body = Object,
        example = json!({"updated": 3})
    )),
    security(("bearer_auth" = [])),
    tag = "Notification"
)]
pub async fn mark_all_read(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
) -> actix_web::Result<impl Responder> {
    let result =
        sqlx::query("UPDATE notifications SET is_read = TRUE WHERE user_id = ? AND is_read = FALSE")
            .bind(auth.user_id)
            .execute(pool.get_ref())
            .await
            .map_err(db_error("Failed to mark notifications as read"))?;

    Ok(HttpResponse::Ok().json(serde_json::json!({ "updated": result.rows_affected() })))
}
