use sqlx::{Executor, MySql};

use crate::model::notification::NotificationKind;
use crate::model::role::Role;

/// One notification per active approver (admins and managers).
pub async fn notify_approvers<'e, E>(
    executor: E,
    kind: NotificationKind,
    title: &str,
    message: &str,
    kpi_record_id: Option<u64>,
) -> Result<u64, sqlx::Error>
where
    E: Executor<'e, Database = MySql>,
{
    let result = sqlx::query(
        r#"
        INSERT INTO notifications (user_id, kind, title, message, kpi_record_id)
        SELECT id, ?, ?, ?, ?
        FROM users
        WHERE is_active = TRUE AND role_id IN (?, ?)
        "#,
    )
    .bind(kind.as_ref())
    .bind(title)
    .bind(message)
    .bind(kpi_record_id)
    .bind(Role::Admin.id())
    .bind(Role::Manager.id())
    .execute(executor)
    .await?;

    Ok(result.rows_affected())
}

/// Notify every active login linked to `employee_id`.
pub async fn notify_employee<'e, E>(
    executor: E,
    employee_id: u64,
    kind: NotificationKind,
    title: &str,
    message: &str,
    kpi_record_id: Option<u64>,
) -> Result<u64, sqlx::Error>
where
    E: Executor<'e, Database = MySql>,
{
    let result = sqlx::query(
        r#"
        INSERT INTO notifications (user_id, kind, title, message, kpi_record_id)
        SELECT id, ?, ?, ?, ?
        FROM users
        WHERE is_active = TRUE AND employee_id = ?
        "#,
    )
    .bind(kind.as_ref())
    .bind(title)
    .bind(message)
    .bind(kpi_record_id)
    .bind(employee_id)
    .execute(executor)
    .await?;

    Ok(result.rows_affected())
}
