use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[schema(
    example = json!({
        "id": 1,
        "employee_code": "NV-001",
        "first_name": "An",
        "last_name": "Nguyễn",
        "email": "an.nguyen@company.vn",
        "department_id": 2,
        "position": "Sales Executive",
        "status": "active"
    })
)]
pub struct Employee {
    #[schema(example = 1)]
    pub id: u64,

    #[schema(example = "NV-001")]
    pub employee_code: String,

    #[schema(example = "An")]
    pub first_name: String,

    #[schema(example = "Nguyễn")]
    pub last_name: String,

    #[schema(example = "an.nguyen@company.vn")]
    pub email: String,

    #[schema(example = 2, nullable = true)]
    pub department_id: Option<u64>,

    #[schema(example = "Sales Executive", nullable = true)]
    pub position: Option<String>,

    #[schema(example = "active")]
    pub status: String,
}
