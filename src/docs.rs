use crate::api::calculation::{
    CalculationQuery, DeduplicateQuery, DeduplicateReport, DuplicateGroup, StoredCalculation,
};
use crate::api::dashboard::{DashboardSummary, PayoutTotals, StatusCount, SummaryQuery};
use crate::api::department::CreateDepartment;
use crate::api::employee::{CreateEmployee, EmployeeQuery, UpdateEmployee};
use crate::api::kpi::{CreateKpi, KpiQuery, UpdateKpi};
use crate::api::kpi_record::{
    AssignKpi, KpiRecordQuery, StatusChange, StatusChangeResult, UpdateActual,
};
use crate::api::notification::NotificationQuery;
use crate::api::reward_program::{PreviewQuery, PreviewResult, RewardProgramList};
use crate::model::calculation::RewardPenaltyCalculation;
use crate::model::department::Department;
use crate::model::employee::Employee;
use crate::model::kpi::Kpi;
use crate::model::kpi_record::KpiRecord;
use crate::model::notification::Notification;
use crate::models::{LoginReqDto, TokenPair, UserReq};
use crate::utils::pagination::{
    CalculationPage, EmployeePage, KpiPage, KpiRecordPage, NotificationPage,
};
use crate::workflow::payout::CalculationStatus;
use crate::workflow::policy::{RewardBand, RewardProgram};
use crate::workflow::reward::{PolicyDecision, RewardPenaltyOutcome};
use crate::workflow::status::{KpiStatus, TransitionCheck};
use utoipa::Modify;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{OpenApi, openapi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "KPI Dashboard API",
        version = "1.0.0",
        description = r#"
## KPI Dashboard

Tracks employee KPIs per period and turns approved results into rewards or penalties.

### Key Features
- **KPI definitions** with a target and a reward program
- **KPI records**: assignment, progress reporting, submission and review
- **Status validation** with a dry-run endpoint
- **Reward/penalty calculation** on approval, then approval and payout
- **Notifications** for submissions and decisions
- **Dashboard** summary per period

### Security
All `/api` endpoints require a **JWT Bearer** access token.
Managers and admins act as approvers; employees only see their own records.

### Response Format
- JSON everywhere, errors as `{"message": "..."}`
- List endpoints return `{data, page, per_page, total}`
"#,
    ),
    paths(
        crate::auth::handlers::register,
        crate::auth::handlers::login,
        crate::auth::handlers::refresh_token,
        crate::auth::handlers::logout,

        crate::api::department::list_departments,
        crate::api::department::create_department,

        crate::api::employee::create_employee,
        crate::api::employee::get_employee,
        crate::api::employee::list_employees,
        crate::api::employee::update_employee,

        crate::api::kpi::create_kpi,
        crate::api::kpi::list_kpis,
        crate::api::kpi::get_kpi,
        crate::api::kpi::update_kpi,
        crate::api::kpi::delete_kpi,

        crate::api::kpi_record::create_kpi_record,
        crate::api::kpi_record::list_kpi_records,
        crate::api::kpi_record::get_kpi_record,
        crate::api::kpi_record::update_actual,
        crate::api::kpi_record::change_status,
        crate::api::kpi_record::validate_status_change,
        crate::api::kpi_record::recalculate,
        crate::api::kpi_record::delete_kpi_record,

        crate::api::calculation::list_calculations,
        crate::api::calculation::get_calculation,
        crate::api::calculation::approve_calculation,
        crate::api::calculation::pay_calculation,
        crate::api::calculation::deduplicate_calculations,

        crate::api::reward_program::list_reward_programs,
        crate::api::reward_program::preview_calculation,

        crate::api::notification::list_notifications,
        crate::api::notification::mark_read,
        crate::api::notification::mark_all_read,

        crate::api::dashboard::summary
    ),
    components(
        schemas(
            UserReq,
            LoginReqDto,
            TokenPair,
            Department,
            CreateDepartment,
            Employee,
            CreateEmployee,
            UpdateEmployee,
            EmployeeQuery,
            EmployeePage,
            Kpi,
            CreateKpi,
            UpdateKpi,
            KpiQuery,
            KpiPage,
            KpiStatus,
            KpiRecord,
            AssignKpi,
            UpdateActual,
            StatusChange,
            StatusChangeResult,
            KpiRecordQuery,
            KpiRecordPage,
            TransitionCheck,
            CalculationStatus,
            RewardPenaltyCalculation,
            RewardPenaltyOutcome,
            StoredCalculation,
            CalculationQuery,
            CalculationPage,
            DeduplicateQuery,
            DeduplicateReport,
            DuplicateGroup,
            RewardBand,
            RewardProgram,
            RewardProgramList,
            PolicyDecision,
            PreviewQuery,
            PreviewResult,
            Notification,
            NotificationQuery,
            NotificationPage,
            SummaryQuery,
            StatusCount,
            PayoutTotals,
            DashboardSummary
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Auth", description = "Login, token rotation and user registration"),
        (name = "Department", description = "Department reference data"),
        (name = "Employee", description = "Employee management APIs"),
        (name = "KPI", description = "KPI definitions"),
        (name = "KPI Record", description = "Assignment, progress and review of KPI records"),
        (name = "Calculation", description = "Reward/penalty calculations and payout"),
        (name = "Reward Program", description = "Configured reward programs and previews"),
        (name = "Notification", description = "In-app notifications"),
        (name = "Dashboard", description = "Aggregated KPI and payout figures"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_protected_paths_and_scheme() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/api/kpi-records/{record_id}/status"));
        assert!(doc.paths.paths.contains_key("/api/calculations/deduplicate"));
        let components = doc.components.expect("components");
        assert!(components.security_schemes.contains_key("bearer_auth"));
    }
}
