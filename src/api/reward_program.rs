use actix_web::{HttpResponse, Responder, web};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::api::message;
use crate::auth::auth::AuthUser;
use crate::workflow::policy::{RewardProgram, RewardPrograms};
use crate::workflow::reward::{RewardPenaltyOutcome, calculate_reward_penalty, round2};

#[derive(Serialize, ToSchema)]
pub struct RewardProgramList {
    #[schema(example = "standard")]
    pub default_program: String,
    pub programs: Vec<RewardProgram>,
}

#[utoipa::path(
    get,
    path = "/api/reward-programs",
    responses((status = 200, body = RewardProgramList)),
    security(("bearer_auth" = [])),
    tag = "Reward Program"
)]
pub async fn list_reward_programs(
    _auth: AuthUser,
    programs: web::Data<RewardPrograms>,
) -> impl Responder {
    HttpResponse::Ok().json(RewardProgramList {
        default_program: programs.default_program().id.clone(),
        programs: programs.all().to_vec(),
    })
}

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct PreviewQuery {
    #[schema(example = 85.0)]
    pub actual: f64,
    #[schema(example = 100.0)]
    pub target: f64,
    /// Defaults to the default program
    pub program: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct PreviewResult {
    #[schema(example = "standard")]
    pub program_id: String,
    /// Rate rounded to two decimals for display
    #[schema(example = 85.0)]
    pub achievement_rate_display: f64,
    pub outcome: RewardPenaltyOutcome,
}

/// Compute what a calculation would be without storing anything.
#[utoipa::path(
    get,
    path = "/api/reward-programs/preview",
    params(PreviewQuery),
    responses(
        (status = 200, body = PreviewResult),
        (status = 400, description = "Invalid target or actual, or unknown program")
    ),
    security(("bearer_auth" = [])),
    tag = "Reward Program"
)]
pub async fn preview_calculation(
    _auth: AuthUser,
    programs: web::Data<RewardPrograms>,
    query: web::Query<PreviewQuery>,
) -> impl Responder {
    let program = match programs.resolve(query.program.as_deref()) {
        Ok(p) => p,
        Err(e) => return HttpResponse::BadRequest().json(message(e.to_string())),
    };

    match calculate_reward_penalty(query.actual, query.target, program) {
        Ok(outcome) => HttpResponse::Ok().json(PreviewResult {
            program_id: program.id.clone(),
            achievement_rate_display: round2(outcome.achievement_rate),
            outcome,
        }),
        Err(e) => HttpResponse::BadRequest().json(message(e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::{Subject, generate_access_token};
    use crate::config::test_config;
    use actix_web::{App, http::StatusCode, test};

    fn bearer() -> String {
        let subject = Subject {
            user_id: 1,
            username: "lan.tran",
            role: 3,
            employee_id: Some(1),
        };
        let token = generate_access_token(&subject, &test_config().jwt_secret, 60).unwrap();
        format!("Bearer {}", token)
    }

    async fn preview(uri: &str) -> (StatusCode, serde_json::Value) {
        let programs = RewardPrograms::load(None).unwrap();
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(test_config()))
                .app_data(web::Data::new(programs))
                .route("/preview", web::get().to(preview_calculation)),
        )
        .await;
        let req = test::TestRequest::get()
            .uri(uri)
            .insert_header(("Authorization", bearer()))
            .to_request();
        let resp = test::call_service(&app, req).await;
        let status = resp.status();
        (status, test::read_body_json(resp).await)
    }

    #[actix_web::test]
    async fn previews_default_program() {
        let (status, body) = preview("/preview?actual=150&target=100").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["program_id"], "standard");
        assert_eq!(body["outcome"]["reward_amount"], 2000000.0);
        assert_eq!(body["outcome"]["status"], "calculated");
    }

    #[actix_web::test]
    async fn zero_target_is_a_bad_request() {
        let (status, body) = preview("/preview?actual=10&target=0").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["message"].as_str().unwrap().contains("Target value"));
    }

    #[actix_web::test]
    async fn overflowing_rate_is_a_bad_request() {
        let (status, body) = preview("/preview?actual=1e300&target=1e-10").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["message"].as_str().unwrap().contains("out of range"));
    }

    #[actix_web::test]
    async fn unknown_program_is_a_bad_request() {
        let (status, _) = preview("/preview?actual=10&target=100&program=nope").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
