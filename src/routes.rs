use crate::{
    api::{
        calculation, dashboard, department, employee, kpi, kpi_record, notification,
        reward_program,
    },
    auth::{handlers, middleware::auth_middleware},
    config::Config,
};
use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::{middleware::from_fn, web};
use std::sync::Arc;

/// Per-IP limiter allowing `requests_per_min`, refilled evenly over the minute.
fn build_limiter(requests_per_min: u32) -> Option<Governor<PeerIpKeyExtractor, NoOpMiddleware>> {
    let requests_per_min = requests_per_min.max(1);
    let cfg = GovernorConfigBuilder::default()
        .per_millisecond((60_000 / requests_per_min as u64).max(1))
        .burst_size(requests_per_min)
        .key_extractor(PeerIpKeyExtractor)
        .finish()?;
    Some(Governor::new(&cfg))
}

/// Builds every limiter up front so a bad rate fails at startup.
pub struct Limiters {
    login: Arc<Governor<PeerIpKeyExtractor, NoOpMiddleware>>,
    register: Arc<Governor<PeerIpKeyExtractor, NoOpMiddleware>>,
    refresh: Arc<Governor<PeerIpKeyExtractor, NoOpMiddleware>>,
    protected: Arc<Governor<PeerIpKeyExtractor, NoOpMiddleware>>,
}

impl Limiters {
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let build = |name: &str, rate: u32| {
            build_limiter(rate)
                .map(Arc::new)
                .ok_or_else(|| anyhow::anyhow!("Invalid {} rate limit: {}", name, rate))
        };
        Ok(Self {
            login: build("login", config.rate_login_per_min)?,
            register: build("register", config.rate_register_per_min)?,
            refresh: build("refresh", config.rate_refresh_per_min)?,
            protected: build("protected", config.rate_protected_per_min)?,
        })
    }
}

pub fn configure(cfg: &mut web::ServiceConfig, config: &Config, limiters: &Limiters) {
    // Public routes
    cfg.service(
        web::scope("/auth")
            .service(
                web::resource("/login")
                    .wrap(limiters.login.clone())
                    .route(web::post().to(handlers::login)),
            )
            .service(
                web::resource("/register")
                    .wrap(limiters.register.clone())
                    .route(web::post().to(handlers::register)),
            )
            .service(
                web::resource("/refresh")
                    .wrap(limiters.refresh.clone())
                    .route(web::post().to(handlers::refresh_token)),
            )
            .service(
                web::resource("/logout")
                    .wrap(limiters.login.clone())
                    .route(web::post().to(handlers::logout)),
            ),
    );

    // Protected routes
    cfg.service(
        web::scope(&config.api_prefix)
            .wrap(from_fn(auth_middleware))
            .wrap(limiters.protected.clone())
            .service(
                web::resource("/departments")
                    .route(web::get().to(department::list_departments))
                    .route(web::post().to(department::create_department)),
            )
            .service(
                web::scope("/employees")
                    .service(
                        web::resource("")
                            .route(web::post().to(employee::create_employee))
                            .route(web::get().to(employee::list_employees)),
                    )
                    .service(
                        web::resource("/{id}")
                            .route(web::put().to(employee::update_employee))
                            .route(web::get().to(employee::get_employee)),
                    ),
            )
            .service(
                web::scope("/kpis")
                    .service(
                        web::resource("")
                            .route(web::post().to(kpi::create_kpi))
                            .route(web::get().to(kpi::list_kpis)),
                    )
                    .service(
                        web::resource("/{id}")
                            .route(web::get().to(kpi::get_kpi))
                            .route(web::put().to(kpi::update_kpi))
                            .route(web::delete().to(kpi::delete_kpi)),
                    ),
            )
            .service(
                web::scope("/kpi-records")
                    .service(
                        web::resource("")
                            .route(web::post().to(kpi_record::create_kpi_record))
                            .route(web::get().to(kpi_record::list_kpi_records)),
                    )
                    .service(
                        web::resource("/{id}")
                            .route(web::get().to(kpi_record::get_kpi_record))
                            .route(web::delete().to(kpi_record::delete_kpi_record)),
                    )
                    .service(
                        web::resource("/{id}/actual")
                            .route(web::put().to(kpi_record::update_actual)),
                    )
                    .service(
                        web::resource("/{id}/status")
                            .route(web::put().to(kpi_record::change_status)),
                    )
                    .service(
                        web::resource("/{id}/validate-transition")
                            .route(web::post().to(kpi_record::validate_status_change)),
                    )
                    .service(
                        web::resource("/{id}/calculate")
                            .route(web::post().to(kpi_record::recalculate)),
                    ),
            )
            .service(
                web::scope("/calculations")
                    .service(web::resource("").route(web::get().to(calculation::list_calculations)))
                    // registered before /{id} so it is not taken for an id
                    .service(
                        web::resource("/deduplicate")
                            .route(web::post().to(calculation::deduplicate_calculations)),
                    )
                    .service(
                        web::resource("/{id}").route(web::get().to(calculation::get_calculation)),
                    )
                    .service(
                        web::resource("/{id}/approve")
                            .route(web::put().to(calculation::approve_calculation)),
                    )
                    .service(
                        web::resource("/{id}/pay")
                            .route(web::put().to(calculation::pay_calculation)),
                    ),
            )
            .service(
                web::scope("/reward-programs")
                    .service(
                        web::resource("")
                            .route(web::get().to(reward_program::list_reward_programs)),
                    )
                    .service(
                        web::resource("/preview")
                            .route(web::get().to(reward_program::preview_calculation)),
                    ),
            )
            .service(
                web::scope("/notifications")
                    .service(
                        web::resource("").route(web::get().to(notification::list_notifications)),
                    )
                    .service(
                        web::resource("/read-all")
                            .route(web::put().to(notification::mark_all_read)),
                    )
                    .service(
                        web::resource("/{id}/read").route(web::put().to(notification::mark_read)),
                    ),
            )
            .service(
                web::resource("/dashboard/summary").route(web::get().to(dashboard::summary)),
            ),
    );
}

// LOGIN
//  ├─ access_token (ACCESS_TOKEN_TTL)
//  └─ refresh_token (REFRESH_TOKEN_TTL, stored by jti)

// API REQUEST
//  └─ Authorization: Bearer access_token

// ACCESS EXPIRED
//  └─ POST /auth/refresh with refresh_token
//       └─ old refresh token revoked, new pair returned

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limiters_accept_configured_rates() {
        let config = crate::config::test_config();
        assert!(Limiters::from_config(&config).is_ok());
        assert!(build_limiter(0).is_some());
        assert!(build_limiter(100_000).is_some());
    }
}
