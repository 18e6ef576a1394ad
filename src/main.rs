use actix_web::middleware::NormalizePath;
use actix_web::web::Data;
use actix_web::{App, HttpServer, Responder, get};
use anyhow::Context;
use dotenvy::dotenv;
use std::time::Duration;

mod api;
mod auth;
mod config;
mod db;
mod docs;
mod model;
mod models;
mod routes;
mod utils;
mod workflow;

use config::Config;
use db::init_db;

use crate::docs::ApiDoc;
use crate::routes::Limiters;
use crate::utils::kpi_cache::KpiCache;
use crate::workflow::policy::RewardPrograms;
use tracing::info;
use tracing_appender::rolling;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[get("/")]
async fn index() -> impl Responder {
    "KPI Dashboard API"
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let config = Config::from_env().context("Invalid configuration")?;

    // Rolling daily log
    let file_appender = rolling::daily(&config.log_dir, "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_max_level(config.log_level)
        .with_ansi(false)
        .with_target(false)
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .pretty()
        .init();

    info!("Server starting...");

    let programs = RewardPrograms::load(config.reward_programs_path.as_deref())
        .context("Invalid reward programs")?;
    info!(
        programs = programs.all().len(),
        default = %programs.default_program().id,
        "Reward programs loaded"
    );

    let pool = init_db(&config.database_url, config.run_migrations).await?;

    let cache = KpiCache::new(
        config.kpi_cache_capacity,
        Duration::from_secs(config.kpi_cache_ttl_secs),
    );
    let limiters = Data::new(Limiters::from_config(&config)?);

    let server_addr = config.server_addr.clone();
    let pool = Data::new(pool);
    let config = Data::new(config);
    let cache = Data::new(cache);
    let programs = Data::new(programs);

    HttpServer::new(move || {
        let config = config.clone();
        let limiters = limiters.clone();
        App::new()
            .wrap(actix_web::middleware::Logger::default())
            .wrap(NormalizePath::trim())
            .service(
                // wildcard {_:.*} so the UI's JS/CSS assets match too
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-doc/openapi.json", ApiDoc::openapi()),
            )
            .app_data(pool.clone())
            .app_data(config.clone())
            .app_data(cache.clone())
            .app_data(programs.clone())
            .service(index)
            .configure(move |cfg| routes::configure(cfg, &config, &limiters))
    })
    .bind(&server_addr)
    .with_context(|| format!("Failed to bind {}", server_addr))?
    .run()
    .await
    .context("Server error")
}
