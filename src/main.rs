// src/main.rs
use actix_web::{App, HttpServer, middleware::Logger, web};
use magic_page_service::copywriter::OpenAiCopyWriter;
use magic_page_service::db::PgStore;
use magic_page_service::jobs::JobRegistry;
use magic_page_service::pipeline::MagicPageGenerator;
use magic_page_service::scrape::HttpProductSource;
use magic_page_service::{PageGenerator, auth, config, crm, error, new_page_cache, pages, profile};
use sqlx::PgPool;
use std::time::Duration;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::from_default_env())
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");

    tracing::info!("Starting magic page service");

    dotenv::dotenv().ok();
    let config = config::Config::from_env().expect("Failed to load config from environment");

    let pool = PgPool::connect(&config.database_url)
        .await
        .expect("Failed to connect to Postgres");

    sqlx::migrate!()
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    let timeout = Duration::from_secs(config.http_timeout_secs);
    let source = HttpProductSource::new(&config.scrape_user_agent, timeout)
        .expect("Failed to build product fetch client");
    let writer = OpenAiCopyWriter::new(
        &config.openai_api_url,
        &config.openai_api_key,
        &config.openai_model,
        timeout,
    )
    .expect("Failed to build completion client");

    let store = PgStore::new(pool.clone());
    let generator: web::Data<PageGenerator> = web::Data::new(MagicPageGenerator::new(
        store.clone(),
        source,
        writer,
        &config.public_base_url,
    ));
    let store = web::Data::new(store);
    let jobs = web::Data::new(JobRegistry::new());
    let cache = web::Data::new(new_page_cache());
    let bind = (config.host.clone(), config.port);

    tracing::info!("Listening on {}:{}", bind.0, bind.1);

    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(pool.clone()))
            .app_data(web::Data::new(config.clone()))
            .app_data(store.clone())
            .app_data(generator.clone())
            .app_data(jobs.clone())
            .app_data(cache.clone())
            .wrap(Logger::default())
            .configure(error::init_extractor_config)
            .configure(auth::init_routes)
            .configure(pages::init_routes::<PgStore, HttpProductSource, OpenAiCopyWriter>)
            .configure(profile::init_routes)
            .configure(crm::init_routes)
    })
    .bind(bind)?
    .run()
    .await
}
