pub mod auth;
pub mod config;
pub mod copywriter;
pub mod crm;
pub mod db;
pub mod error;
pub mod jobs;
pub mod models;
pub mod pages;
pub mod pipeline;
pub mod profile;
pub mod scrape;
pub mod slug;

use moka::future::Cache;

/// Generator wired to Postgres, live product fetches and the completion API.
pub type PageGenerator =
    pipeline::MagicPageGenerator<db::PgStore, scrape::HttpProductSource, copywriter::OpenAiCopyWriter>;

/// Published pages keyed by slug.
pub type PageCache = Cache<String, serde_json::Value>;

pub fn new_page_cache() -> PageCache {
    Cache::builder()
        .max_capacity(1000)
        .time_to_live(std::time::Duration::from_secs(5 * 60))
        .build()
}
