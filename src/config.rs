// src/config.rs
use serde::Deserialize;

#[derive(Clone, Debug, Deserialize)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub openai_api_key: String,
    #[serde(default = "default_openai_api_url")]
    pub openai_api_url: String,
    #[serde(default = "default_openai_model")]
    pub openai_model: String,
    #[serde(default = "default_public_base_url")]
    pub public_base_url: String,
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_scrape_user_agent")]
    pub scrape_user_agent: String,
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,
    #[serde(default = "default_signup_credits")]
    pub signup_credits: i32,
    #[serde(default = "default_token_ttl_hours")]
    pub token_ttl_hours: i64,
}

impl Config {
    pub fn from_env() -> Result<Self, envy::Error> {
        envy::from_env()
    }

    /// Minimal config for tests and tooling that never touch the database.
    pub fn with_secret(jwt_secret: &str) -> Self {
        Self {
            database_url: String::new(),
            jwt_secret: jwt_secret.to_string(),
            openai_api_key: String::new(),
            openai_api_url: default_openai_api_url(),
            openai_model: default_openai_model(),
            public_base_url: default_public_base_url(),
            host: default_host(),
            port: default_port(),
            scrape_user_agent: default_scrape_user_agent(),
            http_timeout_secs: default_http_timeout_secs(),
            signup_credits: default_signup_credits(),
            token_ttl_hours: default_token_ttl_hours(),
        }
    }
}

fn default_openai_api_url() -> String {
    "https://api.openai.com/v1/chat/completions".to_string()
}

fn default_openai_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_public_base_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_scrape_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".to_string()
}

fn default_http_timeout_secs() -> u64 {
    20
}

fn default_signup_credits() -> i32 {
    50
}

fn default_token_ttl_hours() -> i64 {
    24
}
