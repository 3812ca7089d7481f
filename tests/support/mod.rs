#![allow(dead_code)]

use chrono::Utc;
use magic_page_service::copywriter::{CopyError, CopyWriter};
use magic_page_service::error::AppError;
use magic_page_service::models::{GenerationReceipt, MagicPage, NewMagicPage, PlanTier, Profile};
use magic_page_service::pipeline::{MagicPageGenerator, PageStore};
use magic_page_service::scrape::{ProductSource, ScrapeError};
use reqwest::Url;
use sqlx::types::Json;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

pub const BASE_URL: &str = "https://pages.test";

#[derive(Default)]
struct StoreState {
    profiles: HashMap<Uuid, Profile>,
    seeded_pages: HashMap<Uuid, i64>,
    pages: Vec<NewMagicPage>,
    published: HashSet<Uuid>,
    usage_logs: Vec<(Uuid, i32)>,
}

impl StoreState {
    fn page_count(&self, user_id: Uuid) -> i64 {
        let seeded = self.seeded_pages.get(&user_id).copied().unwrap_or(0);
        let created = self.pages.iter().filter(|p| p.user_id == user_id).count() as i64;
        seeded + created
    }

    fn row(&self, page: &NewMagicPage) -> MagicPage {
        MagicPage {
            id: page.id,
            user_id: page.user_id,
            product_url: page.product_url.clone(),
            title: page.title.clone(),
            slug: page.slug.clone(),
            product_data: Json(page.product.clone()),
            content: Json(page.content.clone()),
            template: page.template.clone(),
            is_published: self.published.contains(&page.id),
            product_source: page.product_source.as_str().to_string(),
            content_source: page.content_source.as_str().to_string(),
            created_at: page.created_at,
        }
    }
}

/// In-memory stand-in for the Postgres store. Clones share state.
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<StoreState>>,
}

impl MemoryStore {
    pub fn with_profile(&self, plan: &str, credits: i32) -> Uuid {
        let id = Uuid::new_v4();
        let now = Utc::now();
        self.state.lock().unwrap().profiles.insert(
            id,
            Profile {
                id,
                plan: plan.to_string(),
                credits,
                video_credits: 0,
                created_at: now,
                updated_at: now,
            },
        );
        id
    }

    pub fn seed_pages(&self, user_id: Uuid, count: i64) {
        self.state
            .lock()
            .unwrap()
            .seeded_pages
            .insert(user_id, count);
    }

    pub fn credits(&self, user_id: Uuid) -> i32 {
        self.state.lock().unwrap().profiles[&user_id].credits
    }

    pub fn pages(&self) -> Vec<NewMagicPage> {
        self.state.lock().unwrap().pages.clone()
    }

    pub fn usage_logs(&self) -> Vec<(Uuid, i32)> {
        self.state.lock().unwrap().usage_logs.clone()
    }
}

impl PageStore for MemoryStore {
    async fn find_profile(&self, user_id: Uuid) -> Result<Option<Profile>, AppError> {
        Ok(self.state.lock().unwrap().profiles.get(&user_id).cloned())
    }

    async fn count_pages(&self, user_id: Uuid) -> Result<i64, AppError> {
        Ok(self.state.lock().unwrap().page_count(user_id))
    }

    async fn record_generation(
        &self,
        page: &NewMagicPage,
        cost: i32,
        plan: PlanTier,
    ) -> Result<GenerationReceipt, AppError> {
        let mut state = self.state.lock().unwrap();
        let existing = state.page_count(page.user_id);
        let profile = state
            .profiles
            .get_mut(&page.user_id)
            .ok_or(AppError::ProfileNotFound)?;
        if profile.credits < cost {
            return Err(AppError::InsufficientCredits {
                required: cost,
                available: profile.credits,
            });
        }
        if let Some(limit) = plan.page_limit() {
            if existing >= limit {
                return Err(AppError::PageLimitReached {
                    plan: plan.to_string(),
                    limit,
                });
            }
        }
        profile.credits -= cost;
        let remaining_credits = profile.credits;

        state.pages.push(page.clone());
        state.usage_logs.push((page.user_id, cost));

        Ok(GenerationReceipt {
            page_id: page.id,
            remaining_credits,
        })
    }

    async fn list_pages(&self, user_id: Uuid) -> Result<Vec<MagicPage>, AppError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .pages
            .iter()
            .rev()
            .filter(|p| p.user_id == user_id)
            .map(|p| state.row(p))
            .collect())
    }

    async fn find_published_page(&self, slug: &str) -> Result<Option<MagicPage>, AppError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .pages
            .iter()
            .find(|p| p.slug == slug && state.published.contains(&p.id))
            .map(|p| state.row(p)))
    }

    async fn set_published(
        &self,
        user_id: Uuid,
        page_id: Uuid,
        is_published: bool,
    ) -> Result<Option<String>, AppError> {
        let mut state = self.state.lock().unwrap();
        let Some(slug) = state
            .pages
            .iter()
            .find(|p| p.id == page_id && p.user_id == user_id)
            .map(|p| p.slug.clone())
        else {
            return Ok(None);
        };
        if is_published {
            state.published.insert(page_id);
        } else {
            state.published.remove(&page_id);
        }
        Ok(Some(slug))
    }

    async fn delete_page(&self, user_id: Uuid, page_id: Uuid) -> Result<Option<String>, AppError> {
        let mut state = self.state.lock().unwrap();
        let Some(index) = state
            .pages
            .iter()
            .position(|p| p.id == page_id && p.user_id == user_id)
        else {
            return Ok(None);
        };
        let page = state.pages.remove(index);
        state.published.remove(&page_id);
        Ok(Some(page.slug))
    }
}

/// Serves fixed HTML, or fails every fetch when `html` is `None`.
pub struct StaticSource {
    html: Option<String>,
    pub calls: Arc<AtomicUsize>,
}

impl StaticSource {
    pub fn html(html: &str) -> Self {
        Self {
            html: Some(html.to_string()),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn failing() -> Self {
        Self {
            html: None,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl ProductSource for StaticSource {
    async fn fetch_html(&self, _url: &Url) -> Result<String, ScrapeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        // Suspends like a real fetch, so concurrent generations interleave here.
        tokio::task::yield_now().await;
        self.html.clone().ok_or(ScrapeError::Status(503))
    }
}

/// Replies with fixed model output, or fails every call when `reply` is `None`.
pub struct StaticWriter {
    reply: Option<String>,
    pub prompts: Arc<Mutex<Vec<String>>>,
}

impl StaticWriter {
    pub fn reply(reply: &str) -> Self {
        Self {
            reply: Some(reply.to_string()),
            prompts: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn failing() -> Self {
        Self {
            reply: None,
            prompts: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl CopyWriter for StaticWriter {
    async fn write_copy(&self, prompt: &str) -> Result<String, CopyError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.reply.clone().ok_or(CopyError::EmptyResponse)
    }
}

pub type TestGenerator = MagicPageGenerator<MemoryStore, StaticSource, StaticWriter>;

pub fn generator(source: StaticSource, writer: StaticWriter) -> TestGenerator {
    MagicPageGenerator::new(MemoryStore::default(), source, writer, BASE_URL)
}

pub const PRODUCT_HTML: &str = r#"
<html>
  <head>
    <title>Desk Lamp | Lights Inc</title>
    <meta property="og:title" content="Aurora Desk Lamp">
    <meta property="og:description" content="A warm, dimmable desk lamp.">
    <meta property="product:price:amount" content="49.00">
    <meta property="product:price:currency" content="USD">
    <meta property="og:image" content="https://cdn.lights.test/aurora.jpg">
  </head>
  <body><img src="/static/aurora-side.jpg"></body>
</html>
"#;

pub const AI_REPLY: &str = r#"{
  "headline": "Light Up Your Nights",
  "subheadline": "The Aurora lamp adapts to you.",
  "benefits": ["Easy on the eyes", "Saves energy"],
  "faq": [{"question": "Is it dimmable?", "answer": "Yes."}],
  "cta": {"primary": "Get yours"},
  "seo": {"title": "Aurora Desk Lamp", "description": "Dimmable lamp", "keywords": ["lamp"]}
}"#;
