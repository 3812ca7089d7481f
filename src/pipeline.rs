// src/pipeline.rs
//! Magic page generation: product URL in, persisted sales page out.

use crate::copywriter::{
    CopyWriter, PageConfig, PageContent, build_prompt, fallback_content, parse_content,
};
use crate::error::AppError;
use crate::models::{
    ContentOrigin, GeneratePageRequest, GeneratePageResponse, GenerationReceipt, MagicPage,
    NewMagicPage, PlanTier, Profile, ProductOrigin,
};
use crate::scrape::{ProductSnapshot, ProductSource, extract_product};
use crate::slug::generate_slug;
use chrono::Utc;
use reqwest::Url;
use uuid::Uuid;

pub const PAGE_COST: i32 = 10;
pub const USAGE_ACTION: &str = "magic_page_generation";

#[allow(async_fn_in_trait)]
pub trait PageStore {
    async fn find_profile(&self, user_id: Uuid) -> Result<Option<Profile>, AppError>;

    async fn count_pages(&self, user_id: Uuid) -> Result<i64, AppError>;

    /// Deducts `cost`, inserts the page and one usage-log row as a unit.
    ///
    /// Balance and page count are checked again under the same lock as the
    /// writes: `InsufficientCredits` when the balance no longer covers `cost`,
    /// `PageLimitReached` when `plan` has no room left.
    async fn record_generation(
        &self,
        page: &NewMagicPage,
        cost: i32,
        plan: PlanTier,
    ) -> Result<GenerationReceipt, AppError>;

    async fn list_pages(&self, user_id: Uuid) -> Result<Vec<MagicPage>, AppError>;

    async fn find_published_page(&self, slug: &str) -> Result<Option<MagicPage>, AppError>;

    /// Returns the page slug, or `None` when the caller does not own the page.
    async fn set_published(
        &self,
        user_id: Uuid,
        page_id: Uuid,
        is_published: bool,
    ) -> Result<Option<String>, AppError>;

    async fn delete_page(&self, user_id: Uuid, page_id: Uuid) -> Result<Option<String>, AppError>;
}

pub struct MagicPageGenerator<S, P, W> {
    store: S,
    source: P,
    writer: W,
    public_base_url: String,
}

impl<S, P, W> MagicPageGenerator<S, P, W>
where
    S: PageStore,
    P: ProductSource,
    W: CopyWriter,
{
    pub fn new(store: S, source: P, writer: W, public_base_url: &str) -> Self {
        Self {
            store,
            source,
            writer,
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn preview_url(&self, slug: &str) -> String {
        format!("{}/p/{}", self.public_base_url, slug)
    }

    pub async fn generate(
        &self,
        user_id: Uuid,
        request: GeneratePageRequest,
    ) -> Result<GeneratePageResponse, AppError> {
        let profile = self
            .store
            .find_profile(user_id)
            .await?
            .ok_or(AppError::ProfileNotFound)?;
        // Fails fast before any fetch; `record_generation` repeats both checks atomically.
        self.check_allowance(&profile).await?;

        let product_url = parse_product_url(&request.product_url)?;
        let config = request.config.unwrap_or_default();

        let (product, product_source) = self.load_product(&product_url).await;
        let (content, content_source) = self.write_content(&product, &config).await;

        let slug = generate_slug(&product.title);
        let page = NewMagicPage {
            id: Uuid::new_v4(),
            user_id,
            product_url: product_url.to_string(),
            title: product.title.clone(),
            slug,
            product,
            content,
            template: config.template().to_string(),
            product_source,
            content_source,
            created_at: Utc::now(),
        };

        let receipt = self
            .store
            .record_generation(&page, PAGE_COST, profile.plan_tier())
            .await?;
        tracing::info!(
            "Generated magic page {} for user {} (product: {}, content: {})",
            receipt.page_id,
            user_id,
            page.product_source.as_str(),
            page.content_source.as_str()
        );

        Ok(GeneratePageResponse {
            page_id: receipt.page_id,
            title: page.title,
            preview_url: self.preview_url(&page.slug),
            slug: page.slug,
            content: page.content,
            credits_used: PAGE_COST,
            remaining_credits: receipt.remaining_credits,
        })
    }

    async fn check_allowance(&self, profile: &Profile) -> Result<(), AppError> {
        if profile.credits < PAGE_COST {
            return Err(AppError::InsufficientCredits {
                required: PAGE_COST,
                available: profile.credits,
            });
        }

        let plan = profile.plan_tier();
        if let Some(limit) = plan.page_limit() {
            let existing = self.store.count_pages(profile.id).await?;
            if existing >= limit {
                return Err(AppError::PageLimitReached {
                    plan: plan.to_string(),
                    limit,
                });
            }
        }
        Ok(())
    }

    async fn load_product(&self, url: &Url) -> (ProductSnapshot, ProductOrigin) {
        match self.source.fetch_html(url).await {
            Ok(html) => {
                let scraped = extract_product(&html, url);
                (ProductSnapshot::from_scraped(scraped), ProductOrigin::Scraped)
            }
            Err(e) => {
                tracing::warn!("Product fetch failed for {}, using placeholder: {}", url, e);
                (ProductSnapshot::placeholder(), ProductOrigin::Placeholder)
            }
        }
    }

    async fn write_content(
        &self,
        product: &ProductSnapshot,
        config: &PageConfig,
    ) -> (PageContent, ContentOrigin) {
        let prompt = build_prompt(product, config);
        let result = match self.writer.write_copy(&prompt).await {
            Ok(raw) => parse_content(&raw),
            Err(e) => Err(e),
        };

        match result {
            Ok(content) => (content, ContentOrigin::Ai),
            Err(e) => {
                tracing::warn!("Copy generation failed, using fallback content: {}", e);
                (fallback_content(product, config), ContentOrigin::Fallback)
            }
        }
    }
}

fn parse_product_url(raw: &str) -> Result<Url, AppError> {
    let url = Url::parse(raw.trim())
        .map_err(|_| AppError::BadRequest("productUrl must be a valid URL".to_string()))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        _ => Err(AppError::BadRequest(
            "productUrl must use http or https".to_string(),
        )),
    }
}
