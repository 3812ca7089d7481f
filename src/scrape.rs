// src/scrape.rs
//! Product extraction from a product page.
//!
//! Fetching and parsing are split: [`ProductSource`] only returns raw HTML,
//! and [`extract_product`] turns it into a [`ScrapedProduct`] whose fields are
//! `None` when the page does not carry them.

use reqwest::Url;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE};
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

pub const MAX_IMAGES: usize = 5;

const PLACEHOLDER_TITLE: &str = "Amazing Product";
const PLACEHOLDER_DESCRIPTION: &str =
    "Discover this amazing product that will transform your daily routine.";
const PLACEHOLDER_PRICE: &str = "$99";

#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("upstream returned status {0}")]
    Status(u16),
}

#[allow(async_fn_in_trait)]
pub trait ProductSource {
    async fn fetch_html(&self, url: &Url) -> Result<String, ScrapeError>;
}

/// Fetches product pages over HTTP with a browser-like User-Agent.
#[derive(Clone)]
pub struct HttpProductSource {
    client: reqwest::Client,
}

impl HttpProductSource {
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()?;
        Ok(Self { client })
    }
}

impl ProductSource for HttpProductSource {
    async fn fetch_html(&self, url: &Url) -> Result<String, ScrapeError> {
        tracing::debug!("Fetching product page: {}", url);
        let resp = self
            .client
            .get(url.clone())
            .header(ACCEPT, "text/html,application/xhtml+xml;q=0.9,*/*;q=0.8")
            .header(ACCEPT_LANGUAGE, "en-US,en;q=0.9")
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(ScrapeError::Status(status.as_u16()));
        }

        Ok(resp.text().await?)
    }
}

/// Raw extraction result; `None` means the page had no such field.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct ScrapedProduct {
    pub title: Option<String>,
    pub description: Option<String>,
    pub price: Option<String>,
    pub images: Vec<String>,
}

/// Product fields as stored on a page and fed to the copywriter.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ProductSnapshot {
    pub title: String,
    pub description: String,
    pub price: String,
    pub images: Vec<String>,
}

impl ProductSnapshot {
    pub fn placeholder() -> Self {
        Self {
            title: PLACEHOLDER_TITLE.to_string(),
            description: PLACEHOLDER_DESCRIPTION.to_string(),
            price: PLACEHOLDER_PRICE.to_string(),
            images: Vec::new(),
        }
    }

    pub fn from_scraped(scraped: ScrapedProduct) -> Self {
        let placeholder = Self::placeholder();
        Self {
            title: scraped.title.unwrap_or(placeholder.title),
            description: scraped.description.unwrap_or(placeholder.description),
            price: scraped.price.unwrap_or(placeholder.price),
            images: scraped.images,
        }
    }
}

pub fn extract_product(html: &str, base_url: &Url) -> ScrapedProduct {
    let document = Html::parse_document(html);

    let title = meta_content(&document, r#"meta[property="og:title"]"#)
        .or_else(|| first_text(&document, "title"));

    let description = meta_content(&document, r#"meta[property="og:description"]"#)
        .or_else(|| meta_content(&document, r#"meta[name="description"]"#));

    ScrapedProduct {
        title,
        description,
        price: extract_price(&document),
        images: extract_images(&document, base_url),
    }
}

fn extract_price(document: &Html) -> Option<String> {
    let amount = meta_content(document, r#"meta[property="product:price:amount"]"#)
        .or_else(|| meta_content(document, r#"meta[property="og:price:amount"]"#));
    if let Some(amount) = amount {
        let currency = meta_content(document, r#"meta[property="product:price:currency"]"#)
            .or_else(|| meta_content(document, r#"meta[property="og:price:currency"]"#));
        if let Some(price) = format_price(&amount, currency.as_deref()) {
            return Some(price);
        }
    }

    let amount = first_attr(document, r#"[itemprop="price"]"#, "content")
        .or_else(|| first_text(document, r#"[itemprop="price"]"#))?;
    let currency = first_attr(document, r#"[itemprop="priceCurrency"]"#, "content");
    format_price(&amount, currency.as_deref())
}

fn format_price(amount: &str, currency: Option<&str>) -> Option<String> {
    let amount = amount.trim();
    if !amount.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }
    // ".99" and ",99" lose their leading zero in some storefront markup.
    let amount = match amount.strip_prefix(['.', ',']) {
        Some(fraction) => format!("0.{fraction}"),
        None => amount.to_string(),
    };
    // Already carries a symbol, e.g. "$19.99" or "€15".
    if !amount.starts_with(|c: char| c.is_ascii_digit()) {
        return Some(amount);
    }
    Some(match currency.map(|c| c.trim().to_ascii_uppercase()) {
        None => format!("${amount}"),
        Some(c) if c.is_empty() || c == "USD" => format!("${amount}"),
        Some(c) => format!("{amount} {c}"),
    })
}

fn extract_images(document: &Html, base_url: &Url) -> Vec<String> {
    let og_images = all_attrs(document, r#"meta[property="og:image"]"#, "content");
    let img_tags = all_attrs(document, "img[src]", "src");

    let mut images: Vec<String> = Vec::new();
    for candidate in og_images.into_iter().chain(img_tags) {
        if images.len() >= MAX_IMAGES {
            break;
        }
        let candidate = candidate.trim();
        if candidate.is_empty() || candidate.starts_with("data:") {
            continue;
        }
        let Ok(resolved) = base_url.join(candidate) else {
            continue;
        };
        if !matches!(resolved.scheme(), "http" | "https") {
            continue;
        }
        let resolved = resolved.to_string();
        if !images.contains(&resolved) {
            images.push(resolved);
        }
    }
    images
}

fn meta_content(document: &Html, css: &str) -> Option<String> {
    first_attr(document, css, "content")
}

fn first_attr(document: &Html, css: &str, attr: &str) -> Option<String> {
    all_attrs(document, css, attr).into_iter().next()
}

fn all_attrs(document: &Html, css: &str, attr: &str) -> Vec<String> {
    let Ok(selector) = Selector::parse(css) else {
        return Vec::new();
    };
    document
        .select(&selector)
        .filter_map(|el| el.value().attr(attr))
        .map(collapse_whitespace)
        .filter(|value| !value.is_empty())
        .collect()
}

fn first_text(document: &Html, css: &str) -> Option<String> {
    let selector = Selector::parse(css).ok()?;
    document
        .select(&selector)
        .map(|el| collapse_whitespace(&el.text().collect::<String>()))
        .find(|text| !text.is_empty())
}

fn collapse_whitespace(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}
