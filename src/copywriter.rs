// src/copywriter.rs
//! Sales copy generation through a chat-completion API.

use crate::scrape::ProductSnapshot;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_TEMPLATE: &str = "modern";
const DEFAULT_AUDIENCE: &str = "general consumers";
const DEFAULT_TONE: &str = "persuasive";
const DEFAULT_LANGUAGE: &str = "English";

#[derive(Debug, Error)]
pub enum CopyError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("completion api error status={status} body={body}")]
    Api { status: u16, body: String },

    #[error("completion returned no content")]
    EmptyResponse,

    #[error("invalid page content: {0}")]
    InvalidContent(#[from] serde_json::Error),
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct PageConfig {
    pub template: Option<String>,
    #[serde(alias = "targetAudience")]
    pub target_audience: Option<String>,
    pub tone: Option<String>,
    pub language: Option<String>,
}

impl PageConfig {
    pub fn template(&self) -> &str {
        self.template.as_deref().unwrap_or(DEFAULT_TEMPLATE)
    }

    pub fn target_audience(&self) -> &str {
        self.target_audience.as_deref().unwrap_or(DEFAULT_AUDIENCE)
    }

    pub fn tone(&self) -> &str {
        self.tone.as_deref().unwrap_or(DEFAULT_TONE)
    }

    pub fn language(&self) -> &str {
        self.language.as_deref().unwrap_or(DEFAULT_LANGUAGE)
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct PageContent {
    pub headline: String,
    #[serde(default)]
    pub subheadline: String,
    #[serde(default)]
    pub benefits: Vec<String>,
    #[serde(default)]
    pub features: Vec<Feature>,
    #[serde(default)]
    pub social_proof: SocialProof,
    #[serde(default)]
    pub pricing: Pricing,
    #[serde(default)]
    pub faq: Vec<FaqEntry>,
    #[serde(default)]
    pub cta: CallToAction,
    #[serde(default)]
    pub seo: Seo,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct Feature {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct SocialProof {
    #[serde(default)]
    pub testimonials: Vec<Testimonial>,
    #[serde(default)]
    pub stats: Vec<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct Testimonial {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub text: String,
    #[serde(default = "default_rating", deserialize_with = "lenient::rating")]
    pub rating: u8,
}

fn default_rating() -> u8 {
    5
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct Pricing {
    #[serde(default, deserialize_with = "lenient::text")]
    pub price: String,
    #[serde(default, deserialize_with = "lenient::optional_text")]
    pub original_price: Option<String>,
    #[serde(default, deserialize_with = "lenient::optional_text")]
    pub guarantee: Option<String>,
}

/// Scalar fields models often emit with the wrong JSON type.
mod lenient {
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    pub fn rating<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u8, D::Error> {
        let value = Value::deserialize(deserializer)?;
        let number = match &value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        };
        Ok(number
            .filter(|n| n.is_finite())
            .map(|n| n.round().clamp(1.0, 5.0) as u8)
            .unwrap_or(super::default_rating()))
    }

    pub fn text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
        Ok(optional_text(deserializer)?.unwrap_or_default())
    }

    pub fn optional_text<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<String>, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(match value {
            Value::String(s) => Some(s),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            Value::Null | Value::Array(_) | Value::Object(_) => None,
        })
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct FaqEntry {
    #[serde(default)]
    pub question: String,
    #[serde(default)]
    pub answer: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct CallToAction {
    #[serde(default)]
    pub primary: String,
    #[serde(default)]
    pub secondary: Option<String>,
    #[serde(default)]
    pub urgency: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct Seo {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub keywords: Vec<String>,
}

#[allow(async_fn_in_trait)]
pub trait CopyWriter {
    /// Returns the raw model output for `prompt`.
    async fn write_copy(&self, prompt: &str) -> Result<String, CopyError>;
}

#[derive(Clone)]
pub struct OpenAiCopyWriter {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    model: String,
}

impl OpenAiCopyWriter {
    pub fn new(
        api_url: &str,
        api_key: &str,
        model: &str,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            api_url: api_url.to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
        })
    }
}

#[derive(Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

#[derive(Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Deserialize)]
struct CompletionMessage {
    content: Option<String>,
}

impl CopyWriter for OpenAiCopyWriter {
    async fn write_copy(&self, prompt: &str) -> Result<String, CopyError> {
        let body = json!({
            "model": self.model,
            "messages": [
                {
                    "role": "system",
                    "content": "You are an expert direct-response copywriter. Reply with a single JSON object and nothing else."
                },
                { "role": "user", "content": prompt }
            ],
            "temperature": 0.7,
            "response_format": { "type": "json_object" }
        });

        let resp = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(CopyError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let completion: CompletionResponse = resp.json().await?;
        completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or(CopyError::EmptyResponse)
    }
}

pub fn build_prompt(product: &ProductSnapshot, config: &PageConfig) -> String {
    let images = if product.images.is_empty() {
        "none".to_string()
    } else {
        product.images.join(", ")
    };

    format!(
        "Write a high-converting sales page for the product below.\n\
         \n\
         Product title: {title}\n\
         Product description: {description}\n\
         Price: {price}\n\
         Images: {images}\n\
         \n\
         Template style: {template}\n\
         Target audience: {audience}\n\
         Tone: {tone}\n\
         Language: {language}\n\
         \n\
         Return a JSON object with exactly these keys:\n\
         headline (string), subheadline (string), benefits (array of strings),\n\
         features (array of {{title, description}}),\n\
         social_proof ({{testimonials: array of {{name, text, rating}}, stats: array of strings}}),\n\
         pricing ({{price, original_price, guarantee}}),\n\
         faq (array of {{question, answer}}),\n\
         cta ({{primary, secondary, urgency}}),\n\
         seo ({{title, description, keywords: array of strings}}).",
        title = product.title,
        description = product.description,
        price = product.price,
        images = images,
        template = config.template(),
        audience = config.target_audience(),
        tone = config.tone(),
        language = config.language(),
    )
}

pub fn parse_content(raw: &str) -> Result<PageContent, CopyError> {
    let content: PageContent = serde_json::from_str(strip_code_fence(raw))?;
    if content.headline.trim().is_empty() {
        return Err(CopyError::EmptyResponse);
    }
    Ok(content)
}

fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

/// Deterministic copy derived only from the product fields and config.
pub fn fallback_content(product: &ProductSnapshot, config: &PageConfig) -> PageContent {
    let title = &product.title;
    let audience = config.target_audience();

    PageContent {
        headline: format!("Discover {title}"),
        subheadline: product.description.clone(),
        benefits: vec![
            format!("Made for {audience}"),
            "Premium quality you can feel".to_string(),
            "Fast and reliable shipping".to_string(),
            "Risk-free purchase".to_string(),
        ],
        features: vec![
            Feature {
                title: "Quality".to_string(),
                description: format!("{title} is built to last."),
            },
            Feature {
                title: "Value".to_string(),
                description: format!("Everything you need for just {}.", product.price),
            },
            Feature {
                title: "Support".to_string(),
                description: "Friendly help whenever you need it.".to_string(),
            },
        ],
        social_proof: SocialProof {
            testimonials: vec![Testimonial {
                name: "Verified customer".to_string(),
                text: format!("{title} exceeded my expectations."),
                rating: 5,
            }],
            stats: Vec::new(),
        },
        pricing: Pricing {
            price: product.price.clone(),
            original_price: None,
            guarantee: Some("30-day money-back guarantee".to_string()),
        },
        faq: vec![
            FaqEntry {
                question: format!("What is {title}?"),
                answer: product.description.clone(),
            },
            FaqEntry {
                question: "How much does it cost?".to_string(),
                answer: format!("{title} costs {}.", product.price),
            },
            FaqEntry {
                question: "Is there a guarantee?".to_string(),
                answer: "Yes, every order is covered by a 30-day money-back guarantee."
                    .to_string(),
            },
        ],
        cta: CallToAction {
            primary: "Buy now".to_string(),
            secondary: Some("Learn more".to_string()),
            urgency: None,
        },
        seo: Seo {
            title: format!("{title} | Official Store"),
            description: product.description.chars().take(160).collect(),
            keywords: title
                .split_whitespace()
                .map(|word| word.to_lowercase())
                .collect(),
        },
    }
}
