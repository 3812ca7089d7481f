// src/models.rs
use crate::copywriter::{PageConfig, PageContent};
use crate::error::AppError;
use crate::scrape::ProductSnapshot;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use sqlx::types::Json;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

#[derive(Serialize, Deserialize, Clone, Debug, FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PlanTier {
    Free,
    Pro,
    Premium,
}

impl PlanTier {
    /// Maximum number of magic pages; `None` means unlimited.
    pub fn page_limit(self) -> Option<i64> {
        match self {
            PlanTier::Free => Some(2),
            PlanTier::Pro => Some(20),
            PlanTier::Premium => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PlanTier::Free => "free",
            PlanTier::Pro => "pro",
            PlanTier::Premium => "premium",
        }
    }
}

// Unknown plans fall back to the most restrictive tier.
impl From<&str> for PlanTier {
    fn from(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "pro" => PlanTier::Pro,
            "premium" => PlanTier::Premium,
            _ => PlanTier::Free,
        }
    }
}

impl fmt::Display for PlanTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, FromRow)]
pub struct Profile {
    pub id: Uuid,
    pub plan: String,
    pub credits: i32,
    pub video_credits: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Profile {
    pub fn plan_tier(&self) -> PlanTier {
        PlanTier::from(self.plan.as_str())
    }
}

/// Where the product snapshot of a page came from.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ProductOrigin {
    Scraped,
    Placeholder,
}

impl ProductOrigin {
    pub fn as_str(self) -> &'static str {
        match self {
            ProductOrigin::Scraped => "scraped",
            ProductOrigin::Placeholder => "placeholder",
        }
    }
}

/// Where the sales copy of a page came from.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ContentOrigin {
    Ai,
    Fallback,
}

impl ContentOrigin {
    pub fn as_str(self) -> &'static str {
        match self {
            ContentOrigin::Ai => "ai",
            ContentOrigin::Fallback => "fallback",
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, FromRow)]
pub struct MagicPage {
    pub id: Uuid,
    pub user_id: Uuid,
    pub product_url: String,
    pub title: String,
    pub slug: String,
    pub product_data: Json<ProductSnapshot>,
    pub content: Json<PageContent>,
    pub template: String,
    pub is_published: bool,
    pub product_source: String,
    pub content_source: String,
    pub created_at: DateTime<Utc>,
}

/// A page assembled by the pipeline, not yet persisted.
#[derive(Clone, Debug)]
pub struct NewMagicPage {
    pub id: Uuid,
    pub user_id: Uuid,
    pub product_url: String,
    pub title: String,
    pub slug: String,
    pub product: ProductSnapshot,
    pub content: PageContent,
    pub template: String,
    pub product_source: ProductOrigin,
    pub content_source: ContentOrigin,
    pub created_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct GenerationReceipt {
    pub page_id: Uuid,
    pub remaining_credits: i32,
}

#[derive(Serialize, Deserialize, Clone, Debug, FromRow)]
pub struct UsageLog {
    pub id: Uuid,
    pub user_id: Uuid,
    pub action: String,
    pub credits_used: i32,
    pub metadata: Json<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Claims {
    pub sub: String, // user_id
    pub exp: usize,
}

#[derive(Serialize, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Serialize, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct GeneratePageRequest {
    pub product_url: String,
    #[serde(default)]
    pub config: Option<PageConfig>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct GeneratePageResponse {
    pub page_id: Uuid,
    pub title: String,
    pub slug: String,
    pub preview_url: String,
    pub content: PageContent,
    pub credits_used: i32,
    pub remaining_credits: i32,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LeadStatus {
    New,
    Contacted,
    Qualified,
    Converted,
    Cold,
}

impl LeadStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            LeadStatus::New => "new",
            LeadStatus::Contacted => "contacted",
            LeadStatus::Qualified => "qualified",
            LeadStatus::Converted => "converted",
            LeadStatus::Cold => "cold",
        }
    }
}

impl FromStr for LeadStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "new" => Ok(LeadStatus::New),
            "contacted" => Ok(LeadStatus::Contacted),
            "qualified" => Ok(LeadStatus::Qualified),
            "converted" => Ok(LeadStatus::Converted),
            "cold" => Ok(LeadStatus::Cold),
            other => Err(AppError::InvalidStatus(other.to_string())),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AppointmentStatus {
    Pending,
    Confirmed,
    Cancelled,
    Completed,
}

impl AppointmentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            AppointmentStatus::Pending => "pending",
            AppointmentStatus::Confirmed => "confirmed",
            AppointmentStatus::Cancelled => "cancelled",
            AppointmentStatus::Completed => "completed",
        }
    }
}

impl FromStr for AppointmentStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(AppointmentStatus::Pending),
            "confirmed" => Ok(AppointmentStatus::Confirmed),
            "cancelled" => Ok(AppointmentStatus::Cancelled),
            "completed" => Ok(AppointmentStatus::Completed),
            other => Err(AppError::InvalidStatus(other.to_string())),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, FromRow)]
pub struct Lead {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub source: Option<String>,
    pub status: String,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct CreateLeadRequest {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub source: Option<String>,
    pub notes: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, FromRow)]
pub struct Appointment {
    pub id: Uuid,
    pub user_id: Uuid,
    pub lead_id: Option<Uuid>,
    pub customer_name: String,
    pub customer_phone: Option<String>,
    pub scheduled_at: DateTime<Utc>,
    pub status: String,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct CreateAppointmentRequest {
    pub lead_id: Option<Uuid>,
    pub customer_name: String,
    pub customer_phone: Option<String>,
    pub scheduled_at: DateTime<Utc>,
    pub notes: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct StatusUpdateRequest {
    pub status: String,
}
