// src/db.rs
use crate::error::AppError;
use crate::models::{
    Appointment, AppointmentStatus, GenerationReceipt, Lead, LeadStatus, MagicPage, NewMagicPage,
    PlanTier, Profile, UsageLog, User,
};
use crate::pipeline::{PageStore, USAGE_ACTION};
use chrono::{DateTime, Utc};
use serde_json::json;
use sqlx::PgPool;
use sqlx::types::Json;
use uuid::Uuid;

const PAGE_COLUMNS: &str = "id, user_id, product_url, title, slug, product_data, content, template, is_published, product_source, content_source, created_at";
const LEAD_COLUMNS: &str =
    "id, user_id, name, email, phone, source, status, notes, created_at, updated_at";
const APPOINTMENT_COLUMNS: &str = "id, user_id, lead_id, customer_name, customer_phone, scheduled_at, status, notes, created_at, updated_at";

pub async fn get_user_by_username(
    pool: &PgPool,
    username: &str,
) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(
        "SELECT id, username, email, password_hash, created_at FROM users WHERE username = $1",
    )
    .bind(username)
    .fetch_optional(pool)
    .await
}

/// Inserts the user and a free-plan profile in one transaction.
pub async fn create_user_with_profile(
    pool: &PgPool,
    user: &User,
    signup_credits: i32,
) -> Result<(), AppError> {
    let mut tx = pool.begin().await?;

    sqlx::query("INSERT INTO users (id, username, email, password_hash, created_at) VALUES ($1, $2, $3, $4, $5)")
        .bind(user.id)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.created_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| unique_to_conflict(e, "Username already exists"))?;

    sqlx::query("INSERT INTO profiles (id, plan, credits, video_credits, created_at, updated_at) VALUES ($1, 'free', $2, 0, $3, $3)")
        .bind(user.id)
        .bind(signup_credits)
        .bind(user.created_at)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(())
}

pub async fn get_profile(pool: &PgPool, user_id: Uuid) -> Result<Option<Profile>, sqlx::Error> {
    sqlx::query_as::<_, Profile>(
        "SELECT id, plan, credits, video_credits, created_at, updated_at FROM profiles WHERE id = $1",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await
}

pub async fn count_pages(pool: &PgPool, user_id: Uuid) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM magic_pages WHERE user_id = $1")
        .bind(user_id)
        .fetch_one(pool)
        .await
}

pub async fn list_pages(pool: &PgPool, user_id: Uuid) -> Result<Vec<MagicPage>, sqlx::Error> {
    sqlx::query_as::<_, MagicPage>(&format!(
        "SELECT {PAGE_COLUMNS} FROM magic_pages WHERE user_id = $1 ORDER BY created_at DESC"
    ))
    .bind(user_id)
    .fetch_all(pool)
    .await
}

pub async fn get_published_page(
    pool: &PgPool,
    slug: &str,
) -> Result<Option<MagicPage>, sqlx::Error> {
    sqlx::query_as::<_, MagicPage>(&format!(
        "SELECT {PAGE_COLUMNS} FROM magic_pages WHERE slug = $1 AND is_published = true"
    ))
    .bind(slug)
    .fetch_optional(pool)
    .await
}

/// Returns the page slug when the caller owns the page.
pub async fn set_page_published(
    pool: &PgPool,
    user_id: Uuid,
    page_id: Uuid,
    is_published: bool,
) -> Result<Option<String>, sqlx::Error> {
    sqlx::query_scalar(
        "UPDATE magic_pages SET is_published = $1 WHERE id = $2 AND user_id = $3 RETURNING slug",
    )
    .bind(is_published)
    .bind(page_id)
    .bind(user_id)
    .fetch_optional(pool)
    .await
}

pub async fn delete_page(
    pool: &PgPool,
    user_id: Uuid,
    page_id: Uuid,
) -> Result<Option<String>, sqlx::Error> {
    sqlx::query_scalar("DELETE FROM magic_pages WHERE id = $1 AND user_id = $2 RETURNING slug")
        .bind(page_id)
        .bind(user_id)
        .fetch_optional(pool)
        .await
}

pub async fn list_usage(
    pool: &PgPool,
    user_id: Uuid,
    limit: i64,
) -> Result<Vec<UsageLog>, sqlx::Error> {
    sqlx::query_as::<_, UsageLog>(
        "SELECT id, user_id, action, credits_used, metadata, created_at FROM usage_logs WHERE user_id = $1 ORDER BY created_at DESC LIMIT $2",
    )
    .bind(user_id)
    .bind(limit)
    .fetch_all(pool)
    .await
}

pub async fn create_lead(pool: &PgPool, lead: &Lead) -> Result<(), sqlx::Error> {
    sqlx::query(&format!(
        "INSERT INTO leads ({LEAD_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)"
    ))
    .bind(lead.id)
    .bind(lead.user_id)
    .bind(&lead.name)
    .bind(&lead.email)
    .bind(&lead.phone)
    .bind(&lead.source)
    .bind(&lead.status)
    .bind(&lead.notes)
    .bind(lead.created_at)
    .bind(lead.updated_at)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn get_lead(
    pool: &PgPool,
    user_id: Uuid,
    lead_id: Uuid,
) -> Result<Option<Lead>, sqlx::Error> {
    sqlx::query_as::<_, Lead>(&format!(
        "SELECT {LEAD_COLUMNS} FROM leads WHERE id = $1 AND user_id = $2"
    ))
    .bind(lead_id)
    .bind(user_id)
    .fetch_optional(pool)
    .await
}

pub async fn list_leads(
    pool: &PgPool,
    user_id: Uuid,
    status: Option<LeadStatus>,
) -> Result<Vec<Lead>, sqlx::Error> {
    sqlx::query_as::<_, Lead>(&format!(
        "SELECT {LEAD_COLUMNS} FROM leads WHERE user_id = $1 AND ($2::text IS NULL OR status = $2) ORDER BY created_at DESC"
    ))
    .bind(user_id)
    .bind(status.map(LeadStatus::as_str))
    .fetch_all(pool)
    .await
}

pub async fn update_lead_status(
    pool: &PgPool,
    user_id: Uuid,
    lead_id: Uuid,
    status: LeadStatus,
) -> Result<Option<Lead>, sqlx::Error> {
    sqlx::query_as::<_, Lead>(&format!(
        "UPDATE leads SET status = $1, updated_at = NOW() WHERE id = $2 AND user_id = $3 RETURNING {LEAD_COLUMNS}"
    ))
    .bind(status.as_str())
    .bind(lead_id)
    .bind(user_id)
    .fetch_optional(pool)
    .await
}

pub async fn create_appointment(pool: &PgPool, appt: &Appointment) -> Result<(), sqlx::Error> {
    sqlx::query(&format!(
        "INSERT INTO appointments ({APPOINTMENT_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)"
    ))
    .bind(appt.id)
    .bind(appt.user_id)
    .bind(appt.lead_id)
    .bind(&appt.customer_name)
    .bind(&appt.customer_phone)
    .bind(appt.scheduled_at)
    .bind(&appt.status)
    .bind(&appt.notes)
    .bind(appt.created_at)
    .bind(appt.updated_at)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn list_appointments(
    pool: &PgPool,
    user_id: Uuid,
    from: Option<DateTime<Utc>>,
) -> Result<Vec<Appointment>, sqlx::Error> {
    sqlx::query_as::<_, Appointment>(&format!(
        "SELECT {APPOINTMENT_COLUMNS} FROM appointments WHERE user_id = $1 AND ($2::timestamptz IS NULL OR scheduled_at >= $2) ORDER BY scheduled_at ASC"
    ))
    .bind(user_id)
    .bind(from)
    .fetch_all(pool)
    .await
}

pub async fn update_appointment_status(
    pool: &PgPool,
    user_id: Uuid,
    appointment_id: Uuid,
    status: AppointmentStatus,
) -> Result<Option<Appointment>, sqlx::Error> {
    sqlx::query_as::<_, Appointment>(&format!(
        "UPDATE appointments SET status = $1, updated_at = NOW() WHERE id = $2 AND user_id = $3 RETURNING {APPOINTMENT_COLUMNS}"
    ))
    .bind(status.as_str())
    .bind(appointment_id)
    .bind(user_id)
    .fetch_optional(pool)
    .await
}

fn unique_to_conflict(err: sqlx::Error, message: &str) -> AppError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            return AppError::Conflict(message.to_string());
        }
    }
    AppError::Database(err)
}

/// Postgres-backed store for the generation pipeline.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl PageStore for PgStore {
    async fn find_profile(&self, user_id: Uuid) -> Result<Option<Profile>, AppError> {
        Ok(get_profile(&self.pool, user_id).await?)
    }

    async fn count_pages(&self, user_id: Uuid) -> Result<i64, AppError> {
        Ok(count_pages(&self.pool, user_id).await?)
    }

    async fn record_generation(
        &self,
        page: &NewMagicPage,
        cost: i32,
        plan: PlanTier,
    ) -> Result<GenerationReceipt, AppError> {
        let mut tx = self.pool.begin().await?;

        // The row lock serializes concurrent generations for one user, so the
        // recount below cannot race another insert.
        let credits: Option<i32> =
            sqlx::query_scalar("SELECT credits FROM profiles WHERE id = $1 FOR UPDATE")
                .bind(page.user_id)
                .fetch_optional(&mut *tx)
                .await?;

        let Some(credits) = credits else {
            tx.rollback().await?;
            return Err(AppError::ProfileNotFound);
        };
        if credits < cost {
            tx.rollback().await?;
            return Err(AppError::InsufficientCredits {
                required: cost,
                available: credits,
            });
        }

        if let Some(limit) = plan.page_limit() {
            let existing: i64 =
                sqlx::query_scalar("SELECT COUNT(*) FROM magic_pages WHERE user_id = $1")
                    .bind(page.user_id)
                    .fetch_one(&mut *tx)
                    .await?;
            if existing >= limit {
                tx.rollback().await?;
                return Err(AppError::PageLimitReached {
                    plan: plan.to_string(),
                    limit,
                });
            }
        }

        let remaining_credits: i32 = sqlx::query_scalar(
            "UPDATE profiles SET credits = credits - $1, updated_at = NOW() WHERE id = $2 RETURNING credits",
        )
        .bind(cost)
        .bind(page.user_id)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(&format!(
            "INSERT INTO magic_pages ({PAGE_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, false, $9, $10, $11)"
        ))
        .bind(page.id)
        .bind(page.user_id)
        .bind(&page.product_url)
        .bind(&page.title)
        .bind(&page.slug)
        .bind(Json(&page.product))
        .bind(Json(&page.content))
        .bind(&page.template)
        .bind(page.product_source.as_str())
        .bind(page.content_source.as_str())
        .bind(page.created_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| unique_to_conflict(e, "Slug already taken, retry the request"))?;

        sqlx::query("INSERT INTO usage_logs (id, user_id, action, credits_used, metadata, created_at) VALUES ($1, $2, $3, $4, $5, $6)")
            .bind(Uuid::new_v4())
            .bind(page.user_id)
            .bind(USAGE_ACTION)
            .bind(cost)
            .bind(Json(json!({
                "page_id": page.id,
                "slug": page.slug,
                "product_url": page.product_url,
                "product_source": page.product_source.as_str(),
                "content_source": page.content_source.as_str(),
            })))
            .bind(page.created_at)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(GenerationReceipt {
            page_id: page.id,
            remaining_credits,
        })
    }

    async fn list_pages(&self, user_id: Uuid) -> Result<Vec<MagicPage>, AppError> {
        Ok(list_pages(&self.pool, user_id).await?)
    }

    async fn find_published_page(&self, slug: &str) -> Result<Option<MagicPage>, AppError> {
        Ok(get_published_page(&self.pool, slug).await?)
    }

    async fn set_published(
        &self,
        user_id: Uuid,
        page_id: Uuid,
        is_published: bool,
    ) -> Result<Option<String>, AppError> {
        Ok(set_page_published(&self.pool, user_id, page_id, is_published).await?)
    }

    async fn delete_page(&self, user_id: Uuid, page_id: Uuid) -> Result<Option<String>, AppError> {
        Ok(delete_page(&self.pool, user_id, page_id).await?)
    }
}
