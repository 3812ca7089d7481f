// src/profile.rs
use crate::auth::AuthenticatedUser;
use crate::db;
use crate::error::AppError;
use actix_web::{HttpResponse, get, web};
use serde_json::json;

const USAGE_HISTORY_LIMIT: i64 = 100;

pub fn init_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(get_user_profile);
    cfg.service(get_usage);
}

#[get("/user/profile")]
pub async fn get_user_profile(
    pool: web::Data<sqlx::PgPool>,
    user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let profile = db::get_profile(&pool, user.id())
        .await?
        .ok_or(AppError::ProfileNotFound)?;
    let page_count = db::count_pages(&pool, user.id()).await?;
    let plan = profile.plan_tier();

    Ok(HttpResponse::Ok().json(json!({
        "user_id": profile.id,
        "plan": plan,
        "credits": profile.credits,
        "video_credits": profile.video_credits,
        "page_count": page_count,
        "page_limit": plan.page_limit(),
    })))
}

#[get("/user/usage")]
pub async fn get_usage(
    pool: web::Data<sqlx::PgPool>,
    user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let logs = db::list_usage(&pool, user.id(), USAGE_HISTORY_LIMIT).await?;
    Ok(HttpResponse::Ok().json(logs))
}
