// src/auth.rs
use crate::config::Config;
use crate::db;
use crate::error::AppError;
use crate::models::{Claims, LoginRequest, RegisterRequest, User};
use actix_web::dev::Payload;
use actix_web::http::header::AUTHORIZATION;
use actix_web::{FromRequest, HttpRequest, HttpResponse, post, web};
use bcrypt::{DEFAULT_COST, hash, verify};
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde_json::json;
use std::future::{Ready, ready};
use uuid::Uuid;

pub fn init_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(login);
    cfg.service(register);
}

/// Caller identity taken from `Authorization: Bearer <jwt>`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AuthenticatedUser(pub Uuid);

impl AuthenticatedUser {
    pub fn id(&self) -> Uuid {
        self.0
    }
}

impl FromRequest for AuthenticatedUser {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(authenticate(req))
    }
}

fn authenticate(req: &HttpRequest) -> Result<AuthenticatedUser, AppError> {
    let config = req
        .app_data::<web::Data<Config>>()
        .ok_or_else(|| AppError::Internal("config is not registered".to_string()))?;
    let token = bearer_token(req).ok_or(AppError::Unauthorized)?;
    verify_token(token, &config.jwt_secret).map(AuthenticatedUser)
}

fn bearer_token(req: &HttpRequest) -> Option<&str> {
    let value = req.headers().get(AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?.trim();
    (!token.is_empty()).then_some(token)
}

pub fn issue_token(user_id: Uuid, secret: &str, ttl_hours: i64) -> Result<String, AppError> {
    let expiration = Utc::now() + Duration::hours(ttl_hours);
    let claims = Claims {
        sub: user_id.to_string(),
        exp: expiration.timestamp() as usize,
    };
    Ok(encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_ref()),
    )?)
}

pub fn verify_token(token: &str, secret: &str) -> Result<Uuid, AppError> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_ref()),
        &Validation::default(),
    )
    .map_err(|e| {
        tracing::debug!("Rejected bearer token: {}", e);
        AppError::Unauthorized
    })?;
    Uuid::parse_str(&data.claims.sub).map_err(|_| AppError::Unauthorized)
}

#[post("/auth/login")]
pub async fn login(
    pool: web::Data<sqlx::PgPool>,
    config: web::Data<Config>,
    req: web::Json<LoginRequest>,
) -> Result<HttpResponse, AppError> {
    let user = db::get_user_by_username(&pool, &req.username).await?;

    match user {
        Some(user) => match verify(&req.password, &user.password_hash) {
            Ok(true) => {
                let token = issue_token(user.id, &config.jwt_secret, config.token_ttl_hours)?;
                Ok(HttpResponse::Ok().json(json!({
                    "token": token,
                    "user_id": user.id,
                })))
            }
            Ok(false) | Err(_) => {
                Ok(HttpResponse::Unauthorized().json(json!({"error": "Invalid credentials"})))
            }
        },
        None => Ok(HttpResponse::Unauthorized().json(json!({"error": "Invalid credentials"}))),
    }
}

#[post("/auth/register")]
pub async fn register(
    pool: web::Data<sqlx::PgPool>,
    config: web::Data<Config>,
    req: web::Json<RegisterRequest>,
) -> Result<HttpResponse, AppError> {
    if req.username.trim().is_empty() || req.password.is_empty() {
        return Err(AppError::BadRequest(
            "Username and password are required".to_string(),
        ));
    }

    if db::get_user_by_username(&pool, &req.username).await?.is_some() {
        return Err(AppError::Conflict("Username already exists".to_string()));
    }

    let password_hash = hash(&req.password, DEFAULT_COST).map_err(|e| {
        tracing::error!("Password hashing error: {}", e);
        AppError::Internal("password hashing failed".to_string())
    })?;

    let new_user = User {
        id: Uuid::new_v4(),
        username: req.username.trim().to_string(),
        email: req.email.clone(),
        password_hash,
        created_at: Utc::now(),
    };

    db::create_user_with_profile(&pool, &new_user, config.signup_credits).await?;
    tracing::info!("Registered user {}", new_user.id);

    Ok(HttpResponse::Created().json(json!({
        "message": "User created successfully",
        "user_id": new_user.id,
    })))
}
