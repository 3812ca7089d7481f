// src/crm.rs
//! Leads and appointments. Status changes are plain writes of a known value.

use crate::auth::AuthenticatedUser;
use crate::db;
use crate::error::AppError;
use crate::models::{
    Appointment, AppointmentStatus, CreateAppointmentRequest, CreateLeadRequest, Lead,
    LeadStatus, StatusUpdateRequest,
};
use actix_web::{HttpResponse, get, patch, post, web};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

pub fn init_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(create_lead);
    cfg.service(list_leads);
    cfg.service(update_lead_status);
    cfg.service(create_appointment);
    cfg.service(list_appointments);
    cfg.service(update_appointment_status);
}

#[derive(Deserialize)]
pub struct LeadFilter {
    pub status: Option<String>,
}

#[derive(Deserialize)]
pub struct AppointmentFilter {
    pub from: Option<DateTime<Utc>>,
}

pub fn new_lead(user_id: Uuid, req: CreateLeadRequest) -> Result<Lead, AppError> {
    let name = req.name.trim();
    if name.is_empty() {
        return Err(AppError::BadRequest("Lead name is required".to_string()));
    }
    let now = Utc::now();
    Ok(Lead {
        id: Uuid::new_v4(),
        user_id,
        name: name.to_string(),
        email: non_blank(req.email),
        phone: non_blank(req.phone),
        source: non_blank(req.source),
        status: LeadStatus::New.as_str().to_string(),
        notes: non_blank(req.notes),
        created_at: now,
        updated_at: now,
    })
}

pub fn new_appointment(
    user_id: Uuid,
    req: CreateAppointmentRequest,
) -> Result<Appointment, AppError> {
    let customer_name = req.customer_name.trim();
    if customer_name.is_empty() {
        return Err(AppError::BadRequest(
            "Customer name is required".to_string(),
        ));
    }
    let now = Utc::now();
    Ok(Appointment {
        id: Uuid::new_v4(),
        user_id,
        lead_id: req.lead_id,
        customer_name: customer_name.to_string(),
        customer_phone: non_blank(req.customer_phone),
        scheduled_at: req.scheduled_at,
        status: AppointmentStatus::Pending.as_str().to_string(),
        notes: non_blank(req.notes),
        created_at: now,
        updated_at: now,
    })
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[post("/leads")]
pub async fn create_lead(
    pool: web::Data<sqlx::PgPool>,
    user: AuthenticatedUser,
    body: web::Json<CreateLeadRequest>,
) -> Result<HttpResponse, AppError> {
    let lead = new_lead(user.id(), body.into_inner())?;
    db::create_lead(&pool, &lead).await?;
    Ok(HttpResponse::Created().json(lead))
}

#[get("/leads")]
pub async fn list_leads(
    pool: web::Data<sqlx::PgPool>,
    user: AuthenticatedUser,
    query: web::Query<LeadFilter>,
) -> Result<HttpResponse, AppError> {
    let status = query
        .status
        .as_deref()
        .map(str::parse::<LeadStatus>)
        .transpose()?;
    let leads = db::list_leads(&pool, user.id(), status).await?;
    Ok(HttpResponse::Ok().json(leads))
}

#[patch("/leads/{lead_id}/status")]
pub async fn update_lead_status(
    pool: web::Data<sqlx::PgPool>,
    user: AuthenticatedUser,
    path: web::Path<Uuid>,
    body: web::Json<StatusUpdateRequest>,
) -> Result<HttpResponse, AppError> {
    let status: LeadStatus = body.status.parse()?;
    let lead = db::update_lead_status(&pool, user.id(), path.into_inner(), status)
        .await?
        .ok_or(AppError::NotFound("Lead"))?;
    Ok(HttpResponse::Ok().json(lead))
}

#[post("/appointments")]
pub async fn create_appointment(
    pool: web::Data<sqlx::PgPool>,
    user: AuthenticatedUser,
    body: web::Json<CreateAppointmentRequest>,
) -> Result<HttpResponse, AppError> {
    let appointment = new_appointment(user.id(), body.into_inner())?;
    if let Some(lead_id) = appointment.lead_id {
        if db::get_lead(&pool, user.id(), lead_id).await?.is_none() {
            return Err(AppError::NotFound("Lead"));
        }
    }
    db::create_appointment(&pool, &appointment).await?;
    Ok(HttpResponse::Created().json(appointment))
}

#[get("/appointments")]
pub async fn list_appointments(
    pool: web::Data<sqlx::PgPool>,
    user: AuthenticatedUser,
    query: web::Query<AppointmentFilter>,
) -> Result<HttpResponse, AppError> {
    let appointments = db::list_appointments(&pool, user.id(), query.from).await?;
    Ok(HttpResponse::Ok().json(appointments))
}

#[patch("/appointments/{appointment_id}/status")]
pub async fn update_appointment_status(
    pool: web::Data<sqlx::PgPool>,
    user: AuthenticatedUser,
    path: web::Path<Uuid>,
    body: web::Json<StatusUpdateRequest>,
) -> Result<HttpResponse, AppError> {
    let status: AppointmentStatus = body.status.parse()?;
    let appointment =
        db::update_appointment_status(&pool, user.id(), path.into_inner(), status)
            .await?
            .ok_or(AppError::NotFound("Appointment"))?;
    Ok(HttpResponse::Ok().json(appointment))
}
