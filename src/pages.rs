// src/pages.rs
use crate::PageCache;
use crate::auth::AuthenticatedUser;
use crate::copywriter::CopyWriter;
use crate::error::AppError;
use crate::jobs::{JobRegistry, JobStatus};
use crate::models::GeneratePageRequest;
use crate::pipeline::{MagicPageGenerator, PageStore};
use crate::scrape::ProductSource;
use actix_web::{HttpResponse, get, web};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

/// Page routes for a generator built from `S`, `P` and `W`.
///
/// Expects `web::Data<MagicPageGenerator<S, P, W>>`, `web::Data<S>`,
/// `web::Data<JobRegistry>` and `web::Data<PageCache>` in app data.
pub fn init_routes<S, P, W>(cfg: &mut web::ServiceConfig)
where
    S: PageStore + 'static,
    P: ProductSource + 'static,
    W: CopyWriter + 'static,
{
    cfg.route(
        "/functions/v1/generate-magic-page",
        web::post().to(generate_magic_page::<S, P, W>),
    );
    cfg.route("/jobs/magic-page", web::post().to(submit_job::<S, P, W>));
    cfg.route("/pages", web::get().to(list_pages::<S>));
    cfg.route("/p/{slug}", web::get().to(get_public_page::<S>));
    cfg.route(
        "/pages/{page_id}/publish",
        web::patch().to(set_published::<S>),
    );
    cfg.route("/pages/{page_id}", web::delete().to(delete_page::<S>));
    init_job_routes(cfg);
}

/// Job polling only needs the registry, so it can be mounted on its own.
pub fn init_job_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(get_job);
}

#[derive(Deserialize)]
pub struct PublishRequest {
    pub is_published: bool,
}

pub async fn generate_magic_page<S, P, W>(
    generator: web::Data<MagicPageGenerator<S, P, W>>,
    user: AuthenticatedUser,
    body: web::Json<GeneratePageRequest>,
) -> Result<HttpResponse, AppError>
where
    S: PageStore,
    P: ProductSource,
    W: CopyWriter,
{
    let response = generator.generate(user.id(), body.into_inner()).await?;
    Ok(HttpResponse::Ok().json(response))
}

pub async fn submit_job<S, P, W>(
    generator: web::Data<MagicPageGenerator<S, P, W>>,
    jobs: web::Data<JobRegistry>,
    user: AuthenticatedUser,
    body: web::Json<GeneratePageRequest>,
) -> Result<HttpResponse, AppError>
where
    S: PageStore + 'static,
    P: ProductSource + 'static,
    W: CopyWriter + 'static,
{
    let mut job = jobs.submit(user.id()).await;
    let job_id = job.id;
    let request = body.into_inner();

    let generator = generator.into_inner();
    let registry = jobs.into_inner();
    actix_web::rt::spawn(async move {
        registry.update(&mut job, JobStatus::Running).await;
        let status = match generator.generate(user.id(), request).await {
            Ok(result) => JobStatus::Completed { result },
            Err(e) => {
                tracing::warn!("Job {} failed: {}", job.id, e);
                JobStatus::Failed {
                    error: e.public_message(),
                }
            }
        };
        registry.update(&mut job, status).await;
    });

    tracing::info!("Queued magic page job {} for user {}", job_id, user.id());
    Ok(HttpResponse::Accepted().json(json!({
        "job_id": job_id,
        "status": "queued",
    })))
}

#[get("/jobs/{job_id}")]
pub async fn get_job(
    jobs: web::Data<JobRegistry>,
    user: AuthenticatedUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let job = jobs
        .get_for_user(path.into_inner(), user.id())
        .await
        .ok_or(AppError::NotFound("Job"))?;
    Ok(HttpResponse::Ok().json(job))
}

pub async fn list_pages<S: PageStore>(
    store: web::Data<S>,
    user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let pages = store.list_pages(user.id()).await?;
    Ok(HttpResponse::Ok().json(pages))
}

pub async fn get_public_page<S: PageStore>(
    store: web::Data<S>,
    cache: web::Data<PageCache>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let slug = path.into_inner();

    if let Some(cached) = cache.get(&slug).await {
        tracing::debug!("Cache hit for page: {}", slug);
        return Ok(HttpResponse::Ok().json(cached));
    }

    let page = store
        .find_published_page(&slug)
        .await?
        .ok_or(AppError::NotFound("Page"))?;

    let response = json!({
        "id": page.id,
        "title": page.title,
        "slug": page.slug,
        "template": page.template,
        "product": page.product_data,
        "content": page.content,
        "created_at": page.created_at,
    });
    cache.insert(slug, response.clone()).await;

    Ok(HttpResponse::Ok().json(response))
}

pub async fn set_published<S: PageStore>(
    store: web::Data<S>,
    cache: web::Data<PageCache>,
    user: AuthenticatedUser,
    path: web::Path<Uuid>,
    body: web::Json<PublishRequest>,
) -> Result<HttpResponse, AppError> {
    let page_id = path.into_inner();
    let slug = store
        .set_published(user.id(), page_id, body.is_published)
        .await?
        .ok_or(AppError::NotFound("Page"))?;
    cache.invalidate(&slug).await;

    Ok(HttpResponse::Ok().json(json!({
        "page_id": page_id,
        "slug": slug,
        "is_published": body.is_published,
    })))
}

pub async fn delete_page<S: PageStore>(
    store: web::Data<S>,
    cache: web::Data<PageCache>,
    user: AuthenticatedUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let slug = store
        .delete_page(user.id(), path.into_inner())
        .await?
        .ok_or(AppError::NotFound("Page"))?;
    cache.invalidate(&slug).await;
    Ok(HttpResponse::NoContent().finish())
}
