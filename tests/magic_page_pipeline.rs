mod support;

use magic_page_service::copywriter::{PageConfig, fallback_content};
use magic_page_service::error::AppError;
use magic_page_service::models::{ContentOrigin, GeneratePageRequest, ProductOrigin};
use magic_page_service::pipeline::PAGE_COST;
use magic_page_service::scrape::ProductSnapshot;
use std::sync::atomic::Ordering;
use support::{AI_REPLY, PRODUCT_HTML, StaticSource, StaticWriter, generator};
use uuid::Uuid;

fn request(url: &str) -> GeneratePageRequest {
    GeneratePageRequest {
        product_url: url.to_string(),
        config: None,
    }
}

#[tokio::test]
async fn low_balance_is_rejected_without_side_effects() {
    let source = StaticSource::html(PRODUCT_HTML);
    let fetches = source.calls.clone();
    let generator = generator(source, StaticWriter::reply(AI_REPLY));
    let user_id = generator.store().with_profile("premium", PAGE_COST - 1);

    let err = generator
        .generate(user_id, request("https://lights.test/aurora"))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        AppError::InsufficientCredits {
            required: 10,
            available: 9
        }
    ));
    assert_eq!(generator.store().credits(user_id), PAGE_COST - 1);
    assert!(generator.store().pages().is_empty());
    assert!(generator.store().usage_logs().is_empty());
    assert_eq!(fetches.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn free_plan_stops_at_two_pages() {
    let generator = generator(StaticSource::html(PRODUCT_HTML), StaticWriter::reply(AI_REPLY));
    let user_id = generator.store().with_profile("free", 1_000);
    generator.store().seed_pages(user_id, 2);

    let err = generator
        .generate(user_id, request("https://lights.test/aurora"))
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::PageLimitReached { limit: 2, .. }));
    assert_eq!(generator.store().credits(user_id), 1_000);
    assert!(generator.store().pages().is_empty());
}

#[tokio::test]
async fn pro_plan_stops_at_twenty_pages() {
    let generator = generator(StaticSource::html(PRODUCT_HTML), StaticWriter::reply(AI_REPLY));
    let user_id = generator.store().with_profile("pro", 500);

    generator.store().seed_pages(user_id, 19);
    generator
        .generate(user_id, request("https://lights.test/aurora"))
        .await
        .unwrap();

    let err = generator
        .generate(user_id, request("https://lights.test/aurora"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::PageLimitReached { limit: 20, .. }));
    assert_eq!(generator.store().pages().len(), 1);
}

#[tokio::test]
async fn premium_plan_is_unlimited() {
    let generator = generator(StaticSource::html(PRODUCT_HTML), StaticWriter::reply(AI_REPLY));
    let user_id = generator.store().with_profile("premium", 100);
    generator.store().seed_pages(user_id, 10_000);

    let response = generator
        .generate(user_id, request("https://lights.test/aurora"))
        .await
        .unwrap();
    assert_eq!(response.remaining_credits, 90);
}

#[tokio::test]
async fn successful_generation_charges_once_and_records_one_page() {
    let writer = StaticWriter::reply(AI_REPLY);
    let prompts = writer.prompts.clone();
    let generator = generator(StaticSource::html(PRODUCT_HTML), writer);
    let user_id = generator.store().with_profile("free", 37);

    let response = generator
        .generate(user_id, request("https://lights.test/aurora"))
        .await
        .unwrap();

    assert_eq!(response.credits_used, PAGE_COST);
    assert_eq!(response.remaining_credits, 37 - PAGE_COST);
    assert_eq!(generator.store().credits(user_id), 27);
    assert_eq!(response.title, "Aurora Desk Lamp");
    assert_eq!(response.content.headline, "Light Up Your Nights");
    assert!(response.slug.starts_with("aurora-desk-lamp-"));
    assert_eq!(
        response.preview_url,
        format!("{}/p/{}", support::BASE_URL, response.slug)
    );

    let pages = generator.store().pages();
    assert_eq!(pages.len(), 1);
    assert_eq!(generator.store().usage_logs(), vec![(user_id, PAGE_COST)]);

    let page = &pages[0];
    assert_eq!(page.id, response.page_id);
    assert_eq!(page.product_source, ProductOrigin::Scraped);
    assert_eq!(page.content_source, ContentOrigin::Ai);
    assert_eq!(page.product.price, "$49.00");
    assert_eq!(
        page.product.images,
        vec![
            "https://cdn.lights.test/aurora.jpg".to_string(),
            "https://lights.test/static/aurora-side.jpg".to_string(),
        ]
    );
    assert_eq!(page.template, "modern");

    let prompts = prompts.lock().unwrap();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains("Aurora Desk Lamp"));
}

#[tokio::test]
async fn scrape_failure_uses_placeholder_product() {
    let generator = generator(StaticSource::failing(), StaticWriter::reply(AI_REPLY));
    let user_id = generator.store().with_profile("free", 10);

    let response = generator
        .generate(user_id, request("https://unreachable.test/item"))
        .await
        .unwrap();

    assert_eq!(response.title, "Amazing Product");
    assert_eq!(response.remaining_credits, 0);

    let page = &generator.store().pages()[0];
    assert_eq!(page.product_source, ProductOrigin::Placeholder);
    assert_eq!(page.product, ProductSnapshot::placeholder());
    assert_eq!(page.product.price, "$99");
    assert!(page.product.images.is_empty());
}

#[tokio::test]
async fn invalid_model_output_uses_fallback_content() {
    let generator = generator(
        StaticSource::html(PRODUCT_HTML),
        StaticWriter::reply("Here is a great page for you!"),
    );
    let user_id = generator.store().with_profile("free", 20);

    let response = generator
        .generate(user_id, request("https://lights.test/aurora"))
        .await
        .unwrap();

    let page = &generator.store().pages()[0];
    assert_eq!(page.content_source, ContentOrigin::Fallback);
    assert_eq!(
        response.content,
        fallback_content(&page.product, &PageConfig::default())
    );
    assert_eq!(response.content.headline, "Discover Aurora Desk Lamp");
    assert_eq!(response.remaining_credits, 10);
}

#[tokio::test]
async fn writer_failure_uses_fallback_content() {
    let generator = generator(StaticSource::html(PRODUCT_HTML), StaticWriter::failing());
    let user_id = generator.store().with_profile("free", 20);

    generator
        .generate(user_id, request("https://lights.test/aurora"))
        .await
        .unwrap();

    assert_eq!(
        generator.store().pages()[0].content_source,
        ContentOrigin::Fallback
    );
}

#[tokio::test]
async fn same_product_twice_gets_distinct_slugs() {
    let generator = generator(StaticSource::html(PRODUCT_HTML), StaticWriter::reply(AI_REPLY));
    let user_id = generator.store().with_profile("premium", 100);

    let first = generator
        .generate(user_id, request("https://lights.test/aurora"))
        .await
        .unwrap();
    let second = generator
        .generate(user_id, request("https://lights.test/aurora"))
        .await
        .unwrap();

    assert_ne!(first.slug, second.slug);
    for slug in [&first.slug, &second.slug] {
        assert!(slug.len() <= 57);
        assert!(
            slug.chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        );
    }
}

#[tokio::test]
async fn config_selects_template() {
    let generator = generator(StaticSource::html(PRODUCT_HTML), StaticWriter::reply(AI_REPLY));
    let user_id = generator.store().with_profile("free", 20);

    let request = GeneratePageRequest {
        product_url: "https://lights.test/aurora".to_string(),
        config: Some(PageConfig {
            template: Some("minimal".to_string()),
            ..PageConfig::default()
        }),
    };
    generator.generate(user_id, request).await.unwrap();

    assert_eq!(generator.store().pages()[0].template, "minimal");
}

#[tokio::test]
async fn unknown_profile_and_bad_url_are_rejected() {
    let generator = generator(StaticSource::html(PRODUCT_HTML), StaticWriter::reply(AI_REPLY));

    let err = generator
        .generate(Uuid::new_v4(), request("https://lights.test/aurora"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::ProfileNotFound));

    let user_id = generator.store().with_profile("free", 20);
    let err = generator
        .generate(user_id, request("javascript:alert(1)"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));
    assert_eq!(generator.store().credits(user_id), 20);
}

#[tokio::test]
async fn concurrent_generations_cannot_exceed_page_limit() {
    let source = StaticSource::html(PRODUCT_HTML);
    let fetches = source.calls.clone();
    let generator = generator(source, StaticWriter::reply(AI_REPLY));
    let user_id = generator.store().with_profile("free", 50);
    generator.store().seed_pages(user_id, 1);

    let (first, second) = tokio::join!(
        generator.generate(user_id, request("https://lights.test/aurora")),
        generator.generate(user_id, request("https://lights.test/aurora")),
    );

    // Both passed the early check before either was recorded.
    assert_eq!(fetches.load(Ordering::SeqCst), 2);

    let results = [first, second];
    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(results.iter().any(|r| matches!(
        r,
        Err(AppError::PageLimitReached { limit: 2, .. })
    )));
    assert_eq!(generator.store().pages().len(), 1);
    assert_eq!(generator.store().credits(user_id), 50 - PAGE_COST);
    assert_eq!(generator.store().usage_logs().len(), 1);
}

#[tokio::test]
async fn concurrent_generations_cannot_overdraw_credits() {
    let generator = generator(StaticSource::html(PRODUCT_HTML), StaticWriter::reply(AI_REPLY));
    let user_id = generator.store().with_profile("premium", PAGE_COST + 5);

    let (first, second) = tokio::join!(
        generator.generate(user_id, request("https://lights.test/aurora")),
        generator.generate(user_id, request("https://lights.test/aurora")),
    );

    let results = [first, second];
    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(results.iter().any(|r| matches!(
        r,
        Err(AppError::InsufficientCredits {
            required: 10,
            available: 5
        })
    )));
    assert_eq!(generator.store().credits(user_id), 5);
    assert_eq!(generator.store().pages().len(), 1);
}
