// Interception and strategy tests
// Author: kelexine (https://github.com/kelexine)

mod common;

use axum::http::{header, Method, StatusCode};
use common::{active_harness, harness_with, test_config, url};
use offline_vault::engine::Intercept;
use offline_vault::error::VaultError;
use offline_vault::fetch::{Destination, FetchRequest, RequestMode};
use offline_vault::storage::{CacheStorage, CachedResponse};
use std::time::Duration;

fn get(target: &str) -> FetchRequest {
    FetchRequest::get_str(target).unwrap()
}

fn response(intercept: Intercept) -> CachedResponse {
    match intercept {
        Intercept::Response(response) => response,
        Intercept::Passthrough => panic!("expected an intercepted response"),
    }
}

#[tokio::test]
async fn test_static_asset_is_fetched_once() {
    let h = active_harness().await;
    let css = url("/site.css");
    h.fetcher.ok(&css, "body{}", "text/css");

    for _ in 0..3 {
        let request = get(&css).with_destination(Destination::Style);
        let served = response(h.engine.handle_fetch(request).await.unwrap());
        assert_eq!(served.body, "body{}");
    }

    assert_eq!(h.fetcher.calls(&css), 1);
    assert!(h.storage.get("test-app", &css).await.unwrap().is_some());
}

#[tokio::test]
async fn test_non_2xx_is_returned_but_not_stored() {
    let h = active_harness().await;
    let missing = url("/missing.js");
    h.fetcher.status(&missing, 404);

    let request = get(&missing).with_destination(Destination::Script);
    let served = response(h.engine.handle_fetch(request).await.unwrap());
    assert_eq!(served.status, StatusCode::NOT_FOUND);
    assert!(h.storage.match_any(&missing).await.unwrap().is_none());
}

#[tokio::test]
async fn test_failed_image_yields_placeholder() {
    let h = active_harness().await;
    let request = get(&url("/broken.png")).with_destination(Destination::Image);

    let served = response(h.engine.handle_fetch(request).await.unwrap());
    assert_eq!(served.status, StatusCode::NOT_FOUND);
    assert!(served.body.is_empty());
}

#[tokio::test]
async fn test_failed_script_propagates() {
    let h = active_harness().await;
    let request = get(&url("/app.js")).with_destination(Destination::Script);

    let err = h.engine.handle_fetch(request).await.unwrap_err();
    assert!(matches!(err, VaultError::Network(_)));
}

#[tokio::test]
async fn test_navigation_prefers_network_and_stores_runtime() {
    let h = active_harness().await;
    let page = url("/about");
    h.fetcher.ok(&page, "fresh", "text/html");

    let request = get(&page).with_mode(RequestMode::Navigate);
    let served = response(h.engine.handle_fetch(request).await.unwrap());
    assert_eq!(served.body, "fresh");
    assert!(h.storage.get("test-runtime", &page).await.unwrap().is_some());
}

#[tokio::test]
async fn test_offline_navigation_falls_back() {
    let h = active_harness().await;
    let offline = CachedResponse::new(StatusCode::OK, "you are offline");
    h.storage.put("test-app", &url("/offline.html"), offline).await.unwrap();

    let request = get(&url("/never-seen")).with_mode(RequestMode::Navigate);
    let served = response(h.engine.handle_fetch(request).await.unwrap());
    assert_eq!(served.body, "you are offline");
}

#[tokio::test]
async fn test_offline_navigation_prefers_cached_copy() {
    let h = active_harness().await;
    let page = url("/docs");
    h.storage
        .put("vault-page-guide", &page, CachedResponse::new(StatusCode::OK, "saved docs"))
        .await
        .unwrap();

    let request = get(&page).with_mode(RequestMode::Navigate);
    let served = response(h.engine.handle_fetch(request).await.unwrap());
    assert_eq!(served.body, "saved docs");
}

#[tokio::test]
async fn test_offline_non_navigation_without_copy_fails() {
    let h = active_harness().await;
    let request = get(&url("/api/data.json"));
    assert!(h.engine.handle_fetch(request).await.is_err());
}

#[tokio::test]
async fn test_stale_while_revalidate_serves_old_then_new() {
    let h = active_harness().await;
    let data = "https://cdn.test/feed.json";
    h.storage
        .put("test-runtime", data, CachedResponse::new(StatusCode::OK, "v1"))
        .await
        .unwrap();
    h.fetcher.ok(data, "v2", "application/json");

    let first = response(h.engine.handle_fetch(get(data)).await.unwrap());
    assert_eq!(first.body, "v1");

    // The refresh is detached; wait for it to land
    let mut refreshed = false;
    for _ in 0..50 {
        let entry = h.storage.get("test-runtime", data).await.unwrap().unwrap();
        if entry.response.body == "v2" {
            refreshed = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(refreshed, "background revalidation never stored v2");

    let second = response(h.engine.handle_fetch(get(data)).await.unwrap());
    assert_eq!(second.body, "v2");
}

#[tokio::test]
async fn test_stale_while_revalidate_without_copy_waits_for_network() {
    let h = active_harness().await;
    let data = "https://cdn.test/new.json";
    h.fetcher.ok(data, "first", "application/json");

    let served = response(h.engine.handle_fetch(get(data)).await.unwrap());
    assert_eq!(served.body, "first");

    let missing = "https://cdn.test/gone.json";
    assert!(h.engine.handle_fetch(get(missing)).await.is_err());
}

#[tokio::test]
async fn test_stale_while_revalidate_swallows_failure_with_copy() {
    let h = active_harness().await;
    let data = "https://cdn.test/flaky.json";
    h.storage
        .put("test-runtime", data, CachedResponse::new(StatusCode::OK, "cached"))
        .await
        .unwrap();
    h.fetcher.fail(data);

    let served = response(h.engine.handle_fetch(get(data)).await.unwrap());
    assert_eq!(served.body, "cached");
}

#[tokio::test]
async fn test_cached_media_honors_range() {
    let h = active_harness().await;
    let video = url("/media/intro.mp4");
    let payload = CachedResponse::new(StatusCode::OK, vec![1u8; 1000])
        .with_header(header::CONTENT_TYPE, "video/mp4");
    h.storage.put("vault-page-guide", &video, payload).await.unwrap();

    let request = get(&video)
        .with_destination(Destination::Video)
        .with_header(header::RANGE, "bytes=100-");
    let served = response(h.engine.handle_fetch(request).await.unwrap());

    assert_eq!(served.status, StatusCode::PARTIAL_CONTENT);
    assert_eq!(served.headers[header::CONTENT_RANGE], "bytes 100-999/1000");
    assert_eq!(served.headers[header::CONTENT_LENGTH], "900");
    assert_eq!(h.fetcher.total_calls(), 0);
}

#[tokio::test]
async fn test_partial_upstream_response_is_not_stored() {
    let h = active_harness().await;
    let video = url("/media/clip.webm");
    h.fetcher.respond(
        &video,
        CachedResponse::new(StatusCode::PARTIAL_CONTENT, "part")
            .with_header(header::CONTENT_RANGE, "bytes 0-3/100"),
    );

    let request = get(&video)
        .with_destination(Destination::Video)
        .with_header(header::RANGE, "bytes=0-3");
    let served = response(h.engine.handle_fetch(request).await.unwrap());
    assert_eq!(served.status, StatusCode::PARTIAL_CONTENT);
    assert!(h.storage.match_any(&video).await.unwrap().is_none());
}

#[tokio::test]
async fn test_everything_passes_through_before_activation() {
    let h = harness_with(&test_config());
    let request = get(&url("/site.css")).with_destination(Destination::Style);
    assert!(matches!(
        h.engine.handle_fetch(request).await.unwrap(),
        Intercept::Passthrough
    ));
    assert_eq!(h.fetcher.total_calls(), 0);
}

#[tokio::test]
async fn test_unlisted_and_non_get_requests_pass_through() {
    let h = active_harness().await;

    let foreign = get("https://tracker.example/pixel.gif").with_destination(Destination::Image);
    assert!(matches!(
        h.engine.handle_fetch(foreign).await.unwrap(),
        Intercept::Passthrough
    ));

    let post = get(&url("/api/save")).with_method(Method::POST);
    assert!(matches!(
        h.engine.handle_fetch(post).await.unwrap(),
        Intercept::Passthrough
    ));
    assert_eq!(h.fetcher.total_calls(), 0);
}
