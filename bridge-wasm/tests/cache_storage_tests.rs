#![cfg(target_arch = "wasm32")]
//! Browser tests for the Cache API bridge and the request/response
//! conversions it relies on.

use bridge_traits::cache::CacheStorage;
use bridge_traits::http::{HttpMethod, HttpRequest, HttpResponse};
use bridge_wasm::convert::{from_web_response, to_web_response};
use bridge_wasm::WebCacheStorage;
use wasm_bindgen_test::*;

wasm_bindgen_test_configure!(run_in_browser);

fn unique(name: &str) -> String {
    format!("{}-{}", name, js_sys::Math::random())
}

#[wasm_bindgen_test]
async fn test_put_and_match_round_trip() {
    let storage = WebCacheStorage::new().unwrap();
    let name = unique("bridge-wasm-put");
    let cache = storage.open(&name).await.unwrap();

    let request = HttpRequest::get("https://app.example/index.html");
    cache
        .put(
            &request,
            HttpResponse::new(200, "<html></html>").with_header("content-type", "text/html"),
        )
        .await
        .unwrap();

    let stored = cache
        .match_request(&HttpRequest::get("https://app.example/index.html#top"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.status, 200);
    assert_eq!(stored.body.as_ref(), b"<html></html>");
    assert_eq!(
        stored.headers.get("content-type").map(String::as_str),
        Some("text/html")
    );

    assert!(storage.delete(&name).await.unwrap());
}

#[wasm_bindgen_test]
async fn test_generations_are_listed_and_deleted() {
    let storage = WebCacheStorage::new().unwrap();
    let old = unique("bridge-wasm-old");
    let current = unique("bridge-wasm-current");
    storage.open(&old).await.unwrap();
    storage.open(&current).await.unwrap();

    let names = storage.keys().await.unwrap();
    assert!(names.contains(&old));
    assert!(names.contains(&current));

    assert!(storage.delete(&old).await.unwrap());
    assert!(!storage.has(&old).await.unwrap());
    assert!(storage.has(&current).await.unwrap());

    storage.delete(&current).await.unwrap();
}

#[wasm_bindgen_test]
async fn test_non_get_is_rejected() {
    let storage = WebCacheStorage::new().unwrap();
    let name = unique("bridge-wasm-post");
    let cache = storage.open(&name).await.unwrap();

    let result = cache
        .put(
            &HttpRequest::new(HttpMethod::Post, "https://app.example/api"),
            HttpResponse::new(200, "{}"),
        )
        .await;
    assert!(result.is_err());
    assert!(cache.keys().await.unwrap().is_empty());

    storage.delete(&name).await.unwrap();
}

#[wasm_bindgen_test]
async fn test_no_content_response_converts_without_body() {
    let web = to_web_response(&HttpResponse::new(204, "")).unwrap();
    let back = from_web_response(&web).await.unwrap();
    assert_eq!(back.status, 204);
    assert!(back.body.is_empty());
}
