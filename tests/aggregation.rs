//! End-to-end tests for `/api/search` and `/api/detail`.

use std::net::SocketAddr;

use axum::http::StatusCode;
use serde_json::{json, Value};
use vod_proxy::aggregate::SiteRegistry;

mod common;
use common::{MockUpstream, Reply};

fn registry_for(alpha: &MockUpstream, beta: &MockUpstream) -> SiteRegistry {
    SiteRegistry::from_toml(&format!(
        r#"
        default = "alpha"

        [sites.alpha]
        name = "Alpha"
        api = "{}"

        [sites.beta]
        name = "Beta"
        api = "{}"

        [sites.beta.detail]
        path = "/detail?id="
        "#,
        alpha.url("/api.php/provide/vod"),
        beta.url("/vod"),
    ))
    .unwrap()
}

async fn get_json(url: String) -> (StatusCode, Value) {
    let res = common::client().get(url).send().await.unwrap();
    let status = res.status();
    (status, res.json().await.unwrap())
}

fn api(proxy: SocketAddr, path_and_query: &str) -> String {
    format!("http://{}{}", proxy, path_and_query)
}

#[tokio::test]
async fn test_search_uses_default_site_and_passes_document_through() {
    let doc = r#"{"code":1,"list":[{"vod_id":1,"vod_name":"test"}]}"#;
    let alpha = common::start_upstream(move |_| Reply::ok("application/json", doc)).await;
    let beta = common::start_upstream(|_| Reply::ok("application/json", "{}")).await;
    let (proxy, shutdown) =
        common::start_proxy(common::loopback_config(), registry_for(&alpha, &beta)).await;

    let (status, body) = get_json(api(proxy, "/api/search?wd=test")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, serde_json::from_str::<Value>(doc).unwrap());
    assert_eq!(alpha.paths(), vec!["/api.php/provide/vod?ac=videolist&wd=test"]);
    assert!(alpha.heads()[0]
        .to_ascii_lowercase()
        .contains("accept: application/json"));
    assert_eq!(beta.hits(), 0);

    shutdown.trigger();
}

#[tokio::test]
async fn test_search_keyword_is_percent_encoded() {
    let alpha = common::start_upstream(|_| Reply::ok("application/json", "{}")).await;
    let beta = common::start_upstream(|_| Reply::ok("application/json", "{}")).await;
    let (proxy, shutdown) =
        common::start_proxy(common::loopback_config(), registry_for(&alpha, &beta)).await;

    let (status, _) = get_json(api(proxy, "/api/search?wd=a%20b%26c")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        alpha.paths(),
        vec!["/api.php/provide/vod?ac=videolist&wd=a%20b%26c"]
    );

    shutdown.trigger();
}

#[tokio::test]
async fn test_unknown_source_falls_back_to_default() {
    let alpha = common::start_upstream(|_| Reply::ok("application/json", "{}")).await;
    let beta = common::start_upstream(|_| Reply::ok("application/json", "{}")).await;
    let (proxy, shutdown) =
        common::start_proxy(common::loopback_config(), registry_for(&alpha, &beta)).await;

    let (status, _) = get_json(api(proxy, "/api/search?wd=x&source=nope")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(alpha.hits(), 1);
    assert_eq!(beta.hits(), 0);

    shutdown.trigger();
}

#[tokio::test]
async fn test_detail_uses_named_site_template_override() {
    let alpha = common::start_upstream(|_| Reply::ok("application/json", "{}")).await;
    let beta = common::start_upstream(|_| {
        Reply::ok("application/json", r#"{"list":[{"vod_id":42}]}"#)
    })
    .await;
    let (proxy, shutdown) =
        common::start_proxy(common::loopback_config(), registry_for(&alpha, &beta)).await;

    let (status, body) = get_json(api(proxy, "/api/detail?id=42&source=beta")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["list"][0]["vod_id"], 42);
    assert_eq!(beta.paths(), vec!["/vod/detail?id=42"]);
    assert_eq!(alpha.hits(), 0);

    shutdown.trigger();
}

#[tokio::test]
async fn test_custom_api_overrides_registry() {
    let alpha = common::start_upstream(|_| Reply::ok("application/json", "{}")).await;
    let beta = common::start_upstream(|_| Reply::ok("application/json", "{}")).await;
    let custom = common::start_upstream(|_| Reply::ok("application/json", r#"{"from":"custom"}"#)).await;
    let (proxy, shutdown) =
        common::start_proxy(common::loopback_config(), registry_for(&alpha, &beta)).await;

    let custom_api = urlencoding::encode(&custom.url("/api.php/provide/vod")).into_owned();
    let (status, body) = get_json(api(
        proxy,
        &format!("/api/detail?id=9&source=beta&customApi={}", custom_api),
    ))
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"from": "custom"}));
    assert_eq!(custom.paths(), vec!["/api.php/provide/vod?ac=videolist&ids=9"]);
    assert_eq!(alpha.hits() + beta.hits(), 0);

    shutdown.trigger();
}

#[tokio::test]
async fn test_upstream_failure_becomes_error_envelope() {
    let alpha = common::start_upstream(|_| Reply::status(503, "text/plain", "down")).await;
    let beta = common::start_upstream(|_| Reply::ok("application/json", "{}")).await;
    let (proxy, shutdown) =
        common::start_proxy(common::loopback_config(), registry_for(&alpha, &beta)).await;

    let (status, body) = get_json(api(proxy, "/api/search?wd=test")).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["code"], 500);
    assert_eq!(body["msg"], "Search request failed");
    assert!(body["error"].is_string());

    shutdown.trigger();
}

#[tokio::test]
async fn test_rejected_custom_api_becomes_error_envelope() {
    let alpha = common::start_upstream(|_| Reply::ok("application/json", "{}")).await;
    let beta = common::start_upstream(|_| Reply::ok("application/json", "{}")).await;
    let mut config = common::loopback_config();
    config.security.denied_hosts = vec!["internal.example".to_string()];
    let (proxy, shutdown) = common::start_proxy(config, registry_for(&alpha, &beta)).await;

    let (status, body) = get_json(api(
        proxy,
        "/api/detail?id=1&customApi=http%3A%2F%2Finternal.example%2Fapi.php",
    ))
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["msg"], "Detail request failed");
    assert_eq!(alpha.hits() + beta.hits(), 0);

    shutdown.trigger();
}

#[tokio::test]
async fn test_missing_or_invalid_parameters_are_rejected() {
    let alpha = common::start_upstream(|_| Reply::ok("application/json", "{}")).await;
    let beta = common::start_upstream(|_| Reply::ok("application/json", "{}")).await;
    let (proxy, shutdown) =
        common::start_proxy(common::loopback_config(), registry_for(&alpha, &beta)).await;

    let (status, body) = get_json(api(proxy, "/api/search")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], 400);

    let (status, body) = get_json(api(proxy, "/api/detail?id=1%3Bdrop")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["msg"], "Invalid video id");

    assert_eq!(alpha.hits(), 0);
    shutdown.trigger();
}
