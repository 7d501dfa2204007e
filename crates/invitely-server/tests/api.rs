use std::sync::Arc;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
};
use invitely_deploy::{
    CATCH_ALL_RULE, HostingProvider, MemoryHosting, RedirectTable, archive::REDIRECTS_FILE,
};
use invitely_server::{AppState, config::ServerConfig, create_router};
use serde_json::{Value, json};
use tempfile::TempDir;
use tower::ServiceExt;

const MAIN_SITE_ID: &str = "main-id";

struct TestApp {
    router: Router,
    hosting: Arc<MemoryHosting>,
    _assets: TempDir,
}

fn png(width: u32) -> Vec<u8> {
    let img = image::RgbaImage::from_pixel(width, 4, image::Rgba([200, 120, 130, 255]));
    let mut out = std::io::Cursor::new(Vec::new());
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut out, image::ImageFormat::Png)
        .unwrap();
    out.into_inner()
}

fn test_app() -> TestApp {
    let assets = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(assets.path().join("images")).unwrap();
    std::fs::write(assets.path().join("images/bride.png"), png(32)).unwrap();

    let config = ServerConfig {
        netlify_auth_token: "test-token".into(),
        main_site_id: MAIN_SITE_ID.into(),
        main_site_url: "https://invitely.netlify.app".into(),
        assets_dir: assets.path().to_path_buf(),
        ..ServerConfig::default()
    };

    let hosting = Arc::new(MemoryHosting::new("netlify.app").with_site(MAIN_SITE_ID, "invitely"));
    let router = create_router(AppState::new(config, hosting.clone()));

    TestApp {
        router,
        hosting,
        _assets: assets,
    }
}

fn scenario_body() -> Value {
    json!({
        "theme": "floral",
        "slug": "ayu-budi",
        "data": {
            "text": {
                "couple": { "brideFullName": "Ayu", "groomFullName": "Budi" },
                "event": { "receptionLocation": "Jakarta", "receptionDate": "2025-12-25" },
                "closing": { "paragraph1": "Thank you" }
            }
        }
    })
}

async fn post_json(router: &Router, uri: &str, body: String) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body))
        .unwrap();
    send(router, request).await
}

async fn get(router: &Router, uri: &str) -> (StatusCode, Value) {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    send(router, request).await
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

fn redirect_table(hosting: &MemoryHosting) -> RedirectTable {
    RedirectTable::parse(
        &hosting
            .deployed_file(MAIN_SITE_ID, REDIRECTS_FILE)
            .unwrap_or_default(),
    )
}

#[tokio::test]
async fn test_publish_scenario() {
    let app = test_app();

    let (status, body) = post_json(&app.router, "/api/publish", scenario_body().to_string()).await;

    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["success"], true);
    assert_eq!(body["slug"], "ayu-budi");
    assert_eq!(body["siteUrl"], "https://invite-ayu-budi.netlify.app");
    assert!(body["mainUrl"].as_str().unwrap().ends_with("/ayu-budi"));
    assert_eq!(body["edgeCacheEnabled"], false);
    assert_eq!(body["deploy"]["state"], "uploaded");

    let site = app.hosting.site_named("invite-ayu-budi").unwrap();
    let document = app.hosting.deployed_file(&site.id, "index.html").unwrap();
    assert!(document.contains("Ayu"));
    assert!(document.contains("Jakarta"));

    let rules = redirect_table(&app.hosting).rules();
    assert_eq!(rules.len(), 1);
    assert_eq!(rules[0].prefix, "/ayu-budi");
    assert!(redirect_table(&app.hosting).render().ends_with(&format!("{CATCH_ALL_RULE}\n")));
}

#[tokio::test]
async fn test_publish_inlines_local_images() {
    let app = test_app();
    let mut body = scenario_body();
    body["data"]["images"] = json!({ "bride": "/images/bride.png", "groom": "/images/missing.png" });

    let (status, _) = post_json(&app.router, "/api/publish", body.to_string()).await;
    assert_eq!(status, StatusCode::OK);

    let site = app.hosting.site_named("invite-ayu-budi").unwrap();
    let document = app.hosting.deployed_file(&site.id, "index.html").unwrap();
    assert!(document.contains("data:image/"));
    assert!(!document.contains("/images/bride.png"));
    assert!(document.contains("/images/missing.png"));
}

#[tokio::test]
async fn test_republish_is_idempotent() {
    let app = test_app();

    for _ in 0..2 {
        let (status, _) = post_json(&app.router, "/api/publish", scenario_body().to_string()).await;
        assert_eq!(status, StatusCode::OK);
    }

    let destinations = app
        .hosting
        .sites()
        .into_iter()
        .filter(|site| site.name == "invite-ayu-budi")
        .count();
    assert_eq!(destinations, 1);
    assert_eq!(redirect_table(&app.hosting).rules().len(), 1);
}

#[tokio::test]
async fn test_missing_theme_is_rejected() {
    let app = test_app();
    let mut body = scenario_body();
    body.as_object_mut().unwrap().remove("theme");

    let (status, body) = post_json(&app.router, "/api/publish", body.to_string()).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "error": "Missing required fields (theme, data, slug)" }));
    assert_eq!(app.hosting.sites().len(), 1);
}

#[tokio::test]
async fn test_unknown_theme_is_not_found() {
    let app = test_app();
    let mut body = scenario_body();
    body["theme"] = json!("nonexistent");

    let (status, body) = post_json(&app.router, "/api/publish", body.to_string()).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({ "error": "Theme not found" }));
    assert_eq!(app.hosting.sites().len(), 1);
}

#[tokio::test]
async fn test_invalid_slug_is_rejected() {
    let app = test_app();

    for slug in ["Ayu-Budi", "-ayu", "ayu/budi"] {
        let mut body = scenario_body();
        body["slug"] = json!(slug);
        let (status, body) = post_json(&app.router, "/api/publish", body.to_string()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{slug}");
        assert!(body["error"].is_string());
    }
}

#[tokio::test]
async fn test_malformed_body_is_rejected() {
    let app = test_app();

    let (status, body) = post_json(&app.router, "/api/publish", "{ not json".into()).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_failed_upload_adds_no_redirect() {
    let app = test_app();
    let destination = app.hosting.create_site("invite-ayu-budi").await.unwrap();
    app.hosting.fail_uploads_to(destination.id.clone());

    let (status, body) = post_json(&app.router, "/api/publish", scenario_body().to_string()).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].as_str().unwrap().starts_with("Deploy failed"));
    assert_eq!(app.hosting.deploy_count(&destination.id), 0);
    assert_eq!(app.hosting.deploy_count(MAIN_SITE_ID), 0);
    assert_eq!(app.hosting.fetch_count(MAIN_SITE_ID), 0);
    assert!(redirect_table(&app.hosting).rules().is_empty());
}

#[tokio::test]
async fn test_health_check() {
    let app = test_app();

    let (status, body) = get(&app.router, "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["service"], "invitely-server");
    assert!(body["timestamp"].is_string());
}

#[tokio::test]
async fn test_theme_catalog() {
    let app = test_app();

    let (status, body) = get(&app.router, "/api/themes").await;

    assert_eq!(status, StatusCode::OK);
    let ids: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|theme| theme["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, ["floral", "classic", "rustic"]);
    assert!(body[0]["fontFamily"].is_string());
}
