mod helpers;

use helpers::setup_test_app;

#[tokio::test]
async fn test_healthz() {
    let app = setup_test_app().await;

    let response = app.client().get("/api/healthz").await;

    assert_eq!(response.status_code(), 200);
    let body: serde_json::Value = response.json();
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_openapi_lists_upload_routes() {
    let app = setup_test_app().await;

    let response = app.client().get("/api/openapi.json").await;

    assert_eq!(response.status_code(), 200);
    let doc: serde_json::Value = response.json();
    let paths = doc["paths"].as_object().unwrap();
    assert!(paths.contains_key("/api/thumbnail_upload/{videoID}"));
    assert!(paths.contains_key("/api/video_upload/{videoID}"));
    assert!(paths.contains_key("/api/videos/{videoID}"));
}

#[tokio::test]
async fn test_unknown_asset_is_404() {
    let app = setup_test_app().await;

    let response = app.client().get("/assets/does-not-exist.png").await;

    assert_eq!(response.status_code(), 404);
}
